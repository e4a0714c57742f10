// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Causal LM fine-tuning with gradient accumulation:
//
//   for each optimisation step:
//     ├── forward + backward on `gradient_accumulation_steps`
//     │   micro-batches (fewer at the end of an epoch),
//     │   each loss scaled by 1/chunk so gradients average
//     ├── optimiser step at the scheduled learning rate
//     ├── log        every `logging_steps`
//     ├── evaluate   every `eval_steps` (or each epoch)
//     └── checkpoint every `save_steps`
//
// Epochs repeat until the step budget is spent, so a tiny
// dataset with max_steps = 3 still runs exactly 3 steps.
//
// Training runs on an AutodiffBackend; evaluation runs on the
// inner backend through model.valid().
//
// Reference: Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig,
        AdamConfig, AdamWConfig, GradientsAccumulator, GradientsParams, Optimizer, SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::{fs, path::Path, sync::Arc, time::Instant};

use crate::data::{
    batcher::{CausalLmBatch, CausalLmBatcher},
    dataset::FinetuneDataset,
};
use crate::infra::{
    checkpoint::{self, CheckpointManager, Pretrained, TrainerState, MODEL_WEIGHTS_FILE},
    metrics::{LogEntry, MetricsLogger, LOG_HISTORY_FILE},
};
use crate::ml::{
    model::{CausalLm, CausalLmConfig},
    training_args::{IntervalStrategy, OptimizerKind, TrainingArguments},
};

/// Summary of a completed `train()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutput {
    pub global_step:        usize,
    /// Mean loss over all optimisation steps
    pub training_loss:      f64,
    pub runtime_secs:       f64,
    pub samples_per_second: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalMetrics {
    pub eval_loss:  f64,
    pub perplexity: f64,
}

pub struct Trainer<B: AutodiffBackend> {
    model:        CausalLm<B>,
    model_config: CausalLmConfig,
    args:         TrainingArguments,
    device:       B::Device,
    train_loader: Arc<dyn DataLoader<CausalLmBatch<B>>>,
    eval_loader:  Arc<dyn DataLoader<CausalLmBatch<B::InnerBackend>>>,
    train_batches: usize,
    train_samples: usize,
    eval_samples:  usize,
    state:        TrainerState,
    /// Most recent eval_loss; the next checkpoint is judged by it
    last_eval:    Option<f64>,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(
        pretrained:    Pretrained<B>,
        args:          TrainingArguments,
        train_dataset: FinetuneDataset,
        eval_dataset:  FinetuneDataset,
        pad_id:        u32,
    ) -> Result<Self> {
        args.validate()?;
        let device = pretrained.model.device();
        B::seed(args.seed);

        let train_samples = train_dataset.sample_count();
        let eval_samples  = eval_dataset.sample_count();
        let train_batches = train_samples.div_ceil(args.per_device_train_batch_size);

        let train_loader = DataLoaderBuilder::new(CausalLmBatcher::<B>::new(device.clone(), pad_id))
            .batch_size(args.per_device_train_batch_size)
            .shuffle(args.seed)
            .num_workers(1)
            .build(train_dataset);

        let eval_loader = DataLoaderBuilder::new(CausalLmBatcher::<B::InnerBackend>::new(device.clone(), pad_id))
            .batch_size(args.per_device_eval_batch_size)
            .num_workers(1)
            .build(eval_dataset);

        Ok(Self {
            model: pretrained.model,
            model_config: pretrained.config,
            args,
            device,
            train_loader,
            eval_loader,
            train_batches,
            train_samples,
            eval_samples,
            state: TrainerState::default(),
            last_eval: None,
        })
    }

    pub fn state(&self) -> &TrainerState { &self.state }

    /// Run the full optimisation loop with the configured optimiser.
    pub fn train(&mut self) -> Result<TrainOutput> {
        let clip = Some(GradientClippingConfig::Norm(self.args.max_grad_norm as f32));
        let decay = (self.args.weight_decay > 0.0)
            .then(|| WeightDecayConfig::new(self.args.weight_decay as f32));

        match self.args.optim {
            OptimizerKind::AdamW => {
                let optim = AdamWConfig::new()
                    .with_weight_decay(self.args.weight_decay as f32)
                    .with_grad_clipping(clip)
                    .init::<B, CausalLm<B>>();
                self.run(optim)
            }
            OptimizerKind::Adam => {
                let optim = AdamConfig::new()
                    .with_weight_decay(decay)
                    .with_grad_clipping(clip)
                    .init::<B, CausalLm<B>>();
                self.run(optim)
            }
            OptimizerKind::Sgd => {
                let optim = SgdConfig::new()
                    .with_weight_decay(decay)
                    .with_gradient_clipping(clip)
                    .init::<B, CausalLm<B>>();
                self.run(optim)
            }
        }
    }

    fn run<O: Optimizer<CausalLm<B>, B>>(&mut self, mut optim: O) -> Result<TrainOutput> {
        let args = self.args.clone();
        let total_steps = args.total_steps(self.train_batches);

        if args.overwrite_output_dir {
            self.clear_output_dir()?;
        }
        let ckpt   = CheckpointManager::new(&args.output_dir, args.save_total_limit);
        let logger = MetricsLogger::new(&args.output_dir)?;

        self.state = TrainerState { max_steps: total_steps, ..TrainerState::default() };
        self.last_eval = None;

        tracing::info!(
            "Training: {} samples, {} micro-batches/epoch, {} optimisation steps, {:?}",
            self.train_samples, self.train_batches, total_steps, args.optim,
        );

        let start = Instant::now();
        if total_steps == 0 || self.train_batches == 0 {
            tracing::warn!("Nothing to train: {} steps over {} batches", total_steps, self.train_batches);
            return Ok(TrainOutput {
                global_step: 0,
                training_loss: 0.0,
                runtime_secs: start.elapsed().as_secs_f64(),
                samples_per_second: 0.0,
            });
        }

        let pb = if args.disable_tqdm { ProgressBar::hidden() } else { ProgressBar::new(total_steps as u64) };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:30.green/black} {pos}/{len} [{elapsed}<{eta}] {msg}")?,
        );

        let n_params = self.model.num_params() as f64;
        let train_loader = self.train_loader.clone();
        let mut total_loss   = 0.0f64;
        let mut logged_loss  = 0.0f64;
        let mut logged_steps = 0usize;
        let mut samples_seen = 0usize;
        let mut epoch        = 0usize;

        'epochs: loop {
            let mut accumulator = GradientsAccumulator::<CausalLm<B>>::new();
            let mut chunk_len  = 0usize;
            let mut in_chunk   = 0usize;
            let mut step_loss  = 0.0f64;
            let mut step_tokens = 0usize;
            let mut step_start = Instant::now();

            for (i, batch) in train_loader.iter().enumerate() {
                if in_chunk == 0 {
                    chunk_len = args.gradient_accumulation_steps.min(self.train_batches - i);
                    step_start = Instant::now();
                }

                samples_seen += batch.input_ids.dims()[0];
                step_tokens  += batch.token_count();

                // ── Forward + backward ────────────────────────────────────────
                let loss = self
                    .model
                    .forward_loss(batch.input_ids, batch.attention_mask)
                    .div_scalar(chunk_len as f32);
                step_loss += loss.clone().into_scalar().elem::<f64>();

                let grads = GradientsParams::from_grads(loss.backward(), &self.model);
                accumulator.accumulate(&self.model, grads);
                in_chunk += 1;

                if in_chunk < chunk_len {
                    continue;
                }

                // ── Optimiser step ────────────────────────────────────────────
                let lr = args.learning_rate_at(self.state.global_step, total_steps);
                self.model = optim.step(lr, self.model.clone(), accumulator.grads());
                self.state.global_step += 1;
                self.state.epoch = epoch as f64 + (i + 1) as f64 / self.train_batches as f64;

                let step = self.state.global_step;
                total_loss  += step_loss;
                logged_loss += step_loss;
                logged_steps += 1;

                let step_secs = step_start.elapsed().as_secs_f64().max(1e-9);
                let gflops = 6.0 * n_params * step_tokens as f64 / step_secs / 1e9;
                pb.set_position(step as u64);
                pb.set_message(format!("loss {step_loss:.4}"));

                if args.logging_strategy == IntervalStrategy::Steps && step % args.logging_steps == 0 {
                    let mean = logged_loss / logged_steps as f64;
                    self.log_step(&logger, mean, lr, start, total_steps, gflops)?;
                    logged_loss = 0.0;
                    logged_steps = 0;
                }

                if args.evaluation_strategy == IntervalStrategy::Steps && step % args.eval_steps == 0 {
                    self.evaluate_and_track(&logger)?;
                }

                if step % args.save_steps == 0 {
                    self.save_checkpoint(&ckpt)?;
                }

                in_chunk = 0;
                step_loss = 0.0;
                step_tokens = 0;

                if step >= total_steps {
                    break 'epochs;
                }
            }

            epoch += 1;
            self.state.epoch = epoch as f64;

            if args.logging_strategy == IntervalStrategy::Epoch && logged_steps > 0 {
                let lr = args.learning_rate_at(self.state.global_step, total_steps);
                let mean = logged_loss / logged_steps as f64;
                self.log_step(&logger, mean, lr, start, total_steps, 0.0)?;
                logged_loss = 0.0;
                logged_steps = 0;
            }
            if args.evaluation_strategy == IntervalStrategy::Epoch {
                self.evaluate_and_track(&logger)?;
            }
        }

        // The final break skips the end-of-epoch hooks
        if args.logging_strategy == IntervalStrategy::Epoch && logged_steps > 0 {
            let lr = args.learning_rate_at(self.state.global_step, total_steps);
            self.log_step(&logger, logged_loss / logged_steps as f64, lr, start, total_steps, 0.0)?;
        }
        if args.evaluation_strategy == IntervalStrategy::Epoch {
            self.evaluate_and_track(&logger)?;
        }
        pb.finish_and_clear();

        if args.load_best_model_at_end {
            self.load_best()?;
        }

        let runtime_secs = start.elapsed().as_secs_f64();
        let output = TrainOutput {
            global_step: self.state.global_step,
            training_loss: total_loss / self.state.global_step.max(1) as f64,
            runtime_secs,
            samples_per_second: samples_seen as f64 / runtime_secs.max(1e-9),
        };
        tracing::info!(
            "Training complete: {} steps, mean loss {:.4}, {:.1}s ({:.2} samples/s)",
            output.global_step, output.training_loss, output.runtime_secs, output.samples_per_second,
        );
        Ok(output)
    }

    /// Mean loss over the evaluation split, or None if it is empty.
    pub fn evaluate(&self) -> Result<Option<EvalMetrics>> {
        if self.eval_samples == 0 {
            tracing::warn!("Evaluation split is empty, skipping evaluation");
            return Ok(None);
        }
        let model = self.model.valid();

        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        for batch in self.eval_loader.iter() {
            if batch.input_ids.dims()[1] < 2 {
                continue;
            }
            let loss = model.forward_loss(batch.input_ids, batch.attention_mask);
            loss_sum += loss.into_scalar().elem::<f64>();
            batches  += 1;
        }
        if batches == 0 {
            return Ok(None);
        }

        let eval_loss = loss_sum / batches as f64;
        Ok(Some(EvalMetrics { eval_loss, perplexity: eval_loss.exp() }))
    }

    /// Write config.json, model.mpk and training_args.json into `dir`.
    pub fn save_model(&self, dir: &Path) -> Result<()> {
        checkpoint::save_model(&self.model, &self.model_config, dir)?;
        self.args.save(dir)?;
        tracing::info!("Saved fine-tuned model to '{}'", dir.display());
        Ok(())
    }

    // ── Step helpers ──────────────────────────────────────────────────────────

    fn log_step(
        &mut self,
        logger:      &MetricsLogger,
        loss:        f64,
        lr:          f64,
        start:       Instant,
        total_steps: usize,
        gflops:      f64,
    ) -> Result<()> {
        let step = self.state.global_step;
        let elapsed = start.elapsed().as_secs_f64();
        let remaining = elapsed / step as f64 * total_steps.saturating_sub(step) as f64;

        let entry = LogEntry::train(step, self.state.epoch, loss, lr);
        logger.log(&entry)?;
        self.state.log_history.push(entry);

        tracing::info!(
            "step {}/{} | epoch {:.2} | loss {:.4} | lr {:.3e} | {:.1}s elapsed, {:.1}s left | {:.2} GFLOP/s",
            step, total_steps, self.state.epoch, loss, lr, elapsed, remaining, gflops,
        );
        Ok(())
    }

    /// Evaluate and record the result for the next checkpoint.
    fn evaluate_and_track(&mut self, logger: &MetricsLogger) -> Result<()> {
        let Some(metrics) = self.evaluate()? else { return Ok(()) };

        let entry = LogEntry::eval(self.state.global_step, self.state.epoch, metrics.eval_loss);
        logger.log(&entry)?;
        self.state.log_history.push(entry);
        tracing::info!(
            "eval at step {} | eval_loss {:.4} | perplexity {:.2}",
            self.state.global_step, metrics.eval_loss, metrics.perplexity,
        );

        self.last_eval = Some(metrics.eval_loss);
        Ok(())
    }

    /// Save checkpoint-{step}. It becomes the best checkpoint when the
    /// latest evaluation beats every evaluation seen at earlier saves.
    fn save_checkpoint(&mut self, ckpt: &CheckpointManager) -> Result<()> {
        if let Some(metric) = self.last_eval {
            let improved = match self.state.best_metric {
                None => true,
                Some(best) if self.args.greater_is_better => metric > best,
                Some(best) => metric < best,
            };
            if improved {
                self.state.best_metric = Some(metric);
                self.state.best_model_checkpoint = Some(ckpt.checkpoint_dir(self.state.global_step));
            }
        }
        ckpt.save(&self.model, &self.model_config, &self.state)?;
        Ok(())
    }

    fn load_best(&mut self) -> Result<()> {
        let Some(best) = self.state.best_model_checkpoint.clone() else {
            tracing::debug!("No best checkpoint recorded, keeping final weights");
            return Ok(());
        };
        tracing::info!(
            "Loading best model from '{}' (eval_loss {:.4})",
            best.display(),
            self.state.best_metric.unwrap_or(f64::NAN),
        );
        self.model = checkpoint::load_weights(self.model.clone(), &best.join(MODEL_WEIGHTS_FILE), &self.device)?;
        Ok(())
    }

    fn clear_output_dir(&self) -> Result<()> {
        let ckpt = CheckpointManager::new(&self.args.output_dir, None);
        for (_, dir) in ckpt.list()? {
            fs::remove_dir_all(&dir)?;
        }
        let history = self.args.output_dir.join(LOG_HISTORY_FILE);
        if history.exists() {
            fs::remove_file(history)?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl<B: AutodiffBackend> Trainer<B> {
    fn model(&self) -> &CausalLm<B> { &self.model }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::TokenizedExample;
    use crate::infra::registry::ArtifactSource;
    use crate::test_utils::{tiny_model_config, TestAutodiffBackend};

    fn dataset(n: usize) -> FinetuneDataset {
        FinetuneDataset::new(
            (0..n)
                .map(|i| TokenizedExample { input_ids: vec![1 + (i as u32 % 7), 2, 3, 4 + (i as u32 % 3)] })
                .collect(),
        )
    }

    fn args(dir: &Path, max_steps: i64) -> TrainingArguments {
        let mut args = TrainingArguments::with_max_steps(max_steps);
        args.output_dir = dir.to_path_buf();
        args.disable_tqdm = true;
        args.learning_rate = 1e-3;
        args
    }

    fn trainer(args: TrainingArguments, n_train: usize) -> Trainer<TestAutodiffBackend> {
        let pretrained = Pretrained::init(tiny_model_config(20), &Default::default()).unwrap();
        Trainer::new(pretrained, args, dataset(n_train), dataset(3), 0).unwrap()
    }

    #[test]
    fn test_max_steps_runs_exactly_that_many_steps() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = trainer(args(dir.path(), 3), 2);
        let out = t.train().unwrap();
        assert_eq!(out.global_step, 3);
        assert!(out.training_loss.is_finite());

        let train_rows = t.state().log_history.iter().filter(|e| e.loss.is_some()).count();
        assert_eq!(train_rows, 3);
    }

    #[test]
    fn test_first_step_uses_zero_learning_rate() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = trainer(args(dir.path(), 2), 4);
        t.train().unwrap();
        assert_eq!(t.state().log_history[0].learning_rate, Some(0.0));
    }

    #[test]
    fn test_epoch_budget_with_accumulation() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), -1);
        a.num_train_epochs = 2.0;
        // 10 batches / 4 accumulation → 3 steps per epoch
        let mut t = trainer(a, 10);
        assert_eq!(t.train().unwrap().global_step, 6);
    }

    #[test]
    fn test_zero_steps_trains_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = trainer(args(dir.path(), 0), 4);
        assert_eq!(t.train().unwrap().global_step, 0);
    }

    #[test]
    fn test_eval_and_checkpoint_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), 4);
        a.gradient_accumulation_steps = 1;
        a.eval_steps = 2;
        a.save_steps = 2;
        a.save_total_limit = None;
        let mut t = trainer(a, 4);
        t.train().unwrap();

        let evals = t.state().log_history.iter().filter(|e| e.eval_loss.is_some()).count();
        assert_eq!(evals, 2);
        let ckpt = CheckpointManager::new(dir.path(), None);
        let steps: Vec<usize> = ckpt.list().unwrap().into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![2, 4]);
        assert!(dir.path().join(LOG_HISTORY_FILE).exists());
        assert!(t.state().best_model_checkpoint.is_some());
    }

    #[test]
    fn test_evaluate_reports_perplexity() {
        let dir = tempfile::tempdir().unwrap();
        let t = trainer(args(dir.path(), 1), 2);
        let m = t.evaluate().unwrap().unwrap();
        assert!((m.perplexity - m.eval_loss.exp()).abs() < 1e-9);
    }

    #[test]
    fn test_save_model_is_reloadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = trainer(args(dir.path(), 1), 2);
        t.train().unwrap();
        let out = dir.path().join("final");
        t.save_model(&out).unwrap();
        assert!(out.join("training_args.json").exists());

        let device = Default::default();
        let reloaded = Pretrained::<crate::test_utils::TestBackend>::load(&ArtifactSource::local(&out), &device).unwrap();
        let ids = Tensor::<crate::test_utils::TestBackend, 1, Int>::from_ints([1, 2, 3].as_slice(), &device)
            .reshape([1, 3]);
        let a: Vec<f32> = t.model().valid().forward(ids.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = reloaded.model.forward(ids).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    fn eval_rows(t: &Trainer<TestAutodiffBackend>) -> Vec<(usize, f64)> {
        t.state().log_history.iter().filter_map(|e| e.eval_loss.map(|l| (e.step, l))).collect()
    }

    #[test]
    fn test_epoch_evaluation_marks_a_saved_checkpoint_as_best() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), 4);
        a.gradient_accumulation_steps = 1;
        a.evaluation_strategy = IntervalStrategy::Epoch;
        a.save_steps = 1;
        a.save_total_limit = Some(1);
        let mut t = trainer(a, 2);
        t.train().unwrap();

        // epochs end at steps 2 and 4; only the step-2 result precedes a save
        assert_eq!(eval_rows(&t).len(), 2);
        let best = t.state().best_model_checkpoint.clone().unwrap();
        assert_eq!(best, CheckpointManager::new(dir.path(), None).checkpoint_dir(3));
        assert!(best.join(MODEL_WEIGHTS_FILE).exists());
        assert_eq!(t.state().best_metric, Some(eval_rows(&t)[0].1));
    }

    #[test]
    fn test_evaluation_between_saves_is_judged_at_the_next_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), 4);
        a.gradient_accumulation_steps = 1;
        a.eval_steps = 1;
        a.save_steps = 2;
        a.save_total_limit = None;
        let mut t = trainer(a, 4);
        t.train().unwrap();

        let evals = eval_rows(&t);
        assert_eq!(evals.len(), 4);
        let ckpt = CheckpointManager::new(dir.path(), None);
        let expected = if evals[3].1 < evals[1].1 { 4 } else { 2 };
        assert_eq!(t.state().best_model_checkpoint, Some(ckpt.checkpoint_dir(expected)));
    }

    #[test]
    fn test_best_checkpoint_weights_are_restored_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), 4);
        a.gradient_accumulation_steps = 1;
        a.eval_steps = 1;
        a.save_steps = 1;
        a.save_total_limit = None;
        a.learning_rate = 5e-2;

        // Training pushes towards tokens the evaluation split never uses
        let train = FinetuneDataset::new(vec![TokenizedExample { input_ids: vec![15, 16, 17, 18] }; 4]);
        let eval = FinetuneDataset::new(vec![TokenizedExample { input_ids: vec![1, 2, 3, 4] }; 2]);
        let pretrained = Pretrained::init(tiny_model_config(20), &Default::default()).unwrap();
        let mut t = Trainer::<TestAutodiffBackend>::new(pretrained, a, train, eval, 0).unwrap();
        t.train().unwrap();

        let evals = eval_rows(&t);
        let (best_step, _) = evals
            .iter()
            .copied()
            .fold(evals[0], |best, row| if row.1 < best.1 { row } else { best });
        let ckpt = CheckpointManager::new(dir.path(), None);
        assert_eq!(t.state().best_model_checkpoint, Some(ckpt.checkpoint_dir(best_step)));

        let device = Default::default();
        let ids = Tensor::<crate::test_utils::TestBackend, 1, Int>::from_ints([1, 2, 3].as_slice(), &device)
            .reshape([1, 3]);
        let logits_at = |step: usize| -> Vec<f32> {
            let fresh = tiny_model_config(20).init::<crate::test_utils::TestBackend>(&device);
            let weights = ckpt.checkpoint_dir(step).join(MODEL_WEIGHTS_FILE);
            let model = checkpoint::load_weights(fresh, &weights, &device).unwrap();
            model.forward(ids.clone()).into_data().to_vec().unwrap()
        };
        let in_memory: Vec<f32> = t.model().valid().forward(ids.clone()).into_data().to_vec().unwrap();

        assert_eq!(in_memory, logits_at(best_step));
        if best_step != 4 {
            assert_ne!(in_memory, logits_at(4));
        }
    }

    #[test]
    fn test_final_weights_kept_without_load_best() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args(dir.path(), 2);
        a.gradient_accumulation_steps = 1;
        a.eval_steps = 1;
        a.save_steps = 1;
        a.save_total_limit = None;
        a.load_best_model_at_end = false;
        let mut t = trainer(a, 2);
        t.train().unwrap();

        let device = Default::default();
        let fresh = tiny_model_config(20).init::<crate::test_utils::TestBackend>(&device);
        let weights = CheckpointManager::new(dir.path(), None).checkpoint_dir(2).join(MODEL_WEIGHTS_FILE);
        let last = checkpoint::load_weights(fresh, &weights, &device).unwrap();
        let ids = Tensor::<crate::test_utils::TestBackend, 1, Int>::from_ints([1, 2, 3].as_slice(), &device)
            .reshape([1, 3]);
        let a: Vec<f32> = t.model().valid().forward(ids.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = last.forward(ids).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }
}
