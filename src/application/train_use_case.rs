// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// The fine-tuning walkthrough, start to finish:
//
//   Step 1: Load train/test splits            (Layer 4 - data)
//   Step 2: Load tokenizer, pad = eos         (Layer 6 - infra)
//   Step 3: Tokenise both splits              (Layer 4 - data)
//   Step 4: Load the base model               (Layer 6 - infra)
//   Step 5: Base model answer to the first
//           test question                     (Layer 5 - ml)
//   Step 6: Model summary                     (Layer 5 - ml)
//   Step 7: Train                             (Layer 5 - ml)
//   Step 8: Save model + tokenizer to
//           {output_dir}/final                (Layer 6 - infra)
//   Step 9: Reload from disk and answer the
//           same question again               (Layer 5 - ml)
//
// Steps 5 and 9 only run for the walkthrough; `train` skips them.

use anyhow::{bail, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use std::path::PathBuf;

use crate::data::{dataset::FinetuneDataset, loader::source_for};
use crate::domain::config::TrainingConfig;
use crate::infra::{
    checkpoint::Pretrained,
    registry::{ArtifactSource, RepoKind},
    tokenizer_store::TextTokenizer,
};
use crate::ml::{
    backend::BackendTask,
    inferencer::{inference, DEFAULT_MAX_INPUT_TOKENS, DEFAULT_MAX_OUTPUT_TOKENS},
    summary::ModelSummary,
    trainer::{TrainOutput, Trainer},
    training_args::TrainingArguments,
};

/// Directory under `output_dir` holding the final model.
pub const FINAL_DIR: &str = "final";

/// Resolve a model identifier, optionally refusing the hub.
pub fn model_source(name: &str, local_files_only: bool) -> ArtifactSource {
    if local_files_only {
        ArtifactSource::local(name)
    } else {
        ArtifactSource::resolve(name, RepoKind::Model)
    }
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub output:          TrainOutput,
    pub final_dir:       PathBuf,
    /// Checkpoint whose weights ended up in `final_dir`, if any
    pub best_checkpoint: Option<PathBuf>,
    pub test_question:   Option<String>,
    pub base_answer:     Option<String>,
    pub finetuned_answer: Option<String>,
}

pub struct TrainUseCase {
    config:           TrainingConfig,
    args:             TrainingArguments,
    walkthrough:      bool,
    local_files_only: bool,
}

impl TrainUseCase {
    pub fn new(config: TrainingConfig, args: TrainingArguments) -> Self {
        Self { config, args, walkthrough: false, local_files_only: false }
    }

    /// Also print base and fine-tuned answers around training.
    pub fn with_walkthrough(mut self, walkthrough: bool) -> Self {
        self.walkthrough = walkthrough;
        self
    }

    pub fn with_local_files_only(mut self, local_files_only: bool) -> Self {
        self.local_files_only = local_files_only;
        self
    }
}

impl BackendTask for TrainUseCase {
    type Output = TrainReport;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<TrainReport> {
        let cfg = &self.config;
        let _span = tracing::info_span!("train", model = %cfg.model.pretrained_name).entered();

        // ── Step 1: Dataset ───────────────────────────────────────────────────
        let splits = source_for(&cfg.datasets).load_splits()?;
        tracing::info!("Loaded {} train / {} test examples", splits.train.len(), splits.test.len());
        if splits.train.is_empty() {
            bail!("Training split of '{}' is empty", cfg.datasets.path);
        }

        // ── Step 2: Tokenizer ─────────────────────────────────────────────────
        let source = model_source(&cfg.model.pretrained_name, self.local_files_only);
        let tokenizer = TextTokenizer::from_source(&source)?;

        // ── Step 3: Tokenise ──────────────────────────────────────────────────
        let max_length = cfg.model.max_length;
        let train_ds = FinetuneDataset::from_examples(&splits.train, &tokenizer, max_length)?;
        let test_ds  = FinetuneDataset::from_examples(&splits.test, &tokenizer, max_length)?;
        tracing::info!(
            "Tokenised: {} train sequences ({} tokens), {} test sequences",
            train_ds.sample_count(), train_ds.token_count(), test_ds.sample_count(),
        );

        // ── Step 4: Base model ────────────────────────────────────────────────
        let base = Pretrained::<B>::load(&source, &device)?;

        // ── Step 5: Base model answer ─────────────────────────────────────────
        let test_question = splits.test.first().map(|ex| ex.question.clone());
        let base_answer = match (&test_question, self.walkthrough) {
            (Some(q), true) => {
                let answer = inference(q, &base.model.valid(), &tokenizer,
                    DEFAULT_MAX_INPUT_TOKENS, DEFAULT_MAX_OUTPUT_TOKENS)?;
                tracing::info!("Base model answered {} chars", answer.len());
                Some(answer)
            }
            _ => None,
        };

        // ── Step 6: Summary ───────────────────────────────────────────────────
        let summary = ModelSummary::new(&base.model, max_length, self.args.gradient_accumulation_steps);
        if self.walkthrough {
            println!("{summary}");
        } else {
            tracing::info!(
                "Model: {} parameters, {:.3} GB, {:.3e} FLOPs per step",
                summary.num_params, summary.memory_gb, summary.flops_per_step,
            );
        }

        // ── Step 7: Train ─────────────────────────────────────────────────────
        let final_dir = self.args.output_dir.join(FINAL_DIR);
        let mut trainer = Trainer::new(base, self.args.clone(), train_ds, test_ds, tokenizer.pad_id())?;
        let output = trainer.train()?;
        let best_checkpoint = self
            .args
            .load_best_model_at_end
            .then(|| trainer.state().best_model_checkpoint.clone())
            .flatten();

        // ── Step 8: Save ──────────────────────────────────────────────────────
        trainer.save_model(&final_dir)?;
        tokenizer.save(&final_dir)?;
        cfg.save(final_dir.join("training_config.json"))?;

        // ── Step 9: Reload and answer again ───────────────────────────────────
        let finetuned_answer = match (&test_question, self.walkthrough) {
            (Some(q), true) => {
                let reloaded = Pretrained::<B::InnerBackend>::load(&ArtifactSource::local(&final_dir), &device)?;
                let answer = inference(q, &reloaded.model, &tokenizer,
                    DEFAULT_MAX_INPUT_TOKENS, DEFAULT_MAX_OUTPUT_TOKENS)?;
                tracing::info!("Fine-tuned model answered {} chars", answer.len());
                Some(answer)
            }
            _ => None,
        };

        Ok(TrainReport { output, final_dir, best_checkpoint, test_question, base_answer, finetuned_answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{DatasetSettings, ModelSettings};
    use crate::infra::checkpoint::Pretrained;
    use crate::test_utils::{
        sample_examples, tiny_model_config, tiny_tokenizer, write_jsonl, TestAutodiffBackend, TestBackend,
    };

    fn setup(dir: &std::path::Path) -> (TrainingConfig, TrainingArguments) {
        let model_dir = dir.join("base");
        let tok = tiny_tokenizer(&model_dir);
        Pretrained::<TestBackend>::init(tiny_model_config(tok.vocab_size()), &Default::default())
            .unwrap()
            .save(&model_dir)
            .unwrap();

        let data = dir.join("docs.jsonl");
        write_jsonl(&data, &sample_examples(10));

        let config = TrainingConfig {
            model: ModelSettings { pretrained_name: model_dir.display().to_string(), max_length: 32 },
            datasets: DatasetSettings { use_hf: false, path: data.display().to_string() },
            verbose: false,
        };
        let mut args = TrainingArguments::with_max_steps(3);
        args.output_dir = dir.join("lamini_docs_3_steps");
        args.disable_tqdm = true;
        (config, args)
    }

    #[test]
    fn test_walkthrough_trains_saves_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let (config, args) = setup(dir.path());

        let report = TrainUseCase::new(config, args)
            .with_walkthrough(true)
            .with_local_files_only(true)
            .run::<TestAutodiffBackend>(Default::default())
            .unwrap();

        assert_eq!(report.output.global_step, 3);
        assert!(report.final_dir.join("model.mpk").exists());
        assert!(report.final_dir.join("tokenizer.json").exists());
        assert!(report.test_question.is_some());
        assert!(report.base_answer.is_some());
        assert!(report.finetuned_answer.is_some());
    }

    #[test]
    fn test_final_dir_reloads_to_the_same_answer() {
        let dir = tempfile::tempdir().unwrap();
        let (config, args) = setup(dir.path());
        let report = TrainUseCase::new(config, args)
            .with_walkthrough(true)
            .run::<TestAutodiffBackend>(Default::default())
            .unwrap();

        let src = ArtifactSource::local(&report.final_dir);
        let tok = TextTokenizer::from_source(&src).unwrap();
        let reloaded = Pretrained::<TestBackend>::load(&src, &Default::default()).unwrap();
        let q = report.test_question.unwrap();
        assert_eq!(
            inference(&q, &reloaded.model, &tok, DEFAULT_MAX_INPUT_TOKENS, DEFAULT_MAX_OUTPUT_TOKENS).unwrap(),
            report.finetuned_answer.unwrap(),
        );
    }

    #[test]
    fn test_missing_dataset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (mut config, args) = setup(dir.path());
        config.datasets.path = dir.path().join("nope.jsonl").display().to_string();
        assert!(TrainUseCase::new(config, args).run::<TestAutodiffBackend>(Default::default()).is_err());
    }
}
