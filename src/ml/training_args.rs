// ============================================================
// Layer 5 — Training Arguments
// ============================================================
// Optimiser and scheduling knobs for the Trainer, plus the two
// pieces of arithmetic that follow directly from them:
//
//   total_steps       → how many optimisation steps a run takes
//   learning_rate_at  → linear warmup, then linear decay to 0
//
// Saved as training_args.json next to every fine-tuned model.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

pub const TRAINING_ARGS_FILE: &str = "training_args.json";

/// When logging / evaluation happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IntervalStrategy {
    No,
    Steps,
    Epoch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[value(name = "adamw")]
    AdamW,
    Adam,
    Sgd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingArguments {
    pub learning_rate:               f64,
    pub num_train_epochs:            f64,
    /// A non-negative value overrides `num_train_epochs`
    pub max_steps:                   i64,
    pub per_device_train_batch_size: usize,
    pub per_device_eval_batch_size:  usize,
    pub output_dir:                  PathBuf,
    pub overwrite_output_dir:        bool,
    pub disable_tqdm:                bool,
    pub eval_steps:                  usize,
    pub save_steps:                  usize,
    pub warmup_steps:                usize,
    pub evaluation_strategy:         IntervalStrategy,
    pub logging_strategy:            IntervalStrategy,
    pub logging_steps:               usize,
    pub optim:                       OptimizerKind,
    pub gradient_accumulation_steps: usize,
    pub gradient_checkpointing:      bool,
    pub load_best_model_at_end:      bool,
    pub save_total_limit:            Option<usize>,
    pub metric_for_best_model:       String,
    pub greater_is_better:           bool,
    pub max_grad_norm:               f64,
    pub weight_decay:                f64,
    pub seed:                        u64,
}

impl Default for TrainingArguments {
    fn default() -> Self {
        Self::with_max_steps(-1)
    }
}

impl TrainingArguments {
    /// Defaults, with `output_dir` named after the step budget.
    pub fn with_max_steps(max_steps: i64) -> Self {
        Self {
            learning_rate:               1e-5,
            num_train_epochs:            1.0,
            max_steps,
            per_device_train_batch_size: 1,
            per_device_eval_batch_size:  1,
            output_dir:                  PathBuf::from(format!("lamini_docs_{max_steps}_steps")),
            overwrite_output_dir:        false,
            disable_tqdm:                false,
            eval_steps:                  120,
            save_steps:                  120,
            warmup_steps:                1,
            evaluation_strategy:         IntervalStrategy::Steps,
            logging_strategy:            IntervalStrategy::Steps,
            logging_steps:               1,
            optim:                       OptimizerKind::AdamW,
            gradient_accumulation_steps: 4,
            gradient_checkpointing:      false,
            load_best_model_at_end:      true,
            save_total_limit:            Some(1),
            metric_for_best_model:       "eval_loss".to_string(),
            greater_is_better:           false,
            max_grad_norm:               1.0,
            weight_decay:                0.0,
            seed:                        42,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.per_device_train_batch_size == 0 || self.per_device_eval_batch_size == 0 {
            bail!("Batch sizes must be at least 1");
        }
        if self.gradient_accumulation_steps == 0 {
            bail!("gradient_accumulation_steps must be at least 1");
        }
        if self.learning_rate < 0.0 || !self.learning_rate.is_finite() {
            bail!("learning_rate must be a non-negative number, got {}", self.learning_rate);
        }
        if self.max_steps < 0 && self.num_train_epochs <= 0.0 {
            bail!("num_train_epochs must be positive when max_steps is not set");
        }
        if self.logging_strategy == IntervalStrategy::Steps && self.logging_steps == 0 {
            bail!("logging_steps must be at least 1");
        }
        if self.evaluation_strategy == IntervalStrategy::Steps && self.eval_steps == 0 {
            bail!("eval_steps must be at least 1");
        }
        if self.save_steps == 0 {
            bail!("save_steps must be at least 1");
        }
        if self.save_total_limit == Some(0) {
            bail!("save_total_limit must be at least 1 when set");
        }
        if self.metric_for_best_model != "eval_loss" {
            bail!("Unsupported metric_for_best_model '{}', only 'eval_loss' is tracked",
                self.metric_for_best_model);
        }
        if self.load_best_model_at_end {
            match self.evaluation_strategy {
                IntervalStrategy::No => bail!("load_best_model_at_end requires an evaluation strategy"),
                IntervalStrategy::Steps if self.save_steps % self.eval_steps != 0 => bail!(
                    "load_best_model_at_end requires save_steps ({}) to be a multiple of eval_steps ({})",
                    self.save_steps, self.eval_steps
                ),
                _ => {}
            }
        }
        if self.output_dir.as_os_str().is_empty() {
            bail!("output_dir must not be empty");
        }
        Ok(())
    }

    /// Optimisation steps covering one pass over `batches` micro-batches.
    pub fn steps_per_epoch(&self, batches: usize) -> usize {
        batches.div_ceil(self.gradient_accumulation_steps).max(1)
    }

    /// Step budget for the whole run.
    pub fn total_steps(&self, batches: usize) -> usize {
        if self.max_steps >= 0 {
            self.max_steps as usize
        } else {
            (self.num_train_epochs * self.steps_per_epoch(batches) as f64).ceil() as usize
        }
    }

    /// Learning rate for the 0-based optimisation step `step`.
    pub fn learning_rate_at(&self, step: usize, total_steps: usize) -> f64 {
        let warmup = self.warmup_steps;
        let factor = if step < warmup {
            step as f64 / warmup.max(1) as f64
        } else {
            total_steps.saturating_sub(step) as f64 / total_steps.saturating_sub(warmup).max(1) as f64
        };
        self.learning_rate * factor
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(TRAINING_ARGS_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_walkthrough() {
        let args = TrainingArguments::with_max_steps(3);
        assert_eq!(args.output_dir, PathBuf::from("lamini_docs_3_steps"));
        assert_eq!(args.gradient_accumulation_steps, 4);
        assert_eq!(args.optim, OptimizerKind::AdamW);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_max_steps_overrides_epochs() {
        let mut args = TrainingArguments::with_max_steps(3);
        args.num_train_epochs = 10.0;
        assert_eq!(args.total_steps(1000), 3);
    }

    #[test]
    fn test_epoch_based_total_rounds_up() {
        let mut args = TrainingArguments::default();
        args.num_train_epochs = 1.5;
        // 10 micro-batches / 4 accumulation → 3 steps per epoch
        assert_eq!(args.steps_per_epoch(10), 3);
        assert_eq!(args.total_steps(10), 5);
    }

    #[test]
    fn test_linear_schedule_with_warmup() {
        let mut args = TrainingArguments::with_max_steps(5);
        args.learning_rate = 1.0;
        args.warmup_steps = 1;
        let lrs: Vec<f64> = (0..5).map(|s| args.learning_rate_at(s, 5)).collect();
        assert_eq!(lrs, vec![0.0, 1.0, 0.75, 0.5, 0.25]);
    }

    #[test]
    fn test_save_steps_must_be_multiple_of_eval_steps() {
        let mut args = TrainingArguments::default();
        args.eval_steps = 50;
        args.save_steps = 120;
        assert!(args.validate().is_err());
        args.load_best_model_at_end = false;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_accumulation_rejected() {
        let mut args = TrainingArguments::default();
        args.gradient_accumulation_steps = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&TrainingArguments::default()).unwrap();
        assert!(json.contains(r#""optim":"adamw""#));
        assert!(json.contains(r#""evaluation_strategy":"steps""#));
        let partial: TrainingArguments = serde_json::from_str(r#"{"max_steps": 7}"#).unwrap();
        assert_eq!(partial.max_steps, 7);
        assert_eq!(partial.learning_rate, 1e-5);
    }
}
