// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// A saved model is a directory:
//
//   <dir>/
//     config.json          ← CausalLmConfig (architecture)
//     model.mpk            ← parameters, NamedMpk, full precision
//     model.safetensors    ← hub repositories instead of model.mpk
//     tokenizer.json       ← written alongside by the tokenizer
//     training_args.json   ← only for fine-tuned models
//
// During training, periodic saves go to numbered directories
// with the trainer state next to the weights:
//
//   output_dir/
//     checkpoint-120/  config.json  model.mpk  trainer_state.json
//     checkpoint-240/  ...
//
// At most `save_total_limit` numbered checkpoints are kept. The
// oldest go first, but the best checkpoint and the one just
// written are never removed.
//
// Full precision matters: a reloaded model must produce exactly
// the same greedy completions as the one that was saved.

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::hf_import::{import_safetensors, SAFETENSORS_FILE};
use crate::infra::metrics::LogEntry;
use crate::infra::registry::ArtifactSource;
use crate::ml::model::{CausalLm, CausalLmConfig};

pub const MODEL_CONFIG_FILE:  &str = "config.json";
pub const MODEL_WEIGHTS_FILE: &str = "model.mpk";
pub const TRAINER_STATE_FILE: &str = "trainer_state.json";

const CHECKPOINT_PREFIX: &str = "checkpoint-";

type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

// ─── Pretrained ───────────────────────────────────────────────────────────────
/// A model together with the architecture it was built from.
pub struct Pretrained<B: Backend> {
    pub config: CausalLmConfig,
    pub model:  CausalLm<B>,
}

impl<B: Backend> Pretrained<B> {
    /// Fresh randomly initialised weights.
    pub fn init(config: CausalLmConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let model = config.init(device);
        Ok(Self { config, model })
    }

    /// Load config.json plus model.mpk, or model.safetensors when the
    /// source has no burn record, from a local directory or hub repo.
    pub fn load(source: &ArtifactSource, device: &B::Device) -> Result<Self> {
        let config_path = source.fetch(MODEL_CONFIG_FILE)?;
        let config = CausalLmConfig::load(&config_path)
            .map_err(|e| anyhow!("Cannot read model config '{}': {e:?}", config_path.display()))?;
        config.validate()?;

        let model = if let Some(weights) = source.fetch_optional(MODEL_WEIGHTS_FILE)? {
            load_weights(config.init(device), &weights, device)?
        } else if let Some(weights) = source.fetch_optional(SAFETENSORS_FILE)? {
            import_safetensors(&config, &weights, device)?
        } else {
            bail!(
                "{} has neither {MODEL_WEIGHTS_FILE} nor {SAFETENSORS_FILE}",
                source.describe(),
            );
        };

        tracing::info!(
            "Loaded model from {} ({} parameters)",
            source.describe(),
            model.num_params(),
        );
        Ok(Self { config, model })
    }

    /// Write config.json + model.mpk into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        save_model(&self.model, &self.config, dir)
    }
}

/// Write a model directory (config + full-precision weights).
pub fn save_model<B: Backend>(model: &CausalLm<B>, config: &CausalLmConfig, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create '{}'", dir.display()))?;

    let config_path = dir.join(MODEL_CONFIG_FILE);
    config
        .save(&config_path)
        .with_context(|| format!("Cannot write '{}'", config_path.display()))?;

    // The recorder appends the .mpk extension itself
    let weights = dir.join(MODEL_WEIGHTS_FILE).with_extension("");
    ModelRecorder::new()
        .record(model.clone().into_record(), weights.clone())
        .map_err(|e| anyhow!("Cannot save weights to '{}': {e:?}", weights.display()))?;

    tracing::debug!("Saved model to '{}'", dir.display());
    Ok(())
}

/// Replace the parameters of `model` with the ones in `weights`.
pub fn load_weights<B: Backend>(
    model:   CausalLm<B>,
    weights: &Path,
    device:  &B::Device,
) -> Result<CausalLm<B>> {
    let record = ModelRecorder::new()
        .load(weights.with_extension(""), device)
        .map_err(|e| anyhow!("Cannot load weights '{}': {e:?}", weights.display()))?;
    Ok(model.load_record(record))
}

// ─── TrainerState ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainerState {
    pub global_step:           usize,
    pub epoch:                 f64,
    pub max_steps:             usize,
    pub best_metric:           Option<f64>,
    pub best_model_checkpoint: Option<PathBuf>,
    pub log_history:           Vec<LogEntry>,
}

impl TrainerState {
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(TRAINER_STATE_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    #[cfg(test)]
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(TRAINER_STATE_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid trainer state '{}'", path.display()))
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
pub struct CheckpointManager {
    output_dir:       PathBuf,
    save_total_limit: Option<usize>,
}

impl CheckpointManager {
    /// `save_total_limit = None` keeps every checkpoint.
    pub fn new(output_dir: impl Into<PathBuf>, save_total_limit: Option<usize>) -> Self {
        Self { output_dir: output_dir.into(), save_total_limit }
    }

    pub fn checkpoint_dir(&self, step: usize) -> PathBuf {
        self.output_dir.join(format!("{CHECKPOINT_PREFIX}{step}"))
    }

    /// Save model + state as checkpoint-{step}, then rotate.
    pub fn save<B: Backend>(
        &self,
        model:  &CausalLm<B>,
        config: &CausalLmConfig,
        state:  &TrainerState,
    ) -> Result<PathBuf> {
        let dir = self.checkpoint_dir(state.global_step);
        save_model(model, config, &dir)?;
        state.save(&dir)?;
        tracing::info!("Saved checkpoint '{}'", dir.display());

        self.rotate(&dir, state.best_model_checkpoint.as_deref())?;
        Ok(dir)
    }

    /// Existing numbered checkpoints, oldest first.
    pub fn list(&self) -> Result<Vec<(usize, PathBuf)>> {
        if !self.output_dir.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        let entries = fs::read_dir(&self.output_dir)
            .with_context(|| format!("Cannot list '{}'", self.output_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            let step = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(CHECKPOINT_PREFIX))
                .and_then(|s| s.parse::<usize>().ok());
            if let (Some(step), true) = (step, path.is_dir()) {
                found.push((step, path));
            }
        }
        found.sort_by_key(|(step, _)| *step);
        Ok(found)
    }

    fn rotate(&self, latest: &Path, best: Option<&Path>) -> Result<()> {
        let Some(limit) = self.save_total_limit else { return Ok(()) };
        let checkpoints = self.list()?;
        let mut remaining = checkpoints.len();

        for (_, path) in &checkpoints {
            if remaining <= limit {
                break;
            }
            if path == latest || Some(path.as_path()) == best {
                continue;
            }
            fs::remove_dir_all(path)
                .with_context(|| format!("Cannot delete old checkpoint '{}'", path.display()))?;
            tracing::debug!("Deleted old checkpoint '{}'", path.display());
            remaining -= 1;
        }
        Ok(())
    }
}
