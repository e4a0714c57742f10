// ============================================================
// Layer 3 — Training Configuration
// ============================================================
// The run-level configuration shared by tokenisation, model
// loading and training:
//
//   {
//     "model":    { "pretrained_name": "EleutherAI/pythia-70m",
//                   "max_length": 2048 },
//     "datasets": { "use_hf": true, "path": "lamini/lamini_docs" },
//     "verbose":  true
//   }
//
// Built once (from a JSON file or CLI flags), validated, and
// passed by reference from then on.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Local checkpoint directory or hub model id
    pub pretrained_name: String,
    /// Longest token sequence used for a training example
    pub max_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    /// true → `path` is a hub dataset id, false → a local .jsonl file
    pub use_hf: bool,
    pub path:   String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub model:    ModelSettings,
    pub datasets: DatasetSettings,
    #[serde(default)]
    pub verbose:  bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings {
                pretrained_name: "EleutherAI/pythia-70m".to_string(),
                max_length:      2048,
            },
            datasets: DatasetSettings {
                use_hf: true,
                path:   "lamini/lamini_docs".to_string(),
            },
            verbose: true,
        }
    }
}

impl TrainingConfig {
    /// Read and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Cannot write config '{}'", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.model.pretrained_name.trim().is_empty() {
            bail!("model.pretrained_name must not be empty");
        }
        if self.model.max_length == 0 {
            bail!("model.max_length must be at least 1");
        }
        if self.datasets.path.trim().is_empty() {
            bail!("datasets.path must not be empty");
        }
        Ok(())
    }
}
