// ============================================================
// Layer 2 — Init Use Case
// ============================================================
// Writes a freshly initialised base checkpoint:
//
//   <output_dir>/config.json  model.mpk  tokenizer.json
//
// so the walkthrough can run against a local directory without
// downloading weights. The architecture defaults to Pythia-70m
// sized for the tokenizer's vocabulary.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;
use std::path::PathBuf;

use crate::application::train_use_case::model_source;
use crate::infra::{checkpoint::Pretrained, tokenizer_store::TextTokenizer};
use crate::ml::{backend::BackendTask, model::CausalLmConfig};

pub struct InitUseCase {
    pub tokenizer:        String,
    pub output_dir:       PathBuf,
    pub local_files_only: bool,
    /// Overrides on top of the Pythia-70m shape
    pub hidden_size:      Option<usize>,
    pub num_layers:       Option<usize>,
    pub num_heads:        Option<usize>,
    pub max_positions:    Option<usize>,
}

impl InitUseCase {
    fn model_config(&self, vocab_size: usize) -> CausalLmConfig {
        let mut cfg = CausalLmConfig::pythia_70m(vocab_size);
        if let Some(h) = self.hidden_size {
            cfg.hidden_size = h;
            cfg.intermediate_size = 4 * h;
        }
        if let Some(n) = self.num_layers {
            cfg.num_hidden_layers = n;
        }
        if let Some(n) = self.num_heads {
            cfg.num_attention_heads = n;
        }
        if let Some(n) = self.max_positions {
            cfg.max_position_embeddings = n;
        }
        cfg
    }
}

impl BackendTask for InitUseCase {
    type Output = CausalLmConfig;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<CausalLmConfig> {
        let _span = tracing::info_span!("init", out = %self.output_dir.display()).entered();

        let tokenizer = TextTokenizer::from_source(&model_source(&self.tokenizer, self.local_files_only))?;
        let config = self.model_config(tokenizer.vocab_size());
        let pretrained = Pretrained::<B::InnerBackend>::init(config.clone(), &device)?;

        pretrained.save(&self.output_dir)?;
        tokenizer.save(&self.output_dir)?;
        println!(
            "Initialised {}-parameter model in {}",
            burn::module::Module::num_params(&pretrained.model),
            self.output_dir.display(),
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::registry::ArtifactSource;
    use crate::test_utils::{tiny_tokenizer, TestAutodiffBackend, TestBackend};

    #[test]
    fn test_init_writes_loadable_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let tok_dir = dir.path().join("tok");
        let tok = tiny_tokenizer(&tok_dir);
        let out = dir.path().join("base");

        let config = InitUseCase {
            tokenizer:        tok_dir.display().to_string(),
            output_dir:       out.clone(),
            local_files_only: true,
            hidden_size:      Some(16),
            num_layers:       Some(1),
            num_heads:        Some(2),
            max_positions:    Some(64),
        }
        .run::<TestAutodiffBackend>(Default::default())
        .unwrap();

        assert_eq!(config.vocab_size, tok.vocab_size());
        assert_eq!(config.intermediate_size, 64);
        let loaded = Pretrained::<TestBackend>::load(&ArtifactSource::local(&out), &Default::default()).unwrap();
        assert_eq!(loaded.config.num_hidden_layers, 1);
        assert!(out.join("tokenizer.json").exists());
    }
}
