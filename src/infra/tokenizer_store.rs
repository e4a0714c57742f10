// ============================================================
// Layer 6 — Tokenizer Adapter
// ============================================================
// Wraps a pretrained `tokenizers::Tokenizer` loaded from a
// tokenizer.json (local or hub) and fixes up the one thing the
// base checkpoints leave out: a padding token. Pythia style
// tokenizers define an end-of-sequence token but no pad token,
// so the pad id is aliased to the eos id.
//
// Truncation is done on the id sequence rather than through the
// tokenizer's own truncation settings:
//   encode              → keep the first `max_len` ids (prompts)
//   encode_for_training → keep the last `max_len` ids
//
// Neither raises an error when ids are dropped.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::infra::registry::ArtifactSource;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// End-of-sequence spellings, checked in order.
const EOS_CANDIDATES: [&str; 4] = ["<|endoftext|>", "</s>", "<eos>", "[SEP]"];

pub struct TextTokenizer {
    inner:  Tokenizer,
    eos_id: u32,
    pad_id: u32,
}

impl TextTokenizer {
    /// Load `tokenizer.json` from a local directory/file or a hub repo.
    pub fn from_source(source: &ArtifactSource) -> Result<Self> {
        let path = source.fetch(TOKENIZER_FILE)?;
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = Tokenizer::from_file(path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))?;
        Self::new(inner)
    }

    /// Wrap a tokenizer, aliasing the pad token to end-of-sequence.
    pub fn new(inner: Tokenizer) -> Result<Self> {
        let (eos_token, eos_id) = EOS_CANDIDATES
            .iter()
            .find_map(|tok| inner.token_to_id(tok).map(|id| (tok.to_string(), id)))
            .ok_or_else(|| anyhow!("Tokenizer defines none of the end-of-sequence tokens {EOS_CANDIDATES:?}"))?;

        tracing::debug!("Pad token aliased to eos '{}' (id {})", eos_token, eos_id);
        Ok(Self { inner, eos_id, pad_id: eos_id })
    }

    /// Encode `text`, silently keeping only the first `max_len` ids.
    pub fn encode(&self, text: &str, max_len: usize) -> Result<Vec<u32>> {
        let mut ids = self.encode_all(text)?;
        ids.truncate(max_len);
        Ok(ids)
    }

    /// Encode `text`, silently keeping only the last `max_len` ids.
    pub fn encode_for_training(&self, text: &str, max_len: usize) -> Result<Vec<u32>> {
        let ids = self.encode_all(text)?;
        let skip = ids.len().saturating_sub(max_len);
        Ok(ids[skip..].to_vec())
    }

    /// Decode ids back to text with special tokens stripped.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| anyhow!("Decode error: {e}"))
    }

    pub fn eos_id(&self) -> u32 { self.eos_id }

    pub fn pad_id(&self) -> u32 { self.pad_id }

    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// Write tokenizer.json into `dir` so a checkpoint is self-contained.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        let path = dir.join(TOKENIZER_FILE);
        self.inner
            .save(&path, true)
            .map_err(|e| anyhow!("Cannot write tokenizer to '{}': {}", path.display(), e))
    }

    fn encode_all(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .inner
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }
}
