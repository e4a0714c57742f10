// ============================================================
// Layer 4 — Tokenised Fine-tuning Dataset
// ============================================================
// Turns Examples into token id sequences for causal LM training:
//
//   question + answer  →  encode_for_training(max_length)
//
// Left truncation keeps the end of the text, i.e. the answer.
// Sequences are NOT padded here; the batcher pads each batch to
// its own longest row.
//
// Sequences shorter than two tokens have no next-token target
// and are dropped.

use anyhow::Result;
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::example::Example;
use crate::infra::tokenizer_store::TextTokenizer;

/// One tokenised training sequence, unpadded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedExample {
    pub input_ids: Vec<u32>,
}

impl TokenizedExample {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize { self.input_ids.len() }
}

pub struct FinetuneDataset {
    samples: Vec<TokenizedExample>,
}

impl FinetuneDataset {
    pub fn new(samples: Vec<TokenizedExample>) -> Self { Self { samples } }

    /// Tokenise `examples` and wrap them as a burn dataset.
    pub fn from_examples(
        examples:   &[Example],
        tokenizer:  &TextTokenizer,
        max_length: usize,
    ) -> Result<Self> {
        Ok(Self::new(tokenize_examples(examples, tokenizer, max_length)?))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Total tokens across all samples.
    pub fn token_count(&self) -> usize {
        self.samples.iter().map(TokenizedExample::len).sum()
    }
}

impl Dataset<TokenizedExample> for FinetuneDataset {
    fn get(&self, index: usize) -> Option<TokenizedExample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub fn tokenize_examples(
    examples:   &[Example],
    tokenizer:  &TextTokenizer,
    max_length: usize,
) -> Result<Vec<TokenizedExample>> {
    let mut out = Vec::with_capacity(examples.len());
    let mut dropped = 0usize;

    for example in examples {
        let input_ids = tokenizer.encode_for_training(&example.training_text(), max_length)?;
        if input_ids.len() < 2 {
            dropped += 1;
            continue;
        }
        out.push(TokenizedExample { input_ids });
    }

    if dropped > 0 {
        tracing::warn!("Dropped {} examples shorter than two tokens", dropped);
    }
    tracing::debug!("Tokenised {} examples (max_length {})", out.len(), max_length);
    Ok(out)
}
