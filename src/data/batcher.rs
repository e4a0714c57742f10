// ============================================================
// Layer 4 — Causal LM Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<TokenizedExample>
// into tensors for the forward pass.
//
// Sequences have different lengths, so each batch is padded on
// the right to its longest row:
//
//   row 0: [t t t t t]          mask [1 1 1 1 1]
//   row 1: [t t t P P]          mask [1 1 1 0 0]
//
// P is the pad id (the tokenizer's eos). Padded positions are
// excluded from the loss through the attention mask.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TokenizedExample;

// ─── CausalLmBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct CausalLmBatch<B: Backend> {
    /// [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// [batch_size, seq_len], 1 = real token, 0 = padding
    pub attention_mask: Tensor<B, 2, Int>,
}

impl<B: Backend> CausalLmBatch<B> {
    /// Number of real (unpadded) tokens in the batch.
    pub fn token_count(&self) -> usize {
        self.attention_mask.clone().sum().into_scalar().elem::<i64>() as usize
    }
}

// ─── CausalLmBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct CausalLmBatcher<B: Backend> {
    pub device: B::Device,
    pub pad_id: u32,
}

impl<B: Backend> CausalLmBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }
}

impl<B: Backend> Batcher<TokenizedExample, CausalLmBatch<B>> for CausalLmBatcher<B> {
    fn batch(&self, items: Vec<TokenizedExample>) -> CausalLmBatch<B> {
        let batch_size = items.len();
        let seq_len = items.iter().map(TokenizedExample::len).max().unwrap_or(0);

        let mut input_flat = Vec::with_capacity(batch_size * seq_len);
        let mut mask_flat  = Vec::with_capacity(batch_size * seq_len);

        for item in &items {
            let pad = seq_len - item.len();
            input_flat.extend(item.input_ids.iter().map(|&x| x as i32));
            input_flat.extend(std::iter::repeat(self.pad_id as i32).take(pad));
            mask_flat.extend(std::iter::repeat(1i32).take(item.len()));
            mask_flat.extend(std::iter::repeat(0i32).take(pad));
        }

        let input_ids = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        CausalLmBatch { input_ids, attention_mask }
    }
}
