// ============================================================
// Layer 5 — Greedy Autoregressive Generation
// ============================================================
// Repeatedly runs the model on the sequence so far and appends
// the arg-max token, until either
//   - the sequence (prompt included) reaches `max_length`, or
//   - the end-of-sequence token is produced.
//
// `max_length` counts the prompt, so a prompt that is already
// at or beyond it comes back unchanged.
//
// No key/value cache: every step re-encodes the window, which is
// cheap at the sequence lengths used here.

use anyhow::{bail, Result};
use burn::prelude::*;

use crate::ml::model::CausalLm;

pub fn generate_greedy<B: Backend>(
    model:      &CausalLm<B>,
    prompt:     &[u32],
    max_length: usize,
    eos_id:     Option<u32>,
) -> Result<Vec<u32>> {
    if prompt.is_empty() {
        bail!("Cannot generate from an empty prompt");
    }
    let device = model.device();
    let mut ids = prompt.to_vec();

    while ids.len() < max_length {
        // Only the most recent positions fit the model's context
        let start  = ids.len().saturating_sub(model.max_position_embeddings);
        let window: Vec<i32> = ids[start..].iter().map(|&x| x as i32).collect();
        let n = window.len();

        let input  = Tensor::<B, 1, Int>::from_ints(window.as_slice(), &device).reshape([1, n]);
        let logits = model.forward(input);
        let vocab  = logits.dims()[2];
        let last   = logits.slice([0..1, n - 1..n, 0..vocab]).reshape([vocab]);
        let next   = last.argmax(0).into_scalar().elem::<i64>() as u32;

        ids.push(next);
        if eos_id == Some(next) {
            break;
        }
    }

    tracing::trace!("Generated {} new tokens", ids.len() - prompt.len());
    Ok(ids)
}
