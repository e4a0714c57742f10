// ============================================================
// Layer 5 — Inference Helper
// ============================================================
// text → completion for a loaded model:
//
//   1. encode the prompt (truncated to `max_input_tokens`)
//   2. greedy generation up to `max_output_tokens` in total,
//      prompt included
//   3. decode everything with special tokens stripped
//   4. drop the first len(text) characters, i.e. the echoed prompt
//
// If the decoded text is shorter than the prompt the result is
// an empty string rather than an error.

use anyhow::Result;
use burn::prelude::*;

use crate::domain::traits::Completer;
use crate::infra::tokenizer_store::TextTokenizer;
use crate::ml::{generation::generate_greedy, model::CausalLm};

pub const DEFAULT_MAX_INPUT_TOKENS:  usize = 1000;
pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 100;

pub fn inference<B: Backend>(
    text:              &str,
    model:             &CausalLm<B>,
    tokenizer:         &TextTokenizer,
    max_input_tokens:  usize,
    max_output_tokens: usize,
) -> Result<String> {
    let input_ids = tokenizer.encode(text, max_input_tokens)?;
    let generated = generate_greedy(model, &input_ids, max_output_tokens, Some(tokenizer.eos_id()))?;
    let with_prompt = tokenizer.decode(&generated)?;
    Ok(strip_prompt(&with_prompt, text))
}

/// Everything after the first `prompt.chars().count()` characters.
pub fn strip_prompt(generated: &str, prompt: &str) -> String {
    generated.chars().skip(prompt.chars().count()).collect()
}

/// A loaded model + tokenizer pair usable wherever a `Completer` is.
pub struct LocalModel<B: Backend> {
    label:             String,
    model:             CausalLm<B>,
    tokenizer:         TextTokenizer,
    max_input_tokens:  usize,
    max_output_tokens: usize,
}

impl<B: Backend> LocalModel<B> {
    pub fn new(label: impl Into<String>, model: CausalLm<B>, tokenizer: TextTokenizer) -> Self {
        Self {
            label: label.into(),
            model,
            tokenizer,
            max_input_tokens:  DEFAULT_MAX_INPUT_TOKENS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_limits(mut self, max_input_tokens: usize, max_output_tokens: usize) -> Self {
        self.max_input_tokens  = max_input_tokens;
        self.max_output_tokens = max_output_tokens;
        self
    }
}

impl<B: Backend> Completer for LocalModel<B> {
    fn label(&self) -> &str { &self.label }

    fn complete(&self, prompt: &str) -> Result<String> {
        inference(prompt, &self.model, &self.tokenizer, self.max_input_tokens, self.max_output_tokens)
    }
}
