// ============================================================
// Layer 2 — Ask Use Case
// ============================================================
// One question, one answer from a base or fine-tuned model:
//   1. Resolve the model (local checkpoint dir or hub id)
//   2. Load tokenizer + weights on the inference backend
//   3. Greedy completion with the echoed prompt removed

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;

use crate::application::train_use_case::model_source;
use crate::domain::traits::Completer;
use crate::infra::{checkpoint::Pretrained, tokenizer_store::TextTokenizer};
use crate::ml::{
    backend::BackendTask,
    inferencer::{LocalModel, DEFAULT_MAX_INPUT_TOKENS, DEFAULT_MAX_OUTPUT_TOKENS},
};

pub struct AskUseCase {
    model:             String,
    question:          String,
    local_files_only:  bool,
    max_input_tokens:  usize,
    max_output_tokens: usize,
}

impl AskUseCase {
    pub fn new(model: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            model:             model.into(),
            question:          question.into(),
            local_files_only:  false,
            max_input_tokens:  DEFAULT_MAX_INPUT_TOKENS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn with_limits(mut self, max_input_tokens: usize, max_output_tokens: usize) -> Self {
        self.max_input_tokens  = max_input_tokens;
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_local_files_only(mut self, local_files_only: bool) -> Self {
        self.local_files_only = local_files_only;
        self
    }
}

impl BackendTask for AskUseCase {
    type Output = String;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<String> {
        let _span = tracing::info_span!("ask", model = %self.model).entered();

        let source    = model_source(&self.model, self.local_files_only);
        let tokenizer = TextTokenizer::from_source(&source)?;
        let loaded    = Pretrained::<B::InnerBackend>::load(&source, &device)?;

        let local = LocalModel::new(self.model.clone(), loaded.model, tokenizer)
            .with_limits(self.max_input_tokens, self.max_output_tokens);
        local.complete(&self.question)
    }
}
