// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the workflow and its collaborators:
//
//   ExampleSource → where question/answer data comes from
//                   (local .jsonl file, hub dataset repo)
//   Completer     → anything that turns a prompt into a
//                   completion (local model, hosted model)
//
// The comparison workflow only sees `dyn Completer`, so a local
// burn model and a remote hosted model sit side by side in the
// same report.

use anyhow::Result;

use crate::domain::example::DatasetSplits;

/// A source of question/answer examples, already split.
pub trait ExampleSource {
    fn load_splits(&self) -> Result<DatasetSplits>;
}

/// Anything that can answer a prompt with generated text.
pub trait Completer {
    /// Short label used in printed reports
    fn label(&self) -> &str;

    /// Return only the completion, never the echoed prompt.
    fn complete(&self, prompt: &str) -> Result<String>;
}
