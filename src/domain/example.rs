// ============================================================
// Layer 3 — Example Domain Type
// ============================================================
// A single question/answer record from the fine-tuning dataset.
//
// Dataset files come in three shapes, all of which collapse
// into the same Example:
//   {"question": "...", "answer": "..."}
//   {"input": "...",    "output": "..."}
//   {"text": "..."}                       → answer is empty
//
// Extra keys on a record are ignored.

use serde::{Deserialize, Serialize};

/// One question/answer pair. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub question: String,
    pub answer:   String,
}

impl Example {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer:   answer.into(),
        }
    }

    /// The text the model is trained on: question immediately followed
    /// by the answer, with no separator between them.
    pub fn training_text(&self) -> String {
        format!("{}{}", self.question, self.answer)
    }
}

/// The accepted on-disk record shapes.
///
/// `untagged` tries each variant in order, so a record carrying both
/// `question`/`answer` and `text` resolves to the question/answer form.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawRecord {
    QuestionAnswer { question: String, answer: String },
    InputOutput    { input: String, output: String },
    Text           { text: String },
}

impl From<RawRecord> for Example {
    fn from(raw: RawRecord) -> Self {
        match raw {
            RawRecord::QuestionAnswer { question, answer } => Example::new(question, answer),
            RawRecord::InputOutput { input, output }       => Example::new(input, output),
            RawRecord::Text { text }                       => Example::new(text, String::new()),
        }
    }
}

/// A dataset partitioned into train and test splits.
#[derive(Debug, Clone, Default)]
pub struct DatasetSplits {
    pub train: Vec<Example>,
    pub test:  Vec<Example>,
}

impl DatasetSplits {
    pub fn new(train: Vec<Example>, test: Vec<Example>) -> Self {
        Self { train, test }
    }
}
