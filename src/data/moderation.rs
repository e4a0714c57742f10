// ============================================================
// Layer 4 — Moderation Scan
// ============================================================
// The docs dataset teaches the model to deflect off-topic
// questions with a fixed phrase. Listing the training answers
// that contain it shows where that behaviour comes from.

use crate::domain::example::Example;

pub const MODERATION_PHRASE: &str = "keep the discussion relevant to Lamini";

/// (index, example) for every example whose answer contains `phrase`.
pub fn find_moderated<'a>(examples: &'a [Example], phrase: &str) -> Vec<(usize, &'a Example)> {
    examples
        .iter()
        .enumerate()
        .filter(|(_, ex)| ex.answer.contains(phrase))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_answers_with_phrase_in_order() {
        let examples = vec![
            Example::new("What is Lamini?", "An LLM engine."),
            Example::new("Tell me a joke", "Let's keep the discussion relevant to Lamini."),
            Example::new("Weather?", "I can only keep the discussion relevant to Lamini"),
        ];
        let hits = find_moderated(&examples, MODERATION_PHRASE);
        let idx: Vec<usize> = hits.iter().map(|(i, _)| *i).collect();
        assert_eq!(idx, vec![1, 2]);
        assert_eq!(hits[0].1.question, "Tell me a joke");
    }

    #[test]
    fn test_question_text_is_not_scanned() {
        let examples = vec![Example::new("keep the discussion relevant to Lamini", "ok")];
        assert!(find_moderated(&examples, MODERATION_PHRASE).is_empty());
    }
}
