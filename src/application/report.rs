// ============================================================
// Layer 2 — Reporting
// ============================================================
// Turns results into the plain-text output the walkthrough
// prints:
//
//   comparison block → question, target answer, one line per
//                      model answer
//   eval table       → hosted evaluation results as a table,
//                      every cell left- and top-aligned
//
// Multi-line cells keep their line breaks; shorter cells in the
// same row are padded below.

use std::fmt::Write as _;

use crate::infra::hosted::EvalResponse;

/// One row of the hosted evaluation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRow {
    pub question:      String,
    pub trained_model: String,
    pub base_model:    String,
}

pub const EVAL_HEADERS: [&str; 3] = ["Question", "Trained model", "Base model"];

/// outputs[0] is the trained model, outputs[1] the base model.
pub fn rows_from_eval(response: &EvalResponse) -> Vec<EvalRow> {
    response
        .eval_results
        .iter()
        .map(|result| {
            let output = |i: usize| result.outputs.get(i).map(|o| o.output.clone()).unwrap_or_default();
            EvalRow {
                question:      result.input.clone(),
                trained_model: output(0),
                base_model:    output(1),
            }
        })
        .collect()
}

pub fn render_eval_table(rows: &[EvalRow]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|r| vec![r.question.clone(), r.trained_model.clone(), r.base_model.clone()])
        .collect();
    render_table(&EVAL_HEADERS, &cells)
}

/// Left-aligned, top-aligned text table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (col, cell) in row.iter().enumerate().take(columns) {
            for line in cell.lines() {
                widths[col] = widths[col].max(line.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header_cells, &widths);

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));

    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let split: Vec<Vec<&str>> = (0..widths.len())
        .map(|col| row.get(col).map(|c| c.lines().collect()).unwrap_or_default())
        .collect();
    let height = split.iter().map(Vec::len).max().unwrap_or(0).max(1);

    for line_idx in 0..height {
        let parts: Vec<String> = split
            .iter()
            .zip(widths)
            .map(|(lines, &w)| format!("{:<w$}", lines.get(line_idx).copied().unwrap_or("")))
            .collect();
        let _ = writeln!(out, "{}", parts.join(" | ").trim_end());
    }
}

/// The question / target / per-model answer block.
pub fn render_comparison(question: &str, target: &str, answers: &[(String, String)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Question input (test): {question}");
    let _ = writeln!(out, "Correct answer from Lamini docs: {target}");
    for (label, answer) in answers {
        let _ = writeln!(out, "Model output ({label}): {answer}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::hosted::{EvalOutput, EvalResult};

    fn eval(input: &str, outputs: &[&str]) -> EvalResult {
        EvalResult {
            input:   input.into(),
            outputs: outputs.iter().map(|o| EvalOutput { output: o.to_string() }).collect(),
        }
    }

    #[test]
    fn test_rows_map_outputs_in_order() {
        let response = EvalResponse {
            eval_results: vec![eval("q1", &["trained", "base"]), eval("q2", &["only trained"])],
        };
        let rows = rows_from_eval(&response);
        assert_eq!(rows[0], EvalRow {
            question: "q1".into(),
            trained_model: "trained".into(),
            base_model: "base".into(),
        });
        assert_eq!(rows[1].base_model, "");
    }

    #[test]
    fn test_table_is_left_aligned() {
        let table = render_table(&["A", "B"], &[vec!["long cell".into(), "x".into()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "A         | B");
        assert_eq!(lines[1], "----------+--");
        assert_eq!(lines[2], "long cell | x");
    }

    #[test]
    fn test_multiline_cells_are_top_aligned() {
        let table = render_table(&["Q", "A"], &[vec!["one".into(), "first\nsecond".into()]]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[2], "one | first");
        assert_eq!(lines[3], "    | second");
    }

    #[test]
    fn test_comparison_lists_every_model() {
        let text = render_comparison("Q?", "A.", &[
            ("base".into(), "x".into()),
            ("finetuned".into(), "y".into()),
        ]);
        assert!(text.contains("Model output (base): x"));
        assert!(text.contains("Model output (finetuned): y"));
    }
}
