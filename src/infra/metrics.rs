// ============================================================
// Layer 6 — Training Log History
// ============================================================
// Every logging and evaluation event becomes one LogEntry. The
// entries are kept in trainer_state.json and also appended to
// a CSV for plotting:
//
//   output_dir/log_history.csv
//     step,epoch,loss,learning_rate,eval_loss
//     1,0.0500,2.913000,0.00000000,
//     2,0.1000,2.877100,0.00001000,
//     ...
//     120,6.0000,,,2.104400
//
// Fields an event does not carry are left empty.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

pub const LOG_HISTORY_FILE: &str = "log_history.csv";

/// One training or evaluation log event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub step:  usize,
    pub epoch: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_loss: Option<f64>,
}

impl LogEntry {
    pub fn train(step: usize, epoch: f64, loss: f64, learning_rate: f64) -> Self {
        Self { step, epoch, loss: Some(loss), learning_rate: Some(learning_rate), eval_loss: None }
    }

    pub fn eval(step: usize, epoch: f64, eval_loss: f64) -> Self {
        Self { step, epoch, loss: None, learning_rate: None, eval_loss: Some(eval_loss) }
    }

    fn csv_row(&self) -> String {
        let opt = |v: Option<f64>, precision: usize| {
            v.map(|x| format!("{x:.precision$}")).unwrap_or_default()
        };
        format!(
            "{},{:.4},{},{},{}",
            self.step,
            self.epoch,
            opt(self.loss, 6),
            opt(self.learning_rate, 8),
            opt(self.eval_loss, 6),
        )
    }
}

/// Appends log entries to `log_history.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join(LOG_HISTORY_FILE);
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,epoch,loss,learning_rate,eval_loss")?;
            tracing::debug!("Created log history: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, entry: &LogEntry) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", entry.csv_row())?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_are_empty_cells() {
        assert_eq!(LogEntry::eval(120, 6.0, 2.1044).csv_row(), "120,6.0000,,,2.104400");
        assert_eq!(
            LogEntry::train(2, 0.1, 2.8771, 1e-5).csv_row(),
            "2,0.1000,2.877100,0.00001000,"
        );
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&LogEntry::train(1, 0.5, 3.0, 0.0)).unwrap();

        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&LogEntry::eval(1, 0.5, 2.5)).unwrap();

        let text = fs::read_to_string(again.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "step,epoch,loss,learning_rate,eval_loss");
    }

    #[test]
    fn test_json_skips_absent_fields() {
        let json = serde_json::to_string(&LogEntry::eval(3, 1.0, 1.5)).unwrap();
        assert!(!json.contains("learning_rate"));
        let back: LogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.eval_loss, Some(1.5));
    }
}
