// ============================================================
// Layer 2 — Hosted Fine-tuning Use Case
// ============================================================
// Fine-tuning without local compute:
//   1. register question/answer pairs from a .jsonl file
//   2. submit a training job and wait for it
//   3. fetch the evaluation results and print them as a table
//      (question, trained model output, base model output)

use anyhow::Result;
use std::path::PathBuf;

use crate::application::report::{render_eval_table, rows_from_eval, EvalRow};
use crate::infra::hosted::HostedRunner;

pub struct HostedUseCase {
    pub model_name: String,
    pub data_path:  PathBuf,
    pub input_key:  String,
    pub output_key: String,
    pub is_public:  bool,
}

impl HostedUseCase {
    pub fn execute(&self) -> Result<Vec<EvalRow>> {
        let runner = HostedRunner::new(self.model_name.clone())?;
        self.execute_with(runner)
    }

    fn execute_with(&self, mut runner: HostedRunner) -> Result<Vec<EvalRow>> {
        let _span = tracing::info_span!("hosted", model = %self.model_name).entered();

        runner.load_data_from_jsonlines(&self.data_path, &self.input_key, &self.output_key)?;
        let job = runner.train(self.is_public)?;
        println!("Hosted job {} finished: {}", job.job_id, job.status);

        let rows = rows_from_eval(&runner.evaluate()?);
        println!("{}", render_eval_table(&rows));
        Ok(rows)
    }
}
