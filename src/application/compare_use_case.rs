// ============================================================
// Layer 2 — Compare Use Case
// ============================================================
// Puts every model variant in front of the same held-out
// question:
//
//   base       → the untrained pretrained model
//   slightly   → the local checkpoint from a short run
//   longer     → a reference model fine-tuned for longer
//   bigger     → optionally, a larger model on the hosted API
//
// then probes moderation with an off-topic question on the base
// and longer models. Each local model brings its own tokenizer.
//
// The moderation scan lists training answers that carry the
// deflection phrase, which is where the fine-tuned behaviour on
// off-topic questions comes from.

use anyhow::{bail, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::application::{report::render_comparison, train_use_case::model_source};
use crate::data::{
    loader::source_for,
    moderation::{find_moderated, MODERATION_PHRASE},
};
use crate::domain::{config::TrainingConfig, example::Example, traits::Completer};
use crate::infra::{checkpoint::Pretrained, hosted::HostedRunner, tokenizer_store::TextTokenizer};
use crate::ml::{backend::BackendTask, inferencer::LocalModel};

pub const MODERATION_PROBE: &str = "What do you think of Mars?";

pub const DEFAULT_LONGER_MODEL: &str = "lamini/lamini_docs_finetuned";

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub question: String,
    pub target:   String,
    /// (model label, answer) in presentation order
    pub answers:  Vec<(String, String)>,
    /// (model label, answer) to the off-topic probe
    pub probe:    Vec<(String, String)>,
}

pub struct CompareUseCase {
    config:           TrainingConfig,
    slightly_model:   String,
    longer_model:     String,
    bigger_hosted:    Option<String>,
    local_files_only: bool,
}

impl CompareUseCase {
    pub fn new(config: TrainingConfig, slightly_model: impl Into<String>, longer_model: impl Into<String>) -> Self {
        Self {
            config,
            slightly_model: slightly_model.into(),
            longer_model: longer_model.into(),
            bigger_hosted: None,
            local_files_only: false,
        }
    }

    pub fn with_bigger_hosted(mut self, model_name: Option<String>) -> Self {
        self.bigger_hosted = model_name;
        self
    }

    pub fn with_local_files_only(mut self, local_files_only: bool) -> Self {
        self.local_files_only = local_files_only;
        self
    }
}

fn load_local<B: AutodiffBackend>(
    label:            &str,
    name:             &str,
    local_files_only: bool,
    device:           &B::Device,
) -> Result<LocalModel<B::InnerBackend>> {
    let source = model_source(name, local_files_only);
    let tokenizer = TextTokenizer::from_source(&source)?;
    let loaded = Pretrained::<B::InnerBackend>::load(&source, device)?;
    Ok(LocalModel::new(label, loaded.model, tokenizer))
}

impl BackendTask for CompareUseCase {
    type Output = ComparisonReport;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<ComparisonReport> {
        let _span = tracing::info_span!("compare").entered();

        let splits = source_for(&self.config.datasets).load_splits()?;
        let Some(first) = splits.test.first().cloned() else {
            bail!("Test split of '{}' is empty, nothing to compare on", self.config.datasets.path);
        };

        let base     = load_local::<B>("base", &self.config.model.pretrained_name, self.local_files_only, &device)?;
        let slightly = load_local::<B>("finetuned slightly", &self.slightly_model, true, &device)?;
        let longer   = load_local::<B>("finetuned longer", &self.longer_model, self.local_files_only, &device)?;

        let mut models: Vec<Box<dyn Completer>> = vec![Box::new(base), Box::new(slightly), Box::new(longer)];
        if let Some(name) = &self.bigger_hosted {
            models.push(Box::new(HostedRunner::new(name.clone())?));
        }

        let mut answers = Vec::with_capacity(models.len());
        for model in &models {
            let answer = model.complete(&first.question)?;
            tracing::debug!("{} answered {} chars", model.label(), answer.len());
            answers.push((model.label().to_string(), answer));
        }
        println!("{}", render_comparison(&first.question, &first.answer, &answers));

        // Base (index 0) and longer (index 2) only
        let mut probe = Vec::new();
        for model in [&models[0], &models[2]] {
            let answer = model.complete(MODERATION_PROBE)?;
            println!("{MODERATION_PROBE} ({}): {answer}", model.label());
            probe.push((model.label().to_string(), answer));
        }

        Ok(ComparisonReport { question: first.question, target: first.answer, answers, probe })
    }
}

/// Print and return every training example carrying the moderation phrase.
pub fn run_moderation_scan(config: &TrainingConfig) -> Result<Vec<(usize, Example)>> {
    let _span = tracing::info_span!("moderation").entered();
    let splits = source_for(&config.datasets).load_splits()?;

    let hits: Vec<(usize, Example)> = find_moderated(&splits.train, MODERATION_PHRASE)
        .into_iter()
        .map(|(i, ex)| (i, ex.clone()))
        .collect();
    for (i, ex) in &hits {
        println!("{i} {} {}", ex.question, ex.answer);
    }
    println!("{}", hits.len());
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{DatasetSettings, ModelSettings};
    use crate::test_utils::{
        sample_examples, tiny_model_config, tiny_tokenizer, write_jsonl, TestAutodiffBackend, TestBackend,
    };
    use std::path::Path;

    fn save_model(dir: &Path) {
        let tok = tiny_tokenizer(dir);
        Pretrained::<TestBackend>::init(tiny_model_config(tok.vocab_size()), &Default::default())
            .unwrap()
            .save(dir)
            .unwrap();
    }

    fn config(dir: &Path, examples: &[Example]) -> TrainingConfig {
        let data = dir.join("docs.jsonl");
        write_jsonl(&data, examples);
        TrainingConfig {
            model: ModelSettings { pretrained_name: dir.join("base").display().to_string(), max_length: 32 },
            datasets: DatasetSettings { use_hf: false, path: data.display().to_string() },
            verbose: false,
        }
    }

    #[test]
    fn test_compare_three_local_models() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["base", "slightly", "longer"] {
            save_model(&dir.path().join(name));
        }
        let cfg = config(dir.path(), &sample_examples(10));

        let report = CompareUseCase::new(
            cfg,
            dir.path().join("slightly").display().to_string(),
            dir.path().join("longer").display().to_string(),
        )
        .with_local_files_only(true)
        .run::<TestAutodiffBackend>(Default::default())
        .unwrap();

        let labels: Vec<&str> = report.answers.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["base", "finetuned slightly", "finetuned longer"]);
        assert_eq!(report.probe.len(), 2);
        assert_eq!(report.probe[1].0, "finetuned longer");
    }

    #[test]
    fn test_moderation_scan_counts_phrase() {
        let dir = tempfile::tempdir().unwrap();
        let mut examples = sample_examples(20);
        for ex in examples.iter_mut().take(5) {
            ex.answer = "Let's keep the discussion relevant to Lamini.".into();
        }
        let cfg = config(dir.path(), &examples);

        let hits = run_moderation_scan(&cfg).unwrap();
        let splits = source_for(&cfg.datasets).load_splits().unwrap();
        let expected = splits.train.iter().filter(|e| e.answer.contains(MODERATION_PHRASE)).count();
        assert_eq!(hits.len(), expected);
        for (i, ex) in &hits {
            assert_eq!(&splits.train[*i], ex);
        }
    }
}
