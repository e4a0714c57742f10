// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Loads question/answer examples from JSON lines:
//
//   {"question": "How do I ...?", "answer": "You can ..."}
//   {"question": "...",           "answer": "..."}
//
// Two sources implement ExampleSource:
//
//   JsonlSource       → a local .jsonl file, split here with a
//                       seeded shuffle (10% test)
//   HubDatasetSource  → a hub dataset repository providing
//                       train.jsonl and, usually, test.jsonl
//
// Blank lines are skipped. Any other line that is not a valid
// record aborts the load with the file and line number.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::data::splitter::{split_train_test, SPLIT_SEED, TEST_FRACTION};
use crate::domain::config::DatasetSettings;
use crate::domain::example::{DatasetSplits, Example, RawRecord};
use crate::domain::traits::ExampleSource;
use crate::infra::registry::{ArtifactSource, RepoKind};

/// Read every record of a JSON-lines file, in file order.
pub fn read_jsonl(path: &Path) -> Result<Vec<Example>> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open dataset '{}'", path.display()))?;

    let mut examples = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: RawRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid record at {}:{}", path.display(), idx + 1))?;
        examples.push(Example::from(raw));
    }

    tracing::debug!("Read {} examples from '{}'", examples.len(), path.display());
    Ok(examples)
}

/// A local JSON-lines file, split into train/test on load.
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for JsonlSource {
    fn load_splits(&self) -> Result<DatasetSplits> {
        let examples = read_jsonl(&self.path)?;
        let (train, test) = split_train_test(examples, TEST_FRACTION, SPLIT_SEED);
        Ok(DatasetSplits::new(train, test))
    }
}

/// A hub dataset repository with pre-made splits.
pub struct HubDatasetSource {
    repo: ArtifactSource,
}

impl HubDatasetSource {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self::from_source(ArtifactSource::Hub { repo_id: repo_id.into(), kind: RepoKind::Dataset })
    }

    /// Any source laid out like a dataset repository.
    pub fn from_source(repo: ArtifactSource) -> Self {
        Self { repo }
    }
}

impl ExampleSource for HubDatasetSource {
    fn load_splits(&self) -> Result<DatasetSplits> {
        let train_path = self.repo.fetch("train.jsonl")?;
        let train = read_jsonl(&train_path)?;

        match self.repo.fetch_optional("test.jsonl")? {
            Some(test_path) => Ok(DatasetSplits::new(train, read_jsonl(&test_path)?)),
            None => {
                tracing::warn!(
                    "No test split in {}; holding out {:.0}% of train",
                    self.repo.describe(),
                    TEST_FRACTION * 100.0,
                );
                let (train, test) = split_train_test(train, TEST_FRACTION, SPLIT_SEED);
                Ok(DatasetSplits::new(train, test))
            }
        }
    }
}

/// Pick the source described by the run configuration.
pub fn source_for(settings: &DatasetSettings) -> Box<dyn ExampleSource> {
    if settings.use_hf {
        Box::new(HubDatasetSource::new(settings.path.clone()))
    } else {
        Box::new(JsonlSource::new(settings.path.clone()))
    }
}
