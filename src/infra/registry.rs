// ============================================================
// Layer 6 — Artifact Registry
// ============================================================
// Resolves a model or dataset identifier to files on disk.
//
//   "lamini_docs_3_steps/final"  → existing local directory
//   "tokenizer.json"             → existing local file
//   "EleutherAI/pythia-70m"      → hub model repository
//   "lamini/lamini_docs"         → hub dataset repository
//
// Hub files are downloaded once into the hf-hub cache and the
// cached path is returned, so every caller ends up reading a
// plain local file.

use anyhow::{bail, Context, Result};
use hf_hub::{
    api::{sync::Api, RepoInfo},
    Cache, Repo, RepoType,
};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoKind {
    Model,
    Dataset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// A local directory, or a single file inside one
    Local(PathBuf),
    /// A repository id on the Hugging Face hub
    Hub { repo_id: String, kind: RepoKind },
}

impl ArtifactSource {
    /// Local if the identifier names something on disk, hub otherwise.
    pub fn resolve(name: &str, kind: RepoKind) -> Self {
        let path = Path::new(name);
        if path.exists() {
            ArtifactSource::Local(path.to_path_buf())
        } else {
            ArtifactSource::Hub { repo_id: name.to_string(), kind }
        }
    }

    /// Always local, even if nothing exists there yet.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        ArtifactSource::Local(path.into())
    }

    pub fn describe(&self) -> String {
        match self {
            ArtifactSource::Local(path)          => path.display().to_string(),
            ArtifactSource::Hub { repo_id, .. }  => format!("hub:{repo_id}"),
        }
    }

    /// Path of `file` within this source, downloading it if needed.
    pub fn fetch(&self, file: &str) -> Result<PathBuf> {
        match self {
            ArtifactSource::Local(path) => {
                let candidate = local_candidate(path, file);
                if !candidate.exists() {
                    bail!("'{}' not found under '{}'", file, path.display());
                }
                Ok(candidate)
            }
            ArtifactSource::Hub { repo_id, kind } => {
                let repo = hub_api()?.repo(hub_repo(repo_id, *kind));
                tracing::debug!("Fetching '{file}' from hub repo '{repo_id}'");
                repo.get(file)
                    .with_context(|| format!("Cannot fetch '{file}' from hub repo '{repo_id}'"))
            }
        }
    }

    /// Like `fetch`, but `Ok(None)` when the source does not have `file`.
    ///
    /// On the hub, absence means the repository listing does not name
    /// the file. Failing to reach or list the repository is an error.
    pub fn fetch_optional(&self, file: &str) -> Result<Option<PathBuf>> {
        match self {
            ArtifactSource::Local(path) => {
                let candidate = local_candidate(path, file);
                Ok(candidate.exists().then_some(candidate))
            }
            ArtifactSource::Hub { repo_id, kind } => {
                let repo = hub_repo(repo_id, *kind);
                if let Some(cached) = Cache::default().repo(repo.clone()).get(file) {
                    return Ok(Some(cached));
                }

                let api_repo = hub_api()?.repo(repo);
                let info = api_repo
                    .info()
                    .with_context(|| format!("Cannot list hub repo '{repo_id}'"))?;
                if !lists_file(&info, file) {
                    tracing::debug!("Hub repo '{repo_id}' has no '{file}'");
                    return Ok(None);
                }
                api_repo
                    .get(file)
                    .map(Some)
                    .with_context(|| format!("Cannot fetch '{file}' from hub repo '{repo_id}'"))
            }
        }
    }
}

/// A directory source holds `file`; a file source is a sibling of it.
fn local_candidate(path: &Path, file: &str) -> PathBuf {
    if path.is_file() {
        if path.file_name().and_then(|n| n.to_str()) == Some(file) {
            path.to_path_buf()
        } else {
            path.parent().unwrap_or(Path::new(".")).join(file)
        }
    } else {
        path.join(file)
    }
}

fn hub_api() -> Result<Api> {
    Api::new().context("Cannot initialise hub client")
}

fn hub_repo(repo_id: &str, kind: RepoKind) -> Repo {
    let repo_type = match kind {
        RepoKind::Model   => RepoType::Model,
        RepoKind::Dataset => RepoType::Dataset,
    };
    Repo::new(repo_id.to_string(), repo_type)
}

fn lists_file(info: &RepoInfo, file: &str) -> bool {
    info.siblings.iter().any(|s| s.rfilename == file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_path_resolves_to_hub() {
        let src = ArtifactSource::resolve("EleutherAI/pythia-70m", RepoKind::Model);
        assert_eq!(
            src,
            ArtifactSource::Hub { repo_id: "EleutherAI/pythia-70m".into(), kind: RepoKind::Model }
        );
    }

    #[test]
    fn test_existing_dir_resolves_to_local() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().to_str().unwrap();
        assert!(matches!(
            ArtifactSource::resolve(name, RepoKind::Model),
            ArtifactSource::Local(_)
        ));
    }

    #[test]
    fn test_fetch_from_dir_and_sibling_of_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

        let from_dir = ArtifactSource::local(dir.path());
        assert_eq!(from_dir.fetch("config.json").unwrap(), dir.path().join("config.json"));

        let from_file = ArtifactSource::local(dir.path().join("tokenizer.json"));
        assert_eq!(from_file.fetch("tokenizer.json").unwrap(), dir.path().join("tokenizer.json"));
        assert_eq!(from_file.fetch("config.json").unwrap(), dir.path().join("config.json"));
    }

    #[test]
    fn test_fetch_missing_local_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ArtifactSource::local(dir.path()).fetch("model.mpk").is_err());
    }

    #[test]
    fn test_fetch_optional_local_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("train.jsonl"), "").unwrap();
        let src = ArtifactSource::local(dir.path());
        assert_eq!(src.fetch_optional("train.jsonl").unwrap(), Some(dir.path().join("train.jsonl")));
        assert_eq!(src.fetch_optional("test.jsonl").unwrap(), None);
    }

    #[test]
    fn test_lists_file_matches_exact_names() {
        let info: RepoInfo = serde_json::from_str(
            r#"{"sha": "abc", "siblings": [{"rfilename": "train.jsonl"}, {"rfilename": "data/test.jsonl"}]}"#,
        )
        .unwrap();
        assert!(lists_file(&info, "train.jsonl"));
        assert!(!lists_file(&info, "test.jsonl"));
    }
}
