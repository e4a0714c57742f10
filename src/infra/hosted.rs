// ============================================================
// Layer 6 — Hosted Fine-tuning Client
// ============================================================
// Blocking HTTP client for the hosted LLM service, the remote
// alternative to training locally:
//
//   complete(prompt)   POST /v1/completions        {model_name, prompt}
//                                                  → {output}
//   train(is_public)   POST /v1/train              {model_name, data, is_public}
//                                                  → {job_id}
//                      GET  /v1/train/jobs/{id}    until COMPLETED
//   evaluate()         GET  /v1/train/jobs/{id}/eval
//                                                  → {eval_results: [...]}
//
// Endpoint and key come from POWERML__PRODUCTION__URL and
// POWERML__PRODUCTION__KEY; the key is sent as a bearer token.
// Failed requests are returned as errors, never retried.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    thread,
    time::Duration,
};

use crate::domain::traits::Completer;

pub const URL_VAR: &str = "POWERML__PRODUCTION__URL";
pub const KEY_VAR: &str = "POWERML__PRODUCTION__KEY";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedConfig {
    pub url: String,
    pub key: String,
}

impl HostedConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::var(URL_VAR).ok(), std::env::var(KEY_VAR).ok())
    }

    fn from_vars(url: Option<String>, key: Option<String>) -> Result<Self> {
        let url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow!("{URL_VAR} is not set"))?;
        let key = key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("{KEY_VAR} is not set"))?;
        Ok(Self { url: url.trim_end_matches('/').to_string(), key })
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub input:  String,
    pub output: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model_name: &'a str,
    prompt:     &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    output: String,
}

#[derive(Serialize)]
struct TrainRequest<'a> {
    model_name: &'a str,
    data:       &'a [TrainingPair],
    is_public:  bool,
}

#[derive(Debug, Deserialize)]
struct TrainResponse {
    job_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    pub job_id:     String,
    pub status:     String,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalOutput {
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    pub input:   String,
    #[serde(default)]
    pub outputs: Vec<EvalOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResponse {
    pub eval_results: Vec<EvalResult>,
}

// ─── HostedRunner ─────────────────────────────────────────────────────────────

pub struct HostedRunner {
    config:        HostedConfig,
    client:        Client,
    model_name:    String,
    data:          Vec<TrainingPair>,
    job_id:        Option<String>,
    poll_interval: Duration,
}

impl HostedRunner {
    /// Runner for `model_name`, configured from the environment.
    pub fn new(model_name: impl Into<String>) -> Result<Self> {
        Self::with_config(HostedConfig::from_env()?, model_name)
    }

    pub fn with_config(config: HostedConfig, model_name: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Cannot build HTTP client")?;
        Ok(Self {
            config,
            client,
            model_name: model_name.into(),
            data: Vec::new(),
            job_id: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn model_name(&self) -> &str { &self.model_name }

    pub fn job_id(&self) -> Option<&str> { self.job_id.as_deref() }

    pub fn data(&self) -> &[TrainingPair] { &self.data }

    /// Register `{input, output}` pairs read from a JSON-lines file.
    /// Returns how many pairs were added.
    pub fn load_data_from_jsonlines(&mut self, path: &Path, input_key: &str, output_key: &str) -> Result<usize> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;

        let before = self.data.len();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Cannot read '{}'", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Value = serde_json::from_str(&line)
                .with_context(|| format!("Invalid record at {}:{}", path.display(), idx + 1))?;
            let field = |key: &str| {
                record
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| anyhow!("Missing '{key}' at {}:{}", path.display(), idx + 1))
            };
            self.data.push(TrainingPair { input: field(input_key)?, output: field(output_key)? });
        }

        let added = self.data.len() - before;
        tracing::info!("Registered {} training pairs from '{}'", added, path.display());
        Ok(added)
    }

    /// Submit a fine-tuning job and block until it completes.
    pub fn train(&mut self, is_public: bool) -> Result<JobStatus> {
        if self.data.is_empty() {
            bail!("No training data loaded; call load_data_from_jsonlines first");
        }

        let request = TrainRequest { model_name: &self.model_name, data: &self.data, is_public };
        let response: TrainResponse = self.post("/v1/train", &request)?;
        tracing::info!("Submitted hosted training job {}", response.job_id);
        self.job_id = Some(response.job_id.clone());

        loop {
            let status = self.job_status(&response.job_id)?;
            match status.status.to_ascii_uppercase().as_str() {
                "COMPLETED" => {
                    if let Some(name) = &status.model_name {
                        tracing::info!("Hosted job {} produced model '{}'", status.job_id, name);
                        self.model_name = name.clone();
                    }
                    return Ok(status);
                }
                "FAILED" | "CANCELLED" => {
                    bail!("Hosted training job {} ended with status {}", status.job_id, status.status)
                }
                other => {
                    tracing::debug!("Job {} is {}", status.job_id, other);
                    thread::sleep(self.poll_interval);
                }
            }
        }
    }

    pub fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.get(&format!("/v1/train/jobs/{job_id}"))
    }

    /// Evaluation results of the last training job.
    pub fn evaluate(&self) -> Result<EvalResponse> {
        let job_id = self
            .job_id
            .as_deref()
            .ok_or_else(|| anyhow!("No training job to evaluate; call train first"))?;
        self.get(&format!("/v1/train/jobs/{job_id}/eval"))
    }

    // ── HTTP helpers ──────────────────────────────────────────────────────────

    fn post<T: Serialize + ?Sized, R: DeserializeOwned>(&self, route: &str, body: &T) -> Result<R> {
        let url = format!("{}{route}", self.config.url);
        tracing::debug!("POST {url}");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.key)
            .json(body)
            .send()
            .with_context(|| format!("Request to {url} failed"))?;
        Self::decode(&url, response)
    }

    fn get<R: DeserializeOwned>(&self, route: &str) -> Result<R> {
        let url = format!("{}{route}", self.config.url);
        tracing::debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.key)
            .send()
            .with_context(|| format!("Request to {url} failed"))?;
        Self::decode(&url, response)
    }

    fn decode<R: DeserializeOwned>(url: &str, response: reqwest::blocking::Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("{url} returned {status}: {body}");
        }
        response
            .json::<R>()
            .with_context(|| format!("Unexpected response body from {url}"))
    }
}

impl Completer for HostedRunner {
    fn label(&self) -> &str { &self.model_name }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest { model_name: &self.model_name, prompt };
        let response: CompletionResponse = self.post("/v1/completions", &request)?;
        Ok(response.output)
    }
}
