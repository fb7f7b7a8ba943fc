//! Language model served by a local Ollama-compatible HTTP endpoint.
//!
//! - `GET  /api/tags`     lists installed models (availability probe)
//! - `POST /api/pull`     installs a model, streaming NDJSON progress
//! - `POST /api/generate` runs one non-streaming completion

use std::io::{BufRead, BufReader};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tt_core::completion::{
    Availability, CompletionError, DownloadMonitor, LanguageModel, PromptSession, SessionOptions,
};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);

pub struct HttpModel {
    endpoint: String,
    model: String,
    probe: ureq::Agent,
    generate: ureq::Agent,
    /// Pulls can take minutes; no global timeout.
    pull: ureq::Agent,
}

impl HttpModel {
    pub fn new(endpoint: &str, model: &str) -> Result<Self, CompletionError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(CompletionError::Setup(format!(
                "endpoint must be an http(s) URL: {endpoint}"
            )));
        }
        if model.trim().is_empty() {
            return Err(CompletionError::Setup("model name is empty".to_string()));
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            model: model.trim().to_string(),
            probe: agent(Some(PROBE_TIMEOUT)),
            generate: agent(Some(GENERATE_TIMEOUT)),
            pull: agent(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    /// Names of the models installed on the server.
    pub fn installed_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = self.url("/api/tags");
        let body = self
            .probe
            .get(&url)
            .call()
            .map_err(|e| CompletionError::Call(format!("{url}: {e}")))?
            .into_body()
            .read_to_string()
            .map_err(|e| CompletionError::Call(format!("{url}: {e}")))?;
        parse_tags(&body)
    }

    /// Install the model, forwarding byte progress to `monitor`.
    pub fn pull(&self, monitor: Option<&dyn DownloadMonitor>) -> Result<(), CompletionError> {
        let url = self.url("/api/pull");
        let request = serde_json::to_string(&PullRequest {
            model: &self.model,
            stream: true,
        })
        .map_err(|e| CompletionError::Setup(e.to_string()))?;
        info!(model = %self.model, "pulling model");

        let response = self
            .pull
            .post(&url)
            .header("Content-Type", "application/json")
            .send(request.as_str())
            .map_err(|e| CompletionError::Setup(format!("{url}: {e}")))?;
        let reader = BufReader::new(response.into_body().into_reader());
        for line in reader.lines() {
            let line = line.map_err(|e| CompletionError::Setup(format!("{url}: {e}")))?;
            match parse_pull_line(&line)? {
                Some(PullEvent::Progress { completed, total }) => {
                    if let Some(monitor) = monitor {
                        monitor.on_progress(completed, total);
                    }
                }
                Some(PullEvent::Status(status)) => {
                    debug!(%status, "pull status");
                    if status == "success" {
                        return Ok(());
                    }
                }
                None => {}
            }
        }
        Err(CompletionError::Setup(format!(
            "pull of {} ended without success",
            self.model
        )))
    }
}

impl LanguageModel for HttpModel {
    fn availability(&self) -> Availability {
        match self.installed_models() {
            Ok(models) if models.iter().any(|m| model_matches(m, &self.model)) => {
                Availability::Available
            }
            Ok(_) => Availability::NeedsSetup,
            Err(e) => {
                debug!("model server unreachable: {e}");
                Availability::Unavailable
            }
        }
    }

    fn create_session(
        &self,
        options: &SessionOptions<'_>,
    ) -> Result<Arc<dyn PromptSession>, CompletionError> {
        if self.availability() == Availability::NeedsSetup {
            self.pull(options.monitor.as_deref())?;
        }
        Ok(Arc::new(HttpSession {
            agent: self.generate.clone(),
            url: self.url("/api/generate"),
            model: self.model.clone(),
            system: options.system_prompt.to_string(),
        }))
    }
}

struct HttpSession {
    agent: ureq::Agent,
    url: String,
    model: String,
    system: String,
}

impl PromptSession for HttpSession {
    fn prompt(&self, input: &str) -> Result<String, CompletionError> {
        let request = serde_json::to_string(&GenerateRequest {
            model: &self.model,
            prompt: input,
            system: &self.system,
            stream: false,
        })
        .map_err(|e| CompletionError::Call(e.to_string()))?;
        let body = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/json")
            .send(request.as_str())
            .map_err(|e| CompletionError::Call(format!("{}: {e}", self.url)))?
            .into_body()
            .read_to_string()
            .map_err(|e| CompletionError::Call(format!("{}: {e}", self.url)))?;
        parse_generate(&body)
    }
}

fn agent(timeout: Option<Duration>) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(timeout)
        .build();
    ureq::Agent::new_with_config(config)
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PullRequest<'a> {
    model: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

#[derive(Deserialize)]
struct PullLine {
    #[serde(default)]
    status: String,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum PullEvent {
    Progress { completed: u64, total: u64 },
    Status(String),
}

fn parse_tags(body: &str) -> Result<Vec<String>, CompletionError> {
    let tags: TagsResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Malformed(format!("tags: {e}")))?;
    Ok(tags.models.into_iter().map(|m| m.name).collect())
}

fn parse_pull_line(line: &str) -> Result<Option<PullEvent>, CompletionError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let parsed: PullLine = serde_json::from_str(line)
        .map_err(|e| CompletionError::Malformed(format!("pull: {e}")))?;
    if let Some(error) = parsed.error {
        return Err(CompletionError::Setup(error));
    }
    Ok(match (parsed.completed, parsed.total) {
        (Some(completed), Some(total)) => Some(PullEvent::Progress { completed, total }),
        _ if parsed.status.is_empty() => None,
        _ => Some(PullEvent::Status(parsed.status)),
    })
}

fn parse_generate(body: &str) -> Result<String, CompletionError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Malformed(format!("generate: {e}")))?;
    if let Some(error) = parsed.error {
        return Err(CompletionError::Call(error));
    }
    parsed
        .response
        .ok_or_else(|| CompletionError::Malformed("generate: no response field".to_string()))
}

/// `llama3.2` matches an installed `llama3.2:latest`.
fn model_matches(installed: &str, wanted: &str) -> bool {
    let implicit = |name: &str| {
        if name.contains(':') {
            name.to_string()
        } else {
            format!("{name}:latest")
        }
    };
    implicit(installed) == implicit(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let body = r#"{"models":[{"name":"llama3.2:1b","size":1},{"name":"qwen2.5:latest"}]}"#;
        assert_eq!(parse_tags(body).unwrap(), vec!["llama3.2:1b", "qwen2.5:latest"]);
        assert!(parse_tags("{}").unwrap().is_empty());
        assert!(parse_tags("<html>").is_err());
    }

    #[test]
    fn test_parse_pull_lines() {
        assert_eq!(
            parse_pull_line(r#"{"status":"pulling manifest"}"#).unwrap(),
            Some(PullEvent::Status("pulling manifest".into()))
        );
        assert_eq!(
            parse_pull_line(r#"{"status":"downloading","digest":"sha256:ab","total":200,"completed":50}"#)
                .unwrap(),
            Some(PullEvent::Progress {
                completed: 50,
                total: 200
            })
        );
        assert_eq!(parse_pull_line("  ").unwrap(), None);
        assert!(matches!(
            parse_pull_line(r#"{"error":"pull model manifest: file does not exist"}"#),
            Err(CompletionError::Setup(_))
        ));
    }

    #[test]
    fn test_parse_generate() {
        let body = r#"{"model":"m","response":"the cat","done":true}"#;
        assert_eq!(parse_generate(body).unwrap(), "the cat");
        assert!(matches!(
            parse_generate(r#"{"error":"model not found"}"#),
            Err(CompletionError::Call(_))
        ));
        assert!(matches!(
            parse_generate(r#"{"done":true}"#),
            Err(CompletionError::Malformed(_))
        ));
    }

    #[test]
    fn test_model_matches() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("llama3.2:1b", "llama3.2:1b"));
        assert!(!model_matches("llama3.2:1b", "llama3.2"));
        assert!(!model_matches("qwen2.5:latest", "llama3.2"));
    }

    #[test]
    fn test_endpoint_validation() {
        let m = HttpModel::new("http://localhost:11434/", "llama3.2").unwrap();
        assert_eq!(m.endpoint(), "http://localhost:11434");
        assert_eq!(m.url("/api/tags"), "http://localhost:11434/api/tags");
        assert!(HttpModel::new("localhost:11434", "llama3.2").is_err());
        assert!(HttpModel::new(DEFAULT_ENDPOINT, " ").is_err());
    }

    #[test]
    fn test_unreachable_server_is_unavailable() {
        // Port 9 (discard) is essentially never serving HTTP.
        let m = HttpModel::new("http://127.0.0.1:9", "llama3.2").unwrap();
        assert_eq!(m.availability(), Availability::Unavailable);
    }
}
