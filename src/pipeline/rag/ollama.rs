use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::orchestrator::LlmGenerate;
use super::RagError;

/// Sampling options sent with every generation request.
const TEMPERATURE: f64 = 0.7;
const TOP_P: f64 = 0.9;
const NUM_PREDICT: u32 = 512;

/// Ollama HTTP client for local LLM inference.
///
/// Wraps a blocking reqwest client: construct, call and drop it off the
/// async runtime (e.g. inside `spawn_blocking`).
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

impl<'a> OllamaGenerateRequest<'a> {
    /// Single non-streamed completion with the fixed sampling options.
    fn new(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                num_predict: NUM_PREDICT,
            },
        }
    }
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    top_p: f64,
    num_predict: u32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, RagError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Client bound to the primary model, or to the fallback when only the
    /// fallback is installed. If Ollama cannot be reached the primary is kept.
    pub fn with_preferred_model(
        base_url: &str,
        primary: &str,
        fallback: &str,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let mut client = Self::new(base_url, primary, timeout)?;
        match client.list_models() {
            Ok(available) => {
                let chosen = select_model(&available, primary, fallback);
                if chosen != primary {
                    tracing::warn!(primary, fallback = chosen, "Primary model not installed, using fallback");
                }
                client.model = chosen.to_string();
            }
            Err(e) => {
                tracing::warn!(error = %e, model = primary, "Could not list Ollama models, keeping primary");
            }
        }
        tracing::info!(model = %client.model, url = %client.base_url, "Language model selected");
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn list_models(&self) -> Result<Vec<String>, RagError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_connect() {
                RagError::OllamaConnection(self.base_url.clone())
            } else {
                RagError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| RagError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    pub fn is_model_available(&self, model: &str) -> Result<bool, RagError> {
        Ok(model_installed(&self.list_models()?, model))
    }
}

impl LlmGenerate for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest::new(&self.model, prompt);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    RagError::OllamaConnection(self.base_url.clone())
                } else if e.is_timeout() {
                    RagError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    RagError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RagError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| RagError::ResponseParsing(e.to_string()))?;

        Ok(strip_echoed_prompt(&parsed.response, prompt))
    }
}

/// Installed names carry a tag (`llama3.2:1b`, `all-minilm:latest`); a bare
/// name matches any tag.
fn model_installed(available: &[String], model: &str) -> bool {
    available.iter().any(|name| {
        name == model
            || (!model.contains(':') && name.split(':').next() == Some(model))
    })
}

/// Primary when installed, else the fallback when installed, else primary.
pub fn select_model<'a>(available: &[String], primary: &'a str, fallback: &'a str) -> &'a str {
    if model_installed(available, primary) {
        primary
    } else if model_installed(available, fallback) {
        fallback
    } else {
        primary
    }
}

/// Some models repeat the prompt before answering.
fn strip_echoed_prompt(output: &str, prompt: &str) -> String {
    output.replace(prompt, "").trim().to_string()
}

/// Mock LLM client for testing: returns a configurable response and
/// records every prompt it receives.
pub struct MockLlmClient {
    response: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmGenerate for MockLlmClient {
    fn generate(&self, prompt: &str) -> Result<String, RagError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.response
            .clone()
            .map_err(RagError::OllamaConnection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeOllama;
    use axum::http::StatusCode;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mock_client_returns_configured_response() {
        let client = MockLlmClient::new("test response");
        assert_eq!(client.generate("prompt").unwrap(), "test response");
        assert_eq!(client.prompts(), vec!["prompt".to_string()]);
    }

    #[test]
    fn failing_mock_returns_error() {
        let client = MockLlmClient::failing("down");
        assert!(matches!(client.generate("p"), Err(RagError::OllamaConnection(_))));
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "phi3:mini", Duration::from_secs(60)).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "phi3:mini");
        assert_eq!(client.timeout_secs, 60);
    }

    #[test]
    fn primary_model_preferred_when_installed() {
        let available = names(&["phi3:mini", "llama3.2:1b"]);
        assert_eq!(select_model(&available, "phi3:mini", "llama3.2:1b"), "phi3:mini");
    }

    #[test]
    fn fallback_used_when_primary_missing() {
        let available = names(&["llama3.2:1b"]);
        assert_eq!(select_model(&available, "phi3:mini", "llama3.2:1b"), "llama3.2:1b");
    }

    #[test]
    fn primary_kept_when_neither_installed() {
        assert_eq!(select_model(&[], "phi3:mini", "llama3.2:1b"), "phi3:mini");
    }

    #[test]
    fn bare_name_matches_any_tag() {
        let available = names(&["all-minilm:latest"]);
        assert!(model_installed(&available, "all-minilm"));
        assert!(!model_installed(&available, "all-minilm:l6"));
    }

    #[test]
    fn tagged_name_requires_exact_match() {
        let available = names(&["phi3:medium"]);
        assert!(!model_installed(&available, "phi3:mini"));
    }

    #[test]
    fn echoed_prompt_is_stripped() {
        let prompt = "Explain glucose. Answer:";
        let output = format!("{prompt}  Glucose is blood sugar.\n");
        assert_eq!(strip_echoed_prompt(&output, prompt), "Glucose is blood sugar.");
    }

    #[test]
    fn output_without_echo_is_trimmed_only() {
        assert_eq!(strip_echoed_prompt("  Fine.  ", "Q"), "Fine.");
    }

    #[test]
    fn unreachable_ollama_keeps_primary() {
        let client = OllamaClient::with_preferred_model(
            "http://127.0.0.1:9",
            "phi3:mini",
            "llama3.2:1b",
            Duration::from_secs(2),
        )
        .unwrap();
        assert_eq!(client.model(), "phi3:mini");
    }

    #[test]
    fn generate_request_carries_sampling_options() {
        let body = serde_json::to_value(OllamaGenerateRequest::new("phi3:mini", "Explain glucose")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "phi3:mini",
                "prompt": "Explain glucose",
                "stream": false,
                "options": { "temperature": 0.7, "top_p": 0.9, "num_predict": 512 }
            })
        );
    }

    #[test]
    fn generate_posts_prompt_and_strips_echo() {
        let prompt = "Explain glucose. Answer:";
        let ollama = FakeOllama::start(&[(
            "/api/generate",
            StatusCode::OK,
            json!({ "response": format!("{prompt} Glucose is blood sugar."), "done": true }),
        )]);
        let client = OllamaClient::new(&ollama.url(), "phi3:mini", Duration::from_secs(5)).unwrap();

        assert_eq!(client.generate(prompt).unwrap(), "Glucose is blood sugar.");

        let sent = ollama.requests("/api/generate");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["model"], "phi3:mini");
        assert_eq!(sent[0]["prompt"], prompt);
        assert_eq!(sent[0]["stream"], false);
        assert_eq!(sent[0]["options"]["num_predict"], 512);
    }

    #[test]
    fn generate_http_error_keeps_status_and_body() {
        let ollama = FakeOllama::start(&[(
            "/api/generate",
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "model 'phi3:mini' not found" }),
        )]);
        let client = OllamaClient::new(&ollama.url(), "phi3:mini", Duration::from_secs(5)).unwrap();

        match client.generate("hi") {
            Err(RagError::OllamaError { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("not found"), "body: {body}");
            }
            other => panic!("expected OllamaError, got {other:?}"),
        }
    }

    #[test]
    fn generate_unexpected_body_is_parse_error() {
        let ollama = FakeOllama::start(&[("/api/generate", StatusCode::OK, json!({ "text": "hi" }))]);
        let client = OllamaClient::new(&ollama.url(), "phi3:mini", Duration::from_secs(5)).unwrap();
        assert!(matches!(client.generate("hi"), Err(RagError::ResponseParsing(_))));
    }

    #[test]
    fn preferred_model_falls_back_per_installed_tags() {
        let ollama = FakeOllama::start(&[(
            "/api/tags",
            StatusCode::OK,
            json!({ "models": [
                { "name": "llama3.2:1b", "size": 1321098329 },
                { "name": "all-minilm:latest", "size": 45960996 }
            ] }),
        )]);

        let client =
            OllamaClient::with_preferred_model(&ollama.url(), "phi3:mini", "llama3.2:1b", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.model(), "llama3.2:1b");
        assert!(client.is_model_available("all-minilm").unwrap());
        assert!(!client.is_model_available("phi3:mini").unwrap());
    }

    #[test]
    fn preferred_model_kept_when_tags_fail() {
        let ollama = FakeOllama::start(&[("/api/tags", StatusCode::SERVICE_UNAVAILABLE, json!({}))]);
        let client =
            OllamaClient::with_preferred_model(&ollama.url(), "phi3:mini", "llama3.2:1b", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.model(), "phi3:mini");
        assert!(matches!(
            client.list_models(),
            Err(RagError::OllamaError { status: 503, .. })
        ));
    }
}
