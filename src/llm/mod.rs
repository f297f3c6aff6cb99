//! Chat completion client
//!
//! Talks to an OpenAI-compatible /v1/chat/completions endpoint (LM Studio,
//! Ollama, vLLM and similar local servers all expose this shape). One bounded
//! request per call, no automatic retry; failures are classified so callers
//! can tell an unreachable server from a slow one from a malformed reply.

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl ChatClient {
    /// Build a client from config; the timeout is enforced per request
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Run one chat completion and return the model's text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!("Calling chat endpoint: {}", url);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Connectivity(format!(
                "Chat endpoint returned {}: {}",
                status,
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Chat response is not valid JSON: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(Error::Parse("Chat response contained no content".to_string()));
        }

        info!("Received {} chars from chat endpoint", content.len());
        Ok(content)
    }
}

/// Classify transport failures: a slow server and a missing one need
/// different user guidance
fn classify_request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("Chat request timed out: {}", err))
    } else if err.is_connect() {
        Error::Connectivity(format!(
            "Chat endpoint is unreachable ({}). Is the model server running?",
            err
        ))
    } else {
        Error::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(url: &str) -> LlmConfig {
        LlmConfig {
            base_url: url.to_string(),
            model: "test-model".to_string(),
            temperature: 0.7,
            timeout_secs: 2,
        }
    }

    #[tokio::test]
    async fn test_successful_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "{\"meals\": []}" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&config_for(&server.uri())).unwrap();
        let content = client.complete("system prompt", "user prompt").await.unwrap();
        assert_eq!(content, "{\"meals\": []}");
    }

    #[tokio::test]
    async fn test_empty_content_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "role": "assistant", "content": "   " } }
                ]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new(&config_for(&server.uri())).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ChatClient::new(&config_for(&server.uri())).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"choices": []}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = ChatClient::new(&config_for(&server.uri())).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connectivity() {
        // Port 9 (discard) is not listening
        let client = ChatClient::new(&config_for("http://127.0.0.1:9")).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::Connectivity(_) | Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_http_error_status_is_connectivity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let client = ChatClient::new(&config_for(&server.uri())).unwrap();
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, Error::Connectivity(_)));
    }
}
