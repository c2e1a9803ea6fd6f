use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use crate::{GatewayError, LlmConfig, LlmProvider};

// local model server
pub mod ollama;

// hosted, OpenAI-compatible
pub mod openai;

// no model, echoes the operator's text
pub mod offline;

pub use offline::*;
pub use ollama::*;
pub use openai::*;

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub system_prompt: String,
    pub user_text: String,
}

/// A backend that turns a natural-language request into reply text.
///
/// Methods take `&mut self`, so whoever owns a gateway can have at most one
/// request in flight.
#[async_trait]
pub trait LlmGateway: Send {
    fn name(&self) -> &'static str;

    /// Checks that the backend is reachable without sending a prompt.
    async fn probe(&mut self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn complete(&mut self, request: &GatewayRequest) -> Result<String, GatewayError>;
}

pub fn connect(config: &LlmConfig) -> anyhow::Result<Box<dyn LlmGateway>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    debug!("connecting to {:?} backend", config.provider);

    let gateway: Box<dyn LlmGateway> = match config.provider {
        LlmProvider::Ollama => Box::new(
            OllamaGateway::new(&config.ollama, config.temperature, timeout)
                .context("failed to create ollama gateway")?,
        ),
        LlmProvider::OpenAi => Box::new(
            OpenAiGateway::new(&config.openai, config.temperature, timeout)
                .context("failed to create openai gateway")?,
        ),
        LlmProvider::Offline => Box::new(OfflineGateway),
    };

    Ok(gateway)
}

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build http client")
}

#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn conversation(request: &'a GatewayRequest) -> Vec<ChatMessage<'a>> {
        vec![
            ChatMessage {
                role: "system",
                content: &request.system_prompt,
            },
            ChatMessage {
                role: "user",
                content: &request.user_text,
            },
        ]
    }
}

/// Turns a non-success response into an error that carries the body text.
pub(crate) async fn check_status(
    backend: &'static str,
    timeout: Duration,
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .map_err(|err| GatewayError::from_http(backend, timeout, err))?;

    Err(GatewayError::unavailable(
        backend,
        format!("server returned {}: {}", status, body.trim()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_provider_connects_without_network() {
        let config = LlmConfig {
            provider: LlmProvider::Offline,
            ..Default::default()
        };

        let mut gateway = connect(&config).unwrap();
        assert_eq!(gateway.name(), "offline");
        gateway.probe().await.unwrap();
    }

    #[test]
    fn conversation_puts_system_prompt_first() {
        let request = GatewayRequest {
            system_prompt: "be terse".into(),
            user_text: "pan left".into(),
        };

        let messages = ChatMessage::conversation(&request);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "be terse");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "pan left");
    }
}
