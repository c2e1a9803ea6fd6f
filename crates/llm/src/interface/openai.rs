use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{check_status, http_client, ChatMessage, GatewayRequest, LlmGateway};
use crate::{GatewayError, OpenAiConfig};

const BACKEND: &str = "openai";

pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    timeout: Duration,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiGateway {
    pub fn new(
        config: &OpenAiConfig,
        temperature: Option<f32>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(OpenAiGateway {
            client: http_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            temperature,
            timeout,
        })
    }
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn probe(&mut self) -> Result<(), GatewayError> {
        if self.api_key.is_none() {
            return Err(GatewayError::unavailable(BACKEND, "no API key configured"));
        }
        Ok(())
    }

    async fn complete(&mut self, request: &GatewayRequest) -> Result<String, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::unavailable(BACKEND, "no API key configured"))?;

        let body = CompletionRequest {
            model: &self.model,
            messages: ChatMessage::conversation(request),
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::from_http(BACKEND, self.timeout, err))?;

        let response: CompletionResponse = check_status(BACKEND, self.timeout, response)
            .await?
            .json()
            .await
            .map_err(|err| GatewayError::from_http(BACKEND, self.timeout, err))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::unavailable(BACKEND, "reply contained no message"))?;

        trace!("openai replied {:?}", content);

        Ok(content.trim().to_owned())
    }
}
