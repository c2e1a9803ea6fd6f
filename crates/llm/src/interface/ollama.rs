use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{check_status, http_client, ChatMessage, GatewayRequest, LlmGateway};
use crate::{GatewayError, OllamaConfig};

const BACKEND: &str = "ollama";

pub struct OllamaGateway {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaGateway {
    pub fn new(
        config: &OllamaConfig,
        temperature: Option<f32>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(OllamaGateway {
            client: http_client(timeout)?,
            url: config.url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            temperature,
            timeout,
        })
    }
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn probe(&mut self) -> Result<(), GatewayError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.url))
            .send()
            .await
            .map_err(|err| GatewayError::from_http(BACKEND, self.timeout, err))?;

        check_status(BACKEND, self.timeout, response).await?;

        debug!("ollama is reachable at {}", self.url);
        Ok(())
    }

    async fn complete(&mut self, request: &GatewayRequest) -> Result<String, GatewayError> {
        let body = ChatRequest {
            model: &self.model,
            messages: ChatMessage::conversation(request),
            stream: false,
            options: self.temperature.map(|temperature| ChatOptions { temperature }),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::from_http(BACKEND, self.timeout, err))?;

        let response: ChatResponse = check_status(BACKEND, self.timeout, response)
            .await?
            .json()
            .await
            .map_err(|err| GatewayError::from_http(BACKEND, self.timeout, err))?;

        trace!("ollama replied {:?}", response.message.content);

        Ok(response.message.content.trim().to_owned())
    }
}
