use gl_client::{ChannelCommandSink, CommandSink};
use gl_gimbal::{GimbalCommand, GimbalRequest, GimbalResponse, GimbalSnapshot, InterpretError};
use gl_llm::{GatewayError, GatewayRequest, LlmGateway};
use thiserror::Error;

/// Everything that can end a single request. None of these are fatal to the
/// application.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("gimbal task did not respond: {0:#}")]
    Gimbal(anyhow::Error),
}

impl SessionError {
    fn from_gimbal(err: anyhow::Error) -> Self {
        match err.downcast::<InterpretError>() {
            Ok(err) => SessionError::Interpret(err),
            Err(err) => SessionError::Gimbal(err),
        }
    }
}

/// Carries one operator input at a time from text to gimbal.
pub struct Session {
    gateway: Box<dyn LlmGateway>,
    system_prompt: String,
    gimbal: ChannelCommandSink<GimbalRequest, GimbalResponse>,
    manual_step: f64,
}

impl Session {
    pub fn new(
        gateway: Box<dyn LlmGateway>,
        system_prompt: impl Into<String>,
        gimbal: ChannelCommandSink<GimbalRequest, GimbalResponse>,
        manual_step: f64,
    ) -> Self {
        Session {
            gateway,
            system_prompt: system_prompt.into(),
            gimbal,
            manual_step,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.gateway.name()
    }

    pub fn manual_step(&self) -> f64 {
        self.manual_step
    }

    pub async fn probe(&mut self) -> Result<(), SessionError> {
        Ok(self.gateway.probe().await?)
    }

    /// Sends natural-language text through the LLM and applies whatever it
    /// asked for. No retry on failure.
    pub async fn submit_text(&mut self, text: &str) -> Result<GimbalSnapshot, SessionError> {
        let request = GatewayRequest {
            system_prompt: self.system_prompt.clone(),
            user_text: text.to_owned(),
        };

        debug!("asking {} about {:?}", self.gateway.name(), text);
        let reply = self.gateway.complete(&request).await?;
        debug!("{} replied {:?}", self.gateway.name(), reply);

        self.gimbal
            .command(GimbalRequest::Interpret {
                reply,
                utterance: Some(text.to_owned()),
            })
            .await
            .map_err(SessionError::from_gimbal)
    }

    pub async fn submit_manual(
        &mut self,
        command: GimbalCommand,
    ) -> Result<GimbalSnapshot, SessionError> {
        self.gimbal
            .command(GimbalRequest::Manual(command))
            .await
            .map_err(SessionError::from_gimbal)
    }

    pub async fn status(&mut self) -> Result<GimbalSnapshot, SessionError> {
        self.gimbal
            .command(GimbalRequest::Status)
            .await
            .map_err(SessionError::from_gimbal)
    }
}
