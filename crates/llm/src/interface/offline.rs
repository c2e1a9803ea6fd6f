use async_trait::async_trait;

use super::{GatewayRequest, LlmGateway};
use crate::GatewayError;

pub struct OfflineGateway;

#[async_trait]
impl LlmGateway for OfflineGateway {
    fn name(&self) -> &'static str {
        "offline"
    }

    async fn complete(&mut self, request: &GatewayRequest) -> Result<String, GatewayError> {
        Ok(request.user_text.clone())
    }
}
