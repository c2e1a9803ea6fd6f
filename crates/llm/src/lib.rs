pub mod config;
pub mod error;
pub mod interface;
pub mod prompt;

pub use config::*;
pub use error::*;
pub use interface::{connect, GatewayRequest, LlmGateway};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
