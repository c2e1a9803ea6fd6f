use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{backend} is unavailable: {reason}")]
    Unavailable {
        backend: &'static str,
        reason: String,
    },

    #[error("{backend} did not answer within {timeout:?}")]
    Timeout {
        backend: &'static str,
        timeout: Duration,
    },
}

impl GatewayError {
    pub(crate) fn unavailable(backend: &'static str, reason: impl ToString) -> Self {
        GatewayError::Unavailable {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Sorts a transport error into timeout or unavailable.
    pub(crate) fn from_http(backend: &'static str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout { backend, timeout }
        } else {
            GatewayError::unavailable(backend, err)
        }
    }
}
