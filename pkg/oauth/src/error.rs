use std::time::Duration;

use serde_json::Value;

/// Errors reported by a token exchanger.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExchangeError {
    #[error("failed to build request body")]
    BuildRequestBody(#[from] serde_urlencoded::ser::Error),

    #[error("failed to build http client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    #[error("failed to send request: {0}")]
    SendRequest(#[from] reqwest::Error),

    #[error("token exchange timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider rejected the token exchange ({status}): {payload}")]
    Provider { status: u16, payload: Value },

    #[error("invalid token response: {0}")]
    InvalidResponse(Value),
}
