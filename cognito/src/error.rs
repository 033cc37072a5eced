use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use oauth::ExchangeError;
use serde_json::json;
use thiserror::Error;

use crate::callback::Phase;

/// Error for invalid or incomplete configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidVar { key: &'static str, value: String },

    #[error("jwt_verify is enabled but no jwt_key is configured")]
    MissingJwtKey,

    #[error("jwt_verify is enabled but no algorithm is configured")]
    MissingAlgorithm,

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid jwt key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),

    #[error("missing site")]
    MissingSite,

    #[error("exchange timeout must be greater than zero")]
    InvalidTimeout,

    #[error("failed to build token exchanger: {0}")]
    BuildExchanger(#[from] ExchangeError),
}

/// Error for [`crate::Strategy::callback_phase`].
///
/// Every variant is terminal for the callback it was raised in.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CallbackError {
    #[error("provider denied the login: {error}")]
    ProviderDenied {
        error: String,
        description: Option<String>,
    },

    #[error("state mismatch in oauth flow")]
    CsrfStateMismatch,

    #[error("missing authorization code")]
    MissingCode,

    #[error("token exchange failed: {0}")]
    TokenExchange(#[from] ExchangeError),

    #[error("missing id token")]
    MissingIdToken,

    #[error("malformed id token: {0}")]
    MalformedToken(#[source] MalformedTokenError),

    #[error("id token signature verification failed: {0}")]
    SignatureVerification(#[source] jsonwebtoken::errors::Error),

    #[error("missing claim: {0}")]
    MissingClaim(&'static str),
}

impl CallbackError {
    /// The callback phase the error was raised in.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::ProviderDenied { .. } | Self::CsrfStateMismatch | Self::MissingCode => {
                Phase::AwaitingCallback
            }
            Self::TokenExchange(_) => Phase::ExchangingToken,
            Self::MissingIdToken | Self::MalformedToken(_) | Self::SignatureVerification(_) => {
                Phase::VerifyingToken
            }
            Self::MissingClaim(_) => Phase::ExtractingClaims,
        }
    }

    /// Short failure reason handed to the end user.
    #[must_use]
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::CsrfStateMismatch => "csrf_detected",
            Self::ProviderDenied { .. } | Self::MissingCode | Self::TokenExchange(_) => {
                "invalid_credentials"
            }
            Self::MissingIdToken | Self::MalformedToken(_) | Self::MissingClaim(_) => {
                "invalid_id_token"
            }
            Self::SignatureVerification(_) => "invalid_signature",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TokenExchange(ExchangeError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::TokenExchange(ExchangeError::Provider { .. }) => StatusCode::UNAUTHORIZED,
            Self::TokenExchange(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message_key() }));
        (self.status_code(), body).into_response()
    }
}

/// Why an ID token could not be read as a compact JWS.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MalformedTokenError {
    #[error("expected three dot separated segments")]
    Segments,

    #[error("segment is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("segment is not a json object: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Error for [`crate::Strategy::request_phase`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RequestPhaseError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to generate authorization url: {0}")]
    GenerateAuthorizationUrl(#[from] url::ParseError),
}

impl IntoResponse for RequestPhaseError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
