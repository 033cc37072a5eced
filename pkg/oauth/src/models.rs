use common::Now;
use serde_json::{Map, Value};

use crate::{error::ExchangeError, params::Params};

/// The key under which providers return the OpenID Connect ID token.
pub const ID_TOKEN_KEY: &str = "id_token";

/// A code-for-token exchange handed to a [`crate::TokenExchanger`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRequest {
    /// Token request parameters, including `code` and `redirect_uri`.
    pub params: Params,
    /// Auxiliary options for the exchanger (`headers`, `auth_scheme`).
    pub options: Params,
}

impl ExchangeRequest {
    /// The authorization code being exchanged.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.params.get_str("code")
    }

    /// The redirect uri the authorization code was issued for.
    #[must_use]
    pub fn redirect_uri(&self) -> Option<&str> {
        self.params.get_str("redirect_uri")
    }
}

/// The result of a successful code-for-token exchange.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiry as seconds since the unix epoch.
    pub expires_at: Option<i64>,
    /// Every other field of the response, e.g. `id_token`, `token_type`.
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    /// Parses a token endpoint JSON body.
    ///
    /// `expires_at` is taken verbatim when present, otherwise derived from
    /// `expires_in` relative to `N::now()`. An `expires_in` that overflows
    /// the timestamp is treated as no expiry.
    ///
    /// # Errors
    /// - body is not an object
    /// - missing access token
    pub fn from_json<N: Now>(body: Value) -> Result<Self, ExchangeError> {
        let Value::Object(mut fields) = body else {
            return Err(ExchangeError::InvalidResponse(body));
        };

        let Some(Value::String(access_token)) = fields.remove("access_token") else {
            return Err(ExchangeError::InvalidResponse(Value::Object(fields)));
        };

        let refresh_token = match fields.remove("refresh_token") {
            Some(Value::String(token)) => Some(token),
            _ => None,
        };

        let expires_in = fields.remove("expires_in").as_ref().and_then(as_seconds);
        let expires_at = fields
            .remove("expires_at")
            .as_ref()
            .and_then(as_seconds)
            .or_else(|| expires_in.and_then(|secs| N::timestamp().checked_add(secs)));

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            extra: fields,
        })
    }

    /// Returns the raw ID token, if the provider issued one.
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.extra.get(ID_TOKEN_KEY).and_then(Value::as_str)
    }
}

/// Reads a number of seconds that some providers send as a string.
fn as_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
