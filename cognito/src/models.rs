use oauth::TokenResponse;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::claims::{ClaimSet, Identity};

/// The outcome of a successful callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthRecord {
    pub provider: String,
    pub uid: String,
    pub info: Map<String, Value>,
    pub credentials: Credentials,
    pub extra: Extra,
}

/// Tokens issued by the provider, copied verbatim from the exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub token: String,
    pub refresh_token: Option<String>,
    /// The raw, unparsed ID token.
    pub id_token: String,
    /// Expiry of the access token as seconds since the unix epoch.
    pub expires_at: Option<i64>,
    pub expires: bool,
}

impl Credentials {
    pub(crate) fn new(token: TokenResponse, id_token: String) -> Self {
        Self {
            expires: token.expires_at.is_some(),
            expires_at: token.expires_at,
            token: token.access_token,
            refresh_token: token.refresh_token,
            id_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extra {
    pub raw_info: ClaimSet,
}

impl AuthRecord {
    pub(crate) fn new(provider: &str, identity: Identity, credentials: Credentials) -> Self {
        Self {
            provider: provider.to_string(),
            uid: identity.uid,
            info: identity.info,
            credentials,
            extra: Extra {
                raw_info: identity.raw_info,
            },
        }
    }
}
