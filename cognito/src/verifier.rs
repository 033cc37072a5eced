//! Decoding of ID tokens.
//!
//! Neither strategy validates claim contents (`exp`, `nbf`, `aud`, `iss`).
//! The verified strategy only guarantees signature integrity.
use std::{fmt, str::FromStr};

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde_json::{Map, Value};

use crate::{
    claims::ClaimSet,
    config::Config,
    error::{CallbackError, ConfigError, MalformedTokenError},
};

/// Decodes ID tokens into claim sets.
///
/// The strategy is picked once from the configuration.
pub enum TokenVerifier {
    /// Reads the payload without checking the signature or interpreting the
    /// header `alg`. Only suitable when the token was received over a
    /// trusted channel straight from the identity provider.
    Untrusted,
    /// Checks the signature against a fixed key and algorithm.
    Verified {
        key: DecodingKey,
        algorithm: Algorithm,
    },
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untrusted => write!(f, "Untrusted"),
            Self::Verified { algorithm, .. } => f
                .debug_struct("Verified")
                .field("algorithm", algorithm)
                .finish_non_exhaustive(),
        }
    }
}

impl TokenVerifier {
    /// Builds the verifier selected by `config.jwt_verify`.
    ///
    /// # Errors
    /// - verification is enabled without key or algorithm
    /// - the algorithm is unknown
    /// - the key cannot be parsed for the algorithm
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        if !config.jwt_verify {
            return Ok(Self::Untrusted);
        }

        let key = config
            .jwt_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingJwtKey)?;
        let algorithm = config
            .algorithm
            .as_deref()
            .filter(|alg| !alg.is_empty())
            .ok_or(ConfigError::MissingAlgorithm)?;
        let algorithm = Algorithm::from_str(algorithm.trim())
            .map_err(|_| ConfigError::UnsupportedAlgorithm(algorithm.to_string()))?;

        Ok(Self::Verified {
            key: decoding_key(key, algorithm)?,
            algorithm,
        })
    }

    /// Decodes `id_token` into its claims.
    ///
    /// # Errors
    /// - the token is not a well-formed JWS with a JSON object payload
    /// - (verified) the signature does not match the configured key
    pub fn verify(&self, id_token: &str) -> Result<ClaimSet, CallbackError> {
        match self {
            Self::Untrusted => decode_unverified(id_token).map_err(CallbackError::MalformedToken),
            Self::Verified { key, algorithm } => {
                let mut validation = Validation::new(*algorithm);
                validation.required_spec_claims.clear();
                validation.validate_exp = false;
                validation.validate_nbf = false;
                validation.validate_aud = false;

                decode::<ClaimSet>(id_token, key, &validation)
                    .map(|data| data.claims)
                    .map_err(classify)
            }
        }
    }
}

/// Splits a compact JWS and decodes its header and payload. The header only
/// has to be a JSON object, the signature segment is ignored.
fn decode_unverified(id_token: &str) -> Result<ClaimSet, MalformedTokenError> {
    let mut segments = id_token.split('.');
    let (Some(header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(MalformedTokenError::Segments);
    };

    decode_segment::<Map<String, Value>>(header)?;
    decode_segment::<ClaimSet>(payload)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, MalformedTokenError> {
    let bytes = BASE64_URL_SAFE_NO_PAD.decode(segment.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn decoding_key(key: &str, algorithm: Algorithm) -> Result<DecodingKey, ConfigError> {
    let pem = key.as_bytes();
    let key = match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Ok(DecodingKey::from_secret(pem));
        }
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
    };
    key.map_err(ConfigError::InvalidKey)
}

/// Structural problems are malformed tokens; everything else fails as a
/// signature error.
fn classify(err: jsonwebtoken::errors::Error) -> CallbackError {
    match err.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            CallbackError::MalformedToken(MalformedTokenError::Jwt(err))
        }
        _ => CallbackError::SignatureVerification(err),
    }
}
