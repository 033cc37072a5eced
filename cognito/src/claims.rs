use serde_json::{Map, Value};

use crate::error::CallbackError;

/// Decoded ID token claims, in the order they were encoded.
pub type ClaimSet = Map<String, Value>;

/// The identity fields read from a claim set.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// The `sub` claim.
    pub uid: String,
    /// The requested claims that were present, in the requested order.
    pub info: Map<String, Value>,
    /// The claim set as decoded.
    pub raw_info: ClaimSet,
}

/// Extracts the identity from `claims`.
///
/// Fields missing from the claims are left out of `info` rather than set to null.
///
/// # Errors
/// - the `sub` claim is missing or not a string
pub fn extract_identity(claims: ClaimSet, fields: &[String]) -> Result<Identity, CallbackError> {
    let uid = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .ok_or(CallbackError::MissingClaim("sub"))?
        .to_string();

    let mut info = Map::new();
    for field in fields {
        if let Some(value) = claims.get(field) {
            info.insert(field.clone(), value.clone());
        }
    }

    Ok(Identity {
        uid,
        info,
        raw_info: claims,
    })
}
