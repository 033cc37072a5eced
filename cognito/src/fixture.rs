#![cfg(test)]
use std::collections::HashMap;

use base64::{Engine as _, prelude::BASE64_URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;

use crate::{claims::ClaimSet, config::Config, context::RequestContext, models::AuthRecord};

pub(crate) const RSA_PRIVATE_KEY: &str = include_str!("../tests/fixtures/rsa_private.pem");
pub(crate) const RSA_PUBLIC_KEY: &str = include_str!("../tests/fixtures/rsa_public.pem");
pub(crate) const RSA_ATTACKER_PRIVATE_KEY: &str =
    include_str!("../tests/fixtures/rsa_attacker_private.pem");

pub(crate) fn fixture_config<F>(mut func: F) -> Config
where
    F: FnMut(&mut Config),
{
    let mut config = Config::new("client-id", "client-secret");
    config.aws_region = Some("eu-west-1".to_string());
    config.user_pool_id = Some("user_pool_id".to_string());
    config.site = Some("https://pool.auth.eu-west-1.amazoncognito.com".to_string());
    func(&mut config);
    config
}

pub(crate) fn fixture_claims<F>(mut func: F) -> ClaimSet
where
    F: FnMut(&mut ClaimSet),
{
    let mut claims = json!({
        "sub": "1234-5678-9012",
        "email": "some email address",
        "phone_number": "0123456789",
        "name": "John Doe",
        "iat": 1_577_836_800,
        "exp": 1_577_840_400u64,
    })
    .as_object()
    .cloned()
    .unwrap();
    func(&mut claims);
    claims
}

pub(crate) fn sign_rs256(claims: &ClaimSet, private_key: &str) -> String {
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).unwrap();
    encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}

pub(crate) fn sign_hs256(claims: &ClaimSet, secret: &str) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key).unwrap()
}

/// A token with a well formed header and payload and a junk signature.
pub(crate) fn unsigned_token(claims: &ClaimSet) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// In-memory [`RequestContext`].
#[derive(Debug, Default)]
pub(crate) struct TestContext {
    full_host: String,
    script_name: String,
    params: HashMap<String, String>,
    session_state: Option<String>,
    auth_record: Option<AuthRecord>,
}

impl TestContext {
    pub(crate) fn new(full_host: &str) -> Self {
        Self {
            full_host: full_host.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn with_script_name(mut self, script_name: &str) -> Self {
        self.script_name = script_name.to_string();
        self
    }

    pub(crate) fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub(crate) fn with_session_state(mut self, state: &str) -> Self {
        self.session_state = Some(state.to_string());
        self
    }

    pub(crate) fn session_state(&self) -> Option<&str> {
        self.session_state.as_deref()
    }

    pub(crate) fn auth_record(&self) -> Option<&AuthRecord> {
        self.auth_record.as_ref()
    }
}

impl RequestContext for TestContext {
    fn param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    fn full_host(&self) -> String {
        self.full_host.clone()
    }

    fn script_name(&self) -> String {
        self.script_name.clone()
    }

    fn take_session_state(&mut self) -> Option<String> {
        self.session_state.take()
    }

    fn set_session_state(&mut self, state: String) {
        self.session_state = Some(state);
    }

    fn set_auth_record(&mut self, record: AuthRecord) {
        self.auth_record = Some(record);
    }
}
