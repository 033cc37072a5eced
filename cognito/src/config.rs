use std::time::Duration;

use oauth::Params;
use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the strategy, used in the default callback path and the auth record.
pub const PROVIDER_NAME: &str = "cognito_idp";

/// Callback path used when no `callback_path` is configured.
pub const DEFAULT_CALLBACK_PATH: &str = "/auth/cognito_idp/callback";

const DEFAULT_SCOPE: &str = "openid email profile";
const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Configuration of the Cognito strategy.
///
/// Deserializes from an option dictionary; every field except the client
/// credentials has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,

    #[serde(default)]
    pub aws_region: Option<String>,

    #[serde(default)]
    pub user_pool_id: Option<String>,

    /// Base URL of the hosted UI, e.g. `https://my-pool.auth.eu-west-1.amazoncognito.com`.
    #[serde(default)]
    pub site: Option<String>,

    /// Replaces [`DEFAULT_CALLBACK_PATH`] entirely when set.
    #[serde(default)]
    pub callback_path: Option<String>,

    /// Claims copied into the auth record `info`, in this order.
    #[serde(default = "default_info_fields")]
    pub info_fields: Vec<String>,

    #[serde(default)]
    pub jwt_verify: bool,

    /// PEM encoded public key, or the shared secret for HMAC algorithms.
    #[serde(default)]
    pub jwt_key: Option<String>,

    #[serde(default)]
    pub algorithm: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: String,

    #[serde(default)]
    pub token_params: Params,

    #[serde(default)]
    pub auth_token_params: Params,

    #[serde(default = "default_exchange_timeout_secs")]
    pub exchange_timeout_secs: u64,
}

fn default_info_fields() -> Vec<String> {
    vec!["email".to_string()]
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_exchange_timeout_secs() -> u64 {
    DEFAULT_EXCHANGE_TIMEOUT_SECS
}

impl Config {
    /// Creates a configuration with defaults for everything but the client credentials.
    pub fn new<S: Into<String>>(client_id: S, client_secret: S) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            aws_region: None,
            user_pool_id: None,
            site: None,
            callback_path: None,
            info_fields: default_info_fields(),
            jwt_verify: false,
            jwt_key: None,
            algorithm: None,
            scope: default_scope(),
            token_params: Params::new(),
            auth_token_params: Params::new(),
            exchange_timeout_secs: DEFAULT_EXCHANGE_TIMEOUT_SECS,
        }
    }

    /// Loads the configuration from `COGNITO_*` environment variables.
    ///
    /// # Errors
    /// - a required variable is missing
    /// - a variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`, which maps variable names to values.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let mut config = Self::new(
            require("COGNITO_CLIENT_ID")?,
            require("COGNITO_CLIENT_SECRET")?,
        );
        config.aws_region = get("COGNITO_AWS_REGION");
        config.user_pool_id = get("COGNITO_USER_POOL_ID");
        config.site = get("COGNITO_SITE");
        config.callback_path = get("COGNITO_CALLBACK_PATH");
        config.jwt_key = get("COGNITO_JWT_KEY");
        config.algorithm = get("COGNITO_ALGORITHM");

        if let Some(fields) = get("COGNITO_INFO_FIELDS") {
            config.info_fields = fields
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(scope) = get("COGNITO_SCOPE") {
            config.scope = scope;
        }
        if let Some(value) = get("COGNITO_JWT_VERIFY") {
            config.jwt_verify = parse_var("COGNITO_JWT_VERIFY", &value)?;
        }
        if let Some(value) = get("COGNITO_EXCHANGE_TIMEOUT_SECS") {
            config.exchange_timeout_secs = parse_var("COGNITO_EXCHANGE_TIMEOUT_SECS", &value)?;
        }

        Ok(config)
    }

    /// Checks the invariants that cannot be expressed in the type.
    ///
    /// # Errors
    /// - `jwt_verify` is set without `jwt_key` or `algorithm`
    /// - the exchange timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_verify {
            if self.jwt_key.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::MissingJwtKey);
            }
            if self.algorithm.as_deref().is_none_or(str::is_empty) {
                return Err(ConfigError::MissingAlgorithm);
            }
        }
        if self.exchange_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }

    /// Issuer of the ID tokens of the configured user pool.
    #[must_use]
    pub fn issuer(&self) -> Option<String> {
        match (&self.aws_region, &self.user_pool_id) {
            (Some(region), Some(pool)) => {
                Some(format!("https://cognito-idp.{region}.amazonaws.com/{pool}"))
            }
            _ => None,
        }
    }

    /// The hosted UI authorization endpoint.
    ///
    /// # Errors
    /// - no `site` configured
    pub fn authorize_endpoint(&self) -> Result<String, ConfigError> {
        Ok(format!("{}/oauth2/authorize", self.site()?))
    }

    /// The hosted UI token endpoint.
    ///
    /// # Errors
    /// - no `site` configured
    pub fn token_endpoint(&self) -> Result<String, ConfigError> {
        Ok(format!("{}/oauth2/token", self.site()?))
    }

    #[must_use]
    pub fn exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.exchange_timeout_secs)
    }

    fn site(&self) -> Result<&str, ConfigError> {
        self.site
            .as_deref()
            .map(|site| site.trim_end_matches('/'))
            .filter(|site| !site.is_empty())
            .ok_or(ConfigError::MissingSite)
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVar {
        key,
        value: value.to_string(),
    })
}
