use std::marker::PhantomData;

use oauth::{HttpTokenExchanger, RandomSource, SecureRandom, TokenExchanger};

use crate::{
    callback_url::build_callback_url, config::Config, context::RequestContext,
    error::ConfigError, verifier::TokenVerifier,
};

/// The Cognito sign-in strategy.
///
/// Holds everything resolved at construction: the validated configuration,
/// the token verifier and the token exchanger. One instance serves any number
/// of concurrent callbacks, all per-request state lives in the
/// [`RequestContext`].
pub struct Strategy<E, R = SecureRandom> {
    pub(crate) config: Config,
    pub(crate) verifier: TokenVerifier,
    pub(crate) exchanger: E,
    _random: PhantomData<R>,
}

impl Strategy<HttpTokenExchanger, SecureRandom> {
    /// Creates a strategy that exchanges codes at the hosted UI token endpoint.
    ///
    /// # Errors
    /// - the configuration is invalid
    /// - no `site` is configured
    /// - the http client cannot be built
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let exchanger = HttpTokenExchanger::new(
            config.token_endpoint()?,
            config.client_id.clone(),
            config.client_secret.clone(),
            config.exchange_timeout(),
        )?;
        Self::new(config, exchanger)
    }
}

impl<E: TokenExchanger> Strategy<E, SecureRandom> {
    /// Creates a strategy around an existing exchanger.
    ///
    /// # Errors
    /// - the configuration is invalid
    /// - token verification is enabled with an unusable key or algorithm
    pub fn new(config: Config, exchanger: E) -> Result<Self, ConfigError> {
        Self::with_random(config, exchanger)
    }
}

impl<E, R> Strategy<E, R>
where
    E: TokenExchanger,
    R: RandomSource,
{
    pub(crate) fn with_random(config: Config, exchanger: E) -> Result<Self, ConfigError> {
        config.validate()?;
        let verifier = TokenVerifier::from_config(&config)?;

        Ok(Self {
            config,
            verifier,
            exchanger,
            _random: PhantomData,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn exchanger(&self) -> &E {
        &self.exchanger
    }

    /// The redirect uri for the request behind `ctx`.
    pub fn callback_url<C: RequestContext + ?Sized>(&self, ctx: &C) -> String {
        build_callback_url(
            &ctx.full_host(),
            &ctx.script_name(),
            self.config.callback_path.as_deref(),
        )
    }
}
