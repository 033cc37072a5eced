use std::{marker::PhantomData, time::Duration};

use async_trait::async_trait;
use common::{Now, SystemNow};
use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE},
    redirect::Policy,
};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    error::ExchangeError,
    models::{ExchangeRequest, TokenResponse},
};

/// Option selecting how client credentials are sent to the token endpoint.
pub const AUTH_SCHEME_OPTION: &str = "auth_scheme";

/// Option holding extra request headers.
pub const HEADERS_OPTION: &str = "headers";

/// Exchanges an authorization code for tokens.
///
/// Implementations perform exactly one attempt per call: authorization
/// codes are single use, so a failed exchange is never retried.
#[cfg_attr(feature = "mock", mock::client)]
#[async_trait]
pub trait TokenExchanger: Send + Sync + 'static {
    async fn exchange(&self, request: ExchangeRequest) -> Result<TokenResponse, ExchangeError>;
}

/// Token exchanger posting a form encoded `authorization_code` grant to an
/// OAuth 2.0 token endpoint.
#[derive(Clone)]
pub struct HttpTokenExchanger<N = SystemNow> {
    client: Client,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    _now: PhantomData<N>,
}

impl HttpTokenExchanger<SystemNow> {
    /// Creates a new [`HttpTokenExchanger`].
    ///
    /// # Errors
    /// - the http client cannot be built
    pub fn new(
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        Self::with_clock(token_endpoint, client_id, client_secret, timeout)
    }
}

impl<N: Now> HttpTokenExchanger<N> {
    /// Creates a new [`HttpTokenExchanger`] that derives `expires_at` from
    /// the given clock.
    ///
    /// # Errors
    /// - the http client cannot be built
    pub fn with_clock(
        token_endpoint: String,
        client_id: String,
        client_secret: String,
        timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .build()
            .map_err(ExchangeError::BuildHttpClient)?;

        Ok(Self {
            client,
            token_endpoint,
            client_id,
            client_secret,
            _now: PhantomData,
        })
    }

    /// Builds the form body of the token request.
    ///
    /// With the `request_body` auth scheme the client credentials are
    /// sent as form fields instead of basic auth.
    fn build_form(&self, request: &ExchangeRequest) -> Result<String, ExchangeError> {
        let mut form = vec![("grant_type".to_string(), "authorization_code".to_string())];
        form.extend(
            request
                .params
                .to_form_pairs()
                .into_iter()
                .filter(|(key, _)| key != "grant_type"),
        );

        if uses_request_body_auth(request) {
            form.push(("client_id".to_string(), self.client_id.clone()));
            form.push(("client_secret".to_string(), self.client_secret.clone()));
        }

        Ok(serde_urlencoded::to_string(&form)?)
    }
}

fn uses_request_body_auth(request: &ExchangeRequest) -> bool {
    request.options.get_str(AUTH_SCHEME_OPTION) == Some("request_body")
}

#[async_trait]
impl<N: Now> TokenExchanger for HttpTokenExchanger<N> {
    /// Posts the authorization code to the token endpoint.
    ///
    /// # Errors
    /// - building the request body
    /// - sending the request or reading the response, including the client
    ///   timeout
    /// - the provider answers with an error status or an `error` field
    #[instrument(skip_all, fields(endpoint = %self.token_endpoint), err)]
    async fn exchange(&self, request: ExchangeRequest) -> Result<TokenResponse, ExchangeError> {
        let body = self.build_form(&request)?;

        let mut builder = self
            .client
            .post(&self.token_endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(body);

        if !uses_request_body_auth(&request) {
            builder = builder.basic_auth(&self.client_id, Some(&self.client_secret));
        }

        for (name, value) in request.options.string_map(HEADERS_OPTION) {
            builder = builder.header(name, value);
        }

        let response = builder.send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let payload = serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        debug!(status = status.as_u16(), "token endpoint responded");

        if !status.is_success() || payload.get("error").is_some() {
            return Err(ExchangeError::Provider {
                status: status.as_u16(),
                payload,
            });
        }

        TokenResponse::from_json::<N>(payload)
    }
}
