use std::marker::PhantomData;

use url::Url;

use crate::random::RandomSource;

/// Generic OAuth 2.0 helper that abstracts state generation and authorization URL creation.
#[derive(Default, Clone)]
pub struct OAuth<R> {
    _phantom: PhantomData<R>,
}

impl<R: RandomSource> OAuth<R> {
    /// Creates a new `OAuth` helper for a given random source.
    #[inline]
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    /// Generates the OAuth `state` (CSRF protection token).
    #[must_use]
    pub fn generate_state() -> String {
        R::base64_url(32)
    }

    /// Constructs the OAuth 2.0 authorization URL.
    ///
    /// # Errors
    /// - `auth_endpoint` is not a valid URL
    pub fn generate_authorization_url(
        auth_endpoint: &str,
        client_id: &str,
        redirect_uri: &str,
        scope: &str,
        state: &str,
    ) -> Result<String, url::ParseError> {
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("state", state),
        ];

        let scope = scope.trim();
        if !scope.is_empty() {
            params.push(("scope", scope));
        }

        let url = Url::parse_with_params(auth_endpoint, &params)?;
        Ok(url.into())
    }
}
