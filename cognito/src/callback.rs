use std::fmt;

use oauth::{ExchangeError, ID_TOKEN_KEY, RandomSource, TokenExchanger};
use tracing::{Span, field, info, instrument, warn};

use crate::{
    claims::extract_identity,
    config::PROVIDER_NAME,
    context::RequestContext,
    error::CallbackError,
    exchange::exchange_code,
    models::{AuthRecord, Credentials},
    strategy::Strategy,
    utils::constant_time_equal,
};

/// Progress of a single callback.
///
/// A callback moves strictly forward through the phases and ends in either
/// [`Phase::Complete`] or [`Phase::Failed`]. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingCallback,
    ExchangingToken,
    VerifyingToken,
    ExtractingClaims,
    Complete,
    Failed,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AwaitingCallback => "awaiting_callback",
            Self::ExchangingToken => "exchanging_token",
            Self::VerifyingToken => "verifying_token",
            Self::ExtractingClaims => "extracting_claims",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<E, R> Strategy<E, R>
where
    E: TokenExchanger,
    R: RandomSource,
{
    /// Handles the redirect back from the provider.
    ///
    /// Checks the returned `state` against the one stored by the request
    /// phase, exchanges the code, decodes the ID token and builds the
    /// [`AuthRecord`]. On success the record is also handed to `ctx`.
    ///
    /// The stored state is consumed whatever the outcome, so a callback URL
    /// cannot be replayed. Dropping the returned future abandons the callback
    /// without producing a record.
    ///
    /// # Errors
    /// - the provider reported an error instead of a code
    /// - the returned state does not match the stored one
    /// - the code is missing
    /// - the token exchange fails or times out
    /// - the ID token is missing, malformed or fails verification
    /// - the ID token has no `sub` claim
    #[instrument(
        skip_all,
        fields(provider = PROVIDER_NAME, issuer = ?self.config.issuer(), phase = field::Empty)
    )]
    pub async fn callback_phase<C>(&self, ctx: &mut C) -> Result<AuthRecord, CallbackError>
    where
        C: RequestContext + ?Sized,
    {
        match self.run_callback(ctx).await {
            Ok(record) => {
                Span::current().record("phase", Phase::Complete.as_str());
                info!(uid = %record.uid, "callback complete");
                ctx.set_auth_record(record.clone());
                Ok(record)
            }
            Err(err) => {
                Span::current().record("phase", Phase::Failed.as_str());
                warn!(
                    failed_in = %err.phase(),
                    reason = err.message_key(),
                    error = %err,
                    "callback failed"
                );
                Err(err)
            }
        }
    }

    async fn run_callback<C>(&self, ctx: &mut C) -> Result<AuthRecord, CallbackError>
    where
        C: RequestContext + ?Sized,
    {
        enter(Phase::AwaitingCallback);
        let stored_state = ctx.take_session_state();

        if let Some(error) = ctx.param("error") {
            return Err(CallbackError::ProviderDenied {
                error,
                description: ctx.param("error_description"),
            });
        }

        let returned_state = ctx.param("state");
        let state_matches = match (stored_state.as_deref(), returned_state.as_deref()) {
            (Some(stored), Some(returned)) if !stored.is_empty() => {
                constant_time_equal(stored.as_bytes(), returned.as_bytes())
            }
            _ => false,
        };
        if !state_matches {
            return Err(CallbackError::CsrfStateMismatch);
        }

        let code = ctx
            .param("code")
            .filter(|code| !code.is_empty())
            .ok_or(CallbackError::MissingCode)?;
        let callback_url = self.callback_url(ctx);

        enter(Phase::ExchangingToken);
        let timeout = self.config.exchange_timeout();
        let token = tokio::time::timeout(
            timeout,
            exchange_code(
                &self.exchanger,
                &code,
                &callback_url,
                &self.config.token_params,
                &self.config.auth_token_params,
            ),
        )
        .await
        .map_err(|_| ExchangeError::Timeout(timeout))??;

        enter(Phase::VerifyingToken);
        let id_token = token
            .id_token()
            .filter(|id_token| !id_token.is_empty())
            .ok_or(CallbackError::MissingIdToken)?
            .to_string();
        let claims = self.verifier.verify(&id_token)?;

        enter(Phase::ExtractingClaims);
        let identity = extract_identity(claims, &self.config.info_fields)?;

        Ok(AuthRecord::new(
            PROVIDER_NAME,
            identity,
            Credentials::new(token, id_token),
        ))
    }
}

fn enter(phase: Phase) {
    Span::current().record("phase", phase.as_str());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        RSA_ATTACKER_PRIVATE_KEY, RSA_PRIVATE_KEY, RSA_PUBLIC_KEY, TestContext, fixture_claims,
        fixture_config, sign_rs256, unsigned_token,
    };
    use async_trait::async_trait;
    use oauth::{ExchangeRequest, MockTokenExchanger, TokenResponse};
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::Mutex;

    const STATE: &str = "issued-state";
    const CALLBACK_URL: &str = "https://app.example/auth/cognito_idp/callback";

    fn token_response(id_token: Option<String>) -> TokenResponse {
        let mut extra = serde_json::Map::new();
        if let Some(id_token) = id_token {
            extra.insert(ID_TOKEN_KEY.to_string(), Value::String(id_token));
        }
        TokenResponse {
            access_token: "access-token".to_string(),
            refresh_token: Some("refresh-token".to_string()),
            expires_at: Some(1_577_840_400),
            extra,
        }
    }

    fn exchanger(result: Result<TokenResponse, ExchangeError>) -> MockTokenExchanger {
        MockTokenExchanger {
            exchange: Mutex::new(Some(result)),
            ..Default::default()
        }
    }

    fn callback_ctx() -> TestContext {
        TestContext::new("https://app.example")
            .with_session_state(STATE)
            .with_param("state", STATE)
            .with_param("code", "the-code")
    }

    #[tokio::test]
    async fn test_callback_phase_untrusted() {
        // given
        let id_token = unsigned_token(&fixture_claims(|_| {}));
        let strategy = Strategy::new(
            fixture_config(|_| {}),
            exchanger(Ok(token_response(Some(id_token.clone())))),
        )
        .unwrap();
        let mut ctx = callback_ctx();

        // when
        let got = strategy.callback_phase(&mut ctx).await.unwrap();

        // then
        assert_eq!(got.provider, "cognito_idp");
        assert_eq!(got.uid, "1234-5678-9012");
        assert_eq!(Value::Object(got.info.clone()), json!({ "email": "some email address" }));
        assert_eq!(got.extra.raw_info, fixture_claims(|_| {}));
        assert_eq!(got.credentials.token, "access-token");
        assert_eq!(got.credentials.refresh_token.as_deref(), Some("refresh-token"));
        assert_eq!(got.credentials.id_token, id_token);
        assert_eq!(got.credentials.expires_at, Some(1_577_840_400));
        assert!(got.credentials.expires);
        assert_eq!(ctx.auth_record(), Some(&got));
        assert_eq!(ctx.session_state(), None);
    }

    #[tokio::test]
    async fn test_callback_phase_sends_code_and_callback_url() {
        // given
        let id_token = unsigned_token(&fixture_claims(|_| {}));
        let strategy = Strategy::new(
            fixture_config(|c| {
                c.token_params = serde_json::from_value(json!({ " redirect_uri": "https://evil.example" })).unwrap();
            }),
            exchanger(Ok(token_response(Some(id_token)))),
        )
        .unwrap();

        // when
        strategy.callback_phase(&mut callback_ctx()).await.unwrap();

        // then
        assert_eq!(strategy.exchanger().exchange_calls(), 1);
        let requests = strategy.exchanger().exchange_args.lock().await;
        assert_eq!(requests[0].code(), Some("the-code"));
        assert_eq!(requests[0].redirect_uri(), Some(CALLBACK_URL));
    }

    #[tokio::test]
    async fn test_callback_phase_verified() {
        // given
        let config = fixture_config(|c| {
            c.jwt_verify = true;
            c.jwt_key = Some(RSA_PUBLIC_KEY.to_string());
            c.algorithm = Some("RS256".to_string());
            c.info_fields = vec!["email".to_string(), "name".to_string()];
        });
        let id_token = sign_rs256(&fixture_claims(|_| {}), RSA_PRIVATE_KEY);
        let strategy = Strategy::new(config, exchanger(Ok(token_response(Some(id_token))))).unwrap();

        // when
        let got = strategy.callback_phase(&mut callback_ctx()).await.unwrap();

        // then
        assert_eq!(got.uid, "1234-5678-9012");
        assert_eq!(
            Value::Object(got.info),
            json!({ "email": "some email address", "name": "John Doe" })
        );
    }

    #[tokio::test]
    async fn test_callback_phase_verified_rejects_forged_token() {
        // given
        let config = fixture_config(|c| {
            c.jwt_verify = true;
            c.jwt_key = Some(RSA_PUBLIC_KEY.to_string());
            c.algorithm = Some("RS256".to_string());
        });
        let forged = sign_rs256(&fixture_claims(|_| {}), RSA_ATTACKER_PRIVATE_KEY);
        let strategy = Strategy::new(config, exchanger(Ok(token_response(Some(forged))))).unwrap();
        let mut ctx = callback_ctx();

        // when
        let got = strategy.callback_phase(&mut ctx).await;

        // then
        let err = got.unwrap_err();
        assert!(matches!(err, CallbackError::SignatureVerification(_)), "{err:?}");
        assert_eq!(err.phase(), Phase::VerifyingToken);
        assert_eq!(ctx.auth_record(), None);
    }

    #[rstest]
    #[case::mismatch(Some(STATE), Some("forged-state"))]
    #[case::missing_returned(Some(STATE), None)]
    #[case::missing_stored(None, Some(STATE))]
    #[case::both_missing(None, None)]
    #[case::both_empty(Some(""), Some(""))]
    #[tokio::test]
    async fn test_callback_phase_csrf(#[case] stored: Option<&str>, #[case] returned: Option<&str>) {
        // given
        let strategy = Strategy::new(fixture_config(|_| {}), MockTokenExchanger::default()).unwrap();
        let mut ctx = TestContext::new("https://app.example").with_param("code", "the-code");
        if let Some(stored) = stored {
            ctx = ctx.with_session_state(stored);
        }
        if let Some(returned) = returned {
            ctx = ctx.with_param("state", returned);
        }

        // when
        let got = strategy.callback_phase(&mut ctx).await;

        // then
        assert!(matches!(got, Err(CallbackError::CsrfStateMismatch)), "{got:?}");
        assert_eq!(strategy.exchanger().exchange_calls(), 0);
        assert_eq!(ctx.session_state(), None);
        assert_eq!(ctx.auth_record(), None);
    }

    #[tokio::test]
    async fn test_callback_phase_state_is_single_use() {
        // given
        let id_token = unsigned_token(&fixture_claims(|_| {}));
        let strategy = Strategy::new(
            fixture_config(|_| {}),
            exchanger(Ok(token_response(Some(id_token)))),
        )
        .unwrap();
        let mut ctx = callback_ctx();

        // when
        let first = strategy.callback_phase(&mut ctx).await;
        let replay = strategy.callback_phase(&mut ctx).await;

        // then
        assert!(first.is_ok());
        assert!(matches!(replay, Err(CallbackError::CsrfStateMismatch)));
        assert_eq!(strategy.exchanger().exchange_calls(), 1);
    }

    #[tokio::test]
    async fn test_callback_phase_provider_denied() {
        // given
        let strategy = Strategy::new(fixture_config(|_| {}), MockTokenExchanger::default()).unwrap();
        let mut ctx = TestContext::new("https://app.example")
            .with_session_state(STATE)
            .with_param("state", STATE)
            .with_param("error", "access_denied")
            .with_param("error_description", "user cancelled");

        // when
        let got = strategy.callback_phase(&mut ctx).await;

        // then
        match got {
            Err(CallbackError::ProviderDenied { error, description }) => {
                assert_eq!(error, "access_denied");
                assert_eq!(description.as_deref(), Some("user cancelled"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(strategy.exchanger().exchange_calls(), 0);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    #[tokio::test]
    async fn test_callback_phase_missing_code(#[case] code: Option<&str>) {
        let strategy = Strategy::new(fixture_config(|_| {}), MockTokenExchanger::default()).unwrap();
        let mut ctx = TestContext::new("https://app.example")
            .with_session_state(STATE)
            .with_param("state", STATE);
        if let Some(code) = code {
            ctx = ctx.with_param("code", code);
        }

        let got = strategy.callback_phase(&mut ctx).await;

        assert!(matches!(got, Err(CallbackError::MissingCode)), "{got:?}");
        assert_eq!(strategy.exchanger().exchange_calls(), 0);
    }

    #[tokio::test]
    async fn test_callback_phase_exchange_error() {
        // given
        let payload = json!({ "error": "invalid_grant" });
        let strategy = Strategy::new(
            fixture_config(|_| {}),
            exchanger(Err(ExchangeError::Provider {
                status: 400,
                payload: payload.clone(),
            })),
        )
        .unwrap();

        // when
        let got = strategy.callback_phase(&mut callback_ctx()).await;

        // then
        match got {
            Err(CallbackError::TokenExchange(ExchangeError::Provider { payload: got, .. })) => {
                assert_eq!(got, payload);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(strategy.exchanger().exchange_calls(), 1);
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(String::new()))]
    #[tokio::test]
    async fn test_callback_phase_missing_id_token(#[case] id_token: Option<String>) {
        let strategy = Strategy::new(
            fixture_config(|_| {}),
            exchanger(Ok(token_response(id_token))),
        )
        .unwrap();

        let got = strategy.callback_phase(&mut callback_ctx()).await;

        assert!(matches!(got, Err(CallbackError::MissingIdToken)), "{got:?}");
    }

    #[tokio::test]
    async fn test_callback_phase_malformed_id_token() {
        let strategy = Strategy::new(
            fixture_config(|_| {}),
            exchanger(Ok(token_response(Some("not-a-jwt".to_string())))),
        )
        .unwrap();

        let got = strategy.callback_phase(&mut callback_ctx()).await;

        assert!(matches!(got, Err(CallbackError::MalformedToken(_))), "{got:?}");
    }

    #[tokio::test]
    async fn test_callback_phase_missing_sub() {
        let id_token = unsigned_token(&fixture_claims(|c| {
            c.remove("sub");
        }));
        let strategy = Strategy::new(
            fixture_config(|_| {}),
            exchanger(Ok(token_response(Some(id_token)))),
        )
        .unwrap();
        let mut ctx = callback_ctx();

        let got = strategy.callback_phase(&mut ctx).await;

        assert!(matches!(got, Err(CallbackError::MissingClaim("sub"))), "{got:?}");
        assert_eq!(ctx.auth_record(), None);
    }

    struct PendingExchanger;

    #[async_trait]
    impl TokenExchanger for PendingExchanger {
        async fn exchange(&self, _request: ExchangeRequest) -> Result<TokenResponse, ExchangeError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_phase_exchange_timeout() {
        // given
        let strategy = Strategy::new(fixture_config(|c| c.exchange_timeout_secs = 3), PendingExchanger).unwrap();

        // when
        let got = strategy.callback_phase(&mut callback_ctx()).await;

        // then
        match got {
            Err(CallbackError::TokenExchange(ExchangeError::Timeout(timeout))) => {
                assert_eq!(timeout, Duration::from_secs(3));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_callback_phase_cancelled() {
        // given
        let strategy = Strategy::new(fixture_config(|_| {}), PendingExchanger).unwrap();
        let mut ctx = callback_ctx();

        // when
        let got = tokio::time::timeout(Duration::from_millis(10), strategy.callback_phase(&mut ctx)).await;

        // then
        assert!(got.is_err());
        assert_eq!(ctx.auth_record(), None);
    }

    #[test]
    fn test_phase_terminal() {
        assert!(Phase::Complete.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::ExchangingToken.is_terminal());
        assert_eq!(Phase::VerifyingToken.to_string(), "verifying_token");
    }
}
