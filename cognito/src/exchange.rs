use oauth::{ExchangeRequest, Params, TokenExchanger, TokenResponse};
use tracing::instrument;

use crate::error::CallbackError;

/// Exchanges `code` for tokens through `exchanger`.
///
/// `code` and `redirect_uri` take precedence over the same keys in
/// `token_params`. Keys of both parameter bags are normalized here, once,
/// before they reach the exchanger. The exchange is attempted exactly once.
///
/// # Errors
/// - the exchanger reports a failure, passed through as [`CallbackError::TokenExchange`]
#[instrument(skip_all, fields(redirect_uri = %callback_url), err)]
pub async fn exchange_code<E>(
    exchanger: &E,
    code: &str,
    callback_url: &str,
    token_params: &Params,
    auth_token_params: &Params,
) -> Result<TokenResponse, CallbackError>
where
    E: TokenExchanger + ?Sized,
{
    let mut overrides = Params::new();
    overrides.insert("code", code);
    overrides.insert("redirect_uri", callback_url);

    let request = ExchangeRequest {
        params: token_params.normalized().merge(overrides),
        options: auth_token_params.normalized(),
    };

    Ok(exchanger.exchange(request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth::{ExchangeError, MockTokenExchanger};
    use serde_json::json;
    use tokio::sync::Mutex;

    fn params(value: serde_json::Value) -> Params {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_exchange_code_builds_request() {
        // given
        let exchanger = MockTokenExchanger {
            exchange: Mutex::new(Some(Ok(TokenResponse::default()))),
            ..Default::default()
        };
        let token_params = params(json!({
            " redirect_uri ": "https://evil.example/steal",
            "code ": "stale",
            "codeVerifier": "verifier",
        }));
        let auth_token_params = params(json!({ " headers": { "X-Trace ": "abc" } }));

        // when
        let got = exchange_code(
            &exchanger,
            "the-code",
            "https://app.example/auth/cognito_idp/callback",
            &token_params,
            &auth_token_params,
        )
        .await;

        // then
        assert!(got.is_ok());
        assert_eq!(exchanger.exchange_calls(), 1);
        let requests = exchanger.exchange_args.lock().await;
        let request = &requests[0];
        assert_eq!(request.code(), Some("the-code"));
        assert_eq!(request.redirect_uri(), Some("https://app.example/auth/cognito_idp/callback"));
        assert_eq!(request.params.get_str("codeVerifier"), Some("verifier"));
        assert_eq!(request.params.len(), 3);
        assert_eq!(request.options, params(json!({ "headers": { "X-Trace": "abc" } })));
    }

    #[tokio::test]
    async fn test_exchange_code_propagates_provider_error() {
        // given
        let payload = json!({ "error": "invalid_grant" });
        let exchanger = MockTokenExchanger {
            exchange: Mutex::new(Some(Err(ExchangeError::Provider {
                status: 400,
                payload: payload.clone(),
            }))),
            ..Default::default()
        };

        // when
        let got = exchange_code(&exchanger, "used-code", "https://app.example/cb", &Params::new(), &Params::new()).await;

        // then
        match got {
            Err(CallbackError::TokenExchange(ExchangeError::Provider { status, payload: got })) => {
                assert_eq!(status, 400);
                assert_eq!(got, payload);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(exchanger.exchange_calls(), 1);
    }
}
