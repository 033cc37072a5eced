use oauth::{OAuth, RandomSource, TokenExchanger};
use tracing::{debug, instrument};

use crate::{context::RequestContext, error::RequestPhaseError, strategy::Strategy};

/// Where to send the browser to start a login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub state: String,
}

impl<E, R> Strategy<E, R>
where
    E: TokenExchanger,
    R: RandomSource,
{
    /// Starts a login: issues a fresh `state`, stores it in `ctx` and builds
    /// the hosted UI authorization URL.
    ///
    /// # Errors
    /// - no `site` is configured
    /// - the authorization endpoint is not a valid URL
    #[instrument(skip_all, err)]
    pub fn request_phase<C>(&self, ctx: &mut C) -> Result<AuthorizationRedirect, RequestPhaseError>
    where
        C: RequestContext + ?Sized,
    {
        let auth_endpoint = self.config.authorize_endpoint()?;
        let callback_url = self.callback_url(ctx);
        let state = OAuth::<R>::generate_state();

        let url = OAuth::<R>::generate_authorization_url(
            &auth_endpoint,
            &self.config.client_id,
            &callback_url,
            &self.config.scope,
            &state,
        )?;

        ctx.set_session_state(state.clone());
        debug!(redirect_uri = %callback_url, "redirecting to authorization endpoint");

        Ok(AuthorizationRedirect { url, state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ConfigError,
        fixture::{TestContext, fixture_config},
    };
    use oauth::{MockTokenExchanger, mock::MockRandom};

    fn strategy(config: crate::config::Config) -> Strategy<MockTokenExchanger, MockRandom> {
        Strategy::with_random(config, MockTokenExchanger::default()).unwrap()
    }

    #[test]
    fn test_request_phase() {
        // given
        let strategy = strategy(fixture_config(|c| c.scope = "openid email".to_string()));
        let mut ctx = TestContext::new("https://app.example");

        // when
        let got = strategy.request_phase(&mut ctx).unwrap();

        // then
        assert_eq!(got.state, "secret-encoded");
        assert_eq!(
            got.url,
            "https://pool.auth.eu-west-1.amazoncognito.com/oauth2/authorize?response_type=code&client_id=client-id&redirect_uri=https%3A%2F%2Fapp.example%2Fauth%2Fcognito_idp%2Fcallback&state=secret-encoded&scope=openid+email"
        );
        assert_eq!(ctx.session_state(), Some("secret-encoded"));
    }

    #[test]
    fn test_request_phase_missing_site() {
        let strategy = strategy(fixture_config(|c| c.site = None));
        let mut ctx = TestContext::new("https://app.example");

        let got = strategy.request_phase(&mut ctx);

        assert!(matches!(got, Err(RequestPhaseError::Config(ConfigError::MissingSite))));
        assert_eq!(ctx.session_state(), None);
    }

    #[test]
    fn test_request_phase_invalid_site() {
        let strategy = strategy(fixture_config(|c| c.site = Some("not a url".to_string())));
        let mut ctx = TestContext::new("https://app.example");

        let got = strategy.request_phase(&mut ctx);

        assert!(matches!(got, Err(RequestPhaseError::GenerateAuthorizationUrl(_))));
    }
}
