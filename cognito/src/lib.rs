//! Sign in with an Amazon Cognito user pool over OAuth 2.0.
//!
//! The request phase redirects the browser to the hosted UI. The callback
//! phase checks the returned `state`, exchanges the authorization code for
//! tokens, decodes the ID token and turns its claims into an [`AuthRecord`].
mod callback;
mod callback_url;
mod claims;
mod config;
mod context;
mod cookie;
mod error;
mod exchange;
mod fixture;
mod models;
mod request_phase;
mod strategy;
mod utils;
mod verifier;

pub use callback::Phase;
pub use callback_url::build_callback_url;
pub use claims::{ClaimSet, Identity, extract_identity};
pub use config::{Config, DEFAULT_CALLBACK_PATH, PROVIDER_NAME};
pub use context::{HttpRequestContext, RequestContext};
pub use cookie::{Cookie, STATE_COOKIE_KEY};
pub use error::{CallbackError, ConfigError, MalformedTokenError, RequestPhaseError};
pub use exchange::exchange_code;
pub use models::{AuthRecord, Credentials, Extra};
pub use request_phase::AuthorizationRedirect;
pub use strategy::Strategy;
pub use verifier::TokenVerifier;
