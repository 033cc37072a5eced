mod error;
mod exchanger;
mod models;
mod oauth;
pub mod params;
mod random;
pub use error::ExchangeError;
pub use exchanger::HttpTokenExchanger;
pub use exchanger::TokenExchanger;
pub use models::ExchangeRequest;
pub use models::ID_TOKEN_KEY;
pub use models::TokenResponse;
pub use oauth::OAuth;
pub use params::Params;
pub use random::RandomSource;
pub use random::SecureRandom;

#[cfg(feature = "mock")]
pub use exchanger::MockTokenExchanger;
#[cfg(feature = "mock")]
pub use random::mock;
