use base64::Engine as _;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use rand::Rng;

/// Where the `state` values of the authorization flow come from.
///
/// Swapped for a fixed source in tests so authorization URLs are predictable:
/// ```
/// use oauth::{OAuth, RandomSource};
///
/// struct FixedState;
///
/// impl RandomSource for FixedState {
///     fn base64_url(_num_bytes: usize) -> String {
///         "fixed-state".to_string()
///     }
/// }
///
/// assert_eq!(OAuth::<FixedState>::generate_state(), "fixed-state");
/// ```
pub trait RandomSource: Send + Sync + 'static {
    /// Returns `num_bytes` random bytes encoded as unpadded base64url.
    fn base64_url(num_bytes: usize) -> String;
}

/// Thread rng backed source, seeded from the operating system.
#[derive(Debug, Clone, Default)]
pub struct SecureRandom;

impl RandomSource for SecureRandom {
    fn base64_url(num_bytes: usize) -> String {
        let mut bytes = vec![0u8; num_bytes];
        rand::rng().fill(bytes.as_mut_slice());
        BASE64_URL_SAFE_NO_PAD.encode(&bytes)
    }
}

#[cfg(feature = "mock")]
pub mod mock {
    use super::*;

    /// Mock random generator for testing.
    #[derive(Debug, Default, Clone)]
    pub struct MockRandom;

    impl RandomSource for MockRandom {
        fn base64_url(_: usize) -> String {
            "secret-encoded".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_random_base64_url() {
        let a = SecureRandom::base64_url(32);
        let b = SecureRandom::base64_url(32);

        assert_ne!(a, b);
        assert_eq!(BASE64_URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
        assert!(!a.contains('=') && !a.contains('+') && !a.contains('/'));
    }
}
