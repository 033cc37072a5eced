use chrono::Duration;
use http::{HeaderValue, header::InvalidHeaderValue};
use std::fmt;

/// Name of the cookie holding the issued `state` between the two phases.
pub const STATE_COOKIE_KEY: &str = "cognito_idp.state";

/// How long a login may take between redirect and callback.
const STATE_COOKIE_MAX_AGE_MINUTES: i64 = 10;

/// Representation of an HTTP cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cookie {
    /// The cookie's name.
    name: String,

    /// The cookie's value.
    value: String,

    /// The cookie's maximum age.
    max_age: Duration,

    /// The cookie's path.
    path: String,

    /// Whether this cookie was marked Secure.
    secure: bool,

    /// Whether this cookie was marked HttpOnly.
    http_only: bool,
}

impl Cookie {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    ///
    /// # Errors
    /// - the cookie contains characters not allowed in a header
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.to_string())
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if self.max_age.num_seconds() >= 0 {
            write!(f, "; Max-Age={}", self.max_age.num_seconds())?;
        }

        if !self.path.is_empty() {
            write!(f, "; Path={}", self.path)?;
        }

        if self.secure {
            write!(f, "; Secure")?;
        }

        if self.http_only {
            write!(f, "; HttpOnly")?;
        }

        // Lax keeps the cookie on the top-level redirect back from the provider.
        write!(f, "; SameSite=Lax")
    }
}

/// Creates the cookie carrying the oauth state.
pub fn create_state_cookie<T: Into<String>>(state: T, secure: bool) -> Cookie {
    build_cookie(
        STATE_COOKIE_KEY,
        state,
        Duration::minutes(STATE_COOKIE_MAX_AGE_MINUTES),
        secure,
    )
}

/// Creates a cookie that instructs the browser to delete it.
pub fn create_expired_cookie<S: Into<String>>(name: S, secure: bool) -> Cookie {
    build_cookie(name, "", Duration::zero(), secure)
}

fn build_cookie<N, V>(name: N, value: V, max_age: Duration, secure: bool) -> Cookie
where
    N: Into<String>,
    V: Into<String>,
{
    Cookie {
        name: name.into(),
        value: value.into(),
        max_age,
        path: String::from("/"),
        secure,
        http_only: true,
    }
}

/// Extracts a cookie by name from a cookie header value.
pub fn extract_cookie_by_name(name: &str, value: &HeaderValue) -> Option<String> {
    value
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .filter_map(|cookie| cookie.split_once('='))
        .find_map(|(k, v)| (k == name).then(|| v.to_string()))
}
