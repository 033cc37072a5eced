use http::{
    HeaderMap,
    header::{COOKIE, HOST},
    request::Parts,
};

use crate::{
    cookie::{Cookie, STATE_COOKIE_KEY, create_expired_cookie, create_state_cookie, extract_cookie_by_name},
    models::AuthRecord,
};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// The view of one inbound request the strategy works against.
pub trait RequestContext {
    /// Returns a query parameter.
    fn param(&self, name: &str) -> Option<String>;

    /// Scheme, host and port as seen by the browser, e.g. `https://app.example`.
    fn full_host(&self) -> String;

    /// Mount point of the application, empty when mounted at the root.
    fn script_name(&self) -> String;

    /// Removes and returns the state issued by the request phase.
    fn take_session_state(&mut self) -> Option<String>;

    /// Stores the state issued by the request phase.
    fn set_session_state(&mut self, state: String);

    /// Hands the auth record to downstream consumers.
    fn set_auth_record(&mut self, record: AuthRecord);
}

/// [`RequestContext`] over the parts of an [`http::Request`].
///
/// The session state lives in the [`STATE_COOKIE_KEY`] cookie and the auth
/// record is inserted into the request extensions.
#[derive(Debug)]
pub struct HttpRequestContext<'a> {
    parts: &'a mut Parts,
    query: Vec<(String, String)>,
    script_name: String,
    session_state: Option<String>,
    response_cookies: Vec<Cookie>,
}

impl<'a> HttpRequestContext<'a> {
    /// Creates a new [`HttpRequestContext`]. A query string that cannot be
    /// decoded is treated as empty.
    pub fn new(parts: &'a mut Parts) -> Self {
        let query = parts
            .uri
            .query()
            .and_then(|query| serde_urlencoded::from_str(query).ok())
            .unwrap_or_default();
        let session_state = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .find_map(|value| extract_cookie_by_name(STATE_COOKIE_KEY, value));

        Self {
            parts,
            query,
            script_name: String::new(),
            session_state,
            response_cookies: Vec::new(),
        }
    }

    /// Sets the mount point of the application.
    #[must_use]
    pub fn with_script_name<S: Into<String>>(mut self, script_name: S) -> Self {
        self.script_name = script_name.into();
        self
    }

    /// Cookies the response to this request must set.
    #[must_use]
    pub fn response_cookies(&self) -> &[Cookie] {
        &self.response_cookies
    }

    fn scheme(&self) -> String {
        first_forwarded(&self.parts.headers, X_FORWARDED_PROTO)
            .or_else(|| self.parts.uri.scheme_str().map(String::from))
            .unwrap_or_else(|| "http".to_string())
    }

    fn host(&self) -> String {
        first_forwarded(&self.parts.headers, X_FORWARDED_HOST)
            .or_else(|| header_str(&self.parts.headers, HOST.as_str()))
            .or_else(|| self.parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string())
    }

    fn is_secure(&self) -> bool {
        self.scheme() == "https"
    }
}

impl RequestContext for HttpRequestContext<'_> {
    fn param(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find_map(|(key, value)| (key == name).then(|| value.clone()))
    }

    fn full_host(&self) -> String {
        format!("{}://{}", self.scheme(), self.host())
    }

    fn script_name(&self) -> String {
        self.script_name.clone()
    }

    fn take_session_state(&mut self) -> Option<String> {
        let state = self.session_state.take()?;
        let expired = create_expired_cookie(STATE_COOKIE_KEY, self.is_secure());
        self.response_cookies.push(expired);
        Some(state)
    }

    fn set_session_state(&mut self, state: String) {
        let cookie = create_state_cookie(state.as_str(), self.is_secure());
        self.session_state = Some(state);
        self.response_cookies.push(cookie);
    }

    fn set_auth_record(&mut self, record: AuthRecord) {
        self.parts.extensions.insert(record);
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(String::from)
}

/// Proxies append to forwarded headers, the client facing value comes first.
fn first_forwarded(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name).and_then(|value| {
        value
            .split(',')
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
    })
}
