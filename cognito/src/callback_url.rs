use crate::config::DEFAULT_CALLBACK_PATH;

/// Builds the redirect uri sent with both the authorization request and the
/// token exchange.
///
/// The result is `full_host + script_name + path` where `path` is the
/// configured callback path or [`DEFAULT_CALLBACK_PATH`]. It never carries a
/// query string or fragment: the provider compares redirect uris byte for
/// byte, so both phases must produce the same string.
#[must_use]
pub fn build_callback_url(full_host: &str, script_name: &str, configured_path: Option<&str>) -> String {
    let path = configured_path
        .map(strip_query_and_fragment)
        .filter(|path| !path.is_empty())
        .unwrap_or(DEFAULT_CALLBACK_PATH);

    let host = strip_query_and_fragment(full_host).trim_end_matches('/');
    let script_name = strip_query_and_fragment(script_name).trim_matches('/');
    let path = path.trim_start_matches('/');

    let mut url = String::with_capacity(host.len() + script_name.len() + path.len() + 2);
    url.push_str(host);
    if !script_name.is_empty() {
        url.push('/');
        url.push_str(script_name);
    }
    url.push('/');
    url.push_str(path);
    url
}

fn strip_query_and_fragment(value: &str) -> &str {
    value
        .find(['?', '#'])
        .map_or(value, |index| &value[..index])
}
