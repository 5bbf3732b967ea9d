use crate::url::{extract_domain, CanonicalUrl, Scope};
use url::Url;

/// Tracking query parameters removed when query strings are retained
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "ref", "source"];

/// Normalizes a discovered link into a canonical, in-scope URL
///
/// # Normalization Steps
///
/// 1. Resolve `href` against `base`; reject if malformed
/// 2. Reject anything that is not http or https
/// 3. Reject hosts outside the scope
/// 4. Remove credentials and the fragment; remove the query string when
///    the scope strips queries, otherwise drop tracking parameters and sort
///    the rest
/// 5. Scheme and host are lowercase (the `url` crate guarantees this for
///    http/https); path case is preserved
/// 6. Remove trailing slashes from non-root paths
///
/// Returns `None` if the link is rejected at any step. Applying the
/// function to its own output yields the same URL.
///
/// # Examples
///
/// ```
/// use driftnet::url::{normalize, Scope};
/// use url::Url;
///
/// let scope = Scope::new(vec!["example.org".to_string()], vec![], true);
/// let base = Url::parse("https://Example.org/p/").unwrap();
///
/// let url = normalize("/a#top", &base, &scope).unwrap();
/// assert_eq!(url.as_str(), "https://example.org/a");
/// ```
pub fn normalize(href: &str, base: &Url, scope: &Scope) -> Option<CanonicalUrl> {
    // Step 1: Resolve relative to the page
    let mut url = base.join(href.trim()).ok()?;

    // Step 2: Only web schemes
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    // Step 3: Scope filter
    let host = extract_domain(&url)?;
    if !scope.contains_host(&host) {
        return None;
    }
    if url.host_str() != Some(host.as_str()) {
        url.set_host(Some(&host)).ok()?;
    }

    // Step 4: Credentials, fragment and query policy
    url.set_username("").ok()?;
    url.set_password(None).ok()?;
    url.set_fragment(None);
    if scope.strip_query() {
        url.set_query(None);
    } else if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    // Step 6: One form for trailing slashes
    let path = collapse_trailing_slash(url.path());
    url.set_path(&path);

    Some(CanonicalUrl(url.into()))
}

/// Strips trailing slashes from any path other than the root
fn collapse_trailing_slash(path: &str) -> String {
    if path.len() <= 1 {
        return "/".to_string();
    }

    match path.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
