/// Checks if a host belongs to a domain on a label boundary
///
/// `example.com` matches:
/// - `example.com` (the bare domain)
/// - `blog.example.com` (single subdomain)
/// - `api.v2.example.com` (nested subdomains)
///
/// and nothing else. In particular a plain substring or suffix is not
/// enough: `notexample.com` and `example.com.evil.tld` do not match.
///
/// Both arguments are expected to be lowercase.
///
/// # Examples
///
/// ```
/// use driftnet::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "api.v2.example.com"));
/// assert!(!matches_domain("example.com", "myexample.com"));
/// assert!(!matches_domain("example.com", "example.com.evil.tld"));
/// ```
pub fn matches_domain(domain: &str, host: &str) -> bool {
    if domain.is_empty() {
        return false;
    }

    match host.strip_suffix(domain) {
        Some("") => true,
        Some(prefix) => prefix.ends_with('.') && prefix.len() > 1,
        None => false,
    }
}
