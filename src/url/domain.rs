use url::Url;

/// Extracts the lowercase host of a URL
///
/// Returns `None` when the URL has no host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_trawler::url::extract_domain;
///
/// let url = Url::parse("https://Docs.Example.com:8443/guide").unwrap();
/// assert_eq!(extract_domain(&url), Some("docs.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a host matches an excluded-domain pattern
///
/// `"example.com"` matches only that host. `"*.example.com"` matches the bare
/// domain and every subdomain beneath it.
///
/// ```
/// use doc_trawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Returns true if the URL's host matches any of the excluded patterns
pub fn is_excluded_domain(url: &Url, patterns: &[String]) -> bool {
    let Some(domain) = extract_domain(url) else {
        return false;
    };
    patterns
        .iter()
        .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &domain))
}
