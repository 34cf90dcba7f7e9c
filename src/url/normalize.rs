use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized page URL
///
/// Two pages are the same page exactly when their normalized strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageUrl(String);

impl PageUrl {
    /// Returns the normalized URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the URL, returning the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PageUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageUrl {
    fn from(url: &str) -> Self {
        normalize_url(url)
    }
}

impl From<String> for PageUrl {
    fn from(url: String) -> Self {
        normalize_url(&url)
    }
}

/// Normalizes a URL for frontier and sitemap membership
///
/// Surrounding whitespace is trimmed and a single trailing slash is stripped. Nothing
/// else is rewritten: scheme, host case, query and path are kept as given.
///
/// # Examples
///
/// ```
/// use doc_trawler::url::normalize_url;
///
/// assert_eq!(normalize_url("https://ex.com/docs/").as_str(), "https://ex.com/docs");
/// assert_eq!(normalize_url("https://ex.com/docs").as_str(), "https://ex.com/docs");
/// assert_eq!(normalize_url("https://ex.com/docs//").as_str(), "https://ex.com/docs/");
/// ```
pub fn normalize_url(url: &str) -> PageUrl {
    let trimmed = url.trim();
    PageUrl(trimmed.strip_suffix('/').unwrap_or(trimmed).to_string())
}

/// Strips a single trailing slash from a URL path
pub(crate) fn normalize_path(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}
