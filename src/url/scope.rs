use crate::url::normalize::normalize_path;
use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// The crawl scope: one network location and a root path beneath it
///
/// Immutable for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    scheme: String,
    host: String,
    port: Option<u16>,
    root_path: String,
}

impl Scope {
    /// Builds the scope of a root URL
    ///
    /// # Errors
    ///
    /// Fails when the URL cannot be parsed, is not http(s), or has no host.
    ///
    /// # Examples
    ///
    /// ```
    /// use doc_trawler::url::Scope;
    ///
    /// let scope = Scope::new("https://ex.com/docs/").unwrap();
    /// assert_eq!(scope.network_location(), "https://ex.com");
    /// assert_eq!(scope.root_path(), "/docs");
    /// ```
    pub fn new(root_url: &str) -> UrlResult<Self> {
        let url = Url::parse(root_url.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(UrlError::InvalidScheme(url.scheme().to_string()));
        }

        let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_string();

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port_or_known_default(),
            root_path: normalize_path(url.path()).to_string(),
        })
    }

    /// Scheme, host and (non-default) port, e.g. `https://ex.com:8443`
    pub fn network_location(&self) -> String {
        let default_port = match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        };
        match self.port {
            Some(port) if Some(port) != default_port => {
                format!("{}://{}:{}", self.scheme, self.host, port)
            }
            _ => format!("{}://{}", self.scheme, self.host),
        }
    }

    /// The root path with any trailing slash removed (`""` for the site root)
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// The host every in-scope URL shares
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns true if `url` belongs to this scope
    pub fn contains(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };

        parsed.scheme() == self.scheme
            && parsed.host_str() == Some(self.host.as_str())
            && parsed.port_or_known_default() == self.port
            && normalize_path(parsed.path()).starts_with(&self.root_path)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.network_location(), self.root_path)
    }
}

/// Decides whether a URL belongs to the crawl scope
///
/// True iff the URL's network location equals the scope's and its path, with a trailing
/// slash removed, starts with the scope's root path (also without trailing slash).
/// Unparseable URLs are never in scope.
pub fn in_scope(url: &str, scope: &Scope) -> bool {
    scope.contains(url)
}
