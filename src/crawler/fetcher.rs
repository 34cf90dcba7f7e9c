//! Page fetching
//!
//! The crawl core only sees the [`Fetcher`] trait. [`HttpFetcher`] is the built-in
//! implementation:
//! - skips excluded domains and honors robots.txt
//! - waits a politeness delay with random jitter before each request
//! - accepts only successful HTML responses
//! - returns markdown text, structured links and the raw markup

use crate::config::CrawlConfig;
use crate::crawler::parser::{html_to_text, parse_html};
use crate::robots::{fetch_robots, RobotsCache, RobotsRules};
use crate::url::{is_excluded_domain, normalize_url, PageUrl};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// Final URL after redirects, normalized
    pub url: PageUrl,
    pub title: Option<String>,
    /// Page content as markdown
    pub text: String,
    /// Absolute links extracted from the page structure
    pub links: Vec<String>,
    /// Raw markup, when the fetcher has it
    pub markup: Option<String>,
    /// Final URL as served, before normalization; relative links in `markup`
    /// resolve against it
    pub base_url: Option<Url>,
}

/// Reasons a fetch did not produce a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{url} is on an excluded domain")]
    ExcludedDomain { url: String },

    #[error("{url} is disallowed by robots.txt")]
    RobotsDenied { url: String },

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} is not HTML ({content_type})")]
    ContentMismatch { url: String, content_type: String },

    #[error("Failed to convert {url}: {message}")]
    Conversion { url: String, message: String },
}

/// Retrieves pages for the crawl
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches one page
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;

    /// Releases resources held by the fetcher; called once when a crawl ends
    async fn close(&self) {}
}

/// Builds an HTTP client with the configured user agent and timeouts
///
/// # Example
///
/// ```
/// use doc_trawler::config::CrawlConfig;
/// use doc_trawler::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Plain HTTP fetcher
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    robots: Arc<RobotsCache>,
    respect_robots: bool,
    excluded_domains: Vec<String>,
    excluded_tags: Vec<String>,
    exclude_external_links: bool,
    politeness_delay: Duration,
    politeness_jitter_ms: u64,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            user_agent: config.user_agent.clone(),
            robots: Arc::new(RobotsCache::new()),
            respect_robots: config.respect_robots,
            excluded_domains: config.excluded_domains.clone(),
            excluded_tags: config.excluded_tags.clone(),
            exclude_external_links: config.exclude_external_links,
            politeness_delay: Duration::from_millis(config.politeness_delay_ms),
            politeness_jitter_ms: config.politeness_jitter_ms,
        })
    }

    async fn robots_for(&self, url: &Url) -> Arc<RobotsRules> {
        let origin = url.origin().ascii_serialization();
        self.robots
            .get_or_load(&origin, || fetch_robots(&self.client, url))
            .await
    }

    /// Politeness delay for the next request: the configured delay (or the site's
    /// crawl-delay, if longer) plus uniform jitter
    fn politeness_delay(&self, crawl_delay: Option<f64>) -> Duration {
        let base = crawl_delay
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map_or(self.politeness_delay, |d| d.max(self.politeness_delay));

        let jitter = if self.politeness_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.politeness_jitter_ms)
        } else {
            0
        };
        base + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if is_excluded_domain(&parsed, &self.excluded_domains) {
            return Err(FetchError::ExcludedDomain {
                url: url.to_string(),
            });
        }

        let mut crawl_delay = None;
        if self.respect_robots {
            let rules = self.robots_for(&parsed).await;
            if !rules.is_allowed(parsed.as_str(), &self.user_agent) {
                return Err(FetchError::RobotsDenied {
                    url: url.to_string(),
                });
            }
            crawl_delay = rules.crawl_delay(&self.user_agent);
        }

        let delay = self.politeness_delay(crawl_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                message: classify_network_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_html(&content_type) {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let parsed_page = parse_html(&body, &final_url);
        let mut links = parsed_page.links;
        if self.exclude_external_links {
            links.retain(|link| same_host(link, &final_url));
        }

        let text = html_to_text(&body, &self.excluded_tags).map_err(|message| {
            FetchError::Conversion {
                url: url.to_string(),
                message,
            }
        })?;

        tracing::debug!(url = %final_url, links = links.len(), chars = text.len(), "Fetched page");

        Ok(FetchedPage {
            url: normalize_url(final_url.as_str()),
            title: parsed_page.title,
            text,
            links,
            markup: Some(body),
            base_url: Some(final_url),
        })
    }

    async fn close(&self) {
        tracing::debug!(origins = self.robots.len(), "Closing HTTP fetcher");
        self.robots.clear();
    }
}

fn is_html(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

fn same_host(link: &str, page: &Url) -> bool {
    Url::parse(link)
        .map(|u| u.host_str() == page.host_str())
        .unwrap_or(false)
}

fn classify_network_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else if e.is_redirect() {
        format!("redirect error: {e}")
    } else {
        e.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> CrawlConfig {
        CrawlConfig {
            politeness_delay_ms: 0,
            politeness_jitter_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&CrawlConfig::default()).is_ok());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("Text/HTML"));
        assert!(is_html("application/xhtml+xml"));
        assert!(!is_html("application/pdf"));
        assert!(!is_html(""));
    }

    #[test]
    fn test_same_host() {
        let page = Url::parse("https://ex.com/docs").unwrap();
        assert!(same_host("https://ex.com/other", &page));
        assert!(!same_host("https://cdn.ex.com/x", &page));
        assert!(!same_host("not a url", &page));
    }

    #[test]
    fn test_politeness_delay_bounds() {
        let config = CrawlConfig {
            politeness_delay_ms: 100,
            politeness_jitter_ms: 50,
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        for _ in 0..20 {
            let delay = fetcher.politeness_delay(None);
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_crawl_delay_raises_politeness_delay() {
        let fetcher = HttpFetcher::new(&quiet_config()).unwrap();
        assert_eq!(fetcher.politeness_delay(None), Duration::ZERO);
        assert_eq!(fetcher.politeness_delay(Some(2.0)), Duration::from_secs(2));
        assert_eq!(fetcher.politeness_delay(Some(-1.0)), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_excluded_domain_rejected_without_request() {
        let config = CrawlConfig {
            excluded_domains: vec!["*.blocked.test".to_string()],
            ..quiet_config()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        let err = fetcher
            .fetch("http://docs.blocked.test/guide")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ExcludedDomain { .. }));
    }

    #[tokio::test]
    async fn test_directory_page_keeps_served_url_as_base() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><a href="intro">Intro</a></body></html>"#,
                "text/html",
            ))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(&quiet_config()).unwrap();
        let page = fetcher
            .fetch(&format!("{}/docs/", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.url.as_str(), format!("{}/docs", server.uri()));
        assert_eq!(
            page.base_url.map(String::from),
            Some(format!("{}/docs/", server.uri()))
        );
        assert_eq!(page.links, vec![format!("{}/docs/intro", server.uri())]);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let fetcher = HttpFetcher::new(&quiet_config()).unwrap();
        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
