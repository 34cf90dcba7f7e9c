//! Robots.txt handling
//!
//! Fetches each origin's robots.txt once, caches the rules and answers allow/deny and
//! crawl-delay questions for the HTTP fetcher.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsRules;

use url::Url;

/// Fetches and parses robots.txt for the origin of `url`
///
/// Any failure (transport error, non-success status, unreadable body) yields
/// [`RobotsRules::AllowAll`].
pub async fn fetch_robots(client: &reqwest::Client, url: &Url) -> RobotsRules {
    let Ok(robots_url) = url.join("/robots.txt") else {
        return RobotsRules::AllowAll;
    };

    let response = match client.get(robots_url.as_str()).send().await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::debug!(url = %robots_url, status = %response.status(), "No robots.txt, allowing all");
            return RobotsRules::AllowAll;
        }
        Err(e) => {
            tracing::debug!(url = %robots_url, error = %e, "robots.txt fetch failed, allowing all");
            return RobotsRules::AllowAll;
        }
    };

    match response.text().await {
        Ok(body) => RobotsRules::from_content(&body),
        Err(e) => {
            tracing::debug!(url = %robots_url, error = %e, "Unreadable robots.txt, allowing all");
            RobotsRules::AllowAll
        }
    }
}
