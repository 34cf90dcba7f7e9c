use robotstxt::DefaultMatcher;

/// Rules from one host's robots.txt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotsRules {
    /// No usable robots.txt; everything is allowed
    AllowAll,
    /// Raw robots.txt body, matched on demand
    Rules(String),
}

impl RobotsRules {
    /// Wraps a robots.txt body; an empty body allows everything
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            Self::AllowAll
        } else {
            Self::Rules(content.to_string())
        }
    }

    /// Checks whether `url` may be fetched by `user_agent`
    ///
    /// `url` may be absolute or a bare path with optional query.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::Rules(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, product_token(user_agent), url)
            }
        }
    }

    /// Crawl-delay for `user_agent` in seconds, preferring a group naming the agent
    /// over the `*` group
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let Self::Rules(body) = self else {
            return None;
        };

        let agent = product_token(user_agent).to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group.clear();
                    }
                    in_agent_lines = true;
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group.iter().any(|ua| *ua == agent) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        specific.or(wildcard)
    }
}

/// The product token of a user agent ("doc-trawler/1.0 (+url)" -> "doc-trawler")
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .find(|s| !s.is_empty())
        .unwrap_or(user_agent)
}
