//! Robots.txt parser implementation
//!
//! A thin wrapper around the robotstxt crate's matcher with explicit
//! allow-all and deny-all rule sets for the RFC 9309 failure modes.

use robotstxt::DefaultMatcher;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleMode {
    /// Evaluate the stored robots.txt content per user agent
    Rules,
    /// Everything allowed (404, transport failure, empty file)
    AllowAll,
    /// Everything denied (5xx: fail closed to protect the origin)
    DenyAll,
}

/// Parsed robots.txt rule set
///
/// Construction never fails: arbitrary or binary content degrades to
/// whatever the matcher can extract from it, never to an error.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    content: String,
    mode: RuleMode,
}

impl ParsedRobots {
    /// Creates a rule set from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            mode: RuleMode::Rules,
        }
    }

    /// Creates a permissive rule set that allows everything
    ///
    /// Used when robots.txt does not exist (404) or could not be fetched at
    /// the transport level.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            mode: RuleMode::AllowAll,
        }
    }

    /// Creates a restrictive rule set that denies everything
    ///
    /// Used for 5xx responses: a temporarily failing origin is treated as
    /// fully disallowed until the cache entry expires.
    pub fn deny_all() -> Self {
        Self {
            content: String::new(),
            mode: RuleMode::DenyAll,
        }
    }

    /// Checks whether a URL path is allowed for the given user agent
    ///
    /// The most specific user-agent group wins over the wildcard group; this
    /// is the robotstxt crate's standard matching behavior.
    pub fn is_allowed(&self, path: &str, user_agent: &str) -> bool {
        match self.mode {
            RuleMode::AllowAll => true,
            RuleMode::DenyAll => false,
            RuleMode::Rules => {
                if self.content.is_empty() {
                    return true;
                }
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(&self.content, user_agent, path)
            }
        }
    }

    /// Gets the crawl delay in seconds for a specific user agent
    ///
    /// The robotstxt crate does not surface Crawl-delay, so the directive is
    /// parsed by hand: it applies to the most recent User-agent group, and a
    /// group naming the agent specifically wins over the wildcard group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.mode != RuleMode::Rules || self.content.is_empty() {
            return None;
        }

        let mut current_user_agents: Vec<String> = Vec::new();
        let mut crawl_delay_for_wildcard: Option<f64> = None;
        let mut crawl_delay_for_agent: Option<f64> = None;

        let normalized_agent = user_agent.to_lowercase();

        for line in self.content.lines() {
            let trimmed = line.trim();

            // Skip comments and empty lines
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = trimmed.split_once(':') {
                let key = key.trim().to_lowercase();
                let value = value.trim();

                match key.as_str() {
                    "user-agent" => {
                        // Multiple User-agent lines belong to the same group
                        current_user_agents.push(value.to_lowercase());
                    }
                    "crawl-delay" => {
                        if let Ok(delay) = value.parse::<f64>() {
                            if current_user_agents
                                .iter()
                                .any(|ua| ua == "*" || normalized_agent.contains(ua))
                            {
                                if current_user_agents.contains(&"*".to_string()) {
                                    crawl_delay_for_wildcard = Some(delay);
                                } else {
                                    crawl_delay_for_agent = Some(delay);
                                }
                            }
                        }
                        // The next User-agent directive starts a new group
                        current_user_agents.clear();
                    }
                    _ => {
                        // Allow/Disallow and friends don't affect delay parsing
                    }
                }
            }
        }

        // Prefer the specific user-agent delay over the wildcard delay
        crawl_delay_for_agent.or(crawl_delay_for_wildcard)
    }
}
