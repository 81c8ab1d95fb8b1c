//! Robots.txt permission checking
//!
//! Orchestrates fetch-or-reuse of a host's robots.txt and evaluates fetch
//! permission and crawl delay for a candidate URL under the configured
//! enforcement policy.

use crate::config::{RemoteFetchPolicy, RobotsPolicy};
use crate::net::Fetcher;
use crate::robots::RobotsCache;
use crate::{Result, ToriiError};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Outcome of a robots.txt check
#[derive(Debug, Clone, PartialEq)]
pub struct RobotsVerdict {
    /// Whether robots.txt permits fetching the URL
    pub allowed: bool,

    /// Advisory delay before issuing the content request, from the matching
    /// user-agent group. Sleeping it is the caller's contract.
    pub crawl_delay: Option<Duration>,
}

impl RobotsVerdict {
    fn allow_unchecked() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }
}

/// Derives the robots.txt URL for a target URL
///
/// Keeps scheme, host, and port; the original path and query are discarded.
/// Keying on the full robots.txt URL (not the bare host) is what keeps two
/// hosts from ever sharing a cache entry.
pub fn robots_url_for(url: &Url) -> Result<Url> {
    let mut robots_url = url.clone();
    if robots_url.host_str().is_none() {
        return Err(ToriiError::Network(
            crate::NetworkSecurityError::InvalidUrl {
                url: url.to_string(),
                message: "URL has no host".to_string(),
            },
        ));
    }
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);
    Ok(robots_url)
}

/// Policy-aware robots.txt checker
///
/// Generic over the [`Fetcher`] so tests can drive it with canned responses.
pub struct RobotsTxtChecker<F: Fetcher> {
    cache: Arc<RobotsCache>,
    fetcher: Arc<F>,
}

impl<F: Fetcher> RobotsTxtChecker<F> {
    pub fn new(cache: Arc<RobotsCache>, fetcher: Arc<F>) -> Self {
        Self { cache, fetcher }
    }

    /// Decides whether `url` may be fetched under the policy
    ///
    /// # Policy semantics
    ///
    /// - `Ignore`: returns allowed immediately with no network access and no
    ///   cache entry
    /// - `Strict`: a disallow is a hard [`ToriiError::RobotsDisallowed`]; the
    ///   caller performs zero content fetches
    /// - `Warn`: a disallow is logged once and returned as `allowed: false`
    ///
    /// The robots.txt fetch itself goes through the fetcher directly and is
    /// never subject to robots.txt enforcement.
    pub async fn can_fetch(&self, url: &Url, policy: &RemoteFetchPolicy) -> Result<RobotsVerdict> {
        if policy.robots_policy == RobotsPolicy::Ignore {
            return Ok(RobotsVerdict::allow_unchecked());
        }

        let robots_url = robots_url_for(url)?;
        let entry = self
            .cache
            .get_or_fetch(&robots_url, policy, self.fetcher.as_ref())
            .await;

        let allowed = entry.rules.is_allowed(url.path(), &policy.user_agent);
        let crawl_delay = entry
            .rules
            .crawl_delay(&policy.user_agent)
            .filter(|d| *d > 0.0)
            .map(Duration::from_secs_f64);

        if !allowed {
            match policy.robots_policy {
                RobotsPolicy::Strict => {
                    return Err(ToriiError::RobotsDisallowed {
                        url: url.to_string(),
                    });
                }
                RobotsPolicy::Warn => {
                    tracing::warn!("robots.txt disallows {}, continuing per warn policy", url);
                }
                RobotsPolicy::Ignore => unreachable!("handled above"),
            }
        }

        Ok(RobotsVerdict {
            allowed,
            crawl_delay,
        })
    }
}
