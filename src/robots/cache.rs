//! Robots.txt caching implementation
//!
//! A process-wide-capable, lock-protected map from robots.txt URL to an
//! immutable cache entry. Entries are replaced wholesale on refresh, never
//! mutated in place, so concurrent readers share them through `Arc` without
//! per-field locking.

use crate::config::RemoteFetchPolicy;
use crate::net::Fetcher;
use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Cached robots.txt state for one robots.txt URL
///
/// Immutable once created. `fetch_failed` records that the rule set is a
/// fallback (fail-open or fail-closed) rather than parsed server content, so
/// the decision stays auditable.
#[derive(Debug)]
pub struct RobotsCacheEntry {
    /// The effective rule set
    pub rules: ParsedRobots,

    /// When the robots.txt was fetched (or the fetch failed)
    pub fetched_at: DateTime<Utc>,

    /// Whether the fetch failed and the rule set is a fallback
    pub fetch_failed: bool,

    /// HTTP status of the robots.txt response, when one was received
    pub http_status: Option<u16>,
}

impl RobotsCacheEntry {
    /// Builds an entry from an HTTP response, applying the RFC 9309 status
    /// semantics
    ///
    /// - 2xx: parse the body (malformed content degrades, never errors)
    /// - 4xx: the file is unavailable, which means no restrictions
    /// - 5xx: temporary full disallow, failing closed during outages
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let (rules, fetch_failed) = match status {
            200..=299 => (ParsedRobots::from_content(&String::from_utf8_lossy(body)), false),
            400..=499 => (ParsedRobots::allow_all(), false),
            500..=599 => (ParsedRobots::deny_all(), true),
            _ => (ParsedRobots::allow_all(), true),
        };

        Self {
            rules,
            fetched_at: Utc::now(),
            fetch_failed,
            http_status: Some(status),
        }
    }

    /// Builds an entry for a transport-level failure (timeout, DNS failure,
    /// connection refused)
    ///
    /// Fails open: an indistinguishable network failure should not block the
    /// larger operation, but `fetch_failed` keeps the decision observable.
    pub fn transport_failure() -> Self {
        Self {
            rules: ParsedRobots::allow_all(),
            fetched_at: Utc::now(),
            fetch_failed: true,
            http_status: None,
        }
    }

    /// Whether this entry is still inside the cache window
    pub fn is_fresh(&self, window: Duration) -> bool {
        let window = chrono::Duration::from_std(window).unwrap_or(chrono::Duration::max_value());
        Utc::now() - self.fetched_at <= window
    }
}

/// Lock-protected map from robots.txt URL to cache entry
///
/// Keyed by the full robots.txt URL (scheme + host + port), never by bare
/// host, so two hosts with identical robots.txt content still get distinct
/// entries. Explicitly constructed and injectable; tests instantiate
/// independent caches, and [`shared_cache`] provides the process-wide
/// convenience instance.
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<RobotsCacheEntry>>>,
    cache_duration: Duration,
}

impl RobotsCache {
    /// Creates an empty cache whose entries stay fresh for `cache_duration`
    pub fn new(cache_duration: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            cache_duration,
        }
    }

    /// Removes every entry (used mainly by tests)
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached entry for `key` if it is still fresh
    fn get_fresh(&self, key: &str) -> Option<Arc<RobotsCacheEntry>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.cache_duration))
            .cloned()
    }

    /// Inserts `entry` unless a fresh entry appeared in the meantime, and
    /// returns whichever entry won
    ///
    /// Two tasks racing on a never-before-seen host may both fetch once;
    /// keeping the first fresh entry makes the race benign rather than a
    /// replacement storm.
    fn insert_or_keep(&self, key: String, entry: Arc<RobotsCacheEntry>) -> Arc<RobotsCacheEntry> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key) {
            if existing.is_fresh(self.cache_duration) {
                return Arc::clone(existing);
            }
        }
        entries.insert(key, Arc::clone(&entry));
        entry
    }

    /// Looks up the entry for `robots_url`, fetching it if absent or stale
    ///
    /// The lock is held only for the lookup and the insert, never across the
    /// network call, so a slow host cannot block checks for unrelated hosts.
    /// After the first successful population, lookups within the cache window
    /// return the stored entry with no network access.
    ///
    /// Fetch failures never propagate from here: they degrade to the
    /// RFC 9309 fallback rule sets with a log record.
    pub async fn get_or_fetch(
        &self,
        robots_url: &Url,
        policy: &RemoteFetchPolicy,
        fetcher: &dyn Fetcher,
    ) -> Arc<RobotsCacheEntry> {
        let key = robots_url.as_str().to_string();

        if let Some(entry) = self.get_fresh(&key) {
            tracing::debug!("robots.txt cache hit for {}", robots_url);
            return entry;
        }

        tracing::debug!("Fetching robots.txt from {}", robots_url);
        let entry = match fetcher.fetch(robots_url, policy).await {
            Ok(fetched) => {
                tracing::debug!(
                    "robots.txt for {} returned HTTP {}",
                    robots_url,
                    fetched.status
                );
                Arc::new(RobotsCacheEntry::from_response(fetched.status, &fetched.body))
            }
            Err(e) => {
                tracing::warn!(
                    "robots.txt fetch failed for {}: {} (failing open)",
                    robots_url,
                    e
                );
                Arc::new(RobotsCacheEntry::transport_failure())
            }
        };

        self.insert_or_keep(key, entry)
    }
}

static SHARED: Lazy<RobotsCache> = Lazy::new(|| RobotsCache::new(Duration::from_secs(30 * 60)));

/// Process-wide default cache instance
///
/// A thin convenience over the injectable type; anything that needs isolation
/// (tests in particular) should construct its own [`RobotsCache`].
pub fn shared_cache() -> &'static RobotsCache {
    &SHARED
}
