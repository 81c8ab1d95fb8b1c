use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Robots.txt enforcement policy
///
/// Controls what happens when robots.txt disallows a URL: `Strict` makes it a
/// hard failure, `Warn` records a warning and skips the fetch, `Ignore`
/// bypasses robots.txt entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotsPolicy {
    Strict,
    Warn,
    Ignore,
}

impl FromStr for RobotsPolicy {
    type Err = ConfigError;

    /// Parses a policy string case-insensitively ("strict" | "warn" | "ignore")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(RobotsPolicy::Strict),
            "warn" => Ok(RobotsPolicy::Warn),
            "ignore" => Ok(RobotsPolicy::Ignore),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for RobotsPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Policy governing remote document retrieval
///
/// Immutable once constructed; every fetch-side component takes a reference
/// to this and keeps no other configuration state.
#[derive(Debug, Clone)]
pub struct RemoteFetchPolicy {
    /// Whether remote (http/https) inputs are accepted at all
    pub allow_remote_input: bool,

    /// Require HTTPS for the initial URL and every redirect hop
    pub require_https: bool,

    /// Explicit opt-in to private/loopback/link-local targets (disables the
    /// SSRF guard; intended for tests and deliberately internal deployments)
    pub allow_private_networks: bool,

    /// Per-request timeout (connect + read)
    pub timeout: Duration,

    /// Hard ceiling on received body size in bytes
    pub max_body_bytes: u64,

    /// Maximum redirect hops before the fetch fails
    pub max_redirects: u32,

    /// User-agent string sent with every request and matched against
    /// robots.txt groups
    pub user_agent: String,

    /// Robots.txt enforcement policy
    pub robots_policy: RobotsPolicy,

    /// How long a fetched robots.txt stays fresh in the cache
    pub robots_cache_duration: Duration,
}

impl Default for RemoteFetchPolicy {
    fn default() -> Self {
        Self {
            allow_remote_input: true,
            require_https: false,
            allow_private_networks: false,
            timeout: Duration::from_secs(30),
            max_body_bytes: 50 * 1024 * 1024,
            max_redirects: 5,
            user_agent: format!("torii-gate/{}", env!("CARGO_PKG_VERSION")),
            robots_policy: RobotsPolicy::Strict,
            robots_cache_duration: Duration::from_secs(30 * 60),
        }
    }
}

/// Options for output-path validation
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Reject traversal outside the working directory and sensitive system
    /// locations
    pub block_sensitive_paths: bool,

    /// When supplied, the resolved path must descend from one of these
    /// directories and working-directory reasoning is bypassed. Supplying an
    /// empty list is a configuration error, not "allow nothing".
    pub allowed_base_dirs: Option<Vec<PathBuf>>,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            block_sensitive_paths: true,
            allowed_base_dirs: None,
        }
    }
}

/// Main configuration structure for the torii-gate binary
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Fetch policy as written in the TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Whether remote URLs are accepted as input
    #[serde(rename = "allow-remote-input", default = "default_true")]
    pub allow_remote_input: bool,

    /// Require HTTPS on the initial URL and every redirect hop
    #[serde(rename = "require-https", default)]
    pub require_https: bool,

    /// Allow fetching from private/loopback addresses
    #[serde(rename = "allow-private-networks", default)]
    pub allow_private_networks: bool,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-seconds", default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum body size in bytes
    #[serde(rename = "max-body-bytes", default = "default_max_body")]
    pub max_body_bytes: u64,

    /// Maximum redirect hops
    #[serde(rename = "max-redirects", default = "default_redirects")]
    pub max_redirects: u32,

    /// User-agent string
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Robots.txt policy: strict | warn | ignore
    #[serde(rename = "robots-policy", default = "default_robots_policy")]
    pub robots_policy: RobotsPolicy,

    /// Robots.txt cache freshness window in minutes
    #[serde(rename = "robots-cache-minutes", default = "default_cache_minutes")]
    pub robots_cache_minutes: u64,
}

/// Output sandbox configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory converted documents and attachments are written into
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Block sensitive system locations and traversal outside the working
    /// directory
    #[serde(rename = "block-sensitive-paths", default = "default_true")]
    pub block_sensitive_paths: bool,

    /// Optional allowlist of base directories
    #[serde(rename = "allowed-base-dirs", default)]
    pub allowed_base_dirs: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

fn default_max_body() -> u64 {
    50 * 1024 * 1024
}

fn default_redirects() -> u32 {
    5
}

fn default_user_agent() -> String {
    format!("torii-gate/{}", env!("CARGO_PKG_VERSION"))
}

fn default_robots_policy() -> RobotsPolicy {
    RobotsPolicy::Strict
}

fn default_cache_minutes() -> u64 {
    30
}

impl FetchConfig {
    /// Converts the file representation into the runtime policy value
    pub fn to_policy(&self) -> RemoteFetchPolicy {
        RemoteFetchPolicy {
            allow_remote_input: self.allow_remote_input,
            require_https: self.require_https,
            allow_private_networks: self.allow_private_networks,
            timeout: Duration::from_secs(self.timeout_seconds),
            max_body_bytes: self.max_body_bytes,
            max_redirects: self.max_redirects,
            user_agent: self.user_agent.clone(),
            robots_policy: self.robots_policy,
            robots_cache_duration: Duration::from_secs(self.robots_cache_minutes * 60),
        }
    }
}

impl OutputConfig {
    /// Converts the file representation into sandbox options
    pub fn to_sandbox_options(&self) -> SandboxOptions {
        SandboxOptions {
            block_sensitive_paths: self.block_sensitive_paths,
            allowed_base_dirs: if self.allowed_base_dirs.is_empty() {
                None
            } else {
                Some(self.allowed_base_dirs.iter().map(PathBuf::from).collect())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_policy_case_insensitive() {
        assert_eq!("strict".parse::<RobotsPolicy>().unwrap(), RobotsPolicy::Strict);
        assert_eq!("STRICT".parse::<RobotsPolicy>().unwrap(), RobotsPolicy::Strict);
        assert_eq!("Warn".parse::<RobotsPolicy>().unwrap(), RobotsPolicy::Warn);
        assert_eq!(" ignore ".parse::<RobotsPolicy>().unwrap(), RobotsPolicy::Ignore);
    }

    #[test]
    fn test_robots_policy_rejects_unknown() {
        let result = "polite".parse::<RobotsPolicy>();
        assert!(matches!(result, Err(ConfigError::InvalidPolicy(_))));
    }

    #[test]
    fn test_default_policy_values() {
        let policy = RemoteFetchPolicy::default();
        assert!(policy.allow_remote_input);
        assert!(!policy.require_https);
        assert!(!policy.allow_private_networks);
        assert_eq!(policy.max_redirects, 5);
        assert_eq!(policy.robots_policy, RobotsPolicy::Strict);
        assert_eq!(policy.robots_cache_duration, Duration::from_secs(1800));
    }

    #[test]
    fn test_fetch_config_to_policy() {
        let config = FetchConfig {
            allow_remote_input: true,
            require_https: true,
            allow_private_networks: false,
            timeout_seconds: 10,
            max_body_bytes: 1024,
            max_redirects: 3,
            user_agent: "test-bot/1.0".to_string(),
            robots_policy: RobotsPolicy::Warn,
            robots_cache_minutes: 5,
        };

        let policy = config.to_policy();
        assert!(policy.require_https);
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert_eq!(policy.max_body_bytes, 1024);
        assert_eq!(policy.robots_policy, RobotsPolicy::Warn);
        assert_eq!(policy.robots_cache_duration, Duration::from_secs(300));
    }

    #[test]
    fn test_empty_allowlist_maps_to_none() {
        let config = OutputConfig {
            output_dir: "./out".to_string(),
            block_sensitive_paths: true,
            allowed_base_dirs: vec![],
        };
        assert!(config.to_sandbox_options().allowed_base_dirs.is_none());
    }
}
