//! Torii-Gate: the trust boundary for untrusted document I/O
//!
//! This crate mediates every interaction a document-conversion host has with
//! untrusted external resources: fetching remote documents over HTTP(S) under
//! robots.txt and SSRF policy, and writing derived artifacts to local disk
//! through path sandboxing, race-free name allocation, and TOCTOU-safe opens.

pub mod config;
pub mod net;
pub mod retrieve;
pub mod robots;
pub mod sandbox;

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Torii-Gate operations
#[derive(Debug, Error)]
pub enum ToriiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("robots.txt disallows {url} for the configured user agent")]
    RobotsDisallowed { url: String },

    #[error("Remote input is disabled by policy, refusing to fetch {url}")]
    RemoteInputDisabled { url: String },

    #[error(transparent)]
    Network(#[from] NetworkSecurityError),

    #[error(transparent)]
    Path(#[from] PathSecurityError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Network-boundary violations raised by the secure fetch path
#[derive(Debug, Error)]
pub enum NetworkSecurityError {
    #[error("Refusing to connect to {url}: resolved address {address} is not a public address")]
    BlockedAddress { url: String, address: IpAddr },

    #[error("HTTPS is required but {url} uses scheme {scheme}")]
    HttpsRequired { url: String, scheme: String },

    #[error("HTTPS downgrade in redirect chain: redirect to {url} is not HTTPS")]
    HttpsDowngrade { url: String },

    #[error("Too many redirects fetching {url} (limit {limit})")]
    RedirectLimit { url: String, limit: u32 },

    #[error("Redirect response from {url} has no Location header")]
    MissingLocation { url: String },

    #[error("Response body for {url} exceeds the configured limit of {limit} bytes")]
    BodyTooLarge { url: String, limit: u64 },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Hostname {host} did not resolve to any address")]
    UnresolvedHost { host: String },

    #[error("Transport failure fetching {url}: {message}")]
    Transport {
        url: String,
        /// HTTP status, when the failure carried one
        status: Option<u16>,
        message: String,
    },
}

/// Path-domain violations raised by the output sandbox
#[derive(Debug, Error)]
pub enum PathSecurityError {
    #[error("Output path is empty")]
    EmptyPath,

    #[error("Path traversal detected: {path} resolves outside {root}")]
    Traversal { path: String, root: String },

    #[error("Refusing to write to sensitive system location: {path}")]
    SensitiveLocation { path: String },

    #[error("Path {path} is not within any allowed base directory")]
    OutsideAllowedDirs { path: String },

    #[error("allowed_base_dirs was supplied but is empty")]
    EmptyAllowlist,

    #[error("Refusing to open {path}: final component is a symlink")]
    SymlinkRefused { path: PathBuf },

    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown robots policy '{0}' (expected strict, warn, or ignore)")]
    InvalidPolicy(String),
}

/// Result type alias for Torii-Gate operations
pub type Result<T> = std::result::Result<T, ToriiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{RemoteFetchPolicy, RobotsPolicy, SandboxOptions};
pub use net::{classify_address, AddressClass, Fetcher, SecureFetcher};
pub use retrieve::{DocumentSource, DocumentSourceRetriever, Retrieval, RetrievedDocument};
pub use robots::{RobotsCache, RobotsTxtChecker, RobotsVerdict};
pub use sandbox::{
    allocate_unique_path, validate_output_path, write_validated, SecureWriter, WriteOutcome,
};
