//! Document source retrieval
//!
//! The top-level entry point on the read side: a URL or local path goes in,
//! a validated byte stream comes out. Remote sources pass through the
//! robots.txt checker and the secure fetcher; local sources are read
//! directly.

use crate::config::{RemoteFetchPolicy, RobotsPolicy};
use crate::net::{Fetcher, SecureFetcher};
use crate::robots::{RobotsCache, RobotsTxtChecker};
use crate::{NetworkSecurityError, Result, ToriiError};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// A document reference as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// http(s) URL
    Remote(Url),
    /// Anything else is treated as a local filesystem path
    Local(PathBuf),
}

impl DocumentSource {
    /// Parses an input string into a source
    ///
    /// Only `http://` and `https://` inputs are remote; other scheme-like
    /// prefixes (`C:\...`, `file.txt`) are local paths.
    pub fn parse(input: &str) -> Self {
        if let Ok(url) = Url::parse(input) {
            if matches!(url.scheme(), "http" | "https") {
                return DocumentSource::Remote(url);
            }
        }
        DocumentSource::Local(PathBuf::from(input))
    }
}

/// A successfully retrieved document
#[derive(Debug)]
pub struct RetrievedDocument {
    /// Raw document bytes
    pub data: Vec<u8>,
    /// The originating URL or path, for reporting
    pub origin: String,
    /// Whether robots.txt enforcement ran for this retrieval
    pub robots_checked: bool,
}

/// Outcome of a retrieval attempt
///
/// `Skipped` is the warn-policy degradation path: robots.txt disallowed the
/// URL but the policy said to record a warning rather than fail, so the
/// caller gets a skip it can degrade on without matching error kinds.
#[derive(Debug)]
pub enum Retrieval {
    Fetched(RetrievedDocument),
    Skipped { origin: String, reason: String },
}

/// Combines the robots checker and the secure fetcher into the validated
/// read path
pub struct DocumentSourceRetriever<F: Fetcher = SecureFetcher> {
    checker: RobotsTxtChecker<F>,
    fetcher: Arc<F>,
}

impl DocumentSourceRetriever<SecureFetcher> {
    /// Creates a retriever with the production fetcher and a private cache
    /// sized from the policy
    pub fn new(policy: &RemoteFetchPolicy) -> Self {
        let cache = Arc::new(RobotsCache::new(policy.robots_cache_duration));
        Self::with_parts(cache, Arc::new(SecureFetcher::new()))
    }
}

impl<F: Fetcher> DocumentSourceRetriever<F> {
    /// Creates a retriever over an injected cache and fetcher
    pub fn with_parts(cache: Arc<RobotsCache>, fetcher: Arc<F>) -> Self {
        Self {
            checker: RobotsTxtChecker::new(cache, Arc::clone(&fetcher)),
            fetcher,
        }
    }

    /// Retrieves a document from a URL or local path under the policy
    ///
    /// Remote flow: robots.txt verdict, advisory crawl-delay sleep, then the
    /// validated fetch. A non-2xx terminal status on the content fetch is a
    /// hard [`NetworkSecurityError::Transport`] carrying the status.
    pub async fn retrieve(
        &self,
        source: &DocumentSource,
        policy: &RemoteFetchPolicy,
    ) -> Result<Retrieval> {
        match source {
            DocumentSource::Remote(url) => self.retrieve_remote(url, policy).await,
            DocumentSource::Local(path) => {
                let data = tokio::fs::read(path).await?;
                Ok(Retrieval::Fetched(RetrievedDocument {
                    data,
                    origin: path.display().to_string(),
                    robots_checked: false,
                }))
            }
        }
    }

    async fn retrieve_remote(&self, url: &Url, policy: &RemoteFetchPolicy) -> Result<Retrieval> {
        if !policy.allow_remote_input {
            return Err(ToriiError::RemoteInputDisabled {
                url: url.to_string(),
            });
        }

        let verdict = self.checker.can_fetch(url, policy).await?;
        let robots_checked = policy.robots_policy != RobotsPolicy::Ignore;

        if !verdict.allowed {
            // Warn policy: the disallow was already logged; skip the fetch
            return Ok(Retrieval::Skipped {
                origin: url.to_string(),
                reason: "disallowed by robots.txt".to_string(),
            });
        }

        if let Some(delay) = verdict.crawl_delay {
            tracing::debug!("Honoring crawl-delay of {:?} before fetching {}", delay, url);
            tokio::time::sleep(delay).await;
        }

        let fetched = self.fetcher.fetch(url, policy).await?;
        if !fetched.is_success() {
            return Err(ToriiError::Network(NetworkSecurityError::Transport {
                url: url.to_string(),
                status: Some(fetched.status),
                message: format!("HTTP {}", fetched.status),
            }));
        }

        Ok(Retrieval::Fetched(RetrievedDocument {
            data: fetched.body,
            origin: fetched.final_url.to_string(),
            robots_checked,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_sources() {
        assert!(matches!(
            DocumentSource::parse("https://example.com/doc.pdf"),
            DocumentSource::Remote(_)
        ));
        assert!(matches!(
            DocumentSource::parse("http://example.com/"),
            DocumentSource::Remote(_)
        ));
    }

    #[test]
    fn test_parse_local_sources() {
        assert_eq!(
            DocumentSource::parse("./docs/report.docx"),
            DocumentSource::Local(PathBuf::from("./docs/report.docx"))
        );
        assert_eq!(
            DocumentSource::parse("/tmp/file.txt"),
            DocumentSource::Local(PathBuf::from("/tmp/file.txt"))
        );
        // Scheme-like but not http(s)
        assert!(matches!(
            DocumentSource::parse("file:///etc/passwd"),
            DocumentSource::Local(_)
        ));
    }

    #[tokio::test]
    async fn test_remote_input_disabled() {
        let policy = RemoteFetchPolicy {
            allow_remote_input: false,
            ..RemoteFetchPolicy::default()
        };
        let retriever = DocumentSourceRetriever::new(&policy);
        let source = DocumentSource::parse("https://example.com/doc");

        let result = retriever.retrieve(&source, &policy).await;
        assert!(matches!(
            result,
            Err(ToriiError::RemoteInputDisabled { .. })
        ));
    }

    #[tokio::test]
    async fn test_local_retrieval_reads_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"document body").unwrap();
        file.flush().unwrap();

        let policy = RemoteFetchPolicy::default();
        let retriever = DocumentSourceRetriever::new(&policy);
        let source = DocumentSource::Local(file.path().to_path_buf());

        match retriever.retrieve(&source, &policy).await.unwrap() {
            Retrieval::Fetched(doc) => {
                assert_eq!(doc.data, b"document body");
                assert!(!doc.robots_checked);
            }
            Retrieval::Skipped { .. } => panic!("local read should not be skipped"),
        }
    }

    #[tokio::test]
    async fn test_missing_local_file_is_io_error() {
        let policy = RemoteFetchPolicy::default();
        let retriever = DocumentSourceRetriever::new(&policy);
        let source = DocumentSource::Local(PathBuf::from("/nonexistent/definitely/missing"));

        let result = retriever.retrieve(&source, &policy).await;
        assert!(matches!(result, Err(ToriiError::Io(_))));
    }
}
