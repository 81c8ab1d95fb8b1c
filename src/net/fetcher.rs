//! Secure HTTP fetch path
//!
//! This module performs all outbound HTTP requests for the crate, including:
//! - Building HTTP clients with the policy's user agent and timeouts
//! - Pre-flight DNS resolution and address validation before every connection
//! - Manual redirect handling with per-hop re-validation
//! - The ratcheting HTTPS invariant ("downgrade once, fail always")
//! - Hard body-size enforcement while streaming

use crate::config::RemoteFetchPolicy;
use crate::net::address::{classify_address, is_fetchable};
use crate::NetworkSecurityError;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::net::IpAddr;
use std::time::Duration;
use url::{Host, Url};

/// Result of a successful fetch
///
/// The HTTP status is carried even for non-2xx terminal responses because the
/// robots.txt checker needs to distinguish status classes; content callers
/// decide for themselves whether a non-success status is fatal.
#[derive(Debug)]
pub struct FetchedBody {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code of the terminal response
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl FetchedBody {
    /// Whether the terminal response was a 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The narrow seam both the robots checker and the retriever fetch through,
/// so tests can substitute doubles without touching production wiring
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &Url,
        policy: &RemoteFetchPolicy,
    ) -> Result<FetchedBody, NetworkSecurityError>;
}

/// Tracks the HTTPS requirement across a redirect chain
///
/// Once any hop in the chain is HTTPS the ratchet engages and a later HTTP
/// hop fails, naming that hop: downgrade once, fail always. An initial HTTP
/// URL may act as a pure redirector into HTTPS, but a terminal response is
/// never accepted over HTTP while the requirement is set.
#[derive(Debug)]
struct HttpsRatchet {
    require_https: bool,
    engaged: bool,
}

impl HttpsRatchet {
    fn new(require_https: bool, initial: &Url) -> Self {
        Self {
            require_https,
            engaged: require_https && initial.scheme() == "https",
        }
    }

    /// Validates a redirect target and advances the ratchet
    fn observe_redirect(&mut self, next: &Url) -> Result<(), NetworkSecurityError> {
        if !self.require_https {
            return Ok(());
        }
        if next.scheme() == "https" {
            self.engaged = true;
            return Ok(());
        }
        if self.engaged {
            return Err(NetworkSecurityError::HttpsDowngrade {
                url: next.to_string(),
            });
        }
        Ok(())
    }

    /// Validates the URL that produced a terminal (non-redirect) response
    fn check_terminal(&self, url: &Url) -> Result<(), NetworkSecurityError> {
        if self.require_https && url.scheme() != "https" {
            return Err(NetworkSecurityError::HttpsRequired {
                url: url.to_string(),
                scheme: url.scheme().to_string(),
            });
        }
        Ok(())
    }
}

/// Production fetcher with pre-flight and per-redirect-hop address validation
#[derive(Debug, Default, Clone)]
pub struct SecureFetcher;

impl SecureFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Builds an HTTP client for one request under the given policy
    ///
    /// Redirects are handled manually in [`Fetcher::fetch`] so every hop can
    /// be re-validated; the client itself never follows one.
    fn build_client(&self, policy: &RemoteFetchPolicy) -> Result<Client, NetworkSecurityError> {
        Client::builder()
            .user_agent(policy.user_agent.clone())
            .timeout(policy.timeout)
            .connect_timeout(policy.timeout.min(Duration::from_secs(10)))
            .redirect(Policy::none())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| NetworkSecurityError::Transport {
                url: String::new(),
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })
    }

    /// Resolves the URL's host and rejects the connection if any resolved
    /// address is not fetchable under the policy
    ///
    /// Literal IP hosts classify directly without a DNS lookup. Running this
    /// before every hop (not just the first) is what defends against
    /// redirect-to-internal and DNS-rebinding chains.
    async fn validate_target(
        &self,
        url: &Url,
        policy: &RemoteFetchPolicy,
    ) -> Result<Vec<IpAddr>, NetworkSecurityError> {
        let host = url.host().ok_or_else(|| NetworkSecurityError::InvalidUrl {
            url: url.to_string(),
            message: "URL has no host".to_string(),
        })?;

        let addresses: Vec<IpAddr> = match host {
            Host::Ipv4(ip) => vec![IpAddr::V4(ip)],
            Host::Ipv6(ip) => vec![IpAddr::V6(ip)],
            Host::Domain(domain) => {
                let port = url.port_or_known_default().unwrap_or(443);
                let resolved = tokio::net::lookup_host((domain, port)).await.map_err(|e| {
                    NetworkSecurityError::Transport {
                        url: url.to_string(),
                        status: None,
                        message: format!("DNS resolution failed for {}: {}", domain, e),
                    }
                })?;
                resolved.map(|addr| addr.ip()).collect()
            }
        };

        if addresses.is_empty() {
            return Err(NetworkSecurityError::UnresolvedHost {
                host: url.host_str().unwrap_or_default().to_string(),
            });
        }

        for address in &addresses {
            let class = classify_address(*address);
            if !is_fetchable(class, policy.allow_private_networks) {
                tracing::warn!(
                    "Blocked connection to {}: {} classified as {:?}",
                    url,
                    address,
                    class
                );
                return Err(NetworkSecurityError::BlockedAddress {
                    url: url.to_string(),
                    address: *address,
                });
            }
        }

        Ok(addresses)
    }

    /// Reads the response body while enforcing the size ceiling
    async fn read_body(
        &self,
        mut response: reqwest::Response,
        url: &Url,
        limit: u64,
    ) -> Result<Vec<u8>, NetworkSecurityError> {
        // Reject early when the server declares the size up front
        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(NetworkSecurityError::BodyTooLarge {
                    url: url.to_string(),
                    limit,
                });
            }
        }

        // Enforce while streaming regardless; Content-Length can lie
        let mut body = Vec::new();
        while let Some(chunk) =
            response
                .chunk()
                .await
                .map_err(|e| NetworkSecurityError::Transport {
                    url: url.to_string(),
                    status: None,
                    message: format!("error reading body: {}", e),
                })?
        {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(NetworkSecurityError::BodyTooLarge {
                    url: url.to_string(),
                    limit,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl Fetcher for SecureFetcher {
    /// Fetches a URL with full redirect-chain validation
    ///
    /// # Request flow
    ///
    /// 1. Validate the scheme (and HTTPS requirement) of the initial URL
    /// 2. For each hop: resolve the host, classify every resolved address,
    ///    and fail closed on any non-public address
    /// 3. On a redirect response: check the hop count, re-apply the HTTPS
    ///    requirement to the new URL, and loop
    /// 4. On a terminal response: read the body under the size ceiling
    ///
    /// No retries are performed here; retry policy is the caller's concern.
    async fn fetch(
        &self,
        url: &Url,
        policy: &RemoteFetchPolicy,
    ) -> Result<FetchedBody, NetworkSecurityError> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(NetworkSecurityError::InvalidUrl {
                    url: url.to_string(),
                    message: format!("unsupported scheme: {}", other),
                });
            }
        }

        let client = self.build_client(policy)?;
        let mut ratchet = HttpsRatchet::new(policy.require_https, url);
        let mut current = url.clone();
        let mut redirects: u32 = 0;

        loop {
            let resolved = self.validate_target(&current, policy).await?;
            tracing::debug!("Fetching {} (resolved to {:?})", current, resolved);

            let response = client.get(current.clone()).send().await.map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                NetworkSecurityError::Transport {
                    url: current.to_string(),
                    status: e.status().map(|s| s.as_u16()),
                    message,
                }
            })?;

            let status = response.status();

            if status.is_redirection() {
                redirects += 1;
                if redirects > policy.max_redirects {
                    return Err(NetworkSecurityError::RedirectLimit {
                        url: url.to_string(),
                        limit: policy.max_redirects,
                    });
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| NetworkSecurityError::MissingLocation {
                        url: current.to_string(),
                    })?;

                let next = current.join(location).map_err(|e| {
                    NetworkSecurityError::InvalidUrl {
                        url: location.to_string(),
                        message: format!("invalid redirect target: {}", e),
                    }
                })?;

                match next.scheme() {
                    "http" | "https" => {}
                    other => {
                        return Err(NetworkSecurityError::InvalidUrl {
                            url: next.to_string(),
                            message: format!("unsupported redirect scheme: {}", other),
                        });
                    }
                }

                ratchet.observe_redirect(&next)?;

                tracing::debug!("Redirect {} -> {}", current, next);
                current = next;
                continue;
            }

            ratchet.check_terminal(&current)?;

            let body = self
                .read_body(response, &current, policy.max_body_bytes)
                .await?;

            return Ok(FetchedBody {
                final_url: current,
                status: status.as_u16(),
                body,
            });
        }
    }
}
