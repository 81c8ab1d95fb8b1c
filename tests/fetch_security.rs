//! Integration tests for the fetch side of the trust boundary
//!
//! These use wiremock to stand in for remote origins and exercise the
//! retriever, the robots.txt engine, and the secure fetcher end-to-end.
//! Mock servers listen on loopback, so policies here opt into private
//! networks; reserved addresses stay blocked regardless, which is what the
//! per-hop validation tests lean on.

use std::time::{Duration, Instant};
use torii_gate::config::{RemoteFetchPolicy, RobotsPolicy};
use torii_gate::net::{Fetcher, SecureFetcher};
use torii_gate::retrieve::{DocumentSource, DocumentSourceRetriever, Retrieval};
use torii_gate::{NetworkSecurityError, ToriiError};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_policy(robots_policy: RobotsPolicy) -> RemoteFetchPolicy {
    RemoteFetchPolicy {
        allow_private_networks: true,
        timeout: Duration::from_secs(5),
        user_agent: "test-bot/1.0".to_string(),
        robots_policy,
        ..RemoteFetchPolicy::default()
    }
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_retrieves_allowed_page() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /admin/\n").await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"document bytes".to_vec()))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/page", server.uri()));

    match retriever.retrieve(&source, &policy).await.unwrap() {
        Retrieval::Fetched(doc) => {
            assert_eq!(doc.data, b"document bytes");
            assert!(doc.robots_checked);
        }
        Retrieval::Skipped { .. } => panic!("allowed page must not be skipped"),
    }
}

#[tokio::test]
async fn test_strict_disallow_blocks_content_fetch() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /admin/\n").await;

    // Zero content fetches may happen for the disallowed path
    Mock::given(method("GET"))
        .and(path("/admin/secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/admin/secret", server.uri()));

    let result = retriever.retrieve(&source, &policy).await;
    match result {
        Err(ToriiError::RobotsDisallowed { url }) => {
            assert!(url.contains("/admin/secret"));
        }
        other => panic!("expected RobotsDisallowed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_robots_fetched_once_across_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /\n"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);

    for i in 0..4 {
        let source = DocumentSource::parse(&format!("{}/doc{}", server.uri(), i));
        let result = retriever.retrieve(&source, &policy).await.unwrap();
        assert!(matches!(result, Retrieval::Fetched(_)));
    }

    // Mock expectations are verified when the server drops
}

#[tokio::test]
async fn test_ignore_policy_never_touches_robots() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/anything"))
        .respond_with(ResponseTemplate::new(200).set_body_string("content"))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Ignore);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/anything", server.uri()));

    match retriever.retrieve(&source, &policy).await.unwrap() {
        Retrieval::Fetched(doc) => {
            assert_eq!(doc.data, b"content");
            assert!(!doc.robots_checked);
        }
        Retrieval::Skipped { .. } => panic!("ignore policy must fetch"),
    }
}

#[tokio::test]
async fn test_warn_disallow_skips_without_error() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;

    let policy = test_policy(RobotsPolicy::Warn);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/private/report", server.uri()));

    match retriever.retrieve(&source, &policy).await.unwrap() {
        Retrieval::Skipped { reason, .. } => {
            assert!(reason.contains("robots.txt"));
        }
        Retrieval::Fetched(_) => panic!("warn disallow must skip the fetch"),
    }
}

#[tokio::test]
async fn test_robots_5xx_fails_closed_under_strict() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);

    for p in ["/a", "/b"] {
        let source = DocumentSource::parse(&format!("{}{}", server.uri(), p));
        let result = retriever.retrieve(&source, &policy).await;
        assert!(
            matches!(result, Err(ToriiError::RobotsDisallowed { .. })),
            "{} must be disallowed while robots.txt returns 5xx",
            p
        );
    }
}

#[tokio::test]
async fn test_robots_404_allows_everything() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/deep/path"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/deep/path", server.uri()));

    assert!(matches!(
        retriever.retrieve(&source, &policy).await.unwrap(),
        Retrieval::Fetched(_)
    ));
}

#[tokio::test]
async fn test_crawl_delay_is_honored() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nCrawl-delay: 1\n").await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/slow", server.uri()));

    let start = Instant::now();
    retriever.retrieve(&source, &policy).await.unwrap();
    assert!(
        start.elapsed() >= Duration::from_millis(900),
        "the advisory crawl delay must be slept before the content request"
    );
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/real", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/real"))
        .respond_with(ResponseTemplate::new(200).set_body_string("final body"))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Ignore);
    let fetcher = SecureFetcher::new();
    let url = Url::parse(&format!("{}/moved", server.uri())).unwrap();

    let fetched = fetcher.fetch(&url, &policy).await.unwrap();
    assert_eq!(fetched.body, b"final body");
    assert!(fetched.final_url.path().ends_with("/real"));
}

#[tokio::test]
async fn test_redirect_limit_enforced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", format!("{}/loop", server.uri()).as_str()),
        )
        .mount(&server)
        .await;

    let policy = RemoteFetchPolicy {
        max_redirects: 3,
        ..test_policy(RobotsPolicy::Ignore)
    };
    let fetcher = SecureFetcher::new();
    let url = Url::parse(&format!("{}/loop", server.uri())).unwrap();

    let result = fetcher.fetch(&url, &policy).await;
    match result {
        Err(NetworkSecurityError::RedirectLimit { limit, .. }) => assert_eq!(limit, 3),
        other => panic!("expected RedirectLimit, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_hop_to_blocked_address_fails() {
    // Every hop is re-validated: a chain that starts on a fetchable host and
    // redirects toward a non-routable address fails at that hop. 192.0.2.1
    // is in TEST-NET-1, which stays blocked even with the private opt-in.
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jump"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "http://192.0.2.1/x"))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Ignore);
    let fetcher = SecureFetcher::new();
    let url = Url::parse(&format!("{}/jump", server.uri())).unwrap();

    let result = fetcher.fetch(&url, &policy).await;
    match result {
        Err(NetworkSecurityError::BlockedAddress { url, .. }) => {
            assert!(url.contains("192.0.2.1"), "failure must reference the blocked hop");
        }
        other => panic!("expected BlockedAddress, got {:?}", other),
    }
}

#[tokio::test]
async fn test_terminal_http_rejected_when_https_required() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plaintext"))
        .mount(&server)
        .await;

    let policy = RemoteFetchPolicy {
        require_https: true,
        ..test_policy(RobotsPolicy::Ignore)
    };
    let fetcher = SecureFetcher::new();
    let url = Url::parse(&format!("{}/page", server.uri())).unwrap();

    let result = fetcher.fetch(&url, &policy).await;
    assert!(matches!(
        result,
        Err(NetworkSecurityError::HttpsRequired { .. })
    ));
}

#[tokio::test]
async fn test_body_size_ceiling_enforced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&server)
        .await;

    let policy = RemoteFetchPolicy {
        max_body_bytes: 1024,
        ..test_policy(RobotsPolicy::Ignore)
    };
    let fetcher = SecureFetcher::new();
    let url = Url::parse(&format!("{}/big", server.uri())).unwrap();

    let result = fetcher.fetch(&url, &policy).await;
    match result {
        Err(NetworkSecurityError::BodyTooLarge { limit, .. }) => assert_eq!(limit, 1024),
        other => panic!("expected BodyTooLarge, got {:?}", other),
    }
}

#[tokio::test]
async fn test_content_404_is_hard_error() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let policy = test_policy(RobotsPolicy::Strict);
    let retriever = DocumentSourceRetriever::new(&policy);
    let source = DocumentSource::parse(&format!("{}/missing", server.uri()));

    let result = retriever.retrieve(&source, &policy).await;
    match result {
        Err(ToriiError::Network(NetworkSecurityError::Transport { status, .. })) => {
            assert_eq!(status, Some(404));
        }
        other => panic!("expected Transport with status 404, got {:?}", other.map(|_| ())),
    }
}
