//! Redirect-probing behavior of the prefer-https adapter.

#[path = "helpers.rs"]
mod helpers;

use helpers::{FailureKind, MockTransport};
use https_upgrade::{HttpsExclusions, PreferHttpsAdapter, Request, SendError, Transport};

fn exclusions(list: &[&str]) -> HttpsExclusions {
    HttpsExclusions::new(list.iter().map(|s| s.to_string()).collect())
}

fn no_exclusions() -> HttpsExclusions {
    exclusions(&[])
}

#[tokio::test]
async fn test_no_location_upgrades_original() {
    let transport = MockTransport::new().respond("HEAD", "http://a.com/", 200, None);
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
    assert_eq!(transport.requests(), vec!["HEAD http://a.com/"]);
}

#[tokio::test]
async fn test_http_chain_upgrades_original_not_final_host() {
    // a.com redirects to b.com over plain http; the upgrade still targets
    // the URL the caller asked for.
    let transport = MockTransport::new()
        .respond("HEAD", "http://a.com/", 301, Some("http://b.com/"))
        .respond("HEAD", "http://b.com/", 200, None);
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
    assert_eq!(
        transport.requests(),
        vec!["HEAD http://a.com/", "HEAD http://b.com/"]
    );
}

#[tokio::test]
async fn test_self_location_terminates_probe() {
    let transport =
        MockTransport::new().respond("HEAD", "http://a.com/", 302, Some("http://a.com/"));
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
    assert_eq!(transport.requests(), vec!["HEAD http://a.com/"]);
}

#[tokio::test]
async fn test_https_location_returns_server_redirect() {
    // The server's own cross-scheme redirect is authoritative; the probe
    // response is handed back untouched instead of a synthesized one.
    let transport =
        MockTransport::new().respond("HEAD", "http://a.com/", 301, Some("https://b.com/"));
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(!response.is_synthetic());
    assert_eq!(response.status, 301);
    assert_eq!(response.location(), Some("https://b.com/"));
}

#[tokio::test]
async fn test_excluded_https_location_downgrades() {
    let transport =
        MockTransport::new().respond("HEAD", "http://a.com/", 301, Some("https://b.com/x"));
    let adapter = PreferHttpsAdapter::new(&transport, exclusions(&["b.com"]));
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("http://b.com/x"));
    assert_eq!(response.url, "http://a.com/");
}

#[tokio::test]
async fn test_foreign_scheme_location_fails() {
    let transport =
        MockTransport::new().respond("HEAD", "http://a.com/", 301, Some("ftp://a.com/"));
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let error = adapter.send(&mut request).await.unwrap_err();
    assert!(matches!(error, SendError::UnsupportedScheme { .. }));
}

#[tokio::test]
async fn test_probe_failure_still_upgrades() {
    let transport = MockTransport::new().fail("HEAD", "http://a.com/", FailureKind::Connection);
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
}

#[tokio::test]
async fn test_probe_failure_mid_chain_still_upgrades() {
    let transport = MockTransport::new()
        .respond("HEAD", "http://a.com/", 301, Some("http://b.com/"))
        .fail("HEAD", "http://b.com/", FailureKind::Connection);
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
}

#[tokio::test]
async fn test_head_403_retries_with_get() {
    let transport = MockTransport::new()
        .respond("HEAD", "http://a.com/", 403, None)
        .respond("GET", "http://a.com/", 200, None);
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
    assert_eq!(
        transport.requests(),
        vec!["HEAD http://a.com/", "GET http://a.com/"]
    );
}

#[tokio::test]
async fn test_probe_error_status_still_upgrades() {
    // A 404 from the probe is a failed step, not a failed send.
    let transport = MockTransport::new().respond("HEAD", "http://a.com/", 404, None);
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a.com/"));
}

#[tokio::test]
async fn test_redirect_loop_is_capped() {
    let mut transport = MockTransport::new();
    for i in 0..12 {
        transport = transport.respond(
            "HEAD",
            &format!("http://a{i}.com/"),
            301,
            Some(&format!("http://a{}.com/", i + 1)),
        );
    }
    let adapter = PreferHttpsAdapter::new(&transport, no_exclusions());
    let mut request = Request::get("http://a0.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("https://a0.com/"));
    assert_eq!(transport.requests().len(), 10);
}

#[tokio::test]
async fn test_excluded_https_downgrades_without_probing() {
    let transport = MockTransport::new();
    let adapter = PreferHttpsAdapter::new(&transport, exclusions(&["example.com/api"]));
    let mut request = Request::get("https://example.com/api/x");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(response.is_synthetic());
    assert_eq!(response.location(), Some("http://example.com/api/x"));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_excluded_http_passes_through_without_probing() {
    let transport = MockTransport::new().respond("GET", "http://example.com/", 200, None);
    let adapter = PreferHttpsAdapter::new(&transport, exclusions(&["example.com"]));
    let mut request = Request::get("http://example.com/");

    let response = adapter.send(&mut request).await.unwrap();
    assert!(!response.is_synthetic());
    assert_eq!(transport.requests(), vec!["GET http://example.com/"]);
}
