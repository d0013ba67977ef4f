//! The pluggable transport layer.
//!
//! Adapters treat the network as an opaque [`Transport`] capability: send a
//! request, get back a response or a categorized [`SendError`]. The reqwest
//! implementation lives here; tests substitute mock transports.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use log::debug;
use tokio_retry::RetryIf;

use crate::config::RETRY_MAX_ATTEMPTS;
use crate::error_handling::{get_retry_strategy, SendError};
use crate::models::{Request, Response};

/// The capability every adapter wraps: send a request, return a response or
/// a categorized failure.
///
/// All adapters implement this trait as well, so chains compose by wrapping
/// one transport in another.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response.
    ///
    /// The request is mutable so fallback layers can rewrite its URL in
    /// place before re-sending; implementations must not mutate it on the
    /// success path.
    async fn send(&self, request: &mut Request) -> Result<Response, SendError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        (**self).send(request).await
    }
}

/// Real network transport backed by a `reqwest::Client`.
///
/// The client is expected to have redirect following disabled (the whole
/// point of this crate is that redirects are synthesized locally or followed
/// explicitly by the probe). Connection-class failures are retried with
/// exponential backoff; exhausting the retries surfaces as
/// [`SendError::RetriesExhausted`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Wraps an already-configured client.
    pub fn new(client: reqwest::Client) -> Self {
        HttpTransport { client }
    }

    async fn send_once(&self, method: reqwest::Method, url: String) -> Result<Response, SendError> {
        let response = self
            .client
            .request(method, &url)
            .send()
            .await
            .map_err(|e| categorize_reqwest_error(&url, &e))?;
        Ok(convert_response(response).await)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        let method = request.method.clone();
        let url = request.url.clone();
        let attempts = AtomicUsize::new(0);
        let strategy = get_retry_strategy().take(RETRY_MAX_ATTEMPTS - 1);

        let result = RetryIf::spawn(
            strategy,
            || {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt > 1 {
                    debug!("retrying {url} (attempt {attempt})");
                }
                self.send_once(method.clone(), url.clone())
            },
            |error: &SendError| matches!(error, SendError::Connection { .. }),
        )
        .await;

        match result {
            Err(SendError::Connection { url, message })
                if attempts.load(Ordering::SeqCst) >= RETRY_MAX_ATTEMPTS =>
            {
                Err(SendError::RetriesExhausted { url, message })
            }
            other => other,
        }
    }
}

/// Converts a reqwest response into the crate's response model.
async fn convert_response(response: reqwest::Response) -> Response {
    let status = response.status();
    let reason = status
        .canonical_reason()
        .unwrap_or("Unknown Status Code")
        .to_string();
    let headers = response.headers().clone();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();

    Response {
        status: status.as_u16(),
        reason,
        headers,
        url,
        body,
        encoding: "utf-8",
        synthetic: false,
    }
}

/// Maps a `reqwest::Error` onto the crate's failure taxonomy.
///
/// TLS failures are detected by walking the error's source chain; reqwest
/// does not expose them as a dedicated predicate the way it does connect and
/// timeout errors.
fn categorize_reqwest_error(url: &str, error: &reqwest::Error) -> SendError {
    let message = error.to_string();
    let url = url.to_string();

    if is_tls_error(error) {
        SendError::Tls { url, message }
    } else if error.is_connect() || error.is_timeout() {
        SendError::Connection { url, message }
    } else {
        SendError::Other { url, message }
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let text = cause.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("ssl") {
            return true;
        }
        source = cause.source();
    }
    false
}
