//! Request and response values shared by the transport and every adapter.
//!
//! `Response` is shaped like a real HTTP response but can also be synthesized
//! locally to represent a rewrite decision. Synthetic responses carry a
//! sentinel reason phrase and an explicit tag so downstream code can tell
//! "this never touched the network" apart from a genuine server redirect.

use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};
use reqwest::Method;

/// Reason phrase stamped on every synthesized redirect.
///
/// Distinct from any canonical HTTP reason phrase. Consumers that see this
/// reason can trust the `Location` header: it was produced locally and never
/// round-tripped through the network.
pub const REDIRECT_REASON: &str = "HTTPS Upgrade";

/// An outgoing HTTP request descriptor.
///
/// The URL is mutable in place: fallback adapters rewrite it before
/// re-sending, and callers can observe the scheme the request was finally
/// sent with.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: String,
    /// True once a fallback layer has re-sent this request over plain http
    /// after a failed https attempt
    pub fell_back: bool,
}

impl Request {
    /// Creates a GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: Method::GET,
            url: url.into(),
            fell_back: false,
        }
    }

    /// Creates a HEAD request for `url` (used by the upgrade probe).
    pub fn head(url: impl Into<String>) -> Self {
        Request {
            method: Method::HEAD,
            url: url.into(),
            fell_back: false,
        }
    }
}

/// An HTTP response, real or synthesized.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code
    pub status: u16,
    /// Reason phrase; [`REDIRECT_REASON`] for synthesized responses
    pub reason: String,
    /// Response headers
    pub headers: HeaderMap,
    /// The URL this response answers for. For synthesized redirects this is
    /// the *original* request URL, never the rewrite target; the target lives
    /// in the `Location` header.
    pub url: String,
    /// Response body; always empty for synthesized responses
    pub body: String,
    /// Character encoding tag
    pub encoding: &'static str,
    /// True when this response was synthesized locally
    pub synthetic: bool,
}

impl Response {
    /// Synthesizes a redirect response to `location`.
    ///
    /// Pure construction, always succeeds. The caller is expected to set
    /// [`Response::url`] to the request URL it is answering for.
    pub fn redirect(location: &str, code: u16) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(location) {
            Ok(value) => {
                headers.insert(LOCATION, value);
            }
            Err(_) => {
                // A non-ASCII rewrite target cannot ride in a header.
                warn!("redirect target {location:?} is not a valid header value, Location omitted");
            }
        }
        Response {
            status: code,
            reason: REDIRECT_REASON.to_string(),
            headers,
            url: String::new(),
            body: String::new(),
            encoding: "utf-8",
            synthetic: true,
        }
    }

    /// Returns the `Location` header value, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// True when this response was produced by a rewrite adapter rather than
    /// a server.
    ///
    /// Checks the explicit tag first, falling back to the sentinel reason
    /// phrase so responses that crossed a serialization boundary are still
    /// recognized.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic || self.reason == REDIRECT_REASON
    }
}
