// Shared test helpers: a scriptable mock transport.
//
// This module provides a Transport implementation that answers from a script
// keyed by "METHOD url" and records every request it sees, so adapter tests
// can assert both the outcome and the exact traffic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};

use https_upgrade::{Request, Response, SendError, Transport};

/// Failure categories the mock can produce.
#[allow(dead_code)] // Used by other test files
pub enum FailureKind {
    Connection,
    Retries,
    Tls,
    Other,
}

enum Script {
    Respond { status: u16, location: Option<String> },
    Fail(FailureKind),
}

/// A scripted transport. Unscripted requests fail with `SendError::Other`.
pub struct MockTransport {
    scripts: HashMap<String, Script>,
    log: Mutex<Vec<String>>,
}

#[allow(dead_code)] // Used by other test files
impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            scripts: HashMap::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Scripts a response for `METHOD url`.
    pub fn respond(mut self, method: &str, url: &str, status: u16, location: Option<&str>) -> Self {
        self.scripts.insert(
            format!("{method} {url}"),
            Script::Respond {
                status,
                location: location.map(str::to_string),
            },
        );
        self
    }

    /// Scripts a categorized failure for `METHOD url`.
    pub fn fail(mut self, method: &str, url: &str, kind: FailureKind) -> Self {
        self.scripts.insert(format!("{method} {url}"), Script::Fail(kind));
        self
    }

    /// Every request seen so far, as "METHOD url" strings in order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

fn reason_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown Status Code",
    }
}

fn make_response(url: &str, status: u16, location: Option<&str>) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(location) = location {
        headers.insert(LOCATION, HeaderValue::from_str(location).unwrap());
    }
    Response {
        status,
        reason: reason_for(status).to_string(),
        headers,
        url: url.to_string(),
        body: String::new(),
        encoding: "utf-8",
        synthetic: false,
    }
}

fn make_error(kind: &FailureKind, url: &str) -> SendError {
    let url = url.to_string();
    match kind {
        FailureKind::Connection => SendError::Connection {
            url,
            message: "connection refused".to_string(),
        },
        FailureKind::Retries => SendError::RetriesExhausted {
            url,
            message: "connection refused".to_string(),
        },
        FailureKind::Tls => SendError::Tls {
            url,
            message: "invalid peer certificate".to_string(),
        },
        FailureKind::Other => SendError::Other {
            url,
            message: "boom".to_string(),
        },
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &mut Request) -> Result<Response, SendError> {
        let key = format!("{} {}", request.method, request.url);
        self.log.lock().unwrap().push(key.clone());
        match self.scripts.get(&key) {
            Some(Script::Respond { status, location }) => {
                Ok(make_response(&request.url, *status, location.as_deref()))
            }
            Some(Script::Fail(kind)) => Err(make_error(kind, &request.url)),
            None => Err(SendError::Other {
                url: request.url.clone(),
                message: "no scripted response".to_string(),
            }),
        }
    }
}
