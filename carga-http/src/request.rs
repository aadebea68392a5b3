use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use crate::Result;

/// Ordered `(name, value)` pairs; names are matched case-insensitively.
pub type Headers = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: http::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(http::Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: Bytes) -> Self {
        let mut req = Self::new(http::Method::POST, url);
        req.body = body;
        req
    }

    /// POST with a JSON-encoded body and `content-type: application/json`.
    pub fn post_json<T: Serialize + ?Sized>(url: impl Into<String>, body: &T) -> Result<Self> {
        let body = Bytes::from(serde_json::to_vec(body)?);
        Ok(Self::post(url, body).header("content-type", "application/json"))
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends headers, replacing earlier ones with the same name.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (k, v) in headers {
            self.headers.retain(|(cur, _)| !cur.eq_ignore_ascii_case(&k));
            self.headers.push((k, v));
        }
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
