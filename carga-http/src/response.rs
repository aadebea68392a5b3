use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::HttpTransportErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
    /// Lowercased names; repeated headers are joined with ", ".
    pub headers: Vec<(String, String)>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// From dispatch until the body was fully read.
    pub duration: Duration,
    /// Set when no response arrived; `status` is then 0.
    pub error: Option<HttpTransportErrorKind>,
}

impl HttpResponse {
    /// Placeholder for a request that failed before a response arrived.
    pub fn transport_failure(kind: HttpTransportErrorKind, duration: Duration) -> Self {
        Self {
            status: 0,
            body: Bytes::new(),
            headers: Vec::new(),
            bytes_sent: 0,
            bytes_received: 0,
            duration,
            error: Some(kind),
        }
    }

    pub fn body_utf8(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Top-level JSON field of the body, if the body is a JSON object that has it.
    pub fn json_field(&self, name: &str) -> Option<serde_json::Value> {
        let mut value: serde_json::Value = self.json()?;
        value.get_mut(name).map(serde_json::Value::take)
    }

    /// Transport succeeded with a `2xx` or `3xx` status.
    pub fn is_expected_status(&self) -> bool {
        self.error.is_none() && (200..400).contains(&self.status)
    }
}
