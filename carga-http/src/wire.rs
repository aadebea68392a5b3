//! HTTP/1.1 framing size estimates for `data_sent` / `data_received`.

use crate::{Error, HttpRequest, Result};

pub(crate) fn has_header(headers: &[(String, String)], name: &str) -> bool {
    headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
}

pub(crate) fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

pub(crate) fn parse_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidUrl(raw.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(Error::UnsupportedScheme(raw.to_string())),
    }
}

/// Request line, headers (plus the implicit `host` and `content-length`), blank line and body.
pub fn estimate_request_bytes(req: &HttpRequest) -> Result<u64> {
    let parsed = parse_url(&req.url)?;
    Ok(request_bytes(&req.method, &parsed, &req.headers, req.body.len() as u64))
}

pub(crate) fn request_bytes(
    method: &http::Method,
    url: &url::Url,
    headers: &[(String, String)],
    body_len: u64,
) -> u64 {
    let target_len = match url.query() {
        Some(q) => url.path().len() + 1 + q.len(),
        None => url.path().len(),
    };

    // "METHOD SP target SP HTTP/1.1 CRLF"
    let mut bytes = (method.as_str().len() + 1 + target_len + 1 + "HTTP/1.1".len() + 2) as u64;

    for (k, v) in headers {
        bytes = bytes.saturating_add(header_bytes(k.len(), v.len()));
    }
    if !has_header(headers, "host")
        && let Some(host) = host_header_value(url)
    {
        bytes = bytes.saturating_add(header_bytes("host".len(), host.len()));
    }
    if body_len != 0 && !has_header(headers, "content-length") {
        let len = body_len.to_string();
        bytes = bytes.saturating_add(header_bytes("content-length".len(), len.len()));
    }

    bytes.saturating_add(2).saturating_add(body_len)
}

pub(crate) fn response_head_bytes(headers: &http::HeaderMap) -> u64 {
    // "HTTP/1.1 SP 200 CRLF", reason phrase ignored.
    let mut bytes = ("HTTP/1.1".len() + 1 + 3 + 2) as u64;
    for (name, value) in headers {
        bytes = bytes.saturating_add(header_bytes(name.as_str().len(), value.len()));
    }
    bytes.saturating_add(2)
}

fn header_bytes(name_len: usize, value_len: usize) -> u64 {
    // "name: value CRLF"
    (name_len + 2 + value_len + 2) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn request_estimate_counts_implicit_headers() {
        let req = HttpRequest::post("http://localhost:3000/login", Bytes::from_static(b"{}"));
        // "POST /login HTTP/1.1\r\n" = 22
        // "host: localhost:3000\r\n" = 22
        // "content-length: 2\r\n" = 19
        // "\r\n" + body = 4
        let bytes = estimate_request_bytes(&req).unwrap_or_else(|e| panic!("estimate: {e}"));
        assert_eq!(bytes, 22 + 22 + 19 + 4);
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = estimate_request_bytes(&HttpRequest::get("ftp://example.com/"));
        assert!(matches!(err, Err(Error::UnsupportedScheme(_))));
        let err = estimate_request_bytes(&HttpRequest::get("not a url"));
        assert!(matches!(err, Err(Error::InvalidUrl(_))));
    }
}
