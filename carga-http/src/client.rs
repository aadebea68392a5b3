use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::wire::{has_header, host_header_value, parse_url, request_bytes, response_head_bytes};
use crate::{Error, HttpRequest, HttpResponse, Result};

/// Pooled client shared by all virtual users. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        // Unreachable hosts otherwise hang for the OS connect timeout.
        Self::new(Some(Duration::from_secs(3)))
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(connect_timeout);

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        Self {
            inner: Client::builder(TokioExecutor::new()).build(https),
        }
    }

    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let parsed = parse_url(&req.url)?;
        let bytes_sent = request_bytes(&req.method, &parsed, &req.headers, req.body.len() as u64);

        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = Request::builder().method(req.method).uri(uri);

        // Send the implicit headers explicitly so the byte estimate matches the wire.
        if !has_header(&req.headers, "host")
            && let Some(host) = host_header_value(&parsed)
        {
            builder = builder.header(http::header::HOST, host);
        }
        if !req.body.is_empty() && !has_header(&req.headers, "content-length") {
            builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
        }
        for (k, v) in &req.headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(v)?;
            builder = builder.header(name, value);
        }

        let request = builder.body(Full::new(req.body))?;

        let started = Instant::now();
        let exchange = async {
            let res = self.inner.request(request).await?;
            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts, body))
        };
        let (parts, body) = match req.timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout(timeout))??,
            None => exchange.await?,
        };
        let duration = started.elapsed();

        let mut merged: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &parts.headers {
            let v = String::from_utf8_lossy(value.as_bytes()).into_owned();
            merged
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|cur| {
                    cur.push_str(", ");
                    cur.push_str(&v);
                })
                .or_insert(v);
        }

        let bytes_received = response_head_bytes(&parts.headers).saturating_add(body.len() as u64);

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            body,
            headers: merged.into_iter().collect(),
            bytes_sent,
            bytes_received,
            duration,
            error: None,
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }
}
