#![forbid(unsafe_code)]
//! Minimal HTTP/1.1 client used by virtual users.
//!
//! Every response carries its measured duration and an estimate of the bytes
//! exchanged on the wire, which the runner turns into `http_req_*` and
//! `data_*` metrics.

mod client;
mod error;
mod request;
mod response;
mod wire;

pub use client::HttpClient;
pub use error::{Error, HttpTransportErrorKind, Result};
pub use request::{Headers, HttpRequest};
pub use response::HttpResponse;
pub use wire::estimate_request_bytes;
