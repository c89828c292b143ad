//! swc-swift: Swift and Keystone adapter for the swc CLI client
//!
//! This crate provides the implementation of the ObjectStore trait over the
//! Swift HTTP API, and the Keystone token exchange that produces the
//! session it runs with. It is the only crate that speaks HTTP.

pub mod client;
pub mod keystone;

pub use client::SwiftClient;
pub use keystone::KeystoneClient;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use swc_core::{Error, Result, TimeoutConfig};

/// HTTP client with the configured deadlines
pub(crate) fn http_client(timeout: &TimeoutConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_millis(timeout.connect_ms))
        .read_timeout(Duration::from_millis(timeout.read_ms))
        .user_agent(concat!("swc/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))
}

/// Map HTTP status codes to appropriate errors
pub(crate) fn map_status(status: StatusCode, resource: &str, body: &str) -> Error {
    let body = body.trim();
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(resource.to_string()),
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            Error::Auth(format!("{resource}: HTTP {}", status.as_u16()))
        }
        _ => Error::Remote {
            status: status.as_u16(),
            message: if body.is_empty() {
                format!("{resource}: {}", status.canonical_reason().unwrap_or("unexpected status"))
            } else {
                format!("{resource}: {body}")
            },
        },
    }
}

/// Map connection, DNS and timeout failures
pub(crate) fn map_transport(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Network(format!("Request timed out: {error}"))
    } else {
        Error::Network(format!("Request failed: {error}"))
    }
}
