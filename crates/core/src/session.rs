//! Authenticated session
//!
//! A session is the `(token, endpoint)` pair produced by the identity
//! exchange. It is read-only and shared by every request of one invocation.

use crate::error::{Error, Result};

/// Resolved bearer token and storage endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    endpoint: String,
}

impl Session {
    /// Create a session, rejecting an empty token or endpoint
    pub fn new(token: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let endpoint = endpoint.into();

        if token.trim().is_empty() {
            return Err(Error::Auth("empty token".into()));
        }
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(Error::Auth("no storage endpoint".into()));
        }
        url::Url::parse(&endpoint)?;

        Ok(Self { token, endpoint })
    }

    /// Bearer token sent as `X-Auth-Token`
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Storage URL including the account, without a trailing slash
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
