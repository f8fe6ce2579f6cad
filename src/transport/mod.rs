//! Remote endpoint transport
//!
//! The cache only knows how to ask a [`Transport`] for the JSON payload of a
//! named endpoint. How the call reaches the server (HTTP, RPC, a canned
//! fixture in tests) is the transport's business.

mod http;

pub use http::HttpTransport;

use crate::error::SpacesResult;
use async_trait::async_trait;
use serde_json::Value;

/// A remote read endpoint, addressed by its whitelisted method name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    method: String,
}

impl Endpoint {
    /// Endpoint for a whitelisted server method
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            method: name.into(),
        }
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.method
    }
}

/// Abstract remote call interface
///
/// Implementations return the decoded response payload, already unwrapped
/// from any response envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Call an endpoint and return its payload
    async fn call(&self, endpoint: &Endpoint) -> SpacesResult<Value>;

    /// Get the human-readable transport name for display
    fn transport_name(&self) -> &'static str;
}
