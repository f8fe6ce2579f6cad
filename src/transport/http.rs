//! HTTP transport for Frappe whitelisted methods

use super::{Endpoint, Transport};
use crate::config::schema::ServerConfig;
use crate::error::{SpacesError, SpacesResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Calls `GET {url}/api/method/{method}` on a Gameplan server
pub struct HttpTransport {
    base_url: String,
    authorization: Option<String>,
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create a transport from the server configuration
    pub fn new(server: &ServerConfig) -> SpacesResult<Self> {
        let base_url = server
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SpacesError::ServerNotConfigured)?
            .trim_end_matches('/')
            .to_string();

        let authorization = match (&server.api_key, &server.api_secret) {
            (Some(key), Some(secret)) => Some(format!("token {}:{}", key, secret)),
            _ => None,
        };

        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(server.timeout_secs)))
            .build();

        Ok(Self {
            base_url,
            authorization,
            agent: config.into(),
        })
    }

    /// Full URL for an endpoint (without query parameters)
    pub fn url_for(&self, endpoint: &Endpoint) -> String {
        format!("{}/api/method/{}", self.base_url, endpoint.name())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, endpoint: &Endpoint) -> SpacesResult<Value> {
        let url = self.url_for(endpoint);
        let agent = self.agent.clone();
        let authorization = self.authorization.clone();

        debug!(%url, "GET");
        let body = tokio::task::spawn_blocking(move || {
            let mut request = agent.get(&url).header("Accept", "application/json");
            if let Some(ref value) = authorization {
                request = request.header("Authorization", value);
            }

            let mut response = request.call().map_err(|e| match e {
                ureq::Error::StatusCode(status) => SpacesError::HttpStatus {
                    url: url.clone(),
                    status,
                },
                other => SpacesError::transport(format!("{}: {}", url, other)),
            })?;

            response
                .body_mut()
                .read_to_string()
                .map_err(|e| SpacesError::transport(format!("reading {}: {}", url, e)))
        })
        .await
        .map_err(|e| SpacesError::Internal(format!("HTTP worker failed: {}", e)))??;

        let envelope: Value = serde_json::from_str(&body).map_err(|e| SpacesError::Decode {
            method: endpoint.name().to_string(),
            reason: e.to_string(),
        })?;
        unwrap_envelope(endpoint.name(), envelope)
    }

    fn transport_name(&self) -> &'static str {
        "HTTP"
    }
}

/// Frappe wraps return values in `message`; methods that write
/// `frappe.response` directly use `data` instead.
fn unwrap_envelope(method: &str, envelope: Value) -> SpacesResult<Value> {
    match envelope {
        Value::Object(mut body) => body
            .remove("message")
            .or_else(|| body.remove("data"))
            .ok_or_else(|| SpacesError::Decode {
                method: method.to_string(),
                reason: "response has neither `message` nor `data`".to_string(),
            }),
        other => Err(SpacesError::Decode {
            method: method.to_string(),
            reason: format!("expected a JSON object, got {}", other),
        }),
    }
}
