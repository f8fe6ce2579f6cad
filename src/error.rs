//! Error types for Spaces
//!
//! All modules use `SpacesResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Spaces operations
pub type SpacesResult<T> = Result<T, SpacesError>;

/// All errors that can occur in Spaces
#[derive(Error, Debug)]
pub enum SpacesError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server URL not configured")]
    ServerNotConfigured,

    // Transport errors
    #[error("Request to {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response from {method}: {reason}")]
    Decode { method: String, reason: String },

    // Query errors
    #[error("Transform failed for query {key}: {reason}")]
    Transform { key: String, reason: String },

    #[error("Query not registered: {0}")]
    QueryNotRegistered(String),

    #[error("Query {key} is already registered with a different data type")]
    QueryTypeMismatch { key: String },

    #[error("Dependency {upstream} -> {downstream} would create a cycle")]
    DependencyCycle { upstream: String, downstream: String },

    #[error("Dependent query {key} failed: {reason}")]
    DependentTrigger { key: String, reason: String },

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SpacesError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    /// Create a transform error for a query
    pub fn transform(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transform {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ServerNotConfigured => {
                Some("Run: spaces config init, then set server.url (or pass --url)")
            }
            Self::HttpStatus { status: 401 | 403, .. } => {
                Some("Check server.api_key and server.api_secret in your config")
            }
            Self::HttpStatus { status: 404, .. } => {
                Some("Check the [endpoints] method names against your Gameplan version")
            }
            Self::Transport(_) => Some("Check that the server is reachable"),
            _ => None,
        }
    }
}
