//! Cache entry state

use crate::error::SpacesError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of one cached query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Loading,
    Loaded,
    Error,
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Error => "error",
        })
    }
}

/// Which stage of a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Network, HTTP status, or response decoding
    Transport,
    /// The query's transform rejected the response
    Transform,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport",
            Self::Transform => "transform",
        })
    }
}

/// Failure recorded on a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryError {
    pub kind: FailureKind,
    pub message: String,
}

impl QueryError {
    /// Classify a crate error as a query failure
    pub fn from_error(err: &SpacesError) -> Self {
        let kind = match err {
            SpacesError::Transform { .. } => FailureKind::Transform,
            _ => FailureKind::Transport,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)
    }
}

/// State of one cache key
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub key: String,
    pub status: QueryStatus,
    /// Last successfully fetched data; kept when a later fetch fails
    pub data: Option<Arc<T>>,
    pub error: Option<QueryError>,
    /// Logical version, bumped on every successful write
    pub fetched_at: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> CacheEntry<T> {
    /// Fresh idle entry with no data
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: QueryStatus::Idle,
            data: None,
            error: None,
            fetched_at: 0,
            updated_at: None,
        }
    }

    /// Whether at least one fetch has succeeded since the last reset
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            updated_at: self.updated_at,
        }
    }
}

/// Type-independent view of an entry, for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub method: String,
    pub status: QueryStatus,
    pub immediate: bool,
    pub has_data: bool,
    pub fetched_at: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub error: Option<QueryError>,
}

/// Outcome of a fetch, shared by every caller that joined it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// No fetch has run since registration or reset
    Idle,
    /// Data was written at this version
    Loaded { fetched_at: u64 },
    /// The fetch failed; previous data was kept
    Failed(QueryError),
    /// The store was reset while the fetch was in flight
    Discarded,
}

impl Settled {
    /// Whether the fetch stored new data
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}
