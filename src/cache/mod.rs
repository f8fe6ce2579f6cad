//! Remote call cache
//!
//! Each registered query owns one [`CacheEntry`] keyed by name. Fetches are
//! deduplicated per key, run on the tokio runtime, and publish every state
//! change through a watch channel so derived values can follow the cache.
//!
//! # Example
//!
//! ```rust,ignore
//! use spaces::cache::{QueryOptions, QueryStore};
//! use spaces::transport::Endpoint;
//!
//! let store = QueryStore::new(transport);
//! let ids = store.register::<Vec<String>>(
//!     "ids",
//!     Endpoint::method("app.api.ids"),
//!     QueryOptions::new().immediate(true).initial_data(Vec::new()),
//! )?;
//!
//! ids.settled().await;
//! println!("{:?}", ids.data());
//! ```

mod entry;
pub mod graph;
mod query;
mod store;

pub use entry::{CacheEntry, EntrySummary, FailureKind, QueryError, QueryStatus, Settled};
pub use graph::DependencyGraph;
pub use query::{Fetch, Query, QueryOptions, SuccessHook, Transform};
pub use store::QueryStore;
