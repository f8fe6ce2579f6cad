//! Spaces - Reactive Workspace Query Cache
//!
//! Keeps a keyed, deduplicated cache of remote Gameplan queries (workspaces,
//! joined workspace ids, unread counts) and derives lookups over it.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod selectors;
pub mod signal;
pub mod transport;
pub mod ui;

pub use cache::{CacheEntry, Query, QueryOptions, QueryStatus, QueryStore, Settled};
pub use error::{SpacesError, SpacesResult};
pub use model::{Member, UnreadCounts, Workspace, WorkspaceId};
pub use registry::WorkspaceQueries;
pub use selectors::{Accessor, IdSource, Selectors};
