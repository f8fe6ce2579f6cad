//! Derived lookups over the workspace queries
//!
//! Selectors never write to the cache and never fail: a missing id, an
//! unloaded query, or a failed fetch all read as "nothing there" (`None`,
//! `false`, `0`). An id that is absent or blank is treated as no match
//! everywhere, and the cache is not consulted for it.

use crate::cache::{CacheEntry, Query};
use crate::model::{UnreadCounts, Workspace, WorkspaceId};
use crate::registry::WorkspaceQueries;
use crate::signal::{Computed, Signal};
use serde_json::Value;
use std::collections::HashSet;

/// Something that yields a workspace id, now or when asked
pub trait IdSource {
    /// Resolve to a canonical id, or `None` when there is no id
    fn resolve(&self) -> Option<WorkspaceId>;
}

impl IdSource for str {
    fn resolve(&self) -> Option<WorkspaceId> {
        WorkspaceId::parse(self)
    }
}

impl IdSource for String {
    fn resolve(&self) -> Option<WorkspaceId> {
        WorkspaceId::parse(self)
    }
}

impl IdSource for WorkspaceId {
    fn resolve(&self) -> Option<WorkspaceId> {
        Some(self.clone())
    }
}

impl IdSource for Value {
    fn resolve(&self) -> Option<WorkspaceId> {
        WorkspaceId::canonical(self)
    }
}

macro_rules! int_id_source {
    ($($ty:ty),*) => {
        $(
            impl IdSource for $ty {
                fn resolve(&self) -> Option<WorkspaceId> {
                    Some(WorkspaceId::from(i64::from(*self)))
                }
            }
        )*
    };
}

int_id_source!(i32, i64, u32);

impl IdSource for u64 {
    fn resolve(&self) -> Option<WorkspaceId> {
        WorkspaceId::parse(&self.to_string())
    }
}

impl<S: IdSource + ?Sized> IdSource for &S {
    fn resolve(&self) -> Option<WorkspaceId> {
        (**self).resolve()
    }
}

impl<S: IdSource> IdSource for Option<S> {
    fn resolve(&self) -> Option<WorkspaceId> {
        self.as_ref().and_then(IdSource::resolve)
    }
}

impl<S: IdSource> IdSource for Signal<S> {
    fn resolve(&self) -> Option<WorkspaceId> {
        self.with(IdSource::resolve)
    }
}

/// Lazily evaluated id, read each time a selector runs
pub struct Accessor<F>(pub F);

impl<F, S> IdSource for Accessor<F>
where
    F: Fn() -> S,
    S: IdSource,
{
    fn resolve(&self) -> Option<WorkspaceId> {
        (self.0)().resolve()
    }
}

/// Read-only views over [`WorkspaceQueries`]
pub struct Selectors {
    workspaces: Query<Vec<Workspace>>,
    unread_count: Query<UnreadCounts>,
    joined: Computed<CacheEntry<Vec<WorkspaceId>>, HashSet<WorkspaceId>>,
}

impl Selectors {
    pub fn new(queries: &WorkspaceQueries) -> Self {
        let joined = queries.joined_workspace_ids().derive(|ids| {
            ids.map(|ids| ids.iter().cloned().collect::<HashSet<_>>())
                .unwrap_or_default()
        });

        Self {
            workspaces: queries.workspaces().clone(),
            unread_count: queries.unread_count().clone(),
            joined,
        }
    }

    /// First workspace whose canonical id matches
    pub fn find_workspace(&self, id: impl IdSource) -> Option<Workspace> {
        let id = id.resolve()?;
        let workspaces = self.workspaces.data()?;
        workspaces.iter().find(|w| w.id == id).cloned()
    }

    /// Whether the current user has joined the workspace
    pub fn has_joined(&self, id: impl IdSource) -> bool {
        match id.resolve() {
            Some(id) => self.joined.with(|joined| joined.contains(&id)),
            None => false,
        }
    }

    /// Unread discussion count; 0 when unknown
    pub fn unread_count_for(&self, id: impl IdSource) -> u64 {
        let Some(key) = id.resolve().and_then(|id| id.as_key()) else {
            return 0;
        };
        self.unread_count
            .data()
            .and_then(|counts| counts.get(&key).copied())
            .unwrap_or(0)
    }

    /// Joined workspaces in list order
    pub fn joined_workspaces(&self) -> Vec<Workspace> {
        let Some(workspaces) = self.workspaces.data() else {
            return Vec::new();
        };
        self.joined.with(|joined| {
            workspaces
                .iter()
                .filter(|w| joined.contains(&w.id))
                .cloned()
                .collect()
        })
    }

    /// Total unread count across all workspaces
    pub fn total_unread(&self) -> u64 {
        self.unread_count
            .data()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }
}
