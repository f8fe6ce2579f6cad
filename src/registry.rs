//! The fixed set of workspace queries
//!
//! Three queries are registered once per store:
//!
//! - `workspaces`: fetched immediately, starts as an empty list
//! - `joinedWorkspaceIds`: fetched immediately, starts as an empty list
//! - `unreadCount`: never fetched on its own; it runs after every successful
//!   `workspaces` fetch, since unread counts mean nothing without the
//!   workspace list they refer to

use crate::cache::{Fetch, Query, QueryOptions, QueryStore, Settled};
use crate::config::schema::EndpointsConfig;
use crate::error::{SpacesError, SpacesResult};
use crate::model::{RawWorkspace, UnreadCounts, Workspace, WorkspaceId};
use crate::transport::Endpoint;
use serde_json::Value;
use tracing::debug;

pub const WORKSPACES: &str = "workspaces";
pub const JOINED_WORKSPACE_IDS: &str = "joinedWorkspaceIds";
pub const UNREAD_COUNT: &str = "unreadCount";

/// Handles to the registered workspace queries
#[derive(Clone)]
pub struct WorkspaceQueries {
    store: QueryStore,
    workspaces: Query<Vec<Workspace>>,
    joined_workspace_ids: Query<Vec<WorkspaceId>>,
    unread_count: Query<UnreadCounts>,
}

impl WorkspaceQueries {
    /// Register the workspace queries on `store`
    ///
    /// The two immediate queries start fetching before this returns.
    /// Registering twice on the same store returns the same entries.
    pub fn register(store: &QueryStore, endpoints: &EndpointsConfig) -> SpacesResult<Self> {
        let unread_count = store.register(
            UNREAD_COUNT,
            Endpoint::method(&endpoints.unread_counts),
            QueryOptions::new().after(WORKSPACES),
        )?;

        let workspaces = store.register(
            WORKSPACES,
            Endpoint::method(&endpoints.workspaces),
            QueryOptions::new()
                .initial_data(Vec::new())
                .immediate(true)
                .transform(normalize_workspaces),
        )?;

        let joined_workspace_ids = store.register(
            JOINED_WORKSPACE_IDS,
            Endpoint::method(&endpoints.joined_workspaces),
            QueryOptions::new().initial_data(Vec::new()).immediate(true),
        )?;

        Ok(Self {
            store: store.clone(),
            workspaces,
            joined_workspace_ids,
            unread_count,
        })
    }

    /// The store the queries live in
    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    /// Workspace list query
    pub fn workspaces(&self) -> &Query<Vec<Workspace>> {
        &self.workspaces
    }

    /// Joined workspace ids query
    pub fn joined_workspace_ids(&self) -> &Query<Vec<WorkspaceId>> {
        &self.joined_workspace_ids
    }

    /// Unread count query
    pub fn unread_count(&self) -> &Query<UnreadCounts> {
        &self.unread_count
    }

    /// Refetch the workspace list and joined ids
    ///
    /// A successful workspace fetch submits the unread counts again.
    pub fn refresh(&self) -> Vec<Fetch> {
        vec![self.workspaces.submit(), self.joined_workspace_ids.submit()]
    }

    /// Wait until the eager queries and the unread counts they trigger settle
    pub async fn ready(&self) -> Vec<(&'static str, Settled)> {
        let workspaces = self.workspaces.settled().await;
        let joined = self.joined_workspace_ids.settled().await;
        // Submitted by the workspace fetch's success, so it is in flight by now
        let unread = self.unread_count.settled().await;
        debug!(?workspaces, ?joined, ?unread, "workspace queries settled");

        vec![
            (WORKSPACES, workspaces),
            (JOINED_WORKSPACE_IDS, joined),
            (UNREAD_COUNT, unread),
        ]
    }
}

/// Decode workspace records and canonicalize their ids
pub fn normalize_workspaces(payload: Value) -> SpacesResult<Vec<Workspace>> {
    let records: Vec<RawWorkspace> = serde_json::from_value(payload)
        .map_err(|e| SpacesError::transform(WORKSPACES, e.to_string()))?;

    records
        .into_iter()
        .map(|record| {
            record
                .into_workspace()
                .map_err(|reason| SpacesError::transform(WORKSPACES, reason))
        })
        .collect()
}
