//! Process-wide store of registered queries

use super::entry::{EntrySummary, QueryStatus, Settled};
use super::graph::DependencyGraph;
use super::query::{ErasedQuery, Fetch, Query, QueryCell, QueryOptions};
use crate::error::{SpacesError, SpacesResult};
use crate::signal::lock;
use crate::transport::{Endpoint, Transport};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

struct Slot {
    typed: Arc<dyn Any + Send + Sync>,
    erased: Arc<dyn ErasedQuery>,
}

pub(crate) struct StoreInner {
    pub(crate) transport: Arc<dyn Transport>,
    slots: Mutex<BTreeMap<String, Slot>>,
    graph: Mutex<DependencyGraph>,
}

impl StoreInner {
    /// Submit every query declared to run after `key`
    ///
    /// A dependent's own failure lands on its entry and is logged against
    /// the upstream; the upstream entry is never touched.
    pub(crate) fn trigger_dependents(&self, key: &str) {
        let dependents = lock(&self.graph).dependents(key);
        let queries: Vec<_> = {
            let slots = lock(&self.slots);
            dependents
                .into_iter()
                .filter_map(|dependent| {
                    let query = Arc::clone(&slots.get(&dependent)?.erased);
                    Some((dependent, query))
                })
                .collect()
        };

        for (dependent, query) in queries {
            debug!(upstream = %key, key = %dependent, "triggering dependent query");
            let fetch = query.submit();
            let Ok(handle) = tokio::runtime::Handle::try_current() else {
                continue;
            };
            let upstream = key.to_string();
            handle.spawn(async move {
                if let Settled::Failed(error) = fetch.await {
                    let err = SpacesError::DependentTrigger {
                        key: dependent,
                        reason: error.message,
                    };
                    warn!(upstream = %upstream, error = %err, "dependent query failed");
                }
            });
        }
    }
}

/// Keyed cache of remote queries
///
/// Cloning the store is cheap; every clone shares the same entries.
#[derive(Clone)]
pub struct QueryStore {
    inner: Arc<StoreInner>,
}

impl QueryStore {
    /// Create an empty store backed by `transport`
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                transport,
                slots: Mutex::new(BTreeMap::new()),
                graph: Mutex::new(DependencyGraph::new()),
            }),
        }
    }

    /// Register a query, or return the existing one for `key`
    ///
    /// Options only apply on first registration. An immediate query starts
    /// fetching before this returns.
    ///
    /// Fetches are spawned on the current tokio runtime. Outside a runtime
    /// an immediate query stays `Loading` and nothing is fetched until its
    /// [`Fetch`] (from `submit`, `in_flight` or `settled`) is awaited.
    pub fn register<T>(
        &self,
        key: impl Into<String>,
        endpoint: Endpoint,
        options: QueryOptions<T>,
    ) -> SpacesResult<Query<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let key = key.into();
        let mut slots = lock(&self.inner.slots);

        if let Some(slot) = slots.get(&key) {
            debug!(key = %key, "query already registered");
            return downcast(&key, slot);
        }

        {
            let mut graph = lock(&self.inner.graph);
            let mut next = graph.clone();
            for upstream in &options.after {
                next.add(upstream, &key)?;
            }
            *graph = next;
        }

        let immediate = options.immediate;
        let cell = Arc::new(QueryCell::new(
            key.clone(),
            endpoint,
            options,
            Arc::downgrade(&self.inner),
        ));
        slots.insert(
            key.clone(),
            Slot {
                typed: Arc::clone(&cell) as Arc<dyn Any + Send + Sync>,
                erased: Arc::clone(&cell) as Arc<dyn ErasedQuery>,
            },
        );
        drop(slots);

        info!(key = %key, immediate, "registered query");
        if immediate {
            let _ = cell.begin();
        }
        Ok(Query { cell })
    }

    /// Typed handle to a registered query
    pub fn query<T>(&self, key: &str) -> SpacesResult<Query<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let slots = lock(&self.inner.slots);
        let slot = slots
            .get(key)
            .ok_or_else(|| SpacesError::QueryNotRegistered(key.to_string()))?;
        downcast(key, slot)
    }

    /// Fetch `key` now, or join its in-flight fetch
    pub fn submit(&self, key: &str) -> SpacesResult<Fetch> {
        let query = self.erased(key)?;
        Ok(query.submit())
    }

    /// Current data for `key`, falling back to its initial data
    pub fn data<T>(&self, key: &str) -> SpacesResult<Option<Arc<T>>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Ok(self.query::<T>(key)?.data())
    }

    /// Current status for `key`
    pub fn status(&self, key: &str) -> Option<QueryStatus> {
        self.erased(key).ok().map(|query| query.status())
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        lock(&self.inner.slots).keys().cloned().collect()
    }

    /// Status of every registered query
    pub fn summaries(&self) -> Vec<EntrySummary> {
        let queries: Vec<_> = lock(&self.inner.slots)
            .values()
            .map(|slot| Arc::clone(&slot.erased))
            .collect();
        queries.iter().map(|query| query.summary()).collect()
    }

    /// Keys submitted when `key` succeeds
    pub fn dependents(&self, key: &str) -> Vec<String> {
        lock(&self.inner.graph).dependents(key)
    }

    /// Keys whose success submits `key`
    pub fn upstreams(&self, key: &str) -> Vec<String> {
        lock(&self.inner.graph).upstreams(key)
    }

    /// Keys that take part in a dependency, upstreams first
    pub fn trigger_order(&self) -> Vec<String> {
        lock(&self.inner.graph).order()
    }

    /// Resubmit every immediate query
    pub fn refresh(&self) -> Vec<Fetch> {
        let queries: Vec<_> = lock(&self.inner.slots)
            .values()
            .filter(|slot| slot.erased.is_immediate())
            .map(|slot| Arc::clone(&slot.erased))
            .collect();
        info!(count = queries.len(), "refreshing immediate queries");
        queries.into_iter().map(|query| query.submit()).collect()
    }

    /// Drop all cached data and return every entry to idle
    ///
    /// Fetches still in flight complete as [`Settled::Discarded`](super::Settled)
    /// without writing. Registrations and dependencies are kept.
    pub fn reset(&self) {
        let queries: Vec<_> = lock(&self.inner.slots)
            .values()
            .map(|slot| Arc::clone(&slot.erased))
            .collect();
        for query in &queries {
            query.reset();
        }
        info!(count = queries.len(), "query store reset");
    }

    /// Name of the transport serving this store
    pub fn transport_name(&self) -> &'static str {
        self.inner.transport.transport_name()
    }

    fn erased(&self, key: &str) -> SpacesResult<Arc<dyn ErasedQuery>> {
        lock(&self.inner.slots)
            .get(key)
            .map(|slot| Arc::clone(&slot.erased))
            .ok_or_else(|| SpacesError::QueryNotRegistered(key.to_string()))
    }
}

fn downcast<T>(key: &str, slot: &Slot) -> SpacesResult<Query<T>>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    Arc::clone(&slot.typed)
        .downcast::<QueryCell<T>>()
        .map(|cell| Query { cell })
        .map_err(|_| SpacesError::QueryTypeMismatch {
            key: key.to_string(),
        })
}
