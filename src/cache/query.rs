//! A single registered query and its fetch lifecycle

use super::entry::{CacheEntry, EntrySummary, QueryError, QueryStatus, Settled};
use super::store::StoreInner;
use crate::error::{SpacesError, SpacesResult};
use crate::signal::{lock, Computed, Signal};
use crate::transport::Endpoint;
use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Converts a decoded response payload into the query's data
pub type Transform<T> = Arc<dyn Fn(Value) -> SpacesResult<T> + Send + Sync>;

/// Runs after a successful fetch has been written
pub type SuccessHook<T> = Arc<dyn Fn(&T) -> SpacesResult<()> + Send + Sync>;

/// Handle to an in-flight fetch; every clone resolves to the same outcome
pub type Fetch = Shared<BoxFuture<'static, Settled>>;

/// Registration options for a query
pub struct QueryOptions<T> {
    pub(crate) initial_data: Option<Arc<T>>,
    pub(crate) immediate: bool,
    pub(crate) transform: Option<Transform<T>>,
    pub(crate) on_success: Option<SuccessHook<T>>,
    pub(crate) after: Vec<String>,
}

impl<T> QueryOptions<T> {
    /// Lazy query with no initial data
    pub fn new() -> Self {
        Self {
            initial_data: None,
            immediate: false,
            transform: None,
            on_success: None,
            after: Vec::new(),
        }
    }

    /// Value exposed by `data()` until the first successful fetch
    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(Arc::new(data));
        self
    }

    /// Fetch as soon as the query is registered
    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Build the data from the payload instead of deserializing it directly
    pub fn transform(
        mut self,
        transform: impl Fn(Value) -> SpacesResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Callback run once per successful fetch, after the data is stored
    pub fn on_success(
        mut self,
        hook: impl Fn(&T) -> SpacesResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Submit this query whenever `upstream` loads successfully
    pub fn after(mut self, upstream: impl Into<String>) -> Self {
        self.after.push(upstream.into());
        self
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased access used by the store for key-based operations
pub(crate) trait ErasedQuery: Send + Sync {
    fn submit(self: Arc<Self>) -> Fetch;
    fn status(&self) -> QueryStatus;
    fn is_immediate(&self) -> bool;
    fn reset(&self);
    fn summary(&self) -> EntrySummary;
}

pub(crate) struct QueryCell<T> {
    key: String,
    endpoint: Endpoint,
    initial_data: Option<Arc<T>>,
    immediate: bool,
    transform: Option<Transform<T>>,
    on_success: Option<SuccessHook<T>>,
    state: Signal<CacheEntry<T>>,
    in_flight: Mutex<Option<Fetch>>,
    epoch: AtomicU64,
    store: Weak<StoreInner>,
}

impl<T> QueryCell<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub(crate) fn new(
        key: String,
        endpoint: Endpoint,
        options: QueryOptions<T>,
        store: Weak<StoreInner>,
    ) -> Self {
        Self {
            state: Signal::new(CacheEntry::new(key.clone())),
            key,
            endpoint,
            initial_data: options.initial_data,
            immediate: options.immediate,
            transform: options.transform,
            on_success: options.on_success,
            in_flight: Mutex::new(None),
            epoch: AtomicU64::new(0),
            store,
        }
    }

    /// Start a fetch, or join the one already running
    pub(crate) fn begin(self: &Arc<Self>) -> Fetch {
        let mut in_flight = lock(&self.in_flight);
        if let Some(fetch) = in_flight.as_ref() {
            if fetch.peek().is_none() {
                debug!(key = %self.key, "joining in-flight fetch");
                return fetch.clone();
            }
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.state.update(|entry| entry.status = QueryStatus::Loading);
        let fetch = Arc::clone(self).run(epoch).boxed().shared();
        *in_flight = Some(fetch.clone());
        drop(in_flight);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(fetch.clone());
            }
            Err(_) => debug!(key = %self.key, "no runtime, fetch runs when awaited"),
        }
        fetch
    }

    async fn run(self: Arc<Self>, epoch: u64) -> Settled {
        let Some(store) = self.store.upgrade() else {
            return Settled::Discarded;
        };

        debug!(key = %self.key, method = %self.endpoint.name(), "fetch started");
        let result = match store.transport.call(&self.endpoint).await {
            Ok(payload) => self.apply(payload),
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => self.commit(&store, epoch, data),
            Err(e) => self.fail(epoch, &e),
        }
    }

    /// Whether no reset happened since the fetch for `epoch` began
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn discard(&self) -> Settled {
        debug!(key = %self.key, "store was reset, discarding fetch result");
        Settled::Discarded
    }

    fn apply(&self, payload: Value) -> SpacesResult<T> {
        match &self.transform {
            Some(transform) => transform(payload).map_err(|e| match e {
                SpacesError::Transform { .. } => e,
                other => SpacesError::transform(&self.key, other.to_string()),
            }),
            None => serde_json::from_value(payload).map_err(|e| SpacesError::Decode {
                method: self.endpoint.name().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    // Writes check the epoch under the state lock; `reset` bumps it under the same lock.
    fn commit(&self, store: &StoreInner, epoch: u64, data: T) -> Settled {
        let data = Arc::new(data);
        let mut fetched_at = 0;
        let written = self.state.update_if(|entry| {
            if !self.is_current(epoch) {
                return false;
            }
            entry.data = Some(Arc::clone(&data));
            entry.error = None;
            entry.fetched_at += 1;
            entry.updated_at = Some(Utc::now());
            fetched_at = entry.fetched_at;
            true
        });
        if !written {
            return self.discard();
        }

        if let Some(hook) = &self.on_success {
            if let Err(e) = hook(&data) {
                warn!(key = %self.key, error = %e, "success hook failed");
            }
        }
        if !self.is_current(epoch) {
            return self.discard();
        }
        store.trigger_dependents(&self.key);

        let loaded = self.state.update_if(|entry| {
            if !self.is_current(epoch) {
                return false;
            }
            entry.status = QueryStatus::Loaded;
            true
        });
        if !loaded {
            return self.discard();
        }
        debug!(key = %self.key, fetched_at, "fetch loaded");
        Settled::Loaded { fetched_at }
    }

    fn fail(&self, epoch: u64, err: &SpacesError) -> Settled {
        let error = QueryError::from_error(err);
        let recorded = self.state.update_if(|entry| {
            if !self.is_current(epoch) {
                return false;
            }
            entry.status = QueryStatus::Error;
            entry.error = Some(error.clone());
            true
        });
        if !recorded {
            return self.discard();
        }
        warn!(key = %self.key, kind = %error.kind, error = %error.message, "fetch failed");
        Settled::Failed(error)
    }
}

impl<T> ErasedQuery for QueryCell<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn submit(self: Arc<Self>) -> Fetch {
        self.begin()
    }

    fn status(&self) -> QueryStatus {
        self.state.with(|entry| entry.status)
    }

    fn is_immediate(&self) -> bool {
        self.immediate
    }

    fn reset(&self) {
        // Same lock order as `begin`: in_flight, then state
        let mut in_flight = lock(&self.in_flight);
        *in_flight = None;
        // fetched_at stays monotonic across resets
        self.state.update(|entry| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            entry.status = QueryStatus::Idle;
            entry.data = None;
            entry.error = None;
            entry.updated_at = None;
        });
    }

    fn summary(&self) -> EntrySummary {
        self.state.with(|entry| EntrySummary {
            key: self.key.clone(),
            method: self.endpoint.name().to_string(),
            status: entry.status,
            immediate: self.immediate,
            has_data: entry.has_data(),
            fetched_at: entry.fetched_at,
            updated_at: entry.updated_at,
            error: entry.error.clone(),
        })
    }
}

/// Typed handle to a registered query
pub struct Query<T> {
    pub(crate) cell: Arc<QueryCell<T>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Query<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Cache key
    pub fn key(&self) -> &str {
        &self.cell.key
    }

    /// Endpoint the query is bound to
    pub fn endpoint(&self) -> &Endpoint {
        &self.cell.endpoint
    }

    /// Current status
    pub fn status(&self) -> QueryStatus {
        self.cell.status()
    }

    /// Snapshot of the whole entry
    pub fn entry(&self) -> CacheEntry<T> {
        self.cell.state.get()
    }

    /// Last fetched data, or the initial data if nothing has loaded yet
    pub fn data(&self) -> Option<Arc<T>> {
        self.cell
            .state
            .with(|entry| entry.data.clone())
            .or_else(|| self.cell.initial_data.clone())
    }

    /// Last failure, if the most recent fetch failed
    pub fn error(&self) -> Option<QueryError> {
        self.cell.state.with(|entry| entry.error.clone())
    }

    /// Fetch now, or join the fetch already in flight
    pub fn submit(&self) -> Fetch {
        self.cell.begin()
    }

    /// The fetch currently running, if any
    pub fn in_flight(&self) -> Option<Fetch> {
        lock(&self.cell.in_flight)
            .as_ref()
            .filter(|fetch| fetch.peek().is_none())
            .cloned()
    }

    /// Wait for the running fetch, or report the current state if none is running
    pub async fn settled(&self) -> Settled {
        if let Some(fetch) = self.in_flight() {
            return fetch.await;
        }
        self.cell.state.with(|entry| match entry.status {
            QueryStatus::Loaded => Settled::Loaded {
                fetched_at: entry.fetched_at,
            },
            QueryStatus::Error => entry
                .error
                .clone()
                .map_or(Settled::Idle, Settled::Failed),
            QueryStatus::Idle | QueryStatus::Loading => Settled::Idle,
        })
    }

    /// Subscribe to entry changes
    pub fn watch(&self) -> watch::Receiver<CacheEntry<T>> {
        self.cell.state.subscribe()
    }

    /// Memoized value derived from the query's data
    ///
    /// `derive` sees the same value as [`Query::data`], so the initial data
    /// is used until the first fetch completes.
    pub fn derive<U>(
        &self,
        derive: impl Fn(Option<&T>) -> U + Send + Sync + 'static,
    ) -> Computed<CacheEntry<T>, U> {
        let initial = self.cell.initial_data.clone();
        Computed::new(self.watch(), move |entry: &CacheEntry<T>| {
            derive(entry.data.as_deref().or(initial.as_deref()))
        })
    }
}
