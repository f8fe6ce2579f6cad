//! Observable values and memoized derivations
//!
//! A [`Signal`] publishes every change to its subscribers. A [`Computed`]
//! reads a signal through a subscription and caches its result until the
//! signal changes again.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A value that notifies subscribers whenever it changes
pub struct Signal<T> {
    tx: watch::Sender<T>,
}

impl<T> Signal<T> {
    /// Create a signal holding `value`
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx }
    }

    /// Read the current value without cloning it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Modify the value in place and notify subscribers
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Modify the value in place; subscribers are notified only if `f` returns true
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Subscribe to changes
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> Signal<T> {
    /// Clone out the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

struct Memo<S, T> {
    source: watch::Receiver<S>,
    value: Option<T>,
}

/// A derived value recomputed only after its source signal changed
pub struct Computed<S, T> {
    memo: Mutex<Memo<S, T>>,
    compute: Box<dyn Fn(&S) -> T + Send + Sync>,
}

impl<S, T> Computed<S, T> {
    /// Derive a value from a signal subscription
    pub fn new(source: watch::Receiver<S>, compute: impl Fn(&S) -> T + Send + Sync + 'static) -> Self {
        Self {
            memo: Mutex::new(Memo {
                source,
                value: None,
            }),
            compute: Box::new(compute),
        }
    }

    /// Read the derived value, recomputing it if the source changed
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let mut memo = lock(&self.memo);
        // A closed source can no longer change, so the memo stays valid.
        let stale = memo.value.is_none() || memo.source.has_changed().unwrap_or(false);
        if stale {
            let value = (self.compute)(&memo.source.borrow_and_update());
            memo.value = Some(value);
        }
        match memo.value.as_ref() {
            Some(value) => f(value),
            None => f(&(self.compute)(&memo.source.borrow())),
        }
    }

    /// Wait until the source changes. Returns false once the source is gone.
    pub async fn changed(&self) -> bool {
        let mut source = lock(&self.memo).source.clone();
        source.changed().await.is_ok()
    }
}

impl<S, T: Clone> Computed<S, T> {
    /// Clone out the derived value
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}
