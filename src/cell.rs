//! Versioned async state cell.
//!
//! The cell holds `{value, loading, error}` and a request version. Every request
//! bumps the version before it is issued and captures the new number in a
//! [`RequestTicket`]. When the request settles, its outcome is applied only if
//! the ticket still matches the current version; otherwise it is dropped.
//! Nothing is cancelled: a superseded request runs to completion and its
//! outcome simply never reaches the state.
//!
//! ```no_run
//! # async fn demo() {
//! use analytics_bindings::cell::AsyncCell;
//!
//! let cell: AsyncCell<u32> = AsyncCell::new("demo");
//! let first = cell.begin();
//! let second = cell.begin();
//! cell.complete(second, Ok(2));
//! assert!(!cell.complete(first, Ok(1)), "stale outcome is dropped");
//! assert_eq!(cell.snapshot().value.as_deref(), Some(&2));
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::client::ClientError;
use crate::error::RemoteError;

/// Externally visible state of a cell.
///
/// After any settlement exactly one of these holds: a value is set, an error is
/// set, or both are empty (idle).
pub struct AsyncState<T> {
    pub value: Option<Arc<T>>,
    pub loading: bool,
    pub error: Option<RemoteError>,
}

impl<T> AsyncState<T> {
    pub fn idle() -> Self {
        Self {
            value: None,
            loading: false,
            error: None,
        }
    }

    fn seeded(value: T) -> Self {
        Self {
            value: Some(Arc::new(value)),
            loading: false,
            error: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        !self.loading && self.value.is_none() && self.error.is_none()
    }
}

impl<T> Default for AsyncState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> Clone for AsyncState<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncState")
            .field("value", &self.value)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .finish()
    }
}

/// Proof that a request was issued at a given version.
#[must_use = "a ticket must be completed, or its request never settles the cell"]
#[derive(Debug)]
pub struct RequestTicket {
    version: u64,
}

impl RequestTicket {
    pub fn version(&self) -> u64 {
        self.version
    }
}

struct CellInner<T> {
    label: &'static str,
    /// Guards the version; state writes happen while it is held.
    version: Mutex<u64>,
    state: watch::Sender<AsyncState<T>>,
    manual_refetch: AtomicBool,
}

/// Clonable handle to one versioned cell. Clones share state.
pub struct AsyncCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for AsyncCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for AsyncCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = *self.inner.version.lock();
        let state = self.inner.state.borrow();
        f.debug_struct("AsyncCell")
            .field("label", &self.inner.label)
            .field("version", &version)
            .field("loading", &state.loading)
            .field("has_value", &state.value.is_some())
            .field("has_error", &state.error.is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> AsyncCell<T> {
    /// An idle cell. `label` identifies the cell in logs.
    pub fn new(label: &'static str) -> Self {
        Self::with_state(label, AsyncState::idle())
    }

    /// A cell whose initial value is `value` (hydration seed).
    pub fn seeded(label: &'static str, value: T) -> Self {
        Self::with_state(label, AsyncState::seeded(value))
    }

    fn with_state(label: &'static str, state: AsyncState<T>) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            inner: Arc::new(CellInner {
                label,
                version: Mutex::new(0),
                state: tx,
                manual_refetch: AtomicBool::new(false),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    /// Current state.
    pub fn snapshot(&self) -> AsyncState<T> {
        self.inner.state.borrow().clone()
    }

    /// Change subscription; the receiver always observes the latest state.
    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T>> {
        self.inner.state.subscribe()
    }

    /// Version of the most recently issued request (or skip).
    pub fn version(&self) -> u64 {
        *self.inner.version.lock()
    }

    /// Issue a request: bump the version, enter loading and clear the error.
    /// The previous value stays visible while loading.
    pub fn begin(&self) -> RequestTicket {
        let mut version = self.inner.version.lock();
        *version += 1;
        self.inner.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
        debug!(binding = self.inner.label, version = *version, "request issued");
        RequestTicket { version: *version }
    }

    /// Apply `outcome` if `ticket` is still current. Returns whether it was applied.
    pub fn complete(&self, ticket: RequestTicket, outcome: Result<T, RemoteError>) -> bool {
        let version = self.inner.version.lock();
        if *version != ticket.version {
            trace!(
                binding = self.inner.label,
                version = ticket.version,
                current = *version,
                "discarding stale result"
            );
            return false;
        }
        if let Err(err) = &outcome {
            warn!(
                binding = self.inner.label,
                version = ticket.version,
                error = %err,
                "remote operation failed"
            );
        }
        self.inner.state.send_modify(move |s| {
            match outcome {
                Ok(value) => {
                    s.value = Some(Arc::new(value));
                    s.error = None;
                }
                Err(err) => {
                    s.value = None;
                    s.error = Some(err);
                }
            }
            s.loading = false;
        });
        true
    }

    /// Settle to idle and invalidate every outstanding ticket.
    pub fn skip(&self) {
        let mut version = self.inner.version.lock();
        *version += 1;
        self.inner.state.send_replace(AsyncState::idle());
        debug!(binding = self.inner.label, version = *version, "settled idle");
    }

    /// Run `operation` under the version protocol.
    ///
    /// When `eligible` is false the cell settles idle without calling the
    /// operation. Failures, including panics, are captured into state; this
    /// never returns an error. Returns whether the outcome was applied.
    pub async fn execute<F, Fut>(&self, eligible: bool, operation: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if !eligible {
            self.skip();
            return false;
        }
        let ticket = self.begin();
        let outcome = capture(async move { operation().await }).await;
        self.complete(ticket, outcome)
    }

    /// Record that a manual refetch happened. Disables the hydration-seed skip.
    pub fn mark_manual_refetch(&self) {
        self.inner.manual_refetch.store(true, Ordering::SeqCst);
    }

    pub fn manual_refetch_occurred(&self) -> bool {
        self.inner.manual_refetch.load(Ordering::SeqCst)
    }

    /// Wait until the cell is not loading and return that state.
    pub async fn settled(&self) -> AsyncState<T> {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.snapshot(),
        }
    }
}

/// Await a remote future, normalizing errors and panics into [`RemoteError`].
pub(crate) async fn capture<T, Fut>(fut: Fut) -> Result<T, RemoteError>
where
    Fut: Future<Output = Result<T, ClientError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(RemoteError::from_client(err)),
        Err(payload) => Err(RemoteError::from_panic(payload)),
    }
}
