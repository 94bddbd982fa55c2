//! Fetch bindings: a remote operation wired into an [`AsyncCell`].
//!
//! Every binding shares the same machinery ([`Binding<T>`]); the instantiations
//! differ only in the remote call and the eligibility gate:
//!
//! - [`query`]: `load(query, options)`, gated on query presence
//! - [`meta`]: `meta()`, always eligible
//! - [`sql`]: `sql(query)`, gated on query presence
//! - [`dry_run`]: `dry_run(query)`, eager ([`DryRunBinding`]) and on demand ([`LazyDryRun`])
//!
//! An automatic trigger (activation, or a change of a watched query) runs only
//! when the skip flag is off, the environment allows it, and no hydration seed
//! is pending. The version is bumped synchronously at the trigger, in trigger
//! order; the remote call then completes on its own task, so overlapping
//! requests are arbitrated by the cell and nothing else.

pub mod dry_run;
pub mod meta;
pub mod query;
pub mod sql;

pub use dry_run::{DryRunBinding, LazyDryRun};
pub use meta::MetaBinding;
pub use query::QueryBinding;
pub use sql::SqlBinding;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cell::{AsyncCell, AsyncState, capture};
use crate::client::{ClientError, RemoteClient};
use crate::config::BindingOptions;
use crate::context::ClientContext;
use crate::env::{Environment, allows_auto_run};
use crate::error::{BindingError, RemoteError, Result};
use crate::model::Query;

/// Where a binding gets its query from.
pub enum QueryInput {
    /// Evaluated once, at activation.
    Static(Query),
    /// Re-evaluated on activation and on each refetch. Does not track what the
    /// producer reads; use [`QueryInput::Watched`] to re-run on change.
    Computed(Arc<dyn Fn() -> Query + Send + Sync>),
    /// Re-triggers whenever the published query differs from the last one seen.
    Watched(watch::Receiver<Query>),
}

impl QueryInput {
    pub fn computed(producer: impl Fn() -> Query + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(producer))
    }
}

impl From<Query> for QueryInput {
    fn from(query: Query) -> Self {
        Self::Static(query)
    }
}

impl From<watch::Receiver<Query>> for QueryInput {
    fn from(rx: watch::Receiver<Query>) -> Self {
        Self::Watched(rx)
    }
}

impl fmt::Debug for QueryInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(q) => f.debug_tuple("Static").field(q).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
            Self::Watched(rx) => f.debug_tuple("Watched").field(&*rx.borrow()).finish(),
        }
    }
}

pub(crate) type RemoteCall<T> = Arc<
    dyn Fn(Arc<dyn RemoteClient>, Query) -> BoxFuture<'static, std::result::Result<T, ClientError>>
        + Send
        + Sync,
>;

pub(crate) fn remote_call<T, F, Fut>(call: F) -> RemoteCall<T>
where
    F: Fn(Arc<dyn RemoteClient>, Query) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<T, ClientError>> + Send + 'static,
{
    Arc::new(move |client: Arc<dyn RemoteClient>, query: Query| {
        call(client, query).boxed()
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Eligibility {
    Always,
    QueryPresent,
}

struct Fetch<T> {
    cell: AsyncCell<T>,
    client: Arc<dyn RemoteClient>,
    call: RemoteCall<T>,
    eligibility: Eligibility,
    producer: Option<Arc<dyn Fn() -> Query + Send + Sync>>,
    query: Mutex<Query>,
    skip: AtomicBool,
    ssr: bool,
    environment: Arc<dyn Environment>,
    seed_pending: AtomicBool,
    runtime: Handle,
}

impl<T: Send + Sync + 'static> Fetch<T> {
    fn eligible(&self, query: &Query) -> bool {
        match self.eligibility {
            Eligibility::Always => true,
            Eligibility::QueryPresent => query.is_present(),
        }
    }

    fn evaluate(&self) -> Query {
        match &self.producer {
            Some(producer) => {
                let query = producer();
                *self.query.lock() = query.clone();
                query
            }
            None => self.query.lock().clone(),
        }
    }

    /// Automatic trigger. Gates in order: skip flag, environment, hydration seed, presence.
    fn trigger(&self) {
        let label = self.cell.label();
        if self.skip.load(Ordering::SeqCst) {
            debug!(binding = label, reason = "skip-flag", "trigger skipped");
            self.discard();
            return;
        }
        if !allows_auto_run(self.environment.as_ref(), self.ssr) {
            debug!(binding = label, reason = "environment", "trigger skipped");
            return;
        }
        if self.seed_pending.swap(false, Ordering::SeqCst) && !self.cell.manual_refetch_occurred()
        {
            debug!(binding = label, reason = "hydration-seed", "trigger skipped");
            return;
        }
        let query = self.evaluate();
        if !self.eligible(&query) {
            debug!(binding = label, reason = "absent-query", "trigger skipped");
            self.cell.skip();
            return;
        }
        let ticket = self.cell.begin();
        let request = (self.call)(Arc::clone(&self.client), query);
        let cell = self.cell.clone();
        self.runtime.spawn(async move {
            let outcome = capture(request).await;
            cell.complete(ticket, outcome);
        });
    }

    /// Settle idle. The seed, if still held, is gone, so the next trigger must fetch.
    fn discard(&self) {
        self.seed_pending.store(false, Ordering::SeqCst);
        self.cell.skip();
    }

    /// Record a newly observed query; trigger only if it differs from the last one.
    fn observe(&self, next: Query) {
        let changed = {
            let mut current = self.query.lock();
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        };
        if changed {
            self.trigger();
        }
    }

    async fn refetch(&self) {
        self.cell.mark_manual_refetch();
        let query = self.evaluate();
        let eligible = self.eligible(&query);
        let call = Arc::clone(&self.call);
        let client = Arc::clone(&self.client);
        self.cell.execute(eligible, move || call(client, query)).await;
    }

    fn set_skip(&self, skip: bool) {
        let was = self.skip.swap(skip, Ordering::SeqCst);
        if skip {
            self.discard();
        } else if was {
            self.trigger();
        }
    }
}

/// A remote operation bound to a versioned cell.
///
/// Construct through the instantiation modules ([`QueryBinding::new`],
/// [`MetaBinding::new`], ...). Construction needs a Tokio runtime; dropping the
/// binding stops its query watcher but lets in-flight requests finish.
pub struct Binding<T> {
    fetch: Arc<Fetch<T>>,
    watcher: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> Binding<T> {
    pub(crate) fn activate(
        ctx: &ClientContext,
        label: &'static str,
        input: QueryInput,
        eligibility: Eligibility,
        call: RemoteCall<T>,
        options: BindingOptions<T>,
    ) -> Result<Self> {
        let client = ctx.resolve(options.client.as_ref())?;
        let runtime = Handle::try_current().map_err(|e| BindingError::Runtime(e.to_string()))?;
        let environment = options.resolved_environment();
        let BindingOptions {
            skip, ssr, initial, ..
        } = options;

        let seed_pending = initial.is_some();
        let cell = match initial {
            Some(value) => AsyncCell::seeded(label, value),
            None => AsyncCell::new(label),
        };

        let (query, producer, receiver) = match input {
            QueryInput::Static(query) => (query, None, None),
            QueryInput::Computed(producer) => (Query::default(), Some(producer), None),
            QueryInput::Watched(mut rx) => {
                let query = rx.borrow_and_update().clone();
                (query, None, Some(rx))
            }
        };

        let fetch = Arc::new(Fetch {
            cell,
            client,
            call,
            eligibility,
            producer,
            query: Mutex::new(query),
            skip: AtomicBool::new(skip),
            ssr,
            environment,
            seed_pending: AtomicBool::new(seed_pending),
            runtime: runtime.clone(),
        });
        fetch.trigger();

        let watcher = receiver.map(|mut rx| {
            let fetch = Arc::clone(&fetch);
            runtime.spawn(async move {
                while rx.changed().await.is_ok() {
                    let next = rx.borrow_and_update().clone();
                    fetch.observe(next);
                }
            })
        });

        Ok(Self { fetch, watcher })
    }

    /// Current `{value, loading, error}`.
    pub fn state(&self) -> AsyncState<T> {
        self.fetch.cell.snapshot()
    }

    pub fn value(&self) -> Option<Arc<T>> {
        self.state().value
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<RemoteError> {
        self.state().error
    }

    pub fn subscribe(&self) -> watch::Receiver<AsyncState<T>> {
        self.fetch.cell.subscribe()
    }

    /// Wait until no request of this binding is loading.
    pub async fn settled(&self) -> AsyncState<T> {
        self.fetch.cell.settled().await
    }

    /// Re-run the remote call now.
    ///
    /// Ignores the skip flag and the environment gate; an absent query still
    /// settles idle. Resolves even when the call fails; check [`Self::error`].
    pub async fn refetch(&self) {
        self.fetch.refetch().await;
    }

    /// Set the skip flag. Setting it settles idle; clearing it re-triggers.
    pub fn set_skip(&self, skip: bool) {
        self.fetch.set_skip(skip);
    }

    pub fn is_skipped(&self) -> bool {
        self.fetch.skip.load(Ordering::SeqCst)
    }

    /// The query most recently evaluated by this binding.
    pub fn query(&self) -> Query {
        self.fetch.query.lock().clone()
    }

    /// Version of the most recently issued request.
    pub fn version(&self) -> u64 {
        self.fetch.cell.version()
    }

    pub fn cell(&self) -> &AsyncCell<T> {
        &self.fetch.cell
    }
}

impl<T> Drop for Binding<T> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("cell", &self.fetch.cell)
            .field("eligibility", &self.fetch.eligibility)
            .field("ssr", &self.fetch.ssr)
            .field("skip", &self.fetch.skip.load(Ordering::SeqCst))
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}
