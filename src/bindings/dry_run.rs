//! Dry-run bindings: eager ([`DryRunBinding`]) and on demand ([`LazyDryRun`]).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use super::{Binding, Eligibility, QueryInput, remote_call};
use crate::cell::{AsyncCell, AsyncState};
use crate::client::RemoteClient;
use crate::config::BindingOptions;
use crate::context::ClientContext;
use crate::error::{RemoteError, Result};
use crate::model::{DryRunResponse, Query};

pub type DryRunBinding = Binding<DryRunResponse>;

impl Binding<DryRunResponse> {
    pub fn new(
        ctx: &ClientContext,
        query: impl Into<QueryInput>,
        options: BindingOptions<DryRunResponse>,
    ) -> Result<Self> {
        let call = remote_call(|client, query| async move { client.dry_run(&query).await });
        Self::activate(
            ctx,
            "dry-run",
            query.into(),
            Eligibility::QueryPresent,
            call,
            options,
        )
    }

    pub fn response(&self) -> Option<Arc<DryRunResponse>> {
        self.value()
    }
}

/// Dry run that only executes when asked.
///
/// Never auto-triggers, so the `skip` and `ssr` options have no effect. The
/// last query passed to [`run`](Self::run) is remembered for
/// [`refetch`](Self::refetch). Does not need a Tokio runtime at construction.
pub struct LazyDryRun {
    cell: AsyncCell<DryRunResponse>,
    client: Arc<dyn RemoteClient>,
    last_query: Mutex<Option<Query>>,
}

impl LazyDryRun {
    pub fn new(ctx: &ClientContext, options: BindingOptions<DryRunResponse>) -> Result<Self> {
        let client = ctx.resolve(options.client.as_ref())?;
        let cell = match options.initial {
            Some(seed) => AsyncCell::seeded("lazy-dry-run", seed),
            None => AsyncCell::new("lazy-dry-run"),
        };
        Ok(Self {
            cell,
            client,
            last_query: Mutex::new(None),
        })
    }

    /// Dry-run `query` and remember it. Resolves even when the call fails.
    pub async fn run(&self, query: Query) {
        *self.last_query.lock() = Some(query.clone());
        self.cell.mark_manual_refetch();
        self.dispatch(query).await;
    }

    /// Repeat the last [`run`](Self::run). No-op when nothing ran yet.
    pub async fn refetch(&self) {
        let Some(query) = self.last_query.lock().clone() else {
            debug!(binding = self.cell.label(), "refetch before any run, ignoring");
            return;
        };
        self.cell.mark_manual_refetch();
        self.dispatch(query).await;
    }

    async fn dispatch(&self, query: Query) {
        let eligible = query.is_present();
        let client = Arc::clone(&self.client);
        self.cell
            .execute(eligible, move || async move { client.dry_run(&query).await })
            .await;
    }

    pub fn last_query(&self) -> Option<Query> {
        self.last_query.lock().clone()
    }

    pub fn state(&self) -> AsyncState<DryRunResponse> {
        self.cell.snapshot()
    }

    pub fn value(&self) -> Option<Arc<DryRunResponse>> {
        self.state().value
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn error(&self) -> Option<RemoteError> {
        self.state().error
    }

    pub fn subscribe(&self) -> watch::Receiver<AsyncState<DryRunResponse>> {
        self.cell.subscribe()
    }

    pub async fn settled(&self) -> AsyncState<DryRunResponse> {
        self.cell.settled().await
    }
}

impl fmt::Debug for LazyDryRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyDryRun")
            .field("cell", &self.cell)
            .field("last_query", &*self.last_query.lock())
            .finish()
    }
}
