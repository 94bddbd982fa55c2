//! Reactive bindings over an analytics query client.
//!
//! This crate wires a remote analytics service into observable, versioned state:
//!
//! - **[`context`]**: Scope tree of ambient clients; explicit clients win.
//! - **[`model`]**: Query, metadata and result types, plus the query presence predicate.
//! - **[`client`]**: The [`RemoteClient`] capability set (`load`, `meta`, `sql`, `dry_run`).
//! - **[`cell`]**: Versioned async state cell with stale-response suppression.
//! - **[`bindings`]**: Query, metadata, SQL and dry-run bindings (eager and lazy).
//! - **[`builder`]**: Stateful query builder over a draft and an owned metadata binding.
//! - **[`env`]**: Client/server execution-environment probe for auto-run gating.
//! - **[`config`]**: Process configuration from the environment and per-binding options.
//! - **[`logging`]**: Optional `tracing` subscriber setup.
//! - **[`error`]**: Setup errors and normalized remote errors.
//!
//! ```no_run
//! use std::sync::Arc;
//! use analytics_bindings::{BindingOptions, ClientContext, NoopClient, Query, QueryBinding};
//!
//! # async fn demo() -> analytics_bindings::Result<()> {
//! let ctx = ClientContext::root();
//! ctx.set(Arc::new(NoopClient));
//! let binding = QueryBinding::new(
//!     &ctx,
//!     Query::new().with_measures(["Orders.count"]),
//!     BindingOptions::new(),
//! )?;
//! let state = binding.settled().await;
//! assert!(state.error.is_some());
//! # Ok(())
//! # }
//! ```

pub mod bindings;
pub mod builder;
pub mod cell;
pub mod client;
pub mod config;
pub mod context;
pub mod env;
pub mod error;
pub mod logging;
pub mod model;

pub use bindings::{
    Binding, DryRunBinding, LazyDryRun, MetaBinding, QueryBinding, QueryInput, SqlBinding,
};
pub use builder::{BuilderOptions, ChartType, QueryBuilder, QueryDraft};
pub use cell::{AsyncCell, AsyncState, RequestTicket};
pub use client::{ClientError, LoadOptions, NoopClient, RemoteClient};
pub use config::{BindingOptions, BindingsConfig};
pub use context::ClientContext;
pub use env::{Environment, ExecutionEnvironment};
pub use error::{BindingError, RemoteError, RemoteErrorKind, Result};
pub use model::{
    AvailableMember, DryRunResponse, Metadata, Query, ResultSet, SqlQuery, is_query_present,
    is_value_present,
};
