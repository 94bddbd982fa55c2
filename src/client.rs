//! The remote analytics client abstraction.
//!
//! Transport, authentication and client construction live outside this crate.
//! Anything implementing [`RemoteClient`] can back the bindings; the
//! [`NoopClient`] is used where a client slot must be filled but nothing is
//! configured.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::{DryRunResponse, Metadata, Query, ResultSet, SqlQuery};

/// Error type returned by remote clients. Anything boxable works, including `&str`.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

/// Options forwarded verbatim to [`RemoteClient::load`].
pub type LoadOptions = Map<String, Value>;

/// Capability set of the remote analytics service.
///
/// Every call may suspend and may fail. Calls are never cancelled by the
/// bindings; a superseded call runs to completion and its result is dropped.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn load(&self, query: &Query, options: &LoadOptions) -> Result<ResultSet, ClientError>;

    async fn meta(&self) -> Result<Metadata, ClientError>;

    async fn sql(&self, query: &Query) -> Result<SqlQuery, ClientError>;

    async fn dry_run(&self, query: &Query) -> Result<DryRunResponse, ClientError>;
}

/// Client that fails every call. Useful as an explicit "not configured" value.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClient;

const NOT_CONFIGURED: &str = "remote client not configured";

#[async_trait]
impl RemoteClient for NoopClient {
    async fn load(&self, _query: &Query, _options: &LoadOptions) -> Result<ResultSet, ClientError> {
        Err(NOT_CONFIGURED.into())
    }

    async fn meta(&self) -> Result<Metadata, ClientError> {
        Err(NOT_CONFIGURED.into())
    }

    async fn sql(&self, _query: &Query) -> Result<SqlQuery, ClientError> {
        Err(NOT_CONFIGURED.into())
    }

    async fn dry_run(&self, _query: &Query) -> Result<DryRunResponse, ClientError> {
        Err(NOT_CONFIGURED.into())
    }
}
