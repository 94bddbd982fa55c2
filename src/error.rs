//! Error types for the bindings layer.
//!
//! Two families with opposite propagation rules:
//!
//! - [`BindingError`] is raised synchronously while a binding is being set up
//!   (no client resolvable, no runtime to spawn on). It is returned to the caller
//!   and never stored in state.
//! - [`RemoteError`] is what a failed remote call turns into. It is captured into
//!   [`AsyncState::error`](crate::cell::AsyncState) and never returned from
//!   `refetch()` or `run()`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::client::ClientError;

/// Setup-time failures. Fatal to the binding being constructed.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Neither an explicit client nor an ambient one could be resolved.
    #[error("no client available: {0}")]
    Configuration(String),

    /// Background work was requested outside a Tokio runtime.
    #[error("binding requires a Tokio runtime: {0}")]
    Runtime(String),
}

impl BindingError {
    pub(crate) fn missing_client() -> Self {
        Self::Configuration(
            "wrap with a provider scope or pass a client explicitly".to_string(),
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BindingError>;

/// How a remote call failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The client returned an error.
    Failed,
    /// The client panicked while the request was being produced or awaited.
    Panicked,
}

/// A remote failure, normalized into a clonable value for state snapshots.
#[derive(Clone, Debug)]
pub struct RemoteError {
    kind: RemoteErrorKind,
    message: String,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl RemoteError {
    /// Wrap an error returned by a [`RemoteClient`](crate::client::RemoteClient).
    pub fn from_client(err: ClientError) -> Self {
        Self {
            kind: RemoteErrorKind::Failed,
            message: err.to_string(),
            source: Some(Arc::from(err)),
        }
    }

    /// Wrap a panic payload, keeping its string representation when it has one.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "remote operation panicked".to_string()
        };
        Self {
            kind: RemoteErrorKind::Panicked,
            message,
            source: None,
        }
    }

    /// Build an error from any displayable value.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            kind: RemoteErrorKind::Failed,
            message: message.to_string(),
            source: None,
        }
    }

    pub fn kind(&self) -> RemoteErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RemoteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl PartialEq for RemoteError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.message == other.message
    }
}
