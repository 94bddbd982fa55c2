//! Process configuration and per-binding options.
//!
//! Process-level settings come from the environment (and `.env` files, through
//! `dotenvy`). Per-binding settings are plain option structs with `with_*`
//! setters.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::client::RemoteClient;
use crate::env::{Environment, ExecutionEnvironment};

/// Environment variable selecting the execution environment (`client` | `server`).
pub const ENV_VAR: &str = "ANALYTICS_BINDINGS_ENV";
/// Environment variable holding the tracing filter for [`crate::logging::init`].
pub const LOG_VAR: &str = "ANALYTICS_BINDINGS_LOG";

/// Process-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingsConfig {
    /// Where the bindings believe they run. Defaults to [`ExecutionEnvironment::Client`].
    pub environment: ExecutionEnvironment,
    /// Tracing filter directive, if configured.
    pub log_filter: Option<String>,
}

impl BindingsConfig {
    /// Load config from env if present; fall back to defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(val) = dotenvy::var(ENV_VAR) {
            match val.parse::<ExecutionEnvironment>() {
                Ok(env) => cfg.environment = env,
                Err(err) => warn!(var = ENV_VAR, error = %err, "ignoring invalid value"),
            }
        }
        if let Ok(val) = dotenvy::var(LOG_VAR)
            && !val.trim().is_empty()
        {
            cfg.log_filter = Some(val);
        }
        cfg
    }
}

/// Options shared by every fetch binding.
///
/// `initial` is the hydration seed: when present the first automatic trigger
/// is skipped unless a manual refetch already happened.
pub struct BindingOptions<T> {
    /// Explicit client; wins over the ambient one.
    pub client: Option<Arc<dyn RemoteClient>>,
    /// Force the idle state and suppress execution until unset.
    pub skip: bool,
    /// Allow automatic execution outside a client environment.
    pub ssr: bool,
    /// Pre-fetched value.
    pub initial: Option<T>,
    /// Environment probe; defaults to [`BindingsConfig::from_env`].
    pub environment: Option<Arc<dyn Environment>>,
}

impl<T> Default for BindingOptions<T> {
    fn default() -> Self {
        Self {
            client: None,
            skip: false,
            ssr: false,
            initial: None,
            environment: None,
        }
    }
}

impl<T> BindingOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, client: Arc<dyn RemoteClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_ssr(mut self, ssr: bool) -> Self {
        self.ssr = ssr;
        self
    }

    pub fn with_initial(mut self, initial: T) -> Self {
        self.initial = Some(initial);
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub(crate) fn resolved_environment(&self) -> Arc<dyn Environment> {
        match &self.environment {
            Some(env) => Arc::clone(env),
            None => Arc::new(BindingsConfig::from_env().environment),
        }
    }
}

impl<T> fmt::Debug for BindingOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingOptions")
            .field("client", &self.client.is_some())
            .field("skip", &self.skip)
            .field("ssr", &self.ssr)
            .field("initial", &self.initial.is_some())
            .field("environment", &self.environment)
            .finish()
    }
}
