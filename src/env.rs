//! Execution-environment probe used for server-side gating.
//!
//! Bindings only auto-run when the environment reports a client-side context,
//! unless the binding opts in with `ssr`. Tests inject a fixed environment.

use std::fmt;
use std::str::FromStr;

/// Answers "are we running client-side?".
pub trait Environment: Send + Sync + fmt::Debug {
    fn is_client(&self) -> bool;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExecutionEnvironment {
    #[default]
    Client,
    Server,
}

impl Environment for ExecutionEnvironment {
    fn is_client(&self) -> bool {
        matches!(self, Self::Client)
    }
}

impl fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

impl FromStr for ExecutionEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" | "browser" => Ok(Self::Client),
            "server" | "ssr" => Ok(Self::Server),
            other => Err(format!("unknown execution environment '{other}'")),
        }
    }
}

/// Auto-run gate: client-side, or explicitly allowed server-side.
pub(crate) fn allows_auto_run(env: &dyn Environment, ssr: bool) -> bool {
    env.is_client() || ssr
}
