//! Pass-through artifacts returned by `load`, `sql` and `dryRun`.
//!
//! The bindings never interpret these beyond a few convenience accessors; they
//! are handed to the consumer exactly as the client produced them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query::Query;

/// Result of a `load` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet {
    raw: Value,
}

impl ResultSet {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Tabular rows, looked up under `data` or `results[0].data`.
    pub fn rows(&self) -> &[Value] {
        self.raw
            .get("data")
            .or_else(|| self.raw.pointer("/results/0/data"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The query the server actually answered, when echoed back.
    pub fn query(&self) -> Option<Query> {
        self.raw
            .get("query")
            .or_else(|| self.raw.pointer("/results/0/query"))
            .and_then(|q| serde_json::from_value(q.clone()).ok())
    }
}

/// Rendered SQL for a query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    sql: String,
    #[serde(default)]
    params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Normalization info returned by a dry run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResponse {
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub normalized_queries: Vec<Query>,
    #[serde(default)]
    pub query_order: Vec<Value>,
    #[serde(default)]
    pub pivot_query: Option<Value>,
}
