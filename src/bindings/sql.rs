//! SQL text binding: `sql(query)`.

use std::sync::Arc;

use super::{Binding, Eligibility, QueryInput, remote_call};
use crate::config::BindingOptions;
use crate::context::ClientContext;
use crate::error::Result;
use crate::model::SqlQuery;

pub type SqlBinding = Binding<SqlQuery>;

impl Binding<SqlQuery> {
    pub fn new(
        ctx: &ClientContext,
        query: impl Into<QueryInput>,
        options: BindingOptions<SqlQuery>,
    ) -> Result<Self> {
        let call = remote_call(|client, query| async move { client.sql(&query).await });
        Self::activate(
            ctx,
            "sql",
            query.into(),
            Eligibility::QueryPresent,
            call,
            options,
        )
    }

    pub fn sql(&self) -> Option<Arc<SqlQuery>> {
        self.value()
    }
}
