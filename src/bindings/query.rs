//! Query execution binding: `load(query, options)`.

use std::sync::Arc;

use super::{Binding, Eligibility, QueryInput, remote_call};
use crate::client::LoadOptions;
use crate::config::BindingOptions;
use crate::context::ClientContext;
use crate::error::Result;
use crate::model::ResultSet;

pub type QueryBinding = Binding<ResultSet>;

impl Binding<ResultSet> {
    pub fn new(
        ctx: &ClientContext,
        query: impl Into<QueryInput>,
        options: BindingOptions<ResultSet>,
    ) -> Result<Self> {
        Self::with_load_options(ctx, query, LoadOptions::new(), options)
    }

    /// Like [`Self::new`], forwarding `load_options` to every `load` call.
    pub fn with_load_options(
        ctx: &ClientContext,
        query: impl Into<QueryInput>,
        load_options: LoadOptions,
        options: BindingOptions<ResultSet>,
    ) -> Result<Self> {
        let load_options = Arc::new(load_options);
        let call = remote_call(move |client, query| {
            let load_options = Arc::clone(&load_options);
            async move { client.load(&query, &load_options).await }
        });
        Self::activate(
            ctx,
            "query",
            query.into(),
            Eligibility::QueryPresent,
            call,
            options,
        )
    }

    pub fn result_set(&self) -> Option<Arc<ResultSet>> {
        self.value()
    }
}
