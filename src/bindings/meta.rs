//! Metadata binding: `meta()`, always eligible.

use std::sync::Arc;

use super::{Binding, Eligibility, QueryInput, remote_call};
use crate::config::BindingOptions;
use crate::context::ClientContext;
use crate::error::Result;
use crate::model::{Metadata, Query};

pub type MetaBinding = Binding<Metadata>;

impl Binding<Metadata> {
    pub fn new(ctx: &ClientContext, options: BindingOptions<Metadata>) -> Result<Self> {
        let call = remote_call(|client, _query| async move { client.meta().await });
        Self::activate(
            ctx,
            "meta",
            QueryInput::Static(Query::default()),
            Eligibility::Always,
            call,
            options,
        )
    }

    pub fn meta(&self) -> Option<Arc<Metadata>> {
        self.value()
    }
}
