//! Stateful query builder.
//!
//! A [`QueryBuilder`] owns a [`QueryDraft`] and a [`MetaBinding`]. The draft is
//! mutated only through the named operations below, all synchronous; the
//! derived query and the available-member lists are recomputed on every call
//! and never stored.
//!
//! Collection semantics:
//!
//! | field            | add                      | remove by     | update by     |
//! |------------------|--------------------------|---------------|---------------|
//! | measures         | set (no duplicates)      | value         | value         |
//! | dimensions       | set                      | value         | value         |
//! | segments         | set                      | value         | value         |
//! | time dimensions  | keyed by dimension       | dimension     | dimension     |
//! | filters          | append                   | index         | index         |
//! | order            | keyed by member (update) | member        | member        |

pub mod draft;

pub use draft::{ChartType, QueryDraft};

use std::sync::Arc;

use crate::bindings::MetaBinding;
use crate::cell::AsyncState;
use crate::config::BindingOptions;
use crate::context::ClientContext;
use crate::error::Result;
use crate::model::{
    AvailableMember, DateRange, Filter, Metadata, Order, Query, SortDirection, TimeDimension,
};

/// Construction options for [`QueryBuilder`].
#[derive(Debug, Default)]
pub struct BuilderOptions {
    /// Seed query; `reset` returns here.
    pub initial_query: Option<Query>,
    pub chart_type: ChartType,
    /// Options for the owned metadata binding (client, ssr, initial meta, environment).
    pub meta: BindingOptions<Metadata>,
}

impl BuilderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_query(mut self, query: Query) -> Self {
        self.initial_query = Some(query);
        self
    }

    pub fn with_chart_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = chart_type;
        self
    }

    pub fn with_meta(mut self, meta: BindingOptions<Metadata>) -> Self {
        self.meta = meta;
        self
    }
}

pub struct QueryBuilder {
    meta: MetaBinding,
    draft: QueryDraft,
    seed: QueryDraft,
}

impl QueryBuilder {
    /// Seed the draft and start fetching metadata (subject to the usual gates).
    pub fn new(ctx: &ClientContext, options: BuilderOptions) -> Result<Self> {
        let BuilderOptions {
            initial_query,
            chart_type,
            meta,
        } = options;
        let meta = MetaBinding::new(ctx, meta)?;
        let seed = QueryDraft::from_query(&initial_query.unwrap_or_default(), chart_type);
        Ok(Self {
            meta,
            draft: seed.clone(),
            seed,
        })
    }

    pub fn draft(&self) -> &QueryDraft {
        &self.draft
    }

    /// The minimal query derived from the current draft.
    pub fn query(&self) -> Query {
        self.draft.to_query()
    }

    pub fn is_query_present(&self) -> bool {
        self.query().is_present()
    }

    /// Restore the construction-time draft, chart type included.
    pub fn reset(&mut self) {
        self.draft = self.seed.clone();
    }

    // Measures, dimensions, segments.

    pub fn measures(&self) -> &[String] {
        &self.draft.measures
    }

    pub fn add_measure(&mut self, name: impl Into<String>) {
        add_unique(&mut self.draft.measures, name.into());
    }

    pub fn remove_measure(&mut self, name: &str) {
        self.draft.measures.retain(|m| m != name);
    }

    pub fn update_measure(&mut self, old: &str, new: impl Into<String>) {
        replace_value(&mut self.draft.measures, old, new.into());
    }

    pub fn set_measures(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        self.draft.measures = names.into_iter().map(Into::into).collect();
    }

    pub fn dimensions(&self) -> &[String] {
        &self.draft.dimensions
    }

    pub fn add_dimension(&mut self, name: impl Into<String>) {
        add_unique(&mut self.draft.dimensions, name.into());
    }

    pub fn remove_dimension(&mut self, name: &str) {
        self.draft.dimensions.retain(|d| d != name);
    }

    pub fn update_dimension(&mut self, old: &str, new: impl Into<String>) {
        replace_value(&mut self.draft.dimensions, old, new.into());
    }

    pub fn set_dimensions(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        self.draft.dimensions = names.into_iter().map(Into::into).collect();
    }

    pub fn segments(&self) -> &[String] {
        &self.draft.segments
    }

    pub fn add_segment(&mut self, name: impl Into<String>) {
        add_unique(&mut self.draft.segments, name.into());
    }

    pub fn remove_segment(&mut self, name: &str) {
        self.draft.segments.retain(|s| s != name);
    }

    pub fn update_segment(&mut self, old: &str, new: impl Into<String>) {
        replace_value(&mut self.draft.segments, old, new.into());
    }

    pub fn set_segments(&mut self, names: impl IntoIterator<Item = impl Into<String>>) {
        self.draft.segments = names.into_iter().map(Into::into).collect();
    }

    // Time dimensions, keyed by `dimension`.

    pub fn time_dimensions(&self) -> &[TimeDimension] {
        &self.draft.time_dimensions
    }

    /// No-op when a time dimension for the same member already exists.
    pub fn add_time_dimension(&mut self, td: TimeDimension) {
        if self.find_time_dimension(&td.dimension).is_none() {
            self.draft.time_dimensions.push(td);
        }
    }

    pub fn remove_time_dimension(&mut self, dimension: &str) {
        self.draft.time_dimensions.retain(|td| td.dimension != dimension);
    }

    pub fn update_time_dimension(&mut self, dimension: &str, td: TimeDimension) {
        if let Some(slot) = self.find_time_dimension(dimension) {
            *slot = td;
        }
    }

    pub fn update_time_dimension_granularity(
        &mut self,
        dimension: &str,
        granularity: Option<String>,
    ) {
        if let Some(slot) = self.find_time_dimension(dimension) {
            slot.granularity = granularity;
        }
    }

    pub fn update_time_dimension_date_range(&mut self, dimension: &str, range: Option<DateRange>) {
        if let Some(slot) = self.find_time_dimension(dimension) {
            slot.date_range = range;
        }
    }

    pub fn set_time_dimensions(&mut self, tds: Vec<TimeDimension>) {
        self.draft.time_dimensions = tds;
    }

    fn find_time_dimension(&mut self, dimension: &str) -> Option<&mut TimeDimension> {
        self.draft
            .time_dimensions
            .iter_mut()
            .find(|td| td.dimension == dimension)
    }

    // Filters, by index.

    pub fn filters(&self) -> &[Filter] {
        &self.draft.filters
    }

    pub fn add_filter(&mut self, filter: Filter) {
        self.draft.filters.push(filter);
    }

    /// Out-of-range indices are ignored.
    pub fn remove_filter(&mut self, index: usize) {
        if index < self.draft.filters.len() {
            self.draft.filters.remove(index);
        }
    }

    pub fn update_filter(&mut self, index: usize, filter: Filter) {
        if let Some(slot) = self.draft.filters.get_mut(index) {
            *slot = filter;
        }
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.draft.filters = filters;
    }

    // Order, keyed by member.

    pub fn order(&self) -> &[(String, SortDirection)] {
        &self.draft.order
    }

    pub fn set_order(&mut self, order: Order) {
        self.draft.order = order.entries();
    }

    /// Replace the direction for `member` in place, or append it.
    pub fn update_order(&mut self, member: impl Into<String>, direction: SortDirection) {
        let member = member.into();
        match self.draft.order.iter_mut().find(|(m, _)| *m == member) {
            Some((_, dir)) => *dir = direction,
            None => self.draft.order.push((member, direction)),
        }
    }

    pub fn remove_order(&mut self, member: &str) {
        self.draft.order.retain(|(m, _)| m != member);
    }

    // Scalars.

    pub fn chart_type(&self) -> ChartType {
        self.draft.chart_type
    }

    pub fn set_chart_type(&mut self, chart_type: ChartType) {
        self.draft.chart_type = chart_type;
    }

    pub fn limit(&self) -> Option<u64> {
        self.draft.limit
    }

    pub fn set_limit(&mut self, limit: Option<u64>) {
        self.draft.limit = limit;
    }

    pub fn offset(&self) -> Option<u64> {
        self.draft.offset
    }

    pub fn set_offset(&mut self, offset: Option<u64>) {
        self.draft.offset = offset;
    }

    pub fn timezone(&self) -> Option<&str> {
        self.draft.timezone.as_deref()
    }

    pub fn set_timezone(&mut self, timezone: Option<String>) {
        self.draft.timezone = timezone;
    }

    pub fn renew_query(&self) -> bool {
        self.draft.renew_query
    }

    pub fn set_renew_query(&mut self, renew: bool) {
        self.draft.renew_query = renew;
    }

    // Metadata.

    pub fn meta(&self) -> &MetaBinding {
        &self.meta
    }

    pub fn meta_state(&self) -> AsyncState<Metadata> {
        self.meta.state()
    }

    pub async fn refetch_meta(&self) {
        self.meta.refetch().await;
    }

    pub fn available_measures(&self) -> Vec<AvailableMember> {
        self.with_meta(Metadata::measures)
    }

    /// Non-time dimensions.
    pub fn available_dimensions(&self) -> Vec<AvailableMember> {
        self.with_meta(Metadata::dimensions)
    }

    pub fn available_time_dimensions(&self) -> Vec<AvailableMember> {
        self.with_meta(Metadata::time_dimensions)
    }

    pub fn available_segments(&self) -> Vec<AvailableMember> {
        self.with_meta(Metadata::segments)
    }

    /// Draft members the loaded metadata does not know. Empty until metadata loads.
    pub fn missing_members(&self) -> Vec<String> {
        let Some(meta) = self.meta.value() else {
            return Vec::new();
        };
        self.query()
            .members()
            .into_iter()
            .filter(|name| meta.resolve_member(name).is_none())
            .collect()
    }

    fn with_meta(
        &self,
        project: impl FnOnce(&Metadata) -> Vec<AvailableMember>,
    ) -> Vec<AvailableMember> {
        self.meta
            .value()
            .map(|meta: Arc<Metadata>| project(meta.as_ref()))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("draft", &self.draft)
            .field("meta", &self.meta)
            .finish()
    }
}

fn add_unique(items: &mut Vec<String>, value: String) {
    if !items.contains(&value) {
        items.push(value);
    }
}

/// Replace `old` in place. When `new` is already listed, `old` is dropped instead.
fn replace_value(items: &mut Vec<String>, old: &str, new: String) {
    let Some(pos) = items.iter().position(|v| v == old) else {
        return;
    };
    if old != new && items.contains(&new) {
        items.remove(pos);
    } else {
        items[pos] = new;
    }
}
