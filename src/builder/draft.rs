//! The builder's mutable working copy and the minimal query derived from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Filter, Order, Query, SortDirection, TimeDimension};

/// Visualization hint carried alongside the draft.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Bar,
    Area,
    Pie,
    Table,
    Number,
}

impl ChartType {
    pub const ALL: [ChartType; 6] = [
        Self::Line,
        Self::Bar,
        Self::Area,
        Self::Pie,
        Self::Table,
        Self::Number,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Bar => "bar",
            Self::Area => "area",
            Self::Pie => "pie",
            Self::Table => "table",
            Self::Number => "number",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown chart type '{}'", s.trim()))
    }
}

/// Every query field as an independently mutable container, plus the chart type.
///
/// Absent collections are empty vectors here; [`QueryDraft::to_query`] turns
/// them back into absent fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryDraft {
    pub measures: Vec<String>,
    pub dimensions: Vec<String>,
    pub segments: Vec<String>,
    pub time_dimensions: Vec<TimeDimension>,
    pub filters: Vec<Filter>,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub timezone: Option<String>,
    pub renew_query: bool,
    pub chart_type: ChartType,
}

impl QueryDraft {
    pub fn from_query(query: &Query, chart_type: ChartType) -> Self {
        Self {
            measures: query.measures.clone().unwrap_or_default(),
            dimensions: query.dimensions.clone().unwrap_or_default(),
            segments: query.segments.clone().unwrap_or_default(),
            time_dimensions: query.time_dimensions.clone().unwrap_or_default(),
            filters: query.filters.clone().unwrap_or_default(),
            order: query.order.as_ref().map(Order::entries).unwrap_or_default(),
            limit: query.limit,
            offset: query.offset,
            timezone: query.timezone.clone(),
            renew_query: query.renew_query.unwrap_or(false),
            chart_type,
        }
    }

    /// Minimal query: empty collections, unset scalars and a false renew flag
    /// are left out entirely.
    pub fn to_query(&self) -> Query {
        Query {
            measures: non_empty(&self.measures),
            dimensions: non_empty(&self.dimensions),
            segments: non_empty(&self.segments),
            time_dimensions: non_empty(&self.time_dimensions),
            filters: non_empty(&self.filters),
            order: (!self.order.is_empty()).then(|| Order::Pairs(self.order.clone())),
            limit: self.limit,
            offset: self.offset,
            timezone: self.timezone.clone(),
            renew_query: self.renew_query.then_some(true),
        }
    }
}

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    (!items.is_empty()).then(|| items.to_vec())
}
