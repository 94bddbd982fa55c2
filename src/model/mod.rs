//! Value types exchanged with the remote analytics client.
//!
//! - [`query`]: the query object and its presence predicate
//! - [`meta`]: schema metadata and the flattened member projections
//! - [`results`]: opaque load / sql / dry-run artifacts

pub mod meta;
pub mod query;
pub mod results;

pub use meta::{AvailableMember, CubeMeta, MemberKind, MemberMeta, Metadata};
pub use query::{
    DateRange, Filter, MemberFilter, Order, Query, SortDirection, TimeDimension,
    is_query_present, is_value_present,
};
pub use results::{DryRunResponse, ResultSet, SqlQuery};
