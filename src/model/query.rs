//! Query value objects and the presence predicate.
//!
//! Every field of [`Query`] is optional so an absent field stays distinguishable
//! from an empty one. Serialization skips `None` fields, which keeps derived
//! queries minimal on the wire and under equality checks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction for a single order entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Ordering, accepted in either of the two upstream shapes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Order {
    /// `[["Orders.count", "desc"], ...]`
    Pairs(Vec<(String, SortDirection)>),
    /// `{"Orders.count": "desc", ...}`
    Map(BTreeMap<String, SortDirection>),
}

impl Order {
    /// Order entries as `(member, direction)` pairs, whichever shape was used.
    pub fn entries(&self) -> Vec<(String, SortDirection)> {
        match self {
            Self::Pairs(pairs) => pairs.clone(),
            Self::Map(map) => map.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }
}

/// Date range of a time dimension: a relative expression or an explicit pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateRange {
    /// e.g. `"last 7 days"`
    Relative(String),
    /// `[from, to]`
    Absolute([String; 2]),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDimension {
    pub dimension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl TimeDimension {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            granularity: None,
            date_range: None,
        }
    }

    pub fn with_granularity(mut self, granularity: impl Into<String>) -> Self {
        self.granularity = Some(granularity.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }
}

/// A filter on a single member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFilter {
    #[serde(alias = "dimension")]
    pub member: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

/// A query filter: member filters, optionally grouped with `and` / `or`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    And { and: Vec<Filter> },
    Or { or: Vec<Filter> },
    Member(MemberFilter),
}

impl Filter {
    pub fn member(
        member: impl Into<String>,
        operator: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self::Member(MemberFilter {
            member: member.into(),
            operator: operator.into(),
            values: if values.is_empty() { None } else { Some(values) },
        })
    }

    /// Every member referenced by this filter, including nested groups.
    pub fn members(&self) -> Vec<&str> {
        match self {
            Self::Member(f) => vec![f.member.as_str()],
            Self::And { and: inner } | Self::Or { or: inner } => {
                inner.iter().flat_map(Filter::members).collect()
            }
        }
    }
}

/// An analytics query. Immutable by convention; builders produce new values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measures: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_dimensions: Option<Vec<TimeDimension>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Filter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew_query: Option<bool>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measures(mut self, measures: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.measures = Some(measures.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_dimensions(
        mut self,
        dimensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.dimensions = Some(dimensions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_segments(mut self, segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.segments = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_time_dimensions(mut self, time_dimensions: Vec<TimeDimension>) -> Self {
        self.time_dimensions = Some(time_dimensions);
        self
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True iff the query carries enough content to be worth sending:
    /// at least one measure, dimension or time dimension.
    pub fn is_present(&self) -> bool {
        non_empty(self.measures.as_deref())
            || non_empty(self.dimensions.as_deref())
            || non_empty(self.time_dimensions.as_deref())
    }

    /// Every member the query references, in field order, without duplicates.
    pub fn members(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !out.iter().any(|m| m == name) {
                out.push(name.to_string());
            }
        };
        for name in self.measures.iter().flatten() {
            push(name);
        }
        for name in self.dimensions.iter().flatten() {
            push(name);
        }
        for name in self.segments.iter().flatten() {
            push(name);
        }
        for td in self.time_dimensions.iter().flatten() {
            push(&td.dimension);
        }
        for filter in self.filters.iter().flatten() {
            for name in filter.members() {
                push(name);
            }
        }
        out
    }
}

fn non_empty<T>(field: Option<&[T]>) -> bool {
    field.is_some_and(|items| !items.is_empty())
}

/// Presence predicate over an optional query; `None` is never present.
pub fn is_query_present(query: Option<&Query>) -> bool {
    query.is_some_and(Query::is_present)
}

/// Presence predicate over raw JSON.
///
/// A field only counts when it is an array with at least one element. Any other
/// shape (string, object, number, null) is treated as absent; never panics.
pub fn is_value_present(query: &Value) -> bool {
    let Some(obj) = query.as_object() else {
        return false;
    };
    ["measures", "dimensions", "timeDimensions"]
        .iter()
        .any(|key| obj.get(*key).and_then(Value::as_array).is_some_and(|a| !a.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn presence_requires_a_non_empty_core_field() {
        assert!(!Query::default().is_present());
        assert!(!Query::new().with_measures(Vec::<String>::new()).is_present());
        assert!(!is_query_present(None));
        assert!(Query::new().with_measures(["Orders.count"]).is_present());
        assert!(Query::new().with_dimensions(["Orders.status"]).is_present());
        assert!(
            Query::new()
                .with_time_dimensions(vec![TimeDimension::new("Orders.createdAt")])
                .is_present()
        );
    }

    #[test]
    fn segments_and_filters_alone_are_not_present() {
        let q = Query::new()
            .with_segments(["Orders.completed"])
            .with_filters(vec![Filter::member("Orders.status", "equals", ["done"])]);
        assert!(!q.is_present());
    }

    #[test]
    fn raw_presence_ignores_wrong_shapes() {
        assert!(!is_value_present(&json!({})));
        assert!(!is_value_present(&json!(null)));
        assert!(!is_value_present(&json!("Orders.count")));
        assert!(!is_value_present(&json!({"measures": []})));
        assert!(!is_value_present(&json!({"measures": "Orders.count"})));
        assert!(!is_value_present(&json!({"dimensions": {"a": 1}})));
        assert!(!is_value_present(&json!({"segments": ["Orders.completed"]})));
        assert!(is_value_present(&json!({"measures": ["Orders.count"]})));
        assert!(is_value_present(
            &json!({"measures": 3, "timeDimensions": [{"dimension": "Orders.createdAt"}]})
        ));
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let q = Query::new()
            .with_measures(["Orders.count"])
            .with_dimensions(["Orders.status"]);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"measures": ["Orders.count"], "dimensions": ["Orders.status"]})
        );
    }

    #[test]
    fn deserializes_upstream_shapes() {
        let q: Query = serde_json::from_value(json!({
            "measures": ["Orders.count"],
            "timeDimensions": [{
                "dimension": "Orders.createdAt",
                "granularity": "day",
                "dateRange": ["2024-01-01", "2024-01-31"]
            }],
            "filters": [
                {"member": "Orders.status", "operator": "equals", "values": ["done"]},
                {"or": [
                    {"dimension": "Orders.city", "operator": "set"},
                    {"member": "Orders.amount", "operator": "gt", "values": ["10"]}
                ]}
            ],
            "order": {"Orders.count": "desc"},
            "renewQuery": true
        }))
        .unwrap();

        let td = &q.time_dimensions.as_ref().unwrap()[0];
        assert_eq!(td.granularity.as_deref(), Some("day"));
        assert_eq!(
            td.date_range,
            Some(DateRange::Absolute([
                "2024-01-01".to_string(),
                "2024-01-31".to_string()
            ]))
        );
        assert_eq!(q.filters.as_ref().unwrap().len(), 2);
        assert!(matches!(q.filters.as_ref().unwrap()[1], Filter::Or { .. }));
        assert_eq!(
            q.order.as_ref().unwrap().entries(),
            vec![("Orders.count".to_string(), SortDirection::Desc)]
        );
        assert_eq!(q.renew_query, Some(true));
    }

    #[test]
    fn pair_order_keeps_sequence() {
        let order: Order =
            serde_json::from_value(json!([["b", "asc"], ["a", "desc"]])).unwrap();
        assert_eq!(
            order.entries(),
            vec![
                ("b".to_string(), SortDirection::Asc),
                ("a".to_string(), SortDirection::Desc)
            ]
        );
    }

    #[test]
    fn members_walks_every_field_once() {
        let q = Query::new()
            .with_measures(["Orders.count"])
            .with_dimensions(["Orders.status"])
            .with_time_dimensions(vec![TimeDimension::new("Orders.createdAt")])
            .with_filters(vec![Filter::And {
                and: vec![
                    Filter::member("Orders.status", "equals", ["done"]),
                    Filter::member("Users.city", "set", Vec::<String>::new()),
                ],
            }]);
        assert_eq!(
            q.members(),
            vec!["Orders.count", "Orders.status", "Orders.createdAt", "Users.city"]
        );
    }

    fn arbitrary_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-zA-Z.]{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map(
                    prop_oneof![
                        Just("measures".to_string()),
                        Just("dimensions".to_string()),
                        Just("timeDimensions".to_string()),
                        "[a-z]{1,6}",
                    ],
                    inner,
                    0..4
                )
                .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn raw_presence_matches_definition(value in arbitrary_json()) {
            let expected = value.as_object().is_some_and(|obj| {
                ["measures", "dimensions", "timeDimensions"].iter().any(|k| {
                    matches!(obj.get(*k), Some(Value::Array(items)) if !items.is_empty())
                })
            });
            prop_assert_eq!(is_value_present(&value), expected);
        }
    }
}
