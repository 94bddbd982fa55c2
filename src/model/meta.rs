//! Schema metadata returned by the `meta` call.
//!
//! Metadata is read-only once fetched. A refetch replaces it wholesale.

use serde::{Deserialize, Serialize};

/// Kind of a schema member.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Measure,
    Dimension,
    TimeDimension,
    Segment,
}

/// A member descriptor as delivered by the remote service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMeta {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub short_title: Option<String>,
    #[serde(default, rename = "type")]
    pub member_type: Option<String>,
    /// Current visibility flag.
    #[serde(default)]
    pub public: Option<bool>,
    /// Legacy visibility flag, consulted only when `public` is absent.
    #[serde(default)]
    pub is_visible: Option<bool>,
}

impl MemberMeta {
    pub fn is_time(&self) -> bool {
        self.member_type.as_deref() == Some("time")
    }

    /// `public` wins over the legacy `isVisible`; visible when neither is set.
    pub fn visible(&self) -> bool {
        self.public.or(self.is_visible).unwrap_or(true)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeMeta {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub measures: Vec<MemberMeta>,
    #[serde(default)]
    pub dimensions: Vec<MemberMeta>,
    #[serde(default)]
    pub segments: Vec<MemberMeta>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub cubes: Vec<CubeMeta>,
}

/// Flattened projection of a member, as offered to query builders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableMember {
    pub name: String,
    pub title: Option<String>,
    pub short_title: Option<String>,
    #[serde(rename = "type")]
    pub member_type: Option<String>,
    pub is_visible: bool,
}

impl From<&MemberMeta> for AvailableMember {
    fn from(member: &MemberMeta) -> Self {
        Self {
            name: member.name.clone(),
            title: member.title.clone(),
            short_title: member.short_title.clone(),
            member_type: member.member_type.clone(),
            is_visible: member.visible(),
        }
    }
}

impl Metadata {
    pub fn measures(&self) -> Vec<AvailableMember> {
        self.project(|cube| cube.measures.iter().collect())
    }

    /// Dimensions excluding time dimensions.
    pub fn dimensions(&self) -> Vec<AvailableMember> {
        self.project(|cube| cube.dimensions.iter().filter(|d| !d.is_time()).collect())
    }

    pub fn time_dimensions(&self) -> Vec<AvailableMember> {
        self.project(|cube| cube.dimensions.iter().filter(|d| d.is_time()).collect())
    }

    pub fn segments(&self) -> Vec<AvailableMember> {
        self.project(|cube| cube.segments.iter().collect())
    }

    fn project<'a>(
        &'a self,
        pick: impl Fn(&'a CubeMeta) -> Vec<&'a MemberMeta>,
    ) -> Vec<AvailableMember> {
        self.cubes
            .iter()
            .flat_map(pick)
            .map(AvailableMember::from)
            .collect()
    }

    /// Find a member of any kind by its fully qualified name.
    pub fn resolve_member(&self, name: &str) -> Option<(MemberKind, &MemberMeta)> {
        self.cubes.iter().find_map(|cube| {
            if let Some(m) = cube.measures.iter().find(|m| m.name == name) {
                return Some((MemberKind::Measure, m));
            }
            if let Some(d) = cube.dimensions.iter().find(|d| d.name == name) {
                let kind = if d.is_time() {
                    MemberKind::TimeDimension
                } else {
                    MemberKind::Dimension
                };
                return Some((kind, d));
            }
            cube.segments
                .iter()
                .find(|s| s.name == name)
                .map(|s| (MemberKind::Segment, s))
        })
    }
}
