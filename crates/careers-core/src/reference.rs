//! Reference catalogs classifying positions (category, location, type, level, skill).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Lifecycle, ParseEnumError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReferenceKind {
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "location")]
    Location,
    #[serde(rename = "type")]
    EmploymentType,
    #[serde(rename = "level")]
    Level,
    #[serde(rename = "skill")]
    Skill,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 5] = [
        ReferenceKind::Category,
        ReferenceKind::Location,
        ReferenceKind::EmploymentType,
        ReferenceKind::Level,
        ReferenceKind::Skill,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ReferenceKind::Category => "category",
            ReferenceKind::Location => "location",
            ReferenceKind::EmploymentType => "type",
            ReferenceKind::Level => "level",
            ReferenceKind::Skill => "skill",
        }
    }

    /// Column on `positions` holding this facet, if the kind is a facet.
    /// Skills hang off the position through link rows instead.
    pub const fn position_column(self) -> Option<&'static str> {
        match self {
            ReferenceKind::Category => Some("category_id"),
            ReferenceKind::Location => Some("location_id"),
            ReferenceKind::EmploymentType => Some("type_id"),
            ReferenceKind::Level => Some("level_id"),
            ReferenceKind::Skill => None,
        }
    }
}

impl std::str::FromStr for ReferenceKind {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "category" | "categories" => Ok(ReferenceKind::Category),
            "location" | "locations" => Ok(ReferenceKind::Location),
            "type" | "types" | "employment_type" => Ok(ReferenceKind::EmploymentType),
            "level" | "levels" => Ok(ReferenceKind::Level),
            "skill" | "skills" => Ok(ReferenceKind::Skill),
            other => Err(ParseEnumError::new("reference kind", other)),
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    pub id: Uuid,
    pub kind: ReferenceKind,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceEntity {
    pub fn from_draft(kind: ReferenceKind, draft: ReferenceDraft, now: DateTime<Utc>) -> Self {
        let slug = draft.resolved_slug();
        Self {
            id: Uuid::new_v4(),
            kind,
            name: draft.name.trim().to_string(),
            slug,
            description: draft.description,
            sort_order: draft.sort_order,
            lifecycle: draft.lifecycle.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Display ordering: `sort_order`, then name, then id.
    pub fn display_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Staff-submitted form for creating or editing a reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceDraft {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    /// Left out on edits, the entry keeps its current lifecycle.
    #[serde(default)]
    pub lifecycle: Option<Lifecycle>,
}

impl ReferenceDraft {
    pub fn resolved_slug(&self) -> String {
        self.explicit_slug().unwrap_or_else(|| slugify(&self.name))
    }

    pub fn explicit_slug(&self) -> Option<String> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .map(slugify)
    }
}

/// Reference entry paired with the number of positions still pointing at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceUsage {
    #[serde(flatten)]
    pub entity: ReferenceEntity,
    pub positions_count: u64,
}

/// Lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(input: &str) -> String {
    input
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
