//! Core domain model for the careers catalog: positions, reference catalogs,
//! applications and their lifecycle graph.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod application;
pub mod intake;
pub mod position;
pub mod query;
pub mod reference;

pub use application::{
    available_actions, ActivityType, Application, ApplicationActivity, ApplicationDocument,
    ApplicationStatus, QuickAction, QuickActionKind, StatusChange, TransitionRejected,
};
pub use intake::{is_valid_email, ApplicationSubmission, ValidatedSubmission, ValidationError};
pub use position::{
    Position, PositionDraft, PositionSkill, PositionSkillLink, PositionStatus, PositionView,
    Proficiency, RequirementLevel,
};
pub use query::{
    total_pages, CategoryScope, FilterSpec, PageRequest, SearchResult, SortKey, Visibility,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
pub use reference::{slugify, ReferenceDraft, ReferenceEntity, ReferenceKind, ReferenceUsage};

pub const CRATE_NAME: &str = "careers-core";

/// Retirement state shared by every catalog entity that is soft-disabled
/// instead of deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Active,
    Retired,
}

impl Lifecycle {
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Retired => "retired",
        }
    }

    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }
}

impl std::str::FromStr for Lifecycle {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Lifecycle::Active),
            "retired" => Ok(Lifecycle::Retired),
            other => Err(ParseEnumError::new("lifecycle", other)),
        }
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored or submitted label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
