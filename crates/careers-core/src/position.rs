use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reference::{slugify, ReferenceEntity, ReferenceKind};
use crate::{Lifecycle, ParseEnumError};

/// Publication state of a position. `Closed` and `Filled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    #[default]
    Draft,
    Open,
    Closed,
    Filled,
}

impl PositionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            PositionStatus::Draft => "draft",
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
            PositionStatus::Filled => "filled",
        }
    }

    pub fn can_transition_to(self, target: PositionStatus) -> bool {
        matches!(
            (self, target),
            (PositionStatus::Draft, PositionStatus::Open)
                | (PositionStatus::Open, PositionStatus::Closed)
                | (PositionStatus::Open, PositionStatus::Filled)
        )
    }
}

impl std::str::FromStr for PositionStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(PositionStatus::Draft),
            "open" => Ok(PositionStatus::Open),
            "closed" => Ok(PositionStatus::Closed),
            "filled" => Ok(PositionStatus::Filled),
            other => Err(ParseEnumError::new("position status", other)),
        }
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted job opening. Reference columns hold ids; joins live on [`PositionView`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub type_id: Option<Uuid>,
    pub level_id: Option<Uuid>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: String,
    pub remote_allowed: bool,
    pub status: PositionStatus,
    pub lifecycle: Lifecycle,
    pub is_featured: bool,
    pub is_urgent: bool,
    pub views_count: i64,
    pub applications_count: i64,
    pub application_deadline: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn from_draft(draft: PositionDraft, now: DateTime<Utc>) -> Self {
        let mut position = Self {
            id: Uuid::new_v4(),
            title: String::new(),
            slug: draft.resolved_slug(),
            summary: None,
            description: None,
            requirements: None,
            benefits: None,
            category_id: None,
            location_id: None,
            type_id: None,
            level_id: None,
            salary_min: None,
            salary_max: None,
            salary_currency: String::new(),
            remote_allowed: false,
            status: PositionStatus::Draft,
            lifecycle: Lifecycle::Active,
            is_featured: false,
            is_urgent: false,
            views_count: 0,
            applications_count: 0,
            application_deadline: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        };
        position.apply_draft(draft, now);
        position
    }

    /// Overwrites the editable fields. The slug only changes when the draft
    /// names one. Status, counters and timestamps other than `updated_at` are
    /// untouched.
    pub fn apply_draft(&mut self, draft: PositionDraft, now: DateTime<Utc>) {
        if let Some(slug) = draft.explicit_slug() {
            self.slug = slug;
        }
        self.title = draft.title.trim().to_string();
        self.summary = draft.summary;
        self.description = draft.description;
        self.requirements = draft.requirements;
        self.benefits = draft.benefits;
        self.category_id = draft.category_id;
        self.location_id = draft.location_id;
        self.type_id = draft.type_id;
        self.level_id = draft.level_id;
        self.salary_min = draft.salary_min;
        self.salary_max = draft.salary_max;
        self.salary_currency = draft
            .salary_currency
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "USD".to_string());
        self.remote_allowed = draft.remote_allowed;
        self.is_featured = draft.is_featured;
        self.is_urgent = draft.is_urgent;
        self.application_deadline = draft.application_deadline;
        self.updated_at = now;
    }

    /// Open and not retired: the only rows the public catalog may return.
    pub fn is_listed(&self) -> bool {
        self.status == PositionStatus::Open && self.lifecycle.is_active()
    }

    pub fn reference_id(&self, kind: ReferenceKind) -> Option<Uuid> {
        match kind {
            ReferenceKind::Category => self.category_id,
            ReferenceKind::Location => self.location_id,
            ReferenceKind::EmploymentType => self.type_id,
            ReferenceKind::Level => self.level_id,
            ReferenceKind::Skill => None,
        }
    }
}

/// Staff form for creating or editing a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PositionDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default)]
    pub benefits: Option<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub location_id: Option<Uuid>,
    #[serde(default)]
    pub type_id: Option<Uuid>,
    #[serde(default)]
    pub level_id: Option<Uuid>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub salary_currency: Option<String>,
    #[serde(default)]
    pub remote_allowed: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub application_deadline: Option<DateTime<Utc>>,
}

impl PositionDraft {
    pub fn resolved_slug(&self) -> String {
        self.explicit_slug().unwrap_or_else(|| slugify(&self.title))
    }

    /// The slug the staff member typed, normalised; `None` when left blank.
    pub fn explicit_slug(&self) -> Option<String> {
        self.slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .map(slugify)
    }

    /// Facet references in the draft, paired with the kind each must resolve to.
    pub fn references(&self) -> [(ReferenceKind, Option<Uuid>); 4] {
        [
            (ReferenceKind::Category, self.category_id),
            (ReferenceKind::Location, self.location_id),
            (ReferenceKind::EmploymentType, self.type_id),
            (ReferenceKind::Level, self.level_id),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementLevel {
    Required,
    Preferred,
    NiceToHave,
}

impl RequirementLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequirementLevel::Required => "required",
            RequirementLevel::Preferred => "preferred",
            RequirementLevel::NiceToHave => "nice_to_have",
        }
    }
}

impl std::str::FromStr for RequirementLevel {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "required" => Ok(RequirementLevel::Required),
            "preferred" => Ok(RequirementLevel::Preferred),
            "nice_to_have" => Ok(RequirementLevel::NiceToHave),
            other => Err(ParseEnumError::new("requirement level", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Proficiency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Proficiency::Beginner => "beginner",
            Proficiency::Intermediate => "intermediate",
            Proficiency::Advanced => "advanced",
            Proficiency::Expert => "expert",
        }
    }
}

impl std::str::FromStr for Proficiency {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Proficiency::Beginner),
            "intermediate" => Ok(Proficiency::Intermediate),
            "advanced" => Ok(Proficiency::Advanced),
            "expert" => Ok(Proficiency::Expert),
            other => Err(ParseEnumError::new("proficiency", other)),
        }
    }
}

/// Stored link between a position and a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSkillLink {
    pub skill_id: Uuid,
    pub requirement: RequirementLevel,
    #[serde(default)]
    pub proficiency: Option<Proficiency>,
}

/// Skill link resolved against the skill catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSkill {
    pub skill: ReferenceEntity,
    pub requirement: RequirementLevel,
    pub proficiency: Option<Proficiency>,
}

impl PositionSkill {
    /// Required skills first, then each requirement group in catalog order.
    pub fn display_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.requirement
            .cmp(&other.requirement)
            .then_with(|| self.skill.display_cmp(&other.skill))
    }
}

/// A position joined with its reference entries. `skills` is only populated
/// on detail lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub category: Option<ReferenceEntity>,
    pub location: Option<ReferenceEntity>,
    #[serde(rename = "type")]
    pub employment_type: Option<ReferenceEntity>,
    pub level: Option<ReferenceEntity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<PositionSkill>,
}

impl PositionView {
    pub fn bare(position: Position) -> Self {
        Self {
            position,
            category: None,
            location: None,
            employment_type: None,
            level: None,
            skills: Vec::new(),
        }
    }

    pub fn reference(&self, kind: ReferenceKind) -> Option<&ReferenceEntity> {
        match kind {
            ReferenceKind::Category => self.category.as_ref(),
            ReferenceKind::Location => self.location.as_ref(),
            ReferenceKind::EmploymentType => self.employment_type.as_ref(),
            ReferenceKind::Level => self.level.as_ref(),
            ReferenceKind::Skill => None,
        }
    }

    pub fn attach(&mut self, entity: ReferenceEntity) {
        match entity.kind {
            ReferenceKind::Category => self.category = Some(entity),
            ReferenceKind::Location => self.location = Some(entity),
            ReferenceKind::EmploymentType => self.employment_type = Some(entity),
            ReferenceKind::Level => self.level = Some(entity),
            ReferenceKind::Skill => {}
        }
    }
}
