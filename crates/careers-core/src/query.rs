//! Filter, sort and pagination values for the position catalog.
//!
//! Every store composes its position query from one [`FilterSpec`]; the
//! accessors here are the only place request values are trimmed and
//! interpreted, so public and staff listings filter identically.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::position::{Position, PositionStatus, PositionView};
use crate::reference::ReferenceKind;
use crate::ParseEnumError;

pub const DEFAULT_PAGE_LIMIT: u32 = 12;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Which rows a query may see at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Visibility {
    /// Public catalog: open and active only.
    #[default]
    Listed,
    /// Staff listing: every lifecycle, optionally narrowed to one status.
    Staff { status: Option<PositionStatus> },
}

impl Visibility {
    pub fn admits(&self, position: &Position) -> bool {
        match self {
            Visibility::Listed => position.is_listed(),
            Visibility::Staff { status } => status.map_or(true, |s| position.status == s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "type")]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub remote: Option<bool>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl FilterSpec {
    pub fn listed() -> Self {
        Self::default()
    }

    pub fn staff(status: Option<PositionStatus>) -> Self {
        Self {
            visibility: Visibility::Staff { status },
            ..Self::default()
        }
    }

    /// Facet slug predicates that are actually set, lowercased.
    pub fn facet_slugs(&self) -> Vec<(ReferenceKind, String)> {
        [
            (ReferenceKind::Category, &self.category),
            (ReferenceKind::Location, &self.location),
            (ReferenceKind::EmploymentType, &self.employment_type),
            (ReferenceKind::Level, &self.level),
        ]
        .into_iter()
        .filter_map(|(kind, slug)| non_blank(slug.as_deref()).map(|s| (kind, s.to_lowercase())))
        .collect()
    }

    /// Lowercased free-text needle; blank input means no search predicate.
    pub fn search_term(&self) -> Option<String> {
        non_blank(self.search.as_deref()).map(str::to_lowercase)
    }

    /// In-process evaluation of the same predicates a SQL store pushes down.
    pub fn matches(&self, view: &PositionView) -> bool {
        let position = &view.position;
        if !self.visibility.admits(position) {
            return false;
        }

        for (kind, slug) in self.facet_slugs() {
            match view.reference(kind) {
                Some(entity) if entity.slug.to_lowercase() == slug => {}
                _ => return false,
            }
        }

        if let Some(remote) = self.remote {
            if position.remote_allowed != remote {
                return false;
            }
        }
        if let Some(min) = self.salary_min {
            if !position.salary_min.is_some_and(|v| v >= min) {
                return false;
            }
        }
        if let Some(max) = self.salary_max {
            if !position.salary_max.is_some_and(|v| v <= max) {
                return false;
            }
        }

        if let Some(needle) = self.search_term() {
            let haystacks = [
                Some(position.title.as_str()),
                position.description.as_deref(),
                position.summary.as_deref(),
            ];
            if !haystacks
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    Title,
    SalaryHigh,
    SalaryLow,
    Deadline,
}

impl SortKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Oldest => "oldest",
            SortKey::Title => "title",
            SortKey::SalaryHigh => "salary_high",
            SortKey::SalaryLow => "salary_low",
            SortKey::Deadline => "deadline",
        }
    }

    /// Unknown or blank sort labels fall back to `newest`.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// ORDER BY clause over the `p` alias. Nulls sort last; `id` breaks ties.
    pub const fn order_by_sql(self) -> &'static str {
        match self {
            SortKey::Newest => "p.created_at DESC, p.id ASC",
            SortKey::Oldest => "p.created_at ASC, p.id ASC",
            SortKey::Title => "p.title COLLATE \"C\" ASC, p.id ASC",
            SortKey::SalaryHigh => "p.salary_max DESC NULLS LAST, p.id ASC",
            SortKey::SalaryLow => "p.salary_min ASC NULLS LAST, p.id ASC",
            SortKey::Deadline => "p.application_deadline ASC NULLS LAST, p.id ASC",
        }
    }

    /// Ordering equivalent to [`SortKey::order_by_sql`].
    pub fn compare(self, a: &Position, b: &Position) -> Ordering {
        let primary = match self {
            SortKey::Newest => b.created_at.cmp(&a.created_at),
            SortKey::Oldest => a.created_at.cmp(&b.created_at),
            SortKey::Title => a.title.as_bytes().cmp(b.title.as_bytes()),
            SortKey::SalaryHigh => nulls_last(a.salary_max, b.salary_max, true),
            SortKey::SalaryLow => nulls_last(a.salary_min, b.salary_min, false),
            SortKey::Deadline => nulls_last(a.application_deadline, b.application_deadline, false),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl std::str::FromStr for SortKey {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "title" => Ok(SortKey::Title),
            "salary_high" => Ok(SortKey::SalaryHigh),
            "salary_low" => Ok(SortKey::SalaryLow),
            "deadline" => Ok(SortKey::Deadline),
            other => Err(ParseEnumError::new("sort key", other)),
        }
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// 1-based page request with a bounded page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Page below 1 becomes 1; limit is clamped to `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

pub fn total_pages(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub positions: Vec<PositionView>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
    pub limit: u32,
}

impl SearchResult {
    pub fn new(positions: Vec<PositionView>, total: u64, page: PageRequest) -> Self {
        Self {
            positions,
            total,
            total_pages: total_pages(total, page.limit),
            page: page.page,
            limit: page.limit,
        }
    }

    pub fn empty(page: PageRequest) -> Self {
        Self::new(Vec::new(), 0, page)
    }
}

/// Category restriction used by the related-position lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryScope {
    Any,
    Within(Uuid),
    /// Every other category, uncategorised positions included.
    Outside(Uuid),
}

impl CategoryScope {
    pub fn admits(&self, position: &Position) -> bool {
        match self {
            CategoryScope::Any => true,
            CategoryScope::Within(id) => position.category_id == Some(*id),
            CategoryScope::Outside(id) => position.category_id != Some(*id),
        }
    }
}
