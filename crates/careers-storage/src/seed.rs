//! YAML catalog fixtures and idempotent seeding into any [`CareerStore`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use careers_core::{
    Lifecycle, Position, PositionDraft, PositionSkillLink, PositionStatus, Proficiency,
    ReferenceDraft, ReferenceEntity, ReferenceKind, RequirementLevel,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::CareerStore;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFixture {
    pub version: u32,
    #[serde(default)]
    pub references: BTreeMap<ReferenceKind, Vec<ReferenceDraft>>,
    #[serde(default)]
    pub positions: Vec<PositionFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionFixture {
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
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "type")]
    pub employment_type: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub remote_allowed: bool,
    #[serde(default)]
    pub status: PositionStatus,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub application_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub skills: Vec<SkillFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillFixture {
    pub skill: String,
    pub requirement: RequirementLevel,
    #[serde(default)]
    pub proficiency: Option<Proficiency>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub references_inserted: usize,
    pub references_updated: usize,
    pub positions_inserted: usize,
    pub positions_updated: usize,
    pub skill_links: usize,
}

/// Deterministic id for a seeded row, so reseeding updates in place.
pub fn stable_id(namespace: &str, slug: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("careers:{namespace}:{slug}").as_bytes())
}

impl CatalogFixture {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing catalog fixture")
    }
}

pub async fn load_catalog_fixture(path: &Path) -> Result<CatalogFixture> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Upserts every reference and position in `fixture` by stable id.
pub async fn seed_catalog(
    store: &dyn CareerStore,
    fixture: &CatalogFixture,
) -> Result<SeedSummary> {
    let now = Utc::now();
    let mut summary = SeedSummary::default();
    let mut known: HashMap<(ReferenceKind, String), Uuid> = HashMap::new();

    for (kind, drafts) in &fixture.references {
        for draft in drafts {
            let slug = draft.resolved_slug();
            if slug.is_empty() {
                bail!("{kind} '{}' has an empty slug", draft.name);
            }
            let mut entity = ReferenceEntity::from_draft(*kind, draft.clone(), now);
            entity.id = stable_id(kind.as_str(), &slug);

            match store
                .get_reference(entity.id)
                .await
                .with_context(|| format!("looking up {kind} '{slug}'"))?
            {
                Some(existing) => {
                    entity.created_at = existing.created_at;
                    store
                        .update_reference(&entity)
                        .await
                        .with_context(|| format!("updating {kind} '{slug}'"))?;
                    summary.references_updated += 1;
                }
                None => {
                    store
                        .insert_reference(&entity)
                        .await
                        .with_context(|| format!("inserting {kind} '{slug}'"))?;
                    summary.references_inserted += 1;
                }
            }
            known.insert((*kind, slug), entity.id);
        }
    }

    let lookup = |kind: ReferenceKind, slug: &str, position: &str| -> Result<Uuid> {
        known
            .get(&(kind, slug.to_string()))
            .copied()
            .with_context(|| format!("position '{position}' references unknown {kind} '{slug}'"))
    };
    let resolve = |kind: ReferenceKind, slug: &Option<String>, position: &str| {
        slug.as_deref()
            .map(|slug| lookup(kind, slug, position))
            .transpose()
    };

    for fixture_position in &fixture.positions {
        let draft = PositionDraft {
            title: fixture_position.title.clone(),
            slug: fixture_position.slug.clone(),
            summary: fixture_position.summary.clone(),
            description: fixture_position.description.clone(),
            requirements: fixture_position.requirements.clone(),
            benefits: fixture_position.benefits.clone(),
            category_id: None,
            location_id: None,
            type_id: None,
            level_id: None,
            salary_min: fixture_position.salary_min,
            salary_max: fixture_position.salary_max,
            salary_currency: fixture_position.currency.clone(),
            remote_allowed: fixture_position.remote_allowed,
            is_featured: fixture_position.is_featured,
            is_urgent: fixture_position.is_urgent,
            application_deadline: fixture_position.application_deadline,
        };
        let slug = draft.resolved_slug();
        let draft = PositionDraft {
            category_id: resolve(ReferenceKind::Category, &fixture_position.category, &slug)?,
            location_id: resolve(ReferenceKind::Location, &fixture_position.location, &slug)?,
            type_id: resolve(
                ReferenceKind::EmploymentType,
                &fixture_position.employment_type,
                &slug,
            )?,
            level_id: resolve(ReferenceKind::Level, &fixture_position.level, &slug)?,
            ..draft
        };

        let created_at = fixture_position.created_at.unwrap_or(now);
        let mut position = Position::from_draft(draft, created_at);
        position.id = stable_id("position", &slug);
        position.status = fixture_position.status;
        position.lifecycle = fixture_position.lifecycle;
        position.published_at = fixture_position.published_at.or(
            (fixture_position.status != PositionStatus::Draft).then_some(created_at),
        );

        match store
            .get_position(position.id)
            .await
            .with_context(|| format!("looking up position '{slug}'"))?
        {
            Some(_) => {
                store
                    .update_position(&position)
                    .await
                    .with_context(|| format!("updating position '{slug}'"))?;
                summary.positions_updated += 1;
            }
            None => {
                store
                    .insert_position(&position)
                    .await
                    .with_context(|| format!("inserting position '{slug}'"))?;
                summary.positions_inserted += 1;
            }
        }
        store
            .set_views_count(position.id, fixture_position.views_count)
            .await
            .with_context(|| format!("setting views for '{slug}'"))?;

        let links = fixture_position
            .skills
            .iter()
            .map(|skill| {
                lookup(ReferenceKind::Skill, &skill.skill, &slug).map(|skill_id| PositionSkillLink {
                    skill_id,
                    requirement: skill.requirement,
                    proficiency: skill.proficiency,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        store
            .replace_position_skills(position.id, &links)
            .await
            .with_context(|| format!("linking skills for '{slug}'"))?;
        summary.skill_links += links.len();
    }

    info!(
        references_inserted = summary.references_inserted,
        references_updated = summary.references_updated,
        positions_inserted = summary.positions_inserted,
        positions_updated = summary.positions_updated,
        skill_links = summary.skill_links,
        "catalog seeded"
    );
    Ok(summary)
}
