use std::collections::HashSet;

use careers_core::{
    Lifecycle, Position, PositionDraft, PositionSkillLink, PositionStatus, ReferenceKind,
    Visibility,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::reference::slug_conflict;
use crate::{CareerService, ServiceError};

impl CareerService {
    pub async fn get_position(&self, id: Uuid) -> Result<Position, ServiceError> {
        self.store
            .get_position(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "position",
                key: id.to_string(),
            })
    }

    /// New positions always start as drafts.
    pub async fn create_position(&self, draft: PositionDraft) -> Result<Position, ServiceError> {
        self.check_position_draft(&draft).await?;
        let position = Position::from_draft(draft, Utc::now());
        self.ensure_position_slug_free(&position).await?;
        self.store
            .insert_position(&position)
            .await
            .map_err(|err| slug_conflict(err, "position", &position.slug))?;
        info!(position_id = %position.id, slug = %position.slug, "position created");
        Ok(position)
    }

    pub async fn update_position(
        &self,
        id: Uuid,
        draft: PositionDraft,
    ) -> Result<Position, ServiceError> {
        self.check_position_draft(&draft).await?;
        let mut position = self.get_position(id).await?;
        position.apply_draft(draft, Utc::now());
        self.ensure_position_slug_free(&position).await?;
        self.store
            .update_position(&position)
            .await
            .map_err(|err| slug_conflict(err, "position", &position.slug))?;
        Ok(position)
    }

    /// Publishing (`draft -> open`) stamps `published_at` once.
    pub async fn set_position_status(
        &self,
        id: Uuid,
        target: PositionStatus,
    ) -> Result<Position, ServiceError> {
        let mut position = self.get_position(id).await?;
        if !position.status.can_transition_to(target) {
            return Err(ServiceError::PositionTransition {
                from: position.status,
                to: target,
            });
        }
        let now = Utc::now();
        if target == PositionStatus::Open && position.published_at.is_none() {
            position.published_at = Some(now);
        }
        position.status = target;
        position.updated_at = now;
        self.store.update_position(&position).await?;
        info!(position_id = %id, status = %target, "position status changed");
        Ok(position)
    }

    pub async fn retire_position(&self, id: Uuid) -> Result<Position, ServiceError> {
        self.set_position_lifecycle(id, Lifecycle::Retired).await
    }

    pub async fn restore_position(&self, id: Uuid) -> Result<Position, ServiceError> {
        self.set_position_lifecycle(id, Lifecycle::Active).await
    }

    /// Replaces the position's skill links. Every id must name a skill entry.
    pub async fn set_position_skills(
        &self,
        id: Uuid,
        skills: Vec<PositionSkillLink>,
    ) -> Result<Vec<PositionSkillLink>, ServiceError> {
        self.get_position(id).await?;
        let mut seen = HashSet::new();
        for link in &skills {
            if !seen.insert(link.skill_id) {
                return Err(ServiceError::InvalidInput {
                    field: "skills",
                    message: format!("skill {} is listed more than once", link.skill_id),
                });
            }
            self.ensure_reference(ReferenceKind::Skill, link.skill_id)
                .await?;
        }
        self.store.replace_position_skills(id, &skills).await?;
        Ok(skills)
    }

    async fn set_position_lifecycle(
        &self,
        id: Uuid,
        lifecycle: Lifecycle,
    ) -> Result<Position, ServiceError> {
        let mut position = self.get_position(id).await?;
        if position.lifecycle == lifecycle {
            return Ok(position);
        }
        position.lifecycle = lifecycle;
        position.updated_at = Utc::now();
        self.store.update_position(&position).await?;
        info!(position_id = %id, lifecycle = %lifecycle, "position lifecycle changed");
        Ok(position)
    }

    async fn check_position_draft(&self, draft: &PositionDraft) -> Result<(), ServiceError> {
        if draft.title.trim().is_empty() {
            return Err(ServiceError::InvalidInput {
                field: "title",
                message: "title is required".to_string(),
            });
        }
        if draft.resolved_slug().is_empty() {
            return Err(ServiceError::InvalidInput {
                field: "slug",
                message: "slug must contain at least one letter or digit".to_string(),
            });
        }
        if let (Some(min), Some(max)) = (draft.salary_min, draft.salary_max) {
            if min > max {
                return Err(ServiceError::InvalidInput {
                    field: "salary_min",
                    message: format!("salary_min {min} exceeds salary_max {max}"),
                });
            }
        }
        for (kind, id) in draft.references() {
            if let Some(id) = id {
                self.ensure_reference(kind, id).await?;
            }
        }
        Ok(())
    }

    async fn ensure_reference(&self, kind: ReferenceKind, id: Uuid) -> Result<(), ServiceError> {
        match self.store.get_reference(id).await? {
            Some(entity) if entity.kind == kind => Ok(()),
            _ => Err(ServiceError::InvalidReference { kind, id }),
        }
    }

    async fn ensure_position_slug_free(&self, position: &Position) -> Result<(), ServiceError> {
        match self
            .store
            .find_position_by_slug(&position.slug, Visibility::Staff { status: None })
            .await?
        {
            Some(other) if other.position.id != position.id => Err(ServiceError::SlugConflict {
                entity: "position",
                slug: position.slug.clone(),
            }),
            _ => Ok(()),
        }
    }
}
