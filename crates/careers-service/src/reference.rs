use careers_core::{Lifecycle, ReferenceDraft, ReferenceEntity, ReferenceKind, ReferenceUsage};
use careers_storage::StorageError;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{log_degraded, CareerService, ServiceError};

impl CareerService {
    /// Facet entries for one kind in display order. A storage failure yields
    /// an empty list.
    pub async fn list_references(
        &self,
        kind: ReferenceKind,
        include_retired: bool,
    ) -> Vec<ReferenceEntity> {
        match self.store.list_references(kind, include_retired).await {
            Ok(entities) => entities,
            Err(err) => {
                log_degraded("list_references", &err);
                Vec::new()
            }
        }
    }

    /// Staff listing: every entry of `kind` with its current usage count.
    pub async fn list_references_with_counts(
        &self,
        kind: ReferenceKind,
    ) -> Result<Vec<ReferenceUsage>, ServiceError> {
        let entities = self.store.list_references(kind, true).await?;
        let mut rows = Vec::with_capacity(entities.len());
        for entity in entities {
            let positions_count = self.store.count_reference_usage(kind, entity.id).await?;
            rows.push(ReferenceUsage {
                entity,
                positions_count,
            });
        }
        Ok(rows)
    }

    pub async fn get_reference(&self, id: Uuid) -> Result<ReferenceEntity, ServiceError> {
        self.store
            .get_reference(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "reference",
                key: id.to_string(),
            })
    }

    pub async fn create_reference(
        &self,
        kind: ReferenceKind,
        draft: ReferenceDraft,
    ) -> Result<ReferenceEntity, ServiceError> {
        check_draft(&draft)?;
        let entity = ReferenceEntity::from_draft(kind, draft, Utc::now());
        self.ensure_slug_free(&entity).await?;
        self.store
            .insert_reference(&entity)
            .await
            .map_err(|err| slug_conflict(err, "reference", &entity.slug))?;
        info!(kind = %kind, slug = %entity.slug, "reference created");
        Ok(entity)
    }

    /// Replaces the editable fields. Kind and created_at are kept, as are the
    /// slug and lifecycle unless the draft names them.
    pub async fn update_reference(
        &self,
        id: Uuid,
        draft: ReferenceDraft,
    ) -> Result<ReferenceEntity, ServiceError> {
        check_draft(&draft)?;
        let existing = self.get_reference(id).await?;
        let lifecycle = draft.lifecycle.unwrap_or(existing.lifecycle);
        let slug = draft.explicit_slug().unwrap_or(existing.slug);
        let mut entity = ReferenceEntity::from_draft(existing.kind, draft, Utc::now());
        entity.id = existing.id;
        entity.slug = slug;
        entity.lifecycle = lifecycle;
        entity.created_at = existing.created_at;
        self.ensure_slug_free(&entity).await?;
        self.store
            .update_reference(&entity)
            .await
            .map_err(|err| slug_conflict(err, "reference", &entity.slug))?;
        Ok(entity)
    }

    /// Hides the entry from public facets without touching positions that use it.
    pub async fn retire_reference(&self, id: Uuid) -> Result<ReferenceEntity, ServiceError> {
        self.set_reference_lifecycle(id, Lifecycle::Retired).await
    }

    pub async fn restore_reference(&self, id: Uuid) -> Result<ReferenceEntity, ServiceError> {
        self.set_reference_lifecycle(id, Lifecycle::Active).await
    }

    /// Deletes an unused entry. The usage count is checked first; a referenced
    /// entry is refused rather than left to a foreign-key failure.
    pub async fn delete_reference(&self, id: Uuid) -> Result<(), ServiceError> {
        let entity = self.get_reference(id).await?;
        let count = self.store.count_reference_usage(entity.kind, id).await?;
        if count > 0 {
            return Err(ServiceError::StillReferenced {
                kind: entity.kind,
                slug: entity.slug,
                count,
            });
        }
        self.store.delete_reference(id).await?;
        info!(kind = %entity.kind, slug = %entity.slug, "reference deleted");
        Ok(())
    }

    async fn set_reference_lifecycle(
        &self,
        id: Uuid,
        lifecycle: Lifecycle,
    ) -> Result<ReferenceEntity, ServiceError> {
        let mut entity = self.get_reference(id).await?;
        if entity.lifecycle == lifecycle {
            return Ok(entity);
        }
        entity.lifecycle = lifecycle;
        entity.updated_at = Utc::now();
        self.store.update_reference(&entity).await?;
        info!(
            kind = %entity.kind,
            slug = %entity.slug,
            %lifecycle,
            "reference lifecycle changed"
        );
        Ok(entity)
    }

    async fn ensure_slug_free(&self, entity: &ReferenceEntity) -> Result<(), ServiceError> {
        match self
            .store
            .find_reference_by_slug(entity.kind, &entity.slug)
            .await?
        {
            Some(other) if other.id != entity.id => Err(ServiceError::SlugConflict {
                entity: "reference",
                slug: entity.slug.clone(),
            }),
            _ => Ok(()),
        }
    }
}

fn check_draft(draft: &ReferenceDraft) -> Result<(), ServiceError> {
    if draft.name.trim().is_empty() {
        return Err(ServiceError::InvalidInput {
            field: "name",
            message: "name is required".to_string(),
        });
    }
    if draft.resolved_slug().is_empty() {
        return Err(ServiceError::InvalidInput {
            field: "slug",
            message: "slug must contain at least one letter or digit".to_string(),
        });
    }
    Ok(())
}

/// Maps a unique violation raised by the store to a slug conflict.
pub(crate) fn slug_conflict(err: StorageError, entity: &'static str, slug: &str) -> ServiceError {
    if err.is_unique_violation() {
        ServiceError::SlugConflict {
            entity,
            slug: slug.to_string(),
        }
    } else {
        err.into()
    }
}
