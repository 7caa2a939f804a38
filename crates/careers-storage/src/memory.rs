//! In-process store used by tests, demos and `serve --memory`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use careers_core::{
    Application, ApplicationActivity, CategoryScope, FilterSpec, PageRequest, Position,
    PositionSkill, PositionSkillLink, PositionView, ReferenceEntity, ReferenceKind, SortKey,
    StatusChange, Visibility,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{CareerStore, StorageError, UNIQUE_VIOLATION};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    references: BTreeMap<Uuid, ReferenceEntity>,
    positions: BTreeMap<Uuid, Position>,
    position_skills: BTreeMap<Uuid, Vec<PositionSkillLink>>,
    applications: BTreeMap<Uuid, Application>,
    activities: Vec<ApplicationActivity>,
}

impl MemoryState {
    fn view(&self, position: &Position) -> PositionView {
        let mut view = PositionView::bare(position.clone());
        for kind in ReferenceKind::ALL {
            if let Some(entity) = position
                .reference_id(kind)
                .and_then(|id| self.references.get(&id))
            {
                view.attach(entity.clone());
            }
        }
        view
    }

    fn skills(&self, position_id: Uuid) -> Vec<PositionSkill> {
        let mut skills = self
            .position_skills
            .get(&position_id)
            .into_iter()
            .flatten()
            .filter_map(|link| {
                self.references.get(&link.skill_id).map(|skill| PositionSkill {
                    skill: skill.clone(),
                    requirement: link.requirement,
                    proficiency: link.proficiency,
                })
            })
            .collect::<Vec<_>>();
        skills.sort_by(|a, b| a.display_cmp(b));
        skills
    }

    fn slug_taken(&self, entity: &ReferenceEntity) -> bool {
        self.references.values().any(|other| {
            other.kind == entity.kind && other.slug == entity.slug && other.id != entity.id
        })
    }

    fn position_slug_taken(&self, position: &Position) -> bool {
        self.positions
            .values()
            .any(|other| other.slug == position.slug && other.id != position.id)
    }
}

fn duplicate(constraint: &str, slug: &str) -> StorageError {
    StorageError::backend(
        UNIQUE_VIOLATION,
        format!("duplicate key value violates unique constraint \"{constraint}\""),
    )
    .with_hint(format!("slug '{slug}' is already in use"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CareerStore for MemoryStore {
    async fn list_references(
        &self,
        kind: ReferenceKind,
        include_retired: bool,
    ) -> Result<Vec<ReferenceEntity>, StorageError> {
        let state = self.state.read().await;
        let mut rows = state
            .references
            .values()
            .filter(|entity| entity.kind == kind)
            .filter(|entity| include_retired || entity.lifecycle.is_active())
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| a.display_cmp(b));
        Ok(rows)
    }

    async fn get_reference(&self, id: Uuid) -> Result<Option<ReferenceEntity>, StorageError> {
        Ok(self.state.read().await.references.get(&id).cloned())
    }

    async fn find_reference_by_slug(
        &self,
        kind: ReferenceKind,
        slug: &str,
    ) -> Result<Option<ReferenceEntity>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .references
            .values()
            .find(|entity| entity.kind == kind && entity.slug == slug)
            .cloned())
    }

    async fn insert_reference(&self, entity: &ReferenceEntity) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if state.slug_taken(entity) || state.references.contains_key(&entity.id) {
            return Err(duplicate("reference_entities_kind_slug_key", &entity.slug));
        }
        state.references.insert(entity.id, entity.clone());
        Ok(())
    }

    async fn update_reference(&self, entity: &ReferenceEntity) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if !state.references.contains_key(&entity.id) {
            return Err(StorageError::NotFound {
                entity: "reference",
                id: entity.id,
            });
        }
        if state.slug_taken(entity) {
            return Err(duplicate("reference_entities_kind_slug_key", &entity.slug));
        }
        state.references.insert(entity.id, entity.clone());
        Ok(())
    }

    async fn delete_reference(&self, id: Uuid) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .references
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound {
                entity: "reference",
                id,
            })
    }

    async fn count_reference_usage(
        &self,
        kind: ReferenceKind,
        id: Uuid,
    ) -> Result<u64, StorageError> {
        let state = self.state.read().await;
        let count = match kind {
            ReferenceKind::Skill => state
                .position_skills
                .values()
                .flatten()
                .filter(|link| link.skill_id == id)
                .count(),
            facet => state
                .positions
                .values()
                .filter(|position| position.reference_id(facet) == Some(id))
                .count(),
        };
        Ok(count as u64)
    }

    async fn search_positions(
        &self,
        filter: &FilterSpec,
        sort: SortKey,
        page: PageRequest,
    ) -> Result<(Vec<PositionView>, u64), StorageError> {
        let state = self.state.read().await;
        let mut matches = state
            .positions
            .values()
            .map(|position| state.view(position))
            .filter(|view| filter.matches(view))
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| sort.compare(&a.position, &b.position));

        let total = matches.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let rows = matches
            .into_iter()
            .skip(offset)
            .take(page.limit as usize)
            .collect();
        Ok((rows, total))
    }

    async fn find_position_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PositionView>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .positions
            .values()
            .find(|position| position.slug == slug && visibility.admits(position))
            .map(|position| {
                let mut view = state.view(position);
                view.skills = state.skills(position.id);
                view
            }))
    }

    async fn get_position(&self, id: Uuid) -> Result<Option<Position>, StorageError> {
        Ok(self.state.read().await.positions.get(&id).cloned())
    }

    async fn list_related(
        &self,
        scope: CategoryScope,
        exclude: &[Uuid],
        limit: u32,
    ) -> Result<Vec<PositionView>, StorageError> {
        let state = self.state.read().await;
        let mut rows = state
            .positions
            .values()
            .filter(|position| position.is_listed())
            .filter(|position| scope.admits(position))
            .filter(|position| !exclude.contains(&position.id))
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| SortKey::Newest.compare(a, b));
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|position| state.view(position))
            .collect())
    }

    async fn insert_position(&self, position: &Position) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if state.position_slug_taken(position) || state.positions.contains_key(&position.id) {
            return Err(duplicate("positions_slug_key", &position.slug));
        }
        state.positions.insert(position.id, position.clone());
        Ok(())
    }

    async fn update_position(&self, position: &Position) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if !state.positions.contains_key(&position.id) {
            return Err(StorageError::NotFound {
                entity: "position",
                id: position.id,
            });
        }
        if state.position_slug_taken(position) {
            return Err(duplicate("positions_slug_key", &position.slug));
        }
        state.positions.insert(position.id, position.clone());
        Ok(())
    }

    async fn set_views_count(&self, id: Uuid, views_count: i64) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let position = state.positions.get_mut(&id).ok_or(StorageError::NotFound {
            entity: "position",
            id,
        })?;
        position.views_count = views_count;
        Ok(())
    }

    async fn set_applications_count(&self, id: Uuid, count: i64) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let position = state.positions.get_mut(&id).ok_or(StorageError::NotFound {
            entity: "position",
            id,
        })?;
        position.applications_count = count;
        Ok(())
    }

    async fn replace_position_skills(
        &self,
        position_id: Uuid,
        skills: &[PositionSkillLink],
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if !state.positions.contains_key(&position_id) {
            return Err(StorageError::NotFound {
                entity: "position",
                id: position_id,
            });
        }
        state.position_skills.insert(position_id, skills.to_vec());
        Ok(())
    }

    async fn insert_application(
        &self,
        application: &Application,
        created: &ApplicationActivity,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if !state.positions.contains_key(&application.position_id) {
            return Err(StorageError::backend(
                "23503",
                "insert on table \"applications\" violates foreign key constraint \
                 \"applications_position_id_fkey\"",
            ));
        }
        state.applications.insert(application.id, application.clone());
        state.activities.push(created.clone());
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, StorageError> {
        Ok(self.state.read().await.applications.get(&id).cloned())
    }

    async fn list_applications(
        &self,
        position_id: Option<Uuid>,
    ) -> Result<Vec<Application>, StorageError> {
        let state = self.state.read().await;
        let mut rows = state
            .applications
            .values()
            .filter(|app| position_id.map_or(true, |id| app.position_id == id))
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| b.applied_at.cmp(&a.applied_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn apply_status_change(&self, change: &StatusChange) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let application = state
            .applications
            .get_mut(&change.application_id)
            .ok_or(StorageError::NotFound {
                entity: "application",
                id: change.application_id,
            })?;
        application.status = change.to;
        application.last_activity_at = application.last_activity_at.max(change.at);
        state.activities.push(change.activity.clone());
        Ok(())
    }

    async fn delete_application(&self, id: Uuid) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .applications
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound {
                entity: "application",
                id,
            })
    }

    async fn list_activities(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationActivity>, StorageError> {
        let state = self.state.read().await;
        let mut rows = state
            .activities
            .iter()
            .filter(|activity| activity.application_id == application_id)
            .cloned()
            .collect::<Vec<_>>();
        // stable sort keeps insertion order on equal timestamps
        rows.sort_by_key(|activity| activity.created_at);
        Ok(rows)
    }
}
