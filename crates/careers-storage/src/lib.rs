//! Persistence collaborator for the careers catalog: the [`CareerStore`]
//! contract plus PostgreSQL and in-memory implementations.

use async_trait::async_trait;
use careers_core::{
    Application, ApplicationActivity, CategoryScope, FilterSpec, PageRequest, Position,
    PositionSkillLink, PositionView, ReferenceEntity, ReferenceKind, SortKey, StatusChange,
    Visibility,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod seed;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use seed::{load_catalog_fixture, seed_catalog, stable_id, CatalogFixture, SeedSummary};

pub const CRATE_NAME: &str = "careers-storage";

/// Operator-facing detail of a storage failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDiagnostic {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("storage failure [{}]: {}", .0.code, .0.message)]
    Backend(StorageDiagnostic),
}

impl StorageError {
    pub fn backend(code: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Backend(StorageDiagnostic {
            code: code.into(),
            message: message.into(),
            hint: None,
            detail: None,
        })
    }

    pub fn with_hint(self, hint: impl Into<String>) -> Self {
        match self {
            StorageError::Backend(mut diagnostic) => {
                diagnostic.hint = Some(hint.into());
                StorageError::Backend(diagnostic)
            }
            other => other,
        }
    }

    /// Diagnostic view of any storage error, for logs and staff responses.
    pub fn diagnostic(&self) -> StorageDiagnostic {
        match self {
            StorageError::NotFound { .. } => StorageDiagnostic {
                code: "not_found".to_string(),
                message: self.to_string(),
                hint: None,
                detail: None,
            },
            StorageError::Backend(diagnostic) => diagnostic.clone(),
        }
    }

    /// SQLSTATE 23505, or its in-memory equivalent.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StorageError::Backend(d) if d.code == UNIQUE_VIOLATION)
    }
}

pub(crate) const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) => {
                let (hint, detail) = db
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .map(|pg| (pg.hint().map(str::to_string), pg.detail().map(str::to_string)))
                    .unwrap_or((None, None));
                StorageError::Backend(StorageDiagnostic {
                    code: db
                        .code()
                        .map(|code| code.into_owned())
                        .unwrap_or_else(|| "database".to_string()),
                    message: db.message().to_string(),
                    hint,
                    detail,
                })
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::backend("unavailable", err.to_string())
                    .with_hint("check DATABASE_URL and that PostgreSQL is reachable")
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StorageError::backend("decode", err.to_string())
                    .with_hint("stored value does not match the expected schema; run migrations")
            }
            _ => StorageError::backend("sqlx", err.to_string()),
        }
    }
}

/// Everything the catalog and application services need from persistence.
///
/// Reads are predicate-composable through [`FilterSpec`]; writes are insert
/// and update-by-id. The audit log is append-only: there is no method that
/// edits or removes an [`ApplicationActivity`].
#[async_trait]
pub trait CareerStore: Send + Sync {
    async fn list_references(
        &self,
        kind: ReferenceKind,
        include_retired: bool,
    ) -> Result<Vec<ReferenceEntity>, StorageError>;

    async fn get_reference(&self, id: Uuid) -> Result<Option<ReferenceEntity>, StorageError>;

    async fn find_reference_by_slug(
        &self,
        kind: ReferenceKind,
        slug: &str,
    ) -> Result<Option<ReferenceEntity>, StorageError>;

    async fn insert_reference(&self, entity: &ReferenceEntity) -> Result<(), StorageError>;

    async fn update_reference(&self, entity: &ReferenceEntity) -> Result<(), StorageError>;

    async fn delete_reference(&self, id: Uuid) -> Result<(), StorageError>;

    /// Positions (or skill links, for skills) currently pointing at `id`.
    async fn count_reference_usage(
        &self,
        kind: ReferenceKind,
        id: Uuid,
    ) -> Result<u64, StorageError>;

    /// One page of matching positions plus the total match count.
    async fn search_positions(
        &self,
        filter: &FilterSpec,
        sort: SortKey,
        page: PageRequest,
    ) -> Result<(Vec<PositionView>, u64), StorageError>;

    /// Joined position with skills, if visible under `visibility`.
    async fn find_position_by_slug(
        &self,
        slug: &str,
        visibility: Visibility,
    ) -> Result<Option<PositionView>, StorageError>;

    async fn get_position(&self, id: Uuid) -> Result<Option<Position>, StorageError>;

    /// Listed positions in `scope`, newest first, skipping `exclude`.
    async fn list_related(
        &self,
        scope: CategoryScope,
        exclude: &[Uuid],
        limit: u32,
    ) -> Result<Vec<PositionView>, StorageError>;

    async fn insert_position(&self, position: &Position) -> Result<(), StorageError>;

    async fn update_position(&self, position: &Position) -> Result<(), StorageError>;

    /// Last-write-wins counter write.
    async fn set_views_count(&self, id: Uuid, views_count: i64) -> Result<(), StorageError>;

    /// Last-write-wins counter write.
    async fn set_applications_count(&self, id: Uuid, count: i64) -> Result<(), StorageError>;

    async fn replace_position_skills(
        &self,
        position_id: Uuid,
        skills: &[PositionSkillLink],
    ) -> Result<(), StorageError>;

    /// Stores a new application together with its creation activity.
    async fn insert_application(
        &self,
        application: &Application,
        created: &ApplicationActivity,
    ) -> Result<(), StorageError>;

    async fn get_application(&self, id: Uuid) -> Result<Option<Application>, StorageError>;

    /// Newest application first; all positions when `position_id` is `None`.
    async fn list_applications(
        &self,
        position_id: Option<Uuid>,
    ) -> Result<Vec<Application>, StorageError>;

    /// Writes the new status and appends the change's activity together.
    async fn apply_status_change(&self, change: &StatusChange) -> Result<(), StorageError>;

    async fn delete_application(&self, id: Uuid) -> Result<(), StorageError>;

    /// Audit entries for one application, oldest first.
    async fn list_activities(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationActivity>, StorageError>;
}
