#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use careers_core::{
    Application, ApplicationActivity, ApplicationSubmission, CategoryScope, FilterSpec,
    PageRequest, Position, PositionSkillLink, PositionView, ReferenceEntity, ReferenceKind,
    SortKey, StatusChange, Visibility,
};
use careers_service::{CareerService, ServiceConfig};
use careers_storage::{
    load_catalog_fixture, seed_catalog, stable_id, CareerStore, MemoryStore, StorageError,
};
use uuid::Uuid;

pub async fn seeded_service() -> CareerService {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/catalog.yaml");
    let fixture = load_catalog_fixture(&path).await.expect("fixture loads");
    let store = Arc::new(MemoryStore::new());
    seed_catalog(store.as_ref(), &fixture)
        .await
        .expect("fixture seeds");
    CareerService::new(store, ServiceConfig::default())
}

pub fn position_id(slug: &str) -> Uuid {
    stable_id("position", slug)
}

pub fn reference_id(kind: ReferenceKind, slug: &str) -> Uuid {
    stable_id(kind.as_str(), slug)
}

pub fn submission(position_slug: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        position_id: Some(position_id(position_slug).to_string()),
        first_name: Some("Grace".to_string()),
        last_name: Some("Hopper".to_string()),
        email: Some("Grace.Hopper@Example.com".to_string()),
        cover_letter: Some("I like compilers.".to_string()),
        ..Default::default()
    }
}

/// Store whose every call fails like an unreachable database.
pub struct UnavailableStore;

fn down() -> StorageError {
    StorageError::backend("08006", "connection to server was lost")
        .with_hint("check DATABASE_URL and that PostgreSQL is reachable")
}

#[async_trait]
impl CareerStore for UnavailableStore {
    async fn list_references(
        &self,
        _: ReferenceKind,
        _: bool,
    ) -> Result<Vec<ReferenceEntity>, StorageError> {
        Err(down())
    }
    async fn get_reference(&self, _: Uuid) -> Result<Option<ReferenceEntity>, StorageError> {
        Err(down())
    }
    async fn find_reference_by_slug(
        &self,
        _: ReferenceKind,
        _: &str,
    ) -> Result<Option<ReferenceEntity>, StorageError> {
        Err(down())
    }
    async fn insert_reference(&self, _: &ReferenceEntity) -> Result<(), StorageError> {
        Err(down())
    }
    async fn update_reference(&self, _: &ReferenceEntity) -> Result<(), StorageError> {
        Err(down())
    }
    async fn delete_reference(&self, _: Uuid) -> Result<(), StorageError> {
        Err(down())
    }
    async fn count_reference_usage(&self, _: ReferenceKind, _: Uuid) -> Result<u64, StorageError> {
        Err(down())
    }
    async fn search_positions(
        &self,
        _: &FilterSpec,
        _: SortKey,
        _: PageRequest,
    ) -> Result<(Vec<PositionView>, u64), StorageError> {
        Err(down())
    }
    async fn find_position_by_slug(
        &self,
        _: &str,
        _: Visibility,
    ) -> Result<Option<PositionView>, StorageError> {
        Err(down())
    }
    async fn get_position(&self, _: Uuid) -> Result<Option<Position>, StorageError> {
        Err(down())
    }
    async fn list_related(
        &self,
        _: CategoryScope,
        _: &[Uuid],
        _: u32,
    ) -> Result<Vec<PositionView>, StorageError> {
        Err(down())
    }
    async fn insert_position(&self, _: &Position) -> Result<(), StorageError> {
        Err(down())
    }
    async fn update_position(&self, _: &Position) -> Result<(), StorageError> {
        Err(down())
    }
    async fn set_views_count(&self, _: Uuid, _: i64) -> Result<(), StorageError> {
        Err(down())
    }
    async fn set_applications_count(&self, _: Uuid, _: i64) -> Result<(), StorageError> {
        Err(down())
    }
    async fn replace_position_skills(
        &self,
        _: Uuid,
        _: &[PositionSkillLink],
    ) -> Result<(), StorageError> {
        Err(down())
    }
    async fn insert_application(
        &self,
        _: &Application,
        _: &ApplicationActivity,
    ) -> Result<(), StorageError> {
        Err(down())
    }
    async fn get_application(&self, _: Uuid) -> Result<Option<Application>, StorageError> {
        Err(down())
    }
    async fn list_applications(&self, _: Option<Uuid>) -> Result<Vec<Application>, StorageError> {
        Err(down())
    }
    async fn apply_status_change(&self, _: &StatusChange) -> Result<(), StorageError> {
        Err(down())
    }
    async fn delete_application(&self, _: Uuid) -> Result<(), StorageError> {
        Err(down())
    }
    async fn list_activities(&self, _: Uuid) -> Result<Vec<ApplicationActivity>, StorageError> {
        Err(down())
    }
}

pub fn unavailable_service() -> CareerService {
    CareerService::new(Arc::new(UnavailableStore), ServiceConfig::default())
}

/// In-memory sink for formatted tracing output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let buffer = self.clone();
        tracing_subscriber::fmt()
            .with_writer(move || buffer.clone())
            .with_ansi(false)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
