//! Catalog queries, application intake and the application lifecycle,
//! composed over a [`CareerStore`].

use std::path::PathBuf;
use std::sync::Arc;

use careers_core::{
    ApplicationStatus, PositionStatus, ReferenceKind, TransitionRejected, ValidationError,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use careers_storage::{CareerStore, StorageDiagnostic, StorageError};
use thiserror::Error;
use uuid::Uuid;

mod catalog;
mod intake;
mod lifecycle;
mod positions;
mod reference;

pub use catalog::{MAX_RELATED_LIMIT, MIN_RELATED_LIMIT};
pub use lifecycle::ApplicationDetail;

pub const CRATE_NAME: &str = "careers-service";

pub const DEFAULT_RELATED_LIMIT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub page_limit: u32,
    pub related_limit: u32,
    pub web_host: String,
    pub web_port: u16,
    pub seed_path: PathBuf,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: 5,
            page_limit: DEFAULT_PAGE_LIMIT,
            related_limit: DEFAULT_RELATED_LIMIT,
            web_host: "0.0.0.0".to_string(),
            web_port: 8000,
            seed_path: PathBuf::from("fixtures/catalog.yaml"),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unparseable numbers keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());
        Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            db_max_connections: number("CAREERS_DB_MAX_CONNECTIONS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.db_max_connections),
            page_limit: number("CAREERS_PAGE_LIMIT")
                .map(|n| n.clamp(1, MAX_PAGE_LIMIT))
                .unwrap_or(defaults.page_limit),
            related_limit: number("CAREERS_RELATED_LIMIT")
                .map(|n| n.clamp(MIN_RELATED_LIMIT, MAX_RELATED_LIMIT))
                .unwrap_or(defaults.related_limit),
            web_host: lookup("CAREERS_WEB_HOST").unwrap_or(defaults.web_host),
            web_port: lookup("CAREERS_WEB_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.web_port),
            seed_path: lookup("CAREERS_SEED_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.seed_path),
            log_level: lookup("CAREERS_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{field}: {message}")]
    InvalidInput { field: &'static str, message: String },
    #[error("{kind} {id} does not exist")]
    InvalidReference { kind: ReferenceKind, id: Uuid },
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },
    #[error(transparent)]
    TransitionRejected(#[from] TransitionRejected),
    #[error("position cannot move from {from} to {to}")]
    PositionTransition {
        from: PositionStatus,
        to: PositionStatus,
    },
    #[error("application in status {status} cannot be deleted; reject it first")]
    DeleteRejected { status: ApplicationStatus },
    #[error("{kind} '{slug}' is still used by {count} position(s)")]
    StillReferenced {
        kind: ReferenceKind,
        slug: String,
        count: u64,
    },
    #[error("{entity} slug '{slug}' is already taken")]
    SlugConflict { entity: &'static str, slug: String },
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => ServiceError::NotFound {
                entity,
                key: id.to_string(),
            },
            other => ServiceError::Storage(other),
        }
    }
}

impl ServiceError {
    /// Stable machine-readable code for response envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidInput { .. } => "validation",
            ServiceError::InvalidReference { .. } => "invalid_reference",
            ServiceError::NotFound { .. } => "not_found",
            ServiceError::TransitionRejected(_) | ServiceError::PositionTransition { .. } => {
                "transition_rejected"
            }
            ServiceError::DeleteRejected { .. } => "delete_rejected",
            ServiceError::StillReferenced { .. } => "still_referenced",
            ServiceError::SlugConflict { .. } => "slug_conflict",
            ServiceError::Storage(_) => "storage",
        }
    }

    pub fn diagnostic(&self) -> Option<StorageDiagnostic> {
        match self {
            ServiceError::Storage(err) => Some(err.diagnostic()),
            _ => None,
        }
    }

    /// Field the failure belongs to, for form-level errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ServiceError::Validation(err) => Some(err.field()),
            ServiceError::InvalidInput { field, .. } => Some(*field),
            ServiceError::InvalidReference { kind, .. } => Some(match kind {
                ReferenceKind::Category => "category_id",
                ReferenceKind::Location => "location_id",
                ReferenceKind::EmploymentType => "type_id",
                ReferenceKind::Level => "level_id",
                ReferenceKind::Skill => "skills",
            }),
            ServiceError::SlugConflict { .. } => Some("slug"),
            _ => None,
        }
    }
}

/// Entry point for every catalog, intake and lifecycle operation.
#[derive(Clone)]
pub struct CareerService {
    store: Arc<dyn CareerStore>,
    config: ServiceConfig,
}

impl CareerService {
    pub fn new(store: Arc<dyn CareerStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn CareerStore> {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

fn log_degraded(operation: &'static str, err: &StorageError) {
    let diagnostic = err.diagnostic();
    tracing::error!(
        operation,
        code = %diagnostic.code,
        error = %diagnostic.message,
        hint = diagnostic.hint.as_deref().unwrap_or(""),
        detail = diagnostic.detail.as_deref().unwrap_or(""),
        "catalog read failed; serving empty result"
    );
}
