//! JSON HTTP surface over [`CareerService`].

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as AxumPath, Query, State};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use careers_core::{
    ApplicationSubmission, FilterSpec, PageRequest, PositionStatus, ReferenceKind, SortKey,
    Visibility,
};
use careers_service::{CareerService, ServiceError};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::info;
use uuid::Uuid;

mod admin;
mod response;
#[cfg(test)]
mod test_support;

pub use response::{ApiError, Envelope, ErrorBody};
use response::{created, ok, ApiResult};

pub const CRATE_NAME: &str = "careers-web";

/// Method and path of every route, in registration order.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/healthz"),
    ("GET", "/api/positions"),
    ("GET", "/api/positions/{key}"),
    ("GET", "/api/positions/{key}/related"),
    ("GET", "/api/references/{kind}"),
    ("POST", "/api/applications"),
    ("GET", "/api/admin/positions"),
    ("POST", "/api/admin/positions"),
    ("GET", "/api/admin/positions/by-slug/{slug}"),
    ("GET", "/api/admin/positions/{id}"),
    ("PUT", "/api/admin/positions/{id}"),
    ("POST", "/api/admin/positions/{id}/status"),
    ("POST", "/api/admin/positions/{id}/retire"),
    ("POST", "/api/admin/positions/{id}/restore"),
    ("PUT", "/api/admin/positions/{id}/skills"),
    ("GET", "/api/admin/applications"),
    ("GET", "/api/admin/applications/{id}"),
    ("DELETE", "/api/admin/applications/{id}"),
    ("POST", "/api/admin/applications/{id}/transition"),
    ("GET", "/api/admin/references/{kind}"),
    ("POST", "/api/admin/references/{kind}"),
    ("PUT", "/api/admin/references/{kind}/{id}"),
    ("DELETE", "/api/admin/references/{kind}/{id}"),
    ("POST", "/api/admin/references/{kind}/{id}/retire"),
    ("POST", "/api/admin/references/{kind}/{id}/restore"),
];

#[derive(Clone)]
pub struct AppState {
    pub service: CareerService,
}

impl AppState {
    pub fn new(service: CareerService) -> Self {
        Self { service }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/positions", get(positions_handler))
        .route("/api/positions/{key}", get(position_detail_handler))
        .route("/api/positions/{key}/related", get(related_handler))
        .route("/api/references/{kind}", get(references_handler))
        .route("/api/applications", post(submit_application_handler))
        .route(
            "/api/admin/positions",
            get(admin::positions_handler).post(admin::create_position_handler),
        )
        .route(
            "/api/admin/positions/by-slug/{slug}",
            get(admin::position_by_slug_handler),
        )
        .route(
            "/api/admin/positions/{id}",
            get(admin::position_handler).put(admin::update_position_handler),
        )
        .route(
            "/api/admin/positions/{id}/status",
            post(admin::position_status_handler),
        )
        .route(
            "/api/admin/positions/{id}/retire",
            post(admin::retire_position_handler),
        )
        .route(
            "/api/admin/positions/{id}/restore",
            post(admin::restore_position_handler),
        )
        .route(
            "/api/admin/positions/{id}/skills",
            put(admin::position_skills_handler),
        )
        .route("/api/admin/applications", get(admin::applications_handler))
        .route(
            "/api/admin/applications/{id}",
            get(admin::application_handler).delete(admin::delete_application_handler),
        )
        .route(
            "/api/admin/applications/{id}/transition",
            post(admin::transition_handler),
        )
        .route(
            "/api/admin/references/{kind}",
            get(admin::references_handler).post(admin::create_reference_handler),
        )
        .route(
            "/api/admin/references/{kind}/{id}",
            put(admin::update_reference_handler).delete(admin::delete_reference_handler),
        )
        .route(
            "/api/admin/references/{kind}/{id}/retire",
            post(admin::retire_reference_handler),
        )
        .route(
            "/api/admin/references/{kind}/{id}/restore",
            post(admin::restore_reference_handler),
        )
        .with_state(Arc::new(state))
}

/// Binds the configured address and serves until ctrl-c.
pub async fn serve(service: CareerService) -> anyhow::Result<()> {
    let addr = service.config().bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "careers web listening");
    axum::serve(listener, app(AppState::new(service)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;
    Ok(())
}

/// Listing query string. Every value arrives as text and is parsed leniently:
/// garbage numbers and flags are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct PositionsQuery {
    page: Option<String>,
    limit: Option<String>,
    sort: Option<String>,
    category: Option<String>,
    location: Option<String>,
    #[serde(rename = "type")]
    employment_type: Option<String>,
    level: Option<String>,
    remote: Option<String>,
    salary_min: Option<String>,
    salary_max: Option<String>,
    search: Option<String>,
    status: Option<String>,
}

impl PositionsQuery {
    fn filter(&self, visibility: Visibility) -> FilterSpec {
        FilterSpec {
            category: self.category.clone(),
            location: self.location.clone(),
            employment_type: self.employment_type.clone(),
            level: self.level.clone(),
            remote: flag(self.remote.as_deref()),
            salary_min: parsed(self.salary_min.as_deref()),
            salary_max: parsed(self.salary_max.as_deref()),
            search: self.search.clone(),
            visibility,
        }
    }

    fn staff_visibility(&self) -> Visibility {
        Visibility::Staff {
            status: parsed::<PositionStatus>(self.status.as_deref()),
        }
    }

    fn sort(&self) -> SortKey {
        SortKey::parse_or_default(self.sort.as_deref())
    }

    fn page(&self, service: &CareerService) -> PageRequest {
        service.page_request(parsed(self.page.as_deref()), parsed(self.limit.as_deref()))
    }
}

fn parsed<T: FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

fn flag(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn reference_kind(value: &str) -> Result<ReferenceKind, ApiError> {
    value
        .parse()
        .map_err(|err: careers_core::ParseEnumError| ApiError::NotFound(err.to_string()))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": CRATE_NAME }))
}

async fn positions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PositionsQuery>,
) -> Response {
    let service = &state.service;
    let result = service
        .search(query.filter(Visibility::Listed), query.sort(), query.page(service))
        .await;
    ok(result)
}

async fn position_detail_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
) -> ApiResult {
    match state.service.get_by_slug(&slug).await {
        Some(view) => Ok(ok(view)),
        None => Err(ApiError::NotFound(format!("position '{slug}' not found"))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RelatedQuery {
    category_id: Option<String>,
    limit: Option<String>,
}

async fn related_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(key): AxumPath<String>,
    Query(query): Query<RelatedQuery>,
) -> ApiResult {
    let service = &state.service;
    let Ok(position_id) = Uuid::parse_str(key.trim()) else {
        return Err(ApiError::NotFound(format!("position '{key}' not found")));
    };
    let category_id = match parsed::<Uuid>(query.category_id.as_deref()) {
        Some(id) => Some(id),
        None => match service.get_position(position_id).await {
            Ok(position) => position.category_id,
            Err(err @ ServiceError::NotFound { .. }) => return Err(err.into()),
            // the related lookup below degrades on its own
            Err(_) => None,
        },
    };
    let related = service
        .get_related(position_id, category_id, parsed(query.limit.as_deref()))
        .await;
    Ok(ok(related))
}

async fn references_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(kind): AxumPath<String>,
) -> ApiResult {
    let kind = reference_kind(&kind)?;
    Ok(ok(state.service.list_references(kind, false).await))
}

async fn submit_application_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> ApiResult {
    let Json(submission) = payload?;
    let application = state.service.submit_application(submission).await?;
    Ok(created(application))
}
