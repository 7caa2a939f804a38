//! Staff routes under `/api/admin`. Unlike the public catalog these surface
//! storage diagnostics instead of degrading.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path as AxumPath, Query, State};
use axum::Json;
use careers_core::{
    ApplicationStatus, PositionDraft, PositionSkillLink, PositionStatus, ReferenceDraft,
    ReferenceEntity, ReferenceKind,
};
use careers_service::CareerService;
use serde::Deserialize;
use uuid::Uuid;

use crate::response::{created, ok, ApiError, ApiResult};
use crate::{parsed, reference_kind, AppState, PositionsQuery};

fn parse_id(value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::NotFound(format!("no record with id '{value}'")))
}

pub(crate) async fn positions_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PositionsQuery>,
) -> ApiResult {
    let service = &state.service;
    let result = service
        .search_staff(
            query.filter(query.staff_visibility()),
            query.sort(),
            query.page(service),
        )
        .await?;
    Ok(ok(result))
}

pub(crate) async fn position_by_slug_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(slug): AxumPath<String>,
) -> ApiResult {
    Ok(ok(state.service.position_for_staff(&slug).await?))
}

pub(crate) async fn position_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult {
    Ok(ok(state.service.get_position(parse_id(&id)?).await?))
}

pub(crate) async fn create_position_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PositionDraft>, JsonRejection>,
) -> ApiResult {
    let Json(draft) = payload?;
    Ok(created(state.service.create_position(draft).await?))
}

pub(crate) async fn update_position_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<PositionDraft>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let Json(draft) = payload?;
    Ok(ok(state.service.update_position(id, draft).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PositionStatusBody {
    status: PositionStatus,
}

pub(crate) async fn position_status_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<PositionStatusBody>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    Ok(ok(state.service.set_position_status(id, body.status).await?))
}

pub(crate) async fn retire_position_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult {
    Ok(ok(state.service.retire_position(parse_id(&id)?).await?))
}

pub(crate) async fn restore_position_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult {
    Ok(ok(state.service.restore_position(parse_id(&id)?).await?))
}

pub(crate) async fn position_skills_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<Vec<PositionSkillLink>>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let Json(links) = payload?;
    Ok(ok(state.service.set_position_skills(id, links).await?))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApplicationsQuery {
    position_id: Option<String>,
}

pub(crate) async fn applications_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ApplicationsQuery>,
) -> ApiResult {
    let position_id = parsed::<Uuid>(query.position_id.as_deref());
    Ok(ok(state.service.list_applications(position_id).await?))
}

pub(crate) async fn application_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult {
    Ok(ok(state.service.application_detail(parse_id(&id)?).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionBody {
    status: ApplicationStatus,
    #[serde(default)]
    notes: Option<String>,
}

pub(crate) async fn transition_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    payload: Result<Json<TransitionBody>, JsonRejection>,
) -> ApiResult {
    let id = parse_id(&id)?;
    let Json(body) = payload?;
    let notes = body.notes.filter(|n| !n.trim().is_empty());
    Ok(ok(state
        .service
        .transition_application(id, body.status, notes)
        .await?))
}

pub(crate) async fn delete_application_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult {
    let id = parse_id(&id)?;
    state.service.delete_application(id).await?;
    Ok(ok(serde_json::json!({ "id": id })))
}

pub(crate) async fn references_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(kind): AxumPath<String>,
) -> ApiResult {
    let kind = reference_kind(&kind)?;
    Ok(ok(state.service.list_references_with_counts(kind).await?))
}

pub(crate) async fn create_reference_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(kind): AxumPath<String>,
    payload: Result<Json<ReferenceDraft>, JsonRejection>,
) -> ApiResult {
    let kind = reference_kind(&kind)?;
    let Json(draft) = payload?;
    Ok(created(state.service.create_reference(kind, draft).await?))
}

/// Resolves `{kind}/{id}`; an id of another kind is treated as missing.
async fn reference_in(
    service: &CareerService,
    kind: &str,
    id: &str,
) -> Result<ReferenceEntity, ApiError> {
    let kind: ReferenceKind = reference_kind(kind)?;
    let entity = service.get_reference(parse_id(id)?).await?;
    if entity.kind != kind {
        return Err(ApiError::NotFound(format!("no {kind} with id '{id}'")));
    }
    Ok(entity)
}

pub(crate) async fn update_reference_handler(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
    payload: Result<Json<ReferenceDraft>, JsonRejection>,
) -> ApiResult {
    let entity = reference_in(&state.service, &kind, &id).await?;
    let Json(draft) = payload?;
    Ok(ok(state.service.update_reference(entity.id, draft).await?))
}

pub(crate) async fn delete_reference_handler(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> ApiResult {
    let entity = reference_in(&state.service, &kind, &id).await?;
    state.service.delete_reference(entity.id).await?;
    Ok(ok(serde_json::json!({ "id": entity.id })))
}

pub(crate) async fn retire_reference_handler(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> ApiResult {
    let entity = reference_in(&state.service, &kind, &id).await?;
    Ok(ok(state.service.retire_reference(entity.id).await?))
}

pub(crate) async fn restore_reference_handler(
    State(state): State<Arc<AppState>>,
    AxumPath((kind, id)): AxumPath<(String, String)>,
) -> ApiResult {
    let entity = reference_in(&state.service, &kind, &id).await?;
    Ok(ok(state.service.restore_reference(entity.id).await?))
}
