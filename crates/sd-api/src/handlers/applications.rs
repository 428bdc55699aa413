//! Application API handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use sd_core::traits::Id;
use sd_models::{
    Actor, ActorKind, ActorRef, ApplicationFilter, ApplicationStatus, ApplicationUpdate,
    CompletionInput, NewApplication,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ActorContext, AppState, Pagination};
use crate::multipart::read_form;

/// POST /applications
///
/// Multipart: `data` holds the application JSON, `images` the photos.
pub async fn create_application(
    State(state): State<AppState>,
    actor: ActorContext,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_form::<NewApplication>(multipart).await?;
    let (input, images) = form.store(&state).await?;
    let created = state
        .applications
        .create(input, images.urls(), &actor)
        .await;
    let application = images.settle(state.storage.as_ref(), created).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /applications
pub async fn list_applications(
    State(state): State<AppState>,
    actor: ActorContext,
    pagination: Pagination,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    let page = state.applications.list(&filter, pagination.0).await?;
    Ok(Json(page))
}

/// GET /applications/counts
pub async fn count_applications(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(filter): Query<ApplicationFilter>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    let counts = state.applications.count_by_status(&filter).await?;
    Ok(Json(counts))
}

/// GET /applications/my
pub async fn my_applications(
    State(state): State<AppState>,
    actor: ActorContext,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let user = actor.require(ActorKind::User)?;
    let page = state
        .applications
        .find_by_user(user.id(), pagination.0)
        .await?;
    Ok(Json(page))
}

/// GET /applications/assigned
pub async fn assigned_applications(
    State(state): State<AppState>,
    actor: ActorContext,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let employee = actor.require(ActorKind::Employee)?;
    let page = state
        .applications
        .find_by_employee(employee.id(), pagination.0)
        .await?;
    Ok(Json(page))
}

/// GET /applications/:id
pub async fn get_application(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    let application = state.applications.find(id).await?;
    Ok(Json(application))
}

/// PATCH /applications/:id
///
/// Staff may edit any application; users only the ones they filed.
pub async fn update_application(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(update): Json<ApplicationUpdate>,
) -> ApiResult<impl IntoResponse> {
    if actor.kind() == ActorKind::User {
        let application = state.applications.find(id).await?;
        if application.user_id != actor.id() {
            return Err(ApiError::forbidden(
                "Only the filing user may edit this application",
            ));
        }
    }
    let application = state.applications.update(id, update, &actor).await?;
    Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct EmployeeRef {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub employees: Vec<EmployeeRef>,
    pub deadline: DateTime<Utc>,
}

/// PATCH /applications/:id/assign
pub async fn assign_application(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let employees = request
        .employees
        .into_iter()
        .map(|e| Actor::new(ActorRef::employee(e.id), e.name))
        .collect();
    let application = state
        .applications
        .assign(id, employees, request.deadline, by)
        .await?;
    Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ApplicationStatus,
    pub comment: Option<String>,
}

/// PATCH /applications/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let application = state
        .applications
        .update_status(id, request.status, by, request.comment)
        .await?;
    Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct DeadlineRequest {
    pub deadline: DateTime<Utc>,
    pub reason: Option<String>,
}

/// PATCH /applications/:id/deadline
pub async fn extend_deadline(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<DeadlineRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let application = state
        .applications
        .extend_deadline(id, request.deadline, request.reason, by)
        .await?;
    Ok(Json(application))
}

/// POST /applications/:id/complete
///
/// Multipart: `data` holds `{workDone, usedTools, otherTools}`, `images`
/// the photos of the finished work.
pub async fn complete_application(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let form = read_form::<CompletionInput>(multipart).await?;
    let (input, images) = form.store(&state).await?;
    let completed = state
        .applications
        .complete(id, input, images.urls(), by)
        .await;
    let application = images.settle(state.storage.as_ref(), completed).await?;
    Ok(Json(application))
}
