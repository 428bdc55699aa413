//! Tool API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sd_core::traits::Id;
use sd_models::{NewTool, ToolStatus, ToolUpdate};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extractors::{ActorContext, AppState};

/// POST /tools
pub async fn create_tool(
    State(state): State<AppState>,
    actor: ActorContext,
    Json(new): Json<NewTool>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    let tool = state.tools.create(new).await?;
    Ok((StatusCode::CREATED, Json(tool)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolFilters {
    pub status: Option<ToolStatus>,
}

/// GET /tools
pub async fn list_tools(
    State(state): State<AppState>,
    actor: ActorContext,
    Query(filters): Query<ToolFilters>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    let tools = state.tools.list(filters.status).await?;
    Ok(Json(tools))
}

/// GET /tools/:id
pub async fn get_tool(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    Ok(Json(state.tools.find(id).await?))
}

/// GET /tools/:id/count
pub async fn tool_availability(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    Ok(Json(state.tools.availability(id).await?))
}

/// GET /tools/tag/:tag
pub async fn list_tools_by_tag(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(tag): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    Ok(Json(state.tools.list_by_tag(tag).await?))
}

/// GET /tools/tag/:tag/count
pub async fn count_tools_by_tag(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(tag): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    Ok(Json(state.tools.count_by_tag(tag).await?))
}

/// PATCH /tools/:id
pub async fn update_tool(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(update): Json<ToolUpdate>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    Ok(Json(state.tools.update(id, update).await?))
}

#[derive(Debug, Deserialize)]
pub struct DeductionRequest {
    pub quantity: i64,
    pub comment: Option<String>,
    pub reason: Option<String>,
}

/// PATCH /tools/:id/deduction
pub async fn deduct_tool(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<DeductionRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let tool = state
        .tools
        .deduct(id, request.quantity, by, request.comment, request.reason)
        .await?;
    Ok(Json(tool))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeactivateRequest {
    pub comment: Option<String>,
    pub reason: Option<String>,
}

/// PATCH /tools/:id/deactivate
pub async fn deactivate_tool(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<DeactivateRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let tool = state
        .tools
        .deactivate(id, by, request.comment, request.reason)
        .await?;
    Ok(Json(tool))
}
