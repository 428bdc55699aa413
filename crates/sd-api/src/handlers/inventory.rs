//! Inventory API handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sd_core::error::SdError;
use sd_core::traits::Id;
use sd_models::{
    Holder, HolderKind, InventoryFilter, InventoryStatus, InventoryUpdate, NewInventory, UsedTool,
};
use sd_services::InventoryStatusParams;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ActorContext, AppState, Pagination};
use crate::multipart::read_form;

/// POST /inventory
///
/// Multipart: `data` holds the device JSON, `images` its photos.
pub async fn create_inventory(
    State(state): State<AppState>,
    actor: ActorContext,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let form = read_form::<NewInventory>(multipart).await?;
    let (new, images) = form.store(&state).await?;
    let created = state.inventory.create(new, images.urls(), by).await;
    let inventory = images.settle(state.storage.as_ref(), created).await?;
    Ok((StatusCode::CREATED, Json(inventory)))
}

/// GET /inventory
///
/// Query: `status`, `branchId`, `search` plus paging.
pub async fn list_inventory(
    State(state): State<AppState>,
    actor: ActorContext,
    pagination: Pagination,
    Query(filter): Query<InventoryFilter>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    let page = state.inventory.list(&filter, pagination.0).await?;
    Ok(Json(page))
}

/// PATCH /inventory/:id
///
/// Multipart like creation; uploaded `images` replace the device photos.
pub async fn update_inventory(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let form = read_form::<InventoryUpdate>(multipart).await?;
    let (update, images) = form.store(&state).await?;
    let updated = state.inventory.update(id, update, images.urls(), by).await;
    let inventory = images.settle(state.storage.as_ref(), updated).await?;
    Ok(Json(inventory))
}

/// GET /inventory/:id
pub async fn get_inventory(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.inventory.find(id).await?))
}

/// GET /inventory/qr/:number
///
/// Lookup behind the printed QR code.
pub async fn get_inventory_by_number(
    State(state): State<AppState>,
    _actor: ActorContext,
    Path(number): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.inventory.find_by_number(&number).await?))
}

/// GET /inventory/:id/repair-history
pub async fn repair_history(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
) -> ApiResult<impl IntoResponse> {
    actor.require_staff()?;
    Ok(Json(state.inventory.repair_history(id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignInventoryRequest {
    pub user_id: Id,
    /// `user` or `employee`
    pub user_model: String,
    pub comment: Option<String>,
}

/// PATCH /inventory/:id/assign
pub async fn assign_inventory(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<AssignInventoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let kind: HolderKind = request
        .user_model
        .parse()
        .map_err(|e: String| ApiError::from(SdError::invalid("userModel", e)))?;
    let holder = Holder {
        kind,
        id: request.user_id,
    };
    let inventory = state
        .inventory
        .reassign(id, holder, by, request.comment)
        .await?;
    Ok(Json(inventory))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStatusRequest {
    pub status: InventoryStatus,
    pub comment: Option<String>,
    pub reason: Option<String>,
    #[serde(default)]
    pub used_tools: Vec<UsedTool>,
    pub write_off_reason: Option<String>,
}

impl From<InventoryStatusRequest> for InventoryStatusParams {
    fn from(request: InventoryStatusRequest) -> Self {
        InventoryStatusParams {
            status: Some(request.status),
            comment: request.comment,
            reason: request.reason,
            used_tools: request.used_tools,
            write_off_reason: request.write_off_reason,
        }
    }
}

/// PATCH /inventory/:id/status
pub async fn change_inventory_status(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<InventoryStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let inventory = state
        .inventory
        .change_status(id, by, request.into())
        .await?;
    Ok(Json(inventory))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDeductionRequest {
    pub used_tools: Vec<UsedTool>,
    pub write_off_reason: Option<String>,
    pub comment: Option<String>,
}

/// PATCH /inventory/:id/deduction
///
/// Writes off stock used on the device without changing its status.
pub async fn deduct_inventory_tools(
    State(state): State<AppState>,
    actor: ActorContext,
    Path(id): Path<Id>,
    Json(request): Json<InventoryDeductionRequest>,
) -> ApiResult<impl IntoResponse> {
    let by = actor.require_staff()?;
    let inventory = state
        .inventory
        .deduct_tools(
            id,
            by,
            request.used_tools,
            request.write_off_reason,
            request.comment,
        )
        .await?;
    Ok(Json(inventory))
}
