//! Axum extractors for API handlers

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use sd_attachments::{FileStorage, UploadPolicy};
use sd_core::pagination::PaginationParams;
use sd_models::{Actor, ActorKind, ActorRef};
use sd_services::{ApplicationWorkflow, InventoryAssignmentLedger, ToolStockLedger};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_KIND_HEADER: &str = "x-actor-kind";
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub applications: Arc<ApplicationWorkflow>,
    pub tools: ToolStockLedger,
    pub inventory: Arc<InventoryAssignmentLedger>,
    pub storage: Arc<dyn FileStorage>,
    pub uploads: UploadPolicy,
}

impl AppState {
    pub fn new(
        applications: ApplicationWorkflow,
        inventory: InventoryAssignmentLedger,
        storage: Arc<dyn FileStorage>,
        uploads: UploadPolicy,
    ) -> Self {
        Self {
            tools: applications.tools().clone(),
            applications: Arc::new(applications),
            inventory: Arc::new(inventory),
            storage,
            uploads,
        }
    }
}

/// The caller, as identified by the authentication gateway.
///
/// `X-Actor-Id` and `X-Actor-Kind` are required; `X-Actor-Name` falls back
/// to `"<Kind> <id>"`.
#[derive(Debug, Clone)]
pub struct ActorContext(pub Actor);

impl ActorContext {
    pub fn require(&self, kind: ActorKind) -> Result<&Actor, ApiError> {
        if self.0.kind() == kind {
            Ok(&self.0)
        } else {
            Err(ApiError::forbidden(format!(
                "Only a {} may use this endpoint",
                kind
            )))
        }
    }

    /// Employees and admins
    pub fn require_staff(&self) -> Result<&Actor, ApiError> {
        match self.0.kind() {
            ActorKind::Employee | ActorKind::Admin => Ok(&self.0),
            ActorKind::User => Err(ApiError::forbidden("Only staff may use this endpoint")),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Actor identification required"))?
            .parse()
            .map_err(|_| ApiError::unauthorized("X-Actor-Id must be a number"))?;
        let kind: ActorKind = header(parts, ACTOR_KIND_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Actor identification required"))?
            .parse()
            .map_err(ApiError::unauthorized)?;
        let name = header(parts, ACTOR_NAME_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", kind, id));

        Ok(ActorContext(Actor::new(ActorRef { kind, id }, name)))
    }
}

impl std::ops::Deref for ActorContext {
    type Target = Actor;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `?limit=&offset=`; unreadable values fall back to the defaults
pub struct Pagination(pub PaginationParams);

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PaginationParams>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|_| Query(PaginationParams::default()));
        Ok(Pagination(params.normalized()))
    }
}
