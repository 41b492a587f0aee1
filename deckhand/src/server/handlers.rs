//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::deploy::orchestrator::DeployRequest;
use crate::errors::DeckhandError;
use crate::models::event::DeploymentEvent;
use crate::models::playbook::{Playbook, PlaybookMetadata};
use crate::server::auth::Caller;
use crate::server::error::ApiResult;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "deckhand".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    Json(version_info())
}

/// Deploy response
#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub success: bool,

    /// Event of the first host processed
    pub deployment: Option<DeploymentEvent>,

    /// Events of every host, in processing order
    pub deployments: Vec<DeploymentEvent>,
}

/// Runs the deployment before responding.
///
/// The run happens on its own task so a client that disconnects cannot
/// cancel it halfway and leave events `Pending`.
pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> ApiResult<Json<DeployResponse>> {
    let Json(request) =
        payload.map_err(|e| DeckhandError::ValidationError(e.body_text()))?;

    let deployer = Arc::clone(&state.deployer);
    let is_admin = caller.is_admin();
    let report = tokio::spawn(async move { deployer.deploy(request, is_admin).await })
        .await
        .map_err(|e| DeckhandError::Internal(format!("Deployment task failed: {}", e)))??;
    Ok(Json(DeployResponse {
        success: true,
        deployment: report.primary().cloned(),
        deployments: report.events,
    }))
}

pub async fn history_handler(
    State(state): State<Arc<ServerState>>,
    _caller: Caller,
    Path(host_id): Path<String>,
) -> ApiResult<Json<Vec<DeploymentEvent>>> {
    Ok(Json(state.store.list_history(&host_id).await?))
}

pub async fn logs_handler(
    State(state): State<Arc<ServerState>>,
    _caller: Caller,
    Path((host_id, event_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.store.get_logs(&host_id, &event_id).await?))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

pub async fn delete_log_handler(
    State(state): State<Arc<ServerState>>,
    caller: Caller,
    Path((host_id, event_id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    if !caller.is_admin() {
        return Err(DeckhandError::Forbidden("Admin access required".to_string()).into());
    }

    if !state.store.delete_event(&host_id, &event_id).await? {
        return Err(DeckhandError::NotFound(format!(
            "Event {} not found for host {}",
            event_id, host_id
        ))
        .into());
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: "Log deleted successfully".to_string(),
    }))
}

pub async fn playbooks_handler(
    State(state): State<Arc<ServerState>>,
    _caller: Caller,
) -> ApiResult<Json<Vec<Playbook>>> {
    Ok(Json(state.locator.list().await?))
}

#[derive(Debug, Serialize)]
pub struct PlaybookResponse {
    pub metadata: PlaybookMetadata,
    pub content: String,
}

pub async fn playbook_handler(
    State(state): State<Arc<ServerState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<PlaybookResponse>> {
    let (playbook, content) = state.locator.read(&id).await?;
    Ok(Json(PlaybookResponse {
        metadata: playbook.metadata,
        content,
    }))
}
