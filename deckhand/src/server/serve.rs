//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::DeckhandError;
use crate::server::handlers::{
    delete_log_handler, deploy_handler, health_handler, history_handler, logs_handler,
    playbook_handler, playbooks_handler, version_handler,
};
use crate::server::state::ServerState;
use crate::storage::settings::ServerSettings;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Deployments
        .route("/deploy", post(deploy_handler))
        .route("/history/{host_id}", get(history_handler))
        .route(
            "/logs/{host_id}/{event_id}",
            get(logs_handler).delete(delete_log_handler),
        )
        // Playbooks
        .route("/playbooks", get(playbooks_handler))
        .route("/playbooks/{id}", get(playbook_handler))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerSettings,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), DeckhandError>>, DeckhandError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeckhandError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeckhandError::ServerError(e.to_string()))
    });

    Ok(handle)
}
