//! Main application run loop

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::catalog::FileCatalog;
use crate::deploy::locator::ScriptLocator;
use crate::deploy::orchestrator::Deployer;
use crate::deploy::runner::ProcessRunner;
use crate::errors::DeckhandError;
use crate::history::store::EventStore;
use crate::server::auth::AccessTokens;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;

/// Build the shared state from settings and the storage layout
pub fn build_state(settings: Settings, layout: StorageLayout) -> Arc<ServerState> {
    let store = Arc::new(EventStore::new(layout.clone()));
    let locator = ScriptLocator::from_layout(&layout);
    let catalog = Arc::new(FileCatalog::new(layout.catalog_file()));
    let runner = Arc::new(ProcessRunner::new(
        settings.execution.interpreter.as_ref().map(PathBuf::from),
        settings.execution.timeout(),
    ));

    let deployer = Arc::new(Deployer::new(
        catalog,
        store.clone(),
        locator.clone(),
        runner,
    ));

    Arc::new(ServerState::new(
        deployer,
        store,
        locator,
        AccessTokens::from_settings(settings.auth),
    ))
}

/// Run deckhand until the shutdown signal resolves
pub async fn run(
    settings: Settings,
    layout: StorageLayout,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeckhandError> {
    info!("Initializing deckhand in {}", layout.base_dir.display());
    layout.setup().await?;

    let server_settings = settings.server.clone();
    let state = build_state(settings, layout);

    let handle = serve(&server_settings, state, shutdown_signal).await?;
    match handle.await {
        Ok(result) => {
            info!("HTTP server stopped");
            result
        }
        Err(e) => {
            error!("HTTP server task failed: {}", e);
            Err(DeckhandError::ServerError(e.to_string()))
        }
    }
}
