//! Server state

use std::sync::Arc;

use crate::deploy::locator::ScriptLocator;
use crate::deploy::orchestrator::Deployer;
use crate::history::store::EventStore;
use crate::server::auth::AccessTokens;

/// Server state shared across handlers
pub struct ServerState {
    pub deployer: Arc<Deployer>,
    pub store: Arc<EventStore>,
    pub locator: ScriptLocator,
    pub tokens: AccessTokens,
}

impl ServerState {
    pub fn new(
        deployer: Arc<Deployer>,
        store: Arc<EventStore>,
        locator: ScriptLocator,
        tokens: AccessTokens,
    ) -> Self {
        Self {
            deployer,
            store,
            locator,
            tokens,
        }
    }
}
