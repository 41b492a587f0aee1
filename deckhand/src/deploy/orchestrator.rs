//! Deployment orchestrator
//!
//! Drives one deploy request across its hosts strictly one after another.
//! Input resolution failures abort the request before anything runs; a
//! failure while preparing or running one host's script only fails that
//! host's event.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use url::Url;

use crate::catalog::CatalogStore;
use crate::deploy::locator::{ResolvedScript, ScriptLocator};
use crate::deploy::runner::{is_valid_env_key, ExecutionEnvironment, ScriptRunner};
use crate::errors::DeckhandError;
use crate::history::store::{EventStore, StatusUpdate};
use crate::history::transcript::Transcript;
use crate::models::catalog::{Host, HostSelector, Repository};
use crate::models::event::{DeploymentEvent, DeploymentStatus, NewEvent};
use crate::utils::{is_valid_id, iso_timestamp, now_iso};

/// A request to deploy a repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub repository_id: String,

    /// A host id, or `"all"`
    #[serde(default, alias = "hostId")]
    pub host_selector: String,

    /// Playbook id; when absent each host's default declared script runs
    #[serde(default)]
    pub script_id: Option<String>,

    /// Extra environment variables for the script
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl DeployRequest {
    pub fn validate(&self) -> Result<(), DeckhandError> {
        if self.repository_id.trim().is_empty() {
            return Err(DeckhandError::ValidationError(
                "Missing required parameter: repositoryId".to_string(),
            ));
        }
        if self.host_selector.trim().is_empty() {
            return Err(DeckhandError::ValidationError(
                "Missing required parameter: hostSelector".to_string(),
            ));
        }
        if matches!(&self.script_id, Some(id) if id.trim().is_empty()) {
            return Err(DeckhandError::ValidationError(
                "scriptId must not be empty".to_string(),
            ));
        }
        if let Some(key) = self.args.keys().find(|k| !is_valid_env_key(k)) {
            return Err(DeckhandError::ValidationError(format!(
                "Invalid argument name: {}",
                key
            )));
        }
        Ok(())
    }
}

/// Events produced by one deploy request, in host processing order
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub events: Vec<DeploymentEvent>,
}

impl DeployReport {
    /// Event of the first host processed
    pub fn primary(&self) -> Option<&DeploymentEvent> {
        self.events.first()
    }
}

/// Runs deploy requests end to end
pub struct Deployer {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<EventStore>,
    locator: ScriptLocator,
    runner: Arc<dyn ScriptRunner>,
}

impl Deployer {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<EventStore>,
        locator: ScriptLocator,
        runner: Arc<dyn ScriptRunner>,
    ) -> Self {
        Self {
            catalog,
            store,
            locator,
            runner,
        }
    }

    /// Deploy `repository_id` to the selected hosts.
    ///
    /// `is_admin` comes from the caller's already-validated session.
    pub async fn deploy(
        &self,
        request: DeployRequest,
        is_admin: bool,
    ) -> Result<DeployReport, DeckhandError> {
        if !is_admin {
            return Err(DeckhandError::Forbidden(
                "Admin access required".to_string(),
            ));
        }
        request.validate()?;

        let repository = self
            .catalog
            .get_repository(&request.repository_id)
            .await?
            .ok_or_else(|| {
                DeckhandError::NotFound(format!("Repository {} not found", request.repository_id))
            })?;
        if !is_repository_address(&repository.url) {
            return Err(DeckhandError::ValidationError(format!(
                "Repository {} has an invalid url '{}'",
                repository.id, repository.url
            )));
        }

        let selector = HostSelector::parse(&request.host_selector);
        let hosts = self.catalog.get_hosts(&selector).await?;
        if hosts.is_empty() {
            return Err(DeckhandError::NotFound(format!(
                "No host matches {}",
                selector
            )));
        }
        if let Some(host) = hosts.iter().find(|h| !is_valid_id(&h.id)) {
            return Err(DeckhandError::ValidationError(format!(
                "Host id '{}' may only contain letters, digits, '.', '_' and '-'",
                host.id
            )));
        }

        info!(
            "Deploying {} to {} host(s) ({})",
            repository.id,
            hosts.len(),
            selector
        );

        let mut events = Vec::with_capacity(hosts.len());
        for host in &hosts {
            events.push(self.deploy_host(&request, &repository, host).await?);
        }

        Ok(DeployReport { events })
    }

    async fn deploy_host(
        &self,
        request: &DeployRequest,
        repository: &Repository,
        host: &Host,
    ) -> Result<DeploymentEvent, DeckhandError> {
        let script_label = request
            .script_id
            .clone()
            .or_else(|| host.default_script().map(str::to_string));

        let mut event = self
            .store
            .append_event(
                &host.id,
                NewEvent {
                    name: request.name.clone(),
                    repository: repository.id.clone(),
                    script: script_label,
                },
            )
            .await?;

        let started = format!("Deployment started at {}", iso_timestamp(event.timestamp));
        let transcript = Transcript::new(self.store.layout(), &host.id, &event.id);
        transcript.start(&started).await;

        let mut lines = vec![started];
        let status = match self.locate(request, host).await {
            Ok(script) => {
                let env = execution_environment(request, repository, host, &event, &script);
                let result = self.runner.run(&script.path, &env).await;
                lines.extend(result.output_lines());

                if result.succeeded {
                    info!("Deployment {} to host {} succeeded", event.id, host.id);
                    lines.push(format!("Deployment completed successfully at {}", now_iso()));
                    DeploymentStatus::Success
                } else {
                    let failure = DeckhandError::ExecutionError(result.failure_reason());
                    error!("Deployment {} to host {} failed: {}", event.id, host.id, failure);
                    lines.push(format!("Deployment failed: {}", failure));
                    lines.push(format!("Deployment failed at {}", now_iso()));
                    DeploymentStatus::Failed
                }
            }
            Err(e) => {
                warn!("Unable to prepare script for host {}: {}", host.id, e);
                lines.push(format!("Deployment failed: {}", e));
                lines.push(format!("Deployment failed at {}", now_iso()));
                DeploymentStatus::Failed
            }
        };

        match self
            .store
            .update_status(&host.id, &event.id, status, lines.clone())
            .await?
        {
            StatusUpdate::Applied => transcript.append(&lines[1..]).await,
            StatusUpdate::MissingEvent => {
                warn!(
                    "Deployment {} of host {} was deleted while running, its outcome was not recorded",
                    event.id, host.id
                );
            }
            StatusUpdate::AlreadyTerminal => {
                warn!(
                    "Deployment {} of host {} was already resolved, its outcome was not recorded",
                    event.id, host.id
                );
            }
        }

        event.status = status;
        event.logs = lines;
        Ok(event)
    }

    async fn locate(
        &self,
        request: &DeployRequest,
        host: &Host,
    ) -> Result<ResolvedScript, DeckhandError> {
        if let Some(script_id) = &request.script_id {
            return self.locator.prepare_playbook(script_id).await;
        }

        let script_id = host.default_script().ok_or_else(|| {
            DeckhandError::NotFound(format!("Host {} has no deploy script", host.id))
        })?;
        let script = self
            .catalog
            .get_script(script_id)
            .await?
            .ok_or_else(|| DeckhandError::NotFound(format!("Script {} not found", script_id)))?;
        self.locator.prepare_declared(&script).await
    }
}

/// A URL, or an scp-style git address such as `git@github.com:org/repo.git`
fn is_repository_address(raw: &str) -> bool {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return false;
    }
    if Url::parse(raw).is_ok() {
        return true;
    }
    match raw.split_once(':') {
        Some((host, path)) => {
            let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
            !host.is_empty() && !host.contains('/') && !path.is_empty()
        }
        None => false,
    }
}

/// Request arguments first, so the deployment variables always win
fn execution_environment(
    request: &DeployRequest,
    repository: &Repository,
    host: &Host,
    event: &DeploymentEvent,
    script: &ResolvedScript,
) -> ExecutionEnvironment {
    let mut env = ExecutionEnvironment::new().arg(repository.url.clone());
    for (key, value) in &request.args {
        env = env.var(key, value);
    }

    env = env
        .var("REPOSITORY_ID", &repository.id)
        .var("REPOSITORY_NAME", &repository.name)
        .var("REPOSITORY_URL", &repository.url)
        .var("HOST_ID", &host.id)
        .var("HOST_NAME", &host.name)
        .var("DEPLOYMENT_ID", &event.id)
        .var("SCRIPT_ID", &script.id)
        .var("TIMESTAMP", now_iso());
    if let Some(name) = &request.name {
        env = env.var("DEPLOYMENT_NAME", name);
    }
    env
}
