//! Event store
//!
//! One JSON file per host holds that host's events, newest first. Every
//! mutation is a read-modify-write of the whole file, serialized by a
//! per-host async mutex so concurrent requests cannot lose updates.
//!
//! Host ids name the history files directly, so ids outside
//! `[A-Za-z0-9._-]` are rejected with a `ValidationError`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::errors::DeckhandError;
use crate::filesys::file::File;
use crate::models::event::{DeploymentEvent, DeploymentStatus, NewEvent};
use crate::storage::layout::StorageLayout;
use crate::utils::{generate_uuid, is_valid_id};

/// Returned by `get_logs` when there is nothing to show
pub const NO_LOGS_PLACEHOLDER: &str = "No logs available";

/// Outcome of `update_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,

    /// No event with that id in the host's history
    MissingEvent,

    /// The event already reached `Success` or `Failed` and was left as is
    AlreadyTerminal,
}

#[derive(Debug, Default)]
struct HostLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl HostLocks {
    fn get(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }
}

/// Durable per-host event history
#[derive(Debug)]
pub struct EventStore {
    layout: StorageLayout,
    locks: HostLocks,
}

impl EventStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            locks: HostLocks::default(),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Full history of a host, newest first. No history yet is an empty list
    pub async fn list_history(&self, host_id: &str) -> Result<Vec<DeploymentEvent>, DeckhandError> {
        self.read(host_id).await
    }

    /// Look up one event
    pub async fn get_event(
        &self,
        host_id: &str,
        event_id: &str,
    ) -> Result<Option<DeploymentEvent>, DeckhandError> {
        let history = self.read(host_id).await?;
        Ok(history.into_iter().find(|e| e.id == event_id))
    }

    /// Record a new `Pending` event at the head of the host's history
    pub async fn append_event(
        &self,
        host_id: &str,
        new_event: NewEvent,
    ) -> Result<DeploymentEvent, DeckhandError> {
        let lock = self.lock(host_id)?;
        let _guard = lock.lock().await;

        let mut history = self.read(host_id).await?;

        let mut id = generate_uuid();
        while history.iter().any(|e| e.id == id) {
            id = generate_uuid();
        }

        let event = DeploymentEvent {
            log_file: Some(StorageLayout::transcript_name(host_id, &id)),
            id,
            name: new_event.name,
            timestamp: Utc::now(),
            repository: new_event.repository,
            host_id: host_id.to_string(),
            script: new_event.script,
            status: DeploymentStatus::Pending,
            logs: Vec::new(),
        };

        history.insert(0, event.clone());
        self.write(host_id, &history).await?;

        info!("Recorded deployment event {} for host {}", event.id, host_id);
        Ok(event)
    }

    /// Set an event's status and append log lines.
    ///
    /// A missing event or one already in a terminal state is left untouched
    /// and reported through the returned value rather than as an error.
    pub async fn update_status(
        &self,
        host_id: &str,
        event_id: &str,
        status: DeploymentStatus,
        additional_logs: Vec<String>,
    ) -> Result<StatusUpdate, DeckhandError> {
        let lock = self.lock(host_id)?;
        let _guard = lock.lock().await;

        let mut history = self.read(host_id).await?;

        let Some(event) = history.iter_mut().find(|e| e.id == event_id) else {
            warn!("Event {} not found in history of host {}, update skipped", event_id, host_id);
            return Ok(StatusUpdate::MissingEvent);
        };

        if event.status.is_terminal() {
            warn!(
                "Event {} of host {} is already {}, ignoring update to {}",
                event_id, host_id, event.status, status
            );
            return Ok(StatusUpdate::AlreadyTerminal);
        }

        event.status = status;
        event.logs.extend(additional_logs);
        self.write(host_id, &history).await?;

        debug!("Event {} of host {} is now {}", event_id, host_id, status);
        Ok(StatusUpdate::Applied)
    }

    /// Log lines of an event, or a single placeholder line when absent
    pub async fn get_logs(&self, host_id: &str, event_id: &str) -> Result<Vec<String>, DeckhandError> {
        let logs = self
            .get_event(host_id, event_id)
            .await?
            .map(|e| e.logs)
            .unwrap_or_else(|| vec![NO_LOGS_PLACEHOLDER.to_string()]);
        Ok(logs)
    }

    /// Remove an event and its transcript. Returns whether an event was removed
    pub async fn delete_event(&self, host_id: &str, event_id: &str) -> Result<bool, DeckhandError> {
        let lock = self.lock(host_id)?;
        let _guard = lock.lock().await;

        let mut history = self.read(host_id).await?;
        let before = history.len();
        history.retain(|e| e.id != event_id);
        if history.len() == before {
            return Ok(false);
        }
        self.write(host_id, &history).await?;

        let transcript = self.layout.transcript_file(host_id, event_id);
        if let Err(e) = transcript.delete().await {
            warn!("Unable to delete transcript {}: {}", transcript.path().display(), e);
        }

        info!("Deleted deployment event {} of host {}", event_id, host_id);
        Ok(true)
    }

    fn lock(&self, host_id: &str) -> Result<Arc<tokio::sync::Mutex<()>>, DeckhandError> {
        check_host_id(host_id)?;
        Ok(self.locks.get(host_id))
    }

    fn file(&self, host_id: &str) -> File {
        self.layout.history_file(host_id)
    }

    async fn read(&self, host_id: &str) -> Result<Vec<DeploymentEvent>, DeckhandError> {
        check_host_id(host_id)?;
        let mut history = self
            .file(host_id)
            .read_json_opt::<Vec<DeploymentEvent>>()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| {
                DeckhandError::PersistenceError(format!(
                    "Unable to read history of host {}: {}",
                    host_id, e
                ))
            })?;

        let before = history.len();
        history.retain(|e| e.host_id == host_id);
        if history.len() != before {
            warn!(
                "Ignored {} event(s) of other hosts in the history of host {}",
                before - history.len(),
                host_id
            );
        }
        Ok(history)
    }

    async fn write(&self, host_id: &str, history: &[DeploymentEvent]) -> Result<(), DeckhandError> {
        self.file(host_id).write_json(&history).await.map_err(|e| {
            DeckhandError::PersistenceError(format!(
                "Unable to write history of host {}: {}",
                host_id, e
            ))
        })
    }
}

fn check_host_id(host_id: &str) -> Result<(), DeckhandError> {
    if is_valid_id(host_id) {
        Ok(())
    } else {
        Err(DeckhandError::ValidationError(format!(
            "Invalid host id '{}': only letters, digits, '.', '_' and '-' are allowed",
            host_id
        )))
    }
}
