//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::DeckhandError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Where deckhand keeps its files
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Service settings file
    pub fn config_file(&self) -> File {
        File::new(self.base_dir.join("deckhand.json"))
    }

    /// Catalog of repositories, hosts and scripts
    pub fn catalog_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Per-host event histories
    pub fn history_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("history"))
    }

    /// Get the history file for a host. `host_id` must pass `is_valid_id`
    pub fn history_file(&self, host_id: &str) -> File {
        self.history_dir().file(&format!("{}.json", host_id))
    }

    /// Run transcripts
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Transcript file name for one run
    pub fn transcript_name(host_id: &str, event_id: &str) -> String {
        format!("{}_{}.log", host_id, event_id)
    }

    /// Transcript file for one run
    pub fn transcript_file(&self, host_id: &str, event_id: &str) -> File {
        self.logs_dir()
            .file(&Self::transcript_name(host_id, event_id))
    }

    /// Service log output
    pub fn service_log_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs").join("service"))
    }

    /// Playbooks addressed by their metadata id
    pub fn playbooks_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("playbooks"))
    }

    /// Scripts declared by path in the catalog
    pub fn scripts_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("deploy-scripts"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), DeckhandError> {
        self.history_dir().create().await?;
        self.logs_dir().create().await?;
        self.playbooks_dir().create().await?;
        self.scripts_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/var/lib/deckhand");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".deckhand");

        Self::new(base_dir)
    }
}
