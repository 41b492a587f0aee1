//! Script locator
//!
//! Playbooks are addressed by the id in their metadata header, not by file
//! name, so every lookup scans the playbook directory. Files without a
//! valid header are skipped.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::errors::DeckhandError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::catalog::Script;
use crate::models::playbook::{Playbook, PlaybookMetadata};
use crate::storage::layout::StorageLayout;

const PLAYBOOK_EXTENSION: &str = "sh";

/// A script ready to be handed to the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScript {
    pub id: String,
    pub path: PathBuf,

    /// Present for playbooks, absent for catalog-declared scripts
    pub metadata: Option<PlaybookMetadata>,
}

/// Finds playbooks and declared scripts on disk
#[derive(Debug, Clone)]
pub struct ScriptLocator {
    playbooks_dir: Dir,
    base_dir: PathBuf,
}

impl ScriptLocator {
    /// `base_dir` anchors relative paths of catalog-declared scripts
    pub fn new(playbooks_dir: Dir, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            playbooks_dir,
            base_dir: base_dir.into(),
        }
    }

    pub fn from_layout(layout: &StorageLayout) -> Self {
        Self::new(layout.playbooks_dir(), layout.base_dir.clone())
    }

    /// Every playbook with a valid header, sorted by id
    pub async fn list(&self) -> Result<Vec<Playbook>, DeckhandError> {
        let mut playbooks = Vec::new();
        for path in self.candidates().await? {
            if let Some(playbook) = inspect(&path).await {
                playbooks.push(playbook);
            }
        }
        playbooks.sort_by(|a, b| a.metadata.id.cmp(&b.metadata.id));
        debug!("Found {} valid playbooks", playbooks.len());
        Ok(playbooks)
    }

    /// Find the playbook whose header id equals `script_id`
    pub async fn resolve(&self, script_id: &str) -> Result<Playbook, DeckhandError> {
        for path in self.candidates().await? {
            if let Some(playbook) = inspect(&path).await {
                if playbook.metadata.id == script_id {
                    return Ok(playbook);
                }
            }
        }
        Err(DeckhandError::NotFound(format!("Playbook {} not found", script_id)))
    }

    /// Playbook plus its full content
    pub async fn read(&self, script_id: &str) -> Result<(Playbook, String), DeckhandError> {
        let playbook = self.resolve(script_id).await?;
        let content = File::new(&playbook.path).read_string().await?;
        Ok((playbook, content))
    }

    /// Resolve a playbook and mark it executable
    pub async fn prepare_playbook(&self, script_id: &str) -> Result<ResolvedScript, DeckhandError> {
        let playbook = self.resolve(script_id).await?;
        mark_executable(&playbook.path).await?;
        Ok(ResolvedScript {
            id: playbook.metadata.id.clone(),
            path: playbook.path,
            metadata: Some(playbook.metadata),
        })
    }

    /// Check a catalog-declared script exists and mark it executable
    pub async fn prepare_declared(&self, script: &Script) -> Result<ResolvedScript, DeckhandError> {
        let declared = Path::new(&script.path);
        let path = if declared.is_absolute() {
            declared.to_path_buf()
        } else {
            self.base_dir.join(declared)
        };

        if !File::new(&path).exists().await {
            return Err(DeckhandError::NotFound(format!(
                "Script {} not found at {}",
                script.id,
                path.display()
            )));
        }

        mark_executable(&path).await?;
        Ok(ResolvedScript {
            id: script.id.clone(),
            path,
            metadata: None,
        })
    }

    async fn candidates(&self) -> Result<Vec<PathBuf>, DeckhandError> {
        let files = self.playbooks_dir.list_files().await?;
        Ok(files
            .into_iter()
            .filter(|p| p.extension().is_some_and(|ext| ext == PLAYBOOK_EXTENSION))
            .collect())
    }
}

async fn inspect(path: &Path) -> Option<Playbook> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("Unable to read {}: {}", path.display(), e);
            return None;
        }
    };

    match PlaybookMetadata::from_script(&content) {
        Ok(metadata) => Some(Playbook {
            metadata,
            path: path.to_path_buf(),
        }),
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            None
        }
    }
}

async fn mark_executable(path: &Path) -> Result<(), DeckhandError> {
    File::new(path).set_permissions_755().await
}
