//! Read-only access to the deployment catalog

use async_trait::async_trait;
use tracing::debug;

use crate::errors::DeckhandError;
use crate::filesys::file::File;
use crate::models::catalog::{Catalog, Host, HostSelector, Repository, Script};

/// Source of repositories, hosts and declared scripts
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up a repository by id
    async fn get_repository(&self, id: &str) -> Result<Option<Repository>, DeckhandError>;

    /// Hosts matching the selector, in configured order
    async fn get_hosts(&self, selector: &HostSelector) -> Result<Vec<Host>, DeckhandError>;

    /// Look up a declared script by id
    async fn get_script(&self, id: &str) -> Result<Option<Script>, DeckhandError>;
}

/// Catalog backed by a JSON file, re-read on every call
#[derive(Debug, Clone)]
pub struct FileCatalog {
    file: File,
}

impl FileCatalog {
    pub fn new(file: File) -> Self {
        Self { file }
    }

    /// Load the catalog; an absent file is an empty catalog
    pub async fn load(&self) -> Result<Catalog, DeckhandError> {
        match self.file.read_json_opt::<Catalog>().await {
            Ok(Some(catalog)) => Ok(catalog),
            Ok(None) => {
                debug!("No catalog at {}, using an empty one", self.file.path().display());
                Ok(Catalog::default())
            }
            Err(e) => Err(DeckhandError::ConfigError(format!(
                "Unable to read catalog {}: {}",
                self.file.path().display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl CatalogStore for FileCatalog {
    async fn get_repository(&self, id: &str) -> Result<Option<Repository>, DeckhandError> {
        let catalog = self.load().await?;
        Ok(catalog.repositories.into_iter().find(|r| r.id == id))
    }

    async fn get_hosts(&self, selector: &HostSelector) -> Result<Vec<Host>, DeckhandError> {
        let catalog = self.load().await?;
        Ok(select_hosts(catalog.hosts, selector))
    }

    async fn get_script(&self, id: &str) -> Result<Option<Script>, DeckhandError> {
        let catalog = self.load().await?;
        Ok(catalog.scripts.into_iter().find(|s| s.id == id))
    }
}

/// In-memory catalog
#[async_trait]
impl CatalogStore for Catalog {
    async fn get_repository(&self, id: &str) -> Result<Option<Repository>, DeckhandError> {
        Ok(self.repositories.iter().find(|r| r.id == id).cloned())
    }

    async fn get_hosts(&self, selector: &HostSelector) -> Result<Vec<Host>, DeckhandError> {
        Ok(select_hosts(self.hosts.clone(), selector))
    }

    async fn get_script(&self, id: &str) -> Result<Option<Script>, DeckhandError> {
        Ok(self.scripts.iter().find(|s| s.id == id).cloned())
    }
}

fn select_hosts(hosts: Vec<Host>, selector: &HostSelector) -> Vec<Host> {
    match selector {
        HostSelector::All => hosts,
        HostSelector::One(id) => hosts.into_iter().filter(|h| &h.id == id).take(1).collect(),
    }
}
