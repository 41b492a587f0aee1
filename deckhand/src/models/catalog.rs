//! Deployment catalog: repositories, hosts and declared scripts

use serde::{Deserialize, Serialize};

/// A deployable source artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// A deployment target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    pub name: String,

    /// Script ids; the first one is the host's default deploy script
    #[serde(default)]
    pub scripts: Vec<String>,
}

impl Host {
    pub fn default_script(&self) -> Option<&str> {
        self.scripts.first().map(String::as_str)
    }
}

/// A script declared by path in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub id: String,
    pub name: String,
    pub path: String,
}

/// The full catalog file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub repositories: Vec<Repository>,

    #[serde(default)]
    pub hosts: Vec<Host>,

    #[serde(default)]
    pub scripts: Vec<Script>,
}

/// Which hosts a deploy request targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostSelector {
    All,
    One(String),
}

impl HostSelector {
    pub const ALL: &'static str = "all";

    pub fn parse(raw: &str) -> Self {
        if raw == Self::ALL {
            HostSelector::All
        } else {
            HostSelector::One(raw.to_string())
        }
    }
}

impl std::fmt::Display for HostSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostSelector::All => write!(f, "{}", Self::ALL),
            HostSelector::One(id) => write!(f, "{}", id),
        }
    }
}
