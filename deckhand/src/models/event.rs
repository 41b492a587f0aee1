//! Deployment event models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of one deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentStatus {
    Pending,
    Success,
    Failed,
}

impl DeploymentStatus {
    /// `Success` and `Failed` admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Success | DeploymentStatus::Failed)
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Success => write!(f, "Success"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// One recorded deployment attempt against one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    /// Unique within the host's history
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub timestamp: DateTime<Utc>,

    /// Repository identifier
    pub repository: String,

    pub host_id: String,

    /// Script or playbook identifier the run used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    pub status: DeploymentStatus,

    #[serde(default)]
    pub logs: Vec<String>,

    /// Transcript file name under the logs directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

/// Caller-supplied fields of an event about to be appended
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub name: Option<String>,
    pub repository: String,
    pub script: Option<String>,
}
