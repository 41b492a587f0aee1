//! Service settings file

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Deckhand service settings
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Also write daily-rolling log files under the data directory
    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub execution: ExecutionSettings,
}

/// Local HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Static bearer tokens
#[derive(Debug, Default, Deserialize)]
pub struct AuthSettings {
    /// Token granting admin access. Unset means nobody is admin
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub admin_token: Option<SecretString>,

    /// Token granting read access
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub readonly_token: Option<SecretString>,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|t| !t.is_empty()).map(SecretString::from))
}

// Tokens are never written back out.
impl Serialize for AuthSettings {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AuthSettings", 2)?;
        state.serialize_field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))?;
        state.serialize_field(
            "readonly_token",
            &self.readonly_token.as_ref().map(|_| "<redacted>"),
        )?;
        state.end()
    }
}

/// Script execution settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Kill scripts running longer than this
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Program the script path is handed to, e.g. `/bin/sh`
    #[serde(default)]
    pub interpreter: Option<String>,
}

impl ExecutionSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
