//! Playbook metadata header
//!
//! A playbook is a shell script whose leading comment lines carry a JSON
//! object after a `METADATA:` marker:
//!
//! ```text
//! #!/bin/bash
//! # METADATA: {"id": "deploy-prod", "name": "Deploy prod",
//! #   "description": "Rolls the prod fleet", "tags": ["prod"], "section": "web"}
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Number of leading lines searched for the marker
pub const HEADER_SCAN_LINES: usize = 16;

const MARKER: &str = "METADATA:";

/// Validated playbook metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub section: String,
}

/// Reasons a header fails to yield metadata
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("no METADATA header in the first {} lines", HEADER_SCAN_LINES)]
    Missing,

    #[error("METADATA header is not valid: {0}")]
    Malformed(String),

    #[error("METADATA field '{0}' is empty")]
    EmptyField(&'static str),
}

impl PlaybookMetadata {
    /// Parse the metadata header out of a script's content.
    ///
    /// The JSON object starts after the marker and may continue over the
    /// following comment lines; their leading `#` is stripped.
    pub fn from_script(content: &str) -> Result<Self, HeaderError> {
        let mut lines = content.lines().take(HEADER_SCAN_LINES);

        let first = lines
            .by_ref()
            .find_map(marker_payload)
            .ok_or(HeaderError::Missing)?;

        let mut block = first.to_string();
        loop {
            match serde_json::from_str::<PlaybookMetadata>(&block) {
                Ok(meta) => return meta.validated(),
                Err(e) if e.is_eof() => match lines.next().and_then(comment_body) {
                    Some(more) => {
                        block.push('\n');
                        block.push_str(more);
                    }
                    None => return Err(HeaderError::Malformed(e.to_string())),
                },
                Err(e) => return Err(HeaderError::Malformed(e.to_string())),
            }
        }
    }

    fn validated(self) -> Result<Self, HeaderError> {
        for (field, value) in [
            ("id", &self.id),
            ("name", &self.name),
            ("description", &self.description),
            ("section", &self.section),
        ] {
            if value.trim().is_empty() {
                return Err(HeaderError::EmptyField(field));
            }
        }
        Ok(self)
    }
}

fn comment_body(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix('#')
}

fn marker_payload(line: &str) -> Option<&str> {
    let body = comment_body(line)?.trim_start();
    body.strip_prefix(MARKER).map(str::trim_start)
}

/// A playbook found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playbook {
    #[serde(flatten)]
    pub metadata: PlaybookMetadata,
    pub path: PathBuf,
}
