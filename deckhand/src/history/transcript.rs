//! Human-readable run transcripts
//!
//! A transcript mirrors an event's log lines into a plain text file. The
//! event store stays authoritative, so write failures are only logged.

use tracing::warn;

use crate::filesys::file::File;
use crate::storage::layout::StorageLayout;

#[derive(Debug, Clone)]
pub struct Transcript {
    file: File,
}

impl Transcript {
    pub fn new(layout: &StorageLayout, host_id: &str, event_id: &str) -> Self {
        Self {
            file: layout.transcript_file(host_id, event_id),
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Create the transcript with its first line
    pub async fn start(&self, first_line: &str) {
        let header = format!("{}\n", first_line);
        if let Err(e) = self.file.write_string(&header).await {
            warn!("Unable to create transcript {}: {}", self.file.path().display(), e);
        }
    }

    /// Append lines
    pub async fn append(&self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let mut text = lines.join("\n");
        text.push('\n');
        if let Err(e) = self.file.append_string(&text).await {
            warn!("Unable to write transcript {}: {}", self.file.path().display(), e);
        }
    }
}
