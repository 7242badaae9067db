//! Import job definitions and types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned by the backend when a job starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a backend-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Status of an import job as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job created but the worker has not picked it up yet.
    Ready,
    /// Job is importing files.
    #[default]
    Running,
    /// Job is paused on the backend.
    Paused,
    /// Job completed.
    Finished,
    /// Job ended with an error.
    Error,
    /// Job was stopped on request.
    Stopped,
    /// Status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Returns true if the backend will not make further progress on the job.
    ///
    /// Only `finished` and `error` end polling; every other status, including
    /// `stopped`, is polled again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }

    /// Returns the status as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file the backend has finished importing and can serve back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileToDownload {
    /// Path of the file relative to the destination folder.
    pub path: String,
    /// Per-file credential for the download endpoint.
    #[serde(rename = "token")]
    pub download_token: String,
}

impl FileToDownload {
    /// Returns the name to save the file under: the last `/` segment of its path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Latest known snapshot of a backend-tracked import.
///
/// Every poll replaces the whole snapshot; `files_to_download` is the full set
/// reported by the last poll, never a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJob {
    /// Identifier assigned on start. Never changes for the job's lifetime.
    pub session_id: SessionId,
    /// Backend status.
    pub status: JobStatus,
    /// Number of files processed so far.
    pub progress: u64,
    /// Number of files expected, once the backend has computed it.
    pub total: Option<u64>,
    /// Error messages in the order the backend reported them.
    pub errors: Vec<String>,
    /// Files available for download.
    pub files_to_download: Vec<FileToDownload>,
}

impl ImportJob {
    /// Creates an empty snapshot for a freshly started job.
    #[must_use]
    pub const fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            status: JobStatus::Running,
            progress: 0,
            total: None,
            errors: Vec::new(),
            files_to_download: Vec::new(),
        }
    }

    /// Returns the rounded completion percentage, clamped to 100.
    ///
    /// Returns `None` while the total is unknown or zero.
    #[must_use]
    pub fn progress_percent(&self) -> Option<u8> {
        let total = self.total.filter(|&t| t > 0)?;
        let percent = (self.progress as f64 / total as f64 * 100.0).round();
        Some(percent.min(100.0) as u8)
    }

    /// Returns true if the backend reported a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
