//! Tracker states and the view published to the front end.

use photoport_client::ClientError;
use photoport_types::{FileToDownload, ImportJob, JobStatus, SessionId, TwoFactorChallenge};
use std::fmt;

/// How a tracked job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// The backend reported `finished`.
    Finished,
    /// The backend reported `error`.
    Failed,
    /// The operator stopped the job.
    Stopped,
    /// The backend no longer knows the session.
    Expired,
}

impl TerminalState {
    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Expired => "expired",
        }
    }
}

/// Lifecycle state of the tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerState {
    /// No job, or the last attempt did not start one.
    #[default]
    Idle,
    /// The backend asked for a verification code.
    AwaitingTwoFactor,
    /// A job is running and its status is being polled.
    Polling,
    /// The job ended.
    Terminal(TerminalState),
}

impl TrackerState {
    /// Returns true if the job has ended.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::AwaitingTwoFactor => f.write_str("awaiting verification code"),
            Self::Polling => f.write_str("polling"),
            Self::Terminal(terminal) => f.write_str(terminal.as_str()),
        }
    }
}

/// Status line shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMessage {
    /// A start request is in flight.
    Connecting,
    /// The backend started the job.
    Started,
    /// The backend asked for a verification code.
    TwoFactorRequired,
    /// A verification code is being checked.
    ValidatingCode,
    /// The backend started the job after the code was accepted.
    StartedAfterTwoFactor,
    /// The backend did not accept the code.
    TwoFactorRejected(String),
    /// The job finished.
    Finished,
    /// The job ended with an error.
    Failed,
    /// The job was stopped.
    Stopped,
    /// The job was resumed.
    Resumed,
    /// The backend no longer knows the session.
    SessionNotFound,
    /// An in-flight request was cancelled.
    Interrupted,
    /// Free-form message from the backend.
    Backend(String),
    /// A request failed.
    Error(String),
}

impl StatusMessage {
    /// Maps a failed request to the message shown for it.
    #[must_use]
    pub fn from_error(error: &ClientError) -> Self {
        match error {
            ClientError::Cancelled => Self::Interrupted,
            ClientError::SessionNotFound => Self::SessionNotFound,
            other => Self::Error(other.user_message()),
        }
    }

    /// Returns true for messages that report a problem.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(
            self,
            Self::TwoFactorRejected(_) | Self::Failed | Self::SessionNotFound | Self::Error(_)
        )
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("Connecting..."),
            Self::Started => f.write_str("Import started. Tracking progress..."),
            Self::TwoFactorRequired => {
                f.write_str("Verification code required, enter the code sent to your device.")
            }
            Self::ValidatingCode => f.write_str("Validating verification code..."),
            Self::StartedAfterTwoFactor => {
                f.write_str("Import started after verification. Tracking progress...")
            }
            Self::TwoFactorRejected(detail) => write!(f, "Verification failed: {detail}"),
            Self::Finished => f.write_str("Import finished!"),
            Self::Failed => f.write_str("Error during import."),
            Self::Stopped => f.write_str("Import stopped."),
            Self::Resumed => f.write_str("Import resumed. Tracking progress..."),
            Self::SessionNotFound => f.write_str("Import session not found or expired."),
            Self::Interrupted => f.write_str("Import interrupted by user."),
            Self::Backend(message) | Self::Error(message) => f.write_str(message),
        }
    }
}

/// Everything the front end needs to render the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerView {
    /// Lifecycle state.
    pub state: TrackerState,
    /// Session id of the current job, once the backend assigned one.
    pub session_id: Option<SessionId>,
    /// Latest polled snapshot.
    pub job: Option<ImportJob>,
    /// Verification challenge, while one is pending.
    pub challenge: Option<TwoFactorChallenge>,
    /// Current status line.
    pub message: Option<StatusMessage>,
    /// True while a start or verification request is in flight.
    pub busy: bool,
}

impl TrackerView {
    /// Completion percentage of the latest snapshot, clamped to 100.
    #[must_use]
    pub fn progress_percent(&self) -> Option<u8> {
        self.job.as_ref().and_then(ImportJob::progress_percent)
    }

    /// Files offered for download by the latest snapshot.
    #[must_use]
    pub fn files(&self) -> &[FileToDownload] {
        self.job
            .as_ref()
            .map_or(&[], |job| job.files_to_download.as_slice())
    }

    /// Returns true if a stop request would be sent.
    ///
    /// Requires a session id and a job that has not ended, unless the backend
    /// already reports it `stopped`.
    #[must_use]
    pub fn can_stop(&self) -> bool {
        self.session_id.is_some()
            && !self.state.is_terminal()
            && self
                .job
                .as_ref()
                .is_none_or(|job| job.status != JobStatus::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StatusMessage::from_error(&ClientError::Cancelled),
            StatusMessage::Interrupted
        );
        assert_eq!(
            StatusMessage::from_error(&ClientError::SessionNotFound).to_string(),
            "Import session not found or expired."
        );
        let backend = ClientError::Backend {
            status: 500,
            detail: "boom".to_string(),
        };
        assert_eq!(StatusMessage::from_error(&backend).to_string(), "Error: boom");
    }

    #[test]
    fn test_can_stop() {
        let mut view = TrackerView::default();
        assert!(!view.can_stop());

        view.session_id = Some(SessionId::new("s-1"));
        view.state = TrackerState::Polling;
        assert!(view.can_stop());

        let mut job = ImportJob::new(SessionId::new("s-1"));
        job.status = JobStatus::Paused;
        view.job = Some(job.clone());
        assert!(view.can_stop());

        job.status = JobStatus::Stopped;
        view.job = Some(job);
        assert!(!view.can_stop());

        view.job = None;
        view.state = TrackerState::Terminal(TerminalState::Finished);
        assert!(!view.can_stop());
    }

    #[test]
    fn test_progress_percent_without_snapshot() {
        assert_eq!(TrackerView::default().progress_percent(), None);
        assert!(TrackerView::default().files().is_empty());
    }
}
