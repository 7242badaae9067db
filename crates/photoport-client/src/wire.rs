//! JSON bodies exchanged with the import backend.

use photoport_types::{FileToDownload, ImportJob, JobStatus, PendingCredentials, SessionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message the backend sends instead of a session id when a code is needed.
pub const TWO_FACTOR_REQUIRED: &str = "2FA required";

/// Body of `POST /start`.
#[derive(Debug, Serialize)]
pub(crate) struct StartRequest<'a> {
    email: &'a str,
    password: &'a str,
    destination_folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl<'a> StartRequest<'a> {
    pub(crate) fn new(credentials: &'a PendingCredentials) -> Self {
        Self {
            email: &credentials.email,
            password: &credentials.password,
            destination_folder: credentials.normalized_destination(),
            limit: credentials.limit.as_option(),
        }
    }
}

/// Body of `POST /2fa`.
#[derive(Debug, Serialize)]
pub(crate) struct TwoFactorRequest<'a> {
    email: &'a str,
    password: &'a str,
    code: &'a str,
    destination_folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl<'a> TwoFactorRequest<'a> {
    pub(crate) fn new(credentials: &'a PendingCredentials, code: &'a str) -> Self {
        Self {
            email: &credentials.email,
            password: &credentials.password,
            code,
            destination_folder: credentials.normalized_destination(),
            limit: credentials.limit.as_option(),
        }
    }
}

/// Body of `POST /stop`.
#[derive(Debug, Serialize)]
pub(crate) struct StopRequest<'a> {
    pub(crate) session_id: &'a SessionId,
}

/// Body of `POST /resume`.
#[derive(Debug, Serialize)]
pub(crate) struct ResumeRequest<'a> {
    pub(crate) session_id: &'a SessionId,
    pub(crate) password: &'a str,
}

/// Result of a start or verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The backend started the job.
    Started(SessionId),
    /// The backend needs a verification code first.
    TwoFactorRequired,
    /// The backend answered with a message and no job.
    Message(String),
}

/// Success body of `POST /start` and `POST /2fa`.
#[derive(Debug, Deserialize)]
pub(crate) struct StartResponse {
    session_id: Option<SessionId>,
    message: Option<String>,
    detail: Option<Value>,
    #[serde(alias = "requires2FA")]
    requires_2fa: Option<bool>,
}

impl StartResponse {
    pub(crate) fn into_outcome(self) -> StartOutcome {
        if let Some(id) = self.session_id {
            return StartOutcome::Started(id);
        }
        if self.requires_2fa == Some(true) || self.message.as_deref() == Some(TWO_FACTOR_REQUIRED)
        {
            return StartOutcome::TwoFactorRequired;
        }
        let text = self
            .detail
            .as_ref()
            .and_then(value_text)
            .or(self.message)
            .unwrap_or_default();
        StartOutcome::Message(text)
    }
}

/// Success body of `GET /status/{session_id}`.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    status: JobStatus,
    progress: Option<u64>,
    total: Option<u64>,
    errors: Option<Vec<String>>,
    files_to_download: Option<Vec<FileToDownload>>,
}

impl StatusResponse {
    pub(crate) fn into_job(self, session_id: SessionId) -> ImportJob {
        ImportJob {
            session_id,
            status: self.status,
            progress: self.progress.unwrap_or(0),
            total: self.total,
            errors: self.errors.unwrap_or_default(),
            // An absent list means no files; each snapshot replaces the last.
            files_to_download: self.files_to_download.unwrap_or_default(),
        }
    }
}

/// Extracts the `detail` or `message` field from a JSON error body.
pub(crate) fn error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("detail")
        .and_then(value_text)
        .or_else(|| value.get("message").and_then(value_text))
}

/// Renders a JSON field for display: strings verbatim, anything else as JSON.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use photoport_types::ImportLimit;
    use serde_json::json;

    fn outcome(body: Value) -> StartOutcome {
        serde_json::from_value::<StartResponse>(body)
            .unwrap()
            .into_outcome()
    }

    #[test]
    fn test_start_request_normalizes_destination() {
        let creds = PendingCredentials::new("a@b.com", "x", "C:\\Photos", ImportLimit::Files(50));
        let body = serde_json::to_value(StartRequest::new(&creds)).unwrap();
        assert_eq!(
            body,
            json!({
                "email": "a@b.com",
                "password": "x",
                "destination_folder": "C:/Photos",
                "limit": 50,
            })
        );
    }

    #[test]
    fn test_start_request_omits_limit_for_full_import() {
        let creds = PendingCredentials::new("a@b.com", "x", "/photos", ImportLimit::All);
        let body = serde_json::to_value(StartRequest::new(&creds)).unwrap();
        assert!(body.get("limit").is_none());
    }

    #[test]
    fn test_two_factor_request_reuses_job_options() {
        let creds = PendingCredentials::new("a@b.com", "x", "C:\\Photos", ImportLimit::Files(500));
        let body = serde_json::to_value(TwoFactorRequest::new(&creds, "123456")).unwrap();
        assert_eq!(body["code"], "123456");
        assert_eq!(body["destination_folder"], "C:/Photos");
        assert_eq!(body["limit"], 500);
    }

    #[test]
    fn test_start_outcomes() {
        assert_eq!(
            outcome(json!({"message": "Import lancé.", "session_id": "s-1"})),
            StartOutcome::Started(SessionId::new("s-1"))
        );
        assert_eq!(
            outcome(json!({"message": "2FA required"})),
            StartOutcome::TwoFactorRequired
        );
        assert_eq!(
            outcome(json!({"requires2FA": true})),
            StartOutcome::TwoFactorRequired
        );
        assert_eq!(
            outcome(json!({"message": "Import completed"})),
            StartOutcome::Message("Import completed".to_string())
        );
        assert_eq!(
            outcome(json!({"detail": "Invalid code"})),
            StartOutcome::Message("Invalid code".to_string())
        );
    }

    #[test]
    fn test_status_response_defaults() {
        let response: StatusResponse =
            serde_json::from_value(json!({"status": "running", "progress": 3, "total": null}))
                .unwrap();
        let job = response.into_job(SessionId::new("s-1"));
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 3);
        assert_eq!(job.total, None);
        assert!(job.errors.is_empty());
        assert!(job.files_to_download.is_empty());
    }

    #[test]
    fn test_status_response_full() {
        let response: StatusResponse = serde_json::from_value(json!({
            "status": "finished",
            "progress": 2,
            "total": 2,
            "errors": ["IMG_1.HEIC: timeout"],
            "files_to_download": [{"path": "2024/IMG_2.JPG", "token": "t2"}],
        }))
        .unwrap();
        let job = response.into_job(SessionId::new("s-1"));
        assert!(job.is_terminal());
        assert_eq!(job.errors, vec!["IMG_1.HEIC: timeout".to_string()]);
        assert_eq!(job.files_to_download[0].download_token, "t2");
    }

    #[test]
    fn test_error_detail_prefers_detail() {
        let body = br#"{"detail": "Session non trouvee", "message": "ignored"}"#;
        assert_eq!(error_detail(body).as_deref(), Some("Session non trouvee"));

        let body = br#"{"message": "Bad request"}"#;
        assert_eq!(error_detail(body).as_deref(), Some("Bad request"));

        let body = br#"{"detail": [{"loc": ["body", "email"], "msg": "field required"}]}"#;
        assert!(error_detail(body).unwrap().contains("field required"));

        assert_eq!(error_detail(b"<html>502</html>"), None);
    }
}
