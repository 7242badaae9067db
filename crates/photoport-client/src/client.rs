//! HTTP client for the import backend.

use crate::url::{self, RESUME_PATH, START_PATH, STOP_PATH, TWO_FACTOR_PATH};
use crate::wire::{
    ResumeRequest, StartOutcome, StartRequest, StartResponse, StatusResponse, StopRequest,
    TwoFactorRequest, error_detail,
};
use bytes::Bytes;
use photoport_types::{ImportJob, NoToken, PendingCredentials, SessionId, TokenSource};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Backend used when no URL is configured at build or run time.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the job client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the import backend.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: option_env!("PHOTOPORT_API_URL")
                .unwrap_or(DEFAULT_BASE_URL)
                .to_string(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("photoport/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Errors returned by backend calls.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call was cancelled before it settled.
    #[error("Request cancelled")]
    Cancelled,

    /// The backend answered with a non-success status.
    #[error("Server error {status}: {detail}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// `detail` or `message` from the error body.
        detail: String,
    },

    /// The status endpoint does not know the session.
    #[error("Import session not found or expired")]
    SessionNotFound,

    /// The configured base URL cannot be used.
    #[error("Invalid backend URL '{0}'")]
    InvalidBaseUrl(String),

    /// The backend answered with a body this client cannot read.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns true if the call was cancelled from outside.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the text shown to the operator for this error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "Import interrupted by user.".to_string(),
            Self::Backend { detail, .. } => format!("Error: {detail}"),
            Self::SessionNotFound => "Import session not found or expired.".to_string(),
            Self::Http(e) => format!("Error while contacting the server: {e}"),
            Self::InvalidBaseUrl(_) | Self::Decode(_) => {
                format!("Error while contacting the server: {self}")
            }
        }
    }
}

/// Result type for job client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Stateless wrapper around the import backend's endpoints.
///
/// Every request carries `Authorization: Bearer <token>` when the token source
/// yields a token. The underlying client keeps a cookie store so the start and
/// verification calls can carry the backend's session cookies.
#[derive(Clone)]
pub struct JobClient {
    http: Client,
    base_url: Url,
    config: ClientConfig,
    tokens: Arc<dyn TokenSource>,
}

impl fmt::Debug for JobClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobClient")
            .field("base_url", &self.base_url.as_str())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl JobClient {
    /// Creates a new client that takes bearer tokens from `tokens`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| ClientError::InvalidBaseUrl(config.base_url.clone()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
        }

        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
            tokens,
        })
    }

    /// Creates a client that never sends an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be created.
    pub fn unauthenticated(config: ClientConfig) -> Result<Self> {
        Self::new(config, Arc::new(NoToken))
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts an import for the given cloud account.
    ///
    /// The destination folder is sent with backslashes turned into forward
    /// slashes. Settles with [`ClientError::Cancelled`] as soon as `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or
    /// cancellation.
    pub async fn start(
        &self,
        credentials: &PendingCredentials,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome> {
        let url = self.endpoint(&[START_PATH])?;
        debug!(email = %credentials.email, limit = ?credentials.limit, "starting import");
        let body = StartRequest::new(credentials);
        cancellable(cancel, self.post_for_outcome(url, &body)).await
    }

    /// Submits a verification code for the job set up by the previous
    /// [`start`](Self::start) call.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or
    /// cancellation.
    pub async fn submit_two_factor_code(
        &self,
        credentials: &PendingCredentials,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome> {
        let url = self.endpoint(&[TWO_FACTOR_PATH])?;
        debug!(email = %credentials.email, "submitting verification code");
        let body = TwoFactorRequest::new(credentials, code);
        cancellable(cancel, self.post_for_outcome(url, &body)).await
    }

    /// Asks the backend to stop a running import.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    pub async fn stop(&self, session_id: &SessionId) -> Result<()> {
        let url = self.endpoint(&[STOP_PATH])?;
        debug!(%session_id, "stopping import");
        let response = self.post(url, &StopRequest { session_id }).await?;
        check_status(response).await?;
        Ok(())
    }

    /// Asks the backend to resume a stopped or paused import.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    pub async fn resume(&self, session_id: &SessionId, password: &str) -> Result<()> {
        let url = self.endpoint(&[RESUME_PATH])?;
        debug!(%session_id, "resuming import");
        let response = self
            .post(url, &ResumeRequest {
                session_id,
                password,
            })
            .await?;
        check_status(response).await?;
        Ok(())
    }

    /// Fetches the latest snapshot of an import.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionNotFound`] if the backend answers 404,
    /// or another error on transport failure or non-success status.
    pub async fn poll_status(&self, session_id: &SessionId) -> Result<ImportJob> {
        let url = url::status_url(&self.base_url, session_id.as_str())
            .ok_or_else(|| ClientError::InvalidBaseUrl(self.config.base_url.clone()))?;
        let response = self.authorize(self.http.get(url)).await.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::SessionNotFound);
        }

        let body = check_status(response).await?.bytes().await?;
        let snapshot: StatusResponse = serde_json::from_slice(&body)?;
        Ok(snapshot.into_job(session_id.clone()))
    }

    /// Downloads one imported file, returning its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    pub async fn download(&self, session_id: &SessionId, download_token: &str) -> Result<Bytes> {
        let url = url::download_url(&self.base_url, session_id.as_str(), download_token)
            .ok_or_else(|| ClientError::InvalidBaseUrl(self.config.base_url.clone()))?;
        debug!(%session_id, "downloading file");
        let response = self.authorize(self.http.get(url)).await.send().await?;
        Ok(check_status(response).await?.bytes().await?)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        url::endpoint(&self.base_url, segments)
            .ok_or_else(|| ClientError::InvalidBaseUrl(self.config.base_url.clone()))
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<Response> {
        let request = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        Ok(self.authorize(request).await.send().await?)
    }

    async fn post_for_outcome<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<StartOutcome> {
        let response = self.post(url, body).await?;
        let bytes = check_status(response).await?.bytes().await?;
        let parsed: StartResponse = serde_json::from_slice(&bytes)?;
        Ok(parsed.into_outcome())
    }
}

/// Races `future` against `cancel`, settling with [`ClientError::Cancelled`]
/// if the token fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ClientError::Cancelled),
        result = future => result,
    }
}

/// Turns a non-success response into [`ClientError::Backend`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let detail = error_detail(&body).unwrap_or_else(|| format!("HTTP error! status: {status}"));
    Err(ClientError::Backend {
        status: status.as_u16(),
        detail,
    })
}
