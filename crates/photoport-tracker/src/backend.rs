//! Seam between the tracker and the import backend.

use async_trait::async_trait;
use photoport_client::{ClientError, JobClient, StartOutcome};
use photoport_types::{ImportJob, PendingCredentials, SessionId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Operations the tracker needs from the import backend.
///
/// Implemented by [`JobClient`]; tests substitute a scripted fake.
#[async_trait]
pub trait JobBackend: Send + Sync + 'static {
    /// Asks the backend to start an import.
    async fn start(
        &self,
        credentials: &PendingCredentials,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, ClientError>;

    /// Resends the start parameters with a verification code.
    async fn submit_two_factor_code(
        &self,
        credentials: &PendingCredentials,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, ClientError>;

    /// Asks the backend to stop a job.
    async fn stop(&self, session_id: &SessionId) -> Result<(), ClientError>;

    /// Asks the backend to resume a stopped job.
    async fn resume(&self, session_id: &SessionId, password: &str) -> Result<(), ClientError>;

    /// Fetches the current snapshot of a job.
    async fn poll_status(&self, session_id: &SessionId) -> Result<ImportJob, ClientError>;
}

#[async_trait]
impl JobBackend for JobClient {
    async fn start(
        &self,
        credentials: &PendingCredentials,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, ClientError> {
        Self::start(self, credentials, cancel).await
    }

    async fn submit_two_factor_code(
        &self,
        credentials: &PendingCredentials,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, ClientError> {
        Self::submit_two_factor_code(self, credentials, code, cancel).await
    }

    async fn stop(&self, session_id: &SessionId) -> Result<(), ClientError> {
        Self::stop(self, session_id).await
    }

    async fn resume(&self, session_id: &SessionId, password: &str) -> Result<(), ClientError> {
        Self::resume(self, session_id, password).await
    }

    async fn poll_status(&self, session_id: &SessionId) -> Result<ImportJob, ClientError> {
        Self::poll_status(self, session_id).await
    }
}

#[async_trait]
impl<B: JobBackend> JobBackend for Arc<B> {
    async fn start(
        &self,
        credentials: &PendingCredentials,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, ClientError> {
        (**self).start(credentials, cancel).await
    }

    async fn submit_two_factor_code(
        &self,
        credentials: &PendingCredentials,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<StartOutcome, ClientError> {
        (**self)
            .submit_two_factor_code(credentials, code, cancel)
            .await
    }

    async fn stop(&self, session_id: &SessionId) -> Result<(), ClientError> {
        (**self).stop(session_id).await
    }

    async fn resume(&self, session_id: &SessionId, password: &str) -> Result<(), ClientError> {
        (**self).resume(session_id, password).await
    }

    async fn poll_status(&self, session_id: &SessionId) -> Result<ImportJob, ClientError> {
        (**self).poll_status(session_id).await
    }
}
