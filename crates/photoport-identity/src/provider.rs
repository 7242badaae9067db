//! Identity provider seams.

use crate::error::Result;
use crate::session::TokenGrant;
use async_trait::async_trait;

/// Credential produced by a third-party provider's interactive flow.
#[derive(Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    /// Provider identifier, e.g. `google.com`.
    pub provider_id: String,
    /// ID token issued by that provider.
    pub id_token: String,
}

impl std::fmt::Debug for FederatedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedCredential")
            .field("provider_id", &self.provider_id)
            .finish_non_exhaustive()
    }
}

/// Backend that verifies credentials and mints tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Signs in with email and password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<TokenGrant>;

    /// Exchanges a third-party credential for a session.
    async fn sign_in_with_idp(&self, credential: &FederatedCredential) -> Result<TokenGrant>;

    /// Mints a fresh bearer token from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

/// Interactive flow run by a third-party provider (popup, browser, prompt).
///
/// Implementations return [`IdentityError::Cancelled`](crate::IdentityError::Cancelled)
/// when the operator abandons the flow.
#[async_trait]
pub trait FederatedFlow: Send + Sync {
    /// Runs the flow and returns the provider's credential.
    async fn authorize(&self) -> Result<FederatedCredential>;
}
