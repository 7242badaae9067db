//! Interactive sign-in against the identity service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use photoport_lib::{
    FederatedCredential, FederatedFlow, IdentityError, IdentityGateway, IdentityProvider,
    SessionInfo,
};
use tracing::warn;

/// How the operator signs in before starting an import.
pub(crate) enum SignIn {
    /// Email and password; the email is prompted if absent.
    Password(Option<String>),
    /// Third-party provider, by provider ID.
    Federated(String),
    /// No sign-in; requests go out without a bearer token.
    Anonymous,
}

/// Federated flow that asks the operator to paste the provider's ID token.
struct PromptFlow {
    provider_id: String,
}

#[async_trait]
impl FederatedFlow for PromptFlow {
    async fn authorize(&self) -> Result<FederatedCredential, IdentityError> {
        let prompt = format!("ID token issued by {}:", self.provider_id);
        let id_token = Password::new(&prompt)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .map_err(|e| {
                if !matches!(
                    e,
                    InquireError::OperationCanceled | InquireError::OperationInterrupted
                ) {
                    warn!("federated sign-in prompt failed: {e}");
                }
                IdentityError::Cancelled
            })?;
        Ok(FederatedCredential {
            provider_id: self.provider_id.clone(),
            id_token,
        })
    }
}

/// Signs in as requested. Returns `None` for anonymous use.
pub(crate) async fn sign_in<P: IdentityProvider>(
    identity: &IdentityGateway<P>,
    method: SignIn,
) -> Result<Option<SessionInfo>> {
    let user = match method {
        SignIn::Anonymous => return Ok(None),
        SignIn::Federated(provider_id) => identity
            .sign_in_federated(&PromptFlow { provider_id })
            .await
            .context("Federated sign-in failed")?,
        SignIn::Password(account) => {
            let email = match account {
                Some(email) => email,
                None => Text::new("Account email:")
                    .prompt()
                    .context("Sign-in cancelled")?,
            };
            let password = Password::new("Account password:")
                .without_confirmation()
                .prompt()
                .context("Sign-in cancelled")?;
            identity
                .sign_in_with_password(&email, &password)
                .await
                .context("Sign-in failed")?
        }
    };
    Ok(Some(user))
}
