//! Session management on top of an identity provider.

use crate::error::Result;
use crate::observer::{ListenerSlot, Subscription};
use crate::provider::{FederatedFlow, IdentityProvider};
use crate::session::{Session, SessionInfo, TokenGrant};
use async_trait::async_trait;
use chrono::Utc;
use photoport_types::TokenSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the single active session and the session-changed listener.
///
/// Cloning is cheap; clones share the same session.
#[derive(Debug)]
pub struct IdentityGateway<P> {
    inner: Arc<Inner<P>>,
}

#[derive(Debug)]
struct Inner<P> {
    provider: P,
    refresh_skew: Duration,
    session: Mutex<Option<Session>>,
    listener: Arc<ListenerSlot>,
}

impl<P> Clone for IdentityGateway<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: IdentityProvider> IdentityGateway<P> {
    /// Creates a gateway with no active session.
    ///
    /// Tokens closer than `refresh_skew` to expiry are refreshed before they
    /// are handed out.
    #[must_use]
    pub fn new(provider: P, refresh_skew: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                refresh_skew,
                session: Mutex::new(None),
                listener: Arc::new(ListenerSlot::default()),
            }),
        }
    }

    /// Signs in with email and password, replacing any active session.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the credentials or cannot be
    /// reached.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SessionInfo> {
        let grant = self
            .inner
            .provider
            .sign_in_with_password(email, password)
            .await?;
        Ok(self.establish(grant, email).await)
    }

    /// Runs the provider's interactive flow and signs in with its credential.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Cancelled`](crate::IdentityError::Cancelled) if
    /// the operator abandons the flow, or another error if the provider fails.
    pub async fn sign_in_federated(&self, flow: &dyn FederatedFlow) -> Result<SessionInfo> {
        let credential = flow.authorize().await?;
        let grant = self.inner.provider.sign_in_with_idp(&credential).await?;
        Ok(self.establish(grant, "").await)
    }

    /// Clears the active session. Does nothing if already signed out.
    pub async fn sign_out(&self) {
        let previous = self.inner.session.lock().await.take();
        if let Some(session) = previous {
            info!(email = %session.info().email, "signed out");
            self.inner.listener.notify(None);
        }
    }

    /// Returns a bearer token for the active session, or `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns an error if the token had to be refreshed and the refresh failed.
    pub async fn current_token(&self) -> Result<Option<String>> {
        let mut guard = self.inner.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Ok(None);
        };

        if session.expires_within(self.inner.refresh_skew, Utc::now()) {
            let grant = self
                .inner
                .provider
                .refresh(session.refresh_token())
                .await?;
            session.apply_refresh(grant, Utc::now());
            debug!("refreshed bearer token");
        }

        Ok(Some(session.id_token().to_string()))
    }

    /// Returns the signed-in user, if any.
    pub async fn current_user(&self) -> Option<SessionInfo> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.info().clone())
    }

    /// Registers the standing listener called on every sign-in and sign-out.
    ///
    /// Only one listener may be registered at a time.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::ListenerActive`](crate::IdentityError::ListenerActive)
    /// if a listener is already registered.
    pub fn on_session_changed<F>(&self, handler: F) -> Result<Subscription>
    where
        F: Fn(Option<&SessionInfo>) + Send + Sync + 'static,
    {
        self.inner.listener.register(Arc::new(handler))
    }

    async fn establish(&self, grant: TokenGrant, email: &str) -> SessionInfo {
        let session = Session::from_grant(grant, email, Utc::now());
        let info = session.info().clone();
        *self.inner.session.lock().await = Some(session);
        info!(email = %info.email, "signed in");
        self.inner.listener.notify(Some(&info));
        info
    }
}

#[async_trait]
impl<P: IdentityProvider> TokenSource for IdentityGateway<P> {
    async fn bearer_token(&self) -> Option<String> {
        match self.current_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("could not refresh bearer token, sending request without it: {e}");
                None
            }
        }
    }
}
