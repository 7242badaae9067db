//! Signed-in session state.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::time::Duration;

/// Tokens issued by the provider on sign-in or refresh.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Short-lived bearer token.
    pub id_token: String,
    /// Long-lived token used to mint new bearer tokens.
    pub refresh_token: String,
    /// Lifetime of `id_token`.
    pub expires_in: Duration,
    /// Provider-side user id.
    pub user_id: String,
    /// Email of the signed-in user, when the provider returns one.
    pub email: Option<String>,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("expires_in", &self.expires_in)
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Public view of the signed-in user, handed to session listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Email of the signed-in user (empty if the provider withheld it).
    pub email: String,
    /// Provider-side user id.
    pub user_id: String,
    /// When the session was created.
    pub signed_in_at: DateTime<Utc>,
}

/// The one active session.
pub(crate) struct Session {
    info: SessionInfo,
    id_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn from_grant(grant: TokenGrant, fallback_email: &str, now: DateTime<Utc>) -> Self {
        let email = grant
            .email
            .clone()
            .unwrap_or_else(|| fallback_email.to_string());
        Self {
            info: SessionInfo {
                email,
                user_id: grant.user_id.clone(),
                signed_in_at: now,
            },
            expires_at: deadline(now, grant.expires_in),
            id_token: grant.id_token,
            refresh_token: grant.refresh_token,
        }
    }

    pub(crate) const fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub(crate) fn id_token(&self) -> &str {
        &self.id_token
    }

    pub(crate) fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Returns true if the bearer token expires within `skew` of `now`.
    pub(crate) fn expires_within(&self, skew: Duration, now: DateTime<Utc>) -> bool {
        deadline(now, skew) >= self.expires_at
    }

    pub(crate) fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.id_token = grant.id_token;
        self.refresh_token = grant.refresh_token;
        self.expires_at = deadline(now, grant.expires_in);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("info", &self.info)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

fn deadline(now: DateTime<Utc>, after: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(after)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
