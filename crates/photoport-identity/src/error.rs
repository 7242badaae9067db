//! Error types for identity operations.

use thiserror::Error;

/// Errors that can occur while signing in or minting tokens.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// The provider rejected the email or password.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The provider refused the request for another reason.
    #[error("Identity provider error {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Provider error code or message.
        message: String,
    },

    /// The operator abandoned the interactive sign-in.
    #[error("Sign-in cancelled")]
    Cancelled,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a body this client cannot read.
    #[error("Unexpected identity response: {0}")]
    Decode(#[from] serde_json::Error),

    /// No API key was configured for the provider.
    #[error("No identity API key configured")]
    MissingApiKey,

    /// A session-changed listener is already registered.
    #[error("A session listener is already registered")]
    ListenerActive,
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
