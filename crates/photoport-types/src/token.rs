//! Bearer token supply for outgoing requests.

use async_trait::async_trait;

/// Supplies the bearer token attached to backend requests.
///
/// Returning `None` sends the request without an `Authorization` header; the
/// backend accepts unauthenticated calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a token valid at the time of the call, if a session exists.
    async fn bearer_token(&self) -> Option<String>;
}

/// Token source for unauthenticated use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

#[async_trait]
impl TokenSource for NoToken {
    async fn bearer_token(&self) -> Option<String> {
        None
    }
}
