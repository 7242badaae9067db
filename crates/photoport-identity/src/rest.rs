//! REST identity provider compatible with the Firebase Auth API.

use crate::error::{IdentityError, Result};
use crate::provider::{FederatedCredential, IdentityProvider};
use crate::session::TokenGrant;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default base URL of the account endpoints.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Default URL of the token refresh endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

/// Redirect URI reported when exchanging a federated credential.
const IDP_REQUEST_URI: &str = "http://localhost";

/// Provider error codes that mean the email or password was wrong.
const CREDENTIAL_ERRORS: [&str; 5] = [
    "EMAIL_NOT_FOUND",
    "INVALID_PASSWORD",
    "INVALID_LOGIN_CREDENTIALS",
    "INVALID_EMAIL",
    "USER_DISABLED",
];

/// Configuration for the identity provider and gateway.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Public API key of the identity project.
    pub api_key: Option<String>,
    /// Base URL of the account endpoints.
    pub identity_url: String,
    /// URL of the token refresh endpoint.
    pub token_url: String,
    /// Bearer tokens closer than this to expiry are refreshed before use.
    pub refresh_skew: Duration,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: option_env!("PHOTOPORT_IDENTITY_API_KEY").map(str::to_string),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            refresh_skew: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: &'static str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity provider reached over its REST API.
#[derive(Debug, Clone)]
pub struct RestIdentityProvider {
    http: Client,
    config: IdentityConfig,
}

impl RestIdentityProvider {
    /// Creates a provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: IdentityConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Returns the provider configuration.
    #[must_use]
    pub const fn config(&self) -> &IdentityConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(IdentityError::MissingApiKey)
    }

    fn account_url(&self, method: &str) -> String {
        format!(
            "{}/accounts:{method}",
            self.config.identity_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<TokenGrant> {
        let key = self.api_key()?;
        debug!(%email, "signing in with password");
        let response = self
            .http
            .post(self.account_url("signInWithPassword"))
            .query(&[("key", key)])
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await?;
        let body: SignInResponse = read_json(response).await?;
        Ok(body.into_grant())
    }

    async fn sign_in_with_idp(&self, credential: &FederatedCredential) -> Result<TokenGrant> {
        let key = self.api_key()?;
        debug!(provider = %credential.provider_id, "signing in with federated credential");
        let response = self
            .http
            .post(self.account_url("signInWithIdp"))
            .query(&[("key", key)])
            .json(&IdpRequest {
                post_body: idp_post_body(credential),
                request_uri: IDP_REQUEST_URI,
                return_secure_token: true,
                return_idp_credential: true,
            })
            .send()
            .await?;
        let body: SignInResponse = read_json(response).await?;
        Ok(body.into_grant())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let key = self.api_key()?;
        let response = self
            .http
            .post(&self.config.token_url)
            .query(&[("key", key)])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let body: RefreshResponse = read_json(response).await?;
        Ok(TokenGrant {
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_in: parse_expires_in(&body.expires_in),
            user_id: body.user_id,
            email: None,
        })
    }
}

impl SignInResponse {
    fn into_grant(self) -> TokenGrant {
        TokenGrant {
            expires_in: parse_expires_in(&self.expires_in),
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            user_id: self.local_id,
            email: self.email.filter(|e| !e.is_empty()),
        }
    }
}

/// Builds the form-encoded `postBody` carrying the provider's ID token.
fn idp_post_body(credential: &FederatedCredential) -> String {
    Url::parse_with_params(
        IDP_REQUEST_URI,
        &[
            ("id_token", credential.id_token.as_str()),
            ("providerId", credential.provider_id.as_str()),
        ],
    )
    .ok()
    .and_then(|url| url.query().map(str::to_string))
    .unwrap_or_default()
}

/// Parses the provider's string-encoded lifetime in seconds.
///
/// Unparseable values yield a zero lifetime so the next use refreshes.
fn parse_expires_in(raw: &str) -> Duration {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .unwrap_or(Duration::ZERO)
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.bytes().await?;
    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }
    Err(map_error(status.as_u16(), &body))
}

/// Maps a provider error body to an [`IdentityError`].
fn map_error(status: u16, body: &[u8]) -> IdentityError {
    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());

    // Codes may carry a suffix, e.g. "INVALID_PASSWORD : details".
    let code = message.split([' ', ':']).next().unwrap_or_default();
    if CREDENTIAL_ERRORS.contains(&code) {
        IdentityError::InvalidCredentials(message)
    } else {
        IdentityError::Rejected { status, message }
    }
}
