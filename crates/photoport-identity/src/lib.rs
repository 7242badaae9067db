//! Identity provider sign-in and session tokens for photoport.
//!
//! - [`IdentityGateway`] - Sign-in, sign-out, token retrieval, session listener
//! - [`IdentityProvider`] - Seam over the provider's credential and token API
//! - [`RestIdentityProvider`] - Provider reached over its REST API
//! - [`FederatedFlow`] - Interactive third-party sign-in
//! - [`Subscription`] - Handle for the standing session-changed listener

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/photoport/photoport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod gateway;
mod observer;
mod provider;
mod rest;
mod session;

pub use error::{IdentityError, Result};
pub use gateway::IdentityGateway;
pub use observer::Subscription;
pub use provider::{FederatedCredential, FederatedFlow, IdentityProvider};
pub use rest::{DEFAULT_IDENTITY_URL, DEFAULT_TOKEN_URL, IdentityConfig, RestIdentityProvider};
pub use session::{SessionInfo, TokenGrant};
