//! Client library for importing cloud photo libraries through a photoport
//! backend.
//!
//! This is a facade crate that re-exports functionality from the photoport
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use photoport_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = RestIdentityProvider::new(IdentityConfig::default())?;
//!     let identity = IdentityGateway::new(provider, IdentityConfig::default().refresh_skew);
//!     identity.sign_in_with_password("me@example.com", "password").await?;
//!
//!     let client = JobClient::new(ClientConfig::default(), Arc::new(identity.clone()))?;
//!     let tracker = JobTracker::new(client, TrackerConfig::default());
//!
//!     let credentials = PendingCredentials::new(
//!         "me@icloud.com",
//!         "app-password",
//!         "/photos/icloud",
//!         ImportLimit::Files(50),
//!     );
//!     tracker.start(credentials).await;
//!
//!     let mut updates = tracker.subscribe();
//!     while updates.changed().await.is_ok() {
//!         let view = updates.borrow_and_update().clone();
//!         println!("{} {:?}", view.state, view.progress_percent());
//!         if view.state.is_terminal() {
//!             break;
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/photoport/photoport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use photoport_types::*;

// Re-export identity
#[cfg(feature = "identity")]
pub use photoport_identity::{
    FederatedCredential, FederatedFlow, IdentityConfig, IdentityError, IdentityGateway,
    IdentityProvider, RestIdentityProvider, SessionInfo, Subscription, TokenGrant,
};

// Re-export the job client
#[cfg(feature = "client")]
pub use photoport_client::{
    CancellationToken, ClientConfig, ClientError, JobClient, StartOutcome,
};

// Re-export the tracker
#[cfg(feature = "tracker")]
pub use photoport_tracker::{
    JobBackend, JobTracker, StatusMessage, TerminalState, TrackerConfig, TrackerState,
    TrackerView, Transition,
};

/// Prelude module for convenient imports.
///
/// ```
/// use photoport_lib::prelude::*;
/// ```
pub mod prelude {
    pub use photoport_types::{
        FileToDownload, ImportJob, ImportLimit, JobStatus, PendingCredentials, SessionId,
        TokenSource,
    };

    #[cfg(feature = "identity")]
    pub use photoport_identity::{
        FederatedFlow, IdentityConfig, IdentityGateway, RestIdentityProvider, SessionInfo,
    };

    #[cfg(feature = "client")]
    pub use photoport_client::{CancellationToken, ClientConfig, ClientError, JobClient};

    #[cfg(feature = "tracker")]
    pub use photoport_tracker::{
        JobTracker, StatusMessage, TrackerConfig, TrackerState, TrackerView, Transition,
    };
}
