//! HTTP client for the photoport import backend.
//!
//! This crate provides the request layer between the tracker and the backend:
//!
//! - [`url::endpoint`] - Builds backend endpoint URLs
//! - [`JobClient`] - Start, verify, stop, resume, poll and download calls
//! - [`StartOutcome`] - What a start or verification call produced
//! - [`ClientError`] - Transport, backend and cancellation failures

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/photoport/photoport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
pub mod url;
mod wire;

pub use client::{ClientConfig, ClientError, DEFAULT_BASE_URL, JobClient, Result};
pub use tokio_util::sync::CancellationToken;
pub use wire::{StartOutcome, TWO_FACTOR_REQUIRED};
