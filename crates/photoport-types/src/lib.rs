//! Core types for the photoport import client.
//!
//! This crate provides the data structures shared by the other photoport crates:
//!
//! - [`SessionId`] - Opaque identifier the backend assigns to an import job
//! - [`JobStatus`] - Status reported by the backend for a job
//! - [`ImportJob`] - Latest snapshot of a backend-tracked import
//! - [`FileToDownload`] - A completed file and its download token
//! - [`PendingCredentials`] - Credentials held in memory while a job starts
//! - [`TwoFactorChallenge`] - Verification code being typed by the operator
//! - [`TokenSource`] - Supplies bearer tokens for outgoing requests

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/photoport/photoport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod credentials;
mod job;
mod token;

pub use credentials::{
    ImportLimit, LimitParseError, PendingCredentials, TwoFactorChallenge, normalize_destination,
};
pub use job::{FileToDownload, ImportJob, JobStatus, SessionId};
pub use token::{NoToken, TokenSource};
