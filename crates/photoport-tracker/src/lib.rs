//! Client-side import job state machine for photoport.
//!
//! - [`JobTracker`] - Start, verification, polling, stop, resume and reset
//! - [`JobBackend`] - Seam over the import backend, implemented by `JobClient`
//! - [`TrackerView`] - Snapshot published to the front end on every change

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/photoport/photoport/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod backend;
mod state;
mod tracker;

pub use backend::JobBackend;
pub use state::{StatusMessage, TerminalState, TrackerState, TrackerView};
pub use tracker::{DEFAULT_POLL_INTERVAL, JobTracker, TrackerConfig, Transition};
