//! Review Reminder - nudges GitLab reviewers about stale merge requests.
//!
//! A run lists open merge requests, keeps the ones idle past a threshold,
//! works out which requested reviewers have not approved yet, and posts a
//! digest to Slack. The binary in `main.rs` wires configuration and logging
//! around [`services::reminder::run`].

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
