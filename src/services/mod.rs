//! Business logic services.
//!
//! This module contains the GitLab and Slack clients plus the pure steps of
//! a reminder run (staleness, attribution, digest rendering).
//!
//! The pipeline in [`reminder`] only talks to the outside world through the
//! [`MergeRequestSource`] and [`Notifier`] traits, so it can be tested
//! without a network.

pub mod attribution;
pub mod digest;
pub mod gitlab_client;
pub mod reminder;
pub mod slack;
pub mod staleness;

pub use attribution::PendingReviewSet;
pub use gitlab_client::{GitLabClient, GitLabClientConfig, MergeRequestSource};
pub use reminder::{DeliveryMode, RunOptions, RunSummary};
pub use slack::{ChatNotifier, Notifier, Target};
