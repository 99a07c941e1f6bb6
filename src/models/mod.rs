//! Data models for a reminder run.
//!
//! Each run builds these once from API payloads and static configuration,
//! then reads them without mutation until the process exits.

pub mod approval;
pub mod merge_request;
pub mod recipient;

// Re-exports for convenient access
pub use approval::Approval;
pub use merge_request::{MergeRequest, TimestampField};
pub use recipient::RecipientDirectory;
