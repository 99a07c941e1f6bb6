//! Approval model.

use std::collections::HashSet;

/// Usernames that have approved one merge request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Approval {
    /// GitLab MR ID (global) this record belongs to.
    pub mr_id: i64,

    /// Approver usernames.
    pub approved_by: HashSet<String>,
}

impl Approval {
    pub fn new<I, S>(mr_id: i64, approved_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mr_id,
            approved_by: approved_by.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-sensitive check.
    pub fn has_approved(&self, username: &str) -> bool {
        self.approved_by.contains(username)
    }
}
