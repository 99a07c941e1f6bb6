//! Merge request model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Which timestamp of a merge request measures its idle time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimestampField {
    Created,
    #[default]
    Updated,
}

impl TimestampField {
    /// Value of GitLab's `order_by` parameter for this field.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Created => "created_at",
            Self::Updated => "updated_at",
        }
    }
}

impl std::fmt::Display for TimestampField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// An open merge request as seen at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// GitLab MR ID (global).
    pub id: i64,

    /// Project-scoped MR number.
    pub iid: i64,

    /// GitLab project ID.
    pub project_id: i64,

    /// MR title.
    pub title: String,

    /// URL to MR in GitLab web UI.
    pub web_url: String,

    /// Author's GitLab username.
    pub author_username: String,

    /// Creation time, `None` if the API omitted it or it did not parse.
    pub created_at: Option<DateTime<Utc>>,

    /// Last update time, `None` if the API omitted it or it did not parse.
    pub updated_at: Option<DateTime<Utc>>,

    /// Requested reviewer usernames, in GitLab's order.
    pub reviewers: Vec<String>,

    /// Draft / WIP flag.
    pub draft: bool,
}

impl MergeRequest {
    /// The timestamp selected by `field`.
    pub fn timestamp(&self, field: TimestampField) -> Option<DateTime<Utc>> {
        match field {
            TimestampField::Created => self.created_at,
            TimestampField::Updated => self.updated_at,
        }
    }

    /// Time elapsed since the selected timestamp.
    pub fn age(&self, field: TimestampField, now: DateTime<Utc>) -> Option<Duration> {
        self.timestamp(field).map(|ts| now - ts)
    }

    /// Whole days elapsed since the selected timestamp, never negative.
    pub fn age_in_days(&self, field: TimestampField, now: DateTime<Utc>) -> Option<i64> {
        self.age(field, now).map(|age| age.num_days().max(0))
    }
}
