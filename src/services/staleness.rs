//! Staleness filter.

use crate::models::{MergeRequest, TimestampField};
use chrono::{DateTime, Duration, Utc};

/// Whether `mr` has been idle longer than `threshold`.
///
/// Exactly `threshold` old is not stale. A missing timestamp is never stale.
pub fn is_stale(
    mr: &MergeRequest,
    field: TimestampField,
    threshold: Duration,
    now: DateTime<Utc>,
) -> bool {
    mr.age(field, now).is_some_and(|age| age > threshold)
}

/// Keep the merge requests idle longer than `threshold`, preserving order.
pub fn filter_stale(
    requests: &[MergeRequest],
    field: TimestampField,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Vec<MergeRequest> {
    requests
        .iter()
        .filter(|mr| {
            if mr.timestamp(field).is_none() {
                log::warn!(
                    "Merge request {} has no usable {} timestamp, skipping",
                    mr.web_url,
                    field
                );
                return false;
            }
            is_stale(mr, field, threshold, now)
        })
        .cloned()
        .collect()
}
