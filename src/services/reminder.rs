//! Reminder run.
//!
//! One run is a straight pipeline:
//! fetch → staleness filter → reviewer attribution → digest → delivery.
//! Nothing is kept between runs.

use crate::error::AppError;
use crate::models::{MergeRequest, RecipientDirectory, TimestampField};
use crate::services::attribution::{self, PendingReviewSet};
use crate::services::digest::render_digest;
use crate::services::gitlab_client::MergeRequestSource;
use crate::services::slack::{Notifier, Target};
use crate::services::staleness::filter_stale;
use chrono::{DateTime, Duration, Utc};

/// How digests are addressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DeliveryMode {
    /// One digest of every stale merge request to the webhook channel.
    #[default]
    Broadcast,
    /// One digest per reviewer, sent as a direct message.
    Direct,
}

/// Parameters of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: DeliveryMode,
    pub timestamp_field: TimestampField,
    pub stale_after: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::Broadcast,
            timestamp_field: TimestampField::Updated,
            stale_after: Duration::hours(72),
        }
    }
}

/// A digest ready to hand to a notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub target: Target,
    pub message: String,
    pub request_count: usize,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Open merge requests returned by GitLab.
    pub fetched: usize,
    /// Merge requests past the threshold.
    pub stale: usize,
    /// Digests accepted by the notifier.
    pub delivered: usize,
    /// Reviewers with pending work but no recipient id.
    pub skipped_recipients: Vec<String>,
}

/// Single digest of every stale merge request.
pub fn plan_broadcast(
    stale: &[MergeRequest],
    field: TimestampField,
    now: DateTime<Utc>,
) -> Vec<Dispatch> {
    if stale.is_empty() {
        return Vec::new();
    }
    vec![Dispatch {
        target: Target::Broadcast,
        message: render_digest(stale, field, now),
        request_count: stale.len(),
    }]
}

/// One digest per reviewer that resolves in `directory`.
///
/// Returns the dispatches plus the usernames that had no recipient id.
pub fn plan_direct(
    pending: &PendingReviewSet,
    directory: &RecipientDirectory,
    field: TimestampField,
    now: DateTime<Utc>,
) -> (Vec<Dispatch>, Vec<String>) {
    let mut dispatches = Vec::new();
    let mut skipped = Vec::new();

    for bucket in pending.buckets() {
        match directory.resolve(&bucket.username) {
            Some(recipient_id) => dispatches.push(Dispatch {
                target: Target::Direct {
                    username: bucket.username.clone(),
                    recipient_id: recipient_id.to_string(),
                },
                message: render_digest(&bucket.requests, field, now),
                request_count: bucket.requests.len(),
            }),
            None => {
                log::info!(
                    "No Slack recipient configured for {}, skipping {} merge request(s)",
                    bucket.username,
                    bucket.requests.len()
                );
                skipped.push(bucket.username.clone());
            }
        }
    }

    (dispatches, skipped)
}

/// Run the full pipeline once.
///
/// Any GitLab failure aborts the run before anything is sent. Delivery
/// failures do not stop the remaining deliveries; the run then fails with
/// a summary of how many were lost.
pub async fn run<S, N>(
    options: &RunOptions,
    source: &S,
    notifier: &N,
    directory: &RecipientDirectory,
    now: DateTime<Utc>,
) -> Result<RunSummary, AppError>
where
    S: MergeRequestSource,
    N: Notifier,
{
    let field = options.timestamp_field;
    let mut summary = RunSummary::default();

    let requests = source.open_merge_requests(field).await?;
    summary.fetched = requests.len();

    let stale = filter_stale(&requests, field, options.stale_after, now);
    summary.stale = stale.len();
    log::info!(
        "{} of {} open merge requests idle for more than {} hours",
        stale.len(),
        requests.len(),
        options.stale_after.num_hours()
    );

    if stale.is_empty() {
        log::info!("There are no merge requests to notify about");
        return Ok(summary);
    }

    let dispatches = match options.mode {
        DeliveryMode::Broadcast => plan_broadcast(&stale, field, now),
        DeliveryMode::Direct => {
            let pending = attribution::attribute(source, &stale).await?;
            let (dispatches, skipped) = plan_direct(&pending, directory, field, now);
            summary.skipped_recipients = skipped;
            dispatches
        }
    };

    if dispatches.is_empty() {
        log::info!("No reviewer has a digest to receive");
        return Ok(summary);
    }

    let mut failures = Vec::new();
    for dispatch in &dispatches {
        match notifier.deliver(&dispatch.target, &dispatch.message).await {
            Ok(()) => {
                summary.delivered += 1;
                log::info!(
                    "Notified {} about {} merge request(s)",
                    dispatch.target,
                    dispatch.request_count
                );
            }
            Err(e) => {
                log::error!("Failed to notify {}: {}", dispatch.target, e);
                failures.push(dispatch.target.to_string());
            }
        }
    }

    if !failures.is_empty() {
        return Err(AppError::delivery(format!(
            "{} of {} deliveries failed: {}",
            failures.len(),
            dispatches.len(),
            failures.join(", ")
        )));
    }

    Ok(summary)
}
