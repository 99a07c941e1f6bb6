//! Command-line configuration.
//!
//! Flags are parsed with clap; secrets can also come from the environment.
//! [`Settings::from_cli`] validates the combination before any network call
//! is made.

use crate::error::AppError;
use crate::models::{RecipientDirectory, TimestampField};
use crate::services::gitlab_client::{GitLabClientConfig, DEFAULT_PER_PAGE};
use crate::services::reminder::{DeliveryMode, RunOptions};
use crate::services::slack::{
    ChatNotifier, DirectMessageNotifier, StdoutNotifier, WebhookNotifier, DEFAULT_SLACK_API_URL,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "review-reminder",
    version,
    about = "Remind GitLab reviewers about merge requests waiting on them",
    long_about = None
)]
pub struct Cli {
    /// GitLab personal access token
    #[arg(long, env = "GITLAB_TOKEN", hide_env_values = true, default_value = "")]
    pub token: String,

    /// GitLab instance URL
    #[arg(long, env = "GITLAB_URL", default_value = "https://gitlab.com")]
    pub gitlab_url: String,

    /// Post one digest to a webhook, or message each reviewer
    #[arg(long, value_enum, default_value_t = DeliveryMode::Broadcast)]
    pub mode: DeliveryMode,

    /// Slack incoming webhook URL (broadcast mode)
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook_url: Option<String>,

    /// Slack bot token (direct mode)
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Slack Web API base URL
    #[arg(long, default_value = DEFAULT_SLACK_API_URL)]
    pub slack_api_url: String,

    /// JSON file mapping GitLab usernames to Slack ids (direct mode)
    #[arg(long, env = "REVIEW_REMINDER_RECIPIENTS")]
    pub recipients: Option<PathBuf>,

    /// Hours a merge request must be idle before it is reported
    #[arg(long, alias = "mr-timeout-in-hours", default_value_t = 72)]
    pub stale_after_hours: u32,

    /// Timestamp that measures idle time
    #[arg(long, value_enum, default_value_t = TimestampField::Updated)]
    pub timestamp_field: TimestampField,

    /// Page size of the merge request listing
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: u32,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Print digests instead of sending them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Where digests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliverySettings {
    Webhook { url: String },
    Direct { api_url: String, token: String },
    DryRun,
}

/// Validated configuration of one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub gitlab: GitLabClientConfig,
    pub run: RunOptions,
    pub delivery: DeliverySettings,
    pub recipients: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Settings {
    /// Validate parsed flags.
    pub fn from_cli(cli: &Cli) -> Result<Self, AppError> {
        let token = cli.token.trim();
        if token.is_empty() {
            return Err(AppError::config_field(
                "GitLab token is required (--token or GITLAB_TOKEN)",
                "token",
            ));
        }

        if cli.gitlab_url.trim().is_empty() {
            return Err(AppError::config_field("GitLab URL must not be empty", "gitlab_url"));
        }

        if cli.per_page == 0 {
            return Err(AppError::config_field("--per-page must be at least 1", "per_page"));
        }

        let recipients = match cli.mode {
            DeliveryMode::Direct => Some(cli.recipients.clone().ok_or_else(|| {
                AppError::config_field(
                    "Direct mode needs a recipients file (--recipients)",
                    "recipients",
                )
            })?),
            DeliveryMode::Broadcast => None,
        };

        let delivery = if cli.dry_run {
            DeliverySettings::DryRun
        } else {
            match cli.mode {
                DeliveryMode::Broadcast => DeliverySettings::Webhook {
                    url: required(&cli.slack_webhook_url, "slack_webhook_url", || {
                        "Broadcast mode needs a Slack webhook URL (--slack-webhook-url or SLACK_WEBHOOK_URL)"
                    })?,
                },
                DeliveryMode::Direct => DeliverySettings::Direct {
                    api_url: cli.slack_api_url.clone(),
                    token: required(&cli.slack_token, "slack_token", || {
                        "Direct mode needs a Slack bot token (--slack-token or SLACK_TOKEN)"
                    })?,
                },
            }
        };

        Ok(Self {
            gitlab: GitLabClientConfig {
                base_url: cli.gitlab_url.trim().to_string(),
                token: token.to_string(),
                timeout_secs: cli.timeout_secs,
                per_page: cli.per_page,
            },
            run: RunOptions {
                mode: cli.mode,
                timestamp_field: cli.timestamp_field,
                stale_after: chrono::Duration::hours(i64::from(cli.stale_after_hours)),
            },
            delivery,
            recipients,
            timeout_secs: cli.timeout_secs,
        })
    }

    /// Load the recipient directory, empty in broadcast mode.
    pub fn load_recipients(&self) -> Result<RecipientDirectory, AppError> {
        match &self.recipients {
            Some(path) => RecipientDirectory::load(path),
            None => Ok(RecipientDirectory::default()),
        }
    }

    /// Build the notifier for the configured delivery.
    pub fn notifier(&self) -> Result<ChatNotifier, AppError> {
        Ok(match &self.delivery {
            DeliverySettings::Webhook { url } => {
                ChatNotifier::Webhook(WebhookNotifier::new(url.clone(), self.timeout_secs)?)
            }
            DeliverySettings::Direct { api_url, token } => ChatNotifier::Direct(
                DirectMessageNotifier::new(api_url.clone(), token.clone(), self.timeout_secs)?,
            ),
            DeliverySettings::DryRun => ChatNotifier::Stdout(StdoutNotifier),
        })
    }
}

/// Non-blank value of an optional flag.
fn required(
    value: &Option<String>,
    field: &str,
    message: impl FnOnce() -> &'static str,
) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::config_field(message(), field))
}
