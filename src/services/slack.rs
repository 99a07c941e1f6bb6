//! Slack delivery.
//!
//! Two transports are supported:
//! - incoming webhooks, which post to one fixed channel and answer `ok`
//! - the Web API `chat.postMessage` method, used for direct messages

use crate::error::AppError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Body Slack returns from a webhook that accepted the message.
const WEBHOOK_RESPONSE_OK: &str = "ok";

/// Who a digest is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The webhook's channel.
    Broadcast,
    /// A single reviewer.
    Direct {
        username: String,
        recipient_id: String,
    },
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Broadcast => write!(f, "broadcast"),
            Self::Direct {
                username,
                recipient_id,
            } => write!(f, "{} ({})", username, recipient_id),
        }
    }
}

/// Sends a rendered digest somewhere.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn deliver(&self, target: &Target, message: &str) -> Result<(), AppError>;
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

/// Posts to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout_secs: u64) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            webhook_url: webhook_url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn deliver(&self, target: &Target, message: &str) -> Result<(), AppError> {
        if let Target::Direct { username, .. } = target {
            log::warn!(
                "Webhook cannot address {} directly; posting to the webhook channel",
                username
            );
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { text: message })
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::delivery(format!("Failed to read webhook response: {}", e)))?;

        if body == WEBHOOK_RESPONSE_OK {
            Ok(())
        } else {
            Err(AppError::delivery(format!(
                "Webhook rejected message ({}): {}",
                status.as_u16(),
                body
            )))
        }
    }
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Response envelope shared by Slack Web API methods.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Sends direct messages through `chat.postMessage`.
#[derive(Debug, Clone)]
pub struct DirectMessageNotifier {
    client: Client,
    api_url: String,
    token: String,
}

impl DirectMessageNotifier {
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_url: api_url.into(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), method)
    }

    /// Post `text` to a user or channel id.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.method_url("chat.postMessage"))
            .bearer_auth(&self.token)
            .json(&PostMessageRequest { channel, text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::delivery_to(
                format!("chat.postMessage failed ({})", status.as_u16()),
                channel,
            ));
        }

        let body: PostMessageResponse = response.json().await.map_err(|e| {
            AppError::delivery_to(format!("Failed to parse Slack response: {}", e), channel)
        })?;

        if body.ok {
            Ok(())
        } else {
            Err(AppError::delivery_to(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
                channel,
            ))
        }
    }
}

impl Notifier for DirectMessageNotifier {
    async fn deliver(&self, target: &Target, message: &str) -> Result<(), AppError> {
        match target {
            Target::Direct { recipient_id, .. } => self.post_message(recipient_id, message).await,
            Target::Broadcast => Err(AppError::delivery(
                "Direct-message delivery needs a recipient",
            )),
        }
    }
}

/// Prints digests instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    async fn deliver(&self, target: &Target, message: &str) -> Result<(), AppError> {
        println!("--- {} ---\n{}\n", target, message);
        Ok(())
    }
}

/// The notifier chosen by configuration.
#[derive(Debug, Clone)]
pub enum ChatNotifier {
    Webhook(WebhookNotifier),
    Direct(DirectMessageNotifier),
    Stdout(StdoutNotifier),
}

impl Notifier for ChatNotifier {
    async fn deliver(&self, target: &Target, message: &str) -> Result<(), AppError> {
        match self {
            Self::Webhook(n) => n.deliver(target, message).await,
            Self::Direct(n) => n.deliver(target, message).await,
            Self::Stdout(n) => n.deliver(target, message).await,
        }
    }
}

fn build_client(timeout_secs: u64) -> Result<Client, AppError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))
}
