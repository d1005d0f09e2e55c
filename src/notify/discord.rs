use async_trait::async_trait;
use serde_json::json;

use crate::config::ApiKey;
use crate::error::{AppError, Result};
use crate::notify::Notifier;

/// Posts alerts to a channel through the Discord REST API.
pub struct DiscordNotifier {
    client: reqwest::Client,
    base_url: String,
    token: ApiKey,
}

impl DiscordNotifier {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: ApiKey) -> Self {
        Self { client, base_url: base_url.into(), token }
    }
}

/// Message body that pings exactly the watching user and nobody else.
pub fn message_payload(mention_user_id: u64, message: &str) -> serde_json::Value {
    json!({
        "content": format!("<@{mention_user_id}> {message}"),
        "allowed_mentions": { "users": [mention_user_id.to_string()] },
    })
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, channel_id: u64, mention_user_id: u64, message: &str) -> Result<()> {
        let url = format!(
            "{}/channels/{}/messages",
            self.base_url.trim_end_matches('/'),
            channel_id
        );
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token.expose()))
            .json(&message_payload(mention_user_id, message))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Discord returned {status} for channel {channel_id}: {body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_mentions_only_the_watcher() {
        let payload = message_payload(123456789012345678, "hello");
        assert_eq!(payload["content"], "<@123456789012345678> hello");
        assert_eq!(payload["allowed_mentions"]["users"][0], "123456789012345678");
    }
}
