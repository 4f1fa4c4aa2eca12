//! REST chat client — message sending + member listing via the platform
//! HTTP API. Fire-and-forget semantics: callers treat failures as
//! loggable events, not fatal ones.

use async_trait::async_trait;
use serde::Deserialize;
use spacebot_core::config::ChatApiConfig;
use spacebot_core::error::{Result, SpacebotError};
use spacebot_core::traits::ChatClient;
use spacebot_core::types::{SentMessage, SpaceMember};
use std::time::Duration;

/// Chat platform client over the platform's REST API.
pub struct RestChatClient {
    config: ChatApiConfig,
    client: reqwest::Client,
}

impl RestChatClient {
    pub fn new(config: ChatApiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

#[async_trait]
impl ChatClient for RestChatClient {
    /// Create a message under `target` (a space or thread name).
    async fn send_text(&self, target: &str, text: &str) -> Result<SentMessage> {
        let url = self.api_url(&format!("{target}/messages"));
        let body = serde_json::json!({ "text": text });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.bot_token)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| SpacebotError::Chat(format!("Send failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SpacebotError::Chat(format!(
                "Send to '{target}' returned HTTP {}",
                response.status()
            )));
        }

        let message: ApiMessage = response
            .json()
            .await
            .map_err(|e| SpacebotError::Chat(format!("Invalid send response: {e}")))?;

        tracing::debug!("Message delivered to {target}: {}", message.name);
        Ok(SentMessage {
            name: message.name,
            thread: message.thread.map(|t| t.name),
        })
    }

    /// Enumerate the current members of a space.
    async fn list_space_members(&self, space_name: &str) -> Result<Vec<SpaceMember>> {
        let url = self.api_url(&format!("{space_name}/members"));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.bot_token)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| SpacebotError::Chat(format!("List members failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SpacebotError::Chat(format!(
                "List members of '{space_name}' returned HTTP {}",
                response.status()
            )));
        }

        let body: MembershipList = response
            .json()
            .await
            .map_err(|e| SpacebotError::Chat(format!("Invalid member list: {e}")))?;
        Ok(body.memberships)
    }
}

// ─── Platform API types ──────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    thread: Option<ApiThread>,
}

#[derive(Debug, Deserialize)]
struct ApiThread {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MembershipList {
    #[serde(default)]
    memberships: Vec<SpaceMember>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_cleanly() {
        let client = RestChatClient::new(ChatApiConfig {
            api_base_url: "https://chat.example.com/v1/".into(),
            bot_token: String::new(),
            request_timeout_secs: 5,
        });
        assert_eq!(
            client.api_url("spaces/s1/messages"),
            "https://chat.example.com/v1/spaces/s1/messages"
        );
    }

    #[test]
    fn test_membership_list_parses_platform_shape() {
        let raw = r#"{"memberships": [{"member": {"name": "users/1", "displayName": "Alice"}}]}"#;
        let list: MembershipList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.memberships.len(), 1);
        assert_eq!(list.memberships[0].member.name, "users/1");
    }
}
