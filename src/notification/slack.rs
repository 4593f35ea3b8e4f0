use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

/// Outbound side of the messaging platform: post a prompt, resolve a user's
/// display name. The message id returned by `post_message` doubles as the
/// correlation token for reactions to that message.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`, returning the platform message id.
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<String>;

    /// Resolve a user id to a display name. Best-effort: callers fall back
    /// to the raw id on failure.
    async fn display_name(&self, user_id: &str) -> anyhow::Result<String>;
}

/// Notifier backed by the Slack Web API.
pub struct SlackNotifier {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl SlackNotifier {
    pub fn new(bot_token: String) -> Self {
        Self::with_base_url("https://slack.com/api", bot_token)
    }

    /// Point the client at a different API root. Used by tests.
    pub fn with_base_url(base_url: impl Into<String>, bot_token: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build Slack HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bot_token,
        }
    }
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    ok: bool,
    user: Option<UserInfo>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct UserInfo {
    name: String,
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(&serde_json::json!({ "channel": channel, "text": text }))
            .send()
            .await
            .context("chat.postMessage request failed")?;

        let reply: PostMessageResponse = resp
            .json()
            .await
            .context("malformed chat.postMessage response")?;

        if !reply.ok {
            anyhow::bail!(
                "chat.postMessage rejected: {}",
                reply.error.unwrap_or_else(|| "unknown error".into())
            );
        }

        reply
            .ts
            .ok_or_else(|| anyhow::anyhow!("chat.postMessage response missing message ts"))
    }

    async fn display_name(&self, user_id: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(format!("{}/users.info", self.base_url))
            .bearer_auth(&self.bot_token)
            .query(&[("user", user_id)])
            .send()
            .await
            .context("users.info request failed")?;

        let reply: UserInfoResponse = resp.json().await.context("malformed users.info response")?;

        if !reply.ok {
            anyhow::bail!(
                "users.info rejected: {}",
                reply.error.unwrap_or_else(|| "unknown error".into())
            );
        }

        reply
            .user
            .map(|u| u.name)
            .ok_or_else(|| anyhow::anyhow!("users.info response missing user"))
    }
}
