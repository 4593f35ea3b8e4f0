use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Abstraction over the external discharge authority — the service that
/// implements the third-party-caveat issue/poll/discharge/abort protocol.
/// Token cryptography lives entirely on that side; this client only moves
/// opaque bytes and secrets.
#[async_trait]
pub trait DischargeAuthority: Send + Sync {
    /// Exchange a caveat ticket for the discharge token released to the
    /// caller on approval.
    async fn redeem_ticket(&self, ticket: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Finalize the poll identified by `poll_secret` as approved.
    async fn discharge(&self, poll_secret: &str) -> anyhow::Result<()>;

    /// Finalize the poll as denied, with a human-readable reason.
    async fn abort(&self, poll_secret: &str, reason: &str) -> anyhow::Result<()>;
}

/// HTTP client for a remote discharge authority.
pub struct HttpAuthority {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthority {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("signoff/0.1")
                .build()
                .expect("failed to build discharge authority HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn expect_success(resp: reqwest::Response, what: &str) -> anyhow::Result<()> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("{what} failed: status={status}, body={body}")
    }
}

#[derive(Serialize)]
struct RedeemRequest {
    ticket: String,
}

#[derive(Deserialize)]
struct RedeemResponse {
    discharge: String,
}

#[derive(Serialize)]
struct AbortRequest<'a> {
    reason: &'a str,
}

#[async_trait]
impl DischargeAuthority for HttpAuthority {
    async fn redeem_ticket(&self, ticket: &[u8]) -> anyhow::Result<Vec<u8>> {
        let body = RedeemRequest {
            ticket: BASE64.encode(ticket),
        };
        let resp = self
            .client
            .post(format!("{}/tickets", self.base_url))
            .json(&body)
            .send()
            .await
            .context("ticket redemption request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("discharge authority rejected ticket: status={status}, body={body}");
        }

        let reply: RedeemResponse = resp.json().await.context("malformed redeem response")?;
        BASE64
            .decode(reply.discharge)
            .context("discharge token is not valid base64")
    }

    async fn discharge(&self, poll_secret: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(format!("{}/polls/{poll_secret}/discharge", self.base_url))
            .send()
            .await
            .context("discharge request failed")?;
        Self::expect_success(resp, "discharge").await
    }

    async fn abort(&self, poll_secret: &str, reason: &str) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(format!("{}/polls/{poll_secret}/abort", self.base_url))
            .json(&AbortRequest { reason })
            .send()
            .await
            .context("abort request failed")?;
        Self::expect_success(resp, "abort").await
    }
}
