//! Inbound event verification and translation.
//!
//! Every callback is authenticated before its body is parsed: the platform
//! signs `v0:{timestamp}:{body}` with HMAC-SHA256 under the shared signing
//! secret. Verified reaction events are classified into approve/reject
//! votes; everything else on a tracked message counts as a rejection
//! (deliberately coarse — the approve-set is configuration, not code).

use anyhow::Context;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Maximum allowed clock skew between the signed timestamp and now.
/// Requests outside this window are treated as replays.
const REPLAY_WINDOW_SECS: i64 = 60 * 5;

/// Compute the request signature for `body` at `timestamp`.
/// Returns the `v0=<hex>` form the platform sends in its header.
pub fn sign(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(format!("v0:{timestamp}:").as_bytes());
    mac.update(body);
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify an inbound callback signature. Constant-time comparison; the
/// timestamp must fall within the replay window.
pub fn verify_signature(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
) -> anyhow::Result<()> {
    let ts: i64 = timestamp.parse().context("unparseable signature timestamp")?;
    let now = chrono::Utc::now().timestamp();
    if (now - ts).abs() > REPLAY_WINDOW_SECS {
        anyhow::bail!("signature timestamp outside replay window");
    }

    let expected = sign(signing_secret, timestamp, body);
    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        anyhow::bail!("signature mismatch")
    }
}

/// Is this reaction name a vote to approve?
pub fn classify_reaction(reaction: &str, approve_set: &[String]) -> bool {
    approve_set.iter().any(|r| r == reaction)
}

/// Top-level callback envelope.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventCallback {
    /// Endpoint ownership handshake: echo the challenge back.
    UrlVerification { challenge: String },
    EventCallback { event: InnerEvent },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InnerEvent {
    ReactionAdded {
        user: String,
        reaction: String,
        item: ReactionItem,
    },
    AppMention {
        channel: String,
    },
    #[serde(other)]
    Unknown,
}

/// The message a reaction was attached to. `ts` is the correlation token.
#[derive(Debug, Deserialize)]
pub struct ReactionItem {
    pub ts: String,
}
