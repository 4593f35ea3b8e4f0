use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

/// Opaque identifier tying a posted prompt to its eventual human reply.
/// In practice this is the message id the notifier returns when the prompt
/// is posted; reactions to that message carry the same id.
pub type CorrelationToken = String;

/// How the outcome of a pending request is consumed.
pub enum Mode {
    /// A caller is blocked on the other end of this channel. The engine
    /// owns the sender until resolution and always signals it, including
    /// on expiry, so a blocked waiter can never leak.
    Synchronous { reply: oneshot::Sender<Resolution> },
    /// An external discharge authority polls for the outcome by secret;
    /// nobody blocks in-process.
    Polled { poll_secret: String },
}

/// Terminal signal delivered to a synchronous waiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answered { approver: String, approved: bool },
    Expired,
    /// A later registration reused this token and displaced the entry.
    Superseded,
}

/// One outstanding human-approval round.
pub struct PendingRequest {
    pub token: CorrelationToken,
    pub registered_at: Instant,
    pub mode: Mode,
}

impl PendingRequest {
    pub fn synchronous(token: CorrelationToken, reply: oneshot::Sender<Resolution>) -> Self {
        Self {
            token,
            registered_at: Instant::now(),
            mode: Mode::Synchronous { reply },
        }
    }

    pub fn polled(token: CorrelationToken, poll_secret: String) -> Self {
        Self {
            token,
            registered_at: Instant::now(),
            mode: Mode::Polled { poll_secret },
        }
    }
}

/// Token → pending request map. Owned exclusively by the engine task;
/// no other component reads or writes it. The set is bounded by the
/// human-approval rate, so the O(n) sweep is cheap.
#[derive(Default)]
pub struct PendingStore {
    entries: HashMap<CorrelationToken, PendingRequest>,
}

impl PendingStore {
    /// Insert an entry, returning the displaced one if the token was
    /// already pending.
    pub fn insert(&mut self, request: PendingRequest) -> Option<PendingRequest> {
        self.entries.insert(request.token.clone(), request)
    }

    /// Remove and return the entry for `token`, if pending.
    pub fn take(&mut self, token: &str) -> Option<PendingRequest> {
        self.entries.remove(token)
    }

    /// Remove and return every entry older than `deadline` as of `now`.
    pub fn take_expired(&mut self, deadline: Duration, now: Instant) -> Vec<PendingRequest> {
        let expired: Vec<CorrelationToken> = self
            .entries
            .values()
            .filter(|r| now.duration_since(r.registered_at) >= deadline)
            .map(|r| r.token.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|token| self.entries.remove(&token))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
