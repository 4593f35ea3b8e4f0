//! Single-task correlation engine.
//!
//! All mutation of the pending-request store is serialized through one
//! command loop, so there is a strict total order between Register,
//! SubmitReply, Cancel, and the expiry sweep: each entry is resolved
//! exactly once, by whichever operation reaches it first.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::correlation::store::{Mode, PendingRequest, PendingStore, Resolution};
use crate::discharge::DischargeAuthority;

/// One human reaction, translated to a vote on a pending request.
/// Produced by the inbound event pipeline, consumed exactly once here.
#[derive(Debug, Clone)]
pub struct ReplyEvent {
    pub token: String,
    pub approver: String,
    pub approved: bool,
}

enum Command {
    Register(PendingRequest),
    Reply(ReplyEvent),
    Cancel(String),
}

/// Cloneable handle for sending commands into the engine's serialized
/// stream. Sends may wait briefly when the engine is busy, but the engine
/// never calls back into a sender, so they cannot deadlock against it.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
}

impl EngineHandle {
    /// Insert (or displace) the entry for `request.token`. No reply; the
    /// effect is observable only through later resolution.
    pub async fn register(&self, request: PendingRequest) {
        if self.tx.send(Command::Register(request)).await.is_err() {
            tracing::error!("correlation engine is gone; dropping registration");
        }
    }

    /// Submit a translated reaction. Unknown tokens are silently dropped
    /// by the engine, so late and duplicate replies are safe to send.
    pub async fn submit_reply(&self, event: ReplyEvent) {
        if self.tx.send(Command::Reply(event)).await.is_err() {
            tracing::error!("correlation engine is gone; dropping reply");
        }
    }

    /// Remove the entry for `token` without signalling anyone. Non-async
    /// so it can run from a `Drop` guard when a waiter disconnects.
    pub fn cancel(&self, token: String) {
        if self.tx.try_send(Command::Cancel(token)).is_err() {
            tracing::warn!("correlation engine queue unavailable; cancel dropped");
        }
    }
}

/// The actor owning the pending-request store.
pub struct Engine {
    rx: mpsc::Receiver<Command>,
    store: PendingStore,
    authority: Arc<dyn DischargeAuthority>,
    deadline: Duration,
    sweep_interval: Duration,
}

impl Engine {
    const QUEUE_DEPTH: usize = 256;

    pub fn new(
        authority: Arc<dyn DischargeAuthority>,
        deadline: Duration,
        sweep_interval: Duration,
    ) -> (EngineHandle, Engine) {
        let (tx, rx) = mpsc::channel(Self::QUEUE_DEPTH);
        let engine = Engine {
            rx,
            store: PendingStore::default(),
            authority,
            deadline,
            sweep_interval,
        };
        (EngineHandle { tx }, engine)
    }

    /// Spawn the engine onto the runtime. Call once at startup.
    pub fn spawn(
        authority: Arc<dyn DischargeAuthority>,
        deadline: Duration,
        sweep_interval: Duration,
    ) -> EngineHandle {
        let (handle, engine) = Self::new(authority, deadline, sweep_interval);
        tokio::spawn(engine.run());
        handle
    }

    pub async fn run(mut self) {
        let mut tick = time::interval(self.sweep_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // Drain queued commands before sweeping: a reply that
                // arrived before the tick must win over the sweep.
                biased;

                cmd = self.rx.recv() => match cmd {
                    Some(Command::Register(request)) => self.register(request),
                    Some(Command::Reply(event)) => self.reply(event),
                    Some(Command::Cancel(token)) => self.cancel(&token),
                    None => {
                        tracing::debug!("all engine handles dropped; stopping");
                        return;
                    }
                },

                _ = tick.tick() => self.sweep(Instant::now()),
            }
        }
    }

    fn register(&mut self, request: PendingRequest) {
        tracing::debug!(token = %request.token, "registered pending approval");
        if let Some(displaced) = self.store.insert(request) {
            tracing::warn!(
                token = %displaced.token,
                "token re-registered; superseding previous entry"
            );
            self.resolve(displaced, Resolution::Superseded);
        }
    }

    fn reply(&mut self, event: ReplyEvent) {
        match self.store.take(&event.token) {
            Some(request) => {
                tracing::info!(
                    token = %event.token,
                    approver = %event.approver,
                    approved = event.approved,
                    "pending approval resolved"
                );
                self.resolve(
                    request,
                    Resolution::Answered {
                        approver: event.approver,
                        approved: event.approved,
                    },
                );
            }
            // Late, duplicate, or unrelated reactions land here. Dropping
            // them silently is what makes replays safe.
            None => tracing::debug!(token = %event.token, "reply for unknown token ignored"),
        }
    }

    fn cancel(&mut self, token: &str) {
        // The waiter already gave up: remove without signalling the
        // channel or the discharge authority.
        if self.store.take(token).is_some() {
            tracing::debug!(token, "pending approval cancelled");
        }
    }

    fn sweep(&mut self, now: Instant) {
        for request in self.store.take_expired(self.deadline, now) {
            tracing::info!(token = %request.token, "pending approval expired");
            self.resolve(request, Resolution::Expired);
        }
    }

    fn resolve(&self, request: PendingRequest, resolution: Resolution) {
        match request.mode {
            Mode::Synchronous { reply } => {
                // The receiver may already be gone if a disconnect raced
                // the cancel command; the entry is terminal either way.
                let _ = reply.send(resolution);
            }
            Mode::Polled { poll_secret } => self.finish_poll(poll_secret, resolution),
        }
    }

    /// Report a polled entry's outcome to the discharge authority.
    /// Fire-and-forget off the engine task: failures are logged, never
    /// retried, and the entry is already removed.
    fn finish_poll(&self, poll_secret: String, resolution: Resolution) {
        let authority = Arc::clone(&self.authority);
        tokio::spawn(async move {
            let result = match resolution {
                Resolution::Answered { approved: true, .. } => {
                    authority.discharge(&poll_secret).await
                }
                Resolution::Answered {
                    approver,
                    approved: false,
                } => {
                    authority
                        .abort(&poll_secret, &format!("rejected by @{approver}"))
                        .await
                }
                Resolution::Expired => authority.abort(&poll_secret, "timeout").await,
                Resolution::Superseded => authority.abort(&poll_secret, "superseded").await,
            };

            if let Err(e) = result {
                tracing::warn!(error = %e, "discharge authority call failed");
            }
        });
    }
}
