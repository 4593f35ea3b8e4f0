use std::sync::Arc;

use tokio::sync::oneshot;

use crate::correlation::engine::EngineHandle;
use crate::correlation::store::{PendingRequest, Resolution};
use crate::discharge::DischargeAuthority;
use crate::errors::AppError;
use crate::notification::slack::Notifier;

/// Outcome returned to the blocked HTTP caller.
#[derive(Debug)]
pub struct TicketOutcome {
    pub respondent: String,
    pub approved: bool,
    /// Discharge token, present only on approval.
    pub discharge: Option<Vec<u8>>,
}

/// Synchronous façade: the caller blocks inside its HTTP handler until a
/// human answers or the sweep expires the entry. Timeout policy lives in
/// the engine's sweep alone; this side only waits.
pub struct SyncApproval {
    notifier: Arc<dyn Notifier>,
    authority: Arc<dyn DischargeAuthority>,
    engine: EngineHandle,
    channel: String,
}

impl SyncApproval {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        authority: Arc<dyn DischargeAuthority>,
        engine: EngineHandle,
        channel: String,
    ) -> Self {
        Self {
            notifier,
            authority,
            engine,
            channel,
        }
    }

    /// Redeem the ticket, post the prompt, register, and wait for the
    /// engine's resolution. If this future is dropped before resolution
    /// (client disconnect), the guard cancels the pending entry.
    pub async fn request(&self, requester: &str, ticket: &[u8]) -> Result<TicketOutcome, AppError> {
        let discharge = self
            .authority
            .redeem_ticket(ticket)
            .await
            .map_err(|e| AppError::TicketRejected(e.to_string()))?;

        let text = format!(":interrobang: @{requester} would like to deploy. :+1: or :-1:?");
        let token = self
            .notifier
            .post_message(&self.channel, &text)
            .await
            .map_err(AppError::PromptFailed)?;

        let (tx, rx) = oneshot::channel();
        self.engine
            .register(PendingRequest::synchronous(token.clone(), tx))
            .await;
        let mut guard = CancelGuard {
            engine: self.engine.clone(),
            token: Some(token),
        };

        let resolution = match rx.await {
            Ok(resolution) => resolution,
            Err(_) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "correlation engine dropped the resolution channel"
                )))
            }
        };
        // The entry is terminal; nothing left to cancel.
        guard.disarm();

        match resolution {
            Resolution::Answered { approver, approved } => {
                let respondent = match self.notifier.display_name(&approver).await {
                    Ok(name) => name,
                    Err(e) => {
                        tracing::debug!(
                            user = %approver,
                            error = %e,
                            "display name lookup failed; using raw id"
                        );
                        approver
                    }
                };
                Ok(TicketOutcome {
                    respondent,
                    approved,
                    discharge: approved.then_some(discharge),
                })
            }
            Resolution::Expired => Err(AppError::ApprovalTimeout),
            Resolution::Superseded => Err(AppError::Superseded),
        }
    }
}

/// Cancels the pending entry if the waiting future is dropped before the
/// engine resolves it.
struct CancelGuard {
    engine: EngineHandle,
    token: Option<String>,
}

impl CancelGuard {
    fn disarm(&mut self) {
        self.token = None;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.engine.cancel(token);
        }
    }
}
