use std::sync::Arc;

use crate::correlation::engine::EngineHandle;
use crate::correlation::store::PendingRequest;
use crate::errors::AppError;
use crate::notification::slack::Notifier;

/// Polled façade: the discharge authority already issued `poll_secret` and
/// will poll for the outcome on its own; nobody blocks in-process. The
/// engine reports the resolution straight to the authority.
pub struct PolledApproval {
    notifier: Arc<dyn Notifier>,
    engine: EngineHandle,
    channel: String,
}

impl PolledApproval {
    pub fn new(notifier: Arc<dyn Notifier>, engine: EngineHandle, channel: String) -> Self {
        Self {
            notifier,
            engine,
            channel,
        }
    }

    /// Post the prompt and register a polled entry. A prompt-post failure
    /// is fatal to this round: nothing is registered.
    pub async fn request(
        &self,
        requester: Option<&str>,
        poll_secret: &str,
    ) -> Result<(), AppError> {
        let text = match requester {
            Some(name) => format!(":interrobang: @{name} would like to deploy. :+1: or :-1:?"),
            None => ":interrobang: attempting to deploy. :+1: or :-1:?".to_string(),
        };

        let token = self
            .notifier
            .post_message(&self.channel, &text)
            .await
            .map_err(AppError::PromptFailed)?;

        self.engine
            .register(PendingRequest::polled(token, poll_secret.to_string()))
            .await;
        Ok(())
    }
}
