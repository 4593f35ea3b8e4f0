use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::correlation::engine::ReplyEvent;
use crate::errors::AppError;
use crate::notification::events::{self, EventCallback, InnerEvent};
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct TicketRequest {
    pub name: String,
    /// Base64-encoded caveat ticket, redeemed with the discharge authority.
    pub ticket: String,
}

#[derive(Serialize)]
pub struct TicketReply {
    pub respondent: String,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharge: Option<String>,
}

#[derive(Deserialize)]
pub struct PollRequest {
    pub name: Option<String>,
    pub poll_secret: String,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /ticket — synchronous approval. Blocks until a human answers, the
/// entry expires, or the client disconnects.
pub async fn post_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TicketRequest>,
) -> Result<Json<TicketReply>, AppError> {
    let ticket = BASE64
        .decode(&req.ticket)
        .map_err(|e| AppError::BadRequest(format!("ticket is not valid base64: {e}")))?;

    let outcome = state.sync_approval.request(&req.name, &ticket).await?;

    Ok(Json(TicketReply {
        respondent: outcome.respondent,
        approved: outcome.approved,
        discharge: outcome.discharge.map(|d| BASE64.encode(d)),
    }))
}

/// POST /polls — polled approval. Registers the round and returns
/// immediately; the discharge authority learns the outcome via its poll.
pub async fn post_poll(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PollRequest>,
) -> Result<StatusCode, AppError> {
    state
        .polled_approval
        .request(req.name.as_deref(), &req.poll_secret)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /events — notifier event callback. The signature is verified
/// before the body is parsed; malformed input never reaches the engine.
pub async fn post_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let timestamp = header_str(&headers, "x-slack-request-timestamp")?;
    let signature = header_str(&headers, "x-slack-signature")?;

    if let Err(e) = events::verify_signature(
        &state.config.slack_signing_secret,
        timestamp,
        &body,
        signature,
    ) {
        tracing::warn!(error = %e, "rejected event callback");
        return Err(AppError::BadSignature);
    }

    let callback: EventCallback = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("unparseable event body: {e}")))?;

    match callback {
        EventCallback::UrlVerification { challenge } => Ok(challenge.into_response()),

        EventCallback::EventCallback { event } => {
            match event {
                InnerEvent::ReactionAdded {
                    user,
                    reaction,
                    item,
                } => {
                    let approved =
                        events::classify_reaction(&reaction, &state.config.approve_reactions);
                    tracing::info!(
                        token = %item.ts,
                        reactor = %user,
                        reaction = %reaction,
                        approved,
                        "reaction received"
                    );
                    state
                        .engine
                        .submit_reply(ReplyEvent {
                            token: item.ts,
                            approver: user,
                            approved,
                        })
                        .await;
                }

                InnerEvent::AppMention { channel } => {
                    // Courtesy ack so the bot is visibly alive in-channel.
                    let notifier = Arc::clone(&state.notifier);
                    tokio::spawn(async move {
                        if let Err(e) = notifier.post_message(&channel, "Yes, hello.").await {
                            tracing::warn!(error = %e, "mention acknowledgement failed");
                        }
                    });
                }

                InnerEvent::Unknown => {}
            }
            Ok(StatusCode::OK.into_response())
        }

        EventCallback::Unknown => Ok(StatusCode::OK.into_response()),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::BadSignature)
}
