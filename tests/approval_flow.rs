//! End-to-end façade tests: notifier + engine + discharge authority wired
//! together with in-process fakes, exercising both consumption modes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use signoff::approval::polled::PolledApproval;
use signoff::approval::sync::SyncApproval;
use signoff::correlation::engine::{Engine, EngineHandle, ReplyEvent};
use signoff::discharge::DischargeAuthority;
use signoff::errors::AppError;
use signoff::notification::slack::Notifier;

/// Notifier that returns canned message ids and knows one display name.
struct FakeNotifier {
    message_id: String,
    posted: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn post_message(&self, _channel: &str, text: &str) -> anyhow::Result<String> {
        let _ = self.posted.send(text.to_string());
        Ok(self.message_id.clone())
    }

    async fn display_name(&self, user_id: &str) -> anyhow::Result<String> {
        match user_id {
            "U-ALICE" => Ok("alice".to_string()),
            _ => anyhow::bail!("user_not_found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AuthorityCall {
    Discharge(String),
    Abort(String, String),
}

struct FakeAuthority {
    calls: mpsc::UnboundedSender<AuthorityCall>,
}

#[async_trait]
impl DischargeAuthority for FakeAuthority {
    async fn redeem_ticket(&self, ticket: &[u8]) -> anyhow::Result<Vec<u8>> {
        if ticket == b"bad-ticket" {
            anyhow::bail!("unsupported caveats in 3p caveat");
        }
        Ok(b"discharge-token".to_vec())
    }

    async fn discharge(&self, poll_secret: &str) -> anyhow::Result<()> {
        let _ = self.calls.send(AuthorityCall::Discharge(poll_secret.into()));
        Ok(())
    }

    async fn abort(&self, poll_secret: &str, reason: &str) -> anyhow::Result<()> {
        let _ = self
            .calls
            .send(AuthorityCall::Abort(poll_secret.into(), reason.into()));
        Ok(())
    }
}

struct Harness {
    engine: EngineHandle,
    notifier: Arc<dyn Notifier>,
    authority: Arc<dyn DischargeAuthority>,
    prompts: mpsc::UnboundedReceiver<String>,
    authority_calls: mpsc::UnboundedReceiver<AuthorityCall>,
}

fn harness(message_id: &str, deadline: Duration) -> Harness {
    let (prompt_tx, prompts) = mpsc::unbounded_channel();
    let (call_tx, authority_calls) = mpsc::unbounded_channel();

    let notifier: Arc<dyn Notifier> = Arc::new(FakeNotifier {
        message_id: message_id.to_string(),
        posted: prompt_tx,
    });
    let authority: Arc<dyn DischargeAuthority> = Arc::new(FakeAuthority { calls: call_tx });
    let engine = Engine::spawn(Arc::clone(&authority), deadline, Duration::from_secs(5));

    Harness {
        engine,
        notifier,
        authority,
        prompts,
        authority_calls,
    }
}

#[tokio::test]
async fn sync_flow_returns_display_name_and_discharge_on_approval() {
    let mut h = harness("msg123", Duration::from_secs(300));
    let facade = SyncApproval::new(
        Arc::clone(&h.notifier),
        Arc::clone(&h.authority),
        h.engine.clone(),
        "C123".into(),
    );

    let engine = h.engine.clone();
    let waiter = tokio::spawn(async move { facade.request("peter", b"ticket").await });

    // The prompt names the requester.
    let prompt = h.prompts.recv().await.unwrap();
    assert!(prompt.contains("@peter"), "prompt was: {prompt}");

    // Wait until the round is registered (the prompt is posted first),
    // then approve it.
    engine
        .submit_reply(ReplyEvent {
            token: "msg123".into(),
            approver: "U-ALICE".into(),
            approved: true,
        })
        .await;

    let outcome = waiter.await.unwrap().unwrap();
    assert_eq!(outcome.respondent, "alice");
    assert!(outcome.approved);
    assert_eq!(outcome.discharge.as_deref(), Some(&b"discharge-token"[..]));
}

#[tokio::test]
async fn sync_flow_rejection_carries_raw_id_when_lookup_fails() {
    let mut h = harness("msg124", Duration::from_secs(300));
    let facade = SyncApproval::new(
        Arc::clone(&h.notifier),
        Arc::clone(&h.authority),
        h.engine.clone(),
        "C123".into(),
    );

    let engine = h.engine.clone();
    let waiter = tokio::spawn(async move { facade.request("peter", b"ticket").await });

    h.prompts.recv().await.unwrap();
    engine
        .submit_reply(ReplyEvent {
            token: "msg124".into(),
            approver: "U-UNKNOWN".into(),
            approved: false,
        })
        .await;

    let outcome = waiter.await.unwrap().unwrap();
    assert_eq!(outcome.respondent, "U-UNKNOWN");
    assert!(!outcome.approved);
    assert!(outcome.discharge.is_none(), "no discharge on rejection");
}

#[tokio::test]
async fn sync_flow_bad_ticket_registers_nothing() {
    let mut h = harness("msg125", Duration::from_secs(300));
    let facade = SyncApproval::new(
        Arc::clone(&h.notifier),
        Arc::clone(&h.authority),
        h.engine.clone(),
        "C123".into(),
    );

    let err = facade.request("peter", b"bad-ticket").await.unwrap_err();
    assert!(matches!(err, AppError::TicketRejected(_)));
    assert!(h.prompts.try_recv().is_err(), "no prompt for a bad ticket");
}

#[tokio::test(start_paused = true)]
async fn sync_flow_times_out_via_the_sweep() {
    let mut h = harness("msg126", Duration::from_secs(60));
    let facade = SyncApproval::new(
        Arc::clone(&h.notifier),
        Arc::clone(&h.authority),
        h.engine.clone(),
        "C123".into(),
    );

    let waiter = tokio::spawn(async move { facade.request("peter", b"ticket").await });
    h.prompts.recv().await.unwrap();

    let err = waiter.await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::ApprovalTimeout));
}

#[tokio::test]
async fn polled_flow_registers_under_the_posted_message_id() {
    let mut h = harness("msg456", Duration::from_secs(300));
    let facade = PolledApproval::new(Arc::clone(&h.notifier), h.engine.clone(), "C123".into());

    facade.request(Some("peter"), "sek1").await.unwrap();
    h.prompts.recv().await.unwrap();

    h.engine
        .submit_reply(ReplyEvent {
            token: "msg456".into(),
            approver: "bob".into(),
            approved: false,
        })
        .await;

    assert_eq!(
        h.authority_calls.recv().await.unwrap(),
        AuthorityCall::Abort("sek1".into(), "rejected by @bob".into())
    );
}

#[tokio::test]
async fn polled_flow_anonymous_prompt_has_no_requester() {
    let mut h = harness("msg457", Duration::from_secs(300));
    let facade = PolledApproval::new(Arc::clone(&h.notifier), h.engine.clone(), "C123".into());

    facade.request(None, "sek2").await.unwrap();
    let prompt = h.prompts.recv().await.unwrap();
    assert!(prompt.contains("attempting to deploy"), "prompt was: {prompt}");
}
