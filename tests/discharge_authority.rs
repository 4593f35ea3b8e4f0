//! HTTP discharge-authority client tests against a wiremock server.

use base64::engine::general_purpose::STANDARD as BASE64;
use tokio_test::assert_ok;
use base64::Engine as _;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use signoff::discharge::{DischargeAuthority, HttpAuthority};

#[tokio::test]
async fn redeem_ticket_decodes_discharge_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tickets"))
        .and(body_json(serde_json::json!({
            "ticket": BASE64.encode(b"ticket-bytes"),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "discharge": BASE64.encode(b"discharge-bytes"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let authority = HttpAuthority::new(server.uri());
    let discharge = tokio_test::assert_ok!(authority.redeem_ticket(b"ticket-bytes").await);
    assert_eq!(discharge, b"discharge-bytes");
}

#[tokio::test]
async fn redeem_ticket_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(400).set_body_string("unsupported caveats"))
        .mount(&server)
        .await;

    let authority = HttpAuthority::new(server.uri());
    let err = authority.redeem_ticket(b"bad").await.unwrap_err();
    assert!(err.to_string().contains("rejected ticket"));
}

#[tokio::test]
async fn discharge_posts_to_the_poll_resource() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/polls/sek1/discharge"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let authority = HttpAuthority::new(server.uri());
    tokio_test::assert_ok!(authority.discharge("sek1").await);
}

#[tokio::test]
async fn abort_carries_the_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/polls/sek2/abort"))
        .and(body_json(serde_json::json!({ "reason": "timeout" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let authority = HttpAuthority::new(server.uri());
    tokio_test::assert_ok!(authority.abort("sek2", "timeout").await);
}

#[tokio::test]
async fn authority_failure_is_reported_not_panicked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/polls/sek3/abort"))
        .respond_with(ResponseTemplate::new(500).set_body_string("poll store unavailable"))
        .mount(&server)
        .await;

    let authority = HttpAuthority::new(server.uri());
    let err = authority.abort("sek3", "timeout").await.unwrap_err();
    assert!(err.to_string().contains("abort failed"));
}
