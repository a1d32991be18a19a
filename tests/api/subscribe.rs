use std::sync::Arc;

use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use mailblog::domain::SubscriptionStatus;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{message_of, token_of, TestApp, UnreachableStore};

#[tokio::test]
async fn subscribe_returns_a_200_for_a_valid_email() {
    let app = TestApp::spawn().await;
    let email: String = SafeEmail().fake();

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app.post_subscribe(&json!({ "email": email })).await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(message_of(response).await, "User subscribed successfully");
}

#[tokio::test]
async fn subscribe_persists_a_pending_subscriber() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    let email = "ursula_le_guin@gmail.com";

    let token = app.subscribe_and_get_token(email).await;

    let saved = app.subscriber(email).await.unwrap();
    assert_eq!(saved.status(), SubscriptionStatus::Pending);
    assert_eq!(saved.token().as_ref(), token);
}

#[tokio::test]
async fn subscribe_normalizes_the_email_address() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    let response = app
        .post_subscribe(&json!({ "email": "  Ursula_Le_Guin@Gmail.com " }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert!(app.subscriber("ursula_le_guin@gmail.com").await.is_some());
}

#[tokio::test]
async fn subscribe_sends_a_verification_email_with_both_links() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;

    app.post_subscribe(&json!({ "email": "ursula_le_guin@gmail.com" }))
        .await;

    let links = app.last_email_links().await;
    assert_eq!(links.text.len(), 1);
    assert_eq!(links.html.len(), 2);
    assert_eq!(links.html[0], links.text[0]);
    assert_eq!(links.html[0].path(), "/verify");
    assert_eq!(links.html[1].path(), "/unsubscribe");
    assert_eq!(token_of(&links.html[0]), token_of(&links.html[1]));
}

#[tokio::test]
async fn subscribe_returns_a_400_when_the_email_is_missing() {
    let app = TestApp::spawn().await;
    let test_cases = vec![
        (json!({}), "missing email"),
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": null }), "null email"),
        (json!({ "name": "le guin" }), "unrelated field"),
    ];

    for (body, description) in test_cases {
        let response = app.post_subscribe(&body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had a {description}."
        );
        assert_eq!(message_of(response).await, "Email is required");
    }
    assert_eq!(app.sent_emails().await, 0);
}

#[tokio::test]
async fn subscribe_returns_a_400_when_the_email_is_not_valid() {
    let app = TestApp::spawn().await;
    let test_cases = vec!["definitely-not-an-email", "ursula.domain.com", "@domain.com"];

    for email in test_cases {
        let response = app.post_subscribe(&json!({ "email": email })).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request for `{email}`."
        );
        assert_eq!(message_of(response).await, "Email is not valid");
    }
    assert_eq!(app.sent_emails().await, 0);
}

#[tokio::test]
async fn subscribe_returns_a_500_for_a_malformed_body() {
    let app = TestApp::spawn().await;

    let response = app.post_subscribe_raw("{\"email\": ".into()).await;

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(message_of(response).await, "Internal server error");
}

#[tokio::test]
async fn subscribing_a_verified_email_is_rejected_without_changes() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    let email = "ursula_le_guin@gmail.com";
    let token = app.subscribe_and_get_token(email).await;
    app.get_verify(&[("email", email), ("token", &token)])
        .await
        .error_for_status()
        .unwrap();
    let sent_before = app.sent_emails().await;

    let response = app.post_subscribe(&json!({ "email": email })).await;

    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(message_of(response).await, "User already subscribed");
    let saved = app.subscriber(email).await.unwrap();
    assert_eq!(saved.status(), SubscriptionStatus::Verified);
    assert_eq!(saved.token().as_ref(), token);
    assert_eq!(app.sent_emails().await, sent_before);
}

#[tokio::test]
async fn subscribing_twice_invalidates_the_first_token() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    let email = "ursula_le_guin@gmail.com";

    let first = app.subscribe_and_get_token(email).await;
    let second = app.subscribe_and_get_token(email).await;
    assert_ne!(first, second);

    let response = app.get_verify(&[("email", email), ("token", &first)]).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .get_verify(&[("email", email), ("token", &second)])
        .await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn an_unsubscribed_email_can_subscribe_again() {
    let app = TestApp::spawn().await;
    app.accept_emails().await;
    let email = "ursula_le_guin@gmail.com";
    let token = app.subscribe_and_get_token(email).await;
    app.get_unsubscribe(&[("email", email), ("token", &token)])
        .await
        .error_for_status()
        .unwrap();

    let response = app.post_subscribe(&json!({ "email": email })).await;

    assert_eq!(response.status().as_u16(), 200);
    let saved = app.subscriber(email).await.unwrap();
    assert_eq!(saved.status(), SubscriptionStatus::Pending);
    assert_ne!(saved.token().as_ref(), token);
}

#[tokio::test]
async fn subscribe_returns_a_500_when_the_email_cannot_be_sent() {
    let app = TestApp::spawn().await;
    app.reject_emails().await;

    let response = app
        .post_subscribe(&json!({ "email": "ursula_le_guin@gmail.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(message_of(response).await, "Internal server error");
}

#[tokio::test]
async fn subscribe_returns_a_500_when_the_store_is_unreachable() {
    let app = TestApp::spawn_with_store(Arc::new(UnreachableStore)).await;
    app.accept_emails().await;

    let response = app
        .post_subscribe(&json!({ "email": "ursula_le_guin@gmail.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(message_of(response).await, "Internal server error");
    assert_eq!(app.sent_emails().await, 0);
}

#[tokio::test]
async fn subscribe_returns_the_envelope_for_an_oversized_body() {
    let app = TestApp::spawn().await;
    let padding = "a".repeat(300 * 1024);

    let response = app
        .post_subscribe(&json!({ "email": "ursula_le_guin@gmail.com", "padding": padding }))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    assert_eq!(response.headers()["Access-Control-Allow-Origin"], "*");
    assert_eq!(message_of(response).await, "Internal server error");
    assert!(app.subscriber("ursula_le_guin@gmail.com").await.is_none());
}
