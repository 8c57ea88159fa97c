use reqwest::StatusCode;
use serde_json::json;
mod common;

#[tokio::test]
async fn test_send_list_delete_round_trip() {
    let app = common::TestApp::spawn().await;
    let (alice_wallet, alice) = app.register_user().await;
    let (bob_wallet, bob) = app.register_user().await;

    let sent = app.send_message(&alice_wallet, &bob, "hello bob").await;
    assert_eq!(sent["content"], "hello bob");
    assert_eq!(sent["isOwn"], true);
    assert!(sent["expiresAt"].is_null());

    app.send_message(&bob_wallet, &alice, "hi alice").await;

    // Both sides see the same history, oldest first, with isOwn from their own point of view
    let for_bob = app.list_messages(&bob_wallet, &alice).await;
    assert_eq!(for_bob.len(), 2);
    assert_eq!(for_bob[0]["content"], "hello bob");
    assert_eq!(for_bob[0]["isOwn"], false);
    assert_eq!(for_bob[1]["isOwn"], true);

    let for_alice = app.list_messages(&alice_wallet, &bob).await;
    assert_eq!(for_alice[0]["isOwn"], true);
    assert_eq!(for_alice[0]["conversationId"], for_bob[0]["conversationId"]);

    let resp = app
        .client
        .post(app.url("/messages/delete"))
        .json(&json!({ "ids": [sent["id"], uuid::Uuid::new_v4()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], 1);

    let for_bob = app.list_messages(&bob_wallet, &alice).await;
    assert_eq!(for_bob.len(), 1);
    assert_eq!(for_bob[0]["content"], "hi alice");
}

#[tokio::test]
async fn test_listing_marks_incoming_read() {
    let app = common::TestApp::spawn().await;
    let (alice_wallet, alice) = app.register_user().await;
    let (bob_wallet, bob) = app.register_user().await;

    let sent = app.send_message(&alice_wallet, &bob, "unread until opened").await;
    let id = uuid::Uuid::parse_str(sent["id"].as_str().unwrap()).unwrap();

    // The sender opening the conversation does not mark their own message
    app.list_messages(&alice_wallet, &bob).await;
    let read: bool = sqlx::query_scalar("SELECT read_at IS NOT NULL FROM messages WHERE id = $1")
        .bind(id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(!read);

    app.list_messages(&bob_wallet, &alice).await;
    let read: bool = sqlx::query_scalar("SELECT read_at IS NOT NULL FROM messages WHERE id = $1")
        .bind(id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert!(read);
}

#[tokio::test]
async fn test_send_validation() {
    let app = common::TestApp::spawn().await;
    let (alice_wallet, alice) = app.register_user().await;
    let (_, bob) = app.register_user().await;

    let cases = [
        (alice_wallet.clone(), bob.clone(), "   ".to_string(), StatusCode::BAD_REQUEST),
        (alice_wallet.clone(), bob.clone(), "x".repeat(app.config.messaging.max_content_len + 1), StatusCode::BAD_REQUEST),
        (alice_wallet.clone(), alice, "note to self".to_string(), StatusCode::BAD_REQUEST),
        (alice_wallet, common::random_pseudonym(), "hello?".to_string(), StatusCode::NOT_FOUND),
        (common::random_wallet(), bob, "who am i".to_string(), StatusCode::NOT_FOUND),
    ];

    for (sender, recipient, content, expected) in cases {
        let resp = app
            .client
            .post(app.url("/messages/send"))
            .json(&json!({ "senderWallet": sender, "recipientPseudonym": recipient, "content": content }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), expected, "{recipient}");
        let body: serde_json::Value = resp.json().await.unwrap();
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_delete_batch_limit() {
    let mut config = common::get_test_config();
    config.messaging.max_batch_ids = 2;
    let app = common::TestApp::spawn_with_config(config).await;

    let ids: Vec<uuid::Uuid> = (0..3).map(|_| uuid::Uuid::new_v4()).collect();
    let resp = app.client.post(app.url("/messages/delete")).json(&json!({ "ids": ids })).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url(&format!("/users/{}", common::random_pseudonym())))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers()["x-request-id"], "trace-me-123");

    let resp = app.client.get(app.url(&format!("/users/{}", common::random_pseudonym()))).send().await.unwrap();
    let generated = resp.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());
}
