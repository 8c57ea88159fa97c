use circle_server::client::{ClientError, ConversationPoller, HttpMessagingClient, MessagingApi};
use circle_server::domain::ttl::EphemeralTtl;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;
mod common;

fn http_client(app: &common::TestApp) -> Arc<dyn MessagingApi> {
    Arc::new(HttpMessagingClient::new(&app.server_url, Duration::from_secs(5)).unwrap())
}

async fn exists(app: &common::TestApp, id: Uuid) -> bool {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM messages WHERE id = $1)")
        .bind(id)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

async fn wait_until_stamped(app: &common::TestApp, id: Uuid) {
    for _ in 0..50 {
        let stamped: bool = sqlx::query_scalar("SELECT expires_at IS NOT NULL FROM messages WHERE id = $1")
            .bind(id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
        if stamped {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("deadline for {id} was never persisted");
}

#[tokio::test]
async fn test_client_error_mapping() {
    let app = common::TestApp::spawn().await;
    let api = http_client(&app);

    let user = api.register(&common::random_wallet(), &common::random_pseudonym()).await.unwrap();
    let err = api.register(&user.wallet_address, &common::random_pseudonym()).await.unwrap_err();
    match err {
        ClientError::Api { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Wallet address already registered");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = api.list_conversations(&common::random_wallet()).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_incoming_message_is_deleted_after_read_ttl() {
    let app = common::TestApp::spawn().await;
    let (alice_wallet, alice) = app.register_user().await;
    let (bob_wallet, bob) = app.register_user().await;
    let api = http_client(&app);

    let incoming = api.send_message(&alice_wallet, &bob, "self destructs").await.unwrap();
    let outgoing = api.send_message(&bob_wallet, &alice, "stays").await.unwrap();

    let mut poller = ConversationPoller::new(Arc::clone(&api), bob_wallet.clone(), EphemeralTtl::AfterRead, Duration::from_secs(5));
    poller.open_conversation(alice.clone());
    poller.refresh().await;

    let snapshot = poller.snapshot().await;
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.conversations.len(), 1);
    let session = poller.session().unwrap();
    assert_eq!(session.scheduled_count().await, 1);
    assert!(session.ephemeral_state(incoming.id).await.unwrap().read);

    wait_until_stamped(&app, incoming.id).await;

    // Read TTL is 1.5 seconds
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(!exists(&app, incoming.id).await);
    assert!(exists(&app, outgoing.id).await);
    assert!(!poller.session().unwrap().contains(incoming.id).await);

    poller.refresh().await;
    let ids: Vec<Uuid> = poller.snapshot().await.messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![outgoing.id]);
}

#[tokio::test]
async fn test_reopened_conversation_resumes_countdown() {
    let app = common::TestApp::spawn().await;
    let (alice_wallet, alice) = app.register_user().await;
    let (bob_wallet, bob) = app.register_user().await;
    let api = http_client(&app);

    let incoming = api.send_message(&alice_wallet, &bob, "read me once").await.unwrap();

    let mut poller = ConversationPoller::new(Arc::clone(&api), bob_wallet, EphemeralTtl::AfterRead, Duration::from_secs(5));
    poller.open_conversation(alice.clone());
    poller.refresh().await;
    let first_deadline = poller.session().unwrap().ephemeral_state(incoming.id).await.unwrap().expires_at;

    // Closing right after display aborts the local timer but not the stored deadline
    poller.close_conversation();
    wait_until_stamped(&app, incoming.id).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(exists(&app, incoming.id).await);

    poller.open_conversation(alice);
    poller.refresh().await;
    let resumed = poller.session().unwrap().ephemeral_state(incoming.id).await.unwrap().expires_at;
    assert!((resumed - first_deadline).abs() < time::Duration::seconds(1));

    // Less than a full TTL after reopening
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(!exists(&app, incoming.id).await);
}

#[tokio::test]
async fn test_poller_run_loop_against_server() {
    let app = common::TestApp::spawn().await;
    let (alice_wallet, alice) = app.register_user().await;
    let (bob_wallet, bob) = app.register_user().await;
    let api = http_client(&app);

    let incoming = api.send_message(&alice_wallet, &bob, "polled").await.unwrap();

    let mut poller =
        ConversationPoller::new(Arc::clone(&api), bob_wallet, EphemeralTtl::AfterRead, Duration::from_millis(200));
    poller.open_conversation(alice);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(poller.run(shutdown_rx));

    let mut deleted = false;
    for _ in 0..40 {
        if !exists(&app, incoming.id).await {
            deleted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(deleted, "poller never deleted the incoming message");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
}
