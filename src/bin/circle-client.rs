use circle_server::client::{ConversationPoller, HttpMessagingClient, MessagingApi};
use circle_server::config::ClientConfig;
use circle_server::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    circle_server::setup_panic_hook();

    let api: Arc<dyn MessagingApi> = Arc::new(HttpMessagingClient::new(
        &config.server_url,
        Duration::from_secs(config.request_timeout_secs),
    )?);

    let mut poller = ConversationPoller::new(
        Arc::clone(&api),
        config.wallet_address.clone(),
        config.ttl,
        Duration::from_secs(config.poll_interval_secs.max(1)),
    );

    if let Some(other) = &config.conversation {
        let conversation_id = api.open_conversation(&config.wallet_address, other).await?;
        tracing::info!(%conversation_id, other = %other, "Conversation opened");
        poller.open_conversation(other.clone());

        if let Some(content) = &config.send {
            let sent = poller.send(content).await?;
            tracing::info!(message_id = %sent.id, "Message sent");
        }
    } else if config.send.is_some() {
        tracing::warn!("--send ignored without --conversation");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    circle_server::spawn_signal_handler(shutdown_tx);

    poller.run(shutdown_rx).await;

    telemetry_guard.shutdown();
    Ok(())
}
