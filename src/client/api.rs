use crate::api::schemas::conversations::{
    ConversationSummaryResponse, ConversationsQuery, OpenConversationRequest, OpenConversationResponse,
};
use crate::api::schemas::messaging::{
    DeleteMessagesRequest, DeleteMessagesResponse, ExpiryStampResponse, MessageResponse, MessagesQuery,
    SendMessageRequest, StampExpiryRequest,
};
use crate::api::schemas::users::{RegisterUserRequest, UserResponse};
use crate::client::ClientError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

/// The messaging operations a client needs from the server.
#[async_trait]
pub trait MessagingApi: Send + Sync + std::fmt::Debug {
    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn register(&self, wallet_address: &str, pseudonym: &str) -> Result<UserResponse, ClientError>;

    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn open_conversation(&self, wallet_address: &str, other_pseudonym: &str) -> Result<Uuid, ClientError>;

    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn list_conversations(&self, wallet_address: &str) -> Result<Vec<ConversationSummaryResponse>, ClientError>;

    /// Fetches a conversation; the server marks it read for `wallet_address`.
    ///
    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn list_messages(&self, wallet_address: &str, other_pseudonym: &str)
    -> Result<Vec<MessageResponse>, ClientError>;

    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn send_message(
        &self,
        sender_wallet: &str,
        recipient_pseudonym: &str,
        content: &str,
    ) -> Result<MessageResponse, ClientError>;

    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn delete_messages(&self, ids: &[Uuid]) -> Result<u64, ClientError>;

    /// # Errors
    /// Returns `ClientError` if the request fails or the server rejects it.
    async fn stamp_expiry(
        &self,
        wallet_address: &str,
        ids: &[Uuid],
        ttl_ms: u64,
    ) -> Result<Vec<ExpiryStampResponse>, ClientError>;
}

/// [`MessagingApi`] over the server's JSON HTTP interface.
#[derive(Clone, Debug)]
pub struct HttpMessagingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMessagingClient {
    /// Creates a client for a server such as `http://127.0.0.1:3000`.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidUrl` if the URL is not http(s), or
    /// `ClientError::Transport` if the HTTP client cannot be built.
    pub fn new(server_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let trimmed = server_url.trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(server_url.to_string()));
        }
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { http, base_url: format!("{trimmed}/v1") })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(ToString::to_string))
            .unwrap_or(body);
        Err(ClientError::Api { status: status.as_u16(), message })
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingClient {
    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn register(&self, wallet_address: &str, pseudonym: &str) -> Result<UserResponse, ClientError> {
        let body =
            RegisterUserRequest { wallet_address: wallet_address.to_string(), pseudonym: pseudonym.to_string() };
        let response = self.http.post(self.url("/users")).json(&body).send().await?;
        Self::decode(response).await
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn open_conversation(&self, wallet_address: &str, other_pseudonym: &str) -> Result<Uuid, ClientError> {
        let body = OpenConversationRequest {
            wallet_address: wallet_address.to_string(),
            other_user_pseudonym: other_pseudonym.to_string(),
        };
        let response = self.http.post(self.url("/conversations")).json(&body).send().await?;
        let opened: OpenConversationResponse = Self::decode(response).await?;
        Ok(opened.conversation_id)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn list_conversations(&self, wallet_address: &str) -> Result<Vec<ConversationSummaryResponse>, ClientError> {
        let query = ConversationsQuery { wallet_address: wallet_address.to_string() };
        let response = self.http.get(self.url("/conversations")).query(&query).send().await?;
        Self::decode(response).await
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn list_messages(
        &self,
        wallet_address: &str,
        other_pseudonym: &str,
    ) -> Result<Vec<MessageResponse>, ClientError> {
        let query = MessagesQuery {
            wallet_address: wallet_address.to_string(),
            other_user_pseudonym: other_pseudonym.to_string(),
        };
        let response = self.http.get(self.url("/messages")).query(&query).send().await?;
        Self::decode(response).await
    }

    #[tracing::instrument(level = "debug", skip(self, content), err)]
    async fn send_message(
        &self,
        sender_wallet: &str,
        recipient_pseudonym: &str,
        content: &str,
    ) -> Result<MessageResponse, ClientError> {
        let body = SendMessageRequest {
            sender_wallet: sender_wallet.to_string(),
            recipient_pseudonym: recipient_pseudonym.to_string(),
            content: content.to_string(),
        };
        let response = self.http.post(self.url("/messages/send")).json(&body).send().await?;
        Self::decode(response).await
    }

    #[tracing::instrument(level = "debug", skip(self), fields(batch_count = ids.len()), err)]
    async fn delete_messages(&self, ids: &[Uuid]) -> Result<u64, ClientError> {
        let body = DeleteMessagesRequest { ids: ids.to_vec() };
        let response = self.http.post(self.url("/messages/delete")).json(&body).send().await?;
        let deleted: DeleteMessagesResponse = Self::decode(response).await?;
        Ok(deleted.deleted)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(batch_count = ids.len()), err)]
    async fn stamp_expiry(
        &self,
        wallet_address: &str,
        ids: &[Uuid],
        ttl_ms: u64,
    ) -> Result<Vec<ExpiryStampResponse>, ClientError> {
        let body = StampExpiryRequest { wallet_address: wallet_address.to_string(), ids: ids.to_vec(), ttl_ms };
        let response = self.http.post(self.url("/messages/expiry")).json(&body).send().await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_http_url() {
        let res = HttpMessagingClient::new("ftp://example.com", Duration::from_secs(1));
        assert!(matches!(res, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_new_normalises_trailing_slash() {
        let client = HttpMessagingClient::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/messages"), "http://localhost:3000/v1/messages");
    }
}
