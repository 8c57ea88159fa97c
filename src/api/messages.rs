use crate::api::AppState;
use crate::api::schemas::messaging::{
    DeleteMessagesRequest, DeleteMessagesResponse, ExpiryStampResponse, MessageResponse, MessagesQuery,
    SendMessageRequest, StampExpiryRequest,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Returns the conversation with another user and marks it read for the caller.
///
/// # Errors
/// Returns `AppError::NotFound` if either user does not exist.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<MessageResponse>>> {
    let history = state.message_service.list(&query.wallet_address, &query.other_user_pseudonym).await?;
    Ok(Json(MessageResponse::list_from_history(history)))
}

/// Sends a text message to a user identified by pseudonym.
///
/// # Errors
/// Returns `AppError::BadRequest` if the content is empty or too long.
/// Returns `AppError::NotFound` if the sender or recipient does not exist.
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let message =
        state.message_service.send(&payload.sender_wallet, &payload.recipient_pseudonym, &payload.content).await?;
    let sender_id = message.sender_id;
    Ok((StatusCode::CREATED, Json(MessageResponse::from_message(message, sender_id))))
}

/// Deletes messages by id. Used both for manual deletion and ephemeral expiry.
///
/// # Errors
/// Returns `AppError::BadRequest` if too many ids are given.
pub async fn delete_messages(
    State(state): State<AppState>,
    Json(payload): Json<DeleteMessagesRequest>,
) -> Result<Json<DeleteMessagesResponse>> {
    let deleted = state.message_service.delete_batch(&payload.ids).await?;
    Ok(Json(DeleteMessagesResponse { deleted }))
}

/// Persists ephemeral deadlines for messages the caller has displayed.
///
/// # Errors
/// Returns `AppError::BadRequest` if the TTL is out of range.
/// Returns `AppError::NotFound` if the caller is not registered.
pub async fn stamp_expiry(
    State(state): State<AppState>,
    Json(payload): Json<StampExpiryRequest>,
) -> Result<Json<Vec<ExpiryStampResponse>>> {
    let stamps = state.message_service.stamp_expiry(&payload.wallet_address, &payload.ids, payload.ttl_ms).await?;
    Ok(Json(stamps.into_iter().map(Into::into).collect()))
}
