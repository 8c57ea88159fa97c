use crate::api::AppState;
use crate::api::schemas::conversations::{
    ConversationSummaryResponse, ConversationsQuery, OpenConversationRequest, OpenConversationResponse,
};
use crate::error::Result;
use axum::{
    Json,
    extract::{Query, State},
};

/// Lists the caller's conversations, most recently active first.
///
/// # Errors
/// Returns `AppError::NotFound` if the wallet is not registered.
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationsQuery>,
) -> Result<Json<Vec<ConversationSummaryResponse>>> {
    let summaries = state.conversation_service.list_for_wallet(&query.wallet_address).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

/// Returns the stable conversation id for the caller and another user, creating it on first contact.
///
/// # Errors
/// Returns `AppError::NotFound` if either user is unknown.
/// Returns `AppError::BadRequest` if the caller names themselves.
pub async fn open_conversation(
    State(state): State<AppState>,
    Json(payload): Json<OpenConversationRequest>,
) -> Result<Json<OpenConversationResponse>> {
    let conversation_id = state
        .conversation_service
        .lookup_or_create_by_handles(&payload.wallet_address, &payload.other_user_pseudonym)
        .await?;
    Ok(Json(OpenConversationResponse { conversation_id }))
}
