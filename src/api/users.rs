use crate::api::AppState;
use crate::api::schemas::users::{RegisterUserRequest, UserResponse};
use crate::error::Result;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Registers a wallet address under a pseudonym.
///
/// # Errors
/// Returns `AppError::BadRequest` if either field is malformed.
/// Returns `AppError::Conflict` if the wallet or pseudonym is taken.
pub async fn register(State(state): State<AppState>, Json(payload): Json<RegisterUserRequest>) -> Result<impl IntoResponse> {
    let user = state.user_service.register(&payload.wallet_address, &payload.pseudonym).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// # Errors
/// Returns `AppError::NotFound` if no user has this pseudonym.
pub async fn get_by_pseudonym(State(state): State<AppState>, Path(pseudonym): Path<String>) -> Result<Json<UserResponse>> {
    let user = state.user_service.find_by_pseudonym(&pseudonym).await?;
    Ok(Json(user.into()))
}
