use crate::api::AppState;
use crate::services::rate_limit_service::RateLimitScope;
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

/// Records the governor's decision for every request, labelled with the bucket it hit.
pub async fn log_rate_limit_events(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let scope = RateLimitScope::classify(request.method(), request.uri().path());
    let response = next.run(request).await;
    let retry_after = response.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok());
    state.rate_limit_service.log_decision(scope, response.status(), retry_after);
    response
}
