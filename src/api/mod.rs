use crate::api::rate_limit::log_rate_limit_events;
use crate::config::Config;
use crate::services::conversation_service::ConversationService;
use crate::services::health_service::HealthService;
use crate::services::message_service::MessageService;
use crate::services::rate_limit_service::RateLimitService;
use crate::services::user_service::UserService;
use anyhow::anyhow;
use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode};
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub mod conversations;
pub mod health;
pub mod messages;
pub mod middleware;
pub mod rate_limit;
pub mod schemas;
pub mod users;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub user_service: UserService,
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
    pub rate_limit_service: RateLimitService,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub user_service: UserService,
    pub conversation_service: ConversationService,
    pub message_service: MessageService,
    pub rate_limit_service: RateLimitService,
}

/// Configures and returns the public API router.
///
/// # Errors
/// Returns an error if a rate limiter configuration cannot be constructed.
pub fn app_router(config: Config, services: ServiceContainer) -> anyhow::Result<Router> {
    let std_interval_ns = 1_000_000_000 / config.rate_limit.per_second.max(1);
    let standard_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(std_interval_ns))
            .burst_size(config.rate_limit.burst)
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .ok_or_else(|| anyhow!("invalid standard rate limiter configuration"))?,
    );

    // Registration gets its own, stricter bucket.
    let registration_interval_ns = 1_000_000_000 / config.rate_limit.registration_per_second.max(1);
    let registration_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(registration_interval_ns))
            .burst_size(config.rate_limit.registration_burst)
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .ok_or_else(|| anyhow!("invalid registration rate limiter configuration"))?,
    );

    let request_timeout = Duration::from_secs(config.server.request_timeout_secs);

    let state = AppState {
        config,
        user_service: services.user_service,
        conversation_service: services.conversation_service,
        message_service: services.message_service,
        rate_limit_service: services.rate_limit_service,
    };

    let registration_routes =
        Router::new().route("/users", post(users::register)).layer(GovernorLayer::new(registration_conf));

    let api_routes = Router::new()
        .route("/users/{pseudonym}", get(users::get_by_pseudonym))
        .route("/conversations", get(conversations::list_conversations).post(conversations::open_conversation))
        .route("/messages", get(messages::list_messages))
        .route("/messages/send", post(messages::send_message))
        .route("/messages/delete", post(messages::delete_messages))
        .route("/messages/expiry", post(messages::stamp_expiry))
        .layer(GovernorLayer::new(standard_conf));

    let request_id_header = HeaderName::from_static(middleware::REQUEST_ID_HEADER);

    Ok(Router::new()
        .nest("/v1", registration_routes.merge(api_routes))
        .layer(from_fn_with_state(state.clone(), log_rate_limit_events))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(|response: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                    let status = response.status();
                    span.record("http.response.status_code", status.as_u16());

                    tracing::info!(
                        latency_ms = %latency.as_millis(),
                        status = %status.as_u16(),
                        "request completed"
                    );
                })
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(request_id_header, middleware::MakeRequestUuidOrHeader))
        .with_state(state))
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
