pub mod conversation_service;
pub mod health_service;
pub mod message_service;
pub mod rate_limit_service;
pub mod user_service;
