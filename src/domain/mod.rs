pub mod conversation;
pub mod message;
pub mod ttl;
pub mod user;
