pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::ConversationSummaryRecord;
pub use message::{ExpiryStampRecord, MessageRecord};
pub use user::UserRecord;
