//! Domain Layer
//!
//! Plain chat entities. No dependencies on infrastructure or application layers.

pub mod models;

// Re-export domain models
pub use models::{
    Channel, ChannelId, ChannelIdError, Draft, Member, Message, MessageId, Poll, PollOption,
    Reaction, Reminder, ThreadInfo, User, UserId,
};
