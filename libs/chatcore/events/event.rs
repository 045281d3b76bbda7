//! Typed domain events
//!
//! Frames are decoded in two phases. The envelope (`type`, `cid`,
//! `created_at`) is read first; the discriminator then selects the payload
//! shape. Discriminators this client does not know decode to
//! `DomainEvent::Unknown` so newer servers never break older clients.

use crate::domain::{ChannelId, Message, Reaction, User};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame has no string `type` discriminator")]
    MissingType,

    #[error("Invalid `{event_type}` payload: {source}")]
    InvalidPayload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Wire discriminators this client understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    HealthCheck,
    MessageNew,
    MessageUpdated,
    MessageDeleted,
    MessageRead,
    UserStartWatching,
    UserStopWatching,
    ReactionNew,
    ReactionDeleted,
    TypingStart,
    TypingStop,
    NotificationMarkRead,
}

impl EventType {
    pub const ALL: [EventType; 12] = [
        EventType::HealthCheck,
        EventType::MessageNew,
        EventType::MessageUpdated,
        EventType::MessageDeleted,
        EventType::MessageRead,
        EventType::UserStartWatching,
        EventType::UserStopWatching,
        EventType::ReactionNew,
        EventType::ReactionDeleted,
        EventType::TypingStart,
        EventType::TypingStop,
        EventType::NotificationMarkRead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::HealthCheck => "health.check",
            EventType::MessageNew => "message.new",
            EventType::MessageUpdated => "message.updated",
            EventType::MessageDeleted => "message.deleted",
            EventType::MessageRead => "message.read",
            EventType::UserStartWatching => "user.watching.start",
            EventType::UserStopWatching => "user.watching.stop",
            EventType::ReactionNew => "reaction.new",
            EventType::ReactionDeleted => "reaction.deleted",
            EventType::TypingStart => "typing.start",
            EventType::TypingStop => "typing.stop",
            EventType::NotificationMarkRead => "notification.mark_read",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == raw)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    HealthCheck {
        connection_id: String,
        me: Option<User>,
    },
    MessageNew {
        message: Message,
        user: User,
        watcher_count: u32,
        unread_count: u32,
        total_unread_count: u32,
    },
    MessageUpdated {
        message: Message,
        user: Option<User>,
    },
    MessageDeleted {
        message: Message,
        user: Option<User>,
    },
    MessageRead {
        user: User,
    },
    UserStartWatching {
        user: User,
        watcher_count: u32,
    },
    UserStopWatching {
        user: User,
        watcher_count: u32,
    },
    ReactionNew {
        reaction: Reaction,
        message: Message,
        user: User,
    },
    ReactionDeleted {
        reaction: Reaction,
        message: Message,
        user: User,
    },
    TypingStart {
        user: User,
    },
    TypingStop {
        user: User,
    },
    NotificationMarkRead {
        unread_count: u32,
        total_unread_count: u32,
    },
    /// Passthrough for discriminators this client does not know
    Unknown {
        raw_type: String,
    },
}

impl DomainEvent {
    /// `None` for `Unknown`
    pub fn event_type(&self) -> Option<EventType> {
        Some(match self {
            DomainEvent::HealthCheck { .. } => EventType::HealthCheck,
            DomainEvent::MessageNew { .. } => EventType::MessageNew,
            DomainEvent::MessageUpdated { .. } => EventType::MessageUpdated,
            DomainEvent::MessageDeleted { .. } => EventType::MessageDeleted,
            DomainEvent::MessageRead { .. } => EventType::MessageRead,
            DomainEvent::UserStartWatching { .. } => EventType::UserStartWatching,
            DomainEvent::UserStopWatching { .. } => EventType::UserStopWatching,
            DomainEvent::ReactionNew { .. } => EventType::ReactionNew,
            DomainEvent::ReactionDeleted { .. } => EventType::ReactionDeleted,
            DomainEvent::TypingStart { .. } => EventType::TypingStart,
            DomainEvent::TypingStop { .. } => EventType::TypingStop,
            DomainEvent::NotificationMarkRead { .. } => EventType::NotificationMarkRead,
            DomainEvent::Unknown { .. } => return None,
        })
    }

    /// Discriminator as it appeared on the wire
    pub fn raw_type(&self) -> &str {
        match self {
            DomainEvent::Unknown { raw_type } => raw_type,
            other => other.event_type().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    /// User who caused the event, if any
    pub fn user(&self) -> Option<&User> {
        match self {
            DomainEvent::MessageNew { user, .. }
            | DomainEvent::MessageRead { user }
            | DomainEvent::UserStartWatching { user, .. }
            | DomainEvent::UserStopWatching { user, .. }
            | DomainEvent::ReactionNew { user, .. }
            | DomainEvent::ReactionDeleted { user, .. }
            | DomainEvent::TypingStart { user }
            | DomainEvent::TypingStop { user } => Some(user),
            DomainEvent::MessageUpdated { user, .. } | DomainEvent::MessageDeleted { user, .. } => {
                user.as_ref()
            }
            DomainEvent::HealthCheck { me, .. } => me.as_ref(),
            DomainEvent::NotificationMarkRead { .. } | DomainEvent::Unknown { .. } => None,
        }
    }

    /// Message carried by the event, if any
    pub fn message(&self) -> Option<&Message> {
        match self {
            DomainEvent::MessageNew { message, .. }
            | DomainEvent::MessageUpdated { message, .. }
            | DomainEvent::MessageDeleted { message, .. }
            | DomainEvent::ReactionNew { message, .. }
            | DomainEvent::ReactionDeleted { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// One decoded frame: the event plus its routing envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub cid: Option<ChannelId>,
    pub created_at: Option<DateTime<Utc>>,
    pub event: DomainEvent,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    cid: Option<ChannelId>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct HealthCheckPayload {
    connection_id: String,
    #[serde(default)]
    me: Option<User>,
}

#[derive(Deserialize)]
struct MessageNewPayload {
    message: Message,
    user: User,
    watcher_count: u32,
    unread_count: u32,
    total_unread_count: u32,
}

#[derive(Deserialize)]
struct MessageChangePayload {
    message: Message,
    #[serde(default)]
    user: Option<User>,
}

#[derive(Deserialize)]
struct UserPayload {
    user: User,
}

#[derive(Deserialize)]
struct WatchingPayload {
    user: User,
    watcher_count: u32,
}

#[derive(Deserialize)]
struct ReactionPayload {
    reaction: Reaction,
    message: Message,
    user: User,
}

#[derive(Deserialize)]
struct MarkReadPayload {
    unread_count: u32,
    total_unread_count: u32,
}

fn payload<T: DeserializeOwned>(value: &Value, event_type: EventType) -> Result<T> {
    T::deserialize(value).map_err(|source| DecodeError::InvalidPayload {
        event_type: event_type.as_str().to_string(),
        source,
    })
}

impl ChatEvent {
    /// Decode one JSON frame
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let envelope = Envelope::deserialize(value).map_err(|source| {
            DecodeError::InvalidPayload {
                event_type: "envelope".to_string(),
                source,
            }
        })?;
        let raw_type = envelope.kind.ok_or(DecodeError::MissingType)?;

        let event = match EventType::from_wire(&raw_type) {
            None => DomainEvent::Unknown { raw_type },
            Some(event_type) => Self::decode_known(value, event_type)?,
        };

        Ok(ChatEvent {
            cid: envelope.cid,
            created_at: envelope.created_at,
            event,
        })
    }

    fn decode_known(value: &Value, event_type: EventType) -> Result<DomainEvent> {
        Ok(match event_type {
            EventType::HealthCheck => {
                let p: HealthCheckPayload = payload(value, event_type)?;
                DomainEvent::HealthCheck {
                    connection_id: p.connection_id,
                    me: p.me,
                }
            }
            EventType::MessageNew => {
                let p: MessageNewPayload = payload(value, event_type)?;
                DomainEvent::MessageNew {
                    message: p.message,
                    user: p.user,
                    watcher_count: p.watcher_count,
                    unread_count: p.unread_count,
                    total_unread_count: p.total_unread_count,
                }
            }
            EventType::MessageUpdated => {
                let p: MessageChangePayload = payload(value, event_type)?;
                DomainEvent::MessageUpdated {
                    message: p.message,
                    user: p.user,
                }
            }
            EventType::MessageDeleted => {
                let p: MessageChangePayload = payload(value, event_type)?;
                DomainEvent::MessageDeleted {
                    message: p.message,
                    user: p.user,
                }
            }
            EventType::MessageRead => {
                let p: UserPayload = payload(value, event_type)?;
                DomainEvent::MessageRead { user: p.user }
            }
            EventType::UserStartWatching => {
                let p: WatchingPayload = payload(value, event_type)?;
                DomainEvent::UserStartWatching {
                    user: p.user,
                    watcher_count: p.watcher_count,
                }
            }
            EventType::UserStopWatching => {
                let p: WatchingPayload = payload(value, event_type)?;
                DomainEvent::UserStopWatching {
                    user: p.user,
                    watcher_count: p.watcher_count,
                }
            }
            EventType::ReactionNew => {
                let p: ReactionPayload = payload(value, event_type)?;
                DomainEvent::ReactionNew {
                    reaction: p.reaction,
                    message: p.message,
                    user: p.user,
                }
            }
            EventType::ReactionDeleted => {
                let p: ReactionPayload = payload(value, event_type)?;
                DomainEvent::ReactionDeleted {
                    reaction: p.reaction,
                    message: p.message,
                    user: p.user,
                }
            }
            EventType::TypingStart => {
                let p: UserPayload = payload(value, event_type)?;
                DomainEvent::TypingStart { user: p.user }
            }
            EventType::TypingStop => {
                let p: UserPayload = payload(value, event_type)?;
                DomainEvent::TypingStop { user: p.user }
            }
            EventType::NotificationMarkRead => {
                let p: MarkReadPayload = payload(value, event_type)?;
                DomainEvent::NotificationMarkRead {
                    unread_count: p.unread_count,
                    total_unread_count: p.total_unread_count,
                }
            }
        })
    }

    #[inline]
    pub fn event_type(&self) -> Option<EventType> {
        self.event.event_type()
    }
}
