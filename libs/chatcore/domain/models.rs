//! Chat entities as they appear on the wire and in the local store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type MessageId = String;
pub type UserId = String;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelIdError {
    #[error("invalid channel id '{0}', expected <type>:<id>")]
    Malformed(String),
}

/// Channel identifier in `type:id` form, e.g. `messaging:general`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId {
    kind: String,
    id: String,
}

impl ChannelId {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Channel type, e.g. `messaging`
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl FromStr for ChannelId {
    type Err = ChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(Self::new(kind, id)),
            _ => Err(ChannelIdError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ChannelIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChannelId> for String {
    fn from(cid: ChannelId) -> Self {
        cid.to_string()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            image: None,
            role: None,
            online: false,
            last_active: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: MessageId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "default_score")]
    pub score: u32,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_score() -> u32 {
    1
}

impl Reaction {
    /// Id of the reacting user, if known
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub cid: Option<ChannelId>,
    #[serde(default)]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Thread root this message replies to
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    #[serde(default)]
    pub show_in_channel: bool,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub reaction_counts: HashMap<String, u32>,
    #[serde(default)]
    pub latest_reactions: Vec<Reaction>,
}

impl Message {
    pub fn new(id: impl Into<MessageId>, text: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            cid: None,
            user: None,
            created_at,
            updated_at: None,
            deleted_at: None,
            parent_id: None,
            show_in_channel: false,
            reply_count: 0,
            pinned: false,
            reaction_counts: HashMap::new(),
            latest_reactions: Vec::new(),
        }
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Thread replies stay out of the channel list unless echoed
    #[inline]
    pub fn is_visible_in_channel(&self) -> bool {
        self.parent_id.is_none() || self.show_in_channel
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub cid: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub created_by: Option<User>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub frozen: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub channel_role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub parent_message_id: MessageId,
    pub cid: ChannelId,
    #[serde(default)]
    pub reply_count: u32,
    #[serde(default)]
    pub participant_count: u32,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub cid: ChannelId,
    #[serde(default)]
    pub parent_id: Option<MessageId>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub message_id: MessageId,
    pub cid: ChannelId,
    #[serde(default)]
    pub remind_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
