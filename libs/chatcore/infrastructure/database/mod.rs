//! Local store collaborator
//!
//! Writes run a closure against a `DatabaseSession`; the store commits when
//! the closure returns `Ok` and discards every change when it returns `Err`.

pub mod memory;

use crate::domain::{
    Channel, ChannelId, Draft, Member, Message, MessageId, Poll, Reaction, Reminder, ThreadInfo,
};
use std::collections::HashMap;
use thiserror::Error;

pub use memory::InMemoryDatabase;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("{entity} references missing {parent} '{id}'")]
    MissingParent {
        entity: &'static str,
        parent: &'static str,
        id: String,
    },

    #[error("Invalid {entity}: {reason}")]
    Invalid { entity: &'static str, reason: String },

    #[error("Write aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Messages already resolved during the current write
///
/// Saves record into it and loads consult it first, so a batch touching
/// the same message many times only looks it up once.
#[derive(Debug, Default, Clone)]
pub struct CacheHint {
    messages: HashMap<MessageId, Message>,
}

impl CacheHint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            messages: messages.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn insert(&mut self, message: Message) {
        self.messages.insert(message.id.clone(), message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Save/load per entity inside one write
pub trait DatabaseSession {
    fn save_channel(&mut self, channel: &Channel) -> Result<()>;
    fn load_channel(&self, cid: &ChannelId) -> Option<Channel>;

    fn save_message(
        &mut self,
        cid: &ChannelId,
        message: &Message,
        cache: Option<&mut CacheHint>,
    ) -> Result<()>;
    fn load_message(&self, id: &str, cache: Option<&CacheHint>) -> Option<Message>;
    /// Messages of a channel ordered oldest to newest
    fn load_messages(&self, cid: &ChannelId) -> Vec<Message>;

    fn save_messages(
        &mut self,
        cid: &ChannelId,
        messages: &[Message],
        mut cache: Option<&mut CacheHint>,
    ) -> Result<usize> {
        for message in messages {
            self.save_message(cid, message, cache.as_deref_mut())?;
        }
        Ok(messages.len())
    }

    fn save_member(&mut self, cid: &ChannelId, member: &Member) -> Result<()>;
    fn load_member(&self, cid: &ChannelId, user_id: &str) -> Option<Member>;

    fn save_reaction(&mut self, reaction: &Reaction) -> Result<()>;
    fn delete_reaction(&mut self, reaction: &Reaction) -> Result<()>;
    fn load_reactions(&self, message_id: &str) -> Vec<Reaction>;

    fn save_thread(&mut self, thread: &ThreadInfo) -> Result<()>;
    fn load_thread(&self, parent_message_id: &str) -> Option<ThreadInfo>;

    fn save_draft(&mut self, draft: &Draft) -> Result<()>;
    fn load_draft(&self, cid: &ChannelId, parent_id: Option<&str>) -> Option<Draft>;

    fn save_reminder(&mut self, reminder: &Reminder) -> Result<()>;
    fn load_reminder(&self, message_id: &str) -> Option<Reminder>;

    fn save_poll(&mut self, poll: &Poll) -> Result<()>;
    fn load_poll(&self, id: &str) -> Option<Poll>;
}

/// Transactional store
pub trait Database: Send + Sync {
    /// Run `actions` in a write; commit on `Ok`, roll back on `Err`
    fn write(&self, actions: &mut dyn FnMut(&mut dyn DatabaseSession) -> Result<()>) -> Result<()>;

    fn read(&self, actions: &mut dyn FnMut(&dyn DatabaseSession));
}

impl dyn Database {
    /// Read a single value out of the store
    pub fn read_value<T>(&self, f: impl FnOnce(&dyn DatabaseSession) -> T) -> T
    where
        T: Default,
    {
        let mut f = Some(f);
        let mut value = T::default();
        self.read(&mut |session| {
            if let Some(f) = f.take() {
                value = f(session);
            }
        });
        value
    }
}
