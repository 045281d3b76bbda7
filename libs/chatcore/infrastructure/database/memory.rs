use super::{CacheHint, Database, DatabaseError, DatabaseSession, Result};
use crate::domain::{
    Channel, ChannelId, Draft, Member, Message, MessageId, Poll, Reaction, Reminder, ThreadInfo,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone)]
struct Store {
    channels: HashMap<ChannelId, Channel>,
    messages: HashMap<MessageId, (ChannelId, Message)>,
    members: HashMap<(ChannelId, String), Member>,
    reactions: HashMap<MessageId, Vec<Reaction>>,
    threads: HashMap<MessageId, ThreadInfo>,
    drafts: HashMap<(ChannelId, Option<MessageId>), Draft>,
    reminders: HashMap<MessageId, Reminder>,
    polls: HashMap<String, Poll>,
}

impl DatabaseSession for Store {
    fn save_channel(&mut self, channel: &Channel) -> Result<()> {
        self.channels.insert(channel.cid.clone(), channel.clone());
        Ok(())
    }

    fn load_channel(&self, cid: &ChannelId) -> Option<Channel> {
        self.channels.get(cid).cloned()
    }

    fn save_message(
        &mut self,
        cid: &ChannelId,
        message: &Message,
        cache: Option<&mut CacheHint>,
    ) -> Result<()> {
        if message.id.is_empty() {
            return Err(DatabaseError::Invalid {
                entity: "message",
                reason: "empty id".to_string(),
            });
        }

        let mut stored = message.clone();
        stored.cid = Some(cid.clone());
        if let Some(cache) = cache {
            cache.insert(stored.clone());
        }
        self.messages
            .insert(stored.id.clone(), (cid.clone(), stored));
        Ok(())
    }

    fn load_message(&self, id: &str, cache: Option<&CacheHint>) -> Option<Message> {
        if let Some(message) = cache.and_then(|c| c.message(id)) {
            return Some(message.clone());
        }
        self.messages.get(id).map(|(_, m)| m.clone())
    }

    fn load_messages(&self, cid: &ChannelId) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .values()
            .filter(|(owner, _)| owner == cid)
            .map(|(_, m)| m.clone())
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        messages
    }

    fn save_member(&mut self, cid: &ChannelId, member: &Member) -> Result<()> {
        self.members
            .insert((cid.clone(), member.user.id.clone()), member.clone());
        Ok(())
    }

    fn load_member(&self, cid: &ChannelId, user_id: &str) -> Option<Member> {
        self.members
            .get(&(cid.clone(), user_id.to_string()))
            .cloned()
    }

    fn save_reaction(&mut self, reaction: &Reaction) -> Result<()> {
        if !self.messages.contains_key(&reaction.message_id) {
            return Err(DatabaseError::MissingParent {
                entity: "reaction",
                parent: "message",
                id: reaction.message_id.clone(),
            });
        }

        let reactions = self.reactions.entry(reaction.message_id.clone()).or_default();
        reactions.retain(|r| !(r.kind == reaction.kind && r.user_id() == reaction.user_id()));
        reactions.push(reaction.clone());
        Ok(())
    }

    fn delete_reaction(&mut self, reaction: &Reaction) -> Result<()> {
        if let Some(reactions) = self.reactions.get_mut(&reaction.message_id) {
            reactions.retain(|r| !(r.kind == reaction.kind && r.user_id() == reaction.user_id()));
        }
        Ok(())
    }

    fn load_reactions(&self, message_id: &str) -> Vec<Reaction> {
        self.reactions.get(message_id).cloned().unwrap_or_default()
    }

    fn save_thread(&mut self, thread: &ThreadInfo) -> Result<()> {
        if !self.messages.contains_key(&thread.parent_message_id) {
            return Err(DatabaseError::MissingParent {
                entity: "thread",
                parent: "message",
                id: thread.parent_message_id.clone(),
            });
        }
        self.threads
            .insert(thread.parent_message_id.clone(), thread.clone());
        Ok(())
    }

    fn load_thread(&self, parent_message_id: &str) -> Option<ThreadInfo> {
        self.threads.get(parent_message_id).cloned()
    }

    fn save_draft(&mut self, draft: &Draft) -> Result<()> {
        self.drafts
            .insert((draft.cid.clone(), draft.parent_id.clone()), draft.clone());
        Ok(())
    }

    fn load_draft(&self, cid: &ChannelId, parent_id: Option<&str>) -> Option<Draft> {
        self.drafts
            .get(&(cid.clone(), parent_id.map(str::to_string)))
            .cloned()
    }

    fn save_reminder(&mut self, reminder: &Reminder) -> Result<()> {
        self.reminders
            .insert(reminder.message_id.clone(), reminder.clone());
        Ok(())
    }

    fn load_reminder(&self, message_id: &str) -> Option<Reminder> {
        self.reminders.get(message_id).cloned()
    }

    fn save_poll(&mut self, poll: &Poll) -> Result<()> {
        if poll.options.is_empty() {
            return Err(DatabaseError::Invalid {
                entity: "poll",
                reason: format!("poll '{}' has no options", poll.id),
            });
        }
        self.polls.insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    fn load_poll(&self, id: &str) -> Option<Poll> {
        self.polls.get(id).cloned()
    }
}

/// Process-local `Database`
///
/// A write works on a copy of the store and swaps it in on success.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    store: Mutex<Store>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for InMemoryDatabase {
    fn write(&self, actions: &mut dyn FnMut(&mut dyn DatabaseSession) -> Result<()>) -> Result<()> {
        let mut store = self.store.lock();
        let mut draft = store.clone();

        match actions(&mut draft) {
            Ok(()) => {
                *store = draft;
                debug!("Database write committed");
                Ok(())
            }
            Err(e) => {
                warn!("Database write rolled back: {}", e);
                Err(e)
            }
        }
    }

    fn read(&self, actions: &mut dyn FnMut(&dyn DatabaseSession)) {
        let store = self.store.lock();
        actions(&*store);
    }
}
