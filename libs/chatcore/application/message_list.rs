//! Message list use case
//!
//! Owns the pagination state of one channel together with the locally
//! visible message window, and keeps both in step with page fetches and
//! live events.

use crate::domain::{ChannelId, Message, MessageId};
use crate::events::{ChatEvent, DomainEvent, Subscription};
use crate::infrastructure::api::{ApiError, ChatApi};
use crate::infrastructure::database::{CacheHint, Database, DatabaseError, DatabaseSession};
use crate::pagination::{
    MessagesPagination, MessagesPaginationState, MessagesPaginationStateHandler,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PaginationError {
    #[error("a {0} page request is already in flight")]
    AlreadyLoading(&'static str),

    #[error("no more {0} messages to load")]
    NothingToLoad(&'static str),

    /// The window was reloaded or jumped while this request was in flight
    #[error("page request superseded by a reload")]
    Superseded,

    #[error("message query failed: {0}")]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, PaginationError>;

/// How a fetched page lands in the local window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    Replace,
    Extend,
}

struct ListState {
    handler: MessagesPaginationStateHandler,
    messages: Vec<Message>,
    /// Bumped whenever the window is replaced; responses from older epochs
    /// are dropped
    epoch: u64,
}

pub struct MessageListController {
    cid: ChannelId,
    page_size: usize,
    api: Arc<dyn ChatApi>,
    database: Arc<dyn Database>,
    state: Mutex<ListState>,
    /// Live event feed; delivery ends when the controller is dropped
    feed: Option<Subscription>,
}

impl MessageListController {
    pub fn new(
        cid: ChannelId,
        page_size: usize,
        api: Arc<dyn ChatApi>,
        database: Arc<dyn Database>,
    ) -> Self {
        Self {
            cid,
            page_size,
            api,
            database,
            state: Mutex::new(ListState {
                handler: MessagesPaginationStateHandler::new(),
                messages: Vec::new(),
                epoch: 0,
            }),
            feed: None,
        }
    }

    /// Tie a live event subscription to the controller's lifetime
    pub fn with_feed(mut self, subscription: Subscription) -> Self {
        self.feed = Some(subscription);
        self
    }

    pub fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    pub fn cid(&self) -> &ChannelId {
        &self.cid
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Snapshot of the visible window, oldest first
    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn pagination_state(&self) -> MessagesPaginationState {
        self.state.lock().await.handler.state().clone()
    }

    /// Messages stored locally for this channel, for display before the
    /// first page arrives
    pub fn cached_messages(&self) -> Vec<Message> {
        self.database
            .read_value(|session| session.load_messages(&self.cid))
            .into_iter()
            .filter(Message::is_visible_in_channel)
            .collect()
    }

    /// Load the newest page, resetting the list
    pub async fn load_first_page(&self) -> Result<usize> {
        let pagination = MessagesPagination::first_page(self.page_size);
        let epoch = {
            let mut list = self.state.lock().await;
            list.epoch += 1;
            list.handler.begin(&pagination);
            list.epoch
        };
        self.fetch(pagination, epoch, Merge::Replace, None).await
    }

    /// Load the page before the oldest fetched message
    pub async fn load_previous_messages(&self) -> Result<usize> {
        let (pagination, epoch) = {
            let mut list = self.state.lock().await;
            let state = list.handler.state();
            if state.is_loading_previous_messages {
                return Err(PaginationError::AlreadyLoading("previous"));
            }
            // The window is about to be replaced by the jump
            if state.is_loading_middle_messages {
                return Err(PaginationError::AlreadyLoading("middle"));
            }
            if state.has_loaded_all_previous_messages {
                return Err(PaginationError::NothingToLoad("previous"));
            }
            let cursor = state
                .oldest_fetched_message
                .as_ref()
                .map(|m| m.id.clone())
                .ok_or(PaginationError::NothingToLoad("previous"))?;

            let pagination = MessagesPagination::less_than(self.page_size, cursor);
            list.handler.begin(&pagination);
            (pagination, list.epoch)
        };
        self.fetch(pagination, epoch, Merge::Extend, None).await
    }

    /// Load the page after the newest fetched message
    ///
    /// Only meaningful while jumping; at the live tail new messages arrive
    /// through events.
    pub async fn load_next_messages(&self) -> Result<usize> {
        let (pagination, epoch) = {
            let mut list = self.state.lock().await;
            let state = list.handler.state();
            if state.is_loading_next_messages {
                return Err(PaginationError::AlreadyLoading("next"));
            }
            // The window is about to be replaced by the jump
            if state.is_loading_middle_messages {
                return Err(PaginationError::AlreadyLoading("middle"));
            }
            if state.has_loaded_all_next_messages() {
                return Err(PaginationError::NothingToLoad("next"));
            }
            let cursor = state
                .newest_fetched_message()
                .map(|m| m.id.clone())
                .ok_or(PaginationError::NothingToLoad("next"))?;

            let pagination = MessagesPagination::greater_than(self.page_size, cursor);
            list.handler.begin(&pagination);
            (pagination, list.epoch)
        };
        self.fetch(pagination, epoch, Merge::Extend, None).await
    }

    /// Jump to the window surrounding `message_id`
    ///
    /// Pages still in flight for the current window are superseded. If the
    /// jump fails the current window keeps its tail boundary.
    pub async fn load_page_around(&self, message_id: impl Into<MessageId>) -> Result<usize> {
        let (pagination, epoch, boundary) = {
            let mut list = self.state.lock().await;
            if list.handler.state().is_loading_middle_messages {
                return Err(PaginationError::AlreadyLoading("middle"));
            }
            let pagination = MessagesPagination::around(self.page_size, message_id);
            let boundary = list.handler.next_boundary();
            list.epoch += 1;
            list.handler.release_directional();
            list.handler.begin(&pagination);
            (pagination, list.epoch, boundary)
        };
        self.fetch(pagination, epoch, Merge::Replace, Some(boundary))
            .await
    }

    async fn fetch(
        &self,
        pagination: MessagesPagination,
        epoch: u64,
        merge: Merge,
        boundary: Option<(bool, Option<Message>)>,
    ) -> Result<usize> {
        debug!("Fetching {} page {:?}", self.cid, pagination.parameter);
        let result = self.api.query_messages(&self.cid, &pagination).await;

        let mut list = self.state.lock().await;
        if list.epoch != epoch {
            debug!("Dropping stale {} page {:?}", self.cid, pagination.parameter);
            return Err(PaginationError::Superseded);
        }

        list.handler.end(&pagination, &result);
        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                list.handler.cancel(&pagination);
                if let Some(boundary) = boundary {
                    list.handler.restore_next_boundary(boundary);
                }
                warn!("Page request for {} failed: {}", self.cid, e);
                return Err(e.into());
            }
        };

        self.persist(|session| {
            let mut cache = CacheHint::new();
            session.save_messages(&self.cid, &messages, Some(&mut cache))?;
            Ok(())
        });

        let count = messages.len();
        let visible = messages.into_iter().filter(Message::is_visible_in_channel);
        match merge {
            Merge::Replace => {
                list.messages = visible.collect();
                sort_messages(&mut list.messages);
            }
            Merge::Extend => {
                for message in visible {
                    upsert(&mut list.messages, message);
                }
                sort_messages(&mut list.messages);
            }
        }

        info!(
            "Loaded {} messages for {} ({} in window)",
            count,
            self.cid,
            list.messages.len()
        );
        Ok(count)
    }

    /// Apply a live event; returns whether the visible window changed
    pub async fn handle_event(&self, event: &ChatEvent) -> bool {
        if event.cid.as_ref() != Some(&self.cid) {
            return false;
        }

        match &event.event {
            DomainEvent::MessageNew { message, .. } => {
                self.persist(|session| session.save_message(&self.cid, message, None));

                let mut list = self.state.lock().await;
                // While jumping the window is anchored in history; the new
                // message shows up once the tail is paginated back in
                if list.handler.state().is_jumping_to_message() || !message.is_visible_in_channel()
                {
                    return false;
                }
                upsert(&mut list.messages, message.clone());
                sort_messages(&mut list.messages);
                true
            }
            DomainEvent::MessageUpdated { message, .. } | DomainEvent::MessageDeleted { message, .. } => {
                self.persist(|session| session.save_message(&self.cid, message, None));
                self.replace_if_present(message).await
            }
            DomainEvent::ReactionNew { reaction, message, .. } => {
                self.persist(|session| {
                    session.save_message(&self.cid, message, None)?;
                    session.save_reaction(reaction)
                });
                self.replace_if_present(message).await
            }
            DomainEvent::ReactionDeleted { reaction, message, .. } => {
                self.persist(|session| {
                    session.save_message(&self.cid, message, None)?;
                    session.delete_reaction(reaction)
                });
                self.replace_if_present(message).await
            }
            _ => false,
        }
    }

    async fn replace_if_present(&self, message: &Message) -> bool {
        let mut list = self.state.lock().await;
        match list.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => {
                *existing = message.clone();
                true
            }
            None => false,
        }
    }

    fn persist<F>(&self, mut actions: F)
    where
        F: FnMut(&mut dyn DatabaseSession) -> std::result::Result<(), DatabaseError>,
    {
        if let Err(e) = self.database.write(&mut actions) {
            warn!("Failed to persist {} update: {}", self.cid, e);
        }
    }
}

fn upsert(messages: &mut Vec<Message>, message: Message) {
    match messages.iter_mut().find(|m| m.id == message.id) {
        Some(existing) => *existing = message,
        None => messages.push(message),
    }
}

fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
}
