use crate::domain::Message;

/// Cursor and boundary state of a paginated message list
///
/// `newest_fetched_message` is always `None` while
/// `has_loaded_all_next_messages` is true; both are private so the
/// setters can keep it that way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagesPaginationState {
    pub is_loading_previous_messages: bool,
    pub is_loading_next_messages: bool,
    pub is_loading_middle_messages: bool,
    pub has_loaded_all_previous_messages: bool,
    has_loaded_all_next_messages: bool,
    pub oldest_fetched_message: Option<Message>,
    newest_fetched_message: Option<Message>,
}

impl MessagesPaginationState {
    /// Fresh list session: at the live tail, nothing older loaded yet
    pub fn initial() -> Self {
        Self {
            is_loading_previous_messages: false,
            is_loading_next_messages: false,
            is_loading_middle_messages: false,
            has_loaded_all_previous_messages: false,
            has_loaded_all_next_messages: true,
            oldest_fetched_message: None,
            newest_fetched_message: None,
        }
    }

    #[inline]
    pub fn has_loaded_all_next_messages(&self) -> bool {
        self.has_loaded_all_next_messages
    }

    pub fn set_has_loaded_all_next_messages(&mut self, value: bool) {
        self.has_loaded_all_next_messages = value;
        if value {
            self.newest_fetched_message = None;
        }
    }

    #[inline]
    pub fn newest_fetched_message(&self) -> Option<&Message> {
        self.newest_fetched_message.as_ref()
    }

    /// Ignored while at the live tail
    pub fn set_newest_fetched_message(&mut self, message: Option<Message>) {
        self.newest_fetched_message = if self.has_loaded_all_next_messages {
            None
        } else {
            message
        };
    }

    /// Anchored somewhere in history rather than at the live tail
    #[inline]
    pub fn is_jumping_to_message(&self) -> bool {
        !self.has_loaded_all_next_messages
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.is_loading_previous_messages
            || self.is_loading_next_messages
            || self.is_loading_middle_messages
    }
}

impl Default for MessagesPaginationState {
    fn default() -> Self {
        Self::initial()
    }
}
