use crate::domain::Message;
use crate::pagination::request::{MessagesPagination, PaginationParameter};
use crate::pagination::state::MessagesPaginationState;
use std::fmt::Display;
use tracing::debug;

/// Reconciles `MessagesPaginationState` around page requests
///
/// Single owner: call `begin` before issuing a request and `end` with its
/// outcome. The handler does not reject overlapping requests; callers
/// check the `is_loading_*` flags first.
#[derive(Debug, Clone, Default)]
pub struct MessagesPaginationStateHandler {
    state: MessagesPaginationState,
}

impl MessagesPaginationStateHandler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> &MessagesPaginationState {
        &self.state
    }

    pub fn begin(&mut self, pagination: &MessagesPagination) {
        match &pagination.parameter {
            None => self.state = MessagesPaginationState::initial(),
            Some(PaginationParameter::LessThan(_)) => {
                self.state.is_loading_previous_messages = true;
            }
            Some(PaginationParameter::GreaterThan(_)) => {
                self.state.is_loading_next_messages = true;
            }
            Some(PaginationParameter::Around(_)) => {
                self.state.is_loading_middle_messages = true;
                self.state.set_has_loaded_all_next_messages(false);
            }
        }
    }

    /// Apply the outcome of a request
    ///
    /// A failure changes nothing; pair it with `cancel` to release the
    /// in-flight flag. A success clears the flag and moves the boundaries.
    pub fn end<E: Display>(
        &mut self,
        pagination: &MessagesPagination,
        result: &Result<Vec<Message>, E>,
    ) {
        let messages = match result {
            Ok(messages) => messages,
            Err(e) => {
                debug!("Page request {:?} failed, keeping state: {}", pagination, e);
                return;
            }
        };

        self.cancel(pagination);
        let is_short_page = messages.len() < pagination.page_size;

        match &pagination.parameter {
            None => {
                if let Some(oldest) = oldest(messages) {
                    self.state.oldest_fetched_message = Some(oldest.clone());
                }
                self.state.set_has_loaded_all_next_messages(true);
                if is_short_page {
                    self.state.has_loaded_all_previous_messages = true;
                }
            }
            Some(PaginationParameter::LessThan(_)) => {
                if let Some(oldest) = oldest(messages) {
                    self.state.oldest_fetched_message = Some(oldest.clone());
                }
                if is_short_page {
                    self.state.has_loaded_all_previous_messages = true;
                }
            }
            Some(PaginationParameter::GreaterThan(_)) => {
                if let Some(newest) = newest(messages) {
                    self.state.set_newest_fetched_message(Some(newest.clone()));
                }
                if is_short_page {
                    self.state.set_has_loaded_all_next_messages(true);
                }
            }
            Some(PaginationParameter::Around(anchor)) => {
                // The window comes back ordered oldest to newest
                if let Some(first) = messages.first() {
                    self.state.oldest_fetched_message = Some(first.clone());
                }

                let (all_previous, all_next) = if is_short_page {
                    (true, true)
                } else {
                    match messages.iter().position(|m| &m.id == anchor) {
                        // Thread roots are fetched elsewhere; nothing precedes them
                        None => (true, self.state.has_loaded_all_next_messages()),
                        Some(index) if index <= messages.len() / 2 => (true, false),
                        Some(_) => (false, true),
                    }
                };

                self.state.has_loaded_all_previous_messages = all_previous;
                self.state.set_has_loaded_all_next_messages(all_next);
                if let Some(last) = messages.last() {
                    self.state.set_newest_fetched_message(Some(last.clone()));
                }
            }
        }
    }

    /// Release the in-flight flag of the request's direction, nothing else
    pub fn cancel(&mut self, pagination: &MessagesPagination) {
        match &pagination.parameter {
            None => {}
            Some(PaginationParameter::LessThan(_)) => {
                self.state.is_loading_previous_messages = false;
            }
            Some(PaginationParameter::GreaterThan(_)) => {
                self.state.is_loading_next_messages = false;
            }
            Some(PaginationParameter::Around(_)) => {
                self.state.is_loading_middle_messages = false;
            }
        }
    }

    /// Tail boundary as it stands, for undoing a jump that fails
    pub fn next_boundary(&self) -> (bool, Option<Message>) {
        (
            self.state.has_loaded_all_next_messages(),
            self.state.newest_fetched_message().cloned(),
        )
    }

    pub fn restore_next_boundary(&mut self, (has_loaded_all_next, newest): (bool, Option<Message>)) {
        self.state.set_has_loaded_all_next_messages(has_loaded_all_next);
        self.state.set_newest_fetched_message(newest);
    }

    /// Clear the previous/next in-flight flags of requests whose results
    /// will be discarded
    pub fn release_directional(&mut self) {
        self.state.is_loading_previous_messages = false;
        self.state.is_loading_next_messages = false;
    }
}

fn oldest(messages: &[Message]) -> Option<&Message> {
    messages.iter().min_by_key(|m| m.created_at)
}

fn newest(messages: &[Message]) -> Option<&Message> {
    messages.iter().max_by_key(|m| m.created_at)
}
