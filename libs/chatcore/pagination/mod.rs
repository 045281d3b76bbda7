//! Message pagination state
//!
//! Tracks which part of a channel's history is loaded locally and what the
//! next page request may ask for.

pub mod handler;
pub mod request;
pub mod state;

pub use handler::MessagesPaginationStateHandler;
pub use request::{MessagesPagination, PaginationParameter, DEFAULT_PAGE_SIZE};
pub use state::MessagesPaginationState;
