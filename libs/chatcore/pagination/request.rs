use crate::domain::MessageId;

/// Page size used when the caller does not pick one
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Cursor of a message page request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaginationParameter {
    /// Messages older than the id
    LessThan(MessageId),
    /// Messages newer than the id
    GreaterThan(MessageId),
    /// A window centred on the id ("jump to message")
    Around(MessageId),
}

impl PaginationParameter {
    /// Query item name and value
    pub fn query_item(&self) -> (&'static str, &str) {
        match self {
            PaginationParameter::LessThan(id) => ("id_lt", id),
            PaginationParameter::GreaterThan(id) => ("id_gt", id),
            PaginationParameter::Around(id) => ("id_around", id),
        }
    }
}

/// One message page request
///
/// `parameter: None` asks for the newest page (first load or refresh).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessagesPagination {
    pub page_size: usize,
    pub parameter: Option<PaginationParameter>,
}

impl MessagesPagination {
    pub fn new(page_size: usize, parameter: Option<PaginationParameter>) -> Self {
        Self {
            page_size,
            parameter,
        }
    }

    pub fn first_page(page_size: usize) -> Self {
        Self::new(page_size, None)
    }

    pub fn less_than(page_size: usize, id: impl Into<MessageId>) -> Self {
        Self::new(page_size, Some(PaginationParameter::LessThan(id.into())))
    }

    pub fn greater_than(page_size: usize, id: impl Into<MessageId>) -> Self {
        Self::new(page_size, Some(PaginationParameter::GreaterThan(id.into())))
    }

    pub fn around(page_size: usize, id: impl Into<MessageId>) -> Self {
        Self::new(page_size, Some(PaginationParameter::Around(id.into())))
    }

    /// `limit` plus at most one cursor item
    pub fn query_items(&self) -> Vec<(&'static str, String)> {
        let mut items = vec![("limit", self.page_size.to_string())];
        if let Some(parameter) = &self.parameter {
            let (name, value) = parameter.query_item();
            items.push((name, value.to_string()));
        }
        items
    }
}

impl Default for MessagesPagination {
    fn default() -> Self {
        Self::first_page(DEFAULT_PAGE_SIZE)
    }
}
