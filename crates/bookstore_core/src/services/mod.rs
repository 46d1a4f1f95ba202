//! crates/bookstore_core/src/services/mod.rs
//!
//! Request orchestration. Each service method validates its input before touching
//! any port, then drives the store, the prompt builder, the completion service and
//! the parsers. Services hold no per-request state.

pub mod catalog;
pub mod chatbot;
pub mod users;

use uuid::Uuid;

use crate::domain::Pagination;
use crate::ports::PortError;

pub use catalog::CatalogService;
pub use chatbot::ChatbotService;
pub use users::UserService;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ServiceError {
    /// The request itself is malformed. Raised before any external call.
    #[error("{0}")]
    Validation(String),
    /// A referenced entity is absent or soft-deleted.
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Port(#[from] PortError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Parses a required identifier field.
pub(crate) fn require_id(value: Option<&str>, field: &str) -> ServiceResult<Uuid> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Validation(format!("Please provide {field}")))?;
    Uuid::parse_str(value).map_err(|_| ServiceError::Validation(format!("{field} is not a valid id")))
}

/// Rows to skip for `pagination`, rejecting pages no store can reach.
pub(crate) fn page_offset(pagination: &Pagination) -> ServiceResult<usize> {
    pagination
        .skip()
        .ok_or_else(|| ServiceError::Validation("Page number is out of range".to_string()))
}

/// Returns the trimmed text, or a validation error with `message`.
pub(crate) fn require_text<'a>(value: Option<&'a str>, message: &str) -> ServiceResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::Validation(message.to_string()))
}

/// Maps a store `NotFound` to a service `NotFound` with a caller-facing message.
pub(crate) fn not_found(message: &str) -> impl FnOnce(PortError) -> ServiceError + '_ {
    move |e| match e {
        PortError::NotFound(_) => ServiceError::NotFound(message.to_string()),
        other => ServiceError::Port(other),
    }
}
