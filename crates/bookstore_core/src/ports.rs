//! crates/bookstore_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the bookstore's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the document store, the completion API, the image host
//! and the mailer.

use std::path::Path;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Book, BookPatch, CartItem, Category, CategoryWithQuantity, Customer, NewBook, NewUser,
    PurchasedItem, User, UserLookup, UserPatch,
};
use crate::reviews::{ReviewAction, ReviewSubmission};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The tagged outcome of a failed external call.
///
/// Adapters translate their own errors into exactly one of these variants, and the
/// web layer translates each variant into one HTTP status.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A uniqueness constraint was violated (duplicate ISSN, duplicate e-mail).
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream rate limit: {0}")]
    RateLimited(String),
    #[error("Upstream authentication failed: {0}")]
    UpstreamAuth(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Catalog Store
//=========================================================================================

/// Filter for reading non-deleted books. Soft-deleted books are never returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    pub ids: Option<Vec<Uuid>>,
    pub exclude: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub author: Option<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl BookQuery {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn ids(mut self, ids: Vec<Uuid>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn exclude(mut self, id: Uuid) -> Self {
        self.exclude = Some(id);
        self
    }

    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when `book` satisfies every filter of this query, ignoring pagination.
    pub fn matches(&self, book: &Book) -> bool {
        !book.is_deleted
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&book.id))
            && self.exclude.map_or(true, |id| id != book.id)
            && self.category_id.map_or(true, |id| id == book.category_id)
            && self.author.as_ref().map_or(true, |a| a == &book.author)
    }
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Books ---
    /// Non-deleted books matching `query`, category name populated, in catalog order.
    async fn find_books(&self, query: &BookQuery) -> PortResult<Vec<Book>>;

    async fn count_books(&self, query: &BookQuery) -> PortResult<usize>;

    /// A book by id, including soft-deleted ones. Reviewer profiles are populated.
    async fn get_book(&self, book_id: Uuid) -> PortResult<Book>;

    async fn create_book(&self, book: NewBook) -> PortResult<Book>;

    async fn update_book(&self, book_id: Uuid, patch: BookPatch) -> PortResult<Book>;

    async fn soft_delete_book(&self, book_id: Uuid) -> PortResult<()>;

    /// Merges one customer's review into a non-deleted book and recomputes its
    /// average rating in a single atomic update. Concurrent submissions for the
    /// same book must all survive. `NotFound` when the book is absent or deleted.
    async fn upsert_review(
        &self,
        book_id: Uuid,
        submission: &ReviewSubmission,
    ) -> PortResult<ReviewAction>;

    // --- Categories ---
    async fn list_categories(&self) -> PortResult<Vec<Category>>;

    async fn list_categories_with_quantity(&self) -> PortResult<Vec<CategoryWithQuantity>>;

    async fn get_category(&self, category_id: Uuid) -> PortResult<Category>;

    async fn create_category(&self, name: &str) -> PortResult<Category>;

    // --- Customers and Orders ---
    async fn find_active_customer(&self, user_id: Uuid) -> PortResult<Customer>;

    /// Items of at most `max_orders` delivered or completed orders of `user_id`.
    async fn purchase_history(
        &self,
        user_id: Uuid,
        max_orders: usize,
    ) -> PortResult<Vec<PurchasedItem>>;

    // --- Users and Carts ---
    async fn list_users(&self, offset: usize, limit: usize) -> PortResult<(usize, Vec<User>)>;

    async fn get_user(&self, lookup: &UserLookup) -> PortResult<User>;

    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn update_user(&self, user_id: Uuid, patch: UserPatch) -> PortResult<User>;

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    async fn set_cart(&self, user_id: Uuid, cart: &[CartItem]) -> PortResult<Vec<CartItem>>;
}

//=========================================================================================
// Completion Client
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Which configured model a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// The large model used for open-ended answers.
    Primary,
    /// The small model used for matching and short answers.
    Fast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: ModelTier,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the text of the first choice, or an empty string if it had none.
    async fn complete(&self, request: CompletionRequest) -> PortResult<String>;

    /// The concrete model name behind a tier.
    fn model_name(&self, tier: ModelTier) -> String;
}

//=========================================================================================
// Image Store and Email Sender
//=========================================================================================

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Moves the file at `path` into `folder` and returns its public URL.
    async fn upload(&self, path: &Path, folder: &str) -> PortResult<String>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()>;
}
