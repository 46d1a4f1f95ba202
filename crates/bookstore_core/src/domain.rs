//! crates/bookstore_core/src/domain.rs
//!
//! Defines the core data structures of the bookstore.
//! They carry serde derives so the web layer can return them as-is, but they
//! know nothing about the database or the HTTP framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A book in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[serde(rename = "ISSN")]
    pub issn: Option<String>,
    pub category_id: Uuid,
    /// Populated from the category relation when the book is read.
    pub category_name: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub publish_year: Option<i32>,
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub volume: Option<String>,
    pub reviews: Vec<Review>,
    pub average_rating: f64,
    #[serde(rename = "isDelete")]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A customer's review, owned by a [`Book`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub customer_id: Uuid,
    /// Populated from the customer relation on detail reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerProfile>,
    pub rating: u8,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub full_name: String,
    pub email: Option<String>,
}

/// A customer profile, linked 1:1 to a [`User`]. Only used to attribute reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

/// A category together with the derived count of its non-deleted books.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryWithQuantity {
    pub id: Uuid,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub products_cart: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
}

/// One line of a user's embedded cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product: CartProduct,
    pub quantity: i64,
}

/// A snapshot of the product at the time it was put in the cart.
/// Fields other than `id`, `title` and `price` are kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartProduct {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A line from a delivered or completed order, used as purchase history.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchasedItem {
    pub title: String,
    pub author: Option<String>,
    pub quantity: i32,
}

/// Fields accepted when creating a book.
#[derive(Debug, Clone, Default)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub issn: Option<String>,
    pub category_id: Uuid,
    pub price: f64,
    pub publish_year: Option<i32>,
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub volume: Option<String>,
}

/// A partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub issn: Option<String>,
    pub category_id: Option<Uuid>,
    pub price: Option<f64>,
    pub publish_year: Option<i32>,
    pub pages: Option<i32>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub volume: Option<String>,
}

impl BookPatch {
    /// Applies the patch on top of `book`.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(issn) = self.issn {
            book.issn = Some(issn);
        }
        if let Some(category_id) = self.category_id {
            book.category_id = category_id;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
        if let Some(year) = self.publish_year {
            book.publish_year = Some(year);
        }
        if let Some(pages) = self.pages {
            book.pages = Some(pages);
        }
        if let Some(description) = self.description {
            book.description = Some(description);
        }
        if let Some(cover) = self.cover_image {
            book.cover_image = Some(cover);
        }
        if let Some(volume) = self.volume {
            book.volume = Some(volume);
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// How a cart owner is looked up.
#[derive(Debug, Clone, PartialEq)]
pub enum UserLookup {
    Id(Uuid),
    Email(String),
}

/// Largest page size any listing serves.
pub const MAX_PAGE_SIZE: usize = 100;
/// Largest row offset a store is asked to skip (the range of a SQL `OFFSET`).
pub const MAX_OFFSET: usize = i64::MAX as usize;

/// One page of results plus the total number of matching records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }

    /// Rows to skip before this page, or `None` when the page lies beyond
    /// [`MAX_OFFSET`].
    pub fn skip(&self) -> Option<usize> {
        self.page
            .saturating_sub(1)
            .checked_mul(self.limit)
            .filter(|skip| *skip <= MAX_OFFSET)
    }
}
