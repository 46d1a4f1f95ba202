//! crates/bookstore_core/src/services/catalog.rs
//!
//! Book and category operations: paginated listing, detail reads, create/update
//! with an optional cover upload, soft delete, and customer reviews.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Book, BookPatch, Category, CategoryWithQuantity, NewBook, Pagination, MAX_PAGE_SIZE,
};
use crate::ports::{BookQuery, CatalogStore, ImageStore, PortError};
use crate::reviews::{Rating, ReviewAction, ReviewSubmission};

use super::{not_found, page_offset, require_id, require_text, ServiceError, ServiceResult};

pub const DEFAULT_PAGE_SIZE: usize = 9;
pub const COVER_FOLDER: &str = "books";

const BOOK_NOT_FOUND: &str = "Book not found or it has been deleted";
const CATEGORY_NOT_FOUND: &str = "Category does not exist";

/// Book form fields as received. Numbers arrive as text from multipart forms.
#[derive(Debug, Clone, Default)]
pub struct BookForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub issn: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub publish_year: Option<String>,
    pub pages: Option<String>,
    pub description: Option<String>,
    pub volume: Option<String>,
    /// A staged cover image on local disk, if one was attached.
    pub cover: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub book: Book,
    pub action: ReviewAction,
}

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
    images: Arc<dyn ImageStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>, images: Arc<dyn ImageStore>) -> Self {
        Self { catalog, images }
    }

    /// One page of non-deleted books. Missing, non-numeric or non-positive
    /// paging values fall back to page 1 and nine books per page; larger
    /// limits are capped at [`MAX_PAGE_SIZE`].
    pub async fn list_books(&self, page: Option<&str>, limit: Option<&str>) -> ServiceResult<BookPage> {
        let page = positive_or(page, 1);
        let limit = positive_or(limit, DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let offset = page_offset(&Pagination::new(page, limit, 0))?;

        let total = self.catalog.count_books(&BookQuery::active()).await?;
        let pagination = Pagination::new(page, limit, total);
        let books = self
            .catalog
            .find_books(&BookQuery::active().paginate(offset, limit))
            .await?;

        Ok(BookPage { books, pagination })
    }

    pub async fn get_book(&self, book_id: &str) -> ServiceResult<Book> {
        let book_id = require_id(Some(book_id), "book id")?;
        self.active_book(book_id).await
    }

    pub async fn create_book(&self, form: BookForm) -> ServiceResult<Book> {
        let title = require_text(form.title.as_deref(), "Please provide a title")?.to_string();
        let author = require_text(form.author.as_deref(), "Please provide an author")?.to_string();
        let category_id = require_id(form.category.as_deref(), "category")?;
        let price = parse_number::<f64>(form.price.as_deref(), "price")?
            .ok_or_else(|| ServiceError::Validation("Please provide a price".to_string()))?;
        let publish_year = parse_number::<i32>(form.publish_year.as_deref(), "publishYear")?;
        let pages = parse_number::<i32>(form.pages.as_deref(), "pages")?;

        self.require_category(category_id).await?;
        let cover_image = self.upload_cover(form.cover.as_ref()).await?;

        let book = self
            .catalog
            .create_book(NewBook {
                title,
                author,
                issn: filled(form.issn),
                category_id,
                price,
                publish_year,
                pages,
                description: filled(form.description),
                cover_image,
                volume: filled(form.volume),
            })
            .await
            .map_err(duplicate_issn)?;
        info!("Created book {}", book.id);
        Ok(book)
    }

    /// Each provided, non-empty field replaces the stored value.
    pub async fn update_book(&self, book_id: &str, form: BookForm) -> ServiceResult<Book> {
        let book_id = require_id(Some(book_id), "book id")?;
        let category_id = match filled(form.category) {
            Some(c) => Some(require_id(Some(c.as_str()), "category")?),
            None => None,
        };
        let patch_numbers = (
            parse_number::<f64>(form.price.as_deref(), "price")?,
            parse_number::<i32>(form.publish_year.as_deref(), "publishYear")?,
            parse_number::<i32>(form.pages.as_deref(), "pages")?,
        );

        self.active_book(book_id).await?;
        if let Some(category_id) = category_id {
            self.require_category(category_id).await?;
        }
        let cover_image = self.upload_cover(form.cover.as_ref()).await?;

        let (price, publish_year, pages) = patch_numbers;
        let patch = BookPatch {
            title: filled(form.title),
            author: filled(form.author),
            issn: filled(form.issn),
            category_id,
            price,
            publish_year,
            pages,
            description: filled(form.description),
            cover_image,
            volume: filled(form.volume),
        };
        let book = self
            .catalog
            .update_book(book_id, patch)
            .await
            .map_err(duplicate_issn)?;
        info!("Updated book {}", book.id);
        Ok(book)
    }

    pub async fn delete_book(&self, book_id: &str) -> ServiceResult<()> {
        let book_id = require_id(Some(book_id), "book id")?;
        self.catalog
            .soft_delete_book(book_id)
            .await
            .map_err(not_found("Book not found"))?;
        info!("Soft-deleted book {}", book_id);
        Ok(())
    }

    /// Adds the caller's review, or overwrites it if they already reviewed the book.
    /// The rating is validated before anything is read or written.
    pub async fn add_review(
        &self,
        book_id: &str,
        user_id: Uuid,
        rating: Option<&Value>,
        comment: Option<&str>,
    ) -> ServiceResult<ReviewOutcome> {
        let rating =
            Rating::from_json(rating).map_err(|e| ServiceError::Validation(e.to_string()))?;
        let book_id = require_id(Some(book_id), "bookId")?;

        let book = self.active_book(book_id).await?;
        let customer = self
            .catalog
            .find_active_customer(user_id)
            .await
            .map_err(not_found("Customer profile not found"))?;

        let submission = ReviewSubmission {
            customer_id: customer.id,
            rating,
            comment: comment.unwrap_or_default().to_string(),
            submitted_at: Utc::now(),
        };
        let action = self
            .catalog
            .upsert_review(book.id, &submission)
            .await
            .map_err(not_found(BOOK_NOT_FOUND))?;

        let book = self.catalog.get_book(book_id).await?;
        Ok(ReviewOutcome { book, action })
    }

    pub async fn list_categories(&self) -> ServiceResult<Vec<CategoryWithQuantity>> {
        Ok(self.catalog.list_categories_with_quantity().await?)
    }

    pub async fn create_category(&self, name: Option<&str>) -> ServiceResult<Category> {
        let name = require_text(name, "Please provide a category name")?;
        Ok(self.catalog.create_category(name).await?)
    }

    async fn active_book(&self, book_id: Uuid) -> ServiceResult<Book> {
        let book = self
            .catalog
            .get_book(book_id)
            .await
            .map_err(not_found(BOOK_NOT_FOUND))?;
        if book.is_deleted {
            return Err(ServiceError::NotFound(BOOK_NOT_FOUND.to_string()));
        }
        Ok(book)
    }

    async fn require_category(&self, category_id: Uuid) -> ServiceResult<()> {
        match self.catalog.get_category(category_id).await {
            Ok(_) => Ok(()),
            Err(PortError::NotFound(_)) => {
                Err(ServiceError::Validation(CATEGORY_NOT_FOUND.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upload_cover(&self, cover: Option<&PathBuf>) -> ServiceResult<Option<String>> {
        match cover {
            Some(path) => {
                let url = self.images.upload(path, COVER_FOLDER).await.map_err(|e| {
                    warn!("Cover upload failed: {}", e);
                    e
                })?;
                Ok(Some(url))
            }
            None => Ok(None),
        }
    }
}

fn duplicate_issn(e: PortError) -> ServiceError {
    match e {
        PortError::Conflict(issn) => ServiceError::Validation(format!(
            "ISSN \"{issn}\" already exists, please enter a different one."
        )),
        other => other.into(),
    }
}

fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_or(value: Option<&str>, default: usize) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Empty means absent; anything else must parse.
fn parse_number<T: std::str::FromStr>(value: Option<&str>, field: &str) -> ServiceResult<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| ServiceError::Validation(format!("{field} must be a number"))),
        None => Ok(None),
    }
}
