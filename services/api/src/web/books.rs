//! services/api/src/web/books.rs
//!
//! Axum handlers for the book catalog and customer reviews.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, Query, State,
    },
    response::Response,
    Extension, Json,
};
use bookstore_core::reviews::ReviewAction;
use bookstore_core::services::catalog::BookForm;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::middleware::CallerId;
use crate::web::state::AppState;

const COVER_FIELD: &str = "coverImage";

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageParams {
    /// 1-based page number, default 1.
    pub page: Option<String>,
    /// Books per page, default 9.
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewBody {
    /// A whole number from 1 to 5.
    #[schema(value_type = Object)]
    pub rating: Option<Value>,
    pub review: Option<String>,
}

//=========================================================================================
// Multipart Parsing
//=========================================================================================

/// Reads the book form fields and stages an attached cover in `upload_dir`.
async fn read_book_form(mut multipart: Multipart, upload_dir: &FsPath) -> Result<BookForm, ApiError> {
    let mut form = BookForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == COVER_FIELD {
            let extension = field
                .file_name()
                .and_then(|f| FsPath::new(f).extension())
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_default();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            if data.is_empty() {
                continue;
            }
            tokio::fs::create_dir_all(upload_dir).await?;
            let staged = upload_dir.join(format!("{}{}", Uuid::new_v4(), extension));
            tokio::fs::write(&staged, &data).await?;
            form.cover = Some(staged);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let slot = match name.as_str() {
            "title" => &mut form.title,
            "author" => &mut form.author,
            "ISSN" | "issn" => &mut form.issn,
            "category" => &mut form.category,
            "price" => &mut form.price,
            "publishYear" => &mut form.publish_year,
            "pages" => &mut form.pages,
            "description" => &mut form.description,
            "volume" => &mut form.volume,
            _ => continue,
        };
        *slot = Some(value);
    }
    Ok(form)
}

/// Removes a staged cover the image store did not take.
async fn discard_staged(cover: Option<PathBuf>) {
    if let Some(path) = cover {
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("Failed to remove staged upload {}: {}", path.display(), e);
            }
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List non-deleted books, one page at a time.
#[utoipa::path(
    get,
    path = "/books",
    params(PageParams),
    responses(
        (status = 200, description = "`{data: Book[], pagination}`"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Books"
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let page = app_state
        .catalog
        .list_books(params.page.as_deref(), params.limit.as_deref())
        .await?;
    Ok(envelope::paged(page.books, page.pagination))
}

/// Get one book with its reviews.
#[utoipa::path(
    get,
    path = "/books/{id}",
    params(("id" = String, Path, description = "Book id")),
    responses(
        (status = 200, description = "The book"),
        (status = 404, description = "Book not found or deleted")
    ),
    tag = "Books"
)]
pub async fn get_book_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let book = app_state.catalog.get_book(&id).await?;
    Ok(envelope::ok(book))
}

/// Create a book from a multipart form with an optional `coverImage` file.
#[utoipa::path(
    post,
    path = "/books",
    request_body(content_type = "multipart/form-data", description = "title, author, category, price, ISSN, publishYear, pages, description, volume, coverImage"),
    responses(
        (status = 201, description = "Book created"),
        (status = 400, description = "Missing field, unknown category or duplicate ISSN"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Books"
)]
pub async fn create_book_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form = read_book_form(multipart, &app_state.config.upload_dir).await?;
    let staged = form.cover.clone();

    let result = app_state.catalog.create_book(form).await;
    discard_staged(staged).await;
    let book = result?;

    info!("Book {} created", book.id);
    Ok(envelope::created(book, "Book created"))
}

/// Update the provided fields of a book.
#[utoipa::path(
    patch,
    path = "/books/{id}",
    params(("id" = String, Path, description = "Book id")),
    request_body(content_type = "multipart/form-data", description = "Any subset of the create fields"),
    responses(
        (status = 200, description = "Book updated"),
        (status = 400, description = "Invalid field or duplicate ISSN"),
        (status = 404, description = "Book not found or deleted")
    ),
    tag = "Books"
)]
pub async fn update_book_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form = read_book_form(multipart, &app_state.config.upload_dir).await?;
    let staged = form.cover.clone();

    let result = app_state.catalog.update_book(&id, form).await;
    discard_staged(staged).await;
    let book = result?;

    Ok(envelope::ok_with_message(book, "Book updated"))
}

/// Soft-delete a book. It disappears from every listing but its row is kept.
#[utoipa::path(
    delete,
    path = "/books/{id}",
    params(("id" = String, Path, description = "Book id")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found")
    ),
    tag = "Books"
)]
pub async fn delete_book_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    app_state.catalog.delete_book(&id).await?;
    Ok(envelope::done("Book deleted"))
}

/// Add the caller's review of a book, or replace their earlier one.
#[utoipa::path(
    post,
    path = "/books/{id}/reviews",
    params(
        ("id" = String, Path, description = "Book id"),
        ("x-user-id" = Uuid, Header, description = "The reviewing user.")
    ),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Review added or updated"),
        (status = 400, description = "Missing or invalid rating"),
        (status = 401, description = "Missing x-user-id header"),
        (status = 404, description = "Book or customer profile not found")
    ),
    tag = "Books"
)]
pub async fn add_review_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(book_id): Path<String>,
    body: Result<Json<ReviewBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let outcome = app_state
        .catalog
        .add_review(&book_id, user_id, body.rating.as_ref(), body.review.as_deref())
        .await?;

    let message = match outcome.action {
        ReviewAction::Added => "Review added",
        ReviewAction::Updated => "Review updated",
    };
    Ok(envelope::ok_with_message(outcome.book, message))
}
