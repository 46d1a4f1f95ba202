//! services/api/src/web/chatbot.rs
//!
//! Axum handlers for the `/chatbot/*` endpoints. Each handler only translates the
//! JSON body into a core request; validation and orchestration live in
//! `ChatbotService`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use bookstore_core::services::chatbot::{
    BookQuestionRequest, ChatRequest, CompareRequest, GuideRequest, RecommendRequest,
    SimilarRequest, SummarizeRequest,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::state::AppState;

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub message: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendBody {
    pub query: Option<String>,
    pub user_id: Option<String>,
    /// Between 1 and 20, default 5.
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuideBody {
    pub purpose: Option<String>,
    pub level: Option<String>,
    /// A string, or a list of strings.
    #[schema(value_type = Object)]
    pub interests: Option<Value>,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompareBody {
    /// Two or three book ids.
    pub book_ids: Option<Vec<String>>,
    pub aspects: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimilarBody {
    pub book_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookIdBody {
    pub book_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeBody {
    pub book_id: Option<String>,
    /// `short`, `medium` (default) or `long`.
    pub length: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookQuestionBody {
    pub book_id: Option<String>,
    pub question: Option<String>,
}

/// Joins a list of interests into one comma-separated phrase.
fn interests_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Some(joined)
        }
        _ => None,
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// General store assistant chat.
#[utoipa::path(
    post,
    path = "/chatbot/chat",
    request_body = ChatBody,
    responses(
        (status = 200, description = "`{message, model}`"),
        (status = 400, description = "Empty message"),
        (status = 429, description = "Upstream rate limit"),
        (status = 401, description = "Upstream credentials rejected"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let reply = app_state
        .chatbot
        .chat(ChatRequest {
            message: body.message,
            user_id: body.user_id,
        })
        .await?;
    Ok(envelope::ok(reply))
}

/// Recommends books for a free-text request.
#[utoipa::path(
    post,
    path = "/chatbot/recommend",
    request_body = RecommendBody,
    responses(
        (status = 200, description = "`{books, query, count}`"),
        (status = 400, description = "Missing query or limit out of range"),
        (status = 429, description = "Upstream rate limit"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn recommend_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<RecommendBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let recommendation = app_state
        .chatbot
        .recommend(RecommendRequest {
            query: body.query,
            user_id: body.user_id,
            limit: body.limit,
        })
        .await?;
    info!("Recommendation served with {} books", recommendation.count);
    Ok(envelope::ok(recommendation))
}

/// Builds a reading guide for a purpose and level.
#[utoipa::path(
    post,
    path = "/chatbot/guide",
    request_body = GuideBody,
    responses(
        (status = 200, description = "`{guide, purpose, level, interests}`"),
        (status = 400, description = "Missing purpose"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn guide_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<GuideBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let guide = app_state
        .chatbot
        .guide(GuideRequest {
            purpose: body.purpose,
            level: body.level,
            interests: interests_text(body.interests),
            user_id: body.user_id,
        })
        .await?;
    Ok(envelope::ok(guide))
}

/// Compares two or three books.
#[utoipa::path(
    post,
    path = "/chatbot/compare",
    request_body = CompareBody,
    responses(
        (status = 200, description = "`{comparison, recommendation, books}`"),
        (status = 400, description = "Fewer than 2 or more than 3 ids"),
        (status = 404, description = "One of the books does not exist"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn compare_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CompareBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let comparison = app_state
        .chatbot
        .compare(CompareRequest {
            book_ids: body.book_ids,
            aspects: body.aspects,
        })
        .await?;
    Ok(envelope::ok(comparison))
}

/// Finds books similar to a given one.
#[utoipa::path(
    post,
    path = "/chatbot/similar",
    request_body = SimilarBody,
    responses(
        (status = 200, description = "`{originalBook, similarBooks, reason}`"),
        (status = 400, description = "Missing bookId"),
        (status = 404, description = "Book not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn similar_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<SimilarBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let similar = app_state
        .chatbot
        .similar(SimilarRequest {
            book_id: body.book_id,
            limit: body.limit,
        })
        .await?;
    Ok(envelope::ok(similar))
}

/// Writes a structured critical review of a book.
#[utoipa::path(
    post,
    path = "/chatbot/review",
    request_body = BookIdBody,
    responses(
        (status = 200, description = "`{book, review}`"),
        (status = 404, description = "Book not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn review_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<BookIdBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let review = app_state.chatbot.review(body.book_id.as_deref()).await?;
    Ok(envelope::ok(review))
}

/// Summarizes a book from its description.
#[utoipa::path(
    post,
    path = "/chatbot/summarize",
    request_body = SummarizeBody,
    responses(
        (status = 200, description = "`{book, summary, keyPoints}`"),
        (status = 400, description = "Invalid length"),
        (status = 404, description = "Book not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn summarize_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<SummarizeBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let summary = app_state
        .chatbot
        .summarize(SummarizeRequest {
            book_id: body.book_id,
            length: body.length,
        })
        .await?;
    Ok(envelope::ok(summary))
}

/// Answers a question about one book.
#[utoipa::path(
    post,
    path = "/chatbot/book-qa",
    request_body = BookQuestionBody,
    responses(
        (status = 200, description = "`{book, question, answer}`"),
        (status = 400, description = "Missing bookId or question"),
        (status = 404, description = "Book not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Chatbot"
)]
pub async fn book_qa_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<BookQuestionBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let answer = app_state
        .chatbot
        .book_qa(BookQuestionRequest {
            book_id: body.book_id,
            question: body.question,
        })
        .await?;
    Ok(envelope::ok(answer))
}
