//! crates/bookstore_core/src/services/chatbot.rs
//!
//! The eight chatbot operations. Each one validates its request, reads a bounded
//! slice of the catalog, builds a prompt, makes one or two completion calls and
//! reshapes the text answer. Completion failures are never retried.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::{Book, PurchasedItem};
use crate::matcher;
use crate::parse::{self, BookAssessment};
use crate::ports::{
    BookQuery, CatalogStore, ChatMessage, CompletionRequest, CompletionService, ModelTier,
    PortResult,
};
use crate::prompt::{
    self, BookDigest, PromptContext, SummaryLength, CHAT_BOOK_CAP, GUIDE_BOOK_CAP,
    HISTORY_ORDER_CAP, LONG_DESCRIPTION, RECOMMEND_BOOK_CAP, SHORT_DESCRIPTION,
    SIMILAR_CANDIDATE_CAP,
};

use super::{not_found, require_id, require_text, ServiceError, ServiceResult};

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 20;
const BOOK_NOT_FOUND: &str = "Book not found";

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendRequest {
    pub query: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct GuideRequest {
    pub purpose: Option<String>,
    pub level: Option<String>,
    pub interests: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CompareRequest {
    pub book_ids: Option<Vec<String>>,
    pub aspects: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarRequest {
    pub book_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SummarizeRequest {
    pub book_id: Option<String>,
    pub length: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookQuestionRequest {
    pub book_id: Option<String>,
    pub question: Option<String>,
}

//=========================================================================================
// Replies
//=========================================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub books: Vec<Book>,
    pub query: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingGuide {
    pub guide: String,
    pub purpose: String,
    pub level: Option<String>,
    pub interests: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub comparison: String,
    pub recommendation: String,
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarBooks {
    pub original_book: Book,
    pub similar_books: Vec<Book>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookReview {
    pub book: Book,
    pub review: BookAssessment,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub book: Book,
    pub summary: String,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookAnswer {
    pub book: Book,
    pub question: String,
    pub answer: String,
}

//=========================================================================================
// Service
//=========================================================================================

#[derive(Clone)]
pub struct ChatbotService {
    catalog: Arc<dyn CatalogStore>,
    llm: Arc<dyn CompletionService>,
}

impl ChatbotService {
    pub fn new(catalog: Arc<dyn CatalogStore>, llm: Arc<dyn CompletionService>) -> Self {
        Self { catalog, llm }
    }

    /// General-purpose store assistant.
    pub async fn chat(&self, req: ChatRequest) -> ServiceResult<ChatReply> {
        let message = require_text(req.message.as_deref(), "Please enter a question")?;
        let user_id = optional_id(req.user_id.as_deref())?;

        let query = BookQuery::active().limit(CHAT_BOOK_CAP);
        let (books, categories, history) = tokio::try_join!(
            self.catalog.find_books(&query),
            self.catalog.list_categories(),
            self.history(user_id),
        )?;
        let ctx = PromptContext::new(&books, SHORT_DESCRIPTION)
            .with_categories(&categories)
            .with_history(history);

        let answer = self
            .complete(ModelTier::Primary, prompt::chat(&ctx, message), 0.7, 1000)
            .await?;

        Ok(ChatReply {
            message: or_default(answer, "Sorry, I can't answer this question."),
            model: self.llm.model_name(ModelTier::Primary),
        })
    }

    /// Picks `limit` books for a free-text request, topping up lexically when the
    /// model returns too few usable identifiers.
    pub async fn recommend(&self, req: RecommendRequest) -> ServiceResult<Recommendation> {
        let query = require_text(
            req.query.as_deref(),
            "Please describe the book you are looking for",
        )?;
        let user_id = optional_id(req.user_id.as_deref())?;
        let limit = limit_in_range(req.limit)?;

        let slice = BookQuery::active().limit(RECOMMEND_BOOK_CAP);
        let (catalog, history) = tokio::try_join!(
            self.catalog.find_books(&slice),
            self.history(user_id),
        )?;
        let ctx = PromptContext::new(&catalog, LONG_DESCRIPTION).with_history(history);

        let answer = self
            .complete(
                ModelTier::Primary,
                prompt::recommend(&ctx, query, limit),
                0.3,
                200,
            )
            .await?;
        let ids = parse::id_list(&answer, limit);
        let suggested = self.resolve(ids).await?;
        let model_count = suggested.len();
        let books = matcher::top_up_by_query(suggested, &catalog, query, limit);
        info!(
            "Recommended {} books for query ({} from the model)",
            books.len(),
            model_count
        );

        Ok(Recommendation {
            count: books.len(),
            books,
            query: query.to_string(),
        })
    }

    pub async fn guide(&self, req: GuideRequest) -> ServiceResult<ReadingGuide> {
        let purpose = require_text(req.purpose.as_deref(), "Please provide a reading purpose")?;
        let user_id = optional_id(req.user_id.as_deref())?;
        let level = non_blank(req.level);
        let interests = non_blank(req.interests);

        let query = BookQuery::active().limit(GUIDE_BOOK_CAP);
        let (books, categories, history) = tokio::try_join!(
            self.catalog.find_books(&query),
            self.catalog.list_categories(),
            self.history(user_id),
        )?;
        let ctx = PromptContext::new(&books, LONG_DESCRIPTION)
            .with_categories(&categories)
            .with_history(history);

        let guide = self
            .complete(
                ModelTier::Primary,
                prompt::guide(&ctx, purpose, level.as_deref(), interests.as_deref()),
                0.8,
                1500,
            )
            .await?;

        Ok(ReadingGuide {
            guide: or_default(guide, "Sorry, I can't put a reading guide together right now."),
            purpose: purpose.to_string(),
            level,
            interests,
        })
    }

    /// Compares two or three books, then asks for a one-line verdict. The verdict
    /// prompt embeds the comparison, so the two calls run strictly in sequence.
    pub async fn compare(&self, req: CompareRequest) -> ServiceResult<Comparison> {
        let raw_ids = req.book_ids.unwrap_or_default();
        if raw_ids.len() < 2 {
            return Err(ServiceError::Validation(
                "Please provide at least 2 bookIds to compare".to_string(),
            ));
        }
        if raw_ids.len() > 3 {
            return Err(ServiceError::Validation(
                "At most 3 books can be compared".to_string(),
            ));
        }
        let ids = raw_ids
            .iter()
            .map(|id| require_id(Some(id.as_str()), "bookIds"))
            .collect::<ServiceResult<Vec<Uuid>>>()?;
        if ids.iter().collect::<HashSet<_>>().len() != ids.len() {
            return Err(ServiceError::Validation(
                "Please choose different books to compare".to_string(),
            ));
        }
        let aspects: Vec<String> = req
            .aspects
            .unwrap_or_default()
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let found = self
            .catalog
            .find_books(&BookQuery::active().ids(ids.clone()))
            .await?;
        if found.len() != ids.len() {
            return Err(ServiceError::NotFound(
                "One or more books do not exist".to_string(),
            ));
        }
        let books = in_order(&ids, found);
        let ctx = PromptContext::new(&books, usize::MAX);

        let comparison = self
            .complete(ModelTier::Primary, prompt::compare(&ctx, &aspects), 0.3, 2000)
            .await?;
        let comparison = or_default(comparison, "These books could not be compared.");

        let verdict = self
            .complete(
                ModelTier::Primary,
                prompt::compare_verdict(&comparison),
                0.4,
                200,
            )
            .await?;

        Ok(Comparison {
            comparison,
            recommendation: or_default(
                verdict,
                "Based on the comparison, pick the book that best fits your needs.",
            ),
            books,
        })
    }

    /// Finds books like the given one. The identifier call and the explanation call
    /// are independent and run concurrently.
    pub async fn similar(&self, req: SimilarRequest) -> ServiceResult<SimilarBooks> {
        let book_id = require_id(req.book_id.as_deref(), "bookId")?;
        let limit = limit_in_range(req.limit)?;

        let source = self.active_book(book_id).await?;
        let candidates = self
            .catalog
            .find_books(
                &BookQuery::active()
                    .exclude(book_id)
                    .limit(SIMILAR_CANDIDATE_CAP),
            )
            .await?;
        if candidates.is_empty() {
            return Ok(SimilarBooks {
                original_book: source,
                similar_books: Vec::new(),
                reason: "There are no similar books in the catalog.".to_string(),
            });
        }

        let digest = BookDigest::new(&source, LONG_DESCRIPTION);
        let ctx = PromptContext::new(&candidates, LONG_DESCRIPTION);
        let (answer, reason) = tokio::try_join!(
            self.complete(
                ModelTier::Fast,
                prompt::similar(&digest, &ctx, limit),
                0.3,
                200
            ),
            self.complete(
                ModelTier::Fast,
                prompt::similar_reason(&source.title),
                0.5,
                100
            ),
        )?;

        let ids: Vec<Uuid> = parse::id_list(&answer, limit + 1)
            .into_iter()
            .filter(|id| *id != source.id)
            .take(limit)
            .collect();
        let suggested = self.resolve(ids).await?;
        let similar_books = matcher::top_up_similar(suggested, &candidates, &source, limit);

        Ok(SimilarBooks {
            original_book: source,
            similar_books,
            reason: or_default(reason, "These books share a similar topic or category."),
        })
    }

    pub async fn review(&self, book_id: Option<&str>) -> ServiceResult<BookReview> {
        let book_id = require_id(book_id, "bookId")?;
        let book = self.active_book(book_id).await?;

        let digest = BookDigest::new(&book, usize::MAX);
        let answer = self
            .complete(ModelTier::Primary, prompt::review(&digest), 0.4, 800)
            .await?;

        Ok(BookReview {
            book,
            review: parse::assessment(&answer),
        })
    }

    pub async fn summarize(&self, req: SummarizeRequest) -> ServiceResult<BookSummary> {
        let book_id = require_id(req.book_id.as_deref(), "bookId")?;
        let length = match req.length.as_deref() {
            None => SummaryLength::default(),
            Some(value) => SummaryLength::parse(value).ok_or_else(|| {
                ServiceError::Validation(
                    "length must be 'short', 'medium' or 'long'".to_string(),
                )
            })?,
        };
        let book = self.active_book(book_id).await?;

        let description = match book.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => {
                return Ok(BookSummary {
                    book,
                    summary: "This book does not have a detailed description yet.".to_string(),
                    key_points: Vec::new(),
                })
            }
        };

        let digest = BookDigest::new(&book, usize::MAX);
        let answer = self
            .complete(
                ModelTier::Primary,
                prompt::summarize(&digest, &description, length),
                0.2,
                800,
            )
            .await?;
        let parsed = parse::sectioned_summary(&answer);

        Ok(BookSummary {
            book,
            summary: or_default(parsed.summary, "A summary of the book's content."),
            key_points: parsed.key_points,
        })
    }

    pub async fn book_qa(&self, req: BookQuestionRequest) -> ServiceResult<BookAnswer> {
        let book_id = require_id(req.book_id.as_deref(), "bookId")?;
        let question = require_text(req.question.as_deref(), "Please enter a question")?;
        let book = self.active_book(book_id).await?;

        let digest = BookDigest::new(&book, usize::MAX);
        let answer = self
            .complete(ModelTier::Fast, prompt::book_qa(&digest, question), 0.5, 500)
            .await?;

        Ok(BookAnswer {
            book,
            question: question.to_string(),
            answer: or_default(answer, "Sorry, I can't answer this question."),
        })
    }

    //=====================================================================================
    // Helpers
    //=====================================================================================

    async fn complete(
        &self,
        model: ModelTier,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: u32,
    ) -> PortResult<String> {
        let request = CompletionRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };
        match self.llm.complete(request).await {
            Ok(text) => {
                debug!("Completion returned {} chars", text.len());
                Ok(text)
            }
            Err(e) => {
                error!("Completion call failed: {}", e);
                Err(e)
            }
        }
    }

    async fn history(&self, user_id: Option<Uuid>) -> PortResult<Vec<PurchasedItem>> {
        match user_id {
            Some(user_id) => {
                self.catalog
                    .purchase_history(user_id, HISTORY_ORDER_CAP)
                    .await
            }
            None => Ok(Vec::new()),
        }
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

    /// Looks up model-suggested ids, keeping the model's order.
    async fn resolve(&self, ids: Vec<Uuid>) -> PortResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .catalog
            .find_books(&BookQuery::active().ids(ids.clone()))
            .await?;
        Ok(in_order(&ids, found))
    }
}

fn in_order(ids: &[Uuid], mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by_key(|b| ids.iter().position(|id| *id == b.id).unwrap_or(usize::MAX));
    books
}

fn optional_id(value: Option<&str>) -> ServiceResult<Option<Uuid>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => require_id(Some(v), "userId").map(Some),
        None => Ok(None),
    }
}

fn limit_in_range(limit: Option<i64>) -> ServiceResult<usize> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(ServiceError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(limit as usize)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn or_default(text: String, default: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
