//! crates/bookstore_core/src/prompt.rs
//!
//! Turns catalog records and request parameters into the messages sent to the
//! completion service. Everything here is a deterministic string transform: no
//! store access and no model call happen at this stage.

use crate::domain::{Book, Category, PurchasedItem};
use crate::ports::ChatMessage;

/// Book caps per endpoint.
pub const CHAT_BOOK_CAP: usize = 50;
pub const RECOMMEND_BOOK_CAP: usize = 100;
pub const GUIDE_BOOK_CAP: usize = 100;
pub const SIMILAR_CANDIDATE_CAP: usize = 100;
/// At most this many delivered/completed orders feed the purchase history.
pub const HISTORY_ORDER_CAP: usize = 10;

pub const SHORT_DESCRIPTION: usize = 100;
pub const LONG_DESCRIPTION: usize = 150;

const NO_DESCRIPTION: &str = "no description";
const NOT_AVAILABLE: &str = "N/A";

//=========================================================================================
// Prompt Context
//=========================================================================================

/// The fixed field projection of a book that is allowed into a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDigest {
    pub id: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: f64,
    pub pages: Option<i32>,
    pub publish_year: Option<i32>,
    /// Already clipped. `None` renders as the "no description" placeholder.
    pub description: Option<String>,
}

impl BookDigest {
    pub fn new(book: &Book, description_limit: usize) -> Self {
        Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            author: book.author.clone(),
            category: book
                .category_name
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            price: book.price,
            pages: book.pages,
            publish_year: book.publish_year,
            description: book
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(|d| clip(d, description_limit)),
        }
    }

    fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(NO_DESCRIPTION)
    }

    fn line(&self) -> String {
        format!(
            "- \"{}\" by {}, category: {}, price: {}, description: {}",
            self.title,
            self.author,
            self.category,
            format_price(self.price),
            self.description()
        )
    }

    fn line_with_id(&self) -> String {
        format!(
            "ID: {}, Title: \"{}\", Author: {}, Category: {}, Price: {}, Description: {}",
            self.id,
            self.title,
            self.author,
            self.category,
            format_price(self.price),
            self.description()
        )
    }

    fn card(&self) -> String {
        format!(
            "Book: \"{}\"\n- Author: {}\n- Category: {}\n- Price: {}\n- Pages: {}\n- Published: {}\n- Description: {}",
            self.title,
            self.author,
            self.category,
            format_price(self.price),
            optional(self.pages),
            optional(self.publish_year),
            self.description()
        )
    }
}

/// Request-scoped input to one prompt. Built fresh per request and dropped after
/// the completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub books: Vec<BookDigest>,
    pub categories: Vec<String>,
    pub history: Vec<PurchasedItem>,
}

impl PromptContext {
    pub fn new(books: &[Book], description_limit: usize) -> Self {
        Self {
            books: books
                .iter()
                .map(|b| BookDigest::new(b, description_limit))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_categories(mut self, categories: &[Category]) -> Self {
        self.categories = categories.iter().map(|c| c.name.clone()).collect();
        self
    }

    pub fn with_history(mut self, history: Vec<PurchasedItem>) -> Self {
        self.history = history;
        self
    }

    fn book_lines(&self) -> String {
        self.books
            .iter()
            .map(BookDigest::line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn book_lines_with_ids(&self) -> String {
        self.books
            .iter()
            .map(BookDigest::line_with_id)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn category_lines(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("- {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// History as (title, quantity) pairs.
    fn history_quantities(&self) -> String {
        if self.history.is_empty() {
            return String::new();
        }
        let lines = self
            .history
            .iter()
            .map(|item| format!("- {} ({} copies)", item.title, item.quantity))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nThe user's purchase history:\n{lines}")
    }

    /// History as (title, author) pairs.
    fn history_authors(&self) -> String {
        if self.history.is_empty() {
            return String::new();
        }
        let lines = self
            .history
            .iter()
            .map(|item| format!("- {} ({})", item.title, item.author.as_deref().unwrap_or("")))
            .collect::<Vec<_>>()
            .join("\n");
        format!("\nBooks the user has bought:\n{lines}")
    }
}

//=========================================================================================
// Per-endpoint prompts
//=========================================================================================

pub fn chat(ctx: &PromptContext, message: &str) -> Vec<ChatMessage> {
    let system = format!(
        r#"You are the AI assistant of an online bookstore. Your tasks:

1. **Book Q&A**: answer questions about books, authors, categories and content
2. **Recommendations**: suggest books that fit the reader's tastes, goals and favourite categories
3. **Reading guidance**: advise beginners, students and working professionals on what to read
4. **Comparisons**: compare books when asked
5. **Smart search**: understand the context and find suitable books

Be friendly, enthusiastic and helpful. If no book in the list fits, suggest a category or give general advice.

Books in stock:
{books}

Categories:
{categories}
{history}

Note: when recommending a book, use its exact title from the list above."#,
        books = ctx.book_lines(),
        categories = ctx.category_lines(),
        history = ctx.history_quantities(),
    );
    vec![ChatMessage::system(system), ChatMessage::user(message)]
}

pub fn recommend(ctx: &PromptContext, query: &str, limit: usize) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"{history}

Available books:
{books}

Analyse the request and return the IDs of the {limit} most suitable books (IDs only, one per line, no explanation).
Format:
ID1
ID2
ID3
...

Request: "{query}""#,
        history = ctx.history_authors(),
        books = ctx.book_lines_with_ids(),
    );
    vec![
        ChatMessage::system(
            "You are a smart book recommendation system. Return only book IDs, one per line.",
        ),
        ChatMessage::user(prompt),
    ]
}

pub fn guide(
    ctx: &PromptContext,
    purpose: &str,
    level: Option<&str>,
    interests: Option<&str>,
) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Available books:
{books}

Categories:
{categories}
{history}

Give detailed advice on:
1. Which category to start with
2. 3-5 specific books from the list that fit (with reasons)
3. A suggested reading path
4. Any other useful tips

Be enthusiastic and detailed.

The user wants to read with:
- Purpose: {purpose}
- Level: {level}
- Interests: {interests}"#,
        books = ctx.book_lines(),
        categories = ctx.category_lines(),
        history = ctx.history_authors(),
        level = level.unwrap_or("Not specified"),
        interests = interests.unwrap_or("Not specified"),
    );
    vec![
        ChatMessage::system(
            "You are a reading consultant with many years of experience. Give detailed, useful advice.",
        ),
        ChatMessage::user(prompt),
    ]
}

pub fn compare(ctx: &PromptContext, aspects: &[String]) -> Vec<ChatMessage> {
    let cards = ctx
        .books
        .iter()
        .map(|b| format!("{}\n---", b.card()))
        .collect::<Vec<_>>()
        .join("\n\n");
    let aspects = if aspects.is_empty() {
        "Compare the books above on: price, content, difficulty, intended audience".to_string()
    } else {
        format!(
            "Compare the books above on these aspects: {}",
            aspects.join(", ")
        )
    };
    let prompt = format!(
        r#"Compare the following books:

{cards}

Provide:
1. A detailed comparison for each aspect
2. Strengths and weaknesses of each book
3. Conclusion: which book suits which use case best

Be objective and detailed.

{aspects}"#
    );
    vec![
        ChatMessage::system(
            "You are a book critic. Compare the books objectively and in detail.",
        ),
        ChatMessage::user(prompt),
    ]
}

/// The follow-up prompt embeds the first comparison, so it can only be built once
/// that call has returned.
pub fn compare_verdict(comparison: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a book advisor. Give short, clear advice."),
        ChatMessage::user(format!(
            "{comparison}\n\nBased on the comparison above, give a short conclusion (1-2 sentences) on which book suits the general reader best."
        )),
    ]
}

pub fn similar(source: &BookDigest, candidates: &PromptContext, limit: usize) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Source book: "{title}"
- Author: {author}
- Category: {category}
- Description: {description}

Available books:
{books}

Find the {limit} books most similar to the source book by category, author and content.
Return only the book IDs, one per line, no explanation."#,
        title = source.title,
        author = source.author,
        category = source.category,
        description = source.description(),
        books = candidates.book_lines_with_ids(),
    );
    vec![
        ChatMessage::system(
            "You are a similar-book finder. Return only book IDs, one per line.",
        ),
        ChatMessage::user(prompt),
    ]
}

pub fn similar_reason(source_title: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You explain book suggestions. Give a short, clear reason.",
        ),
        ChatMessage::user(format!(
            "Briefly explain (1 sentence) why these books are similar to \"{source_title}\"."
        )),
    ]
}

pub fn review(book: &BookDigest) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"{card}

Review this book and return the result as JSON in this format:
{{
  "summary": "Overall assessment (2-3 sentences)",
  "strengths": ["Strength 1", "Strength 2", "Strength 3"],
  "weaknesses": ["Weakness 1", "Weakness 2"],
  "targetAudience": "Who the book suits (1-2 sentences)",
  "rating": 4.5
}}

Return only the JSON, no extra text."#,
        card = book.card()
    );
    vec![
        ChatMessage::system("You are a book critic. Return the result as valid JSON."),
        ChatMessage::user(prompt),
    ]
}

/// Requested length of a book summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "short" => Some(Self::Short),
            "medium" => Some(Self::Medium),
            "long" => Some(Self::Long),
            _ => None,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            Self::Short => "Write a short summary (2-3 sentences)",
            Self::Medium => "Write a medium summary (one paragraph, 4-6 sentences)",
            Self::Long => "Write a detailed summary (2-3 paragraphs)",
        }
    }
}

/// `description` is the full, unclipped book description.
pub fn summarize(book: &BookDigest, description: &str, length: SummaryLength) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"Book: "{title}" by {author}
Category: {category}

Description:
{description}

{instruction} of this book's content and list 3-5 key points.

Return the result in this format:
SUMMARY:
[The summary]

KEY POINTS:
1. [Point 1]
2. [Point 2]
3. [Point 3]
..."#,
        title = book.title,
        author = book.author,
        category = book.category,
        instruction = length.instruction(),
    );
    vec![
        ChatMessage::system("You are a book summarizer. Summarize accurately and clearly."),
        ChatMessage::user(prompt),
    ]
}

pub fn book_qa(book: &BookDigest, question: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        r#"{card}

Answer the question about this book using the information above. If there is not enough information for a precise answer, say so and give a general answer based on the category and description.

Question: {question}"#,
        card = book.card()
    );
    vec![
        ChatMessage::system(
            "You are an AI assistant that answers questions about books. Be accurate and helpful.",
        ),
        ChatMessage::user(prompt),
    ]
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Clips `text` to `max_chars` characters, marking the cut with an ellipsis.
pub fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

fn optional(value: Option<i32>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}
