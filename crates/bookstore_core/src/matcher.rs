//! crates/bookstore_core/src/matcher.rs
//!
//! Lexical top-up for result sets the model under-filled. Matches are appended in
//! catalog order, never duplicate a book already present, and stop at `limit`.
//! Returning fewer than `limit` books is a valid outcome.

use crate::domain::Book;

/// Tops up `primary` with books whose title, author, category or description
/// contains any whitespace-separated token of `query` (case-insensitive).
pub fn top_up_by_query(primary: Vec<Book>, catalog: &[Book], query: &str, limit: usize) -> Vec<Book> {
    let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    top_up(primary, catalog, limit, |book| {
        let fields = [
            Some(book.title.as_str()),
            Some(book.author.as_str()),
            book.category_name.as_deref(),
            book.description.as_deref(),
        ];
        fields.iter().flatten().any(|field| {
            let field = field.to_lowercase();
            tokens.iter().any(|token| field.contains(token.as_str()))
        })
    })
}

/// Tops up `primary` with books sharing the exact category name or the exact author
/// of `source`. The source book itself is never added.
pub fn top_up_similar(primary: Vec<Book>, candidates: &[Book], source: &Book, limit: usize) -> Vec<Book> {
    top_up(primary, candidates, limit, |book| {
        book.id != source.id
            && ((book.category_name.is_some() && book.category_name == source.category_name)
                || book.author == source.author)
    })
}

fn top_up<F>(mut primary: Vec<Book>, catalog: &[Book], limit: usize, matches: F) -> Vec<Book>
where
    F: Fn(&Book) -> bool,
{
    primary.truncate(limit);
    for book in catalog {
        if primary.len() >= limit {
            break;
        }
        if primary.iter().any(|p| p.id == book.id) || !matches(book) {
            continue;
        }
        primary.push(book.clone());
    }
    primary
}
