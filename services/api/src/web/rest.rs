//! services/api/src/web/rest.rs
//!
//! The master definition of the OpenAPI specification.

use utoipa::OpenApi;

use crate::web::{books, categories, chatbot, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chatbot::chat_handler,
        chatbot::recommend_handler,
        chatbot::guide_handler,
        chatbot::compare_handler,
        chatbot::similar_handler,
        chatbot::review_handler,
        chatbot::summarize_handler,
        chatbot::book_qa_handler,
        books::list_books_handler,
        books::get_book_handler,
        books::create_book_handler,
        books::update_book_handler,
        books::delete_book_handler,
        books::add_review_handler,
        categories::list_categories_handler,
        categories::create_category_handler,
        users::list_users_handler,
        users::get_user_handler,
        users::create_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
        users::create_cart_handler,
        users::update_cart_handler,
        users::get_cart_handler,
    ),
    components(
        schemas(
            chatbot::ChatBody,
            chatbot::RecommendBody,
            chatbot::GuideBody,
            chatbot::CompareBody,
            chatbot::SimilarBody,
            chatbot::BookIdBody,
            chatbot::SummarizeBody,
            chatbot::BookQuestionBody,
            books::ReviewBody,
            categories::CategoryBody,
            users::UserBody,
            users::CartBody,
        )
    ),
    tags(
        (name = "Chatbot", description = "Catalog-grounded assistant endpoints."),
        (name = "Books", description = "Catalog management and customer reviews."),
        (name = "Categories", description = "Book categories."),
        (name = "Users", description = "User administration."),
        (name = "Cart", description = "The cart stored on each user.")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_chatbot_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/chatbot/chat",
            "/chatbot/recommend",
            "/chatbot/guide",
            "/chatbot/compare",
            "/chatbot/similar",
            "/chatbot/review",
            "/chatbot/summarize",
            "/chatbot/book-qa",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
