pub mod books;
pub mod categories;
pub mod chatbot;
pub mod envelope;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod users;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

pub use middleware::require_user_id;
use state::AppState;

/// All API routes, with state applied.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    let chatbot_routes = Router::new()
        .route("/chat", post(chatbot::chat_handler))
        .route("/recommend", post(chatbot::recommend_handler))
        .route("/guide", post(chatbot::guide_handler))
        .route("/compare", post(chatbot::compare_handler))
        .route("/similar", post(chatbot::similar_handler))
        .route("/review", post(chatbot::review_handler))
        .route("/summarize", post(chatbot::summarize_handler))
        .route("/book-qa", post(chatbot::book_qa_handler));

    // Routes that act on behalf of the caller named by `x-user-id`.
    let caller_routes = Router::new()
        .route("/books/{id}/reviews", post(books::add_review_handler))
        .layer(axum_middleware::from_fn(require_user_id));

    let catalog_routes = Router::new()
        .route(
            "/books",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route(
            "/books/{id}",
            get(books::get_book_handler)
                .patch(books::update_book_handler)
                .delete(books::delete_book_handler),
        )
        .route(
            "/categories",
            get(categories::list_categories_handler).post(categories::create_category_handler),
        );

    let user_routes = Router::new()
        .route(
            "/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/users/cart",
            get(users::get_cart_handler)
                .post(users::create_cart_handler)
                .put(users::update_cart_handler),
        )
        .route(
            "/users/{id}",
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .delete(users::delete_user_handler),
        );

    Router::new()
        .nest("/chatbot", chatbot_routes)
        .merge(caller_routes)
        .merge(catalog_routes)
        .merge(user_routes)
        .with_state(app_state)
}
