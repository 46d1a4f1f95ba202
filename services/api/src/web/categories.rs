//! services/api/src/web/categories.rs

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryBody {
    pub name: Option<String>,
}

/// List categories with the number of non-deleted books in each.
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "`[{id, name, quantity}]`"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Categories"
)]
pub async fn list_categories_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let categories = app_state.catalog.list_categories().await?;
    Ok(envelope::ok(categories))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CategoryBody,
    responses(
        (status = 201, description = "Category created"),
        (status = 400, description = "Missing name")
    ),
    tag = "Categories"
)]
pub async fn create_category_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CategoryBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let category = app_state
        .catalog
        .create_category(body.name.as_deref())
        .await?;
    Ok(envelope::created(category, "Category created"))
}
