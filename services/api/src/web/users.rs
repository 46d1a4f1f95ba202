//! services/api/src/web/users.rs
//!
//! Axum handlers for user administration and the per-user cart.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::Response,
    Json,
};
use bookstore_core::domain::CartItem;
use bookstore_core::services::users::{CartForm, UserForm};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::web::envelope;
use crate::web::state::AppState;

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserPageParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl From<UserBody> for UserForm {
    fn from(body: UserBody) -> Self {
        UserForm {
            name: body.name,
            email: body.email,
            role: body.role,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartBody {
    pub user_id: Option<String>,
    pub email: Option<String>,
    /// `[{product: {id, title, price, ...}, quantity}]`
    #[schema(value_type = Object)]
    pub products_cart: Option<Value>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct CartParams {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

//=========================================================================================
// Users
//=========================================================================================

#[utoipa::path(
    get,
    path = "/users",
    params(UserPageParams),
    responses((status = 200, description = "`{data: User[], pagination}`")),
    tag = "Users"
)]
pub async fn list_users_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<UserPageParams>,
) -> Result<Response, ApiError> {
    let page = app_state.users.list_users(params.page, params.limit).await?;
    Ok(envelope::paged(page.data, page.pagination))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = app_state.users.get_user(&id).await?;
    Ok(envelope::ok(user))
}

/// Create a user. A welcome e-mail is sent in the background.
#[utoipa::path(
    post,
    path = "/users",
    request_body = UserBody,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Missing field or e-mail already registered")
    ),
    tag = "Users"
)]
pub async fn create_user_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<UserBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let user = app_state.users.create_user(body.into()).await?;
    Ok(envelope::created(user, "User created"))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UserBody,
    responses(
        (status = 200, description = "User updated"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn update_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UserBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body?;
    let user = app_state.users.update_user(&id, body.into()).await?;
    Ok(envelope::ok_with_message(user, "User updated"))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn delete_user_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    app_state.users.delete_user(&id).await?;
    Ok(envelope::done("User deleted"))
}

//=========================================================================================
// Cart
//=========================================================================================

async fn replace_cart(
    app_state: &AppState,
    body: Result<Json<CartBody>, JsonRejection>,
) -> Result<Vec<CartItem>, ApiError> {
    let Json(body) = body?;
    Ok(app_state
        .users
        .replace_cart(CartForm {
            user_id: body.user_id,
            email: body.email,
            products_cart: body.products_cart,
        })
        .await?)
}

/// Save the caller's cart for the first time.
#[utoipa::path(
    post,
    path = "/users/cart",
    request_body = CartBody,
    responses(
        (status = 201, description = "Cart saved"),
        (status = 400, description = "Invalid cart"),
        (status = 404, description = "User not found")
    ),
    tag = "Cart"
)]
pub async fn create_cart_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CartBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let cart = replace_cart(&app_state, body).await?;
    Ok(envelope::created(cart, "Cart saved"))
}

/// Replace the caller's cart.
#[utoipa::path(
    put,
    path = "/users/cart",
    request_body = CartBody,
    responses(
        (status = 200, description = "Cart updated"),
        (status = 400, description = "Invalid cart"),
        (status = 404, description = "User not found")
    ),
    tag = "Cart"
)]
pub async fn update_cart_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CartBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let cart = replace_cart(&app_state, body).await?;
    Ok(envelope::ok_with_message(cart, "Cart updated"))
}

#[utoipa::path(
    get,
    path = "/users/cart",
    params(CartParams),
    responses(
        (status = 200, description = "The cart items"),
        (status = 400, description = "Neither userId nor email given"),
        (status = 404, description = "User not found")
    ),
    tag = "Cart"
)]
pub async fn get_cart_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<CartParams>,
) -> Result<Response, ApiError> {
    let cart = app_state
        .users
        .get_cart(params.user_id.as_deref(), params.email.as_deref())
        .await?;
    Ok(envelope::ok(cart))
}
