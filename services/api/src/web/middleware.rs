//! services/api/src/web/middleware.rs
//!
//! Caller identification for routes that act on behalf of a user.

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user a request acts for, as resolved by [`require_user_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

/// Middleware that reads the caller's id from the `x-user-id` header.
///
/// If valid, inserts a [`CallerId`] into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_user_id(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| ApiError::Unauthorized("Please sign in to continue".to_string()))?;

    req.extensions_mut().insert(CallerId(user_id));
    Ok(next.run(req).await)
}
