//! services/api/src/web/envelope.rs
//!
//! The JSON envelope every endpoint answers with.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bookstore_core::domain::Pagination;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Envelope<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// A page of results, with the paging figures beside `data`.
#[derive(Debug, Serialize)]
pub struct Paged<T> {
    pub success: bool,
    pub data: T,
    pub pagination: Pagination,
}

/// `200 OK` with `data`.
pub fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope::ok(data)).into_response()
}

/// `200 OK` with `data` and a message.
pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> Response {
    Json(Envelope::ok(data).with_message(message)).into_response()
}

/// `201 Created` with `data` and a message.
pub fn created<T: Serialize>(data: T, message: &str) -> Response {
    (
        StatusCode::CREATED,
        Json(Envelope::ok(data).with_message(message)),
    )
        .into_response()
}

pub fn paged<T: Serialize>(data: T, pagination: Pagination) -> Response {
    Json(Paged {
        success: true,
        data,
        pagination,
    })
    .into_response()
}

/// `200 OK` with only a message.
pub fn done(message: &str) -> Response {
    Json(Envelope::<()>::message(message)).into_response()
}
