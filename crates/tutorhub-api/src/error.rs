//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use tutorhub_core::Error;

/// An error returned by an API handler.
///
/// Wraps the core taxonomy; the category decides the status code.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      Error::Validation(_) => StatusCode::BAD_REQUEST,
      Error::Authentication(_) => StatusCode::UNAUTHORIZED,
      Error::Authorization(_) => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::Repository(_) | Error::Serialization(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

// Extractor rejections are client mistakes; they render through the same
// `{"error","message"}` body as every other failure.

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self(Error::Validation(rejection.body_text()))
  }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    Self(Error::Validation(rejection.body_text()))
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    Self(Error::Validation(rejection.body_text()))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() {
      error!("request failed: {:#}", self.0);
      "An internal error has occurred.".to_owned()
    } else {
      self.0.to_string()
    };

    let body = json!({ "error": self.0.category(), "message": message });
    (status, Json(body)).into_response()
  }
}
