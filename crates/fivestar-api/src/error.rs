//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<fivestar_core::Error> for ApiError {
  fn from(e: fivestar_core::Error) -> Self {
    use fivestar_core::Error as Core;

    match e {
      Core::Unauthenticated => Self::Unauthorized(e.to_string()),
      Core::Conflict(m) => Self::Conflict(m),
      Core::RatingNotFound(_) | Core::SummaryNotFound(_) => Self::NotFound(e.to_string()),
      Core::StarsOutOfRange(_) | Core::Invalid(_) => Self::BadRequest(e.to_string()),
      Core::Serialization(_) | Core::Store(_) => {
        tracing::error!(error = %e, "request failed");
        Self::Internal(Box::new(e))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Internal(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
