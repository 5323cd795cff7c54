//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use souk_core::Error as CoreError;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Domain errors pass through unchanged and pick their HTTP status from the
/// core taxonomy; the extra variants cover failures that only exist at the
/// HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("internal error: {0}")]
  Internal(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Core(e) => match e {
        CoreError::Validation(_) => StatusCode::BAD_REQUEST,
        CoreError::UserNotFound(_)
        | CoreError::ListingNotFound(_)
        | CoreError::GigNotFound(_)
        | CoreError::BidNotFound(_)
        | CoreError::TaskNotFound(_)
        | CoreError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
        CoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CoreError::Storage(_) | CoreError::Serialization(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
