//! Error types for `fivestar-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// A rating was submitted without a resolved user identity.
  #[error("user must be logged in")]
  Unauthenticated,

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("rating not found: {0}")]
  RatingNotFound(Uuid),

  #[error("no summary exists for rating id {0:?}")]
  SummaryNotFound(String),

  #[error("star rating must be between 1 and 5, got {0}")]
  StarsOutOfRange(i64),

  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Opaque failure from the backing record store, passed through untouched.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
