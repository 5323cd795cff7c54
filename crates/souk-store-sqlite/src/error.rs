//! Error type for `souk-store-sqlite`.
//!
//! Internal plumbing errors (SQL, codecs) collapse into
//! [`souk_core::Error::Storage`] at the trait boundary; domain errors raised
//! inside protocols pass through unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] souk_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sql error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored string failed to decode into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

impl From<Error> for souk_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      other => souk_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
