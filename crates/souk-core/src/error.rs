//! Error types for `souk-core`.
//!
//! This is the full error taxonomy of the system. Storage backends map their
//! internal failures into [`Error::Storage`]; everything above the store sees
//! only this enum.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// Bad input shape or range (malformed rating, non-positive bid, ...).
  #[error("validation error: {0}")]
  Validation(String),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("listing not found: {0}")]
  ListingNotFound(Uuid),

  #[error("gig not found: {0}")]
  GigNotFound(Uuid),

  #[error("bid not found: {0}")]
  BidNotFound(Uuid),

  #[error("task not found: {0}")]
  TaskNotFound(Uuid),

  #[error("transaction not found: {0}")]
  TransactionNotFound(Uuid),

  /// The acting user is not a legal party to the entity.
  #[error("user {0} is not a party to this record")]
  Unauthorized(Uuid),

  /// State machine violation. Never a silent no-op.
  #[error("illegal transition: {from} -> {to}")]
  InvalidTransition { from: String, to: String },

  /// A storage collaborator failed; no partial effect was left behind.
  #[error("storage error: {0}")]
  Storage(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Convenience constructor for [`Error::InvalidTransition`] from any pair
  /// of displayable states.
  pub fn invalid_transition(
    from: impl std::fmt::Display,
    to: impl std::fmt::Display,
  ) -> Self {
    Self::InvalidTransition {
      from: from.to_string(),
      to:   to.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
