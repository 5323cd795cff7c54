//! User accounts and the rating aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Rating aggregate ─────────────────────────────────────────────────────────

/// Running mean and count of ratings a user has received.
///
/// Mutated only by the review/completion side effects — callers never write
/// it directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingAggregate {
  pub average: f64,
  pub count:   u32,
}

// ─── User ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:         Uuid,
  pub username:        String,
  pub email:           String,
  /// Argon2 PHC string. Never serialised out through the API layer.
  #[serde(skip_serializing)]
  pub password_hash:   String,
  pub location:        Option<String>,
  pub bio:             Option<String>,
  /// Comma-separated free text, copied into portfolio entries on completion.
  pub skills:          Option<String>,
  pub rating:          RatingAggregate,
  pub completed_tasks: u32,
  pub total_earnings:  f64,
  pub created_at:      DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::create_user`].
/// `user_id` and `created_at` are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  /// Already hashed by the caller; the store never sees a plaintext password.
  pub password_hash: String,
  pub location:      Option<String>,
  pub bio:           Option<String>,
  pub skills:        Option<String>,
}

// ─── Registration validation ─────────────────────────────────────────────────

/// Minimal shape check: one `@` with a dot somewhere after it.
pub fn validate_email(email: &str) -> Result<()> {
  let valid = email
    .split_once('@')
    .is_some_and(|(local, domain)| {
      !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
    });
  if valid {
    Ok(())
  } else {
    Err(Error::Validation(format!("invalid email address: {email:?}")))
  }
}

/// Password policy: at least 8 characters, with an uppercase letter, a
/// lowercase letter, a digit, and a non-alphanumeric character.
pub fn validate_password(password: &str) -> Result<()> {
  let message = if password.chars().count() < 8 {
    Some("password must be at least 8 characters long")
  } else if !password.chars().any(|c| c.is_ascii_uppercase()) {
    Some("password must contain at least one uppercase letter")
  } else if !password.chars().any(|c| c.is_ascii_lowercase()) {
    Some("password must contain at least one lowercase letter")
  } else if !password.chars().any(|c| c.is_ascii_digit()) {
    Some("password must contain at least one digit")
  } else if !password.chars().any(|c| !c.is_alphanumeric()) {
    Some("password must contain at least one special character")
  } else {
    None
  };

  match message {
    Some(m) => Err(Error::Validation(m.to_string())),
    None => Ok(()),
  }
}
