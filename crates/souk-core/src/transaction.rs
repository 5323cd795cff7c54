//! Item transactions — rental requests and barter proposals.
//!
//! A transaction is a relationship entity between the requester and the
//! listing owner. Its lifecycle is driven here, not by either party's record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, listing::Listing};

// ─── Kind ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
  Rental,
  Barter,
}

impl TransactionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Rental => "rental",
      Self::Barter => "barter",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "rental" => Self::Rental,
      "barter" => Self::Barter,
      _ => return None,
    })
  }
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// Legal transitions: `Pending -> {Accepted, Cancelled}`,
/// `Accepted -> Completed`. Everything else is an
/// [`Error::InvalidTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
  Pending,
  Accepted,
  Completed,
  Cancelled,
}

impl TransactionStatus {
  pub fn can_transition_to(self, next: Self) -> bool {
    matches!(
      (self, next),
      (Self::Pending, Self::Accepted)
        | (Self::Pending, Self::Cancelled)
        | (Self::Accepted, Self::Completed)
    )
  }

  /// Whether landing on this status frees the referenced listing.
  pub fn releases_listing(self) -> bool {
    matches!(self, Self::Completed | Self::Cancelled)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Completed => "completed",
      Self::Cancelled => "cancelled",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "pending" => Self::Pending,
      "accepted" => Self::Accepted,
      "completed" => Self::Completed,
      "cancelled" => Self::Cancelled,
      _ => return None,
    })
  }
}

impl std::fmt::Display for TransactionStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Guard a status change, producing the taxonomy error on violation.
pub fn ensure_transition(
  from: TransactionStatus,
  to: TransactionStatus,
) -> Result<()> {
  if from.can_transition_to(to) {
    Ok(())
  } else {
    Err(Error::invalid_transition(from, to))
  }
}

// ─── Transaction ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  pub transaction_id:     Uuid,
  pub listing_id:         Uuid,
  pub requested_by:       Uuid,
  pub kind:               TransactionKind,
  pub status:             TransactionStatus,
  /// The proposer's own listing, offered in exchange. Barter only.
  pub matched_listing_id: Option<Uuid>,
  pub start_date:         Option<NaiveDate>,
  pub end_date:           Option<NaiveDate>,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::create_transaction`].
/// Always persisted as [`TransactionStatus::Pending`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
  pub listing_id:         Uuid,
  pub requested_by:       Uuid,
  pub kind:               TransactionKind,
  pub matched_listing_id: Option<Uuid>,
  pub start_date:         Option<NaiveDate>,
  pub end_date:           Option<NaiveDate>,
}

/// Shape checks applied before a transaction row is written.
///
/// Note: the offered listing of a barter proposal is deliberately *not*
/// re-validated as Available here — whether a listing may sit in two open
/// barters at once is an open product question.
pub fn validate_new_transaction(
  listing: &Listing,
  new: &NewTransaction,
) -> Result<()> {
  if listing.owner_id == new.requested_by {
    return Err(Error::Validation(
      "cannot request your own listing".to_string(),
    ));
  }
  if new.kind == TransactionKind::Barter && new.matched_listing_id.is_none() {
    return Err(Error::Validation(
      "barter proposals must offer a listing in exchange".to_string(),
    ));
  }
  if let (Some(start), Some(end)) = (new.start_date, new.end_date)
    && end <= start
  {
    return Err(Error::Validation(
      "rental end date must be after the start date".to_string(),
    ));
  }
  Ok(())
}
