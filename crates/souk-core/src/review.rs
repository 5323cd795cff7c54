//! Reviews (item transactions) and portfolio entries (completed tasks).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Review ───────────────────────────────────────────────────────────────────

/// One party's review of the other after a completed item transaction.
/// Keyed by (subject, reviewer, transaction): resubmitting updates in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub review_id:      Uuid,
  /// The user being reviewed.
  pub subject_id:     Uuid,
  pub reviewer_id:    Uuid,
  pub transaction_id: Uuid,
  pub rating:         u8,
  pub comment:        Option<String>,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::upsert_review`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
  pub subject_id:     Uuid,
  pub reviewer_id:    Uuid,
  pub transaction_id: Uuid,
  pub rating:         u8,
  pub comment:        Option<String>,
}

// ─── Portfolio ────────────────────────────────────────────────────────────────

/// Denormalised snapshot of a completed task, attached to the freelancer.
/// Materialised exactly once, by the task completion protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioEntry {
  pub entry_id:        Uuid,
  pub freelancer_id:   Uuid,
  pub task_id:         Uuid,
  /// Copied from the gig at completion time.
  pub title:           String,
  pub description:     Option<String>,
  /// Copied from the freelancer's profile at completion time.
  pub skills_used:     Option<String>,
  pub client_feedback: Option<String>,
  pub rating:          u8,
  pub completion_date: NaiveDate,
}
