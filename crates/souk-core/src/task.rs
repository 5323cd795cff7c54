//! Tasks — the unit of work created when a bid is accepted — and the
//! completion-time rating arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, user::RatingAggregate};

// ─── Status ───────────────────────────────────────────────────────────────────

/// `InProgress -> PendingReview -> Completed`. The freelancer performs the
/// first transition (declares the work done), the client the second (reviews
/// and signs off). Completion side effects fire exactly once because only a
/// PendingReview task can be completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  InProgress,
  PendingReview,
  Completed,
}

impl TaskStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::InProgress => "in_progress",
      Self::PendingReview => "pending_review",
      Self::Completed => "completed",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "in_progress" => Self::InProgress,
      "pending_review" => Self::PendingReview,
      "completed" => Self::Completed,
      _ => return None,
    })
  }
}

impl std::fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Task ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
  pub task_id:       Uuid,
  pub gig_id:        Uuid,
  pub bid_id:        Uuid,
  /// The gig owner.
  pub client_id:     Uuid,
  /// The accepted bidder.
  pub freelancer_id: Uuid,
  /// Copied from the accepted bid.
  pub amount:        f64,
  pub status:        TaskStatus,
  pub started_at:    DateTime<Utc>,
  pub completed_at:  Option<DateTime<Utc>>,
  pub client_rating: Option<u8>,
  pub client_review: Option<String>,
}

/// Which side of a task a user is on; used to filter task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskRole {
  Client,
  Freelancer,
}

// ─── Completion arithmetic ────────────────────────────────────────────────────

/// Rating used when the client completes without supplying one.
pub const DEFAULT_COMPLETION_RATING: u8 = 5;

/// Ratings are whole stars from 1 to 5.
pub fn validate_rating(rating: u8) -> Result<()> {
  if (1..=5).contains(&rating) {
    Ok(())
  } else {
    Err(Error::Validation(format!(
      "rating must be between 1 and 5, got {rating}"
    )))
  }
}

/// Fold one new rating into a freelancer's running average:
/// `(old * completed_count + new) / (completed_count + 1)`.
///
/// The divisor is the pre-increment completed-task count, not the
/// aggregate's own rating count — reviews from item transactions feed the
/// latter but carry no weight in this formula.
pub fn fold_rating(
  old: RatingAggregate,
  completed_count: u32,
  new_rating: u8,
) -> RatingAggregate {
  let average = (old.average * completed_count as f64 + new_rating as f64)
    / (completed_count as f64 + 1.0);
  RatingAggregate { average, count: old.count + 1 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rating_bounds() {
    assert!(validate_rating(0).is_err());
    assert!(validate_rating(1).is_ok());
    assert!(validate_rating(5).is_ok());
    assert!(validate_rating(6).is_err());
  }

  #[test]
  fn first_rating_becomes_the_average() {
    let agg = fold_rating(RatingAggregate::default(), 0, 4);
    assert_eq!(agg.average, 4.0);
    assert_eq!(agg.count, 1);
  }

  #[test]
  fn running_mean_uses_pre_increment_count() {
    // two fives then a two: (5*2 + 2) / 3 = 4.0
    let agg = RatingAggregate { average: 5.0, count: 2 };
    let agg = fold_rating(agg, 2, 2);
    assert_eq!(agg.average, 4.0);
    assert_eq!(agg.count, 3);
  }

  #[test]
  fn review_count_carries_no_weight_in_the_fold() {
    // the average came from two reviews, but no task has completed yet,
    // so the first task rating replaces it outright: (3*0 + 5) / 1 = 5.0
    let agg = RatingAggregate { average: 3.0, count: 2 };
    let agg = fold_rating(agg, 0, 5);
    assert_eq!(agg.average, 5.0);
    assert_eq!(agg.count, 3);
  }
}
