//! Bids on gigs, and the submission-time validation rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  gig::{BudgetType, Gig},
};

/// Hard cap on bids against a fixed budget: 150% of the posted amount.
pub const FIXED_BUDGET_CAP: f64 = 1.5;

// ─── Status ───────────────────────────────────────────────────────────────────

/// `Pending -> {Accepted, Rejected}`; both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
  Pending,
  Accepted,
  Rejected,
}

impl BidStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Rejected => "rejected",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "pending" => Self::Pending,
      "accepted" => Self::Accepted,
      "rejected" => Self::Rejected,
      _ => return None,
    })
  }
}

impl std::fmt::Display for BidStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Bid ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
  pub bid_id:         Uuid,
  pub gig_id:         Uuid,
  pub bidder_id:      Uuid,
  pub amount:         f64,
  pub estimated_time: Option<String>,
  pub proposal:       Option<String>,
  pub status:         BidStatus,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::place_bid`].
/// Always persisted as [`BidStatus::Pending`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewBid {
  pub gig_id:         Uuid,
  pub bidder_id:      Uuid,
  pub amount:         f64,
  pub estimated_time: Option<String>,
  pub proposal:       Option<String>,
}

// ─── Submission validation ────────────────────────────────────────────────────

/// Submission-time rules: positive amount, one bid per bidder per gig, and
/// fixed-budget bids capped at 150% of the posted amount.
///
/// `existing` is the set of bids already on the gig. The gig's openness is
/// deliberately not checked here — it is enforced by the acceptance protocol.
pub fn validate_bid(gig: &Gig, existing: &[Bid], new: &NewBid) -> Result<()> {
  if new.amount <= 0.0 {
    return Err(Error::Validation("bid amount must be positive".to_string()));
  }
  if existing.iter().any(|b| b.bidder_id == new.bidder_id) {
    return Err(Error::Validation(
      "you have already placed a bid on this gig".to_string(),
    ));
  }
  if gig.budget_type == BudgetType::Fixed
    && new.amount > gig.budget_amount * FIXED_BUDGET_CAP
  {
    return Err(Error::Validation(
      "bid exceeds 150% of the posted budget".to_string(),
    ));
  }
  Ok(())
}
