//! Gigs — postable jobs in the student gig marketplace.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Budget ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
  Fixed,
  Hourly,
}

impl BudgetType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Fixed => "fixed",
      Self::Hourly => "hourly",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "fixed" => Self::Fixed,
      "hourly" => Self::Hourly,
      _ => return None,
    })
  }
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// A gig is Open until a bid is accepted, InProgress while its task runs,
/// and Completed when the client signs the task off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GigStatus {
  Open,
  InProgress,
  Completed,
}

impl GigStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::InProgress => "in_progress",
      Self::Completed => "completed",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "open" => Self::Open,
      "in_progress" => Self::InProgress,
      "completed" => Self::Completed,
      _ => return None,
    })
  }
}

impl std::fmt::Display for GigStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Gig ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gig {
  pub gig_id:        Uuid,
  pub owner_id:      Uuid,
  pub title:         String,
  pub description:   String,
  pub category:      String,
  pub budget_type:   BudgetType,
  pub budget_amount: f64,
  pub time_estimate: Option<String>,
  pub urgency:       Option<String>,
  pub deadline:      Option<NaiveDate>,
  pub location:      Option<String>,
  pub status:        GigStatus,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::create_gig`].
/// `gig_id`, `status` (Open) and `created_at` are set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGig {
  pub owner_id:      Uuid,
  pub title:         String,
  pub description:   String,
  pub category:      String,
  pub budget_type:   BudgetType,
  pub budget_amount: f64,
  pub time_estimate: Option<String>,
  pub urgency:       Option<String>,
  pub deadline:      Option<NaiveDate>,
  pub location:      Option<String>,
}

/// Shape checks applied before a gig row is written.
pub fn validate_new_gig(new: &NewGig) -> Result<()> {
  if new.title.trim().is_empty()
    || new.description.trim().is_empty()
    || new.category.trim().is_empty()
  {
    return Err(Error::Validation(
      "gig title, description and category are required".to_string(),
    ));
  }
  if new.budget_type == BudgetType::Fixed && new.budget_amount <= 0.0 {
    return Err(Error::Validation(
      "fixed-budget gigs need a positive budget amount".to_string(),
    ));
  }
  Ok(())
}
