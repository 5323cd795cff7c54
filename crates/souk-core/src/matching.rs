//! The match scorer: ranks candidate listings against a source listing.
//!
//! Pure function over in-memory records — the store assembles the candidate
//! pool (newest first) and supplies owner display data alongside each
//! listing, so scoring itself performs no I/O and never fails.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  listing::{Listing, ListingStatus},
  transaction::TransactionKind,
};

/// At most this many matches are returned.
pub const MAX_MATCHES: usize = 5;

/// Candidates scoring below this are discarded entirely.
pub const SCORE_THRESHOLD: u8 = 30;

const CATEGORY_POINTS: u8 = 40;
const PRICE_CLOSE_POINTS: u8 = 30;
const PRICE_NEAR_POINTS: u8 = 15;
const LOCATION_POINTS: u8 = 20;
const TAG_POINTS_EACH: u8 = 5;
const TAG_POINTS_CAP: u8 = 10;

// ─── Inputs and outputs ───────────────────────────────────────────────────────

/// A pool entry: a listing plus the owner display data the UI shows next to
/// a match. `owner_rating` degrades to 0.0 when the lookup fails — a missing
/// rating must never abort scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
  pub listing:      Listing,
  pub owner_name:   String,
  pub owner_rating: f64,
}

/// One ranked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
  pub listing:      Listing,
  pub owner_name:   String,
  pub owner_rating: f64,
  /// Compatibility score in `[SCORE_THRESHOLD, 100]`.
  pub score:        u8,
  /// The transaction type this pairing would use.
  pub kind:         TransactionKind,
}

// ─── Scoring ──────────────────────────────────────────────────────────────────

/// Score `pool` against `source` and return the top matches, descending by
/// score. Ties keep pool order, so with a newest-first pool the most recent
/// candidate wins ties.
///
/// Candidates owned by the source owner or by `requesting_user` are excluded
/// (two separate checks — the requesting user may be browsing someone else's
/// listing), as are candidates that are not Available.
pub fn find_matches(
  source: &Listing,
  pool: &[MatchCandidate],
  requesting_user: Uuid,
) -> Vec<ScoredMatch> {
  let mut matches: Vec<ScoredMatch> = pool
    .iter()
    .filter(|c| {
      c.listing.owner_id != source.owner_id
        && c.listing.owner_id != requesting_user
        && c.listing.status == ListingStatus::Available
    })
    .filter_map(|c| {
      let score = score_pair(source, &c.listing);
      (score >= SCORE_THRESHOLD).then(|| ScoredMatch {
        listing:      c.listing.clone(),
        owner_name:   c.owner_name.clone(),
        owner_rating: c.owner_rating,
        score:        score.min(100),
        kind:         infer_kind(source, &c.listing),
      })
    })
    .collect();

  matches.sort_by(|a, b| b.score.cmp(&a.score));
  matches.truncate(MAX_MATCHES);
  matches
}

/// The weighted-sum compatibility score. Components are independent and
/// additive; the weights sum to 100.
fn score_pair(source: &Listing, candidate: &Listing) -> u8 {
  let mut score = 0u8;

  if source.category == candidate.category {
    score += CATEGORY_POINTS;
  }
  score += price_points(source.price, candidate.price);
  score += location_points(source.location.as_deref(), candidate.location.as_deref());
  score += tag_points(source.tags.as_deref(), candidate.tags.as_deref());

  score
}

/// Relative price difference, bucketed. Two zero prices have no meaningful
/// proximity (and would divide by zero), so they score nothing.
fn price_points(a: f64, b: f64) -> u8 {
  let max = a.max(b);
  if max <= 0.0 {
    return 0;
  }
  let diff = (a - b).abs() / max;
  if diff <= 0.20 {
    PRICE_CLOSE_POINTS
  } else if diff <= 0.50 {
    PRICE_NEAR_POINTS
  } else {
    0
  }
}

/// Compare only the first comma-separated token of each location,
/// case-insensitively. "Boston, MA" and "boston" match.
fn location_points(a: Option<&str>, b: Option<&str>) -> u8 {
  match (first_token(a), first_token(b)) {
    (Some(a), Some(b)) if a == b => LOCATION_POINTS,
    _ => 0,
  }
}

fn first_token(loc: Option<&str>) -> Option<String> {
  let token = loc?.split(',').next()?.trim().to_lowercase();
  (!token.is_empty()).then_some(token)
}

/// Five points per shared tag, capped at ten.
fn tag_points(a: Option<&str>, b: Option<&str>) -> u8 {
  let (Some(a), Some(b)) = (a, b) else { return 0 };
  let a = tag_set(a);
  let b = tag_set(b);
  let common = a.intersection(&b).count() as u8;
  (common * TAG_POINTS_EACH).min(TAG_POINTS_CAP)
}

fn tag_set(tags: &str) -> std::collections::HashSet<String> {
  tags
    .split(',')
    .map(|t| t.trim().to_lowercase())
    .filter(|t| !t.is_empty())
    .collect()
}

/// If both sides admit rental, it's a rental; else if both admit barter,
/// a barter; else rental. The final arm is an intentional fallback: a pair
/// with incompatible modes is still labelled rental rather than rejected.
fn infer_kind(source: &Listing, candidate: &Listing) -> TransactionKind {
  if source.availability.admits_rental() && candidate.availability.admits_rental() {
    TransactionKind::Rental
  } else if source.availability.admits_barter() && candidate.availability.admits_barter() {
    TransactionKind::Barter
  } else {
    TransactionKind::Rental
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
