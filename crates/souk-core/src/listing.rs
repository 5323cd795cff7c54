//! Listings — the postable item offers of the sharing marketplace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Category ─────────────────────────────────────────────────────────────────

/// Closed set of item categories. The string forms double as the SQLite
/// column encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
  Electronics,
  Tools,
  SportsEquipment,
  PartySupplies,
  OutdoorGear,
  KitchenAppliances,
  Furniture,
  Clothing,
  Books,
  Other,
}

impl Category {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Electronics => "electronics",
      Self::Tools => "tools",
      Self::SportsEquipment => "sports_equipment",
      Self::PartySupplies => "party_supplies",
      Self::OutdoorGear => "outdoor_gear",
      Self::KitchenAppliances => "kitchen_appliances",
      Self::Furniture => "furniture",
      Self::Clothing => "clothing",
      Self::Books => "books",
      Self::Other => "other",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "electronics" => Self::Electronics,
      "tools" => Self::Tools,
      "sports_equipment" => Self::SportsEquipment,
      "party_supplies" => Self::PartySupplies,
      "outdoor_gear" => Self::OutdoorGear,
      "kitchen_appliances" => Self::KitchenAppliances,
      "furniture" => Self::Furniture,
      "clothing" => Self::Clothing,
      "books" => Self::Books,
      "other" => Self::Other,
      _ => return None,
    })
  }
}

// ─── Condition ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
  New,
  LikeNew,
  Good,
  Fair,
  NeedsRepair,
}

impl Condition {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::New => "new",
      Self::LikeNew => "like_new",
      Self::Good => "good",
      Self::Fair => "fair",
      Self::NeedsRepair => "needs_repair",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "new" => Self::New,
      "like_new" => Self::LikeNew,
      "good" => Self::Good,
      "fair" => Self::Fair,
      "needs_repair" => Self::NeedsRepair,
      _ => return None,
    })
  }
}

// ─── Availability ─────────────────────────────────────────────────────────────

/// What kinds of exchange the owner will entertain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityMode {
  Rental,
  Barter,
  Both,
}

impl AvailabilityMode {
  pub fn admits_rental(self) -> bool {
    matches!(self, Self::Rental | Self::Both)
  }

  pub fn admits_barter(self) -> bool {
    matches!(self, Self::Barter | Self::Both)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Rental => "rental",
      Self::Barter => "barter",
      Self::Both => "both",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "rental" => Self::Rental,
      "barter" => Self::Barter,
      "both" => Self::Both,
      _ => return None,
    })
  }
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// Where the listing sits in its lifecycle. A listing starts [`Available`]
/// and only re-opens when its transaction completes or is cancelled.
///
/// [`Available`]: ListingStatus::Available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
  Available,
  Pending,
  Rented,
}

impl ListingStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Available => "available",
      Self::Pending => "pending",
      Self::Rented => "rented",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    Some(match s {
      "available" => Self::Available,
      "pending" => Self::Pending,
      "rented" => Self::Rented,
      _ => return None,
    })
  }
}

impl std::fmt::Display for ListingStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Listing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
  pub listing_id:   Uuid,
  pub owner_id:     Uuid,
  pub title:        String,
  pub description:  String,
  pub price:        f64,
  pub category:     Category,
  pub condition:    Condition,
  /// Free text; only the first comma-separated token participates in
  /// match scoring.
  pub location:     Option<String>,
  /// Comma-separated free text, split and lowercased by the match scorer.
  pub tags:         Option<String>,
  pub availability: AvailabilityMode,
  pub status:       ListingStatus,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::create_listing`].
/// `listing_id`, `status` (Available) and `created_at` are set by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
  pub owner_id:     Uuid,
  pub title:        String,
  pub description:  String,
  pub price:        f64,
  pub category:     Category,
  pub condition:    Condition,
  pub location:     Option<String>,
  pub tags:         Option<String>,
  pub availability: AvailabilityMode,
}

/// Typed partial update. Enumerates exactly the fields an edit may touch —
/// a `None` field is left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPatch {
  pub title:        Option<String>,
  pub description:  Option<String>,
  pub price:        Option<f64>,
  pub category:     Option<Category>,
  pub condition:    Option<Condition>,
  pub location:     Option<String>,
  pub tags:         Option<String>,
  pub availability: Option<AvailabilityMode>,
  pub status:       Option<ListingStatus>,
}

impl ListingPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.price.is_none()
      && self.category.is_none()
      && self.condition.is_none()
      && self.location.is_none()
      && self.tags.is_none()
      && self.availability.is_none()
      && self.status.is_none()
  }
}
