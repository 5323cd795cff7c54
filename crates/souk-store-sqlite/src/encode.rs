//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, calendar dates as
//! `YYYY-MM-DD`, UUIDs as hyphenated lowercase strings, and enums as the
//! snake_case strings their `as_str`/`parse` codecs define.

use chrono::{DateTime, NaiveDate, Utc};
use souk_core::{
  bid::{Bid, BidStatus},
  gig::{BudgetType, Gig, GigStatus},
  listing::{AvailabilityMode, Category, Condition, Listing, ListingStatus},
  message::Message,
  review::{PortfolioEntry, Review},
  task::{Task, TaskStatus},
  transaction::{Transaction, TransactionKind, TransactionStatus},
  user::{RatingAggregate, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ──────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("bad date {s:?}: {e}")))
}

/// Decode a stored enum string via the domain type's own `parse` codec.
fn decode_with<T>(
  what: &'static str,
  s: &str,
  parse: fn(&str) -> Option<T>,
) -> Result<T> {
  parse(s).ok_or_else(|| Error::Decode(format!("unknown {what}: {s:?}")))
}

fn decode_rating(v: i64) -> Result<u8> {
  u8::try_from(v).map_err(|_| Error::Decode(format!("bad rating: {v}")))
}

// ─── users ────────────────────────────────────────────────────────────────────

pub const USER_COLS: &str = "user_id, username, email, password_hash, \
   location, bio, skills, rating, rating_count, completed_tasks, \
   total_earnings, created_at";

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:         String,
  pub username:        String,
  pub email:           String,
  pub password_hash:   String,
  pub location:        Option<String>,
  pub bio:             Option<String>,
  pub skills:          Option<String>,
  pub rating:          f64,
  pub rating_count:    i64,
  pub completed_tasks: i64,
  pub total_earnings:  f64,
  pub created_at:      String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:         row.get(0)?,
      username:        row.get(1)?,
      email:           row.get(2)?,
      password_hash:   row.get(3)?,
      location:        row.get(4)?,
      bio:             row.get(5)?,
      skills:          row.get(6)?,
      rating:          row.get(7)?,
      rating_count:    row.get(8)?,
      completed_tasks: row.get(9)?,
      total_earnings:  row.get(10)?,
      created_at:      row.get(11)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:         decode_uuid(&self.user_id)?,
      username:        self.username,
      email:           self.email,
      password_hash:   self.password_hash,
      location:        self.location,
      bio:             self.bio,
      skills:          self.skills,
      rating:          RatingAggregate {
        average: self.rating,
        count:   self.rating_count as u32,
      },
      completed_tasks: self.completed_tasks as u32,
      total_earnings:  self.total_earnings,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

// ─── listings ─────────────────────────────────────────────────────────────────

pub const LISTING_COLS: &str = "listing_id, owner_id, title, description, \
   price, category, condition, location, tags, availability, status, \
   created_at";

/// Raw strings read directly from a `listings` row.
pub struct RawListing {
  pub listing_id:   String,
  pub owner_id:     String,
  pub title:        String,
  pub description:  String,
  pub price:        f64,
  pub category:     String,
  pub condition:    String,
  pub location:     Option<String>,
  pub tags:         Option<String>,
  pub availability: String,
  pub status:       String,
  pub created_at:   String,
}

impl RawListing {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      listing_id:   row.get(0)?,
      owner_id:     row.get(1)?,
      title:        row.get(2)?,
      description:  row.get(3)?,
      price:        row.get(4)?,
      category:     row.get(5)?,
      condition:    row.get(6)?,
      location:     row.get(7)?,
      tags:         row.get(8)?,
      availability: row.get(9)?,
      status:       row.get(10)?,
      created_at:   row.get(11)?,
    })
  }

  pub fn into_listing(self) -> Result<Listing> {
    Ok(Listing {
      listing_id:   decode_uuid(&self.listing_id)?,
      owner_id:     decode_uuid(&self.owner_id)?,
      title:        self.title,
      description:  self.description,
      price:        self.price,
      category:     decode_with("category", &self.category, Category::parse)?,
      condition:    decode_with("condition", &self.condition, Condition::parse)?,
      location:     self.location,
      tags:         self.tags,
      availability: decode_with(
        "availability",
        &self.availability,
        AvailabilityMode::parse,
      )?,
      status:       decode_with("listing status", &self.status, ListingStatus::parse)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

// ─── transactions ─────────────────────────────────────────────────────────────

pub const TRANSACTION_COLS: &str = "transaction_id, listing_id, requested_by, \
   kind, status, matched_listing_id, start_date, end_date, created_at";

/// Raw strings read directly from a `transactions` row.
pub struct RawTransaction {
  pub transaction_id:     String,
  pub listing_id:         String,
  pub requested_by:       String,
  pub kind:               String,
  pub status:             String,
  pub matched_listing_id: Option<String>,
  pub start_date:         Option<String>,
  pub end_date:           Option<String>,
  pub created_at:         String,
}

impl RawTransaction {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      transaction_id:     row.get(0)?,
      listing_id:         row.get(1)?,
      requested_by:       row.get(2)?,
      kind:               row.get(3)?,
      status:             row.get(4)?,
      matched_listing_id: row.get(5)?,
      start_date:         row.get(6)?,
      end_date:           row.get(7)?,
      created_at:         row.get(8)?,
    })
  }

  pub fn into_transaction(self) -> Result<Transaction> {
    Ok(Transaction {
      transaction_id:     decode_uuid(&self.transaction_id)?,
      listing_id:         decode_uuid(&self.listing_id)?,
      requested_by:       decode_uuid(&self.requested_by)?,
      kind:               decode_with("transaction kind", &self.kind, TransactionKind::parse)?,
      status:             decode_with(
        "transaction status",
        &self.status,
        TransactionStatus::parse,
      )?,
      matched_listing_id: self
        .matched_listing_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      start_date:         self.start_date.as_deref().map(decode_date).transpose()?,
      end_date:           self.end_date.as_deref().map(decode_date).transpose()?,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

// ─── gigs ─────────────────────────────────────────────────────────────────────

pub const GIG_COLS: &str = "gig_id, owner_id, title, description, category, \
   budget_type, budget_amount, time_estimate, urgency, deadline, location, \
   status, created_at";

/// Raw strings read directly from a `gigs` row.
pub struct RawGig {
  pub gig_id:        String,
  pub owner_id:      String,
  pub title:         String,
  pub description:   String,
  pub category:      String,
  pub budget_type:   String,
  pub budget_amount: f64,
  pub time_estimate: Option<String>,
  pub urgency:       Option<String>,
  pub deadline:      Option<String>,
  pub location:      Option<String>,
  pub status:        String,
  pub created_at:    String,
}

impl RawGig {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      gig_id:        row.get(0)?,
      owner_id:      row.get(1)?,
      title:         row.get(2)?,
      description:   row.get(3)?,
      category:      row.get(4)?,
      budget_type:   row.get(5)?,
      budget_amount: row.get(6)?,
      time_estimate: row.get(7)?,
      urgency:       row.get(8)?,
      deadline:      row.get(9)?,
      location:      row.get(10)?,
      status:        row.get(11)?,
      created_at:    row.get(12)?,
    })
  }

  pub fn into_gig(self) -> Result<Gig> {
    Ok(Gig {
      gig_id:        decode_uuid(&self.gig_id)?,
      owner_id:      decode_uuid(&self.owner_id)?,
      title:         self.title,
      description:   self.description,
      category:      self.category,
      budget_type:   decode_with("budget type", &self.budget_type, BudgetType::parse)?,
      budget_amount: self.budget_amount,
      time_estimate: self.time_estimate,
      urgency:       self.urgency,
      deadline:      self.deadline.as_deref().map(decode_date).transpose()?,
      location:      self.location,
      status:        decode_with("gig status", &self.status, GigStatus::parse)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── bids ─────────────────────────────────────────────────────────────────────

pub const BID_COLS: &str =
  "bid_id, gig_id, bidder_id, amount, estimated_time, proposal, status, \
   created_at";

/// Raw strings read directly from a `bids` row.
pub struct RawBid {
  pub bid_id:         String,
  pub gig_id:         String,
  pub bidder_id:      String,
  pub amount:         f64,
  pub estimated_time: Option<String>,
  pub proposal:       Option<String>,
  pub status:         String,
  pub created_at:     String,
}

impl RawBid {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      bid_id:         row.get(0)?,
      gig_id:         row.get(1)?,
      bidder_id:      row.get(2)?,
      amount:         row.get(3)?,
      estimated_time: row.get(4)?,
      proposal:       row.get(5)?,
      status:         row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_bid(self) -> Result<Bid> {
    Ok(Bid {
      bid_id:         decode_uuid(&self.bid_id)?,
      gig_id:         decode_uuid(&self.gig_id)?,
      bidder_id:      decode_uuid(&self.bidder_id)?,
      amount:         self.amount,
      estimated_time: self.estimated_time,
      proposal:       self.proposal,
      status:         decode_with("bid status", &self.status, BidStatus::parse)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

// ─── tasks ────────────────────────────────────────────────────────────────────

pub const TASK_COLS: &str = "task_id, gig_id, bid_id, client_id, \
   freelancer_id, amount, status, started_at, completed_at, client_rating, \
   client_review";

/// Raw strings read directly from a `tasks` row.
pub struct RawTask {
  pub task_id:       String,
  pub gig_id:        String,
  pub bid_id:        String,
  pub client_id:     String,
  pub freelancer_id: String,
  pub amount:        f64,
  pub status:        String,
  pub started_at:    String,
  pub completed_at:  Option<String>,
  pub client_rating: Option<i64>,
  pub client_review: Option<String>,
}

impl RawTask {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      task_id:       row.get(0)?,
      gig_id:        row.get(1)?,
      bid_id:        row.get(2)?,
      client_id:     row.get(3)?,
      freelancer_id: row.get(4)?,
      amount:        row.get(5)?,
      status:        row.get(6)?,
      started_at:    row.get(7)?,
      completed_at:  row.get(8)?,
      client_rating: row.get(9)?,
      client_review: row.get(10)?,
    })
  }

  pub fn into_task(self) -> Result<Task> {
    Ok(Task {
      task_id:       decode_uuid(&self.task_id)?,
      gig_id:        decode_uuid(&self.gig_id)?,
      bid_id:        decode_uuid(&self.bid_id)?,
      client_id:     decode_uuid(&self.client_id)?,
      freelancer_id: decode_uuid(&self.freelancer_id)?,
      amount:        self.amount,
      status:        decode_with("task status", &self.status, TaskStatus::parse)?,
      started_at:    decode_dt(&self.started_at)?,
      completed_at:  self.completed_at.as_deref().map(decode_dt).transpose()?,
      client_rating: self.client_rating.map(decode_rating).transpose()?,
      client_review: self.client_review,
    })
  }
}

// ─── reviews ──────────────────────────────────────────────────────────────────

pub const REVIEW_COLS: &str = "review_id, subject_id, reviewer_id, \
   transaction_id, rating, comment, created_at";

/// Raw strings read directly from a `reviews` row.
pub struct RawReview {
  pub review_id:      String,
  pub subject_id:     String,
  pub reviewer_id:    String,
  pub transaction_id: String,
  pub rating:         i64,
  pub comment:        Option<String>,
  pub created_at:     String,
}

impl RawReview {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:      row.get(0)?,
      subject_id:     row.get(1)?,
      reviewer_id:    row.get(2)?,
      transaction_id: row.get(3)?,
      rating:         row.get(4)?,
      comment:        row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:      decode_uuid(&self.review_id)?,
      subject_id:     decode_uuid(&self.subject_id)?,
      reviewer_id:    decode_uuid(&self.reviewer_id)?,
      transaction_id: decode_uuid(&self.transaction_id)?,
      rating:         decode_rating(self.rating)?,
      comment:        self.comment,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

// ─── portfolio ────────────────────────────────────────────────────────────────

pub const PORTFOLIO_COLS: &str = "entry_id, freelancer_id, task_id, title, \
   description, skills_used, client_feedback, rating, completion_date";

/// Raw strings read directly from a `portfolio` row.
pub struct RawPortfolioEntry {
  pub entry_id:        String,
  pub freelancer_id:   String,
  pub task_id:         String,
  pub title:           String,
  pub description:     Option<String>,
  pub skills_used:     Option<String>,
  pub client_feedback: Option<String>,
  pub rating:          i64,
  pub completion_date: String,
}

impl RawPortfolioEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:        row.get(0)?,
      freelancer_id:   row.get(1)?,
      task_id:         row.get(2)?,
      title:           row.get(3)?,
      description:     row.get(4)?,
      skills_used:     row.get(5)?,
      client_feedback: row.get(6)?,
      rating:          row.get(7)?,
      completion_date: row.get(8)?,
    })
  }

  pub fn into_entry(self) -> Result<PortfolioEntry> {
    Ok(PortfolioEntry {
      entry_id:        decode_uuid(&self.entry_id)?,
      freelancer_id:   decode_uuid(&self.freelancer_id)?,
      task_id:         decode_uuid(&self.task_id)?,
      title:           self.title,
      description:     self.description,
      skills_used:     self.skills_used,
      client_feedback: self.client_feedback,
      rating:          decode_rating(self.rating)?,
      completion_date: decode_date(&self.completion_date)?,
    })
  }
}

// ─── messages ─────────────────────────────────────────────────────────────────

pub const MESSAGE_COLS: &str = "message_id, sender_id, receiver_id, task_id, \
   body, is_read, created_at";

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:  String,
  pub sender_id:   String,
  pub receiver_id: String,
  pub task_id:     Option<String>,
  pub body:        String,
  pub is_read:     bool,
  pub created_at:  String,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:  row.get(0)?,
      sender_id:   row.get(1)?,
      receiver_id: row.get(2)?,
      task_id:     row.get(3)?,
      body:        row.get(4)?,
      is_read:     row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:  decode_uuid(&self.message_id)?,
      sender_id:   decode_uuid(&self.sender_id)?,
      receiver_id: decode_uuid(&self.receiver_id)?,
      task_id:     self.task_id.as_deref().map(decode_uuid).transpose()?,
      body:        self.body,
      read:        self.is_read,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
