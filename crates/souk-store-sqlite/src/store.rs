//! [`SqliteStore`] — the SQLite implementation of [`MarketStore`].
//!
//! Simple reads are single queries. Every lifecycle protocol (transaction
//! status changes, bid acceptance, task completion, review upserts) runs as
//! a helper function against one rusqlite transaction, so a failure at any
//! step rolls the whole unit back.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use souk_core::{
  Error as CoreError,
  bid::{Bid, BidStatus, NewBid, validate_bid},
  gig::{Gig, GigStatus, NewGig, validate_new_gig},
  listing::{Listing, ListingPatch, ListingStatus, NewListing},
  matching::MatchCandidate,
  message::{Message, NewMessage},
  review::{NewReview, PortfolioEntry, Review},
  store::{GigFilter, ListingFilter, MarketStore},
  task::{
    DEFAULT_COMPLETION_RATING, Task, TaskRole, TaskStatus, fold_rating,
    validate_rating,
  },
  transaction::{
    NewTransaction, Transaction, TransactionStatus, ensure_transition,
    validate_new_transaction,
  },
  user::{NewUser, RatingAggregate, User},
};

use crate::{
  Error, Result,
  encode::{
    BID_COLS, GIG_COLS, LISTING_COLS, MESSAGE_COLS, PORTFOLIO_COLS, RawBid,
    RawGig, RawListing, RawMessage, RawPortfolioEntry, RawReview, RawTask,
    RawTransaction, RawUser, REVIEW_COLS, TASK_COLS, TRANSACTION_COLS,
    USER_COLS, decode_dt, decode_uuid, encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Souk marketplace store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, flattening plumbing errors into the
  /// core taxonomy at the trait boundary.
  async fn with_conn<T, F>(&self, f: F) -> souk_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| Ok(f(conn)))
      .await
      .map_err(Error::Database)?
      .map_err(souk_core::Error::from)
  }
}

// ─── Row fetch helpers ────────────────────────────────────────────────────────
//
// These take `&rusqlite::Connection` so they work both standalone and inside
// a rusqlite transaction (which derefs to the connection).

fn fetch_user(conn: &rusqlite::Connection, id: Uuid) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {USER_COLS} FROM users WHERE user_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

fn require_user(conn: &rusqlite::Connection, id: Uuid) -> Result<User> {
  fetch_user(conn, id)?.ok_or_else(|| Error::from(CoreError::UserNotFound(id)))
}

fn fetch_listing(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<Listing>> {
  conn
    .query_row(
      &format!("SELECT {LISTING_COLS} FROM listings WHERE listing_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawListing::from_row,
    )
    .optional()?
    .map(RawListing::into_listing)
    .transpose()
}

fn require_listing(conn: &rusqlite::Connection, id: Uuid) -> Result<Listing> {
  fetch_listing(conn, id)?
    .ok_or_else(|| Error::from(CoreError::ListingNotFound(id)))
}

fn fetch_transaction(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<Transaction>> {
  conn
    .query_row(
      &format!(
        "SELECT {TRANSACTION_COLS} FROM transactions WHERE transaction_id = ?1"
      ),
      rusqlite::params![encode_uuid(id)],
      RawTransaction::from_row,
    )
    .optional()?
    .map(RawTransaction::into_transaction)
    .transpose()
}

fn fetch_gig(conn: &rusqlite::Connection, id: Uuid) -> Result<Option<Gig>> {
  conn
    .query_row(
      &format!("SELECT {GIG_COLS} FROM gigs WHERE gig_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawGig::from_row,
    )
    .optional()?
    .map(RawGig::into_gig)
    .transpose()
}

fn fetch_bid(conn: &rusqlite::Connection, id: Uuid) -> Result<Option<Bid>> {
  conn
    .query_row(
      &format!("SELECT {BID_COLS} FROM bids WHERE bid_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawBid::from_row,
    )
    .optional()?
    .map(RawBid::into_bid)
    .transpose()
}

fn fetch_task(conn: &rusqlite::Connection, id: Uuid) -> Result<Option<Task>> {
  conn
    .query_row(
      &format!("SELECT {TASK_COLS} FROM tasks WHERE task_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawTask::from_row,
    )
    .optional()?
    .map(RawTask::into_task)
    .transpose()
}

fn bids_for_gig_q(conn: &rusqlite::Connection, gig_id: Uuid) -> Result<Vec<Bid>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {BID_COLS} FROM bids WHERE gig_id = ?1 ORDER BY created_at ASC, rowid ASC"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(gig_id)], RawBid::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawBid::into_bid).collect()
}

// ─── Users ────────────────────────────────────────────────────────────────────

fn create_user_tx(
  conn: &mut rusqlite::Connection,
  input: NewUser,
) -> Result<User> {
  if input.username.trim().is_empty() || input.email.trim().is_empty() {
    return Err(
      CoreError::Validation("username and email are required".to_string())
        .into(),
    );
  }

  let tx = conn.transaction()?;

  let taken: Option<String> = tx
    .query_row(
      "SELECT username FROM users WHERE username = ?1 OR email = ?2",
      rusqlite::params![input.username, input.email],
      |r| r.get(0),
    )
    .optional()?;
  if let Some(existing) = taken {
    let which = if existing == input.username { "username" } else { "email" };
    return Err(
      CoreError::Validation(format!("{which} is already registered")).into(),
    );
  }

  let user = User {
    user_id:         Uuid::new_v4(),
    username:        input.username,
    email:           input.email,
    password_hash:   input.password_hash,
    location:        input.location,
    bio:             input.bio,
    skills:          input.skills,
    rating:          RatingAggregate::default(),
    completed_tasks: 0,
    total_earnings:  0.0,
    created_at:      Utc::now(),
  };

  tx.execute(
    &format!(
      "INSERT INTO users ({USER_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ),
    rusqlite::params![
      encode_uuid(user.user_id),
      user.username,
      user.email,
      user.password_hash,
      user.location,
      user.bio,
      user.skills,
      user.rating.average,
      user.rating.count,
      user.completed_tasks,
      user.total_earnings,
      encode_dt(user.created_at),
    ],
  )?;

  tx.commit()?;
  Ok(user)
}

// ─── Listings ─────────────────────────────────────────────────────────────────

fn create_listing_tx(
  conn: &mut rusqlite::Connection,
  input: NewListing,
) -> Result<Listing> {
  if input.title.trim().is_empty() || input.description.trim().is_empty() {
    return Err(
      CoreError::Validation(
        "listing title and description are required".to_string(),
      )
      .into(),
    );
  }
  if input.price < 0.0 {
    return Err(
      CoreError::Validation("listing price cannot be negative".to_string())
        .into(),
    );
  }

  let tx = conn.transaction()?;
  require_user(&tx, input.owner_id)?;

  let listing = Listing {
    listing_id:   Uuid::new_v4(),
    owner_id:     input.owner_id,
    title:        input.title,
    description:  input.description,
    price:        input.price,
    category:     input.category,
    condition:    input.condition,
    location:     input.location,
    tags:         input.tags,
    availability: input.availability,
    status:       ListingStatus::Available,
    created_at:   Utc::now(),
  };

  insert_listing(&tx, &listing)?;
  tx.commit()?;
  Ok(listing)
}

fn insert_listing(
  conn: &rusqlite::Connection,
  listing: &Listing,
) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO listings ({LISTING_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ),
    rusqlite::params![
      encode_uuid(listing.listing_id),
      encode_uuid(listing.owner_id),
      listing.title,
      listing.description,
      listing.price,
      listing.category.as_str(),
      listing.condition.as_str(),
      listing.location,
      listing.tags,
      listing.availability.as_str(),
      listing.status.as_str(),
      encode_dt(listing.created_at),
    ],
  )?;
  Ok(())
}

fn list_listings_q(
  conn: &rusqlite::Connection,
  filter: &ListingFilter,
) -> Result<Vec<Listing>> {
  let text_pattern =
    filter.text.as_deref().map(|t| format!("%{}%", t.to_lowercase()));
  let category_str = filter.category.map(|c| c.as_str());
  let availability_str = filter.availability.map(|a| a.as_str());
  let exclude_str = filter.exclude_owner.map(encode_uuid);
  let limit_val = filter.limit.unwrap_or(100) as i64;
  let offset_val = filter.offset.unwrap_or(0) as i64;

  // Fixed parameter indices; LIMIT/OFFSET carry the highest so every
  // placeholder is always bindable.
  let mut conds: Vec<&'static str> = vec![];
  if text_pattern.is_some() {
    conds.push("(lower(title) LIKE ?1 OR lower(description) LIKE ?1)");
  }
  if category_str.is_some() {
    conds.push("category = ?2");
  }
  if availability_str.is_some() {
    conds.push("availability = ?3");
  }
  if exclude_str.is_some() {
    conds.push("owner_id <> ?4");
  }
  if filter.available_only {
    conds.push("status = 'available'");
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };

  let sql = format!(
    "SELECT {LISTING_COLS} FROM listings {where_clause}
     ORDER BY created_at DESC, rowid DESC
     LIMIT ?5 OFFSET ?6"
  );

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(
      rusqlite::params![
        text_pattern,
        category_str,
        availability_str,
        exclude_str,
        limit_val,
        offset_val,
      ],
      RawListing::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawListing::into_listing).collect()
}

fn update_listing_tx(
  conn: &mut rusqlite::Connection,
  id: Uuid,
  patch: ListingPatch,
) -> Result<Listing> {
  let tx = conn.transaction()?;
  let mut listing = require_listing(&tx, id)?;

  if patch.is_empty() {
    return Ok(listing);
  }

  if let Some(v) = patch.title {
    listing.title = v;
  }
  if let Some(v) = patch.description {
    listing.description = v;
  }
  if let Some(v) = patch.price {
    if v < 0.0 {
      return Err(
        CoreError::Validation("listing price cannot be negative".to_string())
          .into(),
      );
    }
    listing.price = v;
  }
  if let Some(v) = patch.category {
    listing.category = v;
  }
  if let Some(v) = patch.condition {
    listing.condition = v;
  }
  if let Some(v) = patch.location {
    listing.location = Some(v);
  }
  if let Some(v) = patch.tags {
    listing.tags = Some(v);
  }
  if let Some(v) = patch.availability {
    listing.availability = v;
  }
  if let Some(v) = patch.status {
    listing.status = v;
  }

  tx.execute(
    "UPDATE listings
     SET title = ?1, description = ?2, price = ?3, category = ?4,
         condition = ?5, location = ?6, tags = ?7, availability = ?8,
         status = ?9
     WHERE listing_id = ?10",
    rusqlite::params![
      listing.title,
      listing.description,
      listing.price,
      listing.category.as_str(),
      listing.condition.as_str(),
      listing.location,
      listing.tags,
      listing.availability.as_str(),
      listing.status.as_str(),
      encode_uuid(id),
    ],
  )?;

  tx.commit()?;
  Ok(listing)
}

fn match_candidates_q(
  conn: &rusqlite::Connection,
  source_listing_id: Uuid,
) -> Result<Vec<MatchCandidate>> {
  let source = require_listing(conn, source_listing_id)?;

  // The scorer re-applies its own exclusions; the pool pre-filters what it
  // can express in SQL. LEFT JOIN so a missing owner degrades the rating to
  // zero instead of dropping the candidate.
  let mut stmt = conn.prepare(
    "SELECT l.listing_id, l.owner_id, l.title, l.description, l.price,
            l.category, l.condition, l.location, l.tags, l.availability,
            l.status, l.created_at,
            COALESCE(u.username, ''), COALESCE(u.rating, 0)
     FROM listings l
     LEFT JOIN users u ON u.user_id = l.owner_id
     WHERE l.status = 'available'
       AND l.listing_id <> ?1
       AND l.owner_id <> ?2
     ORDER BY l.created_at DESC, l.rowid DESC",
  )?;

  let raws = stmt
    .query_map(
      rusqlite::params![
        encode_uuid(source_listing_id),
        encode_uuid(source.owner_id),
      ],
      |row| {
        Ok((
          RawListing::from_row(row)?,
          row.get::<_, String>(12)?,
          row.get::<_, f64>(13)?,
        ))
      },
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws
    .into_iter()
    .map(|(raw, owner_name, owner_rating)| {
      Ok(MatchCandidate {
        listing: raw.into_listing()?,
        owner_name,
        owner_rating,
      })
    })
    .collect()
}

// ─── Item transactions ────────────────────────────────────────────────────────

fn create_transaction_tx(
  conn: &mut rusqlite::Connection,
  input: NewTransaction,
) -> Result<Transaction> {
  let tx = conn.transaction()?;

  let listing = require_listing(&tx, input.listing_id)?;
  validate_new_transaction(&listing, &input)?;
  require_user(&tx, input.requested_by)?;
  if let Some(matched) = input.matched_listing_id {
    // existence only; availability is deliberately not re-checked
    require_listing(&tx, matched)?;
  }

  let transaction = Transaction {
    transaction_id:     Uuid::new_v4(),
    listing_id:         input.listing_id,
    requested_by:       input.requested_by,
    kind:               input.kind,
    status:             TransactionStatus::Pending,
    matched_listing_id: input.matched_listing_id,
    start_date:         input.start_date,
    end_date:           input.end_date,
    created_at:         Utc::now(),
  };

  tx.execute(
    &format!(
      "INSERT INTO transactions ({TRANSACTION_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ),
    rusqlite::params![
      encode_uuid(transaction.transaction_id),
      encode_uuid(transaction.listing_id),
      encode_uuid(transaction.requested_by),
      transaction.kind.as_str(),
      transaction.status.as_str(),
      transaction.matched_listing_id.map(encode_uuid),
      transaction.start_date.map(encode_date),
      transaction.end_date.map(encode_date),
      encode_dt(transaction.created_at),
    ],
  )?;

  tx.commit()?;
  Ok(transaction)
}

fn set_transaction_status_tx(
  conn: &mut rusqlite::Connection,
  id: Uuid,
  status: TransactionStatus,
  acting_user: Uuid,
) -> Result<Transaction> {
  let tx = conn.transaction()?;

  let current = fetch_transaction(&tx, id)?
    .ok_or_else(|| Error::from(CoreError::TransactionNotFound(id)))?;
  let listing = require_listing(&tx, current.listing_id)?;

  if acting_user != current.requested_by && acting_user != listing.owner_id {
    return Err(CoreError::Unauthorized(acting_user).into());
  }
  if status == TransactionStatus::Accepted && acting_user != listing.owner_id {
    return Err(CoreError::Unauthorized(acting_user).into());
  }
  ensure_transition(current.status, status)?;

  tx.execute(
    "UPDATE transactions SET status = ?1 WHERE transaction_id = ?2",
    rusqlite::params![status.as_str(), encode_uuid(id)],
  )?;

  // Unconditional reset: the listing re-opens even if something else had
  // flipped its status in the meantime.
  if status.releases_listing() {
    tx.execute(
      "UPDATE listings SET status = 'available' WHERE listing_id = ?1",
      rusqlite::params![encode_uuid(current.listing_id)],
    )?;
  }

  tx.commit()?;
  Ok(Transaction { status, ..current })
}

fn transactions_for_user_q(
  conn: &rusqlite::Connection,
  user_id: Uuid,
) -> Result<Vec<Transaction>> {
  let mut stmt = conn.prepare(
    "SELECT t.transaction_id, t.listing_id, t.requested_by, t.kind, t.status,
            t.matched_listing_id, t.start_date, t.end_date, t.created_at
     FROM transactions t
     JOIN listings l ON l.listing_id = t.listing_id
     WHERE t.requested_by = ?1 OR l.owner_id = ?1
     ORDER BY t.created_at DESC, t.rowid DESC",
  )?;

  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(user_id)], RawTransaction::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawTransaction::into_transaction).collect()
}

// ─── Gigs, bids, tasks ────────────────────────────────────────────────────────

fn create_gig_tx(conn: &mut rusqlite::Connection, input: NewGig) -> Result<Gig> {
  validate_new_gig(&input)?;

  let tx = conn.transaction()?;
  require_user(&tx, input.owner_id)?;

  let gig = Gig {
    gig_id:        Uuid::new_v4(),
    owner_id:      input.owner_id,
    title:         input.title,
    description:   input.description,
    category:      input.category,
    budget_type:   input.budget_type,
    budget_amount: input.budget_amount,
    time_estimate: input.time_estimate,
    urgency:       input.urgency,
    deadline:      input.deadline,
    location:      input.location,
    status:        GigStatus::Open,
    created_at:    Utc::now(),
  };

  tx.execute(
    &format!(
      "INSERT INTO gigs ({GIG_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    ),
    rusqlite::params![
      encode_uuid(gig.gig_id),
      encode_uuid(gig.owner_id),
      gig.title,
      gig.description,
      gig.category,
      gig.budget_type.as_str(),
      gig.budget_amount,
      gig.time_estimate,
      gig.urgency,
      gig.deadline.map(encode_date),
      gig.location,
      gig.status.as_str(),
      encode_dt(gig.created_at),
    ],
  )?;

  tx.commit()?;
  Ok(gig)
}

fn list_gigs_q(
  conn: &rusqlite::Connection,
  filter: &GigFilter,
) -> Result<Vec<Gig>> {
  let text_pattern =
    filter.text.as_deref().map(|t| format!("%{}%", t.to_lowercase()));
  let category_lower =
    filter.category.as_deref().map(|c| c.to_lowercase());
  let status_str = filter.status.map(|s| s.as_str());
  let exclude_str = filter.exclude_owner.map(encode_uuid);
  let limit_val = filter.limit.unwrap_or(100) as i64;
  let offset_val = filter.offset.unwrap_or(0) as i64;

  let mut conds: Vec<&'static str> = vec![];
  if text_pattern.is_some() {
    conds.push("(lower(title) LIKE ?1 OR lower(description) LIKE ?1)");
  }
  if category_lower.is_some() {
    conds.push("lower(category) = ?2");
  }
  if status_str.is_some() {
    conds.push("status = ?3");
  }
  if exclude_str.is_some() {
    conds.push("owner_id <> ?4");
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };

  let sql = format!(
    "SELECT {GIG_COLS} FROM gigs {where_clause}
     ORDER BY created_at DESC, rowid DESC
     LIMIT ?5 OFFSET ?6"
  );

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(
      rusqlite::params![
        text_pattern,
        category_lower,
        status_str,
        exclude_str,
        limit_val,
        offset_val,
      ],
      RawGig::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawGig::into_gig).collect()
}

fn place_bid_tx(conn: &mut rusqlite::Connection, input: NewBid) -> Result<Bid> {
  let tx = conn.transaction()?;

  let gig = fetch_gig(&tx, input.gig_id)?
    .ok_or_else(|| Error::from(CoreError::GigNotFound(input.gig_id)))?;
  require_user(&tx, input.bidder_id)?;

  let existing = bids_for_gig_q(&tx, input.gig_id)?;
  validate_bid(&gig, &existing, &input)?;

  let bid = Bid {
    bid_id:         Uuid::new_v4(),
    gig_id:         input.gig_id,
    bidder_id:      input.bidder_id,
    amount:         input.amount,
    estimated_time: input.estimated_time,
    proposal:       input.proposal,
    status:         BidStatus::Pending,
    created_at:     Utc::now(),
  };

  tx.execute(
    &format!(
      "INSERT INTO bids ({BID_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
    ),
    rusqlite::params![
      encode_uuid(bid.bid_id),
      encode_uuid(bid.gig_id),
      encode_uuid(bid.bidder_id),
      bid.amount,
      bid.estimated_time,
      bid.proposal,
      bid.status.as_str(),
      encode_dt(bid.created_at),
    ],
  )?;

  tx.commit()?;
  Ok(bid)
}

fn accept_bid_tx(
  conn: &mut rusqlite::Connection,
  bid_id: Uuid,
  acting_user: Uuid,
) -> Result<Task> {
  let tx = conn.transaction()?;

  let bid = fetch_bid(&tx, bid_id)?
    .ok_or_else(|| Error::from(CoreError::BidNotFound(bid_id)))?;
  let gig = fetch_gig(&tx, bid.gig_id)?
    .ok_or_else(|| Error::from(CoreError::GigNotFound(bid.gig_id)))?;

  if acting_user != gig.owner_id {
    return Err(CoreError::Unauthorized(acting_user).into());
  }
  // A gig leaves Open the moment one accept succeeds, so at most one wins.
  if gig.status != GigStatus::Open {
    return Err(
      CoreError::invalid_transition(gig.status, GigStatus::InProgress).into(),
    );
  }
  if bid.status != BidStatus::Pending {
    return Err(
      CoreError::invalid_transition(bid.status, BidStatus::Accepted).into(),
    );
  }

  let task = Task {
    task_id:       Uuid::new_v4(),
    gig_id:        gig.gig_id,
    bid_id:        bid.bid_id,
    client_id:     gig.owner_id,
    freelancer_id: bid.bidder_id,
    amount:        bid.amount,
    status:        TaskStatus::InProgress,
    started_at:    Utc::now(),
    completed_at:  None,
    client_rating: None,
    client_review: None,
  };

  tx.execute(
    &format!(
      "INSERT INTO tasks ({TASK_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    ),
    rusqlite::params![
      encode_uuid(task.task_id),
      encode_uuid(task.gig_id),
      encode_uuid(task.bid_id),
      encode_uuid(task.client_id),
      encode_uuid(task.freelancer_id),
      task.amount,
      task.status.as_str(),
      encode_dt(task.started_at),
      Option::<String>::None,
      Option::<i64>::None,
      Option::<String>::None,
    ],
  )?;

  tx.execute(
    "UPDATE bids SET status = 'accepted' WHERE bid_id = ?1",
    rusqlite::params![encode_uuid(bid.bid_id)],
  )?;
  tx.execute(
    "UPDATE bids SET status = 'rejected'
     WHERE gig_id = ?1 AND bid_id <> ?2 AND status = 'pending'",
    rusqlite::params![encode_uuid(gig.gig_id), encode_uuid(bid.bid_id)],
  )?;
  tx.execute(
    "UPDATE gigs SET status = 'in_progress' WHERE gig_id = ?1",
    rusqlite::params![encode_uuid(gig.gig_id)],
  )?;

  tx.commit()?;
  Ok(task)
}

fn tasks_for_user_q(
  conn: &rusqlite::Connection,
  user_id: Uuid,
  role: Option<TaskRole>,
) -> Result<Vec<Task>> {
  let cond = match role {
    Some(TaskRole::Client) => "client_id = ?1",
    Some(TaskRole::Freelancer) => "freelancer_id = ?1",
    None => "(client_id = ?1 OR freelancer_id = ?1)",
  };

  let sql = format!(
    "SELECT {TASK_COLS} FROM tasks WHERE {cond}
     ORDER BY started_at DESC, rowid DESC"
  );

  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(user_id)], RawTask::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawTask::into_task).collect()
}

fn complete_task_tx(
  conn: &mut rusqlite::Connection,
  id: Uuid,
  acting_user: Uuid,
  rating: Option<u8>,
  review: Option<String>,
) -> Result<Task> {
  let tx = conn.transaction()?;

  let task = fetch_task(&tx, id)?
    .ok_or_else(|| Error::from(CoreError::TaskNotFound(id)))?;

  // Freelancer side: declare the work done.
  if acting_user == task.freelancer_id {
    if task.status != TaskStatus::InProgress {
      return Err(
        CoreError::invalid_transition(task.status, TaskStatus::PendingReview)
          .into(),
      );
    }
    tx.execute(
      "UPDATE tasks SET status = 'pending_review' WHERE task_id = ?1",
      rusqlite::params![encode_uuid(id)],
    )?;
    tx.commit()?;
    return Ok(Task { status: TaskStatus::PendingReview, ..task });
  }

  if acting_user != task.client_id {
    return Err(CoreError::Unauthorized(acting_user).into());
  }

  // Client side: sign off. Only a PendingReview task can be completed, so
  // the side effects below fire exactly once per task.
  if task.status != TaskStatus::PendingReview {
    return Err(
      CoreError::invalid_transition(task.status, TaskStatus::Completed).into(),
    );
  }

  let rating = rating.unwrap_or(DEFAULT_COMPLETION_RATING);
  validate_rating(rating)?;

  let freelancer = require_user(&tx, task.freelancer_id)?;
  let folded = fold_rating(freelancer.rating, freelancer.completed_tasks, rating);
  let completed_at = Utc::now();

  tx.execute(
    "UPDATE users
     SET rating = ?1, rating_count = ?2,
         completed_tasks = completed_tasks + 1,
         total_earnings = total_earnings + ?3
     WHERE user_id = ?4",
    rusqlite::params![
      folded.average,
      folded.count,
      task.amount,
      encode_uuid(task.freelancer_id),
    ],
  )?;

  let gig = fetch_gig(&tx, task.gig_id)?
    .ok_or_else(|| Error::from(CoreError::GigNotFound(task.gig_id)))?;

  tx.execute(
    &format!(
      "INSERT INTO portfolio ({PORTFOLIO_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
    ),
    rusqlite::params![
      encode_uuid(Uuid::new_v4()),
      encode_uuid(task.freelancer_id),
      encode_uuid(task.task_id),
      gig.title,
      gig.description,
      freelancer.skills,
      review,
      rating,
      encode_date(completed_at.date_naive()),
    ],
  )?;

  tx.execute(
    "UPDATE tasks
     SET status = 'completed', completed_at = ?1, client_rating = ?2,
         client_review = ?3
     WHERE task_id = ?4",
    rusqlite::params![
      encode_dt(completed_at),
      rating,
      review,
      encode_uuid(id),
    ],
  )?;

  tx.execute(
    "UPDATE gigs SET status = 'completed' WHERE gig_id = ?1",
    rusqlite::params![encode_uuid(task.gig_id)],
  )?;

  tx.commit()?;
  Ok(Task {
    status: TaskStatus::Completed,
    completed_at: Some(completed_at),
    client_rating: Some(rating),
    client_review: review,
    ..task
  })
}

// ─── Reviews ──────────────────────────────────────────────────────────────────

fn upsert_review_tx(
  conn: &mut rusqlite::Connection,
  input: NewReview,
) -> Result<Review> {
  validate_rating(input.rating)?;

  let tx = conn.transaction()?;

  let transaction = fetch_transaction(&tx, input.transaction_id)?
    .ok_or_else(|| {
      Error::from(CoreError::TransactionNotFound(input.transaction_id))
    })?;
  if transaction.status != TransactionStatus::Completed {
    return Err(
      CoreError::Validation(
        "reviews are only allowed on completed transactions".to_string(),
      )
      .into(),
    );
  }

  let listing = require_listing(&tx, transaction.listing_id)?;
  let requester = transaction.requested_by;
  let owner = listing.owner_id;
  let legal_pair = (input.reviewer_id == requester && input.subject_id == owner)
    || (input.reviewer_id == owner && input.subject_id == requester);
  if !legal_pair {
    return Err(CoreError::Unauthorized(input.reviewer_id).into());
  }

  let subject_str = encode_uuid(input.subject_id);

  let existing: Option<(String, String)> = tx
    .query_row(
      "SELECT review_id, created_at FROM reviews
       WHERE subject_id = ?1 AND reviewer_id = ?2 AND transaction_id = ?3",
      rusqlite::params![
        subject_str,
        encode_uuid(input.reviewer_id),
        encode_uuid(input.transaction_id),
      ],
      |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()?;

  let review = match existing {
    Some((id_str, created_str)) => {
      tx.execute(
        "UPDATE reviews SET rating = ?1, comment = ?2 WHERE review_id = ?3",
        rusqlite::params![input.rating, input.comment, id_str],
      )?;
      Review {
        review_id:      decode_uuid(&id_str)?,
        subject_id:     input.subject_id,
        reviewer_id:    input.reviewer_id,
        transaction_id: input.transaction_id,
        rating:         input.rating,
        comment:        input.comment,
        created_at:     decode_dt(&created_str)?,
      }
    }
    None => {
      let review = Review {
        review_id:      Uuid::new_v4(),
        subject_id:     input.subject_id,
        reviewer_id:    input.reviewer_id,
        transaction_id: input.transaction_id,
        rating:         input.rating,
        comment:        input.comment,
        created_at:     Utc::now(),
      };
      tx.execute(
        &format!(
          "INSERT INTO reviews ({REVIEW_COLS})
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ),
        rusqlite::params![
          encode_uuid(review.review_id),
          subject_str,
          encode_uuid(review.reviewer_id),
          encode_uuid(review.transaction_id),
          review.rating,
          review.comment,
          encode_dt(review.created_at),
        ],
      )?;
      review
    }
  };

  // Recompute the subject's aggregate over all their reviews in the same
  // unit as the write.
  let (average, count): (f64, i64) = tx.query_row(
    "SELECT COALESCE(AVG(rating), 0), COUNT(*) FROM reviews WHERE subject_id = ?1",
    rusqlite::params![subject_str],
    |r| Ok((r.get(0)?, r.get(1)?)),
  )?;

  let updated = tx.execute(
    "UPDATE users SET rating = ?1, rating_count = ?2 WHERE user_id = ?3",
    rusqlite::params![average, count, subject_str],
  )?;
  if updated == 0 {
    return Err(CoreError::UserNotFound(input.subject_id).into());
  }

  tx.commit()?;
  Ok(review)
}

fn reviews_for_user_q(
  conn: &rusqlite::Connection,
  user_id: Uuid,
) -> Result<Vec<Review>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {REVIEW_COLS} FROM reviews WHERE subject_id = ?1
     ORDER BY created_at DESC, rowid DESC"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(user_id)], RawReview::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReview::into_review).collect()
}

fn portfolio_for_user_q(
  conn: &rusqlite::Connection,
  user_id: Uuid,
) -> Result<Vec<PortfolioEntry>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PORTFOLIO_COLS} FROM portfolio WHERE freelancer_id = ?1
     ORDER BY completion_date DESC, rowid DESC"
  ))?;
  let raws = stmt
    .query_map(
      rusqlite::params![encode_uuid(user_id)],
      RawPortfolioEntry::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawPortfolioEntry::into_entry).collect()
}

// ─── Messages ─────────────────────────────────────────────────────────────────

fn send_message_tx(
  conn: &mut rusqlite::Connection,
  input: NewMessage,
) -> Result<Message> {
  if input.body.trim().is_empty() {
    return Err(
      CoreError::Validation("message body cannot be empty".to_string()).into(),
    );
  }

  let tx = conn.transaction()?;
  require_user(&tx, input.sender_id)?;
  require_user(&tx, input.receiver_id)?;
  if let Some(task_id) = input.task_id
    && fetch_task(&tx, task_id)?.is_none()
  {
    return Err(CoreError::TaskNotFound(task_id).into());
  }

  let message = Message {
    message_id:  Uuid::new_v4(),
    sender_id:   input.sender_id,
    receiver_id: input.receiver_id,
    task_id:     input.task_id,
    body:        input.body,
    read:        false,
    created_at:  Utc::now(),
  };

  tx.execute(
    &format!(
      "INSERT INTO messages ({MESSAGE_COLS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
    ),
    rusqlite::params![
      encode_uuid(message.message_id),
      encode_uuid(message.sender_id),
      encode_uuid(message.receiver_id),
      message.task_id.map(encode_uuid),
      message.body,
      message.read,
      encode_dt(message.created_at),
    ],
  )?;

  tx.commit()?;
  Ok(message)
}

fn messages_for_user_q(
  conn: &rusqlite::Connection,
  user_id: Uuid,
  peer_id: Option<Uuid>,
) -> Result<Vec<Message>> {
  let user_str = encode_uuid(user_id);

  let raws = if let Some(peer) = peer_id {
    let mut stmt = conn.prepare(&format!(
      "SELECT {MESSAGE_COLS} FROM messages
       WHERE (sender_id = ?1 AND receiver_id = ?2)
          OR (sender_id = ?2 AND receiver_id = ?1)
       ORDER BY created_at ASC, rowid ASC"
    ))?;
    stmt
      .query_map(
        rusqlite::params![user_str, encode_uuid(peer)],
        RawMessage::from_row,
      )?
      .collect::<rusqlite::Result<Vec<_>>>()?
  } else {
    let mut stmt = conn.prepare(&format!(
      "SELECT {MESSAGE_COLS} FROM messages
       WHERE sender_id = ?1 OR receiver_id = ?1
       ORDER BY created_at ASC, rowid ASC"
    ))?;
    stmt
      .query_map(rusqlite::params![user_str], RawMessage::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws.into_iter().map(RawMessage::into_message).collect()
}

// ─── MarketStore impl ─────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> souk_core::Result<User> {
    self.with_conn(move |conn| create_user_tx(conn, input)).await
  }

  async fn get_user(&self, id: Uuid) -> souk_core::Result<Option<User>> {
    self.with_conn(move |conn| fetch_user(conn, id)).await
  }

  async fn get_user_by_name(
    &self,
    username: &str,
  ) -> souk_core::Result<Option<User>> {
    let username = username.to_owned();
    self
      .with_conn(move |conn| {
        conn
          .query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
            rusqlite::params![username],
            RawUser::from_row,
          )
          .optional()?
          .map(RawUser::into_user)
          .transpose()
      })
      .await
  }

  async fn get_user_by_email(
    &self,
    email: &str,
  ) -> souk_core::Result<Option<User>> {
    let email = email.to_owned();
    self
      .with_conn(move |conn| {
        conn
          .query_row(
            &format!("SELECT {USER_COLS} FROM users WHERE email = ?1"),
            rusqlite::params![email],
            RawUser::from_row,
          )
          .optional()?
          .map(RawUser::into_user)
          .transpose()
      })
      .await
  }

  async fn update_user_rating(
    &self,
    id: Uuid,
    rating: RatingAggregate,
  ) -> souk_core::Result<()> {
    self
      .with_conn(move |conn| {
        let updated = conn.execute(
          "UPDATE users SET rating = ?1, rating_count = ?2 WHERE user_id = ?3",
          rusqlite::params![rating.average, rating.count, encode_uuid(id)],
        )?;
        if updated == 0 {
          return Err(CoreError::UserNotFound(id).into());
        }
        Ok(())
      })
      .await
  }

  // ── Listings ──────────────────────────────────────────────────────────

  async fn create_listing(
    &self,
    input: NewListing,
  ) -> souk_core::Result<Listing> {
    self.with_conn(move |conn| create_listing_tx(conn, input)).await
  }

  async fn get_listing(&self, id: Uuid) -> souk_core::Result<Option<Listing>> {
    self.with_conn(move |conn| fetch_listing(conn, id)).await
  }

  async fn list_listings(
    &self,
    filter: &ListingFilter,
  ) -> souk_core::Result<Vec<Listing>> {
    let filter = filter.clone();
    self.with_conn(move |conn| list_listings_q(conn, &filter)).await
  }

  async fn update_listing(
    &self,
    id: Uuid,
    patch: ListingPatch,
  ) -> souk_core::Result<Listing> {
    self.with_conn(move |conn| update_listing_tx(conn, id, patch)).await
  }

  async fn delete_listing(&self, id: Uuid) -> souk_core::Result<()> {
    self
      .with_conn(move |conn| {
        let deleted = conn.execute(
          "DELETE FROM listings WHERE listing_id = ?1",
          rusqlite::params![encode_uuid(id)],
        )?;
        if deleted == 0 {
          return Err(CoreError::ListingNotFound(id).into());
        }
        Ok(())
      })
      .await
  }

  async fn match_candidates(
    &self,
    source_listing_id: Uuid,
  ) -> souk_core::Result<Vec<MatchCandidate>> {
    self
      .with_conn(move |conn| match_candidates_q(conn, source_listing_id))
      .await
  }

  // ── Item transactions ─────────────────────────────────────────────────

  async fn create_transaction(
    &self,
    input: NewTransaction,
  ) -> souk_core::Result<Transaction> {
    self.with_conn(move |conn| create_transaction_tx(conn, input)).await
  }

  async fn get_transaction(
    &self,
    id: Uuid,
  ) -> souk_core::Result<Option<Transaction>> {
    self.with_conn(move |conn| fetch_transaction(conn, id)).await
  }

  async fn set_transaction_status(
    &self,
    id: Uuid,
    status: TransactionStatus,
    acting_user: Uuid,
  ) -> souk_core::Result<Transaction> {
    self
      .with_conn(move |conn| {
        set_transaction_status_tx(conn, id, status, acting_user)
      })
      .await
  }

  async fn transactions_for_user(
    &self,
    user_id: Uuid,
  ) -> souk_core::Result<Vec<Transaction>> {
    self.with_conn(move |conn| transactions_for_user_q(conn, user_id)).await
  }

  // ── Gigs, bids, tasks ─────────────────────────────────────────────────

  async fn create_gig(&self, input: NewGig) -> souk_core::Result<Gig> {
    self.with_conn(move |conn| create_gig_tx(conn, input)).await
  }

  async fn get_gig(&self, id: Uuid) -> souk_core::Result<Option<Gig>> {
    self.with_conn(move |conn| fetch_gig(conn, id)).await
  }

  async fn list_gigs(&self, filter: &GigFilter) -> souk_core::Result<Vec<Gig>> {
    let filter = filter.clone();
    self.with_conn(move |conn| list_gigs_q(conn, &filter)).await
  }

  async fn place_bid(&self, input: NewBid) -> souk_core::Result<Bid> {
    self.with_conn(move |conn| place_bid_tx(conn, input)).await
  }

  async fn get_bid(&self, id: Uuid) -> souk_core::Result<Option<Bid>> {
    self.with_conn(move |conn| fetch_bid(conn, id)).await
  }

  async fn bids_for_gig(&self, gig_id: Uuid) -> souk_core::Result<Vec<Bid>> {
    self.with_conn(move |conn| bids_for_gig_q(conn, gig_id)).await
  }

  async fn accept_bid(
    &self,
    bid_id: Uuid,
    acting_user: Uuid,
  ) -> souk_core::Result<Task> {
    self.with_conn(move |conn| accept_bid_tx(conn, bid_id, acting_user)).await
  }

  async fn get_task(&self, id: Uuid) -> souk_core::Result<Option<Task>> {
    self.with_conn(move |conn| fetch_task(conn, id)).await
  }

  async fn tasks_for_user(
    &self,
    user_id: Uuid,
    role: Option<TaskRole>,
  ) -> souk_core::Result<Vec<Task>> {
    self.with_conn(move |conn| tasks_for_user_q(conn, user_id, role)).await
  }

  async fn complete_task(
    &self,
    id: Uuid,
    acting_user: Uuid,
    rating: Option<u8>,
    review: Option<String>,
  ) -> souk_core::Result<Task> {
    self
      .with_conn(move |conn| {
        complete_task_tx(conn, id, acting_user, rating, review)
      })
      .await
  }

  // ── Reviews and portfolio ─────────────────────────────────────────────

  async fn upsert_review(&self, input: NewReview) -> souk_core::Result<Review> {
    self.with_conn(move |conn| upsert_review_tx(conn, input)).await
  }

  async fn reviews_for_user(
    &self,
    user_id: Uuid,
  ) -> souk_core::Result<Vec<Review>> {
    self.with_conn(move |conn| reviews_for_user_q(conn, user_id)).await
  }

  async fn portfolio_for_user(
    &self,
    user_id: Uuid,
  ) -> souk_core::Result<Vec<PortfolioEntry>> {
    self.with_conn(move |conn| portfolio_for_user_q(conn, user_id)).await
  }

  // ── Messages ──────────────────────────────────────────────────────────

  async fn send_message(
    &self,
    input: NewMessage,
  ) -> souk_core::Result<Message> {
    self.with_conn(move |conn| send_message_tx(conn, input)).await
  }

  async fn messages_for_user(
    &self,
    user_id: Uuid,
    peer_id: Option<Uuid>,
  ) -> souk_core::Result<Vec<Message>> {
    self
      .with_conn(move |conn| messages_for_user_q(conn, user_id, peer_id))
      .await
  }

  async fn unread_count(&self, user_id: Uuid) -> souk_core::Result<u64> {
    self
      .with_conn(move |conn| {
        let count: i64 = conn.query_row(
          "SELECT COUNT(*) FROM messages
           WHERE receiver_id = ?1 AND is_read = 0",
          rusqlite::params![encode_uuid(user_id)],
          |r| r.get(0),
        )?;
        Ok(count as u64)
      })
      .await
  }

  async fn mark_read(
    &self,
    user_id: Uuid,
    peer_id: Uuid,
  ) -> souk_core::Result<()> {
    self
      .with_conn(move |conn| {
        conn.execute(
          "UPDATE messages SET is_read = 1
           WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0",
          rusqlite::params![encode_uuid(user_id), encode_uuid(peer_id)],
        )?;
        Ok(())
      })
      .await
  }
}
