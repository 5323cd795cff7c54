//! The `MarketStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `souk-store-sqlite`).
//! Higher layers (`souk-api`, the server binary) depend on this abstraction,
//! not on any concrete backend.
//!
//! Every operation that must be atomic (bid acceptance, task
//! completion, transaction status changes, review upserts) is a single trait
//! method: the backend must apply all of its writes or none of them.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  bid::{Bid, NewBid},
  gig::{Gig, GigStatus, NewGig},
  listing::{AvailabilityMode, Category, Listing, ListingPatch, NewListing},
  matching::MatchCandidate,
  message::{Message, NewMessage},
  review::{NewReview, PortfolioEntry, Review},
  task::{Task, TaskRole},
  transaction::{NewTransaction, Transaction, TransactionStatus},
  user::{NewUser, RatingAggregate, User},
};

// ─── Query types ──────────────────────────────────────────────────────────────

/// Parameters for [`MarketStore::list_listings`]. All filters are conjunctive;
/// results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
  /// Free-text filter over title and description (case-insensitive).
  pub text:          Option<String>,
  pub category:      Option<Category>,
  pub availability:  Option<AvailabilityMode>,
  /// Restrict to Available listings only (the browse default).
  pub available_only: bool,
  /// Hide this user's own listings.
  pub exclude_owner: Option<Uuid>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

/// Parameters for [`MarketStore::list_gigs`]; same conventions.
#[derive(Debug, Clone, Default)]
pub struct GigFilter {
  pub text:          Option<String>,
  pub category:      Option<String>,
  pub status:        Option<GigStatus>,
  pub exclude_owner: Option<Uuid>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

// ─── Trait ────────────────────────────────────────────────────────────────────

/// Abstraction over a Souk storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). Backend failures
/// surface as [`crate::Error::Storage`], with no partial effect observable.
pub trait MarketStore: Send + Sync {
  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. The password is already hashed by the caller.
  /// Fails with a validation error if the username or email is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>>> + Send + '_;

  fn get_user_by_name<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>>> + Send + 'a;

  fn get_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>>> + Send + 'a;

  /// Overwrite a user's rating aggregate. Reserved for lifecycle side
  /// effects; API callers never reach this directly.
  fn update_user_rating(
    &self,
    id: Uuid,
    rating: RatingAggregate,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  // ── Listings ──────────────────────────────────────────────────────────

  /// Create a listing, initially Available.
  fn create_listing(
    &self,
    input: NewListing,
  ) -> impl Future<Output = Result<Listing>> + Send + '_;

  fn get_listing(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Listing>>> + Send + '_;

  fn list_listings<'a>(
    &'a self,
    filter: &'a ListingFilter,
  ) -> impl Future<Output = Result<Vec<Listing>>> + Send + 'a;

  /// Apply a typed partial update. Unset fields are left untouched.
  fn update_listing(
    &self,
    id: Uuid,
    patch: ListingPatch,
  ) -> impl Future<Output = Result<Listing>> + Send + '_;

  fn delete_listing(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;

  /// Assemble the match-scorer candidate pool for a source listing:
  /// Available listings, newest first, each with owner display name and
  /// rating (rating degrades to 0.0 if the owner row is missing).
  ///
  /// The scorer re-applies its own exclusion rules; the pool only needs to
  /// be a superset shaped for display.
  fn match_candidates(
    &self,
    source_listing_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MatchCandidate>>> + Send + '_;

  // ── Item transactions ─────────────────────────────────────────────────

  /// Create a transaction, initially Pending. Validates the listing exists
  /// and [`crate::transaction::validate_new_transaction`] passes.
  fn create_transaction(
    &self,
    input: NewTransaction,
  ) -> impl Future<Output = Result<Transaction>> + Send + '_;

  fn get_transaction(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Transaction>>> + Send + '_;

  /// Drive the transaction state machine. Atomic unit: the status change
  /// plus — when landing on Completed or Cancelled — the unconditional reset
  /// of the referenced listing to Available.
  ///
  /// The actor must be the requester or the listing owner; accepting is
  /// owner-only.
  fn set_transaction_status(
    &self,
    id: Uuid,
    status: TransactionStatus,
    acting_user: Uuid,
  ) -> impl Future<Output = Result<Transaction>> + Send + '_;

  /// All transactions where the user is requester or listing owner,
  /// newest first.
  fn transactions_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Transaction>>> + Send + '_;

  // ── Gigs, bids, tasks ─────────────────────────────────────────────────

  /// Create a gig, initially Open. Validates
  /// [`crate::gig::validate_new_gig`].
  fn create_gig(
    &self,
    input: NewGig,
  ) -> impl Future<Output = Result<Gig>> + Send + '_;

  fn get_gig(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Gig>>> + Send + '_;

  fn list_gigs<'a>(
    &'a self,
    filter: &'a GigFilter,
  ) -> impl Future<Output = Result<Vec<Gig>>> + Send + 'a;

  /// Submit a bid, initially Pending. Validates
  /// [`crate::bid::validate_bid`] against the gig and its existing bids.
  fn place_bid(
    &self,
    input: NewBid,
  ) -> impl Future<Output = Result<Bid>> + Send + '_;

  fn get_bid(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Bid>>> + Send + '_;

  fn bids_for_gig(
    &self,
    gig_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Bid>>> + Send + '_;

  /// The acceptance protocol, as one atomic unit:
  /// create the task, mark the bid Accepted, reject every other pending bid
  /// on the gig, and move the gig to InProgress. Fails without any visible
  /// effect if the gig is not Open, the bid is not Pending, or the actor is
  /// not the gig owner.
  fn accept_bid(
    &self,
    bid_id: Uuid,
    acting_user: Uuid,
  ) -> impl Future<Output = Result<Task>> + Send + '_;

  fn get_task(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Task>>> + Send + '_;

  fn tasks_for_user(
    &self,
    user_id: Uuid,
    role: Option<TaskRole>,
  ) -> impl Future<Output = Result<Vec<Task>>> + Send + '_;

  /// The two-sided completion protocol.
  ///
  /// Freelancer: InProgress -> PendingReview, no side effects.
  /// Client: PendingReview -> Completed, atomically folding the rating into
  /// the freelancer's aggregate, bumping completed count and earnings,
  /// materialising the portfolio entry, and closing the gig. `rating`
  /// defaults to 5; returns the updated task.
  fn complete_task(
    &self,
    id: Uuid,
    acting_user: Uuid,
    rating: Option<u8>,
    review: Option<String>,
  ) -> impl Future<Output = Result<Task>> + Send + '_;

  // ── Reviews and portfolio ─────────────────────────────────────────────

  /// Idempotent upsert keyed by (subject, reviewer, transaction), plus an
  /// atomic recompute of the subject's rating aggregate. The transaction
  /// must be Completed and the reviewer/subject its two counterparties.
  fn upsert_review(
    &self,
    input: NewReview,
  ) -> impl Future<Output = Result<Review>> + Send + '_;

  fn reviews_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Review>>> + Send + '_;

  fn portfolio_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<PortfolioEntry>>> + Send + '_;

  // ── Messages ──────────────────────────────────────────────────────────

  fn send_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message>> + Send + '_;

  /// All messages involving the user, optionally narrowed to one peer,
  /// oldest first.
  fn messages_for_user(
    &self,
    user_id: Uuid,
    peer_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Message>>> + Send + '_;

  fn unread_count(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<u64>> + Send + '_;

  /// Mark everything the peer has sent to the user as read.
  fn mark_read(
    &self,
    user_id: Uuid,
    peer_id: Uuid,
  ) -> impl Future<Output = Result<()>> + Send + '_;
}
