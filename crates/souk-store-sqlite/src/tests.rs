//! Integration tests for `SqliteStore` against an in-memory database.

use souk_core::{
  Error,
  bid::{BidStatus, NewBid},
  gig::{BudgetType, GigStatus, NewGig},
  listing::{
    AvailabilityMode, Category, Condition, ListingPatch, ListingStatus,
    NewListing,
  },
  message::NewMessage,
  review::NewReview,
  store::{GigFilter, ListingFilter, MarketStore},
  task::{TaskRole, TaskStatus},
  transaction::{NewTransaction, TransactionKind, TransactionStatus},
  user::{NewUser, RatingAggregate, User},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, name: &str) -> User {
  s.create_user(NewUser {
    username:      name.to_string(),
    email:         format!("{name}@example.com"),
    password_hash: "$argon2id$fake".to_string(),
    location:      Some("Boston, MA".to_string()),
    bio:           None,
    skills:        Some("carpentry, design".to_string()),
  })
  .await
  .unwrap()
}

fn new_listing(owner: Uuid) -> NewListing {
  NewListing {
    owner_id:     owner,
    title:        "Cordless drill".to_string(),
    description:  "18V, two batteries".to_string(),
    price:        50.0,
    category:     Category::Tools,
    condition:    Condition::Good,
    location:     Some("Boston, MA".to_string()),
    tags:         Some("drill,cordless".to_string()),
    availability: AvailabilityMode::Both,
  }
}

fn new_gig(owner: Uuid) -> NewGig {
  NewGig {
    owner_id:      owner,
    title:         "Logo design".to_string(),
    description:   "Simple wordmark for a coffee cart".to_string(),
    category:      "Design".to_string(),
    budget_type:   BudgetType::Fixed,
    budget_amount: 100.0,
    time_estimate: None,
    urgency:       None,
    deadline:      None,
    location:      None,
  }
}

fn bid_of(gig_id: Uuid, bidder: Uuid, amount: f64) -> NewBid {
  NewBid {
    gig_id,
    bidder_id: bidder,
    amount,
    estimated_time: None,
    proposal: None,
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_user() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  assert_eq!(alice.rating, RatingAggregate::default());
  assert_eq!(alice.completed_tasks, 0);
  assert_eq!(alice.total_earnings, 0.0);

  let fetched = s.get_user(alice.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.username, "alice");
  assert_eq!(fetched.email, "alice@example.com");
}

#[tokio::test]
async fn duplicate_username_or_email_rejected() {
  let s = store().await;
  user(&s, "alice").await;

  let same_name = s
    .create_user(NewUser {
      username:      "alice".to_string(),
      email:         "other@example.com".to_string(),
      password_hash: "h".to_string(),
      location:      None,
      bio:           None,
      skills:        None,
    })
    .await;
  assert!(matches!(same_name, Err(Error::Validation(_))));

  let same_email = s
    .create_user(NewUser {
      username:      "alice2".to_string(),
      email:         "alice@example.com".to_string(),
      password_hash: "h".to_string(),
      location:      None,
      bio:           None,
      skills:        None,
    })
    .await;
  assert!(matches!(same_email, Err(Error::Validation(_))));
}

#[tokio::test]
async fn lookup_by_name_and_email() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let by_name = s.get_user_by_name("alice").await.unwrap().unwrap();
  assert_eq!(by_name.user_id, alice.user_id);

  let by_email =
    s.get_user_by_email("alice@example.com").await.unwrap().unwrap();
  assert_eq!(by_email.user_id, alice.user_id);

  assert!(s.get_user_by_name("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn update_user_rating_requires_existing_user() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let agg = RatingAggregate { average: 4.5, count: 2 };
  s.update_user_rating(alice.user_id, agg).await.unwrap();
  let fetched = s.get_user(alice.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.rating, agg);

  let missing = s.update_user_rating(Uuid::new_v4(), agg).await;
  assert!(matches!(missing, Err(Error::UserNotFound(_))));
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_listing_starts_available() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  assert_eq!(listing.status, ListingStatus::Available);

  let fetched = s.get_listing(listing.listing_id).await.unwrap().unwrap();
  assert_eq!(fetched.title, "Cordless drill");
  assert_eq!(fetched.owner_id, alice.user_id);
}

#[tokio::test]
async fn create_listing_unknown_owner_rejected() {
  let s = store().await;
  let result = s.create_listing(new_listing(Uuid::new_v4())).await;
  assert!(matches!(result, Err(Error::UserNotFound(_))));
}

#[tokio::test]
async fn list_listings_filters() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;

  s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let mut books = new_listing(bob.user_id);
  books.title = "Calculus textbook".to_string();
  books.category = Category::Books;
  s.create_listing(books).await.unwrap();

  let all = s.list_listings(&ListingFilter::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let tools = s
    .list_listings(&ListingFilter {
      category: Some(Category::Tools),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(tools.len(), 1);
  assert_eq!(tools[0].category, Category::Tools);

  let text = s
    .list_listings(&ListingFilter {
      text: Some("CALCULUS".to_string()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(text.len(), 1);
  assert_eq!(text[0].title, "Calculus textbook");

  let not_bobs = s
    .list_listings(&ListingFilter {
      exclude_owner: Some(bob.user_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(not_bobs.len(), 1);
  assert_eq!(not_bobs[0].owner_id, alice.user_id);
}

#[tokio::test]
async fn list_listings_available_only_and_order() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let first = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let second = s.create_listing(new_listing(alice.user_id)).await.unwrap();

  s.update_listing(
    first.listing_id,
    ListingPatch { status: Some(ListingStatus::Rented), ..Default::default() },
  )
  .await
  .unwrap();

  let available = s
    .list_listings(&ListingFilter { available_only: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(available.len(), 1);
  assert_eq!(available[0].listing_id, second.listing_id);

  // newest first
  let all = s.list_listings(&ListingFilter::default()).await.unwrap();
  assert_eq!(all[0].listing_id, second.listing_id);
  assert_eq!(all[1].listing_id, first.listing_id);
}

#[tokio::test]
async fn update_listing_patch_semantics() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();

  let updated = s
    .update_listing(
      listing.listing_id,
      ListingPatch {
        title: Some("Cordless drill (new battery)".to_string()),
        price: Some(45.0),
        ..Default::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(updated.title, "Cordless drill (new battery)");
  assert_eq!(updated.price, 45.0);
  // untouched field survives
  assert_eq!(updated.description, listing.description);

  let unchanged = s
    .update_listing(listing.listing_id, ListingPatch::default())
    .await
    .unwrap();
  assert_eq!(unchanged.title, "Cordless drill (new battery)");

  let missing =
    s.update_listing(Uuid::new_v4(), ListingPatch::default()).await;
  assert!(matches!(missing, Err(Error::ListingNotFound(_))));
}

#[tokio::test]
async fn delete_listing_then_gone() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();

  s.delete_listing(listing.listing_id).await.unwrap();
  assert!(s.get_listing(listing.listing_id).await.unwrap().is_none());

  let again = s.delete_listing(listing.listing_id).await;
  assert!(matches!(again, Err(Error::ListingNotFound(_))));
}

#[tokio::test]
async fn match_pool_excludes_unavailable_and_own() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;

  let source = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  // alice's other listing must not appear in her own pool
  s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let bobs = s.create_listing(new_listing(bob.user_id)).await.unwrap();
  let carols = s.create_listing(new_listing(carol.user_id)).await.unwrap();
  s.update_listing(
    carols.listing_id,
    ListingPatch { status: Some(ListingStatus::Rented), ..Default::default() },
  )
  .await
  .unwrap();

  let pool = s.match_candidates(source.listing_id).await.unwrap();
  assert_eq!(pool.len(), 1);
  assert_eq!(pool[0].listing.listing_id, bobs.listing_id);
  assert_eq!(pool[0].owner_name, "bob");

  let missing = s.match_candidates(Uuid::new_v4()).await;
  assert!(matches!(missing, Err(Error::ListingNotFound(_))));
}

#[tokio::test]
async fn match_pool_newest_first() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;

  let source = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let older = s.create_listing(new_listing(bob.user_id)).await.unwrap();
  let newer = s.create_listing(new_listing(bob.user_id)).await.unwrap();

  let pool = s.match_candidates(source.listing_id).await.unwrap();
  assert_eq!(pool.len(), 2);
  assert_eq!(pool[0].listing.listing_id, newer.listing_id);
  assert_eq!(pool[1].listing.listing_id, older.listing_id);
}

// ─── Item transactions ───────────────────────────────────────────────────────

async fn rental(s: &SqliteStore, listing: Uuid, requester: Uuid) -> Uuid {
  s.create_transaction(NewTransaction {
    listing_id: listing,
    requested_by: requester,
    kind: TransactionKind::Rental,
    matched_listing_id: None,
    start_date: None,
    end_date: None,
  })
  .await
  .unwrap()
  .transaction_id
}

#[tokio::test]
async fn create_transaction_starts_pending() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();

  let id = rental(&s, listing.listing_id, bob.user_id).await;
  let t = s.get_transaction(id).await.unwrap().unwrap();
  assert_eq!(t.status, TransactionStatus::Pending);
  assert_eq!(t.requested_by, bob.user_id);
}

#[tokio::test]
async fn own_listing_and_bare_barter_rejected() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();

  let own = s
    .create_transaction(NewTransaction {
      listing_id: listing.listing_id,
      requested_by: alice.user_id,
      kind: TransactionKind::Rental,
      matched_listing_id: None,
      start_date: None,
      end_date: None,
    })
    .await;
  assert!(matches!(own, Err(Error::Validation(_))));

  let bob = user(&s, "bob").await;
  let barter = s
    .create_transaction(NewTransaction {
      listing_id: listing.listing_id,
      requested_by: bob.user_id,
      kind: TransactionKind::Barter,
      matched_listing_id: None,
      start_date: None,
      end_date: None,
    })
    .await;
  assert!(matches!(barter, Err(Error::Validation(_))));
}

#[tokio::test]
async fn accepting_is_owner_only() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let id = rental(&s, listing.listing_id, bob.user_id).await;

  let by_requester = s
    .set_transaction_status(id, TransactionStatus::Accepted, bob.user_id)
    .await;
  assert!(matches!(by_requester, Err(Error::Unauthorized(_))));

  let by_stranger = s
    .set_transaction_status(id, TransactionStatus::Accepted, Uuid::new_v4())
    .await;
  assert!(matches!(by_stranger, Err(Error::Unauthorized(_))));

  let accepted = s
    .set_transaction_status(id, TransactionStatus::Accepted, alice.user_id)
    .await
    .unwrap();
  assert_eq!(accepted.status, TransactionStatus::Accepted);
}

#[tokio::test]
async fn cancel_and_complete_free_the_listing() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();

  // cancellation path
  let cancelled = rental(&s, listing.listing_id, bob.user_id).await;
  s.update_listing(
    listing.listing_id,
    ListingPatch { status: Some(ListingStatus::Pending), ..Default::default() },
  )
  .await
  .unwrap();
  s.set_transaction_status(
    cancelled,
    TransactionStatus::Cancelled,
    bob.user_id,
  )
  .await
  .unwrap();
  let l = s.get_listing(listing.listing_id).await.unwrap().unwrap();
  assert_eq!(l.status, ListingStatus::Available);

  // completion path; the requester may complete
  let completed = rental(&s, listing.listing_id, bob.user_id).await;
  s.set_transaction_status(
    completed,
    TransactionStatus::Accepted,
    alice.user_id,
  )
  .await
  .unwrap();
  s.update_listing(
    listing.listing_id,
    ListingPatch { status: Some(ListingStatus::Rented), ..Default::default() },
  )
  .await
  .unwrap();
  s.set_transaction_status(
    completed,
    TransactionStatus::Completed,
    bob.user_id,
  )
  .await
  .unwrap();
  let l = s.get_listing(listing.listing_id).await.unwrap().unwrap();
  assert_eq!(l.status, ListingStatus::Available);
}

#[tokio::test]
async fn illegal_transitions_rejected_loudly() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let id = rental(&s, listing.listing_id, bob.user_id).await;

  let skip = s
    .set_transaction_status(id, TransactionStatus::Completed, alice.user_id)
    .await;
  assert!(matches!(skip, Err(Error::InvalidTransition { .. })));

  s.set_transaction_status(id, TransactionStatus::Cancelled, bob.user_id)
    .await
    .unwrap();
  let revive = s
    .set_transaction_status(id, TransactionStatus::Accepted, alice.user_id)
    .await;
  assert!(matches!(revive, Err(Error::InvalidTransition { .. })));
}

#[tokio::test]
async fn transactions_visible_to_both_parties() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let id = rental(&s, listing.listing_id, bob.user_id).await;

  let for_owner = s.transactions_for_user(alice.user_id).await.unwrap();
  let for_requester = s.transactions_for_user(bob.user_id).await.unwrap();
  let for_stranger = s.transactions_for_user(carol.user_id).await.unwrap();

  assert_eq!(for_owner.len(), 1);
  assert_eq!(for_owner[0].transaction_id, id);
  assert_eq!(for_requester.len(), 1);
  assert!(for_stranger.is_empty());
}

// ─── Gigs, bids, tasks ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_gig_starts_open() {
  let s = store().await;
  let alice = user(&s, "alice").await;

  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  assert_eq!(gig.status, GigStatus::Open);

  let open = s
    .list_gigs(&GigFilter { status: Some(GigStatus::Open), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(open.len(), 1);
  assert_eq!(open[0].gig_id, gig.gig_id);
}

#[tokio::test]
async fn place_bid_validations() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();

  let missing_gig = s.place_bid(bid_of(Uuid::new_v4(), bob.user_id, 90.0)).await;
  assert!(matches!(missing_gig, Err(Error::GigNotFound(_))));

  let zero = s.place_bid(bid_of(gig.gig_id, bob.user_id, 0.0)).await;
  assert!(matches!(zero, Err(Error::Validation(_))));

  // fixed budget 100: 160 is over the 150% cap
  let over = s.place_bid(bid_of(gig.gig_id, bob.user_id, 160.0)).await;
  assert!(matches!(over, Err(Error::Validation(_))));

  s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let duplicate = s.place_bid(bid_of(gig.gig_id, bob.user_id, 85.0)).await;
  assert!(matches!(duplicate, Err(Error::Validation(_))));
}

#[tokio::test]
async fn accept_bid_protocol_is_atomic() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let dave = user(&s, "dave").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();

  s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let winner =
    s.place_bid(bid_of(gig.gig_id, carol.user_id, 95.0)).await.unwrap();
  s.place_bid(bid_of(gig.gig_id, dave.user_id, 80.0)).await.unwrap();

  let task = s.accept_bid(winner.bid_id, alice.user_id).await.unwrap();
  assert_eq!(task.status, TaskStatus::InProgress);
  assert_eq!(task.client_id, alice.user_id);
  assert_eq!(task.freelancer_id, carol.user_id);
  assert_eq!(task.amount, 95.0);

  let bids = s.bids_for_gig(gig.gig_id).await.unwrap();
  let accepted: Vec<_> =
    bids.iter().filter(|b| b.status == BidStatus::Accepted).collect();
  let rejected: Vec<_> =
    bids.iter().filter(|b| b.status == BidStatus::Rejected).collect();
  assert_eq!(accepted.len(), 1);
  assert_eq!(accepted[0].bid_id, winner.bid_id);
  assert_eq!(rejected.len(), 2);

  let gig = s.get_gig(gig.gig_id).await.unwrap().unwrap();
  assert_eq!(gig.status, GigStatus::InProgress);
}

#[tokio::test]
async fn accept_bid_rejected_without_any_effect() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  let bid = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();

  let by_stranger = s.accept_bid(bid.bid_id, bob.user_id).await;
  assert!(matches!(by_stranger, Err(Error::Unauthorized(_))));

  let gig_after = s.get_gig(gig.gig_id).await.unwrap().unwrap();
  assert_eq!(gig_after.status, GigStatus::Open);
  let bid_after = s.get_bid(bid.bid_id).await.unwrap().unwrap();
  assert_eq!(bid_after.status, BidStatus::Pending);
  assert!(s.tasks_for_user(bob.user_id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_one_accept_can_win() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();

  let first = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let second =
    s.place_bid(bid_of(gig.gig_id, carol.user_id, 95.0)).await.unwrap();

  s.accept_bid(first.bid_id, alice.user_id).await.unwrap();
  let again = s.accept_bid(second.bid_id, alice.user_id).await;
  assert!(matches!(again, Err(Error::InvalidTransition { .. })));
}

#[tokio::test]
async fn completion_is_two_sided_with_side_effects_once() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  let bid = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let task = s.accept_bid(bid.bid_id, alice.user_id).await.unwrap();

  // client cannot sign off while the work is still in progress
  let early = s.complete_task(task.task_id, alice.user_id, None, None).await;
  assert!(matches!(early, Err(Error::InvalidTransition { .. })));

  // freelancer declares the work done
  let handed_off =
    s.complete_task(task.task_id, bob.user_id, None, None).await.unwrap();
  assert_eq!(handed_off.status, TaskStatus::PendingReview);

  // client signs off with a rating and feedback
  let done = s
    .complete_task(
      task.task_id,
      alice.user_id,
      Some(4),
      Some("Solid work".to_string()),
    )
    .await
    .unwrap();
  assert_eq!(done.status, TaskStatus::Completed);
  assert_eq!(done.client_rating, Some(4));
  assert!(done.completed_at.is_some());

  let freelancer = s.get_user(bob.user_id).await.unwrap().unwrap();
  assert_eq!(freelancer.rating.average, 4.0);
  assert_eq!(freelancer.rating.count, 1);
  assert_eq!(freelancer.completed_tasks, 1);
  assert_eq!(freelancer.total_earnings, 90.0);

  let portfolio = s.portfolio_for_user(bob.user_id).await.unwrap();
  assert_eq!(portfolio.len(), 1);
  assert_eq!(portfolio[0].title, "Logo design");
  assert_eq!(portfolio[0].rating, 4);
  assert_eq!(portfolio[0].client_feedback, Some("Solid work".to_string()));

  let gig = s.get_gig(gig.gig_id).await.unwrap().unwrap();
  assert_eq!(gig.status, GigStatus::Completed);

  // second sign-off fails and the books do not move again
  let twice = s.complete_task(task.task_id, alice.user_id, Some(5), None).await;
  assert!(matches!(twice, Err(Error::InvalidTransition { .. })));
  let freelancer = s.get_user(bob.user_id).await.unwrap().unwrap();
  assert_eq!(freelancer.completed_tasks, 1);
  assert_eq!(freelancer.total_earnings, 90.0);
  assert_eq!(s.portfolio_for_user(bob.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn completion_defaults_to_five_stars() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  let bid = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let task = s.accept_bid(bid.bid_id, alice.user_id).await.unwrap();

  s.complete_task(task.task_id, bob.user_id, None, None).await.unwrap();
  let done =
    s.complete_task(task.task_id, alice.user_id, None, None).await.unwrap();
  assert_eq!(done.client_rating, Some(5));

  let freelancer = s.get_user(bob.user_id).await.unwrap().unwrap();
  assert_eq!(freelancer.rating.average, 5.0);
}

#[tokio::test]
async fn completion_average_weighs_completed_tasks_not_reviews() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;

  // bob earns two item-app reviews (2 and 4: average 3.0) before ever
  // completing a task
  for rating in [2, 4] {
    let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();
    let id = rental(&s, listing.listing_id, bob.user_id).await;
    s.set_transaction_status(id, TransactionStatus::Accepted, alice.user_id)
      .await
      .unwrap();
    s.set_transaction_status(id, TransactionStatus::Completed, bob.user_id)
      .await
      .unwrap();
    s.upsert_review(NewReview {
      subject_id:     bob.user_id,
      reviewer_id:    alice.user_id,
      transaction_id: id,
      rating,
      comment:        None,
    })
    .await
    .unwrap();
  }
  let bob_before = s.get_user(bob.user_id).await.unwrap().unwrap();
  assert_eq!(bob_before.rating, RatingAggregate { average: 3.0, count: 2 });
  assert_eq!(bob_before.completed_tasks, 0);

  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  let bid = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let task = s.accept_bid(bid.bid_id, alice.user_id).await.unwrap();
  s.complete_task(task.task_id, bob.user_id, None, None).await.unwrap();
  s.complete_task(task.task_id, alice.user_id, Some(5), None).await.unwrap();

  // the fold divides by the pre-increment completed-task count (0), so the
  // first task rating replaces the review-born average outright
  let bob_after = s.get_user(bob.user_id).await.unwrap().unwrap();
  assert_eq!(bob_after.rating.average, 5.0);
  assert_eq!(bob_after.completed_tasks, 1);
}

#[tokio::test]
async fn completion_rejects_strangers_and_bad_ratings() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  let bid = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let task = s.accept_bid(bid.bid_id, alice.user_id).await.unwrap();

  let stranger = s.complete_task(task.task_id, carol.user_id, None, None).await;
  assert!(matches!(stranger, Err(Error::Unauthorized(_))));

  s.complete_task(task.task_id, bob.user_id, None, None).await.unwrap();
  let bad = s.complete_task(task.task_id, alice.user_id, Some(6), None).await;
  assert!(matches!(bad, Err(Error::Validation(_))));

  // the failed sign-off left the task untouched
  let t = s.get_task(task.task_id).await.unwrap().unwrap();
  assert_eq!(t.status, TaskStatus::PendingReview);
}

#[tokio::test]
async fn tasks_filtered_by_role() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let gig = s.create_gig(new_gig(alice.user_id)).await.unwrap();
  let bid = s.place_bid(bid_of(gig.gig_id, bob.user_id, 90.0)).await.unwrap();
  let task = s.accept_bid(bid.bid_id, alice.user_id).await.unwrap();

  let as_client =
    s.tasks_for_user(alice.user_id, Some(TaskRole::Client)).await.unwrap();
  assert_eq!(as_client.len(), 1);
  assert_eq!(as_client[0].task_id, task.task_id);

  let as_freelancer = s
    .tasks_for_user(alice.user_id, Some(TaskRole::Freelancer))
    .await
    .unwrap();
  assert!(as_freelancer.is_empty());

  let either = s.tasks_for_user(bob.user_id, None).await.unwrap();
  assert_eq!(either.len(), 1);
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// Drives a rental through to Completed and returns its id.
async fn completed_rental(
  s: &SqliteStore,
  owner: &User,
  requester: &User,
) -> Uuid {
  let listing = s.create_listing(new_listing(owner.user_id)).await.unwrap();
  let id = rental(s, listing.listing_id, requester.user_id).await;
  s.set_transaction_status(id, TransactionStatus::Accepted, owner.user_id)
    .await
    .unwrap();
  s.set_transaction_status(id, TransactionStatus::Completed, requester.user_id)
    .await
    .unwrap();
  id
}

#[tokio::test]
async fn review_requires_completed_transaction() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let listing = s.create_listing(new_listing(alice.user_id)).await.unwrap();
  let id = rental(&s, listing.listing_id, bob.user_id).await;

  let early = s
    .upsert_review(NewReview {
      subject_id:     alice.user_id,
      reviewer_id:    bob.user_id,
      transaction_id: id,
      rating:         5,
      comment:        None,
    })
    .await;
  assert!(matches!(early, Err(Error::Validation(_))));
}

#[tokio::test]
async fn review_upsert_is_idempotent_and_recomputes() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let id = completed_rental(&s, &alice, &bob).await;

  let first = s
    .upsert_review(NewReview {
      subject_id:     alice.user_id,
      reviewer_id:    bob.user_id,
      transaction_id: id,
      rating:         5,
      comment:        Some("Great lender".to_string()),
    })
    .await
    .unwrap();

  let subject = s.get_user(alice.user_id).await.unwrap().unwrap();
  assert_eq!(subject.rating, RatingAggregate { average: 5.0, count: 1 });

  // resubmission updates in place
  let second = s
    .upsert_review(NewReview {
      subject_id:     alice.user_id,
      reviewer_id:    bob.user_id,
      transaction_id: id,
      rating:         3,
      comment:        None,
    })
    .await
    .unwrap();
  assert_eq!(second.review_id, first.review_id);

  let reviews = s.reviews_for_user(alice.user_id).await.unwrap();
  assert_eq!(reviews.len(), 1);
  assert_eq!(reviews[0].rating, 3);

  let subject = s.get_user(alice.user_id).await.unwrap().unwrap();
  assert_eq!(subject.rating, RatingAggregate { average: 3.0, count: 1 });
}

#[tokio::test]
async fn review_parties_must_be_counterparties() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let id = completed_rental(&s, &alice, &bob).await;

  let outsider = s
    .upsert_review(NewReview {
      subject_id:     alice.user_id,
      reviewer_id:    carol.user_id,
      transaction_id: id,
      rating:         5,
      comment:        None,
    })
    .await;
  assert!(matches!(outsider, Err(Error::Unauthorized(_))));

  // subject must be the *other* party, not the reviewer themselves
  let selfie = s
    .upsert_review(NewReview {
      subject_id:     bob.user_id,
      reviewer_id:    bob.user_id,
      transaction_id: id,
      rating:         5,
      comment:        None,
    })
    .await;
  assert!(matches!(selfie, Err(Error::Unauthorized(_))));

  let bad_rating = s
    .upsert_review(NewReview {
      subject_id:     alice.user_id,
      reviewer_id:    bob.user_id,
      transaction_id: id,
      rating:         0,
      comment:        None,
    })
    .await;
  assert!(matches!(bad_rating, Err(Error::Validation(_))));
}

// ─── Messages ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn messages_thread_and_peer_filter() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;

  for body in ["hi", "is the drill free this weekend?"] {
    s.send_message(NewMessage {
      sender_id:   bob.user_id,
      receiver_id: alice.user_id,
      task_id:     None,
      body:        body.to_string(),
    })
    .await
    .unwrap();
  }
  s.send_message(NewMessage {
    sender_id:   alice.user_id,
    receiver_id: bob.user_id,
    task_id:     None,
    body:        "yes, come by saturday".to_string(),
  })
  .await
  .unwrap();
  s.send_message(NewMessage {
    sender_id:   carol.user_id,
    receiver_id: alice.user_id,
    task_id:     None,
    body:        "unrelated".to_string(),
  })
  .await
  .unwrap();

  let all = s.messages_for_user(alice.user_id, None).await.unwrap();
  assert_eq!(all.len(), 4);
  // oldest first
  assert_eq!(all[0].body, "hi");

  let with_bob =
    s.messages_for_user(alice.user_id, Some(bob.user_id)).await.unwrap();
  assert_eq!(with_bob.len(), 3);
  assert!(with_bob
    .iter()
    .all(|m| m.sender_id != carol.user_id && m.receiver_id != carol.user_id));
}

#[tokio::test]
async fn unread_counts_and_mark_read() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;

  for sender in [&bob, &bob, &carol] {
    s.send_message(NewMessage {
      sender_id:   sender.user_id,
      receiver_id: alice.user_id,
      task_id:     None,
      body:        "ping".to_string(),
    })
    .await
    .unwrap();
  }

  assert_eq!(s.unread_count(alice.user_id).await.unwrap(), 3);

  s.mark_read(alice.user_id, bob.user_id).await.unwrap();
  assert_eq!(s.unread_count(alice.user_id).await.unwrap(), 1);

  let remaining = s
    .messages_for_user(alice.user_id, Some(carol.user_id))
    .await
    .unwrap();
  assert!(!remaining[0].read);
}

#[tokio::test]
async fn empty_message_body_rejected() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;

  let blank = s
    .send_message(NewMessage {
      sender_id:   bob.user_id,
      receiver_id: alice.user_id,
      task_id:     None,
      body:        "   ".to_string(),
    })
    .await;
  assert!(matches!(blank, Err(Error::Validation(_))));

  let ghost = s
    .send_message(NewMessage {
      sender_id:   Uuid::new_v4(),
      receiver_id: alice.user_id,
      task_id:     None,
      body:        "hello".to_string(),
    })
    .await;
  assert!(matches!(ghost, Err(Error::UserNotFound(_))));
}
