//! JSON REST API for Souk.
//!
//! Exposes an axum [`Router`] backed by any [`souk_core::store::MarketStore`].
//! Acting users are explicit request parameters — there is no ambient session
//! state. Auth flow, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", souk_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod gigs;
pub mod listings;
pub mod messages;
pub mod reviews;
pub mod tasks;
pub mod transactions;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use souk_core::store::MarketStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: MarketStore + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::register::<S>))
    .route("/users/login", post(users::login::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Listings and matching
    .route("/listings", get(listings::list::<S>).post(listings::create::<S>))
    .route(
      "/listings/{id}",
      get(listings::get_one::<S>)
        .patch(listings::update::<S>)
        .delete(listings::delete::<S>),
    )
    .route("/listings/{id}/matches", get(listings::matches::<S>))
    // Item transactions
    .route(
      "/transactions",
      get(transactions::list::<S>).post(transactions::create::<S>),
    )
    .route("/transactions/{id}/status", post(transactions::set_status::<S>))
    // Gigs, bids, tasks
    .route("/gigs", get(gigs::list::<S>).post(gigs::create::<S>))
    .route("/gigs/{id}", get(gigs::get_one::<S>))
    .route(
      "/gigs/{id}/bids",
      get(gigs::list_bids::<S>).post(gigs::place_bid::<S>),
    )
    .route("/bids/{id}/accept", post(gigs::accept_bid::<S>))
    .route("/tasks", get(tasks::list::<S>))
    .route("/tasks/{id}/complete", post(tasks::complete::<S>))
    // Reviews and portfolio
    .route("/reviews", get(reviews::list::<S>).post(reviews::create::<S>))
    .route("/portfolio", get(reviews::portfolio::<S>))
    // Messages
    .route("/messages", get(messages::list::<S>).post(messages::send::<S>))
    .route("/messages/unread", get(messages::unread::<S>))
    .route("/messages/read", post(messages::mark_read::<S>))
    .with_state(store)
}
