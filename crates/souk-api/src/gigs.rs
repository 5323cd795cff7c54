//! Handlers for `/gigs` and `/bids` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/gigs` | Filters via query params |
//! | `POST` | `/gigs` | Body: `NewGig`; starts Open |
//! | `GET`  | `/gigs/{id}` | 404 if not found |
//! | `GET`  | `/gigs/{id}/bids` | Oldest first |
//! | `POST` | `/gigs/{id}/bids` | Submission-time validation |
//! | `POST` | `/bids/{id}/accept` | The atomic acceptance protocol |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use souk_core::{
  Error as CoreError,
  bid::{Bid, NewBid},
  gig::{Gig, GigStatus, NewGig},
  store::{GigFilter, MarketStore},
  task::Task,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub text:          Option<String>,
  pub category:      Option<String>,
  pub status:        Option<GigStatus>,
  pub exclude_owner: Option<Uuid>,
  pub limit:         Option<usize>,
  pub offset:        Option<usize>,
}

/// `GET /gigs[?text=&category=&status=&...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Gig>>, ApiError>
where
  S: MarketStore,
{
  let filter = GigFilter {
    text:          params.text,
    category:      params.category,
    status:        params.status,
    exclude_owner: params.exclude_owner,
    limit:         params.limit,
    offset:        params.offset,
  };
  let gigs = store.list_gigs(&filter).await?;
  Ok(Json(gigs))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /gigs` — body: `NewGig`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewGig>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let gig = store.create_gig(body).await?;
  Ok((StatusCode::CREATED, Json(gig)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /gigs/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Gig>, ApiError>
where
  S: MarketStore,
{
  let gig = store.get_gig(id).await?.ok_or(CoreError::GigNotFound(id))?;
  Ok(Json(gig))
}

// ─── Bids ─────────────────────────────────────────────────────────────────────

/// `GET /gigs/{id}/bids`
pub async fn list_bids<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, ApiError>
where
  S: MarketStore,
{
  // distinguish "no bids" from "no gig"
  store.get_gig(id).await?.ok_or(CoreError::GigNotFound(id))?;
  let bids = store.bids_for_gig(id).await?;
  Ok(Json(bids))
}

#[derive(Debug, Deserialize)]
pub struct BidBody {
  pub bidder_id:      Uuid,
  pub amount:         f64,
  pub estimated_time: Option<String>,
  pub proposal:       Option<String>,
}

/// `POST /gigs/{id}/bids`
pub async fn place_bid<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<BidBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let bid = store
    .place_bid(NewBid {
      gig_id:         id,
      bidder_id:      body.bidder_id,
      amount:         body.amount,
      estimated_time: body.estimated_time,
      proposal:       body.proposal,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(bid)))
}

#[derive(Debug, Deserialize)]
pub struct AcceptBody {
  pub acting_user: Uuid,
}

/// `POST /bids/{id}/accept` — returns the newly created task.
pub async fn accept_bid<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<AcceptBody>,
) -> Result<(StatusCode, Json<Task>), ApiError>
where
  S: MarketStore,
{
  let task = store.accept_bid(id, body.acting_user).await?;
  Ok((StatusCode::CREATED, Json(task)))
}
