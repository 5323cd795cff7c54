//! Handlers for `/listings` endpoints, including the match scorer surface.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/listings` | Filters via query params |
//! | `POST`   | `/listings` | Body: `NewListing` |
//! | `GET`    | `/listings/{id}` | 404 if not found |
//! | `PATCH`  | `/listings/{id}` | Body: `ListingPatch` |
//! | `DELETE` | `/listings/{id}` | 204 on success |
//! | `GET`    | `/listings/{id}/matches?user_id=` | Top scored matches |

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
  listing::{AvailabilityMode, Category, Listing, ListingPatch, NewListing},
  matching::{ScoredMatch, find_matches},
  store::{ListingFilter, MarketStore},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub text:           Option<String>,
  pub category:       Option<Category>,
  pub availability:   Option<AvailabilityMode>,
  pub available_only: Option<bool>,
  pub exclude_owner:  Option<Uuid>,
  pub limit:          Option<usize>,
  pub offset:         Option<usize>,
}

/// `GET /listings[?text=&category=&availability=&available_only=&...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Listing>>, ApiError>
where
  S: MarketStore,
{
  let filter = ListingFilter {
    text:           params.text,
    category:       params.category,
    availability:   params.availability,
    available_only: params.available_only.unwrap_or(false),
    exclude_owner:  params.exclude_owner,
    limit:          params.limit,
    offset:         params.offset,
  };
  let listings = store.list_listings(&filter).await?;
  Ok(Json(listings))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /listings` — body: `NewListing`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewListing>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let listing = store.create_listing(body).await?;
  Ok((StatusCode::CREATED, Json(listing)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /listings/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Listing>, ApiError>
where
  S: MarketStore,
{
  let listing =
    store.get_listing(id).await?.ok_or(CoreError::ListingNotFound(id))?;
  Ok(Json(listing))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PATCH /listings/{id}` — body: `ListingPatch`; unset fields are left alone.
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ListingPatch>,
) -> Result<Json<Listing>, ApiError>
where
  S: MarketStore,
{
  let listing = store.update_listing(id, patch).await?;
  Ok(Json(listing))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /listings/{id}`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: MarketStore,
{
  store.delete_listing(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Matches ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MatchParams {
  /// The browsing user; their own listings are excluded from results.
  pub user_id: Uuid,
}

/// `GET /listings/{id}/matches?user_id=<uuid>`
pub async fn matches<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<MatchParams>,
) -> Result<Json<Vec<ScoredMatch>>, ApiError>
where
  S: MarketStore,
{
  let source =
    store.get_listing(id).await?.ok_or(CoreError::ListingNotFound(id))?;
  let pool = store.match_candidates(id).await?;
  Ok(Json(find_matches(&source, &pool, params.user_id)))
}
