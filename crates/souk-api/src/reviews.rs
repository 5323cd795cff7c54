//! Handlers for `/reviews` and `/portfolio` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use souk_core::{
  review::{NewReview, PortfolioEntry, Review},
  store::MarketStore,
};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
}

/// `POST /reviews` — body: `NewReview`; resubmission updates in place.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewReview>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let review = store.upsert_review(body).await?;
  Ok((StatusCode::CREATED, Json(review)))
}

/// `GET /reviews?user_id=<uuid>` — reviews *about* the user.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Review>>, ApiError>
where
  S: MarketStore,
{
  let reviews = store.reviews_for_user(params.user_id).await?;
  Ok(Json(reviews))
}

/// `GET /portfolio?user_id=<uuid>`
pub async fn portfolio<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<PortfolioEntry>>, ApiError>
where
  S: MarketStore,
{
  let entries = store.portfolio_for_user(params.user_id).await?;
  Ok(Json(entries))
}
