//! Handlers for `/transactions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/transactions` | Body: `NewTransaction`; starts Pending |
//! | `GET`  | `/transactions?user_id=` | Both sides of the exchange |
//! | `POST` | `/transactions/{id}/status` | Drives the state machine |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use souk_core::{
  store::MarketStore,
  transaction::{NewTransaction, Transaction, TransactionStatus},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /transactions` — body: `NewTransaction`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewTransaction>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let transaction = store.create_transaction(body).await?;
  Ok((StatusCode::CREATED, Json(transaction)))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
}

/// `GET /transactions?user_id=<uuid>`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Transaction>>, ApiError>
where
  S: MarketStore,
{
  let transactions = store.transactions_for_user(params.user_id).await?;
  Ok(Json(transactions))
}

// ─── Status change ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status:      TransactionStatus,
  pub acting_user: Uuid,
}

/// `POST /transactions/{id}/status` — body: `{"status":"accepted","acting_user":"…"}`
pub async fn set_status<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Transaction>, ApiError>
where
  S: MarketStore,
{
  let transaction =
    store.set_transaction_status(id, body.status, body.acting_user).await?;
  Ok(Json(transaction))
}
