//! Handlers for `/messages` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/messages` | Body: `NewMessage` |
//! | `GET`  | `/messages?user_id=[&peer_id=]` | Oldest first |
//! | `GET`  | `/messages/unread?user_id=` | Count only |
//! | `POST` | `/messages/read` | Marks one peer's messages read |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use souk_core::{
  message::{Message, NewMessage},
  store::MarketStore,
};
use uuid::Uuid;

use crate::error::ApiError;

/// `POST /messages` — body: `NewMessage`
pub async fn send<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewMessage>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  let message = store.send_message(body).await?;
  Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
  pub peer_id: Option<Uuid>,
}

/// `GET /messages?user_id=<uuid>[&peer_id=<uuid>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: MarketStore,
{
  let messages =
    store.messages_for_user(params.user_id, params.peer_id).await?;
  Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct UnreadParams {
  pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UnreadResponse {
  pub unread: u64,
}

/// `GET /messages/unread?user_id=<uuid>`
pub async fn unread<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<UnreadParams>,
) -> Result<Json<UnreadResponse>, ApiError>
where
  S: MarketStore,
{
  let unread = store.unread_count(params.user_id).await?;
  Ok(Json(UnreadResponse { unread }))
}

#[derive(Debug, Deserialize)]
pub struct ReadBody {
  pub user_id: Uuid,
  pub peer_id: Uuid,
}

/// `POST /messages/read` — marks everything `peer_id` sent to `user_id` read.
pub async fn mark_read<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<ReadBody>,
) -> Result<StatusCode, ApiError>
where
  S: MarketStore,
{
  store.mark_read(body.user_id, body.peer_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
