//! Handlers for `/tasks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tasks?user_id=[&role=client\|freelancer]` | Newest first |
//! | `POST` | `/tasks/{id}/complete` | The two-sided completion protocol |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use souk_core::{
  store::MarketStore,
  task::{Task, TaskRole},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub user_id: Uuid,
  pub role:    Option<TaskRole>,
}

/// `GET /tasks?user_id=<uuid>[&role=client|freelancer]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Task>>, ApiError>
where
  S: MarketStore,
{
  let tasks = store.tasks_for_user(params.user_id, params.role).await?;
  Ok(Json(tasks))
}

// ─── Complete ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub acting_user: Uuid,
  /// Client sign-off only; defaults to 5 when absent.
  pub rating:      Option<u8>,
  pub review:      Option<String>,
}

/// `POST /tasks/{id}/complete`
///
/// The freelancer hands the task off to review; the client signs it off.
/// Which side applies is determined by `acting_user`.
pub async fn complete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CompleteBody>,
) -> Result<Json<Task>, ApiError>
where
  S: MarketStore,
{
  let task = store
    .complete_task(id, body.acting_user, body.rating, body.review)
    .await?;
  Ok(Json(task))
}
