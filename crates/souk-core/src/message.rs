//! Direct messages between users, optionally attached to a task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub message_id:  Uuid,
  pub sender_id:   Uuid,
  pub receiver_id: Uuid,
  pub task_id:     Option<Uuid>,
  pub body:        String,
  pub read:        bool,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::MarketStore::send_message`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
  pub sender_id:   Uuid,
  pub receiver_id: Uuid,
  pub task_id:     Option<Uuid>,
  pub body:        String,
}
