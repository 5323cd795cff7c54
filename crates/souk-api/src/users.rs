//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Register; validates email shape and password policy |
//! | `POST` | `/users/login` | Verifies credentials, returns the user record |
//! | `GET`  | `/users/{id}` | 404 if not found |

use std::sync::Arc;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rand_core::OsRng;
use serde::Deserialize;
use souk_core::{
  Error as CoreError,
  store::MarketStore,
  user::{NewUser, User, validate_email, validate_password},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: String,
  pub email:    String,
  pub password: String,
  pub location: Option<String>,
  pub bio:      Option<String>,
  pub skills:   Option<String>,
}

/// `POST /users` — the plaintext password never reaches the store.
pub async fn register<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MarketStore,
{
  validate_email(&body.email)?;
  validate_password(&body.password)?;

  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(body.password.as_bytes(), &salt)
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?
    .to_string();

  let user = store
    .create_user(NewUser {
      username:      body.username,
      email:         body.email,
      password_hash: hash,
      location:      body.location,
      bio:           body.bio,
      skills:        body.skills,
    })
    .await?;

  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /users/login`
///
/// Missing user and wrong password are indistinguishable to the caller.
pub async fn login<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<User>, ApiError>
where
  S: MarketStore,
{
  let user = store
    .get_user_by_name(&body.username)
    .await?
    .ok_or(ApiError::InvalidCredentials)?;

  let parsed = PasswordHash::new(&user.password_hash)
    .map_err(|_| ApiError::InvalidCredentials)?;
  Argon2::default()
    .verify_password(body.password.as_bytes(), &parsed)
    .map_err(|_| ApiError::InvalidCredentials)?;

  Ok(Json(user))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: MarketStore,
{
  let user = store.get_user(id).await?.ok_or(CoreError::UserNotFound(id))?;
  Ok(Json(user))
}
