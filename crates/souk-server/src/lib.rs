//! Server assembly for Souk.
//!
//! Glues a [`SqliteStore`]-backed [`souk_api`] router together with request
//! tracing and exposes the [`ServerConfig`] the binary deserialises from
//! `config.toml` / `SOUK_*` environment variables.
//!
//! [`SqliteStore`]: souk_store_sqlite::SqliteStore

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use souk_core::store::MarketStore;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `SOUK_*` environment variables. Every field has a default so the
/// server starts with no config file at all.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  8080
}

fn default_store_path() -> PathBuf {
  PathBuf::from("souk.db")
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: the JSON API nested under `/api`,
/// with per-request tracing.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: MarketStore + 'static,
{
  Router::new()
    .nest("/api", souk_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
