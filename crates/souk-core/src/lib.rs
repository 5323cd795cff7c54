//! Core types and trait definitions for the Souk marketplace.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod bid;
pub mod error;
pub mod gig;
pub mod listing;
pub mod matching;
pub mod message;
pub mod review;
pub mod store;
pub mod task;
pub mod transaction;
pub mod user;

pub use error::{Error, Result};
