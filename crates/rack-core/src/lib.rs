//! Core types and trait definitions for the RackAI results pipeline.
//!
//! No database or runtime dependencies. The store backend and the rollup
//! builders both depend on it.

// Implementations use native `async fn` against the `impl Future + Send`
// trait signatures.
#![allow(async_fn_in_trait)]

pub mod build;
pub mod error;
pub mod fact;
pub mod slug;
pub mod store;
pub mod view;

pub use error::{Error, Result};
