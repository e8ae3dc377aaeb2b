//! SQLite backend for the RackAI fact store and derived views.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Because every call is serialised on
//! that one connection, each view swap and each record merge pass is a single
//! transaction that readers observe atomically.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
