//! SQLite backend for tutorhub courses, users, and enrollments.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every call is serialised on that one
//! connection, and enrollment additionally runs inside an `IMMEDIATE`
//! transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
