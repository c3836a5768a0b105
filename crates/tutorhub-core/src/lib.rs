//! Core types and trait definitions for tutorhub.
//!
//! Owns the course lifecycle rules ([`engine::CourseEngine`]) and the
//! capability traits that storage, caching, identity and notification
//! backends implement. Nothing here depends on a web framework or a database.

pub mod cache;
pub mod course;
pub mod engine;
pub mod error;
pub mod identity;
pub mod link;
pub mod notify;
pub mod schedule;
pub mod store;
pub mod subject;
pub mod user;
pub mod view;

pub use error::{Error, Result};
