//! The read-through cache used by the detail view.
//!
//! The cache is never a source of truth. Mutations only ever delete entries;
//! the next read recomputes and repopulates.

use std::future::Future;

use uuid::Uuid;

pub trait DetailCache: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set(
    &self,
    key: String,
    value: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Cache key for a course's detail view.
pub fn detail_key(course_id: Uuid) -> String { format!("{course_id}--detail") }
