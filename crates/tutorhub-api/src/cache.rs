//! In-process [`DetailCache`].

use std::{
  collections::HashMap,
  convert::Infallible,
  time::{Duration, Instant},
};

use tokio::sync::RwLock;
use tutorhub_core::cache::DetailCache;

struct Entry {
  value:     String,
  stored_at: Instant,
}

/// A map of cached detail payloads with an optional time-to-live.
///
/// Expired entries are dropped lazily when read.
#[derive(Default)]
pub struct MemoryCache {
  entries: RwLock<HashMap<String, Entry>>,
  ttl:     Option<Duration>,
}

impl MemoryCache {
  pub fn new() -> Self { Self::default() }

  pub fn with_ttl(ttl: Duration) -> Self {
    Self { entries: RwLock::default(), ttl: Some(ttl) }
  }

  fn is_expired(&self, entry: &Entry) -> bool {
    self.ttl.is_some_and(|ttl| entry.stored_at.elapsed() >= ttl)
  }
}

impl DetailCache for MemoryCache {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    {
      let entries = self.entries.read().await;
      match entries.get(key) {
        None => return Ok(None),
        Some(entry) if !self.is_expired(entry) => {
          return Ok(Some(entry.value.clone()));
        }
        Some(_) => {}
      }
    }

    let mut entries = self.entries.write().await;
    if entries.get(key).is_some_and(|e| self.is_expired(e)) {
      entries.remove(key);
    }
    Ok(None)
  }

  async fn set(&self, key: String, value: String) -> Result<(), Infallible> {
    let entry = Entry { value, stored_at: Instant::now() };
    self.entries.write().await.insert(key, entry);
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Infallible> {
    self.entries.write().await.remove(key);
    Ok(())
  }
}
