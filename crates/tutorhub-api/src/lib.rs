//! JSON HTTP API for tutorhub.
//!
//! Exposes an axum [`Router`] over a [`CourseEngine`] and a session
//! [`Binder`]. Both are generic over their backends, so the same router
//! serves SQLite in production and in-memory fixtures in tests.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = tutorhub_api::router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod auth;
pub mod binder;
pub mod cache;
pub mod courses;
pub mod error;
pub mod session;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{delete, get, post},
};
use serde_json::{Value, json};
use tutorhub_core::{
  cache::DetailCache, engine::CourseEngine, identity::IdentityVerifier,
  store::CourseRepository,
};

pub use binder::Binder;
pub use cache::MemoryCache;
pub use error::ApiError;
pub use session::{SESSION_COOKIE, SessionKeys};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<R, C, V> {
  pub engine: Arc<CourseEngine<R, C>>,
  pub binder: Arc<Binder<R, V>>,
}

impl<R, C, V> Clone for AppState<R, C, V> {
  fn clone(&self) -> Self {
    Self {
      engine: Arc::clone(&self.engine),
      binder: Arc::clone(&self.binder),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `state`.
pub fn router<R, C, V>(state: AppState<R, C, V>) -> Router
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Router::new()
    .route("/", get(hello))
    .route("/me", get(auth::me))
    // Auth
    .route("/auth/login", get(auth::login::<R, C, V>))
    .route("/auth/callback", get(auth::callback::<R, C, V>))
    .route("/auth/logout", get(auth::logout::<R, C, V>))
    // Listings
    .route("/course/list", get(courses::list::<R, C, V>))
    .route("/course/available", get(courses::available::<R, C, V>))
    .route("/course/mine", get(courses::mine::<R, C, V>))
    .route("/course/enrolled", get(courses::enrolled::<R, C, V>))
    // Single course
    .route("/course/create", post(courses::create::<R, C, V>))
    .route("/course/{id}/detail", get(courses::detail::<R, C, V>))
    .route("/course/{id}/update", post(courses::update::<R, C, V>))
    .route("/course/{id}/enroll", post(courses::enroll::<R, C, V>))
    .route("/course/{id}/unenroll", post(courses::unenroll::<R, C, V>))
    .route("/course/{id}/delete", delete(courses::delete::<R, C, V>))
    .with_state(state)
}

async fn hello() -> Json<Value> { Json(json!({ "message": "Hello world!" })) }

#[cfg(test)]
mod tests;
