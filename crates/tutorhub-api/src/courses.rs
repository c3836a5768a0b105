//! Handlers for `/course` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/course/list` | `?page=N`, all courses |
//! | `GET`    | `/course/available` | `?page=N`, upcoming and visible |
//! | `GET`    | `/course/mine` | `?page=N`, taught by the caller |
//! | `GET`    | `/course/enrolled` | `?page=N`, attended by the caller |
//! | `POST`   | `/course/create` | Body: [`CourseInput`] |
//! | `GET`    | `/course/{id}/detail` | Members and admins only |
//! | `POST`   | `/course/{id}/update` | Teacher or admin; body: [`CourseInput`] |
//! | `POST`   | `/course/{id}/enroll` | |
//! | `POST`   | `/course/{id}/unenroll` | |
//! | `DELETE` | `/course/{id}/delete` | Teacher or admin |
//!
//! Malformed ids, query strings and bodies are `400 validation` errors.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use tutorhub_core::{
  cache::DetailCache,
  course::CourseInput,
  identity::IdentityVerifier,
  store::CourseRepository,
  view::{CourseDetail, CourseView},
};
use uuid::Uuid;

use crate::{AppState, auth::CurrentUser, error::ApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
  pub message: String,
}

impl Message {
  fn new(message: &str) -> Json<Self> {
    Json(Self { message: message.to_owned() })
  }
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PageParams {
  pub page: Option<u32>,
}

impl PageParams {
  fn number(&self) -> u32 { self.page.unwrap_or(1) }
}

/// `GET /course/list[?page=N]`
pub async fn list<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Query(params), _): WithRejection<Query<PageParams>, ApiError>,
) -> Result<Json<Vec<CourseView>>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Ok(Json(state.engine.list(&caller, params.number()).await?))
}

/// `GET /course/available[?page=N]`
pub async fn available<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Query(params), _): WithRejection<Query<PageParams>, ApiError>,
) -> Result<Json<Vec<CourseView>>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Ok(Json(state.engine.available(&caller, params.number()).await?))
}

/// `GET /course/mine[?page=N]`
pub async fn mine<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Query(params), _): WithRejection<Query<PageParams>, ApiError>,
) -> Result<Json<Vec<CourseView>>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Ok(Json(state.engine.mine(&caller, params.number()).await?))
}

/// `GET /course/enrolled[?page=N]`
pub async fn enrolled<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Query(params), _): WithRejection<Query<PageParams>, ApiError>,
) -> Result<Json<Vec<CourseView>>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Ok(Json(state.engine.enrolled(&caller, params.number()).await?))
}

// ─── Create / update / delete ────────────────────────────────────────────────

/// `POST /course/create`
pub async fn create<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Json(input), _): WithRejection<Json<CourseInput>, ApiError>,
) -> Result<impl IntoResponse, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  let view = state.engine.create(&caller, input).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /course/{id}/detail`
pub async fn detail<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<CourseDetail>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Ok(Json(state.engine.detail(id, &caller).await?))
}

/// `POST /course/{id}/update`
pub async fn update<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
  WithRejection(Json(input), _): WithRejection<Json<CourseInput>, ApiError>,
) -> Result<Json<CourseView>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Ok(Json(state.engine.update(id, &caller, input).await?))
}

/// `DELETE /course/{id}/delete`
pub async fn delete<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Message>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  state.engine.delete(id, &caller).await?;
  Ok(Message::new("Course deleted."))
}

// ─── Membership ──────────────────────────────────────────────────────────────

/// `POST /course/{id}/enroll`
pub async fn enroll<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Message>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  state.engine.enroll(id, &caller).await?;
  Ok(Message::new("Successfully enrolled!"))
}

/// `POST /course/{id}/unenroll`
pub async fn unenroll<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(caller): CurrentUser,
  WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Message>, ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  state.engine.unenroll(id, &caller).await?;
  Ok(Message::new("Unenrolled from course."))
}
