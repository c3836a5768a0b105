//! Session extractor and the `/auth` and `/me` handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/auth/login` | Redirects to the identity provider |
//! | `GET`  | `/auth/callback?ticket=` | Sets the session cookie, redirects to the app |
//! | `GET`  | `/auth/logout` | Clears the session cookie |
//! | `GET`  | `/me` | The caller's user record |

use axum::{
  Json,
  extract::{FromRequestParts, Query, State},
  http::request::Parts,
  response::Redirect,
};
use axum_extra::extract::{
  WithRejection,
  cookie::{Cookie, CookieJar, SameSite},
};
use serde::{Deserialize, Serialize};
use tutorhub_core::{
  cache::DetailCache,
  identity::IdentityVerifier,
  store::CourseRepository,
  user::{Principal, User},
};

use crate::{AppState, error::ApiError, session::SESSION_COOKIE};

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when the session cookie is
/// absent, invalid, expired, or names a user that no longer exists.
pub struct CurrentUser(pub Principal);

impl<R, C, V> FromRequestParts<AppState<R, C, V>> for CurrentUser
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<R, C, V>,
  ) -> Result<Self, Self::Rejection> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE).map(|c| c.value().to_owned());
    let principal = state.binder.resolve(token.as_deref()).await?;
    Ok(CurrentUser(principal))
  }
}

/// The cookie expires together with the token it carries.
fn session_cookie(token: String, ttl: chrono::Duration) -> Cookie<'static> {
  let mut cookie = Cookie::build((SESSION_COOKIE, token))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax);
  if let Some(max_age) = ttl.to_std().ok().and_then(|d| d.try_into().ok()) {
    cookie = cookie.max_age(max_age);
  }
  cookie.build()
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// `GET /auth/login`
pub async fn login<R, C, V>(State(state): State<AppState<R, C, V>>) -> Redirect
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  Redirect::to(&state.binder.login_url())
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
  pub ticket: String,
}

/// `GET /auth/callback?ticket=<ticket>`
pub async fn callback<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  WithRejection(Query(params), _): WithRejection<Query<CallbackParams>, ApiError>,
  jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError>
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  let (_, token) = state.binder.complete_login(&params.ticket).await?;
  let jar = jar.add(session_cookie(token, state.binder.session_ttl()));
  Ok((jar, Redirect::to(state.binder.app_root())))
}

// ─── Logout ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggedOut {
  pub message:        String,
  /// Visit this to also end the identity provider's session.
  pub sso_logout_url: String,
}

/// `GET /auth/logout`
pub async fn logout<R, C, V>(
  State(state): State<AppState<R, C, V>>,
  CurrentUser(_): CurrentUser,
  jar: CookieJar,
) -> (CookieJar, Json<LoggedOut>)
where
  R: CourseRepository + 'static,
  C: DetailCache + 'static,
  V: IdentityVerifier + 'static,
{
  let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
  let body = LoggedOut {
    message:        "Logged out.".into(),
    sso_logout_url: state.binder.logout_url(),
  };
  (jar, Json(body))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn me(CurrentUser(caller): CurrentUser) -> Json<User> {
  Json(caller.user)
}
