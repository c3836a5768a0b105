//! Binds single-sign-on identities to local users and session tokens.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use tutorhub_core::{
  Error, Result,
  identity::IdentityVerifier,
  store::CourseRepository,
  user::{Principal, User},
};

use crate::session::SessionKeys;

const LOGIN_FAILED: &str = "Authentication failure. Please try again.";
const SESSION_INVALID: &str = "Your session is invalid or has expired.";

pub struct Binder<R, V> {
  repo:            Arc<R>,
  verifier:        Arc<V>,
  keys:            SessionKeys,
  allowed_faculty: Option<String>,
  app_root:        String,
}

impl<R, V> Binder<R, V>
where
  R: CourseRepository,
  V: IdentityVerifier,
{
  pub fn new(repo: Arc<R>, verifier: Arc<V>, keys: SessionKeys) -> Self {
    Self {
      repo,
      verifier,
      keys,
      allowed_faculty: None,
      app_root: "/".to_owned(),
    }
  }

  /// Only admit identities whose faculty is `faculty`. Identities with no
  /// known faculty are admitted.
  pub fn with_allowed_faculty(mut self, faculty: Option<String>) -> Self {
    self.allowed_faculty = faculty;
    self
  }

  /// Where browsers land after logging in.
  pub fn with_app_root(mut self, app_root: impl Into<String>) -> Self {
    self.app_root = app_root.into();
    self
  }

  pub fn app_root(&self) -> &str { &self.app_root }

  pub fn session_ttl(&self) -> Duration { self.keys.ttl() }

  pub fn login_url(&self) -> String { self.verifier.login_url() }

  pub fn logout_url(&self) -> String {
    self.verifier.logout_url(Some(&self.app_root))
  }

  /// Exchange a provider ticket for a local user and a fresh session token.
  pub async fn complete_login(&self, ticket: &str) -> Result<(User, String)> {
    let identity = self.verifier.verify(ticket).await.map_err(|e| {
      warn!("ticket verification failed: {e}");
      Error::Authentication(LOGIN_FAILED.into())
    })?;

    if let (Some(allowed), Some(faculty)) =
      (&self.allowed_faculty, &identity.faculty)
      && faculty != allowed
    {
      info!(npm = identity.npm, %faculty, "login refused for faculty");
      return Err(Error::Authorization(format!(
        "This service is only available to members of {allowed}."
      )));
    }

    let user = self
      .repo
      .upsert_user(&identity)
      .await
      .map_err(Error::repository)?;
    let token = self
      .keys
      .mint(user.npm, &user.username)
      .map_err(Error::repository)?;

    info!(npm = user.npm, username = %user.username, "user logged in");
    Ok((user, token))
  }

  /// Resolve a session token to the live user it names.
  pub async fn resolve(&self, token: Option<&str>) -> Result<Principal> {
    let token = token
      .ok_or_else(|| Error::Authentication("You are not logged in.".into()))?;

    let claims = self.keys.verify(token).map_err(|e| {
      debug!("rejected session token: {e}");
      Error::Authentication(SESSION_INVALID.into())
    })?;

    let principal = self
      .repo
      .get_principal(claims.npm)
      .await
      .map_err(Error::repository)?
      .ok_or_else(|| Error::Authentication(SESSION_INVALID.into()))?;

    if principal.user.username != claims.username {
      return Err(Error::Authentication(SESSION_INVALID.into()));
    }
    Ok(principal)
  }
}
