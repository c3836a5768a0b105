//! The identity-provider boundary.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// An identity asserted by the single-sign-on provider after a successful
/// ticket exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  /// Stable numeric identifier; becomes [`crate::user::User::npm`].
  pub npm:      i64,
  pub username: String,
  pub name:     String,
  /// Organisational unit code as reported by the provider.
  pub org_code: Option<String>,
  /// Faculty resolved from `org_code`, when known.
  pub faculty:  Option<String>,
}

/// Validates opaque login tickets against an external provider.
///
/// Implementations may fail for any reason; callers map every failure to a
/// generic authentication error and never forward the details.
pub trait IdentityVerifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Where to send a browser to begin logging in.
  fn login_url(&self) -> String;

  /// Where to send a browser to end its provider session, optionally
  /// bouncing back to `redirect`.
  fn logout_url(&self, redirect: Option<&str>) -> String;

  /// Exchange `ticket` for a verified identity.
  fn verify<'a>(
    &'a self,
    ticket: &'a str,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + 'a;
}
