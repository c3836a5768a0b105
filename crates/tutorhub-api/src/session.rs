//! Signed session tokens.
//!
//! A token is an HS256 JWT whose claims name the user and carry an `exp`.
//! Tokens travel in the [`SESSION_COOKIE`] cookie.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SESSION_COOKIE: &str = "access-token";

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// What a session token asserts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub npm:      i64,
  pub username: String,
  /// Expiry as a Unix timestamp in seconds.
  pub exp:      i64,
}

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("signing secret must be at least {MIN_SECRET_LEN} bytes")]
  WeakSecret,

  #[error("malformed session token")]
  Malformed,

  #[error("session token signature mismatch")]
  BadSignature,

  #[error("session token expired")]
  Expired,

  #[error("failed to sign session token: {0}")]
  Sign(#[source] jsonwebtoken::errors::Error),
}

/// Mints and verifies session tokens with one secret.
#[derive(Clone)]
pub struct SessionKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl SessionKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, SessionError> {
    if secret.len() < MIN_SECRET_LEN {
      return Err(SessionError::WeakSecret);
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    Ok(Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    })
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  pub fn mint(&self, npm: i64, username: &str) -> Result<String, SessionError> {
    self.mint_at(npm, username, Utc::now())
  }

  /// Mint a token as if issued at `issued`.
  pub fn mint_at(
    &self,
    npm: i64,
    username: &str,
    issued: DateTime<Utc>,
  ) -> Result<String, SessionError> {
    let claims = Claims {
      npm,
      username: username.to_owned(),
      exp: (issued + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(SessionError::Sign)
  }

  pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => SessionError::Expired,
        ErrorKind::InvalidSignature => SessionError::BadSignature,
        _ => SessionError::Malformed,
      })
  }
}
