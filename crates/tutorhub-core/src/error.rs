//! Error types for `tutorhub-core`.
//!
//! Every failure a caller can observe falls into one of a handful of stable
//! categories; see [`Error::category`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Bad input shape or range: time window, link shape, unknown subject.
  #[error("{0}")]
  Validation(String),

  /// Missing, malformed, or expired session, or an identity-provider
  /// rejection.
  #[error("{0}")]
  Authentication(String),

  /// The caller is known but not permitted to do this.
  #[error("{0}")]
  Authorization(String),

  #[error("{0}")]
  NotFound(String),

  /// The request clashes with current state: capacity, quota, membership,
  /// ownership, or schedule rules.
  #[error("{0}")]
  Conflict(String),

  #[error("repository error: {0}")]
  Repository(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error.
  pub fn repository<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Repository(Box::new(err))
  }

  /// Stable machine-readable category, surfaced to API clients.
  pub fn category(&self) -> &'static str {
    match self {
      Self::Validation(_) => "validation",
      Self::Authentication(_) => "authentication",
      Self::Authorization(_) => "authorization",
      Self::NotFound(_) => "not_found",
      Self::Conflict(_) => "conflict",
      Self::Repository(_) | Self::Serialization(_) => "internal",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
