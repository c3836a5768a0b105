//! The closed set of subjects a course can be about.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
  Ddp,
  MatDis,
  Kalkulus,
  Psd,
  ManBis,
  Kombistek,
  Other,
}

/// `(variant, stored code, display label)`.
const TABLE: [(Subject, &str, &str); 7] = [
  (Subject::Ddp, "ddp", "DDP"),
  (Subject::MatDis, "matdis", "MatDis"),
  (Subject::Kalkulus, "kalkulus", "Kalkulus"),
  (Subject::Psd, "psd", "PSD"),
  (Subject::ManBis, "manbis", "ManBis"),
  (Subject::Kombistek, "kombistek", "Kombistek"),
  (Subject::Other, "other", "Other"),
];

impl Subject {
  pub const ALL: [Subject; 7] = [
    Subject::Ddp,
    Subject::MatDis,
    Subject::Kalkulus,
    Subject::Psd,
    Subject::ManBis,
    Subject::Kombistek,
    Subject::Other,
  ];

  fn row(self) -> (Subject, &'static str, &'static str) {
    // TABLE lists every variant exactly once.
    TABLE[self as usize]
  }

  /// The code stored in the `matkul` column and accepted on input.
  pub fn code(self) -> &'static str { self.row().1 }

  /// The human-readable label used in projections.
  pub fn label(self) -> &'static str { self.row().2 }

  pub fn from_code(code: &str) -> Option<Self> {
    TABLE
      .iter()
      .find(|(_, c, _)| *c == code)
      .map(|(subject, _, _)| *subject)
  }
}

impl FromStr for Subject {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_code(s.trim())
      .ok_or_else(|| Error::Validation(format!("Unknown subject code {s:?}.")))
  }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}
