//! Courses: the persisted record, the validated field set, and the raw
//! payload submitted by clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result, link::is_meeting_link, schedule::parse_local,
  subject::Subject, user::User,
};

pub const MAX_NAME_LEN: usize = 100;

// ─── Course ──────────────────────────────────────────────────────────────────

/// A scheduled teaching session as loaded from the repository, with its
/// teacher resolved and its enrollment counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
  pub id:             Uuid,
  pub name:           String,
  pub subject:        Subject,
  pub scheduled_at:   DateTime<Utc>,
  pub meeting_link:   Option<String>,
  /// `None` means unlimited.
  pub capacity:       Option<u32>,
  pub notes:          Option<String>,
  pub notes_short:    Option<String>,
  pub hidden:         bool,
  pub teacher:        User,
  pub students_count: u32,
}

impl Course {
  pub fn is_taught_by(&self, npm: i64) -> bool { self.teacher.npm == npm }

  pub fn is_full(&self) -> bool {
    self.capacity.is_some_and(|cap| self.students_count >= cap)
  }
}

// ─── CourseFields ────────────────────────────────────────────────────────────

/// The mutable fields of a course after validation and normalisation.
///
/// Produced by [`CourseInput::into_fields`]; the time-window rules are
/// applied separately by the engine because they depend on `now` and, for
/// updates, on the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseFields {
  pub name:         String,
  pub subject:      Subject,
  pub scheduled_at: DateTime<Utc>,
  pub meeting_link: Option<String>,
  pub capacity:     Option<u32>,
  pub notes:        Option<String>,
  pub notes_short:  Option<String>,
  pub hidden:       bool,
}

// ─── CourseInput ─────────────────────────────────────────────────────────────

/// The body accepted by both create and update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseInput {
  pub name:         String,
  #[serde(alias = "matkul")]
  pub subject:      String,
  /// Local wall-clock time; any offset is ignored.
  #[serde(alias = "datetime")]
  pub scheduled_at: String,
  #[serde(default, alias = "students_limit")]
  pub capacity:     Option<i64>,
  #[serde(default)]
  pub notes:        Option<String>,
  #[serde(default, alias = "meeting_link")]
  pub link:         Option<String>,
  #[serde(default)]
  pub notes_short:  Option<String>,
  #[serde(default)]
  pub hidden:       bool,
}

impl CourseInput {
  /// Validate shapes and normalise optional fields.
  pub fn into_fields(self) -> Result<CourseFields> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::Validation("Course name cannot be empty.".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
      return Err(Error::Validation(format!(
        "Course name must be at most {MAX_NAME_LEN} characters."
      )));
    }

    let subject = self.subject.parse::<Subject>()?;
    let scheduled_at = parse_local(&self.scheduled_at)?;

    let meeting_link = non_empty(self.link);
    if let Some(link) = &meeting_link
      && !is_meeting_link(link)
    {
      return Err(Error::Validation("Invalid Meet/Zoom URL.".into()));
    }

    Ok(CourseFields {
      name,
      subject,
      scheduled_at,
      meeting_link,
      capacity: normalize_capacity(self.capacity),
      notes: non_empty(self.notes),
      notes_short: non_empty(self.notes_short),
      hidden: self.hidden,
    })
  }
}

/// Absent or non-positive capacities mean "unlimited".
pub fn normalize_capacity(capacity: Option<i64>) -> Option<u32> {
  match capacity {
    Some(n) if n > 0 => Some(u32::try_from(n).unwrap_or(u32::MAX)),
    _ => None,
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
}
