//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that string
//! comparison in SQL matches chronological order. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use tutorhub_core::{
  course::{Course, normalize_capacity},
  subject::Subject,
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Subject ─────────────────────────────────────────────────────────────────

pub fn decode_subject(s: &str) -> Result<Subject> {
  Subject::from_code(s)
    .ok_or_else(|| Error::Decode(format!("unknown subject code: {s:?}")))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `users` row as read from SQLite.
pub struct RawUser {
  pub npm:      i64,
  pub username: String,
  pub name:     String,
  pub is_admin: bool,
}

impl RawUser {
  /// Read the four user columns starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      npm:      row.get(offset)?,
      username: row.get(offset + 1)?,
      name:     row.get(offset + 2)?,
      is_admin: row.get(offset + 3)?,
    })
  }

  pub fn into_user(self) -> User {
    User {
      npm:      self.npm,
      username: self.username,
      name:     self.name,
      is_admin: self.is_admin,
    }
  }
}

/// A `courses` row joined with its teacher and student count.
pub struct RawCourse {
  pub id:             String,
  pub name:           String,
  pub matkul:         String,
  pub datetime:       String,
  pub link:           Option<String>,
  pub students_limit: Option<i64>,
  pub notes:          Option<String>,
  pub notes_short:    Option<String>,
  pub hidden:         bool,
  pub teacher:        RawUser,
  pub students_count: i64,
}

impl RawCourse {
  /// Map a row produced by [`crate::store::COURSE_SELECT`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      matkul:         row.get(2)?,
      datetime:       row.get(3)?,
      link:           row.get(4)?,
      students_limit: row.get(5)?,
      notes:          row.get(6)?,
      notes_short:    row.get(7)?,
      hidden:         row.get(8)?,
      teacher:        RawUser::from_row(row, 9)?,
      students_count: row.get(13)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    let students_count = u32::try_from(self.students_count)
      .map_err(|_| Error::Decode(format!("student count {}", self.students_count)))?;

    Ok(Course {
      id: decode_uuid(&self.id)?,
      name: self.name,
      subject: decode_subject(&self.matkul)?,
      scheduled_at: decode_dt(&self.datetime)?,
      meeting_link: self.link,
      capacity: normalize_capacity(self.students_limit),
      notes: self.notes,
      notes_short: self.notes_short,
      hidden: self.hidden,
      teacher: self.teacher.into_user(),
      students_count,
    })
  }
}
