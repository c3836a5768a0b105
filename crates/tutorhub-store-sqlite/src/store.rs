//! [`SqliteStore`]: the SQLite implementation of [`CourseRepository`].

use std::{collections::HashSet, path::Path};

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use tutorhub_core::{
  course::{Course, CourseFields},
  identity::Identity,
  store::{CourseFilter, CourseRepository, EnrollOutcome, Page, UpcomingQuota},
  user::{Principal, User},
};

use crate::{
  Error, Result,
  encode::{RawCourse, RawUser, decode_uuid, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// Course columns followed by the teacher's user columns and the enrollment
/// count, in the order [`RawCourse::from_row`] expects.
pub(crate) const COURSE_SELECT: &str = "
SELECT c.id, c.name, c.matkul, c.datetime, c.link, c.students_limit,
       c.notes, c.notes_short, c.hidden,
       u.npm, u.username, u.name, u.is_admin,
       (SELECT COUNT(*) FROM course_students cs WHERE cs.course_id = c.id)
FROM courses c
JOIN users u ON u.npm = c.teacher";

/// Shared by listing and counting; parameters `?1` to `?5` are the filter
/// fields in declaration order.
const FILTER_WHERE: &str = "
WHERE (?1 IS NULL OR c.datetime >= ?1)
  AND (?2 IS NULL OR c.datetime > ?2)
  AND (?3 = 0 OR c.hidden = 0)
  AND (?4 IS NULL OR c.teacher = ?4)
  AND (?5 IS NULL OR EXISTS (
        SELECT 1 FROM course_students m
        WHERE m.course_id = c.id AND m.student = ?5))";

/// Owned SQL parameters for a [`CourseFilter`], movable into a connection
/// closure.
struct FilterParams {
  starting_from:  Option<String>,
  starting_after: Option<String>,
  visible_only:   bool,
  teacher:        Option<i64>,
  student:        Option<i64>,
}

impl From<&CourseFilter> for FilterParams {
  fn from(f: &CourseFilter) -> Self {
    Self {
      starting_from:  f.starting_from.map(encode_dt),
      starting_after: f.starting_after.map(encode_dt),
      visible_only:   f.visible_only,
      teacher:        f.teacher,
      student:        f.student,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tutorhub repository backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Grant or revoke admin rights. Returns `false` if no such user exists.
  ///
  /// Admin status is only ever changed out of band; logins never touch it.
  pub async fn set_admin(&self, npm: i64, is_admin: bool) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET is_admin = ?2 WHERE npm = ?1",
          rusqlite::params![npm, is_admin],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}

fn query_course(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawCourse>> {
  conn
    .query_row(
      &format!("{COURSE_SELECT} WHERE c.id = ?1"),
      rusqlite::params![id],
      RawCourse::from_row,
    )
    .optional()
}

fn insert_row(
  conn: &rusqlite::Connection,
  id: &str,
  teacher_npm: i64,
  fields: &CourseFields,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO courses (
       id, name, matkul, datetime, link, students_limit,
       notes, notes_short, hidden, teacher
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    rusqlite::params![
      id,
      fields.name,
      fields.subject.code(),
      encode_dt(fields.scheduled_at),
      fields.meeting_link,
      fields.capacity,
      fields.notes,
      fields.notes_short,
      fields.hidden,
      teacher_npm,
    ],
  )?;
  Ok(())
}

// ─── CourseRepository impl ───────────────────────────────────────────────────

impl CourseRepository for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, identity: &Identity) -> Result<User> {
    let npm = identity.npm;
    let username = identity.username.to_lowercase();
    let name = identity.name.clone();

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (npm, username, name) VALUES (?1, ?2, ?3)
           ON CONFLICT(npm) DO UPDATE SET
             username = excluded.username,
             name     = excluded.name",
          rusqlite::params![npm, username, name],
        )?;
        Ok(conn.query_row(
          "SELECT npm, username, name, is_admin FROM users WHERE npm = ?1",
          rusqlite::params![npm],
          |row| RawUser::from_row(row, 0),
        )?)
      })
      .await?;

    Ok(raw.into_user())
  }

  async fn get_principal(&self, npm: i64) -> Result<Option<Principal>> {
    let loaded: Option<(RawUser, Vec<String>, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let Some(user) = conn
          .query_row(
            "SELECT npm, username, name, is_admin FROM users WHERE npm = ?1",
            rusqlite::params![npm],
            |row| RawUser::from_row(row, 0),
          )
          .optional()?
        else {
          return Ok(None);
        };

        let taught = conn
          .prepare("SELECT id FROM courses WHERE teacher = ?1")?
          .query_map(rusqlite::params![npm], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        let enrolled = conn
          .prepare("SELECT course_id FROM course_students WHERE student = ?1")?
          .query_map(rusqlite::params![npm], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(Some((user, taught, enrolled)))
      })
      .await?;

    let Some((user, taught, enrolled)) = loaded else {
      return Ok(None);
    };

    let decode_all = |ids: Vec<String>| -> Result<HashSet<Uuid>> {
      ids.iter().map(String::as_str).map(decode_uuid).collect()
    };

    Ok(Some(Principal {
      user:     user.into_user(),
      taught:   decode_all(taught)?,
      enrolled: decode_all(enrolled)?,
    }))
  }

  // ── Courses ───────────────────────────────────────────────────────────────

  async fn insert_course(
    &self,
    teacher_npm: i64,
    fields: CourseFields,
  ) -> Result<Course> {
    let id = Uuid::new_v4();
    let id_str = encode_uuid(id);

    let raw: RawCourse = self
      .conn
      .call(move |conn| {
        insert_row(conn, &id_str, teacher_npm, &fields)?;
        query_course(conn, &id_str)?
          .ok_or(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::QueryReturnedNoRows))
      })
      .await?;

    debug!(course = %id, "inserted course row");
    raw.into_course()
  }

  async fn insert_course_within(
    &self,
    teacher_npm: i64,
    fields: CourseFields,
    quota: UpcomingQuota,
  ) -> Result<Option<Course>> {
    let id = Uuid::new_v4();
    let id_str = encode_uuid(id);
    let after = encode_dt(quota.after);
    let limit = i64::try_from(quota.limit).unwrap_or(i64::MAX);

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let upcoming: i64 = tx.query_row(
          "SELECT COUNT(*) FROM courses WHERE teacher = ?1 AND datetime > ?2",
          rusqlite::params![teacher_npm, after],
          |row| row.get(0),
        )?;
        if upcoming >= limit {
          return Ok(None);
        }

        insert_row(&tx, &id_str, teacher_npm, &fields)?;
        let raw = query_course(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    if raw.is_some() {
      debug!(course = %id, "inserted course row within quota");
    }
    raw.map(RawCourse::into_course).transpose()
  }

  async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| Ok(query_course(conn, &id_str)?))
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn find_courses(
    &self,
    filter: &CourseFilter,
    page: Page,
  ) -> Result<Vec<Course>> {
    let p = FilterParams::from(filter);
    let limit = i64::from(page.size);
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);

    let raws: Vec<RawCourse> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{COURSE_SELECT} {FILTER_WHERE}
           ORDER BY c.datetime DESC, c.id
           LIMIT ?6 OFFSET ?7"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              p.starting_from,
              p.starting_after,
              p.visible_only,
              p.teacher,
              p.student,
              limit,
              offset,
            ],
            RawCourse::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCourse::into_course).collect()
  }

  async fn count_courses(&self, filter: &CourseFilter) -> Result<u64> {
    let p = FilterParams::from(filter);

    let count: i64 = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT COUNT(*) FROM courses c {FILTER_WHERE}");
        Ok(conn.query_row(
          &sql,
          rusqlite::params![
            p.starting_from,
            p.starting_after,
            p.visible_only,
            p.teacher,
            p.student,
          ],
          |row| row.get(0),
        )?)
      })
      .await?;

    u64::try_from(count).map_err(|_| Error::Decode(format!("course count {count}")))
  }

  async fn update_course(
    &self,
    id: Uuid,
    fields: CourseFields,
  ) -> Result<Option<Course>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCourse> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE courses SET
             name = ?2, matkul = ?3, datetime = ?4, link = ?5,
             students_limit = ?6, notes = ?7, notes_short = ?8, hidden = ?9
           WHERE id = ?1",
          rusqlite::params![
            id_str,
            fields.name,
            fields.subject.code(),
            encode_dt(fields.scheduled_at),
            fields.meeting_link,
            fields.capacity,
            fields.notes,
            fields.notes_short,
            fields.hidden,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(query_course(conn, &id_str)?)
      })
      .await?;

    raw.map(RawCourse::into_course).transpose()
  }

  async fn delete_course(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM course_students WHERE course_id = ?1",
          rusqlite::params![id_str],
        )?;
        let removed =
          tx.execute("DELETE FROM courses WHERE id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(removed > 0)
      })
      .await?;

    Ok(removed)
  }

  // ── Enrollment ────────────────────────────────────────────────────────────

  async fn list_students(&self, course_id: Uuid) -> Result<Vec<User>> {
    let id_str = encode_uuid(course_id);

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT u.npm, u.username, u.name, u.is_admin
           FROM course_students cs
           JOIN users u ON u.npm = cs.student
           WHERE cs.course_id = ?1
           ORDER BY cs.rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| RawUser::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawUser::into_user).collect())
  }

  async fn enroll(&self, course_id: Uuid, npm: i64) -> Result<EnrollOutcome> {
    let id_str = encode_uuid(course_id);

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the count below cannot
        // be invalidated by another writer before the insert.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some((teacher, limit)) = tx
          .query_row(
            "SELECT teacher, students_limit FROM courses WHERE id = ?1",
            rusqlite::params![id_str],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)),
          )
          .optional()?
        else {
          return Ok(EnrollOutcome::CourseMissing);
        };

        if teacher == npm {
          return Ok(EnrollOutcome::OwnCourse);
        }

        let already: bool = tx.query_row(
          "SELECT EXISTS (
             SELECT 1 FROM course_students WHERE course_id = ?1 AND student = ?2)",
          rusqlite::params![id_str, npm],
          |row| row.get(0),
        )?;
        if already {
          return Ok(EnrollOutcome::AlreadyEnrolled);
        }

        if let Some(limit) = limit.filter(|l| *l > 0) {
          let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM course_students WHERE course_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )?;
          if count >= limit {
            return Ok(EnrollOutcome::Full);
          }
        }

        tx.execute(
          "INSERT INTO course_students (course_id, student) VALUES (?1, ?2)",
          rusqlite::params![id_str, npm],
        )?;
        tx.commit()?;
        Ok(EnrollOutcome::Enrolled)
      })
      .await?;

    Ok(outcome)
  }

  async fn unenroll(&self, course_id: Uuid, npm: i64) -> Result<bool> {
    let id_str = encode_uuid(course_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM course_students WHERE course_id = ?1 AND student = ?2",
          rusqlite::params![id_str, npm],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }
}
