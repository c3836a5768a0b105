//! The `CourseRepository` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `tutorhub-store-sqlite`). The engine and the HTTP layer depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  course::{Course, CourseFields},
  identity::Identity,
  user::{Principal, User},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filter for [`CourseRepository::find_courses`] and
/// [`CourseRepository::count_courses`]. Unset fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
  /// `scheduled_at >= t`
  pub starting_from:  Option<DateTime<Utc>>,
  /// `scheduled_at > t`
  pub starting_after: Option<DateTime<Utc>>,
  /// Exclude hidden courses.
  pub visible_only:   bool,
  pub teacher:        Option<i64>,
  pub student:        Option<i64>,
}

/// A 1-based page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub number: u32,
  pub size:   u32,
}

impl Page {
  /// Page numbers below 1 are treated as the first page.
  pub fn new(number: u32, size: u32) -> Self {
    Self { number: number.max(1), size }
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.number - 1) * u64::from(self.size)
  }
}

/// Result of the atomic check-and-insert performed by
/// [`CourseRepository::enroll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
  Enrolled,
  CourseMissing,
  OwnCourse,
  AlreadyEnrolled,
  Full,
}

/// A cap on how many courses one teacher may have starting after `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingQuota {
  pub after: DateTime<Utc>,
  pub limit: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable store for users, courses, and the enrollment relation.
///
/// Listings are always ordered by `scheduled_at`, newest first.
pub trait CourseRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create the user for `identity` if absent, otherwise refresh its
  /// username and display name. `is_admin` is never touched.
  fn upsert_user<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + 'a;

  /// Load a user together with the courses they teach and attend.
  fn get_principal(
    &self,
    npm: i64,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  // ── Courses ───────────────────────────────────────────────────────────

  /// Persist a new course owned by `teacher_npm` under a fresh id.
  fn insert_course(
    &self,
    teacher_npm: i64,
    fields: CourseFields,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  /// Like [`insert_course`](Self::insert_course), but only if the teacher
  /// holds fewer than `quota.limit` courses starting after `quota.after`.
  /// The count and the insert are one atomic step. `None` means the quota
  /// was already reached and nothing was written.
  fn insert_course_within(
    &self,
    teacher_npm: i64,
    fields: CourseFields,
    quota: UpcomingQuota,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn get_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  fn find_courses<'a>(
    &'a self,
    filter: &'a CourseFilter,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + 'a;

  fn count_courses<'a>(
    &'a self,
    filter: &'a CourseFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Overwrite every mutable field. Returns `None` if the course is gone.
  fn update_course(
    &self,
    id: Uuid,
    fields: CourseFields,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Remove a course and its memberships. Returns `false` if it was absent.
  fn delete_course(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Enrollment ────────────────────────────────────────────────────────

  fn list_students(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Add `npm` to the course's students.
  ///
  /// The ownership, duplicate, and capacity checks and the insert must form
  /// one atomic step per course: concurrent calls never push the student
  /// count past the capacity.
  fn enroll(
    &self,
    course_id: Uuid,
    npm: i64,
  ) -> impl Future<Output = Result<EnrollOutcome, Self::Error>> + Send + '_;

  /// Remove `npm` from the course's students. Returns `false` if they were
  /// not enrolled.
  fn unenroll(
    &self,
    course_id: Uuid,
    npm: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
