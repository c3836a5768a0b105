//! The course lifecycle engine.
//!
//! [`CourseEngine`] owns every rule about who may do what to a course and
//! when. It talks to storage through [`CourseRepository`] and to the detail
//! cache through [`DetailCache`]; neither is consulted for policy.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  cache::{DetailCache, detail_key},
  course::{Course, CourseInput},
  notify::{Notifier, Silent},
  schedule::check_window,
  store::{CourseFilter, CourseRepository, EnrollOutcome, Page, UpcomingQuota},
  user::Principal,
  view::{CourseDetail, CourseView},
};

/// Courses per listing page.
pub const PAGE_SIZE: u32 = 10;

/// How many courses a teacher may have scheduled in the future at once.
pub const UPCOMING_QUOTA: u64 = 2;

const NOT_FOUND: &str = "Course not found!";
const NOT_ALLOWED: &str = "You are not allowed to do this.";

pub struct CourseEngine<R, C> {
  repo:     Arc<R>,
  cache:    Arc<C>,
  notifier: Arc<dyn Notifier>,
}

impl<R, C> CourseEngine<R, C>
where
  R: CourseRepository,
  C: DetailCache,
{
  pub fn new(repo: Arc<R>, cache: Arc<C>) -> Self {
    Self { repo, cache, notifier: Arc::new(Silent) }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn repository(&self) -> &Arc<R> { &self.repo }

  // ─── Listings ────────────────────────────────────────────────────────────

  /// Every course.
  pub async fn list(
    &self,
    caller: &Principal,
    page: u32,
  ) -> Result<Vec<CourseView>> {
    self.listing(CourseFilter::default(), caller, page).await
  }

  /// Courses that have not started yet. Hidden courses are only shown to
  /// admins.
  pub async fn available(
    &self,
    caller: &Principal,
    page: u32,
  ) -> Result<Vec<CourseView>> {
    let filter = CourseFilter {
      starting_from: Some(Utc::now()),
      visible_only: !caller.is_admin(),
      ..CourseFilter::default()
    };
    self.listing(filter, caller, page).await
  }

  /// Courses the caller teaches.
  pub async fn mine(
    &self,
    caller: &Principal,
    page: u32,
  ) -> Result<Vec<CourseView>> {
    let filter =
      CourseFilter { teacher: Some(caller.npm()), ..CourseFilter::default() };
    self.listing(filter, caller, page).await
  }

  /// Courses the caller is enrolled in.
  pub async fn enrolled(
    &self,
    caller: &Principal,
    page: u32,
  ) -> Result<Vec<CourseView>> {
    let filter =
      CourseFilter { student: Some(caller.npm()), ..CourseFilter::default() };
    self.listing(filter, caller, page).await
  }

  async fn listing(
    &self,
    filter: CourseFilter,
    caller: &Principal,
    page: u32,
  ) -> Result<Vec<CourseView>> {
    let courses = self
      .repo
      .find_courses(&filter, Page::new(page, PAGE_SIZE))
      .await
      .map_err(Error::repository)?;

    Ok(
      courses
        .iter()
        .map(|course| CourseView::project(course, caller))
        .collect(),
    )
  }

  // ─── Mutations ───────────────────────────────────────────────────────────

  pub async fn create(
    &self,
    caller: &Principal,
    input: CourseInput,
  ) -> Result<CourseView> {
    let fields = input.into_fields()?;
    let now = Utc::now();
    check_window(fields.scheduled_at, now)?;

    // Counting and inserting happen in one repository step, so concurrent
    // creates by the same teacher cannot overshoot the quota.
    let quota = UpcomingQuota { after: now, limit: UPCOMING_QUOTA };
    let course = self
      .repo
      .insert_course_within(caller.npm(), fields, quota)
      .await
      .map_err(Error::repository)?
      .ok_or_else(|| {
        Error::Conflict(format!(
          "You can only have at most {UPCOMING_QUOTA} upcoming classes."
        ))
      })?;
    info!(course = %course.id, teacher = caller.npm(), "course created");

    self.notifier.course_created(&course);
    Ok(CourseView::project(&course, caller))
  }

  /// Replace every mutable field of a course. Only its teacher or an admin
  /// may do this, and the start time may only move later.
  pub async fn update(
    &self,
    id: Uuid,
    caller: &Principal,
    input: CourseInput,
  ) -> Result<CourseView> {
    let current = self.fetch(id).await?;
    authorize_owner(&current, caller)?;

    let fields = input.into_fields()?;
    if fields.scheduled_at != current.scheduled_at {
      if fields.scheduled_at < current.scheduled_at {
        return Err(Error::Conflict("You cannot reopen a class.".into()));
      }
      check_window(fields.scheduled_at, Utc::now())?;
    }

    let updated = self
      .repo
      .update_course(id, fields)
      .await
      .map_err(Error::repository)?
      .ok_or_else(|| Error::NotFound(NOT_FOUND.into()))?;
    self.invalidate(id).await;
    info!(course = %id, by = caller.npm(), "course updated");

    Ok(CourseView::project(&updated, caller))
  }

  pub async fn delete(&self, id: Uuid, caller: &Principal) -> Result<()> {
    let course = self.fetch(id).await?;
    authorize_owner(&course, caller)?;

    let removed =
      self.repo.delete_course(id).await.map_err(Error::repository)?;
    if !removed {
      return Err(Error::NotFound(NOT_FOUND.into()));
    }
    self.invalidate(id).await;
    info!(course = %id, by = caller.npm(), "course deleted");
    Ok(())
  }

  pub async fn enroll(&self, id: Uuid, caller: &Principal) -> Result<()> {
    let course = self.fetch(id).await?;
    if course.is_taught_by(caller.npm()) {
      return Err(own_course());
    }
    if course.scheduled_at <= Utc::now() {
      return Err(Error::Conflict("Course has already started!".into()));
    }
    if course.is_full() {
      return Err(full());
    }

    // The repository repeats the ownership and capacity checks atomically
    // with the insert.
    let outcome = self
      .repo
      .enroll(id, caller.npm())
      .await
      .map_err(Error::repository)?;
    match outcome {
      EnrollOutcome::Enrolled => {}
      EnrollOutcome::CourseMissing => {
        return Err(Error::NotFound(NOT_FOUND.into()));
      }
      EnrollOutcome::OwnCourse => return Err(own_course()),
      EnrollOutcome::AlreadyEnrolled => {
        return Err(Error::Conflict(
          "You are already enrolled to this course.".into(),
        ));
      }
      EnrollOutcome::Full => return Err(full()),
    }

    self.invalidate(id).await;
    info!(course = %id, student = caller.npm(), "student enrolled");
    Ok(())
  }

  pub async fn unenroll(&self, id: Uuid, caller: &Principal) -> Result<()> {
    let course = self.fetch(id).await?;
    if course.is_taught_by(caller.npm()) {
      return Err(Error::Conflict(
        "You cannot unenroll from your own course.".into(),
      ));
    }

    let removed = self
      .repo
      .unenroll(id, caller.npm())
      .await
      .map_err(Error::repository)?;
    if !removed {
      return Err(Error::Conflict(
        "You are not enrolled to this course.".into(),
      ));
    }

    self.invalidate(id).await;
    info!(course = %id, student = caller.npm(), "student unenrolled");
    Ok(())
  }

  // ─── Detail ──────────────────────────────────────────────────────────────

  /// The full projection of a course, served through the detail cache.
  ///
  /// Only the teacher, enrolled students, and admins may read it.
  pub async fn detail(
    &self,
    id: Uuid,
    caller: &Principal,
  ) -> Result<CourseDetail> {
    let member = caller.is_admin() || caller.teaches(id) || caller.attends(id);
    let key = detail_key(id);

    if member {
      match self.cache.get(&key).await {
        Ok(Some(raw)) => match serde_json::from_str::<CourseDetail>(&raw) {
          Ok(detail) => {
            debug!(course = %id, "detail served from cache");
            return Ok(detail.for_caller(caller));
          }
          Err(e) => warn!(course = %id, "discarding unreadable cache entry: {e}"),
        },
        Ok(None) => {}
        Err(e) => warn!(course = %id, "cache read failed: {e}"),
      }
    }

    // A course that no longer exists is reported as missing to everyone.
    let course = self.fetch(id).await?;
    if !member {
      return Err(Error::Authorization(
        "You are not enrolled to this course.".into(),
      ));
    }

    let students =
      self.repo.list_students(id).await.map_err(Error::repository)?;
    let detail = CourseDetail::project(&course, &students, caller);

    let payload = serde_json::to_string(&detail)?;
    if let Err(e) = self.cache.set(key, payload).await {
      warn!(course = %id, "cache write failed: {e}");
    }

    Ok(detail)
  }

  // ─── Helpers ─────────────────────────────────────────────────────────────

  async fn fetch(&self, id: Uuid) -> Result<Course> {
    self
      .repo
      .get_course(id)
      .await
      .map_err(Error::repository)?
      .ok_or_else(|| Error::NotFound(NOT_FOUND.into()))
  }

  /// Drop the cached detail for `id`. Failures leave the entry stale and are
  /// only logged.
  async fn invalidate(&self, id: Uuid) {
    if let Err(e) = self.cache.delete(&detail_key(id)).await {
      warn!(course = %id, "cache invalidation failed: {e}");
    }
  }
}

fn authorize_owner(course: &Course, caller: &Principal) -> Result<()> {
  if course.is_taught_by(caller.npm()) || caller.is_admin() {
    Ok(())
  } else {
    Err(Error::Authorization(NOT_ALLOWED.into()))
  }
}

fn own_course() -> Error {
  Error::Conflict("You cannot enroll to your own course.".into())
}

fn full() -> Error { Error::Conflict("Course is already full.".into()) }
