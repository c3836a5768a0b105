//! Caller-aware projections of a course for API responses.

use serde::{Deserialize, Serialize};

use crate::{
  course::Course, schedule::render_local, user::{Principal, User},
};

/// The summary shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseView {
  pub id:             String,
  pub name:           String,
  /// Subject label, e.g. `"MatDis"`.
  pub subject:        String,
  /// Local wall-clock start time, `YYYY-MM-DDTHH:MM:SS`.
  pub scheduled_at:   String,
  pub teacher:        String,
  pub teacher_npm:    i64,
  pub students_count: u32,
  pub capacity:       Option<u32>,
  pub is_enrolled:    bool,
}

impl CourseView {
  pub fn project(course: &Course, caller: &Principal) -> Self {
    Self {
      id:             course.id.to_string(),
      name:           course.name.clone(),
      subject:        course.subject.label().to_owned(),
      scheduled_at:   render_local(course.scheduled_at),
      teacher:        course.teacher.name.clone(),
      teacher_npm:    course.teacher.npm,
      students_count: course.students_count,
      capacity:       course.capacity,
      is_enrolled:    caller.sees_enrolled(course.id),
    }
  }
}

/// The full view served by the detail endpoint.
///
/// This is also the cached payload; `is_enrolled` is rewritten for every
/// caller on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDetail {
  #[serde(flatten)]
  pub summary:      CourseView,
  pub meeting_link: Option<String>,
  pub notes:        Option<String>,
  pub notes_short:  Option<String>,
  pub hidden:       bool,
  /// Display names of enrolled students.
  pub students:     Vec<String>,
}

impl CourseDetail {
  /// Project `course` with its loaded student list. The count comes from the
  /// list rather than the stored aggregate.
  pub fn project(course: &Course, students: &[User], caller: &Principal) -> Self {
    let mut summary = CourseView::project(course, caller);
    summary.students_count = u32::try_from(students.len()).unwrap_or(u32::MAX);
    summary.is_enrolled = caller.is_admin()
      || students.iter().any(|s| s.npm == caller.npm());

    Self {
      summary,
      meeting_link: course.meeting_link.clone(),
      notes:        course.notes.clone(),
      notes_short:  course.notes_short.clone(),
      hidden:       course.hidden,
      students:     students.iter().map(|s| s.name.clone()).collect(),
    }
  }

  pub fn for_caller(mut self, caller: &Principal) -> Self {
    let id = self.summary.id.parse::<uuid::Uuid>().ok();
    self.summary.is_enrolled =
      caller.is_admin() || id.is_some_and(|id| caller.attends(id));
    self
  }
}
