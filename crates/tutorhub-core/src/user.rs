//! Users and the per-request principal.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member of the university community, keyed by the numeric identifier the
/// identity provider assigns (the student number, `npm`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub npm:      i64,
  pub username: String,
  /// Display name; empty until the first login completes.
  pub name:     String,
  pub is_admin: bool,
}

/// A resolved caller: the live user record plus the membership sets needed
/// for authorization checks.
#[derive(Debug, Clone)]
pub struct Principal {
  pub user:     User,
  /// Courses this user teaches.
  pub taught:   HashSet<Uuid>,
  /// Courses this user is enrolled in as a student.
  pub enrolled: HashSet<Uuid>,
}

impl Principal {
  pub fn new(user: User) -> Self {
    Self { user, taught: HashSet::new(), enrolled: HashSet::new() }
  }

  pub fn npm(&self) -> i64 { self.user.npm }

  pub fn is_admin(&self) -> bool { self.user.is_admin }

  pub fn teaches(&self, course_id: Uuid) -> bool {
    self.taught.contains(&course_id)
  }

  pub fn attends(&self, course_id: Uuid) -> bool {
    self.enrolled.contains(&course_id)
  }

  /// Whether projections should mark `course_id` as enrolled for this caller.
  /// Admins see every course as enrolled.
  pub fn sees_enrolled(&self, course_id: Uuid) -> bool {
    self.attends(course_id) || self.is_admin()
  }
}
