//! Outbound announcements.

use crate::course::Course;

/// Receives successful course creations.
///
/// Delivery is fire-and-forget: implementations must return promptly and must
/// not report failures back to the engine.
pub trait Notifier: Send + Sync {
  fn course_created(&self, course: &Course);
}

/// A notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Notifier for Silent {
  fn course_created(&self, _course: &Course) {}
}
