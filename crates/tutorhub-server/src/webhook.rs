//! Discord-style webhook announcements for newly created courses.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};
use tutorhub_core::{course::Course, notify::Notifier, schedule::render_local};

/// Posts an embed to a webhook URL every time a course is created.
///
/// Each post runs on its own task; failures are logged and otherwise ignored.
pub struct WebhookNotifier {
  client: Client,
  url:    String,
}

impl WebhookNotifier {
  pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self { client, url: url.into() })
  }
}

impl Notifier for WebhookNotifier {
  fn course_created(&self, course: &Course) {
    let request = self.client.post(&self.url).json(&announcement(course));
    let id = course.id;

    tokio::spawn(async move {
      match request.send().await.and_then(|r| r.error_for_status()) {
        Ok(_) => debug!(course = %id, "announcement delivered"),
        Err(e) => warn!(course = %id, "announcement failed: {e}"),
      }
    });
  }
}

/// The webhook payload announcing `course`.
pub fn announcement(course: &Course) -> Value {
  let capacity = course
    .capacity
    .map_or_else(|| "Infinity".to_string(), |cap| cap.to_string());

  let description = format!(
    "Course Name: {}\nTeacher: {}\nMatkul: {}\nDatetime: {}\nStudent Limit: \
     {}\n\nCourse Code:```{}```",
    course.name,
    course.teacher.name,
    course.subject.label(),
    render_local(course.scheduled_at),
    capacity,
    course.id,
  );

  json!({
    "embeds": [{
      "title": "New Course!",
      "description": description,
    }]
  })
}
