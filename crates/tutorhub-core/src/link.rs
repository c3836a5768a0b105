//! Meeting-link shape validation.
//!
//! Only invitation links from known providers are accepted: Zoom join links
//! (`/j/<digits>`) and Google Meet room codes (`/abc-defg-hij`).

use std::sync::LazyLock;

use http::Uri;
use regex::Regex;

static ZOOM_JOIN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^/j/\d+/?$").expect("zoom pattern is valid"));

static MEET_ROOM: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^/[A-Za-z0-9]{3}-[A-Za-z0-9]{4}-[A-Za-z0-9]{3}/?$")
    .expect("meet pattern is valid")
});

pub fn is_meeting_link(url: &str) -> bool {
  let Ok(uri) = url.trim().parse::<Uri>() else {
    return false;
  };
  if !matches!(uri.scheme_str(), Some("http" | "https")) {
    return false;
  }
  match uri.host() {
    Some("zoom.us") => ZOOM_JOIN.is_match(uri.path()),
    Some("meet.google.com") => MEET_ROOM.is_match(uri.path()),
    _ => false,
  }
}
