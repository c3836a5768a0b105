//! Course start times.
//!
//! Every schedule is anchored to a single local timezone (UTC+7). Submitted
//! wall-clock times are interpreted in that zone whatever offset the client
//! attached, and projections render them back in it.

use chrono::{
  DateTime, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound as _, TimeDelta,
  TimeZone, Utc,
};

use crate::{Error, Result};

pub const LOCAL_OFFSET_SECS: i32 = 7 * 3600;

/// How far ahead a course may be scheduled.
pub const MAX_LEAD_DAYS: i64 = 28;

const RENDER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
];

pub fn local_offset() -> FixedOffset {
  FixedOffset::east_opt(LOCAL_OFFSET_SECS).expect("UTC+7 is a valid offset")
}

/// Parse a submitted date-time, discarding any offset and reading the
/// wall-clock part as local time.
///
/// Fractions of a second are dropped so that a parsed time always equals the
/// parse of its own [`render_local`] output.
pub fn parse_local(input: &str) -> Result<DateTime<Utc>> {
  let input = input.trim();
  let naive = DateTime::parse_from_rfc3339(input)
    .map(|dt| dt.naive_local())
    .ok()
    .or_else(|| {
      NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    })
    .or_else(|| {
      NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
    .ok_or_else(|| {
      Error::Validation(format!("Cannot parse date and time {input:?}."))
    })?
    .trunc_subsecs(0);

  local_offset()
    .from_local_datetime(&naive)
    .single()
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| Error::Validation(format!("Ambiguous local time {input:?}.")))
}

/// Render a start time as local wall-clock text.
pub fn render_local(at: DateTime<Utc>) -> String {
  at.with_timezone(&local_offset()).format(RENDER_FORMAT).to_string()
}

/// Check that `at` lies within `[now, now + MAX_LEAD_DAYS]`, both ends
/// inclusive.
pub fn check_window(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
  if at < now {
    return Err(Error::Validation(
      "You cannot pick date and time that happens in the past.".into(),
    ));
  }
  if at - now > TimeDelta::days(MAX_LEAD_DAYS) {
    return Err(Error::Validation(format!(
      "Date and Time must be between now and {MAX_LEAD_DAYS} days from now."
    )));
  }
  Ok(())
}
