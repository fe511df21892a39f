//! Operation timestamp normalization.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f%:z",
  "%Y-%m-%d %H:%M:%S%.f%:z",
  "%Y-%m-%dT%H:%M%:z",
  "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M",
];

/// Resolve the operation time as a naive UTC timestamp.
///
/// A trailing `Z` means UTC; an explicit offset is converted to UTC and
/// dropped; a naive value is taken as-is. Absent or unparseable input yields
/// `now`. Never fails.
pub fn normalize_operation_time(raw: Option<&str>, now: NaiveDateTime) -> NaiveDateTime {
  raw
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .and_then(parse_iso)
    .unwrap_or(now)
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
  let zulu;
  let s = match s.strip_suffix('Z') {
    Some(head) => {
      zulu = format!("{}+00:00", head);
      zulu.as_str()
    }
    None => s,
  };

  for fmt in OFFSET_FORMATS {
    if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
      return Some(dt.with_timezone(&Utc).naive_utc());
    }
  }
  for fmt in NAIVE_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(dt);
    }
  }
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
  }

  fn now() -> NaiveDateTime {
    at("2030-06-15T12:00:00")
  }

  #[test]
  fn zulu_becomes_naive_utc() {
    let got = normalize_operation_time(Some("2026-01-01T00:00:00Z"), now());
    assert_eq!(got, at("2026-01-01T00:00:00"));
  }

  #[test]
  fn offsets_convert_to_utc() {
    let got = normalize_operation_time(Some("2026-01-01T03:00:00+03:00"), now());
    assert_eq!(got, at("2026-01-01T00:00:00"));
    let got = normalize_operation_time(Some("2025-12-31 21:30:00.250-02:30"), now());
    assert_eq!(got, at("2026-01-01T00:00:00") + chrono::Duration::milliseconds(250));
  }

  #[test]
  fn naive_values_are_kept() {
    let got = normalize_operation_time(Some("2026-02-03T04:05:06"), now());
    assert_eq!(got, at("2026-02-03T04:05:06"));
    let got = normalize_operation_time(Some("2026-02-03"), now());
    assert_eq!(got, at("2026-02-03T00:00:00"));
  }

  #[test]
  fn garbage_and_absent_fall_back_to_now() {
    assert_eq!(normalize_operation_time(Some("yesterday"), now()), now());
    assert_eq!(normalize_operation_time(Some("   "), now()), now());
    assert_eq!(normalize_operation_time(Some("2026-13-45T00:00:00Z"), now()), now());
    assert_eq!(normalize_operation_time(None, now()), now());
  }
}
