use crate::strings::{to_f64, value_to_f64};
use chrono::{Duration, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

pub const MAX_OFFSET_MINUTES: i32 = 14 * 60;
const MIN_LIKELY_OFFSET_MINUTES: i32 = -12 * 60;

static OFFSET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:UTC|GMT)?\s*([+-])\s*(\d{1,2})(?::?(\d{2}))?$")
        .expect("offset regex should compile")
});

const UTC_NAMES: &[&str] = &[
    "UTC",
    "Etc/UTC",
    "Etc/UCT",
    "UCT",
    "GMT",
    "Etc/GMT",
    "Etc/GMT0",
    "Etc/GMT+0",
    "Etc/GMT-0",
    "GMT0",
    "Etc/Universal",
    "Universal",
    "Etc/Zulu",
    "Zulu",
    "Etc/Greenwich",
    "Greenwich",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZoneError {
    #[error("Zone cannot be empty")]
    Empty,
    #[error("Offset of {0} minutes is outside -14:00..+14:00")]
    OutOfRange(i32),
    #[error("Offset minutes must be between 0 and 59, got {0}")]
    InvalidMinutes(u32),
    #[error("Unrecognized zone {0:?}")]
    Unrecognized(String),
}

/// Either a fixed UTC offset or a named IANA zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl Zone {
    pub fn utc() -> Self {
        Zone::Fixed(Utc.fix())
    }

    pub fn from_offset_minutes(minutes: i32) -> Result<Self, ZoneError> {
        if minutes.unsigned_abs() > MAX_OFFSET_MINUTES.unsigned_abs() {
            return Err(ZoneError::OutOfRange(minutes));
        }
        FixedOffset::east_opt(minutes * 60)
            .map(Zone::Fixed)
            .ok_or(ZoneError::OutOfRange(minutes))
    }

    pub fn is_utc(&self) -> bool {
        match self {
            Zone::Fixed(offset) => offset.local_minus_utc() == 0,
            Zone::Named(tz) => UTC_NAMES.contains(&tz.name()),
        }
    }

    /// `UTC`, `UTC-7`, `UTC+5:30` for fixed offsets, the IANA name otherwise.
    pub fn name(&self) -> String {
        match self {
            Zone::Fixed(offset) => offset_zone_name(offset.local_minus_utc() / 60),
            Zone::Named(tz) => tz.name().to_string(),
        }
    }

    /// An identifier that [`normalize_zone`] maps back to this zone.
    pub fn identifier(&self) -> String {
        match self {
            Zone::Fixed(offset) if offset.local_minus_utc() == 0 => "UTC".to_string(),
            Zone::Fixed(offset) => format!("UTC{}", format_offset(offset.local_minus_utc() / 60)),
            Zone::Named(tz) => tz.name().to_string(),
        }
    }

    pub fn offset_at_utc(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            Zone::Fixed(offset) => *offset,
            Zone::Named(tz) => tz.offset_from_utc_datetime(utc).fix(),
        }
    }

    /// Pins `local` to this zone. Ambiguous wall-clock times take the
    /// earlier instant; times inside a DST gap move forward by the gap.
    pub fn resolve_local(&self, local: NaiveDateTime) -> Option<(NaiveDateTime, FixedOffset)> {
        match self {
            Zone::Fixed(offset) => Some((local, *offset)),
            Zone::Named(tz) => match tz.from_local_datetime(&local) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    Some((local, dt.offset().fix()))
                }
                LocalResult::None => {
                    let shifted = local + Duration::hours(1);
                    tz.from_local_datetime(&shifted)
                        .earliest()
                        .map(|dt| (shifted, dt.offset().fix()))
                }
            },
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for Zone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Accepts IANA names, `Z`, `UTC`, `GMT` and offsets such as `UTC-7`,
/// `UTC+5:30`, `-07:00`, `+0930` or `+09`.
pub fn normalize_zone(input: &str) -> Result<Zone, ZoneError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ZoneError::Empty);
    }
    if ["Z", "UTC", "GMT"]
        .iter()
        .any(|name| input.eq_ignore_ascii_case(name))
    {
        return Ok(Zone::utc());
    }

    if let Some(caps) = OFFSET_PATTERN.captures(input) {
        let negative = caps.get(1).map(|m| m.as_str() == "-").unwrap_or(false);
        let hours = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or_default();
        let minutes = caps
            .get(3)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or_default();
        if minutes >= 60 {
            return Err(ZoneError::InvalidMinutes(minutes));
        }
        let total = (hours * 60 + minutes) as i32;
        return Zone::from_offset_minutes(if negative { -total } else { total });
    }

    input
        .parse::<Tz>()
        .map(Zone::Named)
        .map_err(|_| ZoneError::Unrecognized(input.to_string()))
}

/// Like [`normalize_zone`], but also understands the raw offset-tag shapes
/// exiftool emits: hour counts as numbers, `"9 9"` strings and arrays whose
/// first element is the hour offset.
pub fn normalize_zone_value(value: &Value) -> Result<Zone, ZoneError> {
    match value {
        Value::String(s) => normalize_zone(s).or_else(|err| {
            s.split_whitespace()
                .next()
                .and_then(to_f64)
                .ok_or(err)
                .and_then(zone_from_hours)
        }),
        Value::Number(_) => value_to_f64(value)
            .ok_or_else(|| ZoneError::Unrecognized(value.to_string()))
            .and_then(zone_from_hours),
        Value::Array(items) => items
            .first()
            .ok_or(ZoneError::Empty)
            .and_then(normalize_zone_value),
        other => Err(ZoneError::Unrecognized(other.to_string())),
    }
}

fn zone_from_hours(hours: f64) -> Result<Zone, ZoneError> {
    let max_hours = f64::from(MAX_OFFSET_MINUTES / 60);
    if !(-max_hours..=max_hours).contains(&hours) {
        return Err(ZoneError::Unrecognized(hours.to_string()));
    }
    Zone::from_offset_minutes((hours * 60.0).round() as i32)
}

/// `+HH:MM` / `-HH:MM`.
pub fn format_offset(minutes: i32) -> String {
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.abs();
    format!("{sign}{:02}:{:02}", abs / 60, abs % 60)
}

pub fn offset_zone_name(minutes: i32) -> String {
    if minutes == 0 {
        return "UTC".to_string();
    }
    let sign = if minutes < 0 { '-' } else { '+' };
    let abs = minutes.abs();
    if abs % 60 == 0 {
        format!("UTC{sign}{}", abs / 60)
    } else {
        format!("UTC{sign}{}:{:02}", abs / 60, abs % 60)
    }
}

/// Rounds a measured local-minus-UTC difference to the nearest quarter
/// hour, rejecting results no real zone uses.
pub fn likely_offset_minutes(delta_minutes: f64) -> Option<i32> {
    if !delta_minutes.is_finite() {
        return None;
    }
    let rounded = ((delta_minutes / 15.0).round() * 15.0) as i32;
    (MIN_LIKELY_OFFSET_MINUTES..=MAX_OFFSET_MINUTES)
        .contains(&rounded)
        .then_some(rounded)
}
