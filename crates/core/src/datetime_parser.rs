use crate::date_time::DateTimeWithZone;
use crate::partial::{PartialDate, PartialTime};
use crate::strings::is_zero_run;
use crate::zone::Zone;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

static TRAILING_ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*\d)\s*([A-Za-z]{2,5})$").expect("abbreviation regex should compile")
});

static FRACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d:\d{1,2}\.\d").expect("fraction regex should compile")
});

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2}):(\d{2})(?::(\d{2})(?:\.(\d+))?)?\s*(?:Z|UTC|[+-]\d{1,2}(?::?\d{2})?)?$",
    )
    .expect("time regex should compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutZone {
    /// The offset is part of the text.
    FromInput,
    /// The text ends in a literal UTC marker.
    Utc,
    /// No offset in the text; the caller's default applies.
    Default,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    format: &'static str,
    zone: LayoutZone,
    strict: bool,
}

const fn strict(format: &'static str, zone: LayoutZone) -> Layout {
    Layout {
        format,
        zone,
        strict: true,
    }
}

const fn loose(format: &'static str, zone: LayoutZone) -> Layout {
    Layout {
        format,
        zone,
        strict: false,
    }
}

// Order matters: explicit offsets, then UTC markers, then zoneless forms,
// then the alternate layouts some writers produce.
const LAYOUTS: &[Layout] = &[
    strict("%Y:%m:%d %H:%M:%S%.f %#z", LayoutZone::FromInput),
    strict("%Y-%m-%dT%H:%M:%S%.f %#z", LayoutZone::FromInput),
    strict("%Y-%m-%d %H:%M:%S%.f %#z", LayoutZone::FromInput),
    strict("%Y:%m:%d %H:%M:%S%.fZ", LayoutZone::Utc),
    strict("%Y-%m-%dT%H:%M:%S%.fZ", LayoutZone::Utc),
    strict("%Y:%m:%d %H:%M:%S%.f UTC", LayoutZone::Utc),
    strict("%Y-%m-%d %H:%M:%S%.f UTC", LayoutZone::Utc),
    strict("%Y:%m:%d %H:%M:%S%.f", LayoutZone::Default),
    strict("%Y-%m-%dT%H:%M:%S%.f", LayoutZone::Default),
    strict("%Y-%m-%d %H:%M:%S%.f", LayoutZone::Default),
    strict("%Y:%m:%d %H:%M", LayoutZone::Default),
    strict("%Y-%m-%dT%H:%M", LayoutZone::Default),
    loose("%b %d %Y %H:%M:%S%.f %#z", LayoutZone::FromInput),
    loose("%b %d %Y %H:%M:%S%.f", LayoutZone::Default),
    loose("%a %b %d %H:%M:%S%.f %Y", LayoutZone::Default),
    loose("%a, %d %b %Y %H:%M:%S%.f %#z", LayoutZone::FromInput),
    loose("%a, %d %b %Y %H:%M:%S%.f", LayoutZone::Default),
    loose("%A, %B %d, %Y %H:%M:%S%.f", LayoutZone::Default),
    loose("%B %d, %Y %H:%M:%S%.f", LayoutZone::Default),
    loose("%d %b %Y %H:%M:%S%.f", LayoutZone::Default),
    loose("%Y/%m/%d %H:%M:%S%.f", LayoutZone::Default),
];

const DATE_LAYOUTS: &[&str] = &[
    "%Y:%m:%d",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%b %d %Y",
    "%B %d, %Y",
    "%d %b %Y",
];

impl Layout {
    /// Local fields, zone, and whether the zone came from `default_zone`.
    fn apply(
        &self,
        text: &str,
        default_zone: Option<Zone>,
    ) -> Option<(NaiveDateTime, Option<Zone>, bool)> {
        match self.zone {
            LayoutZone::FromInput => {
                let parsed = DateTime::parse_from_str(text, self.format).ok()?;
                let zone = Zone::from_offset_minutes(parsed.offset().local_minus_utc() / 60).ok()?;
                Some((parsed.naive_local(), Some(zone), false))
            }
            LayoutZone::Utc => NaiveDateTime::parse_from_str(text, self.format)
                .ok()
                .map(|local| (local, Some(Zone::utc()), false)),
            LayoutZone::Default => NaiveDateTime::parse_from_str(text, self.format)
                .ok()
                .map(|local| (local, default_zone, default_zone.is_some())),
        }
    }
}

/// Parses a date-time, trying strict layouts before loose ones.
///
/// Zoneless text takes `default_zone`, and the result then reports
/// [`DateTimeWithZone::inferred_zone`]. Placeholder values such as
/// `0001:01:01 00:00:00` or a bare run of zeros yield `None`.
pub fn parse_date_time(text: &str, default_zone: Option<Zone>) -> Option<DateTimeWithZone> {
    parse_with_layouts(text, default_zone, LAYOUTS.iter())
}

/// Like [`parse_date_time`] but only accepts exiftool's own layouts and
/// ISO-8601.
pub fn parse_date_time_strict(text: &str, default_zone: Option<Zone>) -> Option<DateTimeWithZone> {
    parse_with_layouts(
        text,
        default_zone,
        LAYOUTS.iter().filter(|layout| layout.strict),
    )
}

fn parse_with_layouts<'a>(
    text: &str,
    default_zone: Option<Zone>,
    layouts: impl Iterator<Item = &'a Layout>,
) -> Option<DateTimeWithZone> {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_zero_run(trimmed) {
        return None;
    }
    let candidate = strip_trailing_abbreviation(trimmed);
    let has_millis = FRACTION.is_match(candidate);

    for layout in layouts {
        let Some((local, zone, inferred)) = layout.apply(candidate, default_zone) else {
            continue;
        };
        log::debug!("parsed {trimmed:?} with layout {:?}", layout.format);
        return DateTimeWithZone::from_local(local, has_millis, zone)
            .map(|value| value.with_inferred_zone(inferred).with_raw_value(text));
    }
    None
}

/// Drops a trailing zone abbreviation such as `PDT` or `DST`. Only `UTC`
/// survives, since it is the one abbreviation with a fixed meaning.
fn strip_trailing_abbreviation(text: &str) -> &str {
    match TRAILING_ABBREVIATION.captures(text) {
        Some(caps) if !caps[2].eq_ignore_ascii_case("UTC") => {
            caps.get(1).map(|m| m.as_str().trim_end()).unwrap_or(text)
        }
        _ => text,
    }
}

/// `true` for the stand-in values cameras write when no clock was set:
/// all-zero fields, year 0 or 1, or a bare Unix epoch.
pub fn is_placeholder(text: &str) -> bool {
    let digits: String = text
        .chars()
        .filter(char::is_ascii_digit)
        .take(14)
        .collect();
    if digits.len() < 8 {
        return is_zero_run(text);
    }
    digits.chars().all(|ch| ch == '0')
        || digits.starts_with("0000")
        || digits.starts_with("0001")
        || digits == "19700101000000"
}

pub fn parse_date(text: &str) -> Option<PartialDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_zero_run(trimmed) {
        return None;
    }
    let date = DATE_LAYOUTS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())?;
    if date.year() <= 1 {
        return None;
    }
    PartialDate::from_naive(date)
}

/// Parses `HH:MM[:SS[.fff]]`; a trailing offset or UTC marker is accepted
/// and dropped.
pub fn parse_time(text: &str) -> Option<PartialTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_zero_run(trimmed) {
        return None;
    }
    let caps = TIME_PATTERN.captures(trimmed)?;
    let field = |index: usize| {
        caps.get(index)
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };
    let millisecond = caps.get(4).and_then(|m| fraction_to_millis(m.as_str()));
    PartialTime::new(field(1)?, field(2)?, field(3).unwrap_or(0), millisecond)
}

fn fraction_to_millis(digits: &str) -> Option<u16> {
    let padded: String = digits.chars().chain("000".chars()).take(3).collect();
    padded.parse().ok()
}
