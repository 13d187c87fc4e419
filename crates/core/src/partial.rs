use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// Renders milliseconds as a fractional-second suffix: `Some(768)` is
/// `".768"`, `Some(5)` is `".005"`, `None` is empty.
pub fn millis_fraction(millisecond: Option<u16>) -> String {
    millisecond
        .map(|ms| format!(".{ms:03}"))
        .unwrap_or_default()
}

/// A calendar date with no time and no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartialDate {
    year: i32,
    month: u32,
    day: u32,
}

impl PartialDate {
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self { year, month, day })
    }

    pub fn from_naive(date: NaiveDate) -> Option<Self> {
        Self::new(date.year(), date.month(), date.day())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// `YYYY:MM:DD`
    pub fn to_exif_string(&self) -> String {
        format!("{:04}:{:02}:{:02}", self.year, self.month, self.day)
    }

    /// `YYYY-MM-DD`
    pub fn to_iso_string(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for PartialDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl Serialize for PartialDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

/// A wall-clock time with no date and no zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartialTime {
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: Option<u16>,
}

impl PartialTime {
    pub fn new(hour: u32, minute: u32, second: u32, millisecond: Option<u16>) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 || millisecond.is_some_and(|ms| ms > 999) {
            return None;
        }
        Some(Self {
            hour,
            minute,
            second,
            millisecond,
        })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    pub fn millisecond(&self) -> Option<u16> {
        self.millisecond
    }

    pub fn to_naive(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_milli_opt(
            self.hour,
            self.minute,
            self.second,
            u32::from(self.millisecond.unwrap_or(0)),
        )
    }

    /// `HH:MM:SS[.fff]`
    pub fn to_exif_string(&self) -> String {
        format!(
            "{:02}:{:02}:{:02}{}",
            self.hour,
            self.minute,
            self.second,
            millis_fraction(self.millisecond)
        )
    }

    /// ISO-8601 local time; identical to the exif layout.
    pub fn to_iso_string(&self) -> String {
        self.to_exif_string()
    }
}

impl fmt::Display for PartialTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl Serialize for PartialTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}
