use crate::partial::{millis_fraction, PartialDate, PartialTime};
use crate::zone::{format_offset, Zone};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

const NANOS_PER_MILLI: u32 = 1_000_000;

/// A wall-clock date-time with an optional zone.
///
/// The zone and its offset are either both known or both absent, so a
/// zoneless value never reports an offset. Values that collapse to a
/// placeholder instant (year 0 or 1, or the Unix epoch with every field
/// zero) cannot be constructed.
#[derive(Debug, Clone)]
pub struct DateTimeWithZone {
    local: NaiveDateTime,
    has_millis: bool,
    zone: Option<(Zone, FixedOffset)>,
    inferred_zone: bool,
    raw_value: Option<String>,
}

impl DateTimeWithZone {
    /// Pins `local` to `zone`, or leaves it zoneless. Sub-millisecond
    /// precision is dropped.
    pub fn from_local(local: NaiveDateTime, has_millis: bool, zone: Option<Zone>) -> Option<Self> {
        let local = truncate_to_millis(local)?;
        let (local, zone) = match zone {
            Some(zone) => {
                let (local, offset) = zone.resolve_local(local)?;
                (local, Some((zone, offset)))
            }
            None => (local, None),
        };
        Self::checked(Self {
            local,
            has_millis,
            zone,
            inferred_zone: false,
            raw_value: None,
        })
    }

    /// The wall-clock time in `zone` at the UTC instant `utc`.
    pub fn from_instant(utc: NaiveDateTime, has_millis: bool, zone: Zone) -> Option<Self> {
        let utc = truncate_to_millis(utc)?;
        let offset = zone.offset_at_utc(&utc);
        let local = utc.checked_add_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
        Self::checked(Self {
            local,
            has_millis,
            zone: Some((zone, offset)),
            inferred_zone: false,
            raw_value: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: Option<u16>,
        zone: Option<Zone>,
    ) -> Option<Self> {
        let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_milli_opt(
            hour,
            minute,
            second,
            u32::from(millisecond.unwrap_or(0)),
        )?;
        Self::from_local(local, millisecond.is_some(), zone)
    }

    pub fn from_parts(date: PartialDate, time: PartialTime, zone: Option<Zone>) -> Option<Self> {
        let local = date.to_naive()?.and_time(time.to_naive()?);
        Self::from_local(local, time.millisecond().is_some(), zone)
    }

    pub fn from_epoch_millis(millis: i64, zone: Zone) -> Option<Self> {
        let utc = DateTime::<Utc>::from_timestamp_millis(millis)?.naive_utc();
        Self::from_instant(utc, true, zone)
    }

    pub fn now(zone: Zone) -> Option<Self> {
        Self::from_instant(Utc::now().naive_utc(), true, zone)
    }

    fn checked(value: Self) -> Option<Self> {
        let year = value.local.year();
        if year == 0 || year == 1 {
            return None;
        }
        if value.local == NaiveDateTime::UNIX_EPOCH {
            return None;
        }
        Some(value)
    }

    pub(crate) fn with_raw_value(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = Some(raw.into());
        self
    }

    pub(crate) fn with_inferred_zone(mut self, inferred: bool) -> Self {
        self.inferred_zone = inferred && self.zone.is_some();
        self
    }

    pub fn year(&self) -> i32 {
        self.local.year()
    }

    pub fn month(&self) -> u32 {
        self.local.month()
    }

    pub fn day(&self) -> u32 {
        self.local.day()
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    pub fn minute(&self) -> u32 {
        self.local.minute()
    }

    pub fn second(&self) -> u32 {
        self.local.second()
    }

    pub fn millisecond(&self) -> Option<u16> {
        self.has_millis
            .then(|| (self.local.nanosecond() / NANOS_PER_MILLI) as u16)
    }

    pub fn zone(&self) -> Option<Zone> {
        self.zone.map(|(zone, _)| zone)
    }

    pub fn zone_name(&self) -> Option<String> {
        self.zone.map(|(zone, _)| zone.name())
    }

    pub fn offset_minutes(&self) -> Option<i32> {
        self.zone.map(|(_, offset)| offset.local_minus_utc() / 60)
    }

    pub fn has_zone(&self) -> bool {
        self.zone.is_some()
    }

    /// `true` when the zone came from a default rather than the raw text.
    pub fn inferred_zone(&self) -> bool {
        self.inferred_zone
    }

    pub fn raw_value(&self) -> Option<&str> {
        self.raw_value.as_deref()
    }

    pub fn naive_local(&self) -> NaiveDateTime {
        self.local
    }

    fn utc_naive(&self) -> Option<NaiveDateTime> {
        let (_, offset) = self.zone?;
        self.local
            .checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))
    }

    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        self.utc_naive().map(|utc| utc.and_utc())
    }

    /// Same wall-clock fields in `zone` when this value is zoneless, the
    /// same instant seen from `zone` otherwise.
    pub fn with_zone(&self, zone: Zone) -> Option<Self> {
        let shifted = match self.utc_naive() {
            Some(utc) => Self::from_instant(utc, self.has_millis, zone)?
                .with_inferred_zone(self.inferred_zone),
            None => Self::from_local(self.local, self.has_millis, Some(zone))?
                .with_inferred_zone(true),
        };
        Some(Self {
            raw_value: self.raw_value.clone(),
            ..shifted
        })
    }

    /// Shifts by `duration`, keeping whether a zone is known.
    pub fn plus(&self, duration: Duration) -> Option<Self> {
        let shifted = match (self.zone, self.utc_naive()) {
            (Some((zone, _)), Some(utc)) => {
                Self::from_instant(utc.checked_add_signed(duration)?, self.has_millis, zone)?
            }
            _ => Self::from_local(self.local.checked_add_signed(duration)?, self.has_millis, None)?,
        };
        Some(shifted.with_inferred_zone(self.inferred_zone))
    }

    /// `YYYY:MM:DD HH:MM:SS[.fff][±HH:MM]`
    pub fn to_exif_string(&self) -> String {
        let offset = self.offset_minutes().map(format_offset).unwrap_or_default();
        format!(
            "{:04}:{:02}:{:02} {:02}:{:02}:{:02}{}{}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second(),
            millis_fraction(self.millisecond()),
            offset
        )
    }

    /// `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM]`
    pub fn to_iso_string(&self) -> String {
        let offset = match self.offset_minutes() {
            Some(0) => "Z".to_string(),
            Some(minutes) => format_offset(minutes),
            None => String::new(),
        };
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}{}{}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second(),
            millis_fraction(self.millisecond()),
            offset
        )
    }
}

fn truncate_to_millis(value: NaiveDateTime) -> Option<NaiveDateTime> {
    let nanos = value.nanosecond();
    // chrono encodes a leap second as nanos past one billion
    if nanos >= 1_000_000_000 {
        return None;
    }
    value.with_nanosecond(nanos - nanos % NANOS_PER_MILLI)
}

impl PartialEq for DateTimeWithZone {
    fn eq(&self, other: &Self) -> bool {
        self.local == other.local
            && self.millisecond() == other.millisecond()
            && self.zone == other.zone
    }
}

impl Eq for DateTimeWithZone {}

impl fmt::Display for DateTimeWithZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl Serialize for DateTimeWithZone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::normalize_zone;

    fn zone(name: &str) -> Zone {
        normalize_zone(name).expect("zone")
    }

    #[test]
    fn renders_exif_and_iso() {
        let value =
            DateTimeWithZone::new(2014, 7, 17, 8, 46, 27, Some(123), Some(zone("UTC-7")))
                .expect("valid");
        assert_eq!(value.to_exif_string(), "2014:07:17 08:46:27.123-07:00");
        assert_eq!(value.to_iso_string(), "2014-07-17T08:46:27.123-07:00");
        assert_eq!(value.zone_name().as_deref(), Some("UTC-7"));
        assert_eq!(value.offset_minutes(), Some(-420));
    }

    #[test]
    fn zoneless_values_render_without_offset() {
        let value = DateTimeWithZone::new(2020, 1, 2, 3, 4, 5, None, None).expect("valid");
        assert_eq!(value.to_exif_string(), "2020:01:02 03:04:05");
        assert_eq!(value.to_iso_string(), "2020-01-02T03:04:05");
        assert_eq!(value.offset_minutes(), None);
        assert_eq!(value.zone_name(), None);
    }

    #[test]
    fn utc_renders_as_z_in_iso() {
        let value = DateTimeWithZone::new(2020, 1, 2, 3, 4, 5, None, Some(Zone::utc()))
            .expect("valid");
        assert_eq!(value.to_iso_string(), "2020-01-02T03:04:05Z");
        assert_eq!(value.to_exif_string(), "2020:01:02 03:04:05+00:00");
    }

    #[test]
    fn placeholder_instants_are_rejected() {
        assert!(DateTimeWithZone::new(1, 1, 1, 0, 0, 0, None, None).is_none());
        assert!(DateTimeWithZone::new(0, 1, 1, 0, 0, 0, None, None).is_none());
        assert!(DateTimeWithZone::new(1970, 1, 1, 0, 0, 0, None, Some(Zone::utc())).is_none());
        assert!(DateTimeWithZone::new(1970, 1, 1, 0, 0, 0, None, None).is_none());
        assert!(DateTimeWithZone::from_epoch_millis(0, Zone::utc()).is_none());
        assert!(DateTimeWithZone::new(1970, 1, 1, 0, 0, 1, None, None).is_some());
    }

    #[test]
    fn zoneless_value_is_reinterpreted_in_place() {
        let value = DateTimeWithZone::new(2020, 6, 1, 12, 0, 0, None, None).expect("valid");
        let pinned = value
            .with_zone(Zone::Named(chrono_tz::Europe::Berlin))
            .expect("pinned");
        assert_eq!(pinned.hour(), 12);
        assert_eq!(pinned.offset_minutes(), Some(120));
        assert!(pinned.inferred_zone());
    }

    #[test]
    fn zoned_value_converts_the_instant() {
        let value = DateTimeWithZone::new(2020, 6, 1, 12, 0, 0, None, Some(Zone::utc()))
            .expect("valid");
        let converted = value.with_zone(zone("UTC-7")).expect("converted");
        assert_eq!(converted.hour(), 5);
        assert_eq!(converted.to_utc(), value.to_utc());
        assert!(!converted.inferred_zone());
    }

    #[test]
    fn with_own_zone_is_identity() {
        for name in ["UTC", "UTC+5:30", "America/New_York"] {
            let value =
                DateTimeWithZone::new(2019, 11, 3, 1, 30, 0, Some(250), Some(zone(name)))
                    .expect("valid");
            let same = value.with_zone(zone(name)).expect("same");
            assert_eq!(same, value);
        }
    }

    #[test]
    fn plus_keeps_zone_presence() {
        let zoned = DateTimeWithZone::new(2021, 3, 1, 23, 30, 0, None, Some(zone("+09:00")))
            .expect("valid");
        let later = zoned.plus(Duration::hours(1)).expect("later");
        assert_eq!(later.to_exif_string(), "2021:03:02 00:30:00+09:00");

        let bare = DateTimeWithZone::new(2021, 3, 1, 23, 30, 0, None, None).expect("valid");
        let later = bare.plus(Duration::minutes(45)).expect("later");
        assert_eq!(later.to_exif_string(), "2021:03:02 00:15:00");
        assert!(!later.has_zone());
    }

    #[test]
    fn epoch_millis_keep_millisecond_precision() {
        let value = DateTimeWithZone::from_epoch_millis(1_405_612_000_768, Zone::utc())
            .expect("valid");
        assert_eq!(value.millisecond(), Some(768));
        assert_eq!(value.to_iso_string(), "2014-07-17T15:46:40.768Z");
    }

    #[test]
    fn serializes_as_iso_text() {
        let value = DateTimeWithZone::new(2014, 7, 17, 8, 46, 27, None, Some(zone("UTC-7")))
            .expect("valid");
        assert_eq!(
            serde_json::to_string(&value).expect("serialize"),
            "\"2014-07-17T08:46:27-07:00\""
        );
    }
}
