use crate::config::TzOptions;
use crate::date_time::DateTimeWithZone;
use crate::datetime_parser::{is_placeholder, parse_date, parse_date_time, parse_time};
use crate::gps::{reconcile, GpsLocationTags, GpsResult};
use crate::partial::{PartialDate, PartialTime};
use crate::tags::TagBag;
use crate::timezone::{
    combined_gps_stamp, resolve_with_gps, GeoTzLookup, TzResolution, UTC_STAMP_TAGS,
};
use crate::zone::Zone;
use serde::Serialize;
use serde_json::Value;
use std::cell::OnceCell;
use std::collections::BTreeMap;

const GPS_POSITION_TAG: &str = "GPSPosition";
const GPS_VALUE_TAGS: &[&str] = &[
    "GPSLatitude",
    "GPSLatitudeRef",
    "GPSLongitude",
    "GPSLongitudeRef",
];

/// A normalized tag value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    DateTime(DateTimeWithZone),
    Date(PartialDate),
    Time(PartialTime),
    Number(f64),
    Text(String),
    Raw(Value),
}

/// One file's tags after normalization, with the resolved zone and every
/// warning raised along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    #[serde(flatten)]
    pub tags: BTreeMap<String, TagValue>,
    pub tz: Option<String>,
    #[serde(rename = "tzSource")]
    pub tz_source: Option<String>,
    pub warnings: Vec<String>,
}

/// Normalizes the tags of a single file. GPS reconciliation and zone
/// resolution run at most once per task.
pub struct ReadTask<'a> {
    tags: TagBag,
    options: &'a TzOptions,
    lookup: Option<&'a dyn GeoTzLookup>,
    gps: OnceCell<GpsResult>,
    timezone: OnceCell<TzResolution>,
}

impl<'a> ReadTask<'a> {
    pub fn new(
        tags: TagBag,
        options: &'a TzOptions,
        lookup: Option<&'a dyn GeoTzLookup>,
    ) -> Self {
        Self {
            tags,
            options,
            lookup,
            gps: OnceCell::new(),
            timezone: OnceCell::new(),
        }
    }

    pub fn tags(&self) -> &TagBag {
        &self.tags
    }

    pub fn gps(&self) -> &GpsResult {
        self.gps.get_or_init(|| {
            reconcile(
                &GpsLocationTags::from_tags(&self.tags),
                self.options.ignore_zero_zero_lat_lon,
            )
        })
    }

    pub fn timezone(&self) -> &TzResolution {
        self.timezone
            .get_or_init(|| resolve_with_gps(&self.tags, self.gps(), self.options, self.lookup))
    }

    pub fn zone(&self) -> Option<Zone> {
        let source = self.timezone().source.as_ref()?;
        source.to_zone().ok()
    }

    pub fn normalize(&self) -> NormalizedRecord {
        let gps = self.gps();
        let resolution = self.timezone();
        let default_zone = if self.options.backfill_timezones {
            self.zone()
        } else {
            None
        };
        let gps_resolved = !matches!(gps, GpsResult::Empty);

        let mut parse_warnings = Vec::new();
        let mut tags = BTreeMap::new();
        for (name, value) in self.tags.iter() {
            if gps_resolved && GPS_VALUE_TAGS.contains(&name.as_str()) {
                continue;
            }
            let normalized = normalize_value(name, value, default_zone, &mut parse_warnings);
            tags.insert(name.clone(), normalized);
        }

        if !tags.contains_key("GPSDateTime") {
            if let Some(stamp) = combined_gps_stamp(&self.tags) {
                tags.insert("GPSDateTime".to_string(), TagValue::DateTime(stamp));
            }
        }

        match gps {
            GpsResult::Valid { location, .. } => {
                let fields = [
                    ("GPSLatitude", location.latitude.map(TagValue::Number)),
                    ("GPSLongitude", location.longitude.map(TagValue::Number)),
                    (
                        "GPSLatitudeRef",
                        location.latitude_ref.map(|r| TagValue::Text(r.to_string())),
                    ),
                    (
                        "GPSLongitudeRef",
                        location.longitude_ref.map(|r| TagValue::Text(r.to_string())),
                    ),
                ];
                for (name, value) in fields {
                    if let Some(value) = value {
                        tags.insert(name.to_string(), value);
                    }
                }
            }
            GpsResult::Invalid { .. } => {
                tags.remove(GPS_POSITION_TAG);
            }
            GpsResult::Empty => {}
        }

        let mut warnings = gps.warnings().to_vec();
        warnings.extend(resolution.warnings.iter().cloned());
        warnings.extend(parse_warnings);

        let source = resolution.source.as_ref();
        NormalizedRecord {
            tags,
            tz: source.map(|s| s.zone.clone()),
            tz_source: source.map(|s| s.source.clone()),
            warnings,
        }
    }
}

fn normalize_value(
    name: &str,
    value: &Value,
    default_zone: Option<Zone>,
    warnings: &mut Vec<String>,
) -> TagValue {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(TagValue::Number)
            .unwrap_or_else(|| TagValue::Raw(value.clone())),
        Value::String(text) if is_temporal_tag(name) => {
            normalize_temporal(name, text, default_zone, warnings)
        }
        Value::String(text) => TagValue::Text(text.clone()),
        other => TagValue::Raw(other.clone()),
    }
}

fn is_temporal_tag(name: &str) -> bool {
    (name.contains("Date") || name.contains("Time"))
        && !name.contains("Zone")
        && !name.contains("Offset")
}

/// Text shaped like a date or clock value, as opposed to `"1/200"` in
/// `ExposureTime` or a bare `"00"` in `SubSecTime`.
fn looks_temporal(text: &str) -> bool {
    text.chars().any(|ch| ch.is_ascii_digit()) && text.contains([':', '-'])
}

fn normalize_temporal(
    name: &str,
    text: &str,
    default_zone: Option<Zone>,
    warnings: &mut Vec<String>,
) -> TagValue {
    let zone = if UTC_STAMP_TAGS.contains(&name) {
        Some(Zone::utc())
    } else {
        default_zone
    };
    if let Some(value) = parse_date_time(text, zone) {
        return TagValue::DateTime(value);
    }
    if let Some(date) = parse_date(text) {
        return TagValue::Date(date);
    }
    if let Some(time) = parse_time(text) {
        return TagValue::Time(time);
    }
    if looks_temporal(text) && !is_placeholder(text) {
        let message = format!("Failed to parse {name} with value {text:?}");
        log::warn!("{message}");
        warnings.push(message);
    }
    TagValue::Text(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn bag(value: Value) -> TagBag {
        TagBag::from_value(value).expect("tag bag")
    }

    fn date_time(record: &NormalizedRecord, tag: &str) -> DateTimeWithZone {
        match record.tags.get(tag) {
            Some(TagValue::DateTime(value)) => value.clone(),
            other => panic!("{tag} is not a date-time: {other:?}"),
        }
    }

    #[test]
    fn explicit_offset_is_backfilled_into_zoneless_dates() {
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "DateTimeOriginal": "2014:07:17 08:46:27",
                "OffsetTimeOriginal": "-07:00",
                "ModifyDate": "2014:07:18 10:00:00+02:00",
                "Make": "Apple",
                "ImageWidth": 4032
            })),
            &options,
            None,
        );
        let record = task.normalize();

        assert_eq!(record.tz.as_deref(), Some("UTC-7"));
        assert_eq!(record.tz_source.as_deref(), Some("OffsetTimeOriginal"));
        let original = date_time(&record, "DateTimeOriginal");
        assert_eq!(original.to_exif_string(), "2014:07:17 08:46:27-07:00");
        assert!(original.inferred_zone());
        assert_eq!(
            date_time(&record, "ModifyDate").to_exif_string(),
            "2014:07:18 10:00:00+02:00"
        );
        assert_eq!(record.tags.get("Make"), Some(&TagValue::Text("Apple".into())));
        assert_eq!(record.tags.get("ImageWidth"), Some(&TagValue::Number(4032.0)));
        assert_eq!(
            record.tags.get("OffsetTimeOriginal"),
            Some(&TagValue::Text("-07:00".into()))
        );
        assert!(record.warnings.is_empty());
    }

    #[test]
    fn backfill_can_be_disabled() {
        let options = TzOptions {
            backfill_timezones: false,
            ..TzOptions::default()
        };
        let task = ReadTask::new(
            bag(json!({
                "DateTimeOriginal": "2014:07:17 08:46:27",
                "OffsetTime": "+09:00"
            })),
            &options,
            None,
        );
        let record = task.normalize();
        assert_eq!(record.tz.as_deref(), Some("UTC+9"));
        assert!(!date_time(&record, "DateTimeOriginal").has_zone());
    }

    #[test]
    fn unparseable_dates_keep_raw_text_and_warn() {
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "CreateDate": "2014:99:99 99:99:99",
                "SubSecTimeOriginal": "00",
                "ModifyDate": "0001:01:01 00:00:00",
                "ExposureTime": "1/200"
            })),
            &options,
            None,
        );
        let record = task.normalize();
        assert_eq!(
            record.tags.get("CreateDate"),
            Some(&TagValue::Text("2014:99:99 99:99:99".into()))
        );
        assert_eq!(
            record.tags.get("SubSecTimeOriginal"),
            Some(&TagValue::Text("00".into()))
        );
        assert_eq!(
            record.tags.get("ModifyDate"),
            Some(&TagValue::Text("0001:01:01 00:00:00".into()))
        );
        assert_eq!(
            record.warnings,
            vec![r#"Failed to parse CreateDate with value "2014:99:99 99:99:99""#.to_string()]
        );
    }

    #[test]
    fn gps_fields_are_replaced_by_reconciled_values() {
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "GPSLatitude": 33.9249,
                "GPSLatitudeRef": "N",
                "GPSLongitude": 70.9264,
                "GPSLongitudeRef": "E",
                "GeolocationPosition": "-33.9249,-70.9264"
            })),
            &options,
            None,
        );
        let record = task.normalize();
        assert_eq!(record.tags.get("GPSLatitude"), Some(&TagValue::Number(-33.9249)));
        assert_eq!(record.tags.get("GPSLatitudeRef"), Some(&TagValue::Text("S".into())));
        assert_eq!(record.tags.get("GPSLongitude"), Some(&TagValue::Number(-70.9264)));
        assert_eq!(record.tags.get("GPSLongitudeRef"), Some(&TagValue::Text("W".into())));
        assert_eq!(record.warnings.len(), 4);
    }

    #[test]
    fn invalid_gps_fields_are_dropped() {
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "GPSLatitude": 0,
                "GPSLongitude": 0,
                "GPSPosition": "0 N, 0 E",
                "Model": "X100V"
            })),
            &options,
            None,
        );
        let record = task.normalize();
        for tag in ["GPSLatitude", "GPSLongitude", "GPSPosition"] {
            assert!(!record.tags.contains_key(tag), "{tag} should be dropped");
        }
        assert!(record.tags.contains_key("Model"));
        assert_eq!(record.warnings, vec!["Ignoring zero coordinates".to_string()]);
    }

    #[test]
    fn gps_stamps_are_combined_into_utc_date_time() {
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "CreateDate": "2019:03:01 21:15:00",
                "GPSDateStamp": "2019:03:01",
                "GPSTimeStamp": "15:45:00"
            })),
            &options,
            None,
        );
        let record = task.normalize();
        assert_eq!(
            date_time(&record, "GPSDateTime").to_iso_string(),
            "2019-03-01T15:45:00Z"
        );
        assert_eq!(
            record.tags.get("GPSDateStamp"),
            Some(&TagValue::Date(PartialDate::new(2019, 3, 1).expect("date")))
        );
        assert_eq!(
            date_time(&record, "CreateDate").to_exif_string(),
            "2019:03:01 21:15:00+05:30"
        );
    }

    #[test]
    fn utc_tags_default_to_utc_without_a_resolved_zone() {
        let options = TzOptions {
            infer_timezone_from_utc_offset: false,
            ..TzOptions::default()
        };
        let task = ReadTask::new(
            bag(json!({ "DateTimeUTC": "2020:01:02 03:04:05" })),
            &options,
            None,
        );
        let record = task.normalize();
        assert_eq!(record.tz, None);
        assert_eq!(
            date_time(&record, "DateTimeUTC").to_exif_string(),
            "2020:01:02 03:04:05+00:00"
        );
    }

    #[test]
    fn lookup_runs_once_per_task() {
        let calls = Cell::new(0);
        let lookup = |_: f64, _: f64| -> anyhow::Result<Option<String>> {
            calls.set(calls.get() + 1);
            Ok(Some("Europe/Paris".to_string()))
        };
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "GPSPosition": "48.8566 N, 2.3522 E",
                "DateTimeOriginal": "2023:07:14 22:00:00"
            })),
            &options,
            Some(&lookup),
        );

        let first = task.normalize();
        let second = task.normalize();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(first.tz.as_deref(), Some("Europe/Paris"));
        assert_eq!(
            date_time(&first, "DateTimeOriginal").to_exif_string(),
            "2023:07:14 22:00:00+02:00"
        );
    }

    #[test]
    fn record_serializes_flat() {
        let options = TzOptions::default();
        let task = ReadTask::new(
            bag(json!({
                "MIMEType": "video/mp4",
                "CreateDate": "2021:05:06 07:08:09"
            })),
            &options,
            None,
        );
        let rendered = serde_json::to_value(task.normalize()).expect("serialize");
        assert_eq!(
            rendered,
            json!({
                "MIMEType": "video/mp4",
                "CreateDate": "2021-05-06T07:08:09Z",
                "tz": "UTC",
                "tzSource": "defaultVideosToUTC",
                "warnings": []
            })
        );
    }
}
