use serde_json::{json, Value};
use tagtime_core::{GeoTzLookup, ReadTask, TagBag, TagValue, TzOptions};

fn iphone_photo() -> Value {
    json!([{
        "SourceFile": "IMG_0042.HEIC",
        "File": {
            "FileName": "IMG_0042.HEIC",
            "MIMEType": "image/heic"
        },
        "EXIF": {
            "Make": "Apple",
            "Model": "iPhone 13",
            "DateTimeOriginal": "2022:08:14 18:32:07",
            "CreateDate": "2022:08:14 18:32:07",
            "OffsetTimeOriginal": "+02:00",
            "SubSecTimeOriginal": "512",
            "ExposureTime": "1/120",
            "GPSLatitudeRef": "N",
            "GPSLongitudeRef": "E",
            "GPSLatitude": 41.8902,
            "GPSLongitude": 12.4922,
            "GPSDateStamp": "2022:08:14",
            "GPSTimeStamp": "16:32:05"
        },
        "Composite": {
            "SubSecDateTimeOriginal": "2022:08:14 18:32:07.512+02:00",
            "GPSPosition": "41 deg 53' 24.72\" N, 12 deg 29' 31.92\" E"
        }
    }])
}

fn first_bag(value: Value) -> TagBag {
    let Value::Array(items) = value else {
        panic!("expected exiftool array output");
    };
    let first = items.into_iter().next().expect("one file");
    TagBag::from_value(first).expect("tag bag")
}

fn date_time_text(value: Option<&TagValue>) -> String {
    match value {
        Some(TagValue::DateTime(dt)) => dt.to_exif_string(),
        other => panic!("expected a date-time, got {other:?}"),
    }
}

#[test]
fn photo_record_is_normalized_end_to_end() {
    let options = TzOptions::default();
    let lookup = |_: f64, _: f64| -> anyhow::Result<Option<String>> {
        Ok(Some("Europe/Rome".to_string()))
    };
    let task = ReadTask::new(first_bag(iphone_photo()), &options, Some(&lookup));
    let record = task.normalize();

    assert_eq!(record.tz.as_deref(), Some("UTC+2"));
    assert_eq!(record.tz_source.as_deref(), Some("OffsetTimeOriginal"));
    assert_eq!(
        date_time_text(record.tags.get("DateTimeOriginal")),
        "2022:08:14 18:32:07+02:00"
    );
    assert_eq!(
        date_time_text(record.tags.get("SubSecDateTimeOriginal")),
        "2022:08:14 18:32:07.512+02:00"
    );
    assert_eq!(
        date_time_text(record.tags.get("GPSDateTime")),
        "2022:08:14 16:32:05+00:00"
    );
    assert_eq!(
        record.tags.get("GPSLatitude"),
        Some(&TagValue::Number(41.8902))
    );
    assert_eq!(
        record.tags.get("GPSLongitudeRef"),
        Some(&TagValue::Text("E".to_string()))
    );
    assert_eq!(
        record.tags.get("ExposureTime"),
        Some(&TagValue::Text("1/120".to_string()))
    );
    assert!(record.warnings.is_empty(), "{:?}", record.warnings);
}

#[test]
fn preferring_gps_uses_the_lookup() {
    let options = TzOptions {
        prefer_gps_inference: true,
        ..TzOptions::default()
    };
    let lookup = |latitude: f64, longitude: f64| -> anyhow::Result<Option<String>> {
        assert!((latitude - 41.89).abs() < 0.01);
        assert!((longitude - 12.4922).abs() < 0.01);
        Ok(Some("Europe/Rome".to_string()))
    };
    let task = ReadTask::new(first_bag(iphone_photo()), &options, Some(&lookup));
    let resolution = task.timezone();
    let source = resolution.source.as_ref().expect("zone");
    assert_eq!(source.zone, "Europe/Rome");
    assert_eq!(source.source, "GPSLatitude/GPSLongitude");
}

#[test]
fn video_without_offsets_is_read_as_utc() {
    let bag = first_bag(json!([{
        "SourceFile": "GX010123.MP4",
        "MIMEType": "video/mp4",
        "CreateDate": "2023:01:05 09:15:30",
        "MediaCreateDate": "2023:01:05 09:15:30",
        "TrackCreateDate": "0000:00:00 00:00:00"
    }]));
    let options = TzOptions::default();
    let record = ReadTask::new(bag, &options, None).normalize();

    assert_eq!(record.tz.as_deref(), Some("UTC"));
    assert_eq!(record.tz_source.as_deref(), Some("defaultVideosToUTC"));
    assert_eq!(
        date_time_text(record.tags.get("MediaCreateDate")),
        "2023:01:05 09:15:30+00:00"
    );
    assert_eq!(
        record.tags.get("TrackCreateDate"),
        Some(&TagValue::Text("0000:00:00 00:00:00".to_string()))
    );
    assert!(record.warnings.is_empty(), "{:?}", record.warnings);
}

#[test]
fn broken_lookup_degrades_to_a_warning() {
    struct Offline;

    impl GeoTzLookup for Offline {
        fn lookup(&self, _: f64, _: f64) -> anyhow::Result<Option<String>> {
            anyhow::bail!("timezone database not loaded")
        }
    }

    let bag = first_bag(json!([{
        "DateTimeOriginal": "2018:04:01 12:00:00",
        "GPSPosition": "40.6892 N, 74.0445 W"
    }]));
    let options = TzOptions::default();
    let record = ReadTask::new(bag, &options, Some(&Offline)).normalize();

    assert_eq!(record.tz, None);
    assert_eq!(
        date_time_text(record.tags.get("DateTimeOriginal")),
        "2018:04:01 12:00:00"
    );
    assert_eq!(record.warnings.len(), 1);
    assert!(record.warnings[0].contains("timezone database not loaded"));
    assert_eq!(
        record.tags.get("GPSLongitudeRef"),
        Some(&TagValue::Text("W".to_string()))
    );
}

#[test]
fn serialized_record_keeps_tag_names() {
    let bag = first_bag(json!([{
        "SourceFile": "a.jpg",
        "DateTimeOriginal": "2020:02:02 20:20:20",
        "TimeZone": "-05:00"
    }]));
    let options = TzOptions::default();
    let record = ReadTask::new(bag, &options, None).normalize();
    let rendered = serde_json::to_value(&record).expect("serialize");

    assert_eq!(rendered["SourceFile"], json!("a.jpg"));
    assert_eq!(rendered["DateTimeOriginal"], json!("2020-02-02T20:20:20-05:00"));
    assert_eq!(rendered["tz"], json!("UTC-5"));
    assert_eq!(rendered["tzSource"], json!("TimeZone"));
}
