use crate::config::TzOptions;
use crate::date_time::DateTimeWithZone;
use crate::datetime_parser::{parse_date, parse_date_time, parse_time};
use crate::gps::{reconcile, GpsLocationTags, GpsResult};
use crate::strings::is_blank;
use crate::tags::TagBag;
use crate::zone::{likely_offset_minutes, normalize_zone, normalize_zone_value, Zone, ZoneError};
use serde::Serialize;
use serde_json::Value;

/// Tags that state an offset or zone outright, highest priority first.
pub const EXPLICIT_ZONE_TAGS: &[&str] = &[
    "TimeZone",
    "OffsetTimeOriginal",
    "OffsetTimeDigitized",
    "OffsetTime",
    "TimeZoneOffset",
];

/// Tags whose zoneless values are nonetheless UTC.
pub const UTC_STAMP_TAGS: &[&str] = &["GPSDateTime", "DateTimeUTC"];

pub const GPS_ZONE_SOURCE: &str = "GPSLatitude/GPSLongitude";
pub const GEOLOCATION_ZONE_TAG: &str = "GeolocationTimeZone";
pub const VIDEO_DEFAULT_SOURCE: &str = "defaultVideosToUTC";
const TIMESTAMP_TAG: &str = "TimeStamp";

/// The winning zone and which strategy produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TzSource {
    /// Display name, e.g. `UTC-7` or `America/Los_Angeles`.
    pub zone: String,
    /// Identifier accepted by [`normalize_zone`], e.g. `UTC-07:00`.
    pub tz: String,
    pub source: String,
}

impl TzSource {
    pub fn new(zone: Zone, source: impl Into<String>) -> Self {
        Self {
            zone: zone.name(),
            tz: zone.identifier(),
            source: source.into(),
        }
    }

    pub fn to_zone(&self) -> Result<Zone, ZoneError> {
        normalize_zone(&self.tz)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TzResolution {
    pub source: Option<TzSource>,
    pub warnings: Vec<String>,
}

/// Maps a coordinate pair to a zone name. Failures are reported to the
/// caller as warnings; they never abort a read.
pub trait GeoTzLookup {
    fn lookup(&self, latitude: f64, longitude: f64) -> anyhow::Result<Option<String>>;
}

impl<F> GeoTzLookup for F
where
    F: Fn(f64, f64) -> anyhow::Result<Option<String>>,
{
    fn lookup(&self, latitude: f64, longitude: f64) -> anyhow::Result<Option<String>> {
        self(latitude, longitude)
    }
}

/// One way of inferring a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ExplicitTags,
    Gps,
    Datestamps,
    VideoDefault,
    UtcOffset,
    Timestamp,
}

const DEFAULT_ORDER: &[Strategy] = &[
    Strategy::ExplicitTags,
    Strategy::Gps,
    Strategy::Datestamps,
    Strategy::VideoDefault,
    Strategy::UtcOffset,
    Strategy::Timestamp,
];

/// Strategies in the order they are tried for `options`.
pub fn strategy_order(options: &TzOptions) -> Vec<Strategy> {
    let mut order = Vec::with_capacity(DEFAULT_ORDER.len());
    if options.prefer_gps_inference {
        order.push(Strategy::Gps);
    }
    for strategy in DEFAULT_ORDER {
        if !order.contains(strategy) {
            order.push(*strategy);
        }
    }
    order
}

struct Inputs<'a> {
    tags: &'a TagBag,
    gps: &'a GpsResult,
    options: &'a TzOptions,
    lookup: Option<&'a dyn GeoTzLookup>,
}

impl Strategy {
    fn run(self, inputs: &Inputs<'_>, warnings: &mut Vec<String>) -> Option<TzSource> {
        match self {
            Strategy::ExplicitTags => from_explicit_tags(inputs.tags),
            Strategy::Gps => from_gps(inputs, warnings),
            Strategy::Datestamps => inputs
                .options
                .infer_timezone_from_datestamps
                .then(|| from_datestamps(inputs.tags, inputs.options))
                .flatten(),
            Strategy::VideoDefault => (inputs.options.default_videos_to_utc
                && inputs.tags.is_video())
            .then(|| TzSource::new(Zone::utc(), VIDEO_DEFAULT_SOURCE)),
            Strategy::UtcOffset => inputs
                .options
                .infer_timezone_from_utc_offset
                .then(|| from_utc_offset(inputs.tags, inputs.options))
                .flatten(),
            Strategy::Timestamp => inputs
                .options
                .infer_timezone_from_timestamps
                .then(|| from_timestamp(inputs.tags, inputs.options))
                .flatten(),
        }
    }
}

/// Reconciles GPS and resolves the zone of one tag bag.
pub fn resolve_timezone(
    tags: &TagBag,
    options: &TzOptions,
    lookup: Option<&dyn GeoTzLookup>,
) -> TzResolution {
    let gps = reconcile(
        &GpsLocationTags::from_tags(tags),
        options.ignore_zero_zero_lat_lon,
    );
    resolve_with_gps(tags, &gps, options, lookup)
}

/// Tries each strategy in [`strategy_order`]; the first hit wins.
pub fn resolve_with_gps(
    tags: &TagBag,
    gps: &GpsResult,
    options: &TzOptions,
    lookup: Option<&dyn GeoTzLookup>,
) -> TzResolution {
    let inputs = Inputs {
        tags,
        gps,
        options,
        lookup,
    };
    let mut warnings = Vec::new();
    for strategy in strategy_order(options) {
        if let Some(source) = strategy.run(&inputs, &mut warnings) {
            log::debug!(
                "{strategy:?} resolved zone {} from {}",
                source.zone,
                source.source
            );
            return TzResolution {
                source: Some(source),
                warnings,
            };
        }
    }
    TzResolution {
        source: None,
        warnings,
    }
}

fn from_explicit_tags(tags: &TagBag) -> Option<TzSource> {
    EXPLICIT_ZONE_TAGS.iter().find_map(|tag| {
        let value = tags.get(tag).filter(|v| !is_blank_value(v))?;
        match normalize_zone_value(value) {
            Ok(zone) => Some(TzSource::new(zone, *tag)),
            Err(err) => {
                log::debug!("ignoring {tag}: {err}");
                None
            }
        }
    })
}

fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => is_blank(s),
        _ => false,
    }
}

fn from_gps(inputs: &Inputs<'_>, warnings: &mut Vec<String>) -> Option<TzSource> {
    let lat_lon = inputs.gps.location()?.lat_lon()?;

    if inputs.options.use_geolocation_time_zone {
        if let Some(name) = inputs.tags.get_str(GEOLOCATION_ZONE_TAG) {
            match normalize_zone(name) {
                Ok(zone) => return Some(TzSource::new(zone, GEOLOCATION_ZONE_TAG)),
                Err(err) => log::debug!("ignoring {GEOLOCATION_ZONE_TAG}: {err}"),
            }
        }
    }

    let lookup = inputs.lookup?;
    match lookup.lookup(lat_lon.latitude, lat_lon.longitude) {
        Ok(Some(name)) => match normalize_zone(&name) {
            Ok(zone) => Some(TzSource::new(zone, GPS_ZONE_SOURCE)),
            Err(err) => {
                log::debug!("lookup returned unusable zone {name:?}: {err}");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            let message = format!(
                "Failed to find time zone for {}, {}: {err:#}",
                lat_lon.latitude, lat_lon.longitude
            );
            log::warn!("{message}");
            warnings.push(message);
            None
        }
    }
}

/// First configured datestamp carrying its own non-UTC offset.
fn from_datestamps(tags: &TagBag, options: &TzOptions) -> Option<TzSource> {
    options.infer_timezone_from_datestamp_tags.iter().find_map(|tag| {
        let zone = parse_date_time(tags.get_str(tag)?, None)?.zone()?;
        (!zone.is_utc()).then(|| TzSource::new(zone, tag.as_str()))
    })
}

/// First configured datestamp with no offset of its own.
fn first_local_stamp<'a>(
    tags: &TagBag,
    options: &'a TzOptions,
) -> Option<(&'a str, DateTimeWithZone)> {
    options.infer_timezone_from_datestamp_tags.iter().find_map(|tag| {
        let value = parse_date_time(tags.get_str(tag)?, None)?;
        (!value.has_zone()).then_some((tag.as_str(), value))
    })
}

/// `GPSDateStamp` + `GPSTimeStamp` as one UTC value.
pub fn combined_gps_stamp(tags: &TagBag) -> Option<DateTimeWithZone> {
    let date = parse_date(tags.get_str("GPSDateStamp")?)?;
    let time = parse_time(tags.get_str("GPSTimeStamp")?)?;
    DateTimeWithZone::from_parts(date, time, Some(Zone::utc()))
}

fn first_utc_stamp(tags: &TagBag) -> Option<(&'static str, DateTimeWithZone)> {
    UTC_STAMP_TAGS
        .iter()
        .find_map(|tag| {
            let value = parse_date_time(tags.get_str(tag)?, Some(Zone::utc()))?;
            Some((*tag, value))
        })
        .or_else(|| combined_gps_stamp(tags).map(|value| ("GPSDateStamp/GPSTimeStamp", value)))
}

fn offset_between(local: &DateTimeWithZone, utc: &DateTimeWithZone) -> Option<Zone> {
    let utc = utc.to_utc()?.naive_utc();
    let delta = local.naive_local() - utc;
    let minutes = likely_offset_minutes(delta.num_seconds() as f64 / 60.0)?;
    Zone::from_offset_minutes(minutes).ok()
}

fn from_utc_offset(tags: &TagBag, options: &TzOptions) -> Option<TzSource> {
    let (utc_tag, utc) = first_utc_stamp(tags)?;
    let (local_tag, local) = first_local_stamp(tags, options)?;
    let zone = offset_between(&local, &utc)?;
    Some(TzSource::new(
        zone,
        format!("offset between {local_tag} and {utc_tag}"),
    ))
}

fn from_timestamp(tags: &TagBag, options: &TzOptions) -> Option<TzSource> {
    let stamp = match tags.get(TIMESTAMP_TAG)? {
        Value::Number(n) => DateTimeWithZone::from_epoch_millis(n.as_i64()?, Zone::utc())?,
        Value::String(s) => parse_date_time(s, Some(Zone::utc()))?,
        _ => return None,
    };
    let (local_tag, local) = first_local_stamp(tags, options)?;
    let zone = offset_between(&local, &stamp)?;
    Some(TzSource::new(
        zone,
        format!("offset between {local_tag} and {TIMESTAMP_TAG}"),
    ))
}
