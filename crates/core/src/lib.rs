mod config;
mod coordinate;
mod date_time;
mod datetime_parser;
mod exif_reader;
mod gps;
mod partial;
mod read_task;
mod strings;
mod tags;
mod timezone;
mod zone;

pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
    TzOptions, DEFAULT_DATESTAMP_TAGS,
};
pub use coordinate::{
    parse_coordinate, parse_coordinates, Axis, Coordinate, CoordinateFormat,
    CoordinateParseError, Direction, LatLon, GPS_DECIMAL_PLACES,
};
pub use date_time::DateTimeWithZone;
pub use datetime_parser::{
    is_placeholder, parse_date, parse_date_time, parse_date_time_strict, parse_time,
};
pub use exif_reader::{read_tags, start_exiftool};
pub use gps::{reconcile, GpsLocation, GpsLocationTags, GpsResult};
pub use partial::{millis_fraction, PartialDate, PartialTime};
pub use read_task::{NormalizedRecord, ReadTask, TagValue};
pub use tags::TagBag;
pub use timezone::{
    combined_gps_stamp, resolve_timezone, resolve_with_gps, strategy_order, GeoTzLookup,
    Strategy, TzResolution, TzSource, EXPLICIT_ZONE_TAGS, UTC_STAMP_TAGS,
};
pub use zone::{
    format_offset, likely_offset_minutes, normalize_zone, normalize_zone_value, Zone, ZoneError,
};
