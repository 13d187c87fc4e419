use crate::coordinate::{
    parse_coordinate, parse_coordinates, Axis, CoordinateParseError, LatLon, GPS_DECIMAL_PLACES,
};
use crate::strings::{blank_to_none, round_to_places, value_to_text};
use crate::tags::TagBag;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How far (in degrees) an independent geolocation estimate may sit from
/// the GPS magnitude and still be trusted to fix signs and refs.
const GEO_PROXIMITY_DEGREES: f64 = 1.0;

/// The raw GPS-related tag values of one file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GpsLocationTags {
    #[serde(rename = "GPSLatitude", default)]
    pub latitude: Option<Value>,
    #[serde(rename = "GPSLatitudeRef", default)]
    pub latitude_ref: Option<String>,
    #[serde(rename = "GPSLongitude", default)]
    pub longitude: Option<Value>,
    #[serde(rename = "GPSLongitudeRef", default)]
    pub longitude_ref: Option<String>,
    #[serde(rename = "GPSPosition", default)]
    pub position: Option<String>,
    #[serde(rename = "GeolocationPosition", default)]
    pub geolocation_position: Option<String>,
}

impl GpsLocationTags {
    pub fn from_tags(tags: &TagBag) -> Self {
        let text = |name: &str| {
            tags.get(name)
                .and_then(value_to_text)
                .filter(|v| !v.trim().is_empty())
        };
        Self {
            latitude: tags.get("GPSLatitude").cloned(),
            latitude_ref: text("GPSLatitudeRef"),
            longitude: tags.get("GPSLongitude").cloned(),
            longitude_ref: text("GPSLongitudeRef"),
            position: text("GPSPosition"),
            geolocation_position: text("GeolocationPosition"),
        }
    }
}

/// Corrected, signed GPS fields. Each ref always agrees with the sign of
/// its value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GpsLocation {
    #[serde(rename = "GPSLatitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "GPSLatitudeRef")]
    pub latitude_ref: Option<char>,
    #[serde(rename = "GPSLongitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "GPSLongitudeRef")]
    pub longitude_ref: Option<char>,
}

impl GpsLocation {
    pub fn lat_lon(&self) -> Option<LatLon> {
        Some(LatLon {
            latitude: self.latitude?,
            longitude: self.longitude?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GpsResult {
    /// No GPS data at all.
    Empty,
    /// GPS data was present but must be dropped.
    Invalid { warnings: Vec<String> },
    Valid {
        location: GpsLocation,
        warnings: Vec<String>,
    },
}

impl GpsResult {
    pub fn warnings(&self) -> &[String] {
        match self {
            GpsResult::Empty => &[],
            GpsResult::Invalid { warnings } | GpsResult::Valid { warnings, .. } => warnings,
        }
    }

    pub fn location(&self) -> Option<&GpsLocation> {
        match self {
            GpsResult::Valid { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, GpsResult::Invalid { .. })
    }
}

#[derive(Debug, Default)]
struct AxisReading {
    value: Option<f64>,
    ref_letter: Option<char>,
}

pub fn reconcile(tags: &GpsLocationTags, ignore_zero_zero: bool) -> GpsResult {
    let mut warnings = Vec::new();
    let mut lat = AxisReading::default();
    let mut lon = AxisReading::default();

    if let Some(position) = blank_to_none(tags.position.as_deref()) {
        match parse_coordinates(position) {
            Ok(parsed) => {
                lat = reading_from_sign(Axis::Latitude, parsed.latitude);
                lon = reading_from_sign(Axis::Longitude, parsed.longitude);
            }
            Err(err) => warnings.push(format!("Error parsing GPSPosition: {err}")),
        }
    }

    if lat.value.is_none() && lon.value.is_none() {
        if let (Some(raw_lat), Some(raw_lon)) = (&tags.latitude, &tags.longitude) {
            lat = read_axis("GPSLatitude", raw_lat, &mut warnings);
            lon = read_axis("GPSLongitude", raw_lon, &mut warnings);
        }
    }

    if ignore_zero_zero && is_zero_zero(lat.value, lon.value) {
        warnings.push("Ignoring zero coordinates".to_string());
        return GpsResult::Invalid { warnings };
    }

    // a lone axis may still carry a plain number
    if lat.value.is_none() {
        lat.value = tags.latitude.as_ref().and_then(Value::as_f64);
    }
    if lon.value.is_none() {
        lon.value = tags.longitude.as_ref().and_then(Value::as_f64);
    }

    if lat.value.is_none() && lon.value.is_none() {
        if warnings.is_empty() {
            return GpsResult::Empty;
        }
        return GpsResult::Invalid { warnings };
    }

    if ignore_zero_zero && is_zero_zero(lat.value, lon.value) {
        warnings.push("Ignoring zero coordinates".to_string());
        return GpsResult::Invalid { warnings };
    }

    let geo = blank_to_none(tags.geolocation_position.as_deref()).and_then(|geo| {
        parse_coordinates(geo)
            .map_err(|err| warnings.push(format!("Error parsing GeolocationPosition: {err}")))
            .ok()
    });

    let mut location = GpsLocation::default();
    let mut is_invalid = false;

    if let Some(value) = lat.value {
        let outcome = correct_axis(
            AxisInput {
                axis: Axis::Latitude,
                value,
                ref_letter: lat.ref_letter.or(first_letter(tags.latitude_ref.as_deref())),
                geo_value: geo.map(|g| g.latitude),
            },
            &mut warnings,
        );
        is_invalid |= outcome.is_none();
        if let Some((value, ref_letter)) = outcome {
            location.latitude = Some(value);
            location.latitude_ref = Some(ref_letter);
        }
    }

    if let Some(value) = lon.value {
        let outcome = correct_axis(
            AxisInput {
                axis: Axis::Longitude,
                value,
                ref_letter: lon.ref_letter.or(first_letter(tags.longitude_ref.as_deref())),
                geo_value: geo.map(|g| g.longitude),
            },
            &mut warnings,
        );
        is_invalid |= outcome.is_none();
        if let Some((value, ref_letter)) = outcome {
            location.longitude = Some(value);
            location.longitude_ref = Some(ref_letter);
        }
    }

    if is_invalid {
        GpsResult::Invalid { warnings }
    } else {
        GpsResult::Valid { location, warnings }
    }
}

fn is_zero_zero(lat: Option<f64>, lon: Option<f64>) -> bool {
    lat == Some(0.0) && lon == Some(0.0)
}

fn reading_from_sign(axis: Axis, value: f64) -> AxisReading {
    AxisReading {
        value: Some(value),
        ref_letter: Some(ref_for_sign(axis, value)),
    }
}

fn read_axis(tag_name: &str, raw: &Value, warnings: &mut Vec<String>) -> AxisReading {
    match parse_axis_value(raw) {
        Ok(reading) => reading,
        Err(err) => {
            warnings.push(format!("Error parsing {tag_name}: {err}"));
            AxisReading::default()
        }
    }
}

fn parse_axis_value(raw: &Value) -> Result<AxisReading, CoordinateParseError> {
    match raw {
        Value::Number(n) => Ok(AxisReading {
            value: n.as_f64(),
            ref_letter: None,
        }),
        Value::String(s) => {
            let coordinate = parse_coordinate(s, false)?;
            Ok(AxisReading {
                value: Some(coordinate.to_decimal()),
                ref_letter: coordinate.direction.map(|d| d.as_char()),
            })
        }
        other => Err(CoordinateParseError::InvalidFormat(other.to_string())),
    }
}

fn first_letter(value: Option<&str>) -> Option<char> {
    blank_to_none(value)
        .and_then(|v| v.chars().next())
        .map(|ch| ch.to_ascii_uppercase())
}

fn ref_for_sign(axis: Axis, value: f64) -> char {
    if value < 0.0 {
        axis.negative_ref()
    } else {
        axis.positive_ref()
    }
}

struct AxisInput {
    axis: Axis,
    value: f64,
    ref_letter: Option<char>,
    geo_value: Option<f64>,
}

/// Returns the corrected `(value, ref)` pair, or `None` when the value is
/// out of range for its axis.
fn correct_axis(input: AxisInput, warnings: &mut Vec<String>) -> Option<(f64, char)> {
    let AxisInput {
        axis,
        mut value,
        ref_letter,
        geo_value,
    } = input;
    let tag = format!("GPS{axis}");
    let positive = axis.positive_ref();
    let negative = axis.negative_ref();

    let mut ref_letter = match ref_letter {
        Some(letter) if letter == positive || letter == negative => letter,
        Some(letter) => {
            warnings.push(format!("Invalid {tag}Ref {letter:?}, inferring from sign"));
            ref_for_sign(axis, value)
        }
        None => ref_for_sign(axis, value),
    };

    let max = f64::from(axis.max_degrees());
    if value.abs() > max {
        warnings.push(format!("Invalid {tag}: {value} is out of range [-{max}, {max}]"));
        return None;
    }

    if (ref_letter == negative && value > 0.0) || (ref_letter == positive && value < 0.0) {
        value = -value;
    }

    if let Some(geo) = geo_value {
        if (geo.abs() - value.abs()).abs() <= GEO_PROXIMITY_DEGREES {
            if (geo < 0.0) != (value < 0.0) && value != 0.0 {
                value = -value;
                warnings.push(format!("Corrected {tag} sign based on GeolocationPosition"));
            }
            let geo_ref = ref_for_sign(axis, geo);
            if ref_letter != geo_ref {
                ref_letter = geo_ref;
                warnings.push(format!(
                    "Corrected {tag}Ref to {geo_ref} based on GeolocationPosition"
                ));
            }
        }
    }

    let sign_ref = ref_for_sign(axis, value);
    if ref_letter != sign_ref {
        ref_letter = sign_ref;
        warnings.push(format!("Corrected {tag}Ref to {sign_ref} to match coordinate sign"));
    }

    Some((round_to_places(value, GPS_DECIMAL_PLACES), ref_letter))
}
