use crate::strings::round_to_places;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Decimal places kept when converting to decimal degrees (about 0.11 m).
pub const GPS_DECIMAL_PLACES: i32 = 6;

const NUMBER: &str = r"([-+]?\d+(?:\.\d+)?)";
const UNSIGNED: &str = r"(\d+(?:\.\d+)?)";
const DEGREE_MARK: &str = r"(?:°|º|deg)";
const MINUTE_MARK: &str = r"(?:'|′|’)";
const SECOND_MARK: &str = r#"(?:''|"|″|”)"#;
const DIRECTION: &str = r"(?:[\s,]*([NSEW])[a-z]*\b)?";

static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    build_pattern(&format!(
        r"{NUMBER}\s*{DEGREE_MARK}\s*{UNSIGNED}\s*{MINUTE_MARK}\s*{UNSIGNED}\s*{SECOND_MARK}"
    ))
});
static DM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    build_pattern(&format!(r"{NUMBER}\s*{DEGREE_MARK}\s*{UNSIGNED}\s*{MINUTE_MARK}"))
});
static D_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| build_pattern(&format!(r"{NUMBER}\s*{DEGREE_MARK}?")));
static DECIMAL_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^{NUMBER}\s*(?:,\s*|\s+){NUMBER}$"))
        .expect("decimal pair regex should compile")
});

fn build_pattern(body: &str) -> Regex {
    Regex::new(&format!("(?i)^{body}{DIRECTION}")).expect("coordinate regex should compile")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn max_degrees(self) -> u16 {
        match self {
            Axis::Latitude => 90,
            Axis::Longitude => 180,
        }
    }

    pub fn positive_ref(self) -> char {
        match self {
            Axis::Latitude => 'N',
            Axis::Longitude => 'E',
        }
    }

    pub fn negative_ref(self) -> char {
        match self {
            Axis::Latitude => 'S',
            Axis::Longitude => 'W',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("Latitude"),
            Axis::Longitude => f.write_str("Longitude"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    N,
    S,
    E,
    W,
}

impl Direction {
    fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_uppercase() {
            'N' => Some(Direction::N),
            'S' => Some(Direction::S),
            'E' => Some(Direction::E),
            'W' => Some(Direction::W),
            _ => None,
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Direction::N | Direction::S => Axis::Latitude,
            Direction::E | Direction::W => Axis::Longitude,
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Direction::S | Direction::W)
    }

    pub fn as_char(self) -> char {
        match self {
            Direction::N => 'N',
            Direction::S => 'S',
            Direction::E => 'E',
            Direction::W => 'W',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    /// Decimal degrees.
    D,
    /// Degrees and decimal minutes.
    DM,
    /// Degrees, minutes and seconds.
    DMS,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    pub degrees: f64,
    pub minutes: Option<f64>,
    pub seconds: Option<f64>,
    pub direction: Option<Direction>,
    pub format: CoordinateFormat,
    pub remainder: String,
}

impl Coordinate {
    fn magnitude(&self) -> f64 {
        self.degrees.abs()
            + self.minutes.unwrap_or(0.0) / 60.0
            + self.seconds.unwrap_or(0.0) / 3600.0
    }

    /// Signed decimal degrees. A direction letter decides the sign; without
    /// one the sign of `degrees` is kept.
    pub fn to_decimal(&self) -> f64 {
        let negative = match self.direction {
            Some(direction) => direction.is_negative(),
            None => self.degrees.is_sign_negative(),
        };
        let magnitude = self.magnitude();
        round_to_places(
            if negative { -magnitude } else { magnitude },
            GPS_DECIMAL_PLACES,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateParseError {
    #[error("Input string cannot be empty")]
    Empty,
    #[error("Invalid coordinate format: {0:?}")]
    InvalidFormat(String),
    #[error("Unexpected characters after coordinate: {0:?}")]
    UnexpectedRemainder(String),
    #[error("Minutes must be between 0 and 60, got {0}")]
    InvalidMinutes(f64),
    #[error("Seconds must be between 0 and 60, got {0}")]
    InvalidSeconds(f64),
    #[error("Degrees must be between -{max} and {max}")]
    InvalidDegrees { max: u16 },
    #[error("Missing direction in coordinate {0:?}")]
    MissingDirection(String),
    #[error("Multiple {0} values found")]
    DuplicateAxis(Axis),
    #[error("Missing {0} value")]
    MissingAxis(Axis),
    #[error("{axis} {value} is out of range [-{max}, {max}]")]
    OutOfRange { axis: Axis, value: f64, max: u16 },
}

/// Parses one coordinate in DMS, DM or D layout (tried in that order).
///
/// With `allow_remainder` the text following the match is returned in
/// [`Coordinate::remainder`]; otherwise trailing text is an error.
pub fn parse_coordinate(
    input: &str,
    allow_remainder: bool,
) -> Result<Coordinate, CoordinateParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoordinateParseError::Empty);
    }

    let layouts: [(&Regex, CoordinateFormat); 3] = [
        (&DMS_PATTERN, CoordinateFormat::DMS),
        (&DM_PATTERN, CoordinateFormat::DM),
        (&D_PATTERN, CoordinateFormat::D),
    ];

    for (pattern, format) in layouts {
        let Some(caps) = pattern.captures(input) else {
            continue;
        };
        let matched_len = caps.get(0).map(|m| m.end()).unwrap_or_default();
        let remainder = input[matched_len..].trim().to_string();
        if !allow_remainder && !remainder.is_empty() {
            return Err(CoordinateParseError::UnexpectedRemainder(remainder));
        }
        return build_coordinate(&caps, format, remainder);
    }

    Err(CoordinateParseError::InvalidFormat(input.to_string()))
}

fn build_coordinate(
    caps: &Captures<'_>,
    format: CoordinateFormat,
    remainder: String,
) -> Result<Coordinate, CoordinateParseError> {
    let number = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<f64>().ok());

    let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    let degrees =
        number(1).ok_or_else(|| CoordinateParseError::InvalidFormat(matched.to_string()))?;
    let (minutes, seconds, direction_idx) = match format {
        CoordinateFormat::DMS => (number(2), number(3), 4),
        CoordinateFormat::DM => (number(2), None, 3),
        CoordinateFormat::D => (None, None, 2),
    };
    let direction = caps
        .get(direction_idx)
        .and_then(|m| m.as_str().chars().next())
        .and_then(Direction::from_char);

    if let Some(m) = minutes {
        if !(0.0..60.0).contains(&m) {
            return Err(CoordinateParseError::InvalidMinutes(m));
        }
    }
    if let Some(s) = seconds {
        if !(0.0..60.0).contains(&s) {
            return Err(CoordinateParseError::InvalidSeconds(s));
        }
    }

    let coordinate = Coordinate {
        degrees,
        minutes,
        seconds,
        direction,
        format,
        remainder,
    };

    // the axis is unknown without a direction, so only the wider bound applies
    let max = direction
        .map(|d| d.axis().max_degrees())
        .unwrap_or(Axis::Longitude.max_degrees());
    if coordinate.magnitude() > f64::from(max) {
        return Err(CoordinateParseError::InvalidDegrees { max });
    }

    Ok(coordinate)
}

/// Parses a latitude/longitude pair out of one string.
///
/// Accepts either a bare decimal pair (`"37.7749, -122.4194"`, latitude
/// first) or two coordinates carrying direction letters in any order.
pub fn parse_coordinates(input: &str) -> Result<LatLon, CoordinateParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoordinateParseError::Empty);
    }

    if let Some(caps) = DECIMAL_PAIR.captures(input) {
        let pick = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<f64>().ok());
        if let (Some(lat), Some(lon)) = (pick(1), pick(2)) {
            return Ok(LatLon {
                latitude: validate_axis(Axis::Latitude, round_to_places(lat, GPS_DECIMAL_PLACES))?,
                longitude: validate_axis(
                    Axis::Longitude,
                    round_to_places(lon, GPS_DECIMAL_PLACES),
                )?,
            });
        }
    }

    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;
    let mut remaining = input.to_string();

    while !remaining.is_empty() {
        let coordinate = parse_coordinate(&remaining, true)?;
        let Some(direction) = coordinate.direction else {
            return Err(CoordinateParseError::MissingDirection(remaining));
        };
        let axis = direction.axis();
        let slot = match axis {
            Axis::Latitude => &mut latitude,
            Axis::Longitude => &mut longitude,
        };
        if slot.is_some() {
            return Err(CoordinateParseError::DuplicateAxis(axis));
        }
        *slot = Some(validate_axis(axis, coordinate.to_decimal())?);

        remaining = coordinate
            .remainder
            .trim_start_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .to_string();
    }

    Ok(LatLon {
        latitude: latitude.ok_or(CoordinateParseError::MissingAxis(Axis::Latitude))?,
        longitude: longitude.ok_or(CoordinateParseError::MissingAxis(Axis::Longitude))?,
    })
}

fn validate_axis(axis: Axis, value: f64) -> Result<f64, CoordinateParseError> {
    let max = axis.max_degrees();
    if value.abs() > f64::from(max) {
        return Err(CoordinateParseError::OutOfRange { axis, value, max });
    }
    Ok(value)
}
