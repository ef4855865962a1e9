use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AnimatorError, Result};

/// A `"lat,lng"` literal, e.g. `"51.5,-0.1"`.
static COORDINATE_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([-+]?\d+(?:\.\d+)?)\s*,\s*([-+]?\d+(?:\.\d+)?)\s*$").expect("valid regex")
});

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Checks both fields are finite and inside `[-90, 90]` / `[-180, 180]`.
    pub fn validate(self) -> Result<Self> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(AnimatorError::InvalidLocation(format!(
                "coordinate {} has a non-numeric component",
                self
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(AnimatorError::InvalidLocation(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(AnimatorError::InvalidLocation(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(self)
    }

    /// Parses a `"lat,lng"` literal. Returns `None` for anything else, which
    /// callers treat as a free-text address.
    pub fn parse_literal(text: &str) -> Option<Self> {
        let caps = COORDINATE_LITERAL_RE.captures(text)?;
        let lat = caps[1].parse().ok()?;
        let lng = caps[2].parse().ok()?;
        Some(Self { lat, lng })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Where a camera stands or looks: either free text (an address or a
/// `"lat,lng"` literal) or an explicit coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Coordinate(Coordinate),
    Text(String),
}

impl Location {
    pub fn is_empty(&self) -> bool {
        matches!(self, Location::Text(text) if text.trim().is_empty())
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Location::Coordinate(_))
    }

    pub fn as_coordinate(&self) -> Option<Coordinate> {
        match self {
            Location::Coordinate(c) => Some(*c),
            Location::Text(_) => None,
        }
    }
}

impl From<Coordinate> for Location {
    fn from(c: Coordinate) -> Self {
        Location::Coordinate(c)
    }
}

impl From<&str> for Location {
    fn from(text: &str) -> Self {
        Location::Text(text.to_string())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Coordinate(c) => c.fmt(f),
            Location::Text(text) => f.write_str(text),
        }
    }
}

/// Compass bearing between two coordinates, in degrees within `[0, 360)`.
pub trait HeadingCalculator: Send + Sync {
    fn heading(&self, from: Coordinate, to: Coordinate) -> f64;
}

/// Initial great-circle bearing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalHeading;

impl HeadingCalculator for SphericalHeading {
    fn heading(&self, from: Coordinate, to: Coordinate) -> f64 {
        let phi1 = from.lat.to_radians();
        let phi2 = to.lat.to_radians();
        let d_lambda = (to.lng - from.lng).to_radians();

        let y = d_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

        let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if bearing >= 360.0 {
            0.0
        } else {
            bearing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn parses_coordinate_literals() {
        assert_eq!(
            Coordinate::parse_literal("51.5,-0.1"),
            Some(Coordinate::new(51.5, -0.1))
        );
        assert_eq!(
            Coordinate::parse_literal(" +12 , 7.25 "),
            Some(Coordinate::new(12.0, 7.25))
        );
        assert_eq!(Coordinate::parse_literal("E2 7LF"), None);
        assert_eq!(Coordinate::parse_literal("51.5"), None);
        assert_eq!(Coordinate::parse_literal("51.,0"), None);
    }

    #[test]
    fn validate_rejects_out_of_range_and_nan() {
        assert!(Coordinate::new(91.0, 0.0).validate().is_err());
        assert!(Coordinate::new(0.0, -180.5).validate().is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).validate().is_err());
        assert!(Coordinate::new(-90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn location_deserializes_text_and_objects() {
        let text: Location = serde_json::from_str(r#""E2 7LF""#).unwrap();
        assert_eq!(text, Location::Text("E2 7LF".into()));

        let point: Location = serde_json::from_str(r#"{"lat": 1.5, "lng": 2}"#).unwrap();
        assert_eq!(point, Location::Coordinate(Coordinate::new(1.5, 2.0)));

        assert!(serde_json::from_str::<Location>(r#"{"lat": 1.5}"#).is_err());
    }

    #[test]
    fn cardinal_headings() {
        let calc = SphericalHeading;
        let origin = Coordinate::new(0.0, 0.0);
        assert!(close(calc.heading(origin, Coordinate::new(1.0, 0.0)), 0.0));
        assert!(close(calc.heading(origin, Coordinate::new(0.0, 1.0)), 90.0));
        assert!(close(calc.heading(origin, Coordinate::new(-1.0, 0.0)), 180.0));
        assert!(close(calc.heading(origin, Coordinate::new(0.0, -1.0)), 270.0));
    }
}
