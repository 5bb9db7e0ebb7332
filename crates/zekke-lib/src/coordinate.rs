//! Geographic coordinates with fixed-precision normalization.
//!
//! Every coordinate that enters the library is normalized so that two
//! renderings of the same point compare equal regardless of how many digits
//! the caller supplied. Normalization rounds each component to
//! [`MAX_FRACTION_DIGITS`] fractional digits using Rust's locale-independent
//! float formatting, then parses the result back.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Fractional digits kept by [`Coordinate::normalize`].
pub const MAX_FRACTION_DIGITS: usize = 12;

/// Largest absolute latitude accepted by the transport layers.
pub const MAX_LATITUDE: f64 = 85.0;

/// Largest absolute longitude accepted by the transport layers.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Meters covered by one degree of arc (nautical-mile based conversion).
pub const METERS_PER_DEGREE: f64 = 60.0 * 1.1515 * 1.609344 * 1000.0;

/// A latitude/longitude pair whose components may be absent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "RawCoordinate")]
pub struct Coordinate {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<RawCoordinate> for Coordinate {
    fn from(raw: RawCoordinate) -> Self {
        Coordinate::normalize(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Build a complete coordinate from raw components.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::normalize(Some(latitude), Some(longitude))
    }

    /// Normalize raw components. Absent components stay absent and no range
    /// clamping is applied.
    pub fn normalize(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        Self {
            latitude: latitude.map(round_component),
            longitude: longitude.map(round_component),
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// Both components present.
    pub fn is_complete(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Components as a pair when both are present.
    pub fn components(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Whether both components are present and within the accepted ranges.
    pub fn is_within_bounds(&self) -> bool {
        match self.components() {
            Some((lat, lng)) => lat.abs() <= MAX_LATITUDE && lng.abs() <= MAX_LONGITUDE,
            None => false,
        }
    }

    /// Great-circle distance in meters using the spherical law of cosines.
    ///
    /// Returns `None` when either coordinate is incomplete.
    pub fn great_circle_distance(&self, other: &Coordinate) -> Option<f64> {
        let (lat1, lng1) = self.components()?;
        let (lat2, lng2) = other.components()?;
        let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
        let delta = (lng1 - lng2).to_radians();

        let cosine = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * delta.cos();
        let arc = cosine.clamp(-1.0, 1.0).acos().to_degrees();
        Some(arc * METERS_PER_DEGREE)
    }

    /// Position on the unit sphere.
    pub fn unit_vector(&self) -> Option<[f64; 3]> {
        let (lat, lng) = self.components()?;
        let (lat, lng) = (lat.to_radians(), lng.to_radians());
        Some([lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()])
    }

    /// Latitude/longitude window enclosing every point within `radius`
    /// meters. Used to prefilter candidates before exact distance checks.
    pub fn bounding_box(&self, radius: f64) -> Option<BoundingBox> {
        let (lat, lng) = self.components()?;
        let lat_margin = radius / METERS_PER_DEGREE;
        let cos_lat = lat.to_radians().cos();
        let lng_margin = if cos_lat <= f64::EPSILON {
            180.0
        } else {
            (lat_margin / cos_lat).min(180.0)
        };

        Some(BoundingBox {
            min_latitude: lat - lat_margin,
            max_latitude: lat + lat_margin,
            min_longitude: lng - lng_margin,
            max_longitude: lng + lng_margin,
        })
    }
}

/// Axis-aligned latitude/longitude window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// True when the window crosses the antimeridian and a plain range check
    /// on longitude would miss candidates.
    pub fn wraps_longitude(&self) -> bool {
        self.min_longitude < -180.0 || self.max_longitude > 180.0
    }
}

fn round_component(value: f64) -> f64 {
    let rounded = format!("{:.*}", MAX_FRACTION_DIGITS, value)
        .parse::<f64>()
        .unwrap_or(value);
    // -0.0 and 0.0 must hash identically.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.latitude.map(f64::to_bits) == other.latitude.map(f64::to_bits)
            && self.longitude.map(f64::to_bits) == other.longitude.map(f64::to_bits)
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.latitude.map(f64::to_bits).hash(state);
        self.longitude.map(f64::to_bits).hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.latitude {
            Some(lat) => write!(f, "({lat}, ")?,
            None => f.write_str("(?, ")?,
        }
        match self.longitude {
            Some(lng) => write!(f, "{lng})"),
            None => f.write_str("?)"),
        }
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    /// Parse `"latitude,longitude"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidQuery {
            message: format!("expected 'latitude,longitude', got '{s}'"),
        };

        let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
        if !lat.is_finite() || !lng.is_finite() {
            return Err(invalid());
        }
        Ok(Coordinate::new(lat, lng))
    }
}
