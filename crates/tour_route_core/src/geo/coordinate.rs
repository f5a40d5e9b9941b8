use std::fmt;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;
const NINETY: f64 = 90.0;
const ONE_EIGHTY: f64 = NINETY * 2.0;

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Builds a coordinate from the nullable columns a venue row carries.
    /// Anything missing, non-finite or out of range yields `None`.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        let coordinate = Self::new(latitude?, longitude?);
        coordinate.is_valid().then_some(coordinate)
    }

    pub fn is_valid(self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-NINETY..=NINETY).contains(&self.latitude)
            && (-ONE_EIGHTY..=ONE_EIGHTY).contains(&self.longitude)
    }

    /// Great-circle (haversine) distance in kilometres.
    pub fn distance_km(&self, rhs: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), rhs.latitude.to_radians());
        let dlat = (rhs.latitude - self.latitude).to_radians();
        let dlng = (rhs.longitude - self.longitude).to_radians();
        let s1 = (dlat / 2.0).sin();
        let s2 = (dlng / 2.0).sin();
        let h = s1 * s1 + lat1.cos() * lat2.cos() * s2 * s2;
        // Rounding can push `h` a hair above 1 for antipodal points.
        2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
    }
}

/// Free-function form of [`GeoCoordinate::distance_km`].
#[inline]
pub fn distance_km(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    a.distance_km(&b)
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b1 = ryu::Buffer::new();
        let mut b2 = ryu::Buffer::new();
        write!(
            f,
            "{},{}",
            b1.format(self.latitude),
            b2.format(self.longitude)
        )
    }
}
