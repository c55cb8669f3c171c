use serde::{Deserialize, Serialize};

use crate::utils::approx_distance_km;

/// A named point where passengers can board or alight.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Stop {
    pub name: String,
    /// WGS84 longitude
    pub lon: f64,
    /// WGS84 latitude
    pub lat: f64,
}

impl Stop {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Stop {
            name: name.into(),
            lon,
            lat,
        }
    }

    /// (lon, lat) in the order the directions API and GeoJSON expect
    pub fn lon_lat(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    pub fn distance_km(&self, other: &Stop) -> f64 {
        approx_distance_km(self.lon_lat(), other.lon_lat())
    }
}
