//! Stop reference data, loaded once at startup and read-only afterwards
use std::collections::HashMap;
use std::path::Path;

use geojson::{FeatureCollection, GeoJson, JsonValue};
use itertools::Itertools;
use tracing::{info, warn};

use crate::model::stop::Stop;
use crate::utils::approx_distance_km;

/// Attribute holding the stop name in the source dataset.
pub const DEFAULT_NAME_PROPERTY: &str = "bus_stops";

#[derive(thiserror::Error, Debug)]
pub enum StopRegistryError {
    #[error("error reading the stops file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("error parsing the stops file: {0}")]
    Parse(#[from] geojson::Error),

    #[error("stops file must be a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    #[error("stops file declares crs {0}, only EPSG:4326 coordinates are supported")]
    UnsupportedCrs(String),

    #[error("feature {index} has no point geometry")]
    NotAPoint { index: usize },

    #[error("feature {index} has no \"{property}\" property")]
    MissingName { index: usize, property: String },

    #[error("stops file contains no stops")]
    Empty,
}

/// Lookup of a stop name that isn't in the registry.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("unknown stop \"{0}\"")]
pub struct UnknownStop(pub String);

/// Immutable table of stops keyed by name.
#[derive(Debug)]
pub struct StopRegistry {
    stops: Vec<Stop>,
    by_name: HashMap<String, usize>,
}

impl StopRegistry {
    /// Builds the registry from stops in file order. Later duplicates of a name are dropped.
    pub fn new(stops: Vec<Stop>) -> Result<Self, StopRegistryError> {
        if stops.is_empty() {
            return Err(StopRegistryError::Empty);
        }

        let mut unique = Vec::with_capacity(stops.len());
        let mut by_name = HashMap::with_capacity(stops.len());
        for stop in stops {
            if by_name.contains_key(&stop.name) {
                warn!("duplicate stop name \"{}\", keeping the first one", stop.name);
                continue;
            }
            by_name.insert(stop.name.clone(), unique.len());
            unique.push(stop);
        }

        Ok(StopRegistry {
            stops: unique,
            by_name,
        })
    }

    #[tracing::instrument(err, skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>, name_property: &str) -> Result<Self, StopRegistryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| StopRegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let registry = Self::from_geojson_str(&raw, name_property)?;
        info!("loaded {} stops", registry.len());

        Ok(registry)
    }

    pub fn from_geojson_str(raw: &str, name_property: &str) -> Result<Self, StopRegistryError> {
        let collection = match raw.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(StopRegistryError::NotAFeatureCollection),
        };

        check_crs(&collection)?;

        let stops = collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| {
                let (lon, lat) = match feature.geometry.map(|g| g.value) {
                    Some(geojson::Value::Point(p)) if p.len() >= 2 => (p[0], p[1]),
                    _ => return Err(StopRegistryError::NotAPoint { index }),
                };

                let name = feature
                    .properties
                    .as_ref()
                    .and_then(|props| props.get(name_property))
                    .and_then(name_to_string)
                    .ok_or_else(|| StopRegistryError::MissingName {
                        index,
                        property: name_property.to_string(),
                    })?;

                Ok(Stop::new(name, lon, lat))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(stops)
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Unique stop names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stops.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, name: &str) -> Result<&Stop, UnknownStop> {
        self.by_name
            .get(name)
            .map(|&i| &self.stops[i])
            .ok_or_else(|| UnknownStop(name.to_string()))
    }

    /// Mean latitude and longitude, as (lat, lon)
    pub fn center(&self) -> (f64, f64) {
        let n = self.stops.len() as f64;
        let (lat, lon) = self
            .stops
            .iter()
            .fold((0.0, 0.0), |(lat, lon), s| (lat + s.lat, lon + s.lon));

        (lat / n, lon / n)
    }

    /// Straight-line distance between two registered stops
    pub fn distance_km(&self, a: &str, b: &str) -> Result<f64, UnknownStop> {
        Ok(approx_distance_km(
            self.get(a)?.lon_lat(),
            self.get(b)?.lon_lat(),
        ))
    }

    /// Resolves names to stops keeping the given order
    pub fn resolve<'a, S: AsRef<str>>(&'a self, names: &[S]) -> Result<Vec<&'a Stop>, UnknownStop> {
        names.iter().map(|n| self.get(n.as_ref())).try_collect()
    }
}

/// Coerces a name attribute to a string, the way the dataset's numeric names should read.
fn name_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// RFC 7946 coordinates are WGS84. Older files may still carry a `crs` member.
fn check_crs(collection: &FeatureCollection) -> Result<(), StopRegistryError> {
    let Some(crs) = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
    else {
        return Ok(());
    };

    let name = crs
        .pointer("/properties/name")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();

    let accepted = ["EPSG:4326", "CRS84", "EPSG::4326"];
    if accepted.iter().any(|a| name.ends_with(a)) {
        Ok(())
    } else {
        Err(StopRegistryError::UnsupportedCrs(name.to_string()))
    }
}
