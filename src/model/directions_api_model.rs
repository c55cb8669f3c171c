use serde::{Deserialize, Serialize};

/// Body of a directions API response. Only the fields we read are modelled.
#[derive(Debug, Deserialize, Serialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<ApiRoute>,
    /// "Ok" on success, an error code otherwise
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiRoute {
    pub geometry: ApiGeometry,
    /// Seconds
    pub duration: f64,
    /// Meters
    pub distance: f64,
    #[serde(default)]
    pub legs: Vec<ApiLeg>,
}

/// GeoJSON line geometry, requested with `geometries=geojson`
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiGeometry {
    /// (lon, lat) pairs
    pub coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiLeg {
    /// Seconds
    pub duration: f64,
}
