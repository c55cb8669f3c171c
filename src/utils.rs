/// Kilometres per degree used by the straight-line approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Straight-line distance between two (lon, lat) points in kilometres.
///
/// Plain euclidean distance in degrees scaled by [`KM_PER_DEGREE`]. Good enough for
/// comparing stops inside one city, useless for anything further apart.
pub fn approx_distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;

    dx.hypot(dy) * KM_PER_DEGREE
}

/// Round a coordinate to 2 decimals for display on the map.
pub fn round_display(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
