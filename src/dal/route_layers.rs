//! Optional line datasets drawn under the stop markers
use std::path::Path;

use geojson::GeoJson;
use serde::Serialize;
use tracing::{info, warn};

/// At most this many `route_{n}.geojson` files are picked up.
pub const MAX_ROUTE_LAYERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLayer {
    pub name: String,
    /// Each line as (lon, lat) pairs
    pub lines: Vec<Vec<(f64, f64)>>,
}

/// Loads `route_1.geojson` ..= `route_4.geojson` from `dir`.
///
/// Missing files are skipped silently, unreadable ones are logged and skipped.
#[tracing::instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
pub fn load_route_layers(dir: impl AsRef<Path>) -> Vec<RouteLayer> {
    let dir = dir.as_ref();
    let mut layers = vec![];

    for n in 1..=MAX_ROUTE_LAYERS {
        let name = format!("route_{n}");
        let path = dir.join(format!("{name}.geojson"));
        if !path.exists() {
            continue;
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(raw.parse::<GeoJson>()?));

        match parsed {
            Ok(gj) => {
                let lines = collect_lines(&gj);
                info!("loaded route layer {} with {} lines", name, lines.len());
                layers.push(RouteLayer { name, lines });
            }
            Err(e) => warn!("skipping route layer {}: {e}", path.display()),
        }
    }

    layers
}

fn collect_lines(gj: &GeoJson) -> Vec<Vec<(f64, f64)>> {
    let mut lines = vec![];
    match gj {
        GeoJson::FeatureCollection(fc) => {
            for f in &fc.features {
                if let Some(g) = &f.geometry {
                    push_geometry(&g.value, &mut lines);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(g) = &f.geometry {
                push_geometry(&g.value, &mut lines);
            }
        }
        GeoJson::Geometry(g) => push_geometry(&g.value, &mut lines),
    }
    lines
}

fn push_geometry(value: &geojson::Value, lines: &mut Vec<Vec<(f64, f64)>>) {
    let to_line = |positions: &Vec<Vec<f64>>| {
        positions
            .iter()
            .filter(|p| p.len() >= 2)
            .map(|p| (p[0], p[1]))
            .collect::<Vec<_>>()
    };

    match value {
        geojson::Value::LineString(ls) => lines.push(to_line(ls)),
        geojson::Value::MultiLineString(mls) => lines.extend(mls.iter().map(to_line)),
        geojson::Value::GeometryCollection(gs) => {
            for g in gs {
                push_geometry(&g.value, lines);
            }
        }
        _ => {}
    }
}
