//! What the page script draws on the Leaflet map
use serde::Serialize;

use crate::dal::route_layers::RouteLayer;
use crate::dal::stops::StopRegistry;
use crate::model::itinerary::StopPair;
use crate::model::passenger::PassengerRequest;
use crate::model::stop::Stop;
use crate::services::directions::DirectionsRoute;
use crate::utils::round_display;

pub const TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
pub const TILE_ATTRIBUTION: &str =
    "&copy; OpenStreetMap contributors &copy; CARTO";
pub const DEFAULT_ZOOM: u8 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Stop,
    Start,
    End,
    Waypoint,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: MarkerKind,
    /// [lat, lon], Leaflet order
    pub position: [f64; 2],
    pub tooltip: Option<String>,
    pub popup: Option<String>,
    pub color: &'static str,
    /// Font Awesome icon name
    pub icon: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    /// [lat, lon] pairs
    pub points: Vec<[f64; 2]>,
    pub color: &'static str,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// [lat, lon]
    pub center: [f64; 2],
    pub zoom: u8,
    pub tile_url: &'static str,
    pub attribution: &'static str,
    pub markers: Vec<Marker>,
    pub lines: Vec<Polyline>,
}

/// Rounded [lat, lon] for display. Never feed this back into calculations.
fn display_position(stop: &Stop) -> [f64; 2] {
    [round_display(stop.lat), round_display(stop.lon)]
}

impl MapView {
    /// Stop markers, passenger lines and route layers.
    ///
    /// Passengers must reference registered stops, which the passenger list guarantees.
    /// Any that don't are left off the map.
    pub fn build(
        stops: &StopRegistry,
        passengers: &[PassengerRequest],
        layers: &[RouteLayer],
    ) -> Self {
        let (lat, lon) = stops.center();

        let markers = stops
            .stops()
            .iter()
            .map(|s| Marker {
                kind: MarkerKind::Stop,
                position: display_position(s),
                tooltip: Some(s.name.clone()),
                popup: Some(s.name.clone()),
                color: "blue",
                icon: "bus",
            })
            .collect::<Vec<_>>();

        let lines = layers
            .iter()
            .flat_map(|layer| &layer.lines)
            .map(|line| Polyline {
                points: line
                    .iter()
                    .map(|&(lon, lat)| [round_display(lat), round_display(lon)])
                    .collect(),
                color: "gray",
                weight: 2,
            })
            .collect::<Vec<_>>();

        let mut view = MapView {
            center: [lat, lon],
            zoom: DEFAULT_ZOOM,
            tile_url: TILE_URL,
            attribution: TILE_ATTRIBUTION,
            markers,
            lines,
        };

        for p in passengers {
            let (Ok(start), Ok(end)) = (stops.get(&p.start), stops.get(&p.end)) else {
                continue;
            };
            view.push_pair(start, end);
        }

        view
    }

    /// Adds a line with start/end markers for every origin/destination pair.
    pub fn with_pairs(mut self, stops: &StopRegistry, pairs: &[StopPair]) -> Self {
        for pair in pairs {
            let (Ok(start), Ok(end)) = (stops.get(&pair.origin), stops.get(&pair.destination))
            else {
                continue;
            };
            self.push_pair(start, end);
        }

        self
    }

    /// Straight blue line from `start` to `end`, green start and red end marker.
    fn push_pair(&mut self, start: &Stop, end: &Stop) {
        let from = display_position(start);
        let to = display_position(end);

        self.lines.push(Polyline {
            points: vec![from, to],
            color: "blue",
            weight: 4,
        });
        self.markers.push(Marker {
            kind: MarkerKind::Start,
            position: from,
            tooltip: None,
            popup: None,
            color: "green",
            icon: "play",
        });
        self.markers.push(Marker {
            kind: MarkerKind::End,
            position: to,
            tooltip: None,
            popup: None,
            color: "red",
            icon: "stop",
        });
    }

    /// Adds a fetched route and numbered markers for its waypoints.
    ///
    /// The route geometry is drawn at full precision.
    pub fn with_route(mut self, waypoints: &[Stop], route: &DirectionsRoute) -> Self {
        self.lines.push(Polyline {
            points: route
                .coordinates
                .iter()
                .map(|&[lon, lat]| [lat, lon])
                .collect(),
            color: "purple",
            weight: 5,
        });

        for (i, stop) in waypoints.iter().enumerate() {
            let label = format!("{}. {}", i + 1, stop.name);
            self.markers.push(Marker {
                kind: MarkerKind::Waypoint,
                position: [stop.lat, stop.lon],
                tooltip: Some(label.clone()),
                popup: Some(label),
                color: "purple",
                icon: "flag",
            });
        }

        self
    }

    pub fn count_markers(&self, kind: MarkerKind) -> usize {
        self.markers.iter().filter(|m| m.kind == kind).count()
    }
}
