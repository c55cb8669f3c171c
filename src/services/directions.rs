//! Client for the third-party directions API and the arrival estimates derived from it
use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};
use itertools::Itertools;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span};

use crate::dal::stops::{StopRegistry, UnknownStop};
use crate::model::directions_api_model::{ApiRoute, DirectionsResponse};
use crate::model::itinerary::OrderRow;
use crate::model::passenger::hh_mm;
use crate::model::stop::Stop;

pub const DEFAULT_PROFILE: &str = "driving";

pub const DEPART_REMARK: &str = "출발";
pub const VIA_REMARK: &str = "경유";
pub const ARRIVE_REMARK: &str = "도착";

#[derive(Debug, Clone)]
pub struct DirectionsConfig {
    /// Everything before `/{profile}/{coordinates}`
    pub base_url: String,
    pub access_token: String,
    pub profile: String,
    pub timeout: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum DirectionsError {
    #[error("a route needs at least 2 stops, got {0}")]
    TooFewWaypoints(usize),

    #[error("error calling the directions API: {0}")]
    Request(#[from] reqwest::Error),

    #[error("directions API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("error parsing the directions response: {source}")]
    Parse {
        source: serde_json::Error,
        body: String,
    },

    #[error("directions API found no route")]
    NoRoute,
}

/// First route of a directions response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsRoute {
    /// (lon, lat) pairs
    pub coordinates: Vec<[f64; 2]>,
    /// Seconds
    pub duration: f64,
    /// Meters
    pub distance: f64,
    /// Seconds per leg, one leg between each consecutive pair of waypoints
    pub leg_durations: Vec<f64>,
}

impl From<ApiRoute> for DirectionsRoute {
    fn from(route: ApiRoute) -> Self {
        DirectionsRoute {
            coordinates: route.geometry.coordinates,
            duration: route.duration,
            distance: route.distance,
            leg_durations: route.legs.into_iter().map(|l| l.duration).collect_vec(),
        }
    }
}

/// A fetched route together with the arrival estimate for each waypoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub stops: Vec<Stop>,
    pub route: DirectionsRoute,
    pub rows: Vec<OrderRow>,
}

#[derive(thiserror::Error, Debug)]
pub enum RoutePlanError {
    #[error(transparent)]
    UnknownStop(#[from] UnknownStop),

    #[error(transparent)]
    Directions(#[from] DirectionsError),
}

#[derive(Debug, Clone)]
pub struct DirectionsClient {
    client: Client,
    base_url: String,
    access_token: String,
    profile: String,
}

impl DirectionsClient {
    pub fn new(config: DirectionsConfig) -> Result<Self, DirectionsError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(DirectionsClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token,
            profile: config.profile,
        })
    }

    pub fn default_profile(&self) -> &str {
        &self.profile
    }

    /// Request URL without the query string, waypoints joined as `lon,lat;lon,lat`
    pub fn route_url(&self, waypoints: &[(f64, f64)], profile: &str) -> String {
        let path = waypoints
            .iter()
            .map(|(lon, lat)| format!("{lon},{lat}"))
            .join(";");

        format!("{}/{}/{}", self.base_url, profile, path)
    }

    /// Fetches a driving route through the waypoints in the given order.
    ///
    /// Only the first route of the response is kept.
    #[tracing::instrument(err, skip(self))]
    pub async fn fetch_route(
        &self,
        waypoints: &[(f64, f64)],
        profile: Option<&str>,
    ) -> Result<DirectionsRoute, DirectionsError> {
        if waypoints.len() < 2 {
            return Err(DirectionsError::TooFewWaypoints(waypoints.len()));
        }

        let profile = profile.unwrap_or(&self.profile);
        let url = self.route_url(waypoints, profile);
        info!("requesting route through {} waypoints", waypoints.len());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("geometries", "geojson"),
                ("overview", "full"),
                ("steps", "false"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .instrument(info_span!("Fetching directions"))
            .await?;

        let status = response.status();
        let body = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await?;

        if !status.is_success() {
            let message = serde_json::from_str::<DirectionsResponse>(&body)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
            error!("directions API returned {status}");

            return Err(DirectionsError::Status { status, message });
        }

        let parsed: DirectionsResponse = serde_json::from_str(&body)
            .map_err(|source| DirectionsError::Parse { source, body })?;

        info!(
            "got {} routes, code {}",
            parsed.routes.len(),
            parsed.code.as_deref().unwrap_or("-")
        );

        parsed
            .routes
            .into_iter()
            .next()
            .map(DirectionsRoute::from)
            .ok_or(DirectionsError::NoRoute)
    }

    /// Resolves the stops, fetches the route and estimates arrival times from `base`.
    #[tracing::instrument(err, skip(self, stops))]
    pub async fn plan_route(
        &self,
        stops: &StopRegistry,
        names: &[String],
        base: NaiveTime,
        profile: Option<&str>,
    ) -> Result<RoutePlan, RoutePlanError> {
        let waypoints = stops.resolve(names)?;
        let coordinates = waypoints.iter().map(|s| s.lon_lat()).collect_vec();

        let route = self.fetch_route(&coordinates, profile).await?;
        let rows = estimate_arrivals(base, &waypoints, &route.leg_durations);

        Ok(RoutePlan {
            stops: waypoints.into_iter().cloned().collect_vec(),
            route,
            rows,
        })
    }
}

/// Whole seconds as a time offset, `None` for durations chrono can't represent
fn offset(secs: f64) -> Option<TimeDelta> {
    if !secs.is_finite() {
        return None;
    }

    TimeDelta::try_seconds(secs.round() as i64)
}

/// Arrival at waypoint `i` is `base` plus the durations of legs `0..i`.
///
/// Times wrap past midnight. Waypoints with no leg leading to them, or with an
/// out of range total duration, get a blank time.
pub fn estimate_arrivals(base: NaiveTime, stops: &[&Stop], leg_durations: &[f64]) -> Vec<OrderRow> {
    let last = stops.len().saturating_sub(1);
    let mut elapsed = Some(0.0);

    stops
        .iter()
        .enumerate()
        .map(|(i, stop)| {
            if i > 0 {
                elapsed = elapsed.zip(leg_durations.get(i - 1)).map(|(e, d)| e + d);
            }

            let time = elapsed
                .and_then(offset)
                .map(|delta| (base + delta).format(hh_mm::FORMAT).to_string())
                .unwrap_or_default();

            let remark = match i {
                0 => DEPART_REMARK.to_string(),
                i if i == last => ARRIVE_REMARK.to_string(),
                i => format!("{VIA_REMARK} {i}"),
            };

            OrderRow {
                sequence: i + 1,
                time,
                stop: stop.name.clone(),
                remark,
            }
        })
        .collect_vec()
}
