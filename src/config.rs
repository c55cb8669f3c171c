use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::dal::stops::DEFAULT_NAME_PROPERTY;
use crate::services::directions::{DEFAULT_PROFILE, DirectionsConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Stop planner for demand-responsive transit", long_about = None)]
pub struct Config {
    /// Address the web server listens on
    #[arg(long, env = "DRT_BIND", default_value = "127.0.0.1:8501")]
    pub bind: SocketAddr,

    /// GeoJSON point file with the stops
    #[arg(long, env = "DRT_STOPS", default_value = "./data/new_drt.geojson")]
    pub stops: PathBuf,

    /// Feature property holding the stop name
    #[arg(long, env = "DRT_NAME_PROPERTY", default_value = DEFAULT_NAME_PROPERTY)]
    pub name_property: String,

    /// Directory searched for route_1.geojson ..= route_4.geojson
    #[arg(long, env = "DRT_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    #[arg(
        long,
        env = "DIRECTIONS_URL",
        default_value = "https://api.mapbox.com/directions/v5/mapbox"
    )]
    pub directions_url: String,

    /// Route planning is disabled without it
    #[arg(long, env = "DIRECTIONS_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "DIRECTIONS_PROFILE", default_value = DEFAULT_PROFILE)]
    pub profile: String,

    #[arg(long, env = "DIRECTIONS_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Passenger lists idle for longer than this are dropped
    #[arg(long, env = "DRT_SESSION_IDLE_MINS", default_value_t = 720)]
    pub session_idle_mins: u64,

    #[arg(long, env = "DRT_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// Spans are exported over OTLP/gRPC when set
    #[arg(long, env = "OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_mins * 60)
    }

    pub fn directions(&self) -> Option<DirectionsConfig> {
        let token = self.access_token.as_deref()?.trim();
        if token.is_empty() {
            return None;
        }

        Some(DirectionsConfig {
            base_url: self.directions_url.clone(),
            access_token: token.to_string(),
            profile: self.profile.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "drt_planner",
            "--bind",
            "0.0.0.0:9000",
            "--stops",
            "stops.geojson",
            "--access-token",
            "secret",
            "--request-timeout-secs",
            "3",
        ])
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.stops, PathBuf::from("stops.geojson"));

        let directions = config.directions().unwrap();
        assert_eq!(directions.access_token, "secret");
        assert_eq!(directions.timeout, Duration::from_secs(3));
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(720 * 60));
    }

    #[test]
    fn blank_token_disables_directions() {
        let config =
            Config::try_parse_from(["drt_planner", "--access-token", "  "]).unwrap();
        assert!(config.directions().is_none());
    }
}
