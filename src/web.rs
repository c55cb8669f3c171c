//! HTTP surface: operator pages and the JSON API
pub mod api;
pub mod error;
pub mod pages;
pub mod render;

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::HeaderValue;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::{NaiveTime, Timelike, Utc};
use chrono_tz::Asia::Seoul;
use uuid::Uuid;

use crate::dal::route_layers::RouteLayer;
use crate::dal::sessions::{SessionId, SessionStore};
use crate::dal::stops::StopRegistry;
use crate::model::passenger::hh_mm;
use crate::services::directions::DirectionsClient;
use error::AppError;

pub const SESSION_COOKIE: &str = "drt_session";

/// Everything handlers share. Built once at startup.
#[derive(Debug)]
pub struct AppState {
    pub stops: StopRegistry,
    pub layers: Vec<RouteLayer>,
    pub sessions: SessionStore,
    /// `None` when no access token is configured
    pub directions: Option<DirectionsClient>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn directions(&self) -> Result<&DirectionsClient, AppError> {
        self.directions.as_ref().ok_or(AppError::DirectionsDisabled)
    }
}

/// The caller's session, taken from the `drt_session` cookie or freshly minted.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub id: SessionId,
    pub is_new: bool,
}

impl Session {
    fn from_cookie_header<'a>(values: impl Iterator<Item = &'a HeaderValue>) -> Option<SessionId> {
        values
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
            .find_map(|v| Uuid::parse_str(v.trim()).ok())
    }

    /// Attaches the session cookie to the response when the session was just created
    pub fn attach(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.is_new {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match Self::from_cookie_header(parts.headers.get_all(COOKIE).iter()) {
            Some(id) => Session { id, is_new: false },
            None => Session {
                id: Uuid::new_v4(),
                is_new: true,
            },
        })
    }
}

/// Parses an `HH:MM` base time, defaulting to the current time in Korea.
pub fn base_time(raw: Option<&str>) -> Result<NaiveTime, AppError> {
    match raw.map(str::trim) {
        None | Some("") => {
            let now = Utc::now().with_timezone(&Seoul).time();
            Ok(now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now))
        }
        Some(t) => hh_mm::parse(t).map_err(|_| AppError::InvalidTime(t.to_string())),
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/passengers", post(pages::add_passenger))
        .route("/passengers/clear", post(pages::clear_passengers))
        .route("/pairs", get(pages::pairs))
        .route("/route", get(pages::route))
        .route("/health", get(api::health))
        .route("/api/stops", get(api::stops))
        .route(
            "/api/passengers",
            get(api::passengers)
                .post(api::add_passenger)
                .delete(api::clear_passengers),
        )
        .route("/api/itinerary", get(api::itinerary))
        .route("/api/map", get(api::map))
        .route("/api/distance", get(api::distance))
        .route("/api/pairs", post(api::pairs))
        .route("/api/route", post(api::route))
        .with_state(state)
}
