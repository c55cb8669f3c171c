//! HTML handlers. Every interaction re-renders the whole page from session state.
use axum::Form;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use itertools::Itertools;
use tracing::info;

use crate::model::itinerary::{SelectionError, build_itinerary, build_pairs};
use crate::model::map_view::MapView;
use crate::model::passenger::{PassengerForm, hh_mm};
use crate::services::directions::RoutePlan;
use crate::web::error::AppError;
use crate::web::render::{self, EMPTY_SELECTION_MESSAGE, Notice, Tab};
use crate::web::{Session, SharedState, base_time};

/// Repeated query keys, e.g. `origins=A&origins=B`
type QueryPairs = Query<Vec<(String, String)>>;

fn values<'a>(query: &'a [(String, String)], key: &str) -> Vec<&'a str> {
    query
        .iter()
        .filter(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| v.as_str())
        .collect_vec()
}

fn first<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn html(status: StatusCode, page: Result<String, serde_json::Error>) -> Response {
    match page {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => AppError::from(e).into_response(),
    }
}

fn passengers_page(
    state: &SharedState,
    session: Session,
    notice: Option<Notice>,
    status: StatusCode,
) -> Response {
    let passengers = state.sessions.snapshot(session.id);
    let rows = build_itinerary(&passengers);
    let map = MapView::build(&state.stops, &passengers, &state.layers);

    let body = render::passengers_body(&state.stops, &rows, notice.as_ref());
    session.attach(html(status, render::page(Tab::Passengers, &body, &map)))
}

pub async fn index(State(state): State<SharedState>, session: Session) -> Response {
    passengers_page(&state, session, None, StatusCode::OK)
}

pub async fn add_passenger(
    State(state): State<SharedState>,
    session: Session,
    Form(form): Form<PassengerForm>,
) -> Response {
    let res = state
        .sessions
        .with_list(session.id, |list| list.push(form, &state.stops).cloned());

    let (notice, status) = match res {
        Ok(p) => {
            info!("registered passenger {} ({} -> {})", p.name, p.start, p.end);
            (Notice::Success(format!("✅ {} 등록 완료!", p.name)), StatusCode::OK)
        }
        Err(e) => {
            let e = AppError::from(e);
            e.log();
            (Notice::Error(e.to_string()), e.status())
        }
    };

    passengers_page(&state, session, Some(notice), status)
}

pub async fn clear_passengers(State(state): State<SharedState>, session: Session) -> Response {
    state.sessions.with_list(session.id, |list| list.clear());
    info!("cleared passengers of session {}", session.id);

    passengers_page(&state, session, None, StatusCode::OK)
}

/// Origin and destination multi-selects with the full pairwise table.
pub async fn pairs(State(state): State<SharedState>, Query(query): QueryPairs) -> Response {
    let origins = values(&query, "origins");
    let destinations = values(&query, "destinations");
    let submitted = first(&query, "submitted").is_some();

    let map = MapView::build(&state.stops, &[], &state.layers);

    let (pairs, notice, status) = if !submitted {
        (vec![], None, StatusCode::OK)
    } else {
        match build_pairs(&state.stops, origins.as_slice(), destinations.as_slice()) {
            Ok(pairs) => (pairs, None, StatusCode::OK),
            Err(e) => {
                let e = AppError::from(e);
                e.log();
                let message = if matches!(e, AppError::Selection(SelectionError::EmptySelection)) {
                    EMPTY_SELECTION_MESSAGE.to_string()
                } else {
                    e.to_string()
                };
                (vec![], Some(Notice::Error(message)), e.status())
            }
        }
    };

    let map = map.with_pairs(&state.stops, &pairs);
    let body = render::pairs_body(&state.stops, &origins, &destinations, &pairs, notice.as_ref());

    html(status, render::page(Tab::Pairs, &body, &map))
}

/// Waypoints in the selected order, routed by the directions API.
pub async fn route(State(state): State<SharedState>, Query(query): QueryPairs) -> Response {
    let selected = values(&query, "stops");
    let submitted = first(&query, "submitted").is_some();
    let time_raw = first(&query, "time");
    let profile = first(&query, "profile")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    let default_profile = state
        .directions
        .as_ref()
        .map(|d| d.default_profile().to_string())
        .unwrap_or_else(|| crate::services::directions::DEFAULT_PROFILE.to_string());

    let outcome = if submitted {
        Some(plan(&state, &selected, time_raw, profile.as_deref()).await)
    } else {
        None
    };

    let map = MapView::build(&state.stops, &[], &state.layers);
    let (map, rows, summary, notice, status) = match outcome {
        None => (map, vec![], None, None, StatusCode::OK),
        Some(Ok(plan)) => (
            map.with_route(&plan.stops, &plan.route),
            plan.rows,
            Some((plan.route.duration, plan.route.distance)),
            None,
            StatusCode::OK,
        ),
        Some(Err(e)) => {
            e.log();
            (map, vec![], None, Some(Notice::Error(e.to_string())), e.status())
        }
    };

    let time_shown = time_raw.map(str::to_string).unwrap_or_else(|| {
        base_time(None)
            .map(|t| t.format(hh_mm::FORMAT).to_string())
            .unwrap_or_default()
    });

    let body = render::route_body(
        &state.stops,
        &selected,
        &time_shown,
        profile.as_deref().unwrap_or(&default_profile),
        &rows,
        summary,
        notice.as_ref(),
    );

    html(status, render::page(Tab::Route, &body, &map))
}

async fn plan(
    state: &SharedState,
    selected: &[&str],
    time: Option<&str>,
    profile: Option<&str>,
) -> Result<RoutePlan, AppError> {
    let base = base_time(time)?;
    let client = state.directions()?;
    let names = selected.iter().map(|s| s.to_string()).collect_vec();

    Ok(client.plan_route(&state.stops, &names, base, profile).await?)
}
