//! JSON API mirroring the operator pages
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::dal::sessions::PassengerError;
use crate::model::itinerary::{OrderRow, StopPair, build_itinerary, build_pairs};
use crate::model::map_view::{MapView, MarkerKind};
use crate::model::passenger::{PassengerForm, PassengerRequest};
use crate::model::stop::Stop;
use crate::services::directions::RoutePlan;
use crate::web::error::AppError;
use crate::web::{Session, SharedState, base_time};

pub async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "stops": state.stops.len(),
        "route_layers": state.layers.len(),
        "sessions": state.sessions.session_count(),
        "directions": state.directions.is_some(),
    }))
}

pub async fn stops(State(state): State<SharedState>) -> Json<Vec<Stop>> {
    Json(state.stops.stops().to_vec())
}

pub async fn passengers(State(state): State<SharedState>, session: Session) -> Response {
    session.attach(Json(state.sessions.snapshot(session.id)))
}

pub async fn add_passenger(
    State(state): State<SharedState>,
    session: Session,
    Json(form): Json<PassengerForm>,
) -> Result<Response, AppError> {
    let (passenger, count): (PassengerRequest, usize) =
        state.sessions.with_list(session.id, |list| {
            let passenger = list.push(form, &state.stops)?.clone();
            Ok::<_, PassengerError>((passenger, list.len()))
        })?;

    info!(
        "registered passenger {} ({} -> {}), {count} in session",
        passenger.name, passenger.start, passenger.end
    );

    Ok(session.attach((StatusCode::CREATED, Json(passenger))))
}

pub async fn clear_passengers(State(state): State<SharedState>, session: Session) -> Response {
    state.sessions.with_list(session.id, |list| list.clear());
    info!("cleared passengers of session {}", session.id);

    session.attach(StatusCode::NO_CONTENT)
}

pub async fn itinerary(State(state): State<SharedState>, session: Session) -> Response {
    let rows: Vec<OrderRow> = build_itinerary(&state.sessions.snapshot(session.id));
    session.attach(Json(rows))
}

pub async fn map(State(state): State<SharedState>, session: Session) -> Response {
    let passengers = state.sessions.snapshot(session.id);
    let view = MapView::build(&state.stops, &passengers, &state.layers);
    debug!(
        "map for session {} with {} passenger markers",
        session.id,
        view.count_markers(MarkerKind::Start)
    );

    session.attach(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct DistanceResponse {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}

pub async fn distance(
    State(state): State<SharedState>,
    Query(query): Query<DistanceQuery>,
) -> Result<Json<DistanceResponse>, AppError> {
    let distance_km = state.stops.distance_km(&query.from, &query.to)?;

    Ok(Json(DistanceResponse {
        from: query.from,
        to: query.to,
        distance_km,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PairsRequest {
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default)]
    pub destinations: Vec<String>,
}

pub async fn pairs(
    State(state): State<SharedState>,
    Json(request): Json<PairsRequest>,
) -> Result<Json<Vec<StopPair>>, AppError> {
    Ok(Json(build_pairs(
        &state.stops,
        request.origins.as_slice(),
        request.destinations.as_slice(),
    )?))
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    /// Stop names in visiting order
    pub stops: Vec<String>,
    /// `HH:MM` departure from the first stop, now in Korea when absent
    pub time: Option<String>,
    pub profile: Option<String>,
}

pub async fn route(
    State(state): State<SharedState>,
    Json(request): Json<RouteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let base = base_time(request.time.as_deref())?;
    let client = state.directions()?;

    let plan: RoutePlan = client
        .plan_route(&state.stops, &request.stops, base, request.profile.as_deref())
        .await?;

    Ok(Json(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directions::{DEFAULT_PROFILE, DirectionsClient, DirectionsConfig};
    use crate::web::tests::test_state;
    use axum::Router;
    use axum::extract::Path;
    use axum::routing::get;
    use std::time::Duration;
    use uuid::Uuid;

    fn session() -> Session {
        Session {
            id: Uuid::new_v4(),
            is_new: false,
        }
    }

    fn passenger_form(name: &str) -> Json<PassengerForm> {
        Json(PassengerForm {
            name: name.to_string(),
            start: "StopA".to_string(),
            end: "StopB".to_string(),
            time: Some("07:30".to_string()),
        })
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn itinerary_follows_session_list() {
        let state = test_state(None);
        let session = session();

        let created = add_passenger(State(state.clone()), session, passenger_form("Jihoon"))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let rows = json_body(itinerary(State(state.clone()), session).await).await;
        assert_eq!(
            rows,
            json!([
                {"sequence": 1, "time": "07:30", "stop": "StopA", "remark": "Jihoon 탑승"},
                {"sequence": 2, "time": "", "stop": "StopB", "remark": "Jihoon 하차"}
            ])
        );

        let cleared = clear_passengers(State(state.clone()), session).await;
        assert_eq!(cleared.status(), StatusCode::NO_CONTENT);

        let rows = json_body(itinerary(State(state.clone()), session).await).await;
        assert_eq!(rows, json!([]));

        let map = json_body(map(State(state), session).await).await;
        assert_eq!(map["lines"], json!([]));
        assert_eq!(map["markers"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn reading_as_a_new_session_stores_nothing() {
        let state = test_state(None);

        for _ in 0..50 {
            let fresh = Session {
                id: Uuid::new_v4(),
                is_new: true,
            };
            let rows = json_body(itinerary(State(state.clone()), fresh).await).await;
            assert_eq!(rows, json!([]));
            map(State(state.clone()), fresh).await;
            passengers(State(state.clone()), fresh).await;
        }

        assert_eq!(state.sessions.session_count(), 0);
    }

    #[tokio::test]
    async fn invalid_passenger_is_bad_request() {
        let state = test_state(None);

        let err = add_passenger(State(state), session(), passenger_form(""))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn distance_of_unknown_stop_is_not_found() {
        let state = test_state(None);

        let ok = distance(
            State(state.clone()),
            Query(DistanceQuery {
                from: "StopA".to_string(),
                to: "StopB".to_string(),
            }),
        )
        .await
        .unwrap();
        assert!((ok.distance_km - 0.05 * 111.0).abs() < 1e-9);

        let err = distance(
            State(state),
            Query(DistanceQuery {
                from: "StopA".to_string(),
                to: "Nowhere".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pairs_count_is_product_of_selections() {
        let state = test_state(None);

        let Json(rows) = pairs(
            State(state.clone()),
            Json(PairsRequest {
                origins: vec!["StopA".into(), "StopB".into(), "StopC".into()],
                destinations: vec!["StopA".into(), "StopC".into()],
            }),
        )
        .await
        .unwrap();
        assert_eq!(rows.len(), 6);

        let err = pairs(
            State(state),
            Json(PairsRequest {
                origins: vec![],
                destinations: vec!["StopA".into()],
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn route_upstream_404_is_bad_gateway() {
        let upstream = Router::new().route(
            "/{profile}/{coords}",
            get(|Path((_, _)): Path<(String, String)>| async { StatusCode::NOT_FOUND }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let client = DirectionsClient::new(DirectionsConfig {
            base_url: format!("http://{addr}"),
            access_token: "test-token".to_string(),
            profile: DEFAULT_PROFILE.to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let state = test_state(Some(client));

        let res = route(
            State(state),
            Json(RouteRequest {
                stops: vec!["StopA".into(), "StopB".into()],
                time: Some("07:30".into()),
                profile: None,
            }),
        )
        .await;

        match res {
            Err(e) => assert_eq!(e.status(), StatusCode::BAD_GATEWAY),
            Ok(_) => panic!("expected an upstream error"),
        }
    }
}
