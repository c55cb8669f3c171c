use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::dal::sessions::PassengerError;
use crate::dal::stops::UnknownStop;
use crate::model::itinerary::SelectionError;
use crate::services::directions::{DirectionsError, RoutePlanError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Passenger(#[from] PassengerError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    UnknownStop(#[from] UnknownStop),

    #[error(transparent)]
    Directions(#[from] DirectionsError),

    #[error("directions API is not configured, set DIRECTIONS_ACCESS_TOKEN")]
    DirectionsDisabled,

    #[error("invalid time \"{0}\", expected HH:MM")]
    InvalidTime(String),

    #[error("error rendering the response: {0}")]
    Render(#[from] serde_json::Error),
}

impl From<RoutePlanError> for AppError {
    fn from(value: RoutePlanError) -> Self {
        match value {
            RoutePlanError::UnknownStop(e) => AppError::UnknownStop(e),
            RoutePlanError::Directions(e) => AppError::Directions(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Passenger(PassengerError::UnknownStop(_)) | AppError::UnknownStop(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Passenger(_)
            | AppError::Selection(SelectionError::EmptySelection)
            | AppError::Directions(DirectionsError::TooFewWaypoints(_))
            | AppError::InvalidTime(_) => StatusCode::BAD_REQUEST,
            AppError::Selection(SelectionError::UnknownStop(_)) => StatusCode::NOT_FOUND,
            AppError::Directions(_) => StatusCode::BAD_GATEWAY,
            AppError::DirectionsDisabled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Logs server-side failures loudly and user mistakes quietly
    pub fn log(&self) {
        if self.status().is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status(), Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            AppError::from(PassengerError::MissingField("name")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(PassengerError::UnknownStop(UnknownStop("X".into()))).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(SelectionError::EmptySelection).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(DirectionsError::NoRoute).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(DirectionsError::Status {
                status: StatusCode::NOT_FOUND,
                message: "Not Found".into(),
            })
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(DirectionsError::TooFewWaypoints(1)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DirectionsDisabled.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn route_plan_errors_flatten() {
        let err = AppError::from(RoutePlanError::UnknownStop(UnknownStop("X".into())));
        assert!(matches!(err, AppError::UnknownStop(_)));
        assert_eq!(err.to_string(), "unknown stop \"X\"");
    }
}
