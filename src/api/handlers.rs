use crate::api::responses::{
    DestinationsResponse, EtaBody, HealthResponse, HealthStatus, LatestEtaErrorCode,
    LatestEtaErrorResponse, LatestEtaSuccessResponse, LocationErrorCode, LocationErrorResponse,
    LocationSuccessResponse,
};
use crate::error::AppError;
use crate::estimation::{EtaPipeline, ReportOutcome};
use crate::state::{AppState, EtaEstimate, LineEstimate, LocationSample};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, RwLock};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<EtaPipeline>,
    pub state: Arc<RwLock<AppState>>,
}

#[derive(Debug)]
enum TimestampError {
    Format(time::error::Format),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Format(err) => write!(f, "timestamp format error: {err}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub bus_line: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub occupancy_level: Option<u8>,
}

pub enum LocationResponse {
    Success(Box<LocationSuccessResponse>),
    Error {
        status: StatusCode,
        body: LocationErrorResponse,
    },
}

impl IntoResponse for LocationResponse {
    fn into_response(self) -> Response {
        match self {
            LocationResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            LocationResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn post_location(
    State(context): State<ApiContext>,
    Json(request): Json<LocationRequest>,
) -> impl IntoResponse {
    build_location_response(context, request).await
}

async fn build_location_response(
    context: ApiContext,
    request: LocationRequest,
) -> LocationResponse {
    let now = OffsetDateTime::now_utc();
    let timestamp = parse_timestamp(request.timestamp.as_deref(), now);

    let sample = match LocationSample::new(
        &request.bus_line,
        request.latitude,
        request.longitude,
        timestamp,
        request.occupancy_level,
    ) {
        Ok(sample) => sample,
        Err(err) => return validation_error(&err, now),
    };

    let outcome = match context.pipeline.process_report(&sample).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "Estimation pipeline failure");
            return location_internal_error(now);
        }
    };

    if let Ok(mut guard) = context.state.write() {
        guard.set_estimate(LineEstimate {
            bus_line: sample.bus_line.clone(),
            estimate: outcome.estimate.clone(),
            adaptive_interval_seconds: outcome.adaptive_interval_seconds,
        });
    } else {
        error!("State lock poisoned while storing latest estimate");
    }

    match success_body(&outcome, now) {
        Ok(body) => LocationResponse::Success(Box::new(body)),
        Err(err) => {
            error!(error = %err, "Failed to format location response");
            location_internal_error(now)
        }
    }
}

fn success_body(
    outcome: &ReportOutcome,
    now: OffsetDateTime,
) -> Result<LocationSuccessResponse, TimestampError> {
    Ok(LocationSuccessResponse {
        location_id: outcome.location_id,
        destination: outcome.destination.clone(),
        eta: eta_body(&outcome.estimate)?,
        adaptive_interval_seconds: outcome.adaptive_interval_seconds,
        timestamp: format_timestamp(now)?,
    })
}

fn eta_body(estimate: &EtaEstimate) -> Result<EtaBody, TimestampError> {
    Ok(EtaBody {
        eta_minutes: round1(estimate.eta_minutes),
        base_eta_minutes: round1(estimate.base_eta_minutes),
        estimated_arrival: format_timestamp(estimate.estimated_arrival)?,
        distance_km: round2(estimate.distance_km),
        confidence_percent: round1(estimate.confidence_percent),
        confidence_factors: estimate.factors,
        history_adjustment: round2(estimate.history_adjustment),
        source: estimate.source,
    })
}

fn validation_error(err: &AppError, now: OffsetDateTime) -> LocationResponse {
    let error_code = match err {
        AppError::InvalidCoordinates { .. } => LocationErrorCode::InvalidCoordinates,
        AppError::InvalidBusLine(_) => LocationErrorCode::InvalidBusLine,
        AppError::InvalidOccupancyLevel(_) => LocationErrorCode::InvalidOccupancyLevel,
        _ => LocationErrorCode::InternalError,
    };
    LocationResponse::Error {
        status: StatusCode::BAD_REQUEST,
        body: LocationErrorResponse {
            error_code,
            error_message: err.to_string(),
            timestamp: fallback_timestamp(now),
        },
    }
}

fn location_internal_error(now: OffsetDateTime) -> LocationResponse {
    LocationResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: LocationErrorResponse {
            error_code: LocationErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(now),
        },
    }
}

pub enum LatestEtaResponse {
    Success(Box<LatestEtaSuccessResponse>),
    Error {
        status: StatusCode,
        body: LatestEtaErrorResponse,
    },
}

impl IntoResponse for LatestEtaResponse {
    fn into_response(self) -> Response {
        match self {
            LatestEtaResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
            LatestEtaResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

pub async fn get_latest_eta(
    State(context): State<ApiContext>,
    Path(bus_line): Path<String>,
) -> impl IntoResponse {
    build_latest_eta_response(context, bus_line, OffsetDateTime::now_utc())
}

fn build_latest_eta_response(
    context: ApiContext,
    bus_line: String,
    now: OffsetDateTime,
) -> LatestEtaResponse {
    let bus_line = bus_line.trim().to_uppercase();
    let latest = match context.state.read() {
        Ok(guard) => guard.latest(&bus_line).cloned(),
        Err(_) => {
            error!("State lock poisoned while reading latest estimate");
            return latest_eta_internal_error(now);
        }
    };

    let Some(latest) = latest else {
        return LatestEtaResponse::Error {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: LatestEtaErrorResponse {
                error_code: LatestEtaErrorCode::NoData,
                error_message: format!("No estimate recorded for line {bus_line}"),
                timestamp: fallback_timestamp(now),
            },
        };
    };

    match latest_eta_body(&latest, now) {
        Ok(body) => LatestEtaResponse::Success(Box::new(body)),
        Err(err) => {
            error!(error = %err, "Failed to format latest estimate");
            latest_eta_internal_error(now)
        }
    }
}

fn latest_eta_body(
    latest: &LineEstimate,
    now: OffsetDateTime,
) -> Result<LatestEtaSuccessResponse, TimestampError> {
    Ok(LatestEtaSuccessResponse {
        bus_line: latest.bus_line.clone(),
        eta: eta_body(&latest.estimate)?,
        adaptive_interval_seconds: latest.adaptive_interval_seconds,
        timestamp: format_timestamp(now)?,
    })
}

fn latest_eta_internal_error(now: OffsetDateTime) -> LatestEtaResponse {
    LatestEtaResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: LatestEtaErrorResponse {
            error_code: LatestEtaErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: fallback_timestamp(now),
        },
    }
}

pub async fn get_destinations(State(context): State<ApiContext>) -> impl IntoResponse {
    let destinations = context.pipeline.destinations().to_vec();
    let count = destinations.len();
    Json(DestinationsResponse {
        destinations,
        count,
    })
}

pub async fn get_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: HealthStatus::Ok,
        timestamp: fallback_timestamp(OffsetDateTime::now_utc()),
    })
}

/// Accepts Rfc3339 or a unix epoch in seconds; anything else falls back to
/// the server clock, matching what the field devices actually send.
fn parse_timestamp(raw: Option<&str>, now: OffsetDateTime) -> OffsetDateTime {
    let Some(raw) = raw else {
        return now;
    };
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return parsed;
    }
    if let Ok(epoch) = raw.parse::<i64>()
        && let Ok(parsed) = OffsetDateTime::from_unix_timestamp(epoch)
    {
        return parsed;
    }
    warn!(timestamp = raw, "Unparseable report timestamp, using server time");
    now
}

fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, TimestampError> {
    timestamp.format(&Rfc3339).map_err(TimestampError::Format)
}

fn fallback_timestamp(now: OffsetDateTime) -> String {
    format_timestamp(now).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format response timestamp");
        "1970-01-01T00:00:00Z".to_string()
    })
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parse_timestamp_accepts_rfc3339() {
        let now = datetime!(2026-08-28 08:00:00 UTC);
        let parsed = parse_timestamp(Some("2026-08-28T07:45:00Z"), now);
        assert_eq!(parsed, datetime!(2026-08-28 07:45:00 UTC));
    }

    #[test]
    fn parse_timestamp_accepts_unix_epoch() {
        let now = datetime!(2026-08-28 08:00:00 UTC);
        let parsed = parse_timestamp(Some("1787558700"), now);
        assert_eq!(parsed.unix_timestamp(), 1_787_558_700);
    }

    #[test]
    fn parse_timestamp_falls_back_to_server_time() {
        let now = datetime!(2026-08-28 08:00:00 UTC);
        assert_eq!(parse_timestamp(Some("yesterday-ish"), now), now);
        assert_eq!(parse_timestamp(None, now), now);
    }

    #[test]
    fn validation_error_maps_error_codes() {
        let now = datetime!(2026-08-28 08:00:00 UTC);
        let response = validation_error(
            &AppError::InvalidBusLine("THIS-LINE-IS-TOO-LONG".to_string()),
            now,
        );
        match response {
            LocationResponse::Error { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body.error_code, LocationErrorCode::InvalidBusLine);
            }
            LocationResponse::Success(_) => panic!("expected error response"),
        }
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round1(43.5678), 43.6);
        assert_eq!(round2(1.23456), 1.23);
    }
}
