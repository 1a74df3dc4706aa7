use crate::config::Destination;
use crate::state::{ConfidenceFactors, RouteSource};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationSuccessResponse {
    pub location_id: u64,
    pub destination: Destination,
    pub eta: EtaBody,
    pub adaptive_interval_seconds: u32,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EtaBody {
    pub eta_minutes: f64,
    pub base_eta_minutes: f64,
    pub estimated_arrival: String,
    pub distance_km: f64,
    pub confidence_percent: f64,
    pub confidence_factors: ConfidenceFactors,
    pub history_adjustment: f64,
    pub source: RouteSource,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationErrorResponse {
    pub error_code: LocationErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationErrorCode {
    InvalidCoordinates,
    InvalidBusLine,
    InvalidOccupancyLevel,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LatestEtaSuccessResponse {
    pub bus_line: String,
    pub eta: EtaBody,
    pub adaptive_interval_seconds: u32,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LatestEtaErrorResponse {
    pub error_code: LatestEtaErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LatestEtaErrorCode {
    NoData,
    InternalError,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DestinationsResponse {
    pub destinations: Vec<Destination>,
    pub count: usize,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
}
