use crate::error::AppError;
use crate::geo::Coordinates;
use serde::Serialize;
use std::collections::HashMap;
use time::OffsetDateTime;
use tokio::sync::watch;

pub const MIN_BUS_LINE_LEN: usize = 1;
pub const MAX_BUS_LINE_LEN: usize = 10;
pub const MAX_OCCUPANCY_LEVEL: u8 = 4;

/// One position report from a field device, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSample {
    pub bus_line: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: OffsetDateTime,
    pub occupancy_level: Option<u8>,
}

impl LocationSample {
    pub fn new(
        bus_line: &str,
        latitude: f64,
        longitude: f64,
        timestamp: OffsetDateTime,
        occupancy_level: Option<u8>,
    ) -> Result<Self, AppError> {
        let bus_line = bus_line.trim().to_uppercase();
        if bus_line.len() < MIN_BUS_LINE_LEN || bus_line.len() > MAX_BUS_LINE_LEN {
            return Err(AppError::InvalidBusLine(bus_line));
        }
        // Coordinate bounds are checked once here; the pipeline trusts them after.
        Coordinates::new(latitude, longitude)?;
        if let Some(level) = occupancy_level
            && level > MAX_OCCUPANCY_LEVEL
        {
            return Err(AppError::InvalidOccupancyLevel(level));
        }
        Ok(Self {
            bus_line,
            latitude,
            longitude,
            timestamp,
            occupancy_level,
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteSource {
    External,
    Fallback,
}

/// Per-factor confidence breakdown, each multiplier in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceFactors {
    pub occupancy: f64,
    pub traffic: f64,
    pub time_of_day: f64,
    pub distance_band: f64,
    pub historical_reliability: f64,
}

impl ConfidenceFactors {
    pub fn product(&self) -> f64 {
        self.occupancy
            * self.traffic
            * self.time_of_day
            * self.distance_band
            * self.historical_reliability
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EtaEstimate {
    pub eta_minutes: f64,
    pub base_eta_minutes: f64,
    pub estimated_arrival: OffsetDateTime,
    pub distance_km: f64,
    pub confidence_percent: f64,
    pub factors: ConfidenceFactors,
    pub history_adjustment: f64,
    pub source: RouteSource,
}

/// Latest pipeline output for one bus line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineEstimate {
    pub bus_line: String,
    pub estimate: EtaEstimate,
    pub adaptive_interval_seconds: u32,
}

#[derive(Debug)]
pub struct AppState {
    estimates: HashMap<String, LineEstimate>,
    estimates_tx: watch::Sender<Vec<LineEstimate>>,
}

impl AppState {
    pub fn new() -> Self {
        let (estimates_tx, _estimates_rx) = watch::channel(Vec::new());
        Self {
            estimates: HashMap::new(),
            estimates_tx,
        }
    }

    pub fn latest(&self, bus_line: &str) -> Option<&LineEstimate> {
        self.estimates.get(bus_line)
    }

    pub fn subscribe_estimates(&self) -> watch::Receiver<Vec<LineEstimate>> {
        self.estimates_tx.subscribe()
    }

    pub fn set_estimate(&mut self, estimate: LineEstimate) {
        self.estimates
            .insert(estimate.bus_line.clone(), estimate);
        let snapshot: Vec<LineEstimate> = self.estimates.values().cloned().collect();
        // send_replace keeps working when no observer is subscribed yet.
        self.estimates_tx.send_replace(snapshot);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn estimate_at(minutes: f64) -> EtaEstimate {
        EtaEstimate {
            eta_minutes: minutes,
            base_eta_minutes: minutes,
            estimated_arrival: datetime!(2026-08-28 08:30:00 UTC),
            distance_km: 4.2,
            confidence_percent: 75.0,
            factors: ConfidenceFactors {
                occupancy: 1.0,
                traffic: 0.85,
                time_of_day: 0.75,
                distance_band: 0.90,
                historical_reliability: 0.85,
            },
            history_adjustment: 1.0,
            source: RouteSource::Fallback,
        }
    }

    #[test]
    fn sample_normalizes_bus_line() -> Result<(), AppError> {
        let sample = LocationSample::new(
            "  brt-1 ",
            -8.05,
            -34.88,
            datetime!(2026-08-28 08:00:00 UTC),
            None,
        )?;
        assert_eq!(sample.bus_line, "BRT-1");
        Ok(())
    }

    #[test]
    fn sample_rejects_empty_and_oversized_lines() {
        let when = datetime!(2026-08-28 08:00:00 UTC);
        assert!(matches!(
            LocationSample::new("   ", -8.05, -34.88, when, None),
            Err(AppError::InvalidBusLine(_))
        ));
        assert!(matches!(
            LocationSample::new("LINHA-CENTRO-1", -8.05, -34.88, when, None),
            Err(AppError::InvalidBusLine(_))
        ));
    }

    #[test]
    fn sample_rejects_bad_coordinates_and_occupancy() {
        let when = datetime!(2026-08-28 08:00:00 UTC);
        assert!(matches!(
            LocationSample::new("L1", -95.0, -34.88, when, None),
            Err(AppError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            LocationSample::new("L1", -8.05, -34.88, when, Some(5)),
            Err(AppError::InvalidOccupancyLevel(5))
        ));
    }

    #[test]
    fn set_estimate_updates_state_and_watch() {
        let mut state = AppState::new();
        let receiver = state.subscribe_estimates();
        let line_estimate = LineEstimate {
            bus_line: "L1".to_string(),
            estimate: estimate_at(12.0),
            adaptive_interval_seconds: 30,
        };

        state.set_estimate(line_estimate.clone());

        assert_eq!(state.latest("L1"), Some(&line_estimate));
        assert_eq!(receiver.borrow().as_slice(), &[line_estimate]);
    }

    #[test]
    fn set_estimate_works_without_subscribers() {
        let mut state = AppState::new();
        state.set_estimate(LineEstimate {
            bus_line: "L2".to_string(),
            estimate: estimate_at(7.0),
            adaptive_interval_seconds: 40,
        });
        assert!(state.latest("L2").is_some());
    }

    #[test]
    fn set_estimate_replaces_previous_value_for_line() {
        let mut state = AppState::new();
        state.set_estimate(LineEstimate {
            bus_line: "L1".to_string(),
            estimate: estimate_at(12.0),
            adaptive_interval_seconds: 30,
        });
        state.set_estimate(LineEstimate {
            bus_line: "L1".to_string(),
            estimate: estimate_at(9.5),
            adaptive_interval_seconds: 18,
        });

        let latest = state.latest("L1").expect("estimate stored");
        assert_eq!(latest.estimate.eta_minutes, 9.5);
        assert_eq!(latest.adaptive_interval_seconds, 18);
    }

    #[test]
    fn latest_is_none_for_unknown_line() {
        let state = AppState::new();
        assert!(state.latest("L9").is_none());
    }
}
