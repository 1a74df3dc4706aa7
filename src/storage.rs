//! Persistence collaborator boundary.
//!
//! The pipeline only depends on the `TelemetryStore` trait; durability is a
//! separate concern. `MemoryStore` keeps everything in process and powers
//! tests and single-node deployments.

use crate::error::AppError;
use crate::state::{EtaEstimate, LocationSample};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;
use tracing::warn;

pub type LocationId = u64;

pub trait TelemetryStore: Send + Sync {
    /// Persists one location sample, returning its opaque identifier.
    fn save_location(&self, sample: &LocationSample) -> Result<LocationId, AppError>;

    /// Persists the ETA prediction tied to a stored location.
    fn save_prediction(
        &self,
        location_id: LocationId,
        estimate: &EtaEstimate,
    ) -> Result<(), AppError>;

    /// Persists the adaptive interval chosen for a stored location.
    fn save_interval(&self, location_id: LocationId, interval_seconds: u32)
    -> Result<(), AppError>;

    /// Records the observed arrival for an earlier prediction, closing the
    /// feedback loop.
    fn record_arrival(
        &self,
        location_id: LocationId,
        actual_arrival: OffsetDateTime,
    ) -> Result<(), AppError>;

    /// Average signed delay in minutes (positive = late) for a line at an
    /// hour of day, over predictions recorded since `since`. `None` when no
    /// closed predictions exist in the window.
    fn average_delay_minutes(&self, bus_line: &str, hour: u8, since: OffsetDateTime)
    -> Option<f64>;

    /// Track-record reliability for a line, if one has been established.
    fn line_reliability(&self, bus_line: &str) -> Option<f64>;
}

#[derive(Debug)]
struct StoredLocation {
    id: LocationId,
    bus_line: String,
    timestamp: OffsetDateTime,
}

#[derive(Debug)]
struct StoredPrediction {
    location_id: LocationId,
    bus_line: String,
    hour: u8,
    predicted_arrival: OffsetDateTime,
    actual_arrival: Option<OffsetDateTime>,
    recorded_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    next_id: LocationId,
    locations: Vec<StoredLocation>,
    predictions: Vec<StoredPrediction>,
    intervals: Vec<(LocationId, u32)>,
    reliability: HashMap<String, f64>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a per-line reliability score, e.g. from an offline evaluation.
    pub fn set_line_reliability(&self, bus_line: &str, reliability: f64) -> Result<(), AppError> {
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        inner
            .reliability
            .insert(bus_line.to_string(), reliability);
        Ok(())
    }
}

impl TelemetryStore for MemoryStore {
    fn save_location(&self, sample: &LocationSample) -> Result<LocationId, AppError> {
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.locations.push(StoredLocation {
            id,
            bus_line: sample.bus_line.clone(),
            timestamp: sample.timestamp,
        });
        Ok(id)
    }

    fn save_prediction(
        &self,
        location_id: LocationId,
        estimate: &EtaEstimate,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        let Some(location) = inner.locations.iter().find(|l| l.id == location_id) else {
            warn!(location_id, "Prediction saved for unknown location");
            return Ok(());
        };
        let prediction = StoredPrediction {
            location_id,
            bus_line: location.bus_line.clone(),
            hour: location.timestamp.hour(),
            predicted_arrival: estimate.estimated_arrival,
            actual_arrival: None,
            recorded_at: location.timestamp,
        };
        inner.predictions.push(prediction);
        Ok(())
    }

    fn save_interval(
        &self,
        location_id: LocationId,
        interval_seconds: u32,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        inner.intervals.push((location_id, interval_seconds));
        Ok(())
    }

    fn record_arrival(
        &self,
        location_id: LocationId,
        actual_arrival: OffsetDateTime,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().map_err(|_| AppError::StateLock)?;
        match inner
            .predictions
            .iter_mut()
            .find(|p| p.location_id == location_id)
        {
            Some(prediction) => prediction.actual_arrival = Some(actual_arrival),
            None => warn!(location_id, "Arrival recorded for unknown prediction"),
        }
        Ok(())
    }

    fn average_delay_minutes(
        &self,
        bus_line: &str,
        hour: u8,
        since: OffsetDateTime,
    ) -> Option<f64> {
        let inner = self.inner.read().ok()?;
        let delays: Vec<f64> = inner
            .predictions
            .iter()
            .filter(|p| p.bus_line == bus_line && p.hour == hour && p.recorded_at >= since)
            .filter_map(|p| {
                let actual = p.actual_arrival?;
                Some((actual - p.predicted_arrival).as_seconds_f64() / 60.0)
            })
            .collect();
        if delays.is_empty() {
            return None;
        }
        Some(delays.iter().sum::<f64>() / delays.len() as f64)
    }

    fn line_reliability(&self, bus_line: &str) -> Option<f64> {
        let inner = self.inner.read().ok()?;
        inner.reliability.get(bus_line).copied()
    }
}
