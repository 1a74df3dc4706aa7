//! The per-report estimation pipeline.
//!
//! One stateless computation per incoming report: resolve a route, derive a
//! base ETA, correct it with the line's historical delay, then score the
//! result and pick the next polling interval. The only suspension point is
//! the routing query, which is deadline-bounded inside the provider.

use crate::config::{Config, Destination};
use crate::error::AppError;
use crate::geo::{self, Coordinates};
use crate::state::{EtaEstimate, LocationSample};
use crate::storage::{LocationId, TelemetryStore};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::info;

pub mod confidence;
pub mod eta;
pub mod history;
pub mod interval;
pub mod mock;
pub mod occupancy;
pub mod route;
pub mod traffic;

use confidence::ConfidenceScorer;
use eta::EtaEstimator;
use history::HistoricalAdjuster;
use interval::AdaptiveIntervalPolicy;
use occupancy::OccupancySpeedModel;
use route::{RouteDistanceProvider, RoutingApi};
use traffic::TrafficFactorModel;

/// Everything the pipeline produced for one report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub location_id: LocationId,
    pub destination: Destination,
    pub estimate: EtaEstimate,
    pub adaptive_interval_seconds: u32,
}

pub struct EtaPipeline {
    route_provider: RouteDistanceProvider,
    traffic: TrafficFactorModel,
    occupancy: OccupancySpeedModel,
    estimator: EtaEstimator,
    adjuster: HistoricalAdjuster,
    scorer: ConfidenceScorer,
    interval_policy: AdaptiveIntervalPolicy,
    store: Arc<dyn TelemetryStore>,
    destinations: Vec<Destination>,
}

impl EtaPipeline {
    pub fn from_config(
        config: &Config,
        api: Arc<dyn RoutingApi>,
        store: Arc<dyn TelemetryStore>,
    ) -> Result<Self, AppError> {
        let destinations = config.destinations().to_vec();
        if destinations.is_empty() {
            return Err(AppError::NoDestinations);
        }
        Ok(Self {
            route_provider: RouteDistanceProvider::new(api, config.routing_params()),
            traffic: TrafficFactorModel::default(),
            occupancy: OccupancySpeedModel::default(),
            estimator: EtaEstimator::new(config.eta_params()),
            adjuster: HistoricalAdjuster::new(config.history_params()),
            scorer: ConfidenceScorer::new(config.confidence_bounds()),
            interval_policy: AdaptiveIntervalPolicy::new(config.interval_params()),
            store,
            destinations,
        })
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.destinations
    }

    /// Processes one report against the wall clock.
    pub async fn process_report(
        &self,
        sample: &LocationSample,
    ) -> Result<ReportOutcome, AppError> {
        self.process_report_at(sample, OffsetDateTime::now_utc())
            .await
    }

    /// Processes one report against an injected clock. Given fixed inputs
    /// and a fixed `now`, the outcome is deterministic.
    pub async fn process_report_at(
        &self,
        sample: &LocationSample,
        now: OffsetDateTime,
    ) -> Result<ReportOutcome, AppError> {
        let location_id = self.store.save_location(sample)?;

        let origin = sample.coordinates();
        let destination = nearest_destination(&self.destinations, origin)
            .ok_or(AppError::NoDestinations)?
            .clone();
        let target = Coordinates {
            latitude: destination.latitude,
            longitude: destination.longitude,
        };

        let hour = now.hour();
        let traffic_factor = self.traffic.factor(hour);
        let (occupancy_factor, occupancy_weight) = match sample.occupancy_level {
            Some(level) => (
                self.occupancy.speed_factor(level)?,
                self.occupancy.interval_weight(level)?,
            ),
            None => (1.0, 1.0),
        };

        let route = self.route_provider.get_route(origin, target).await;
        let base = self
            .estimator
            .estimate(&route, traffic_factor, occupancy_factor, now);

        let average_delay = self.store.average_delay_minutes(
            &sample.bus_line,
            hour,
            self.adjuster.window_start(now),
        );
        let (eta_minutes, history_adjustment) =
            self.adjuster.adjust(base.eta_minutes, average_delay);

        let factors = self.scorer.factors(
            occupancy_factor,
            traffic_factor,
            hour,
            base.distance_km,
            self.store.line_reliability(&sample.bus_line),
        );
        let confidence_percent = self.scorer.score(eta_minutes, base.distance_km, &factors);

        let estimate = EtaEstimate {
            eta_minutes,
            base_eta_minutes: base.eta_minutes,
            estimated_arrival: now + Duration::seconds_f64(eta_minutes * 60.0),
            distance_km: base.distance_km,
            confidence_percent,
            factors,
            history_adjustment,
            source: base.source,
        };

        let adaptive_interval_seconds = self
            .interval_policy
            .next_interval(traffic_factor, occupancy_weight);

        self.store.save_prediction(location_id, &estimate)?;
        self.store
            .save_interval(location_id, adaptive_interval_seconds)?;

        info!(
            bus_line = %sample.bus_line,
            destination = %destination.id,
            eta_minutes = estimate.eta_minutes,
            confidence_percent = estimate.confidence_percent,
            source = ?estimate.source,
            interval_seconds = adaptive_interval_seconds,
            "Report processed"
        );

        Ok(ReportOutcome {
            location_id,
            destination,
            estimate,
            adaptive_interval_seconds,
        })
    }
}

/// Nearest destination by great-circle distance; ties keep the first entry.
pub fn nearest_destination(
    destinations: &[Destination],
    origin: Coordinates,
) -> Option<&Destination> {
    let mut best: Option<(&Destination, f64)> = None;
    for destination in destinations {
        let target = Coordinates {
            latitude: destination.latitude,
            longitude: destination.longitude,
        };
        let distance = geo::haversine_km(origin, target);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((destination, distance)),
        }
    }
    best.map(|(destination, _)| destination)
}
