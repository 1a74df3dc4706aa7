//! Base ETA computation from a resolved route and the active multipliers.

use crate::estimation::route::RouteResult;
use crate::state::RouteSource;
use time::{Duration, OffsetDateTime};

/// Sentinel ETA reported when the computation degenerates (non-finite or
/// negative intermediate values).
pub const DEGENERATE_ETA_MINUTES: f64 = 999.0;

#[derive(Debug, Clone, Copy)]
pub struct EtaParams {
    pub default_speed_kmh: f64,
    pub min_speed_kmh: f64,
    pub max_speed_kmh: f64,
}

impl Default for EtaParams {
    fn default() -> Self {
        Self {
            default_speed_kmh: 20.0,
            min_speed_kmh: 2.0,
            max_speed_kmh: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseEta {
    pub eta_minutes: f64,
    pub distance_km: f64,
    pub estimated_arrival: OffsetDateTime,
    pub source: RouteSource,
}

#[derive(Debug, Clone)]
pub struct EtaEstimator {
    params: EtaParams,
}

impl EtaEstimator {
    pub fn new(params: EtaParams) -> Self {
        Self { params }
    }

    pub fn estimate(
        &self,
        route: &RouteResult,
        traffic_factor: f64,
        occupancy_factor: f64,
        now: OffsetDateTime,
    ) -> BaseEta {
        let distance_km = route.distance_km();

        let eta_minutes = if distance_km <= 0.0 {
            0.0
        } else {
            match route {
                // The routing engine already knows the road network; keep its
                // duration and only rescale for congestion. A factor below
                // 1.0 means slower traffic, so it lengthens the duration.
                RouteResult::External {
                    duration_seconds, ..
                } => duration_seconds / traffic_factor / 60.0,
                RouteResult::Fallback { .. } => {
                    let effective_speed = (self.params.default_speed_kmh
                        * traffic_factor
                        * occupancy_factor)
                        .clamp(self.params.min_speed_kmh, self.params.max_speed_kmh);
                    distance_km / effective_speed * 60.0
                }
            }
        };

        let eta_minutes = if eta_minutes.is_finite() && eta_minutes >= 0.0 {
            eta_minutes
        } else {
            DEGENERATE_ETA_MINUTES
        };

        BaseEta {
            eta_minutes,
            distance_km,
            estimated_arrival: now + Duration::seconds_f64(eta_minutes * 60.0),
            source: route.source(),
        }
    }
}
