//! Occupancy-derived multipliers.
//!
//! Levels come from the external vision collaborator as integers 0 (empty)
//! to 4 (full). Levels outside that range are a validation error, never
//! silently clamped.

use crate::error::AppError;
use crate::state::MAX_OCCUPANCY_LEVEL;

/// Speed degradation per level: a crowded bus dwells longer at stops.
const SPEED_FACTORS: [f64; 5] = [1.0, 0.95, 0.90, 0.80, 0.70];

/// Polling-interval weighting per level: empty buses report less often,
/// crowded buses more often.
const INTERVAL_WEIGHTS: [f64; 5] = [1.2, 1.1, 1.0, 0.8, 0.6];

#[derive(Debug, Clone)]
pub struct OccupancySpeedModel {
    speed_factors: [f64; 5],
    interval_weights: [f64; 5],
}

impl OccupancySpeedModel {
    pub fn speed_factor(&self, level: u8) -> Result<f64, AppError> {
        if level > MAX_OCCUPANCY_LEVEL {
            return Err(AppError::InvalidOccupancyLevel(level));
        }
        Ok(self.speed_factors[usize::from(level)])
    }

    pub fn interval_weight(&self, level: u8) -> Result<f64, AppError> {
        if level > MAX_OCCUPANCY_LEVEL {
            return Err(AppError::InvalidOccupancyLevel(level));
        }
        Ok(self.interval_weights[usize::from(level)])
    }
}

impl Default for OccupancySpeedModel {
    fn default() -> Self {
        Self {
            speed_factors: SPEED_FACTORS,
            interval_weights: INTERVAL_WEIGHTS,
        }
    }
}
