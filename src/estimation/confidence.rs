//! Confidence scoring with an explainable per-factor breakdown.
//!
//! The breakdown is part of the public contract: callers receive every
//! multiplier that went into the score, not just the scalar.

use crate::state::ConfidenceFactors;

/// Neutral reliability for lines with no recorded track record.
pub const DEFAULT_LINE_RELIABILITY: f64 = 0.85;

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceBounds {
    pub min_percent: f64,
    pub max_percent: f64,
}

impl Default for ConfidenceBounds {
    fn default() -> Self {
        Self {
            min_percent: 10.0,
            max_percent: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    bounds: ConfidenceBounds,
}

impl ConfidenceScorer {
    pub fn new(bounds: ConfidenceBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> ConfidenceBounds {
        self.bounds
    }

    /// Builds the factor breakdown for one request.
    ///
    /// `occupancy_factor` comes from the occupancy table (1.0 when no reading
    /// is available); `line_reliability` is the persistence collaborator's
    /// view of the line, neutral when absent.
    pub fn factors(
        &self,
        occupancy_factor: f64,
        traffic_factor: f64,
        hour: u8,
        distance_km: f64,
        line_reliability: Option<f64>,
    ) -> ConfidenceFactors {
        ConfidenceFactors {
            occupancy: occupancy_factor,
            traffic: traffic_level_factor(traffic_factor),
            time_of_day: time_of_day_factor(hour),
            distance_band: distance_band_factor(distance_km),
            historical_reliability: line_reliability.unwrap_or(DEFAULT_LINE_RELIABILITY),
        }
    }

    /// Fuses implied-speed plausibility with the factor product into a
    /// clamped percentage.
    pub fn score(&self, eta_minutes: f64, distance_km: f64, factors: &ConfidenceFactors) -> f64 {
        if distance_km <= 0.0 {
            // Already at the destination; nothing left to mispredict.
            return self.bounds.max_percent;
        }
        let base = base_confidence(eta_minutes, distance_km);
        let percent = base * factors.product() * 100.0;
        percent.clamp(self.bounds.min_percent, self.bounds.max_percent)
    }
}

/// Plausibility of the implied average speed for an urban bus.
fn base_confidence(eta_minutes: f64, distance_km: f64) -> f64 {
    if eta_minutes <= 0.0 {
        return 0.5;
    }
    let implied_speed = distance_km / eta_minutes * 60.0;
    if implied_speed < 5.0 || implied_speed > 50.0 {
        0.6
    } else if (10.0..=30.0).contains(&implied_speed) {
        0.9
    } else {
        0.8
    }
}

fn traffic_level_factor(traffic_factor: f64) -> f64 {
    if traffic_factor >= 0.8 {
        1.0
    } else if traffic_factor >= 0.6 {
        0.85
    } else {
        0.70
    }
}

fn time_of_day_factor(hour: u8) -> f64 {
    match hour {
        7..=9 => 0.75,   // morning rush
        10..=12 => 0.90,
        13..=14 => 0.85, // lunch
        15..=17 => 0.90,
        18..=19 => 0.70, // evening rush
        20..=23 => 0.95,
        _ => 0.98, // late night
    }
}

fn distance_band_factor(distance_km: f64) -> f64 {
    if distance_km < 2.0 {
        0.95
    } else if distance_km <= 5.0 {
        0.90
    } else {
        0.85
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> ConfidenceScorer {
        ConfidenceScorer::new(ConfidenceBounds::default())
    }

    #[test]
    fn plausible_urban_speed_scores_high_base() {
        // 6 km in 30 min = 12 km/h, inside the high-confidence band.
        assert_eq!(base_confidence(30.0, 6.0), 0.9);
    }

    #[test]
    fn implausible_speeds_score_low_base() {
        // 1 km in 30 min = 2 km/h.
        assert_eq!(base_confidence(30.0, 1.0), 0.6);
        // 30 km in 30 min = 60 km/h.
        assert_eq!(base_confidence(30.0, 30.0), 0.6);
    }

    #[test]
    fn borderline_speed_scores_intermediate_base() {
        // 4 km in 30 min = 8 km/h: sane but outside the middle band.
        assert_eq!(base_confidence(30.0, 4.0), 0.8);
    }

    #[test]
    fn score_stays_within_bounds_for_adverse_factors() {
        let scorer = scorer();
        let factors = ConfidenceFactors {
            occupancy: 0.70,
            traffic: 0.70,
            time_of_day: 0.70,
            distance_band: 0.85,
            historical_reliability: 0.80,
        };

        let score = scorer.score(45.0, 1.0, &factors);

        assert!(score >= 10.0 && score <= 100.0);
    }

    #[test]
    fn score_floors_at_min_bound() {
        let scorer = ConfidenceScorer::new(ConfidenceBounds {
            min_percent: 50.0,
            max_percent: 95.0,
        });
        let factors = ConfidenceFactors {
            occupancy: 0.70,
            traffic: 0.70,
            time_of_day: 0.70,
            distance_band: 0.85,
            historical_reliability: 0.80,
        };

        assert_eq!(scorer.score(90.0, 1.0, &factors), 50.0);
    }

    #[test]
    fn zero_distance_scores_max_confidence() {
        let scorer = scorer();
        let factors = scorer.factors(0.70, 0.6, 18, 0.0, None);

        assert_eq!(scorer.score(0.0, 0.0, &factors), 100.0);
    }

    #[test]
    fn crowded_bus_scores_lower_than_empty() {
        let scorer = scorer();
        let empty = scorer.factors(1.0, 0.6, 8, 8.7, None);
        let full = scorer.factors(0.70, 0.6, 8, 8.7, None);

        let empty_score = scorer.score(43.6, 8.7, &empty);
        let full_score = scorer.score(62.3, 8.7, &full);

        assert!(full_score < empty_score);
    }

    #[test]
    fn reliability_defaults_to_neutral_mid_value() {
        let scorer = scorer();
        let factors = scorer.factors(1.0, 1.0, 3, 4.0, None);
        assert_eq!(factors.historical_reliability, DEFAULT_LINE_RELIABILITY);

        let seeded = scorer.factors(1.0, 1.0, 3, 4.0, Some(0.95));
        assert_eq!(seeded.historical_reliability, 0.95);
    }

    #[test]
    fn traffic_level_factor_bands() {
        assert_eq!(traffic_level_factor(1.1), 1.0);
        assert_eq!(traffic_level_factor(0.7), 0.85);
        assert_eq!(traffic_level_factor(0.5), 0.70);
    }

    #[test]
    fn distance_band_factor_bands() {
        assert_eq!(distance_band_factor(1.5), 0.95);
        assert_eq!(distance_band_factor(3.0), 0.90);
        assert_eq!(distance_band_factor(8.7), 0.85);
    }
}
