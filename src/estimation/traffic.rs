//! Time-of-day congestion model.
//!
//! The multiplier scales *speed*: values below 1.0 mean heavier congestion,
//! values above 1.0 mean free-flowing traffic.

/// Hourly speed multipliers seeded from Recife peak/off-peak patterns.
const HOURLY_FACTORS: [f64; 24] = [
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, // 00-05 overnight
    0.9, // 06
    0.6, 0.6, 0.65, // 07-09 morning peak
    0.85, 0.85, // 10-11
    0.8, 0.8, 0.8, // 12-14 lunch
    0.9, 0.9, // 15-16
    0.6, 0.6, 0.7, // 17-19 evening peak
    1.1, 1.1, 1.1, // 20-22 night
    1.0, // 23
];

#[derive(Debug, Clone)]
pub struct TrafficFactorModel {
    table: [f64; 24],
}

impl TrafficFactorModel {
    /// Returns the speed multiplier for an hour of day.
    /// Out-of-range hours are treated as neutral.
    pub fn factor(&self, hour: u8) -> f64 {
        self.table.get(usize::from(hour)).copied().unwrap_or(1.0)
    }
}

impl Default for TrafficFactorModel {
    fn default() -> Self {
        Self {
            table: HOURLY_FACTORS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_hours_are_congested() {
        let model = TrafficFactorModel::default();
        for hour in [7, 8, 17, 18] {
            let factor = model.factor(hour);
            assert!(factor < 0.7, "hour {hour} factor {factor}");
        }
    }

    #[test]
    fn overnight_is_neutral_or_free_flowing() {
        let model = TrafficFactorModel::default();
        for hour in 0..6 {
            assert!(model.factor(hour) >= 1.0);
        }
    }

    #[test]
    fn morning_peak_matches_table() {
        let model = TrafficFactorModel::default();
        assert_eq!(model.factor(8), 0.6);
    }

    #[test]
    fn out_of_range_hour_defaults_to_neutral() {
        let model = TrafficFactorModel::default();
        assert_eq!(model.factor(24), 1.0);
        assert_eq!(model.factor(200), 1.0);
    }

    #[test]
    fn all_factors_are_positive() {
        let model = TrafficFactorModel::default();
        for hour in 0..24 {
            assert!(model.factor(hour) > 0.0);
        }
    }
}
