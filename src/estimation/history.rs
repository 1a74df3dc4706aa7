//! Historical feedback: nudges the base ETA by how late or early a line
//! has actually run at this hour over the trailing window.

use time::{Duration, OffsetDateTime};

/// Minutes of average signed delay that move the raw adjustment by 1.0.
/// A +5 minute average delay maps to a factor of 1.1 before clamping.
const DELAY_SCALE_MINUTES: f64 = 50.0;

#[derive(Debug, Clone, Copy)]
pub struct HistoryParams {
    pub window_days: u32,
    pub adjustment_floor: f64,
    pub adjustment_ceiling: f64,
}

impl Default for HistoryParams {
    fn default() -> Self {
        Self {
            window_days: 7,
            adjustment_floor: 0.8,
            adjustment_ceiling: 1.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoricalAdjuster {
    params: HistoryParams,
}

impl HistoricalAdjuster {
    pub fn new(params: HistoryParams) -> Self {
        Self { params }
    }

    /// Start of the trailing window the delay aggregate should cover.
    pub fn window_start(&self, now: OffsetDateTime) -> OffsetDateTime {
        now - Duration::days(i64::from(self.params.window_days))
    }

    /// Maps an average signed delay (positive = line runs late) to a bounded
    /// multiplicative correction. Absent history is neutral.
    pub fn adjustment_factor(&self, average_delay_minutes: Option<f64>) -> f64 {
        match average_delay_minutes {
            Some(delay) if delay.is_finite() => (1.0 + delay / DELAY_SCALE_MINUTES)
                .clamp(self.params.adjustment_floor, self.params.adjustment_ceiling),
            _ => 1.0,
        }
    }

    /// Applies the correction, returning the adjusted ETA and the factor used.
    pub fn adjust(
        &self,
        base_eta_minutes: f64,
        average_delay_minutes: Option<f64>,
    ) -> (f64, f64) {
        let factor = self.adjustment_factor(average_delay_minutes);
        (base_eta_minutes * factor, factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn absent_history_is_exactly_neutral() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());
        assert_eq!(adjuster.adjustment_factor(None), 1.0);
    }

    #[test]
    fn late_line_increases_eta() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());

        let (adjusted, factor) = adjuster.adjust(30.0, Some(5.0));

        assert!((factor - 1.1).abs() < 1e-9);
        assert!(adjusted > 30.0);
    }

    #[test]
    fn early_line_decreases_eta() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());

        let (adjusted, factor) = adjuster.adjust(30.0, Some(-5.0));

        assert!((factor - 0.9).abs() < 1e-9);
        assert!(adjusted < 30.0);
    }

    #[test]
    fn factor_saturates_at_configured_bounds() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());

        assert_eq!(adjuster.adjustment_factor(Some(500.0)), 1.2);
        assert_eq!(adjuster.adjustment_factor(Some(-500.0)), 0.8);
    }

    #[test]
    fn factor_is_monotonic_in_signed_delay() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());
        let delays = [-20.0, -5.0, 0.0, 3.0, 10.0, 40.0];

        let mut previous = f64::NEG_INFINITY;
        for delay in delays {
            let factor = adjuster.adjustment_factor(Some(delay));
            assert!(factor >= previous, "delay {delay} broke monotonicity");
            previous = factor;
        }
    }

    #[test]
    fn non_finite_delay_is_treated_as_neutral() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());
        assert_eq!(adjuster.adjustment_factor(Some(f64::NAN)), 1.0);
    }

    #[test]
    fn window_start_is_window_days_back() {
        let adjuster = HistoricalAdjuster::new(HistoryParams::default());
        let now = datetime!(2026-08-28 08:00:00 UTC);
        assert_eq!(adjuster.window_start(now), datetime!(2026-08-21 08:00:00 UTC));
    }
}
