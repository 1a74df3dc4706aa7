//! Adaptive polling-interval recommendation.

#[derive(Debug, Clone, Copy)]
pub struct IntervalParams {
    pub default_seconds: u32,
    pub min_seconds: u32,
    pub max_seconds: u32,
}

impl Default for IntervalParams {
    fn default() -> Self {
        Self {
            default_seconds: 30,
            min_seconds: 10,
            max_seconds: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdaptiveIntervalPolicy {
    params: IntervalParams,
}

impl AdaptiveIntervalPolicy {
    pub fn new(params: IntervalParams) -> Self {
        Self { params }
    }

    /// Heavier traffic (factor < 1) and a crowded bus (weight < 1) both
    /// shrink the interval so reports arrive more often when conditions
    /// change fastest. The result is always within the configured bounds.
    pub fn next_interval(&self, traffic_factor: f64, occupancy_weight: f64) -> u32 {
        let raw = f64::from(self.params.default_seconds) * traffic_factor * occupancy_weight;
        raw.round().clamp(
            f64::from(self.params.min_seconds),
            f64::from(self.params.max_seconds),
        ) as u32
    }
}
