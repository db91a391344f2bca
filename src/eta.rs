//! Arrival estimation from progress and elapsed time.
//!
//! Linear extrapolation: if `progress_percent` of the route took
//! `elapsed_seconds`, the remainder takes proportionally as long, plus a
//! dwell allowance per remaining stop.

#[derive(Debug, Clone)]
pub struct EtaOptions {
    /// Returned before the vehicle has made any progress.
    pub default_eta_minutes: f64,
    /// Dwell padding per remaining stop. A tunable, not an invariant.
    pub dwell_minutes_per_stop: f64,
    /// Progress floor guarding the extrapolation near zero.
    pub epsilon: f64,
}

impl Default for EtaOptions {
    fn default() -> Self {
        Self {
            default_eta_minutes: 30.0,
            dwell_minutes_per_stop: 0.5,
            epsilon: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EtaEstimator {
    options: EtaOptions,
}

impl EtaEstimator {
    pub fn new(options: EtaOptions) -> Self {
        Self { options }
    }

    /// Estimated minutes until the route completes.
    pub fn estimate(
        &self,
        progress_percent: f64,
        elapsed_seconds: u32,
        remaining_stops: u32,
    ) -> f64 {
        if progress_percent <= 0.0 {
            return self.options.default_eta_minutes;
        }

        let progress = progress_percent.max(self.options.epsilon);
        let remaining = (100.0 - progress_percent).max(0.0);
        let travel_minutes = (elapsed_seconds as f64 / progress) * remaining / 60.0;

        travel_minutes + remaining_stops as f64 * self.options.dwell_minutes_per_stop
    }
}
