//! Discrete-event scheduling of multi-rate controllers.

/// Tracks when a controller with sampling period `period` is next due.
///
/// The next firing time is the first whole multiple of the period past the
/// current step, so a period that is not an integer multiple of the
/// simulation step neither drifts nor collapses to every step. Firing is
/// checked with half a simulation step of tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleClock {
    period: Option<f64>,
    next_fire: f64,
}

impl SampleClock {
    /// `period` must be positive when given; `None` fires every step.
    pub fn new(period: Option<f64>) -> Self {
        Self {
            period: period.filter(|p| *p > 0.0 && p.is_finite()),
            next_fire: 0.0,
        }
    }

    pub fn period(&self) -> Option<f64> {
        self.period
    }

    pub fn reset(&mut self) {
        self.next_fire = 0.0;
    }

    /// Whether the controller fires at simulation `time` with step `dt`.
    /// Advances the clock when it does.
    pub fn tick(&mut self, time: f64, dt: f64) -> bool {
        let period = match self.period {
            Some(p) => p,
            None => return true,
        };
        let horizon = time + 0.5 * dt;
        if horizon < self.next_fire {
            return false;
        }
        self.next_fire = ((horizon / period).floor() + 1.0) * period;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firing_steps(period: Option<f64>, dt: f64, steps: usize) -> Vec<usize> {
        let mut clock = SampleClock::new(period);
        (0..steps)
            .filter(|&k| clock.tick(k as f64 * dt, dt))
            .collect()
    }

    #[test]
    fn every_step_without_period() {
        assert_eq!(firing_steps(None, 0.01, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn integer_ratio() {
        assert_eq!(firing_steps(Some(0.05), 0.01, 16), vec![0, 5, 10, 15]);
    }

    #[test]
    fn non_integer_ratio_keeps_average_rate() {
        // 0.025 / 0.01 = 2.5 steps per period
        let fired = firing_steps(Some(0.025), 0.01, 100);
        assert_eq!(fired[0], 0);
        assert_eq!(fired.len(), 40);
    }

    #[test]
    fn period_shorter_than_dt_fires_every_step() {
        assert_eq!(firing_steps(Some(0.001), 0.01, 3), vec![0, 1, 2]);
    }

    #[test]
    fn tiny_period_returns_promptly() {
        let mut clock = SampleClock::new(Some(1e-15));
        assert!(clock.tick(1e3, 0.01));
        assert!(clock.tick(1e3 + 0.01, 0.01));
        assert!(clock.period().is_some());
    }

    #[test]
    fn reset_restarts_at_zero() {
        let mut clock = SampleClock::new(Some(1.0));
        assert!(clock.tick(0.0, 0.1));
        assert!(!clock.tick(0.1, 0.1));
        clock.reset();
        assert!(clock.tick(0.0, 0.1));
    }
}
