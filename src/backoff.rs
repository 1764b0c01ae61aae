use std::time::Duration;

use crate::config::ConnectOptions;

/// Reconnection back-off state.
///
/// `next_delay` is deterministic given the state: after the first attempt,
/// exponential mode multiplies the current delay by the configured multiplier
/// and clamps it to the maximum when that bound is non-negative. A multiplier
/// of 1 or below is accepted as configured and simply produces a
/// non-increasing delay.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    attempts: i64,
    current_delay_millis: u64,
    initial_delay_millis: u64,
    max_delay_millis: i64,
    max_attempts: i64,
    exponential: bool,
    multiplier: f64,
}

impl ReconnectState {
    pub fn new(
        initial_delay_millis: u64,
        max_delay_millis: i64,
        max_attempts: i64,
        exponential: bool,
        multiplier: f64,
    ) -> Self {
        Self {
            attempts: 0,
            current_delay_millis: initial_delay_millis,
            initial_delay_millis,
            max_delay_millis,
            max_attempts,
            exponential,
            multiplier,
        }
    }

    pub fn from_options(options: &ConnectOptions) -> Self {
        Self::new(
            options.initial_reconnect_delay_millis,
            options.max_reconnect_delay_millis,
            options.max_reconnect_attempts,
            options.use_exponential_back_off,
            options.back_off_multiplier,
        )
    }

    /// The delay to wait before the next reconnect attempt, advancing the
    /// back-off state.
    pub fn next_delay(&mut self) -> Duration {
        if self.exponential && self.attempts > 0 {
            let scaled = (self.current_delay_millis as f64 * self.multiplier).round();
            self.current_delay_millis = if scaled.is_finite() && scaled >= 0.0 {
                scaled as u64
            } else {
                self.current_delay_millis
            };
            if self.max_delay_millis >= 0 && self.current_delay_millis > self.max_delay_millis as u64
            {
                self.current_delay_millis = self.max_delay_millis as u64;
            }
        }
        Duration::from_millis(self.current_delay_millis)
    }

    /// Marks one reconnect attempt as made.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn attempts(&self) -> i64 {
        self.attempts
    }

    /// True once the configured attempt budget is used up. A budget of -1
    /// never exhausts.
    pub fn budget_exhausted(&self) -> bool {
        self.max_attempts >= 0 && self.attempts >= self.max_attempts
    }

    /// Restores the initial delay and a zero attempt count. Called on every
    /// transition into the connected state.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay_millis = self.initial_delay_millis;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn delays(state: &mut ReconnectState, n: usize) -> Vec<u64> {
        (0..n)
            .map(|_| {
                let delay = state.next_delay().as_millis() as u64;
                state.record_attempt();
                delay
            })
            .collect()
    }

    #[test]
    fn test_exponential_sequence_clamps_at_max() {
        let mut state = ReconnectState::new(1000, 30000, -1, true, 2.0);
        assert_eq!(
            delays(&mut state, 7),
            vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]
        );
    }

    #[test]
    fn test_constant_delay_without_exponential() {
        let mut state = ReconnectState::new(1500, -1, -1, false, 2.0);
        assert_eq!(delays(&mut state, 4), vec![1500, 1500, 1500, 1500]);
    }

    #[test]
    fn test_unbounded_max_never_clamps() {
        let mut state = ReconnectState::new(1000, -1, -1, true, 10.0);
        assert_eq!(delays(&mut state, 4), vec![1000, 10000, 100000, 1000000]);
    }

    #[test]
    fn test_multiplier_of_one_or_below_is_accepted() {
        let mut state = ReconnectState::new(1000, -1, -1, true, 0.5);
        assert_eq!(delays(&mut state, 3), vec![1000, 500, 250]);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut state = ReconnectState::new(1000, 30000, 5, true, 2.0);
        delays(&mut state, 4);
        state.reset();
        assert_eq!(state.attempts(), 0);
        assert_eq!(state.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut state = ReconnectState::new(1000, -1, 3, false, 1.0);
        assert!(!state.budget_exhausted());
        delays(&mut state, 3);
        assert!(state.budget_exhausted());
    }

    #[test]
    fn test_negative_budget_never_exhausts() {
        let mut state = ReconnectState::new(1000, -1, -1, false, 1.0);
        delays(&mut state, 100);
        assert!(!state.budget_exhausted());
    }

    proptest! {
        #[test]
        fn prop_exponential_delays_never_exceed_max(
            initial in 1u64..5000,
            max in 0i64..60000,
            multiplier in 1.0f64..4.0,
            attempts in 1usize..20,
        ) {
            let mut state = ReconnectState::new(initial, max, -1, true, multiplier);
            for delay in delays(&mut state, attempts).into_iter().skip(1) {
                prop_assert!(delay <= (max as u64).max(initial));
            }
        }

        #[test]
        fn prop_delays_are_monotonic_for_multiplier_above_one(
            initial in 1u64..5000,
            multiplier in 1.0f64..4.0,
            attempts in 2usize..15,
        ) {
            let mut state = ReconnectState::new(initial, -1, -1, true, multiplier);
            let series = delays(&mut state, attempts);
            for pair in series.windows(2) {
                prop_assert!(pair[1] >= pair[0]);
            }
        }
    }
}
