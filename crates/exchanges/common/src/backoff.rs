use std::time::Duration;

const BASE_SECS: f64 = 0.5;
const CAP_SECS: f64 = 30.0;
const JITTER_FRACTION: f64 = 0.10;

/// Jittered exponential backoff per §4.5/§5: `min(30, 0.5·2^n)` seconds,
/// ±10% uniform jitter. `reset()` is called on the first successfully
/// received frame of a new Streaming window (§9 open question, resolved).
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Next delay and advance the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = Self::delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    fn delay_for(attempt: u32) -> Duration {
        let exponential = BASE_SECS * 2f64.powi(attempt as i32);
        let capped = exponential.min(CAP_SECS);
        let jitter_span = capped * JITTER_FRACTION;
        let jitter = rand::random::<f64>() * 2.0 * jitter_span - jitter_span;
        Duration::from_secs_f64((capped + jitter).max(0.0))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_is_near_half_a_second() {
        let mut backoff = Backoff::new();
        let delay = backoff.next_delay().as_secs_f64();
        assert!((0.45..=0.55).contains(&delay), "delay was {delay}");
    }

    #[test]
    fn delay_grows_but_never_exceeds_the_jittered_cap() {
        let mut backoff = Backoff::new();
        for _ in 0..20 {
            let delay = backoff.next_delay().as_secs_f64();
            assert!(delay <= CAP_SECS * (1.0 + JITTER_FRACTION));
        }
    }

    #[test]
    fn reset_restarts_the_schedule_from_the_base_delay() {
        let mut backoff = Backoff::new();
        for _ in 0..10 {
            backoff.next_delay();
        }
        backoff.reset();
        let delay = backoff.next_delay().as_secs_f64();
        assert!((0.45..=0.55).contains(&delay), "delay was {delay}");
    }
}
