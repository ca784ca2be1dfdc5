use std::time::{Duration, Instant};

/// Holds back a value until no new input arrived for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record a new value, restarting the delay.
    pub fn input(&mut self, value: T, at: Instant) {
        self.pending = Some((value, at));
    }

    /// Returns the settled value once, after the delay has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let settled = matches!(
            &self.pending,
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay
        );
        if settled {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
