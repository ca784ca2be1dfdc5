//! Waiting for host page elements before touching them.
//!
//! The host calls [`ElementWatcher::observe`] on every DOM mutation
//! notification and [`ElementWatcher::finish`] once the document is ready.
//! Actions run as soon as their selector appears. The wait is bounded by an
//! iteration cap and a timeout; when either is hit, the leftover actions run
//! anyway so a missing element degrades a feature instead of hanging it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag, cloned into whatever may need to stop.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Rc<Cell<bool>>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.set(true);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.get()
    }
}

pub trait DomProbe {
    fn exists(&self, selector: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    TimedOut,
    Aborted,
}

type Action = Box<dyn FnOnce()>;

pub struct ElementWatcher {
    pending: Vec<(String, Action)>,
    iterations: u32,
    max_iterations: u32,
    timeout: Duration,
    started: Option<Instant>,
    abort: AbortSignal,
    outcome: Option<Readiness>,
}

impl fmt::Debug for ElementWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementWatcher")
            .field("pending", &self.pending_selectors())
            .field("iterations", &self.iterations)
            .field("outcome", &self.outcome)
            .finish()
    }
}

impl ElementWatcher {
    pub fn new(max_iterations: u32, timeout: Duration) -> Self {
        Self {
            pending: Vec::new(),
            iterations: 0,
            max_iterations,
            timeout,
            started: None,
            abort: AbortSignal::new(),
            outcome: None,
        }
    }

    /// Run `action` once `selector` exists.
    pub fn watch(&mut self, selector: &str, action: impl FnOnce() + 'static) -> &mut Self {
        self.pending.push((selector.to_string(), Box::new(action)));
        self
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    pub fn pending_selectors(&self) -> Vec<&str> {
        self.pending.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn outcome(&self) -> Readiness {
        self.outcome.unwrap_or(Readiness::Pending)
    }

    /// Handle one mutation notification.
    pub fn observe(&mut self, probe: &dyn DomProbe, now: Instant) -> Readiness {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        if self.abort.is_aborted() {
            return self.settle(Readiness::Aborted);
        }

        let started = *self.started.get_or_insert(now);
        self.run_present(probe);
        self.iterations += 1;

        if self.pending.is_empty() {
            return self.settle(Readiness::Ready);
        }
        if self.iterations >= self.max_iterations || now.duration_since(started) >= self.timeout {
            tracing::warn!(
                "Gave up waiting for {:?} after {} iterations",
                self.pending_selectors(),
                self.iterations
            );
            self.run_all();
            return self.settle(Readiness::TimedOut);
        }
        Readiness::Pending
    }

    /// Document is ready: run whatever is still waiting.
    pub fn finish(&mut self, probe: &dyn DomProbe) -> Readiness {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        if self.abort.is_aborted() {
            return self.settle(Readiness::Aborted);
        }

        self.run_present(probe);
        if self.pending.is_empty() {
            return self.settle(Readiness::Ready);
        }
        self.run_all();
        self.settle(Readiness::TimedOut)
    }

    fn run_present(&mut self, probe: &dyn DomProbe) {
        let (found, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(selector, _)| probe.exists(selector));
        self.pending = waiting;
        for (selector, action) in found {
            tracing::debug!("Element '{}' is ready", selector);
            action();
        }
    }

    fn run_all(&mut self) {
        for (_, action) in std::mem::take(&mut self.pending) {
            action();
        }
    }

    fn settle(&mut self, outcome: Readiness) -> Readiness {
        if outcome == Readiness::Aborted {
            self.pending.clear();
        }
        self.outcome = Some(outcome);
        outcome
    }
}
