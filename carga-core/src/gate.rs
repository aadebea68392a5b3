use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared admission control for constant-VU scenarios: an iteration budget, a deadline, or both.
#[derive(Debug)]
pub struct IterationGate {
    issued: AtomicU64,
    iterations: Option<u64>,
    duration: Option<Duration>,
    deadline: OnceLock<Instant>,
}

impl IterationGate {
    pub fn new(iterations: Option<u64>, duration: Option<Duration>) -> Self {
        Self {
            issued: AtomicU64::new(0),
            iterations,
            duration,
            deadline: OnceLock::new(),
        }
    }

    /// Fixes the deadline; later calls are ignored.
    pub fn start_at(&self, started: Instant) {
        if let Some(duration) = self.duration {
            let _ = self.deadline.get_or_init(|| started + duration);
        }
    }

    /// Claims the next iteration, `false` once the budget is spent or the deadline passed.
    pub fn next(&self) -> bool {
        if let Some(duration) = self.duration {
            let now = Instant::now();
            let deadline = *self.deadline.get_or_init(|| now + duration);
            if now >= deadline {
                return false;
            }
        }

        match (self.iterations, self.duration) {
            (Some(total), _) => self.issued.fetch_add(1, Ordering::Relaxed) < total,
            (None, Some(_)) => true,
            // Neither bound: a single iteration.
            (None, None) => self.issued.fetch_add(1, Ordering::Relaxed) == 0,
        }
    }

    pub fn issued(&self) -> u64 {
        let issued = self.issued.load(Ordering::Relaxed);
        self.iterations.map_or(issued, |total| issued.min(total))
    }
}
