use std::sync::Arc;
use std::time::Duration;

/// Running totals for one scenario, sampled once per second.
#[derive(Debug, Clone, Default)]
pub struct LiveMetrics {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub checks_failed_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,

    /// Requests per second over the last interval.
    pub rps_now: f64,
    /// Requests per second since the start.
    pub rps_avg: f64,
    pub active_vus: u64,
    pub latency_p95_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProgress {
    /// 1-based stage index.
    pub stage: usize,
    pub stages: usize,
    pub stage_elapsed: Duration,
    pub stage_remaining: Duration,
    pub start_target: u64,
    pub end_target: u64,
    pub current_target: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioProgress {
    ConstantVus {
        vus: u64,
        duration: Option<Duration>,
        iterations: Option<u64>,
    },
    RampingVus {
        total_duration: Duration,
        stage: Option<StageProgress>,
    },
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// 1-based tick counter.
    pub tick: u64,
    pub interval: Duration,
    pub elapsed: Duration,
    pub scenario: String,
    pub metrics: LiveMetrics,
    pub progress: ScenarioProgress,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
