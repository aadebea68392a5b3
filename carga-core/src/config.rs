use std::time::Duration;

use crate::error::{Error, Result};
use crate::metrics_context::MetricsContext;
use crate::thresholds::ThresholdSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: u64,
}

impl Stage {
    pub const fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// Command-line overrides. Any field set here beats the scenario's own options.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub iterations: Option<u64>,
    pub vus: Option<u64>,
    pub duration: Option<Duration>,
}

impl RunConfig {
    fn overrides_set(&self) -> bool {
        self.vus.is_some() || self.iterations.is_some() || self.duration.is_some()
    }
}

/// Run shape and pass/fail criteria declared by a scenario.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,

    /// Non-empty selects the ramping executor starting at `start_vus`.
    pub stages: Vec<Stage>,
    pub start_vus: u64,

    pub thresholds: Vec<ThresholdSet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioExecutor {
    ConstantVus { vus: u64 },

    /// Ramp the number of active VUs up/down over time.
    RampingVus { start_vus: u64, stages: Vec<Stage> },
}

impl ScenarioExecutor {
    /// VUs to spawn: the largest number that can ever be active at once.
    #[must_use]
    pub fn max_vus(&self) -> u64 {
        match self {
            Self::ConstantVus { vus } => *vus,
            Self::RampingVus { start_vus, stages } => stages
                .iter()
                .map(|st| st.target)
                .max()
                .unwrap_or(0)
                .max(*start_vus),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    pub metrics_ctx: MetricsContext,
    pub executor: ScenarioExecutor,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
}

pub const DEFAULT_SCENARIO: &str = "default";

pub fn scenarios_from_options(opts: ScriptOptions, cfg: RunConfig) -> Result<Vec<ScenarioConfig>> {
    let metrics_ctx = MetricsContext::new(DEFAULT_SCENARIO);

    // CLI flags turn a ramping scenario into a constant-VU one.
    if !opts.stages.is_empty() && !cfg.overrides_set() {
        if opts.iterations.is_some() {
            return Err(Error::InvalidIterations);
        }

        let total = opts
            .stages
            .iter()
            .fold(Duration::ZERO, |acc, st| acc.saturating_add(st.duration));
        if total.is_zero() {
            return Err(Error::InvalidStages);
        }

        let executor = ScenarioExecutor::RampingVus {
            start_vus: opts.start_vus,
            stages: opts.stages,
        };
        if executor.max_vus() == 0 {
            return Err(Error::InvalidVus);
        }

        return Ok(vec![ScenarioConfig {
            name: DEFAULT_SCENARIO.to_string(),
            metrics_ctx,
            executor,
            iterations: None,
            duration: Some(total),
        }]);
    }

    let vus = cfg.vus.or(opts.vus).unwrap_or(1);
    if vus == 0 {
        return Err(Error::InvalidVus);
    }

    let duration = cfg.duration.or(opts.duration);

    // One iteration unless a duration bounds the run.
    let iterations = cfg
        .iterations
        .or(opts.iterations)
        .or_else(|| duration.is_none().then_some(1));
    if iterations == Some(0) {
        return Err(Error::InvalidIterations);
    }

    Ok(vec![ScenarioConfig {
        name: DEFAULT_SCENARIO.to_string(),
        metrics_ctx,
        executor: ScenarioExecutor::ConstantVus { vus },
        iterations,
        duration,
    }])
}
