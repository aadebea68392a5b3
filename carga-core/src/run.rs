use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use carga_http::HttpClient;
use carga_metrics::Registry;
use tokio::sync::Barrier;
use tokio::time::MissedTickBehavior;

use crate::config::{ScenarioConfig, ScenarioExecutor};
use crate::error::Result;
use crate::gate::IterationGate;
use crate::iteration_metrics::IterationMetricIds;
use crate::metrics_agg::{MetricComputer, ScenarioSnapshot, metric_summaries};
use crate::progress::{ProgressFn, ProgressUpdate, ScenarioProgress, StageProgress};
use crate::request_metrics::RequestMetricIds;
use crate::scenario::Scenario;
use crate::schedule::RampingSchedule;
use crate::summary::RunSummary;
use crate::thresholds::ThresholdSet;
use crate::thresholds_eval::{ParsedThreshold, evaluate_thresholds, parse_threshold_sets};
use crate::vu::{StartSignal, VuContext, VuWork, run_vu};

pub type EnvVars = Arc<[(Arc<str>, Arc<str>)]>;

/// Snapshot of the process environment, later entries winning.
pub fn process_env_snapshot() -> EnvVars {
    std::env::vars()
        .map(|(k, v)| (Arc::<str>::from(k), Arc::<str>::from(v)))
        .collect::<Vec<_>>()
        .into()
}

/// Last value wins when a key repeats.
pub fn env_lookup<'a>(env: &'a EnvVars, key: &str) -> Option<&'a str> {
    env.iter()
        .rev()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_ref())
}

/// State shared by every VU of a run.
#[derive(Debug)]
pub struct RunContext {
    pub env: EnvVars,
    pub metrics: Arc<Registry>,
    pub request_metrics: RequestMetricIds,
    pub iteration_metrics: IterationMetricIds,
    pub client: HttpClient,
    pub thresholds: Vec<ParsedThreshold>,
}

impl RunContext {
    /// Fails when a threshold expression does not parse, before anything runs.
    pub fn new(env: EnvVars, thresholds: &[ThresholdSet]) -> Result<Self> {
        let thresholds = parse_threshold_sets(thresholds)?;
        let metrics = Arc::new(Registry::default());
        let request_metrics = RequestMetricIds::register(&metrics);
        let iteration_metrics = IterationMetricIds::register(&metrics);

        Ok(Self {
            env,
            metrics,
            request_metrics,
            iteration_metrics,
            client: HttpClient::default(),
            thresholds,
        })
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        env_lookup(&self.env, key)
    }
}

#[derive(Clone)]
enum ProgressInfo {
    ConstantVus {
        vus: u64,
        duration: Option<Duration>,
        iterations: Option<u64>,
    },
    RampingVus {
        schedule: Arc<RampingSchedule>,
    },
}

impl ProgressInfo {
    fn at(&self, elapsed: Duration) -> ScenarioProgress {
        match self {
            Self::ConstantVus {
                vus,
                duration,
                iterations,
            } => ScenarioProgress::ConstantVus {
                vus: *vus,
                duration: *duration,
                iterations: *iterations,
            },
            Self::RampingVus { schedule } => ScenarioProgress::RampingVus {
                total_duration: schedule.total_duration(),
                stage: schedule.stage_snapshot_at(elapsed).map(|st| StageProgress {
                    stage: st.index + 1,
                    stages: st.count,
                    stage_elapsed: st.stage_elapsed,
                    stage_remaining: st.stage_remaining,
                    start_target: st.start_target,
                    end_target: st.end_target,
                    current_target: st.current_target,
                }),
            },
        }
    }
}

pub async fn run_scenarios(
    scenarios: Vec<ScenarioConfig>,
    ctx: RunContext,
    scenario: Arc<dyn Scenario>,
    progress: Option<ProgressFn>,
) -> Result<RunSummary> {
    let run_ctx = Arc::new(ctx);

    let total_vus: usize = scenarios
        .iter()
        .map(|s| usize::try_from(s.executor.max_vus()).unwrap_or(usize::MAX))
        .fold(0usize, usize::saturating_add);
    let ready_barrier = Arc::new(Barrier::new(total_vus.saturating_add(1)));
    let start_signal = Arc::new(StartSignal::new());
    let run_started: Arc<OnceLock<Instant>> = Arc::new(OnceLock::new());

    let mut gates: Vec<Arc<IterationGate>> = Vec::new();
    let mut progress_scenarios: Vec<(String, ProgressInfo)> = Vec::new();
    let mut scenario_names: Vec<String> = Vec::new();
    let mut handles = Vec::with_capacity(total_vus);
    let mut next_vu_id: u64 = 1;

    for cfg in scenarios {
        let name = cfg.metrics_ctx.scenario().to_string();
        if !scenario_names.contains(&name) {
            scenario_names.push(name.clone());
        }

        let work = match &cfg.executor {
            ScenarioExecutor::ConstantVus { vus } => {
                let gate = Arc::new(IterationGate::new(cfg.iterations, cfg.duration));
                gates.push(gate.clone());
                progress_scenarios.push((
                    name.clone(),
                    ProgressInfo::ConstantVus {
                        vus: *vus,
                        duration: cfg.duration,
                        iterations: cfg.iterations,
                    },
                ));
                VuWork::Constant { gate }
            }
            ScenarioExecutor::RampingVus { start_vus, stages } => {
                let schedule = Arc::new(RampingSchedule::new(*start_vus, stages.clone()));
                progress_scenarios.push((
                    name.clone(),
                    ProgressInfo::RampingVus {
                        schedule: schedule.clone(),
                    },
                ));
                VuWork::RampingVus { schedule }
            }
        };

        for scenario_vu in 1..=cfg.executor.max_vus() {
            let ctx = VuContext {
                vu_id: next_vu_id,
                scenario_vu,
                metrics_ctx: cfg.metrics_ctx.clone(),
                work: work.clone(),
                run_ctx: run_ctx.clone(),
                run_started: run_started.clone(),
                ready_barrier: ready_barrier.clone(),
                start_signal: start_signal.clone(),
            };
            next_vu_id = next_vu_id.saturating_add(1);
            handles.push(tokio::spawn(run_vu(ctx, scenario.clone())));
        }
    }

    // Every VU is spawned and parked: start the clock once for all of them.
    ready_barrier.wait().await;

    let started = Instant::now();
    let _ = run_started.set(started);
    for gate in &gates {
        gate.start_at(started);
    }
    start_signal.start();
    tracing::info!(vus = total_vus, scenarios = scenario_names.len(), "run started");

    let progress_handle = progress.map(|progress| {
        let metrics = run_ctx.metrics.clone();
        let computer = MetricComputer::new(
            &metrics,
            run_ctx.request_metrics,
            run_ctx.iteration_metrics,
        );
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately; the first report should cover a full second.
            interval.tick().await;

            let mut tick: u64 = 0;
            let mut last_at = Instant::now();
            let mut prev_by_scenario: HashMap<String, ScenarioSnapshot> = HashMap::new();

            loop {
                interval.tick().await;
                tick = tick.saturating_add(1);
                let now = Instant::now();
                let dt = now.duration_since(last_at);
                last_at = now;
                let elapsed = started.elapsed();

                for (name, info) in &progress_scenarios {
                    let prev = prev_by_scenario.get(name).copied();
                    let (live, snapshot) = computer.compute_live_metrics(
                        &metrics,
                        name,
                        prev,
                        dt.as_secs_f64(),
                        elapsed.as_secs_f64(),
                    );
                    prev_by_scenario.insert(name.clone(), snapshot);

                    (progress)(ProgressUpdate {
                        tick,
                        interval: dt,
                        elapsed,
                        scenario: name.clone(),
                        metrics: live,
                        progress: info.at(elapsed),
                    });
                }
            }
        })
    });

    for h in handles {
        h.await?;
    }

    if let Some(h) = progress_handle {
        h.abort();
        let _ = h.await;
    }

    let elapsed = started.elapsed();
    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "run finished");

    Ok(build_run_summary(&run_ctx, &scenario_names, elapsed))
}

pub(crate) fn build_run_summary(
    ctx: &RunContext,
    scenario_names: &[String],
    elapsed: Duration,
) -> RunSummary {
    let metrics = &ctx.metrics;
    let computer = MetricComputer::new(metrics, ctx.request_metrics, ctx.iteration_metrics);

    RunSummary {
        elapsed,
        scenarios: scenario_names
            .iter()
            .map(|name| computer.compute_scenario_summary(metrics, name))
            .collect(),
        metrics: metric_summaries(metrics),
        checks: computer.check_summaries(metrics),
        thresholds: evaluate_thresholds(metrics, &ctx.thresholds),
    }
}
