use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use carga_core::format::{format_duration_single, format_rate};
use carga_core::{ScenarioConfig, ScenarioExecutor, ScenarioProgress};

mod progress;
mod summary;

use progress::{HumanProgress, Position};
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

fn describe_executor(s: &ScenarioConfig) -> String {
    let mut out = match &s.executor {
        ScenarioExecutor::ConstantVus { vus } => format!("exec=constant-vus vus={vus}"),
        ScenarioExecutor::RampingVus { start_vus, stages } => {
            let stages = stages
                .iter()
                .map(|st| format!("{}@{}", st.target, format_duration_single(st.duration)))
                .collect::<Vec<_>>()
                .join(",");
            format!("exec=ramping-vus start_vus={start_vus} stages=[{stages}]")
        }
    };
    if let Some(n) = s.iterations {
        out.push_str(&format!(" iterations={n}"));
    }
    if let Some(d) = s.duration {
        out.push_str(&format!(" duration={}", format_duration_single(d)));
    }
    out
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, base_url: &str, scenarios: &[ScenarioConfig]) {
        println!("target: {base_url}");
        for s in scenarios {
            println!(
                "scenario: {} {}",
                s.metrics_ctx.scenario(),
                describe_executor(s)
            );
        }
        if !scenarios.is_empty() {
            println!();
        }
    }

    fn progress(&self) -> Option<carga_core::ProgressFn> {
        let progress = self.progress.clone();
        // Last seen (iterations, errors) per scenario.
        let prev: Arc<Mutex<HashMap<String, (u64, u64)>>> = Arc::new(Mutex::new(HashMap::new()));

        Some(Arc::new(move |u| {
            let dt = u.interval.as_secs_f64().max(1e-9);
            let iters_total = u.metrics.iterations_total;
            let errors_total = u
                .metrics
                .failed_requests_total
                .saturating_add(u.metrics.checks_failed_total);

            let (prev_iters, prev_errors) = {
                let mut inner = prev.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                inner
                    .insert(u.scenario.clone(), (iters_total, errors_total))
                    .unwrap_or_default()
            };

            let iters_per_sec = (iters_total.saturating_sub(prev_iters) as f64) / dt;
            let errors_delta = errors_total.saturating_sub(prev_errors);

            let rates = format!(
                " vus={} iters/s={} rps={} errors={errors_delta}/{errors_total}",
                u.metrics.active_vus,
                format_rate(iters_per_sec),
                format_rate(u.metrics.rps_now),
            );

            let elapsed = format_duration_single(u.elapsed);
            let (position, message) = match &u.progress {
                ScenarioProgress::ConstantVus {
                    duration,
                    iterations,
                    ..
                } => {
                    let position = match (duration, iterations) {
                        (Some(total), _) => Position::Elapsed {
                            elapsed: u.elapsed,
                            total: *total,
                        },
                        (None, Some(total)) => Position::Iterations {
                            done: iters_total,
                            total: *total,
                        },
                        (None, None) => Position::Unbounded,
                    };
                    (position, format!("elapsed={elapsed}{rates}"))
                }
                ScenarioProgress::RampingVus {
                    total_duration,
                    stage,
                } => {
                    let msg = match stage {
                        Some(stage) => format!(
                            "stage={}/{} target={} elapsed={elapsed} stage_remaining={}{rates}",
                            stage.stage,
                            stage.stages,
                            stage.current_target,
                            format_duration_single(stage.stage_remaining),
                        ),
                        None => format!("elapsed={elapsed}{rates}"),
                    };
                    let position = Position::Elapsed {
                        elapsed: u.elapsed,
                        total: *total_duration,
                    };
                    (position, msg)
                }
            };

            progress.update(&u.scenario, position, message);
        }))
    }

    fn print_summary(
        &self,
        summary: &carga_core::RunSummary,
        reports: &[PathBuf],
    ) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(summary));
        for path in reports {
            println!("report: {}", path.display());
        }
        Ok(())
    }
}
