use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use carga_core::{RunContext, RunSummary, Scenario as _, ThresholdResult};
use carga_serverest::{BASE_URL_ENV, ServeRest};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;
use crate::run_support::{merged_env, run_config};

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let env = merged_env(&args.env).map_err(RunError::InvalidInput)?;

    // The fixture is loaded before any VU starts.
    let products = carga_serverest::load_products(&args.data)
        .map_err(|e| RunError::from_scenario(e, "failed to load product fixture"))?;

    let base_url = carga_serverest::resolve_base_url(carga_core::env_lookup(&env, BASE_URL_ENV));
    let scenario = Arc::new(ServeRest::new(base_url, products));

    let opts = scenario.options();
    let thresholds = opts.thresholds.clone();
    let scenarios = carga_core::scenarios_from_options(opts, run_config(&args))
        .map_err(|e| RunError::from_core(e, "invalid scenario config"))?;
    let ctx = RunContext::new(env, &thresholds)
        .map_err(|e| RunError::from_core(e, "invalid thresholds"))?;

    out.print_header(scenario.base_url(), &scenarios);

    let summary = carga_core::run_scenarios(scenarios, ctx, scenario.clone(), out.progress())
        .await
        .context("run failed")
        .map_err(RunError::Runtime)?;

    // The report is written even when thresholds fail.
    let reports = write_reports(&args, scenario.as_ref(), &summary)?;

    out.print_summary(&summary, &reports)
        .map_err(RunError::Runtime)?;
    print_threshold_violations(summary.threshold_violations());

    Ok(ExitCode::from_thresholds(summary.thresholds_passed()))
}

fn write_reports(
    args: &RunArgs,
    scenario: &ServeRest,
    summary: &RunSummary,
) -> Result<Vec<PathBuf>, RunError> {
    let files = scenario
        .handle_summary(summary)
        .map_err(|e| RunError::from_core(e, "handle_summary failed"))?;

    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .context("failed to resolve current working directory")
            .map_err(RunError::Runtime)?,
    };

    carga_core::write_output_files(&out_dir, &files)
        .with_context(|| format!("failed to write report files under {}", out_dir.display()))
        .map_err(RunError::Runtime)
}

fn print_threshold_violations<'a>(violations: impl Iterator<Item = &'a ThresholdResult>) {
    let violations: Vec<&ThresholdResult> = violations.collect();
    if violations.is_empty() {
        return;
    }

    eprintln!("thresholds_failed: {}", violations.len());
    for v in violations {
        match v.observed {
            Some(o) => eprintln!(
                "threshold_failed: metric={} expr={} observed={o}",
                v.metric, v.expression
            ),
            None => eprintln!(
                "threshold_failed: metric={} expr={} observed=-",
                v.metric, v.expression
            ),
        }
    }
}
