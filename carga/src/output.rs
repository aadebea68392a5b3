use std::path::PathBuf;

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, base_url: &str, scenarios: &[carga_core::ScenarioConfig]);
    fn progress(&self) -> Option<carga_core::ProgressFn>;
    fn print_summary(
        &self,
        summary: &carga_core::RunSummary,
        reports: &[PathBuf],
    ) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
