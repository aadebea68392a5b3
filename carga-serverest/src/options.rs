use std::time::Duration;

use carga_core::{ScriptOptions, Stage, ThresholdSet};

pub const DEFAULT_BASE_URL: &str = "https://serverest.dev";
pub const BASE_URL_ENV: &str = "URL_BASE";
pub const DEFAULT_FIXTURE_PATH: &str = "data/produtos.json";
pub const FIXTURE_NAME: &str = "produtos";
pub const REPORT_FILE: &str = "relatorio_k6.html";

pub const LOGIN_DURATION: &str = "login_duration";

/// Ramp to 5 VUs, hold, ramp down: 20 seconds in total.
pub fn options() -> ScriptOptions {
    ScriptOptions {
        stages: vec![
            Stage::new(Duration::from_secs(5), 5),
            Stage::new(Duration::from_secs(10), 5),
            Stage::new(Duration::from_secs(5), 0),
        ],
        thresholds: vec![
            ThresholdSet::new("http_req_failed", &["rate<0.01"]),
            ThresholdSet::new("http_req_duration", &["p(95)<3000"]),
            ThresholdSet::new(LOGIN_DURATION, &["p(99)<3000"]),
        ],
        ..ScriptOptions::default()
    }
}

/// `URL_BASE` when set and non-empty, without a trailing `/`.
pub fn resolve_base_url(url_base: Option<&str>) -> String {
    let base = url_base
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carga_core::{RunConfig, ScenarioExecutor, scenarios_from_options};

    #[test]
    fn options_describe_a_twenty_second_ramp() {
        let scenarios = scenarios_from_options(options(), RunConfig::default())
            .unwrap_or_else(|e| panic!("options should be valid: {e}"));
        assert_eq!(scenarios[0].duration, Some(Duration::from_secs(20)));
        assert!(matches!(
            scenarios[0].executor,
            ScenarioExecutor::RampingVus { start_vus: 0, .. }
        ));
        assert_eq!(scenarios[0].executor.max_vus(), 5);

        let parsed = carga_core::parse_threshold_sets(&options().thresholds)
            .unwrap_or_else(|e| panic!("thresholds should parse: {e}"));
        assert_eq!(parsed.len(), 3);
    }

    #[test]
    fn base_url_defaults_and_trims() {
        assert_eq!(resolve_base_url(None), "https://serverest.dev");
        assert_eq!(resolve_base_url(Some("")), "https://serverest.dev");
        assert_eq!(
            resolve_base_url(Some("http://localhost:3000/")),
            "http://localhost:3000"
        );
    }
}
