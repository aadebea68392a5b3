use std::time::Duration;

use carga_core::{
    Error, RunConfig, ScenarioExecutor, ScriptOptions, Stage, scenarios_from_options,
};

fn serverest_stages() -> Vec<Stage> {
    vec![
        Stage::new(Duration::from_secs(5), 5),
        Stage::new(Duration::from_secs(10), 5),
        Stage::new(Duration::from_secs(5), 0),
    ]
}

#[test]
fn stages_without_overrides_ramp() {
    let opts = ScriptOptions {
        stages: serverest_stages(),
        ..ScriptOptions::default()
    };

    let scenarios = scenarios_from_options(opts, RunConfig::default())
        .unwrap_or_else(|e| panic!("expected scenarios to be valid: {e}"));
    assert_eq!(scenarios.len(), 1);

    let s = &scenarios[0];
    assert_eq!(s.name, "default");
    assert_eq!(s.iterations, None);
    assert_eq!(s.duration, Some(Duration::from_secs(20)));
    match &s.executor {
        ScenarioExecutor::RampingVus { start_vus, stages } => {
            assert_eq!(*start_vus, 0);
            assert_eq!(stages.len(), 3);
        }
        other => panic!("expected ramping-vus executor, got {other:?}"),
    }
    assert_eq!(s.executor.max_vus(), 5);
}

#[test]
fn cli_overrides_convert_ramping_to_constant_vus() {
    let opts = ScriptOptions {
        stages: serverest_stages(),
        ..ScriptOptions::default()
    };
    let cfg = RunConfig {
        iterations: Some(1),
        vus: Some(1),
        duration: None,
    };

    let scenarios = scenarios_from_options(opts, cfg)
        .unwrap_or_else(|e| panic!("expected scenarios to be valid: {e}"));
    let s = &scenarios[0];
    assert_eq!(s.iterations, Some(1));
    assert_eq!(s.duration, None);
    assert_eq!(s.executor, ScenarioExecutor::ConstantVus { vus: 1 });
}

#[test]
fn duration_override_drops_default_iteration_budget() {
    let cfg = RunConfig {
        duration: Some(Duration::from_secs(3)),
        ..RunConfig::default()
    };

    let scenarios = scenarios_from_options(ScriptOptions::default(), cfg)
        .unwrap_or_else(|e| panic!("expected scenarios to be valid: {e}"));
    let s = &scenarios[0];
    assert_eq!(s.iterations, None);
    assert_eq!(s.duration, Some(Duration::from_secs(3)));
    assert_eq!(s.executor, ScenarioExecutor::ConstantVus { vus: 1 });
}

#[test]
fn invalid_shapes_are_input_errors() {
    let zero_vus = RunConfig {
        vus: Some(0),
        ..RunConfig::default()
    };
    let err = scenarios_from_options(ScriptOptions::default(), zero_vus)
        .err()
        .unwrap_or_else(|| panic!("expected error"));
    assert!(matches!(err, Error::InvalidVus));
    assert!(err.is_invalid_input());

    let all_zero_targets = ScriptOptions {
        stages: vec![Stage::new(Duration::from_secs(1), 0)],
        ..ScriptOptions::default()
    };
    let err = scenarios_from_options(all_zero_targets, RunConfig::default())
        .err()
        .unwrap_or_else(|| panic!("expected error"));
    assert!(matches!(err, Error::InvalidVus));

    let zero_duration = ScriptOptions {
        stages: vec![Stage::new(Duration::ZERO, 3)],
        ..ScriptOptions::default()
    };
    let err = scenarios_from_options(zero_duration, RunConfig::default())
        .err()
        .unwrap_or_else(|| panic!("expected error"));
    assert!(matches!(err, Error::InvalidStages));

    let ramping_with_iterations = ScriptOptions {
        stages: serverest_stages(),
        iterations: Some(10),
        ..ScriptOptions::default()
    };
    let err = scenarios_from_options(ramping_with_iterations, RunConfig::default())
        .err()
        .unwrap_or_else(|| panic!("expected error"));
    assert!(matches!(err, Error::InvalidIterations));
}
