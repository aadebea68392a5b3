use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context as _;
use carga_core::EnvVars;

use crate::cli::RunArgs;

/// Process env with `--env` overrides applied; later overrides win.
pub(crate) fn merged_env(overrides: &[String]) -> anyhow::Result<EnvVars> {
    let mut map: BTreeMap<String, String> = carga_core::process_env_snapshot()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for raw in overrides {
        let (k, v) = parse_env_override(raw)?;
        map.insert(k, v);
    }

    let vars: Vec<(Arc<str>, Arc<str>)> = map
        .into_iter()
        .map(|(k, v)| (Arc::<str>::from(k), Arc::<str>::from(v)))
        .collect();

    Ok(Arc::from(vars.into_boxed_slice()))
}

fn parse_env_override(s: &str) -> anyhow::Result<(String, String)> {
    let (k, v) = s
        .split_once('=')
        .with_context(|| format!("invalid --env (expected KEY=VALUE): {s}"))?;
    if k.is_empty() {
        anyhow::bail!("invalid --env (empty KEY): {s}");
    }
    Ok((k.to_string(), v.to_string()))
}

pub(crate) fn run_config(args: &RunArgs) -> carga_core::RunConfig {
    carga_core::RunConfig {
        iterations: args.iterations,
        vus: args.vus,
        duration: args.duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_parsing() {
        assert_eq!(
            parse_env_override("URL_BASE=http://x:1").unwrap_or_else(|e| panic!("{e}")),
            ("URL_BASE".to_string(), "http://x:1".to_string())
        );
        assert_eq!(
            parse_env_override("EMPTY=").unwrap_or_else(|e| panic!("{e}")),
            ("EMPTY".to_string(), String::new())
        );
        assert_eq!(
            parse_env_override("A=b=c").unwrap_or_else(|e| panic!("{e}")),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_env_override("NOVALUE").is_err());
        assert!(parse_env_override("=x").is_err());
    }

    #[test]
    fn overrides_replace_and_last_one_wins() {
        let env = merged_env(&[
            "CARGA_TEST_ONLY_KEY=first".to_string(),
            "CARGA_TEST_ONLY_KEY=second".to_string(),
        ])
        .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(carga_core::env_lookup(&env, "CARGA_TEST_ONLY_KEY"), Some("second"));
        let count = env
            .iter()
            .filter(|(k, _)| k.as_ref() == "CARGA_TEST_ONLY_KEY")
            .count();
        assert_eq!(count, 1);
        assert!(merged_env(&["bad".to_string()]).is_err());
    }
}
