use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }
    // A bare number means seconds.
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("duration '{s}' is too large"));
    }
    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m): {err}"))
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress and summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) and a summary line to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "carga",
    author,
    version,
    about = "Load test for the ServeRest API",
    long_about = "carga drives the ServeRest API with virtual users: each iteration signs up a random admin user, logs in and creates a product picked from a JSON fixture.\n\nBy default the run ramps to 5 VUs over 20 seconds and fails when a threshold is crossed. The target comes from URL_BASE (process env or `--env URL_BASE=...`), defaulting to https://serverest.dev.",
    after_help = "Examples:\n  carga run\n  carga run --env URL_BASE=http://localhost:3000\n  carga run --vus 10 --duration 30s --data data/produtos.json\n  carga run --iterations 1 --output json --out-dir reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the load test
    #[command(
        long_about = "Run the ServeRest scenario.\n\nAny of --vus/--iterations/--duration replaces the built-in ramp with a constant number of VUs."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Total iterations shared by all VUs
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Number of virtual users
    #[arg(long)]
    pub vus: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Add/override env vars (repeatable, KEY=VALUE).
    /// CLI-provided vars override the current process env.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Product fixture: a JSON array of `{"nome", "preco"}` objects
    #[arg(long, value_name = "PATH", default_value = carga_serverest::DEFAULT_FIXTURE_PATH)]
    pub data: PathBuf,

    /// Directory for the HTML report (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_run_overrides() {
        let parsed = Cli::try_parse_from([
            "carga",
            "run",
            "--iterations",
            "10",
            "--vus",
            "2",
            "--duration",
            "250ms",
            "--env",
            "URL_BASE=http://localhost:3000",
            "--env",
            "EMPTY=",
            "--data",
            "fixtures/p.json",
            "--out-dir",
            "reports",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        let Command::Run(args) = cli.command;
        assert_eq!(args.iterations, Some(10));
        assert_eq!(args.vus, Some(2));
        assert_eq!(args.duration, Some(Duration::from_millis(250)));
        assert_eq!(
            args.env,
            vec![
                "URL_BASE=http://localhost:3000".to_string(),
                "EMPTY=".to_string()
            ]
        );
        assert_eq!(args.data, PathBuf::from("fixtures/p.json"));
        assert_eq!(args.out_dir, Some(PathBuf::from("reports")));
        assert!(matches!(args.output, OutputFormat::Json));
    }

    #[test]
    fn cli_run_defaults() {
        let cli = match Cli::try_parse_from(["carga", "run"]) {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        let Command::Run(args) = cli.command;
        assert_eq!(args.iterations, None);
        assert_eq!(args.vus, None);
        assert_eq!(args.duration, None);
        assert!(args.env.is_empty());
        assert_eq!(args.data, PathBuf::from("data/produtos.json"));
        assert_eq!(args.out_dir, None);
        assert!(matches!(args.output, OutputFormat::HumanReadable));
    }

    #[test]
    fn cli_rejects_bad_duration() {
        assert!(Cli::try_parse_from(["carga", "run", "--duration", "10x"]).is_err());
    }
}
