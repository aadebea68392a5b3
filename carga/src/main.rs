mod cli;
mod exit_codes;
mod output;
mod run;
mod run_error;
mod run_support;

use clap::Parser;
use clap::error::ErrorKind;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

use crate::exit_codes::ExitCode;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// `RUST_LOG` filter, `warn` by default. Logs go to stderr: stdout carries `--output json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: cli::Cli) -> ExitCode {
    match cli.command {
        cli::Command::Run(args) => match run::run(args).await {
            Ok(code) => code,
            Err(err) => {
                tracing::debug!(error = ?err, "run aborted");
                eprintln!("{err}");
                err.exit_code()
            }
        },
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(v) => v,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Success,
                _ => ExitCode::InvalidInput,
            }
            .into();
        }
    };

    init_tracing();
    dispatch(cli).await.into()
}
