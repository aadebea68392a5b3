use std::net::SocketAddr;
use std::time::Duration;

use carga_testserver::{TestServerOptions, TestServerStats};
use tokio::net::TcpListener;

const USAGE: &str = "carga-testserver\n\nUSAGE:\n  carga-testserver [--bind 127.0.0.1:0] [--latency-ms N] [--usuarios-status CODE] [--empty-token]\n\nOUTPUT:\n  Prints URL_BASE=<url> to stdout once ready.";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut bind_addr: SocketAddr = "127.0.0.1:0".parse()?;
    let mut opts = TestServerOptions::default();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow::anyhow!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--bind" => bind_addr = value("--bind")?.parse()?,
            "--latency-ms" => {
                opts.latency = Duration::from_millis(value("--latency-ms")?.parse()?);
            }
            "--usuarios-status" => opts.usuarios_status = Some(value("--usuarios-status")?.parse()?),
            "--empty-token" => opts.empty_token = true,
            "-h" | "--help" => {
                eprintln!("{USAGE}");
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }

    let listener = TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;
    let app = carga_testserver::router(opts, TestServerStats::default());

    println!("URL_BASE=http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
