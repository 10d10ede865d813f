use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dhcprobe::{Args, Probe, ProbeConfig, ProbeOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(ProbeOutcome::Reply) => ExitCode::SUCCESS,
        Ok(ProbeOutcome::Timeout) => ExitCode::from(2),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ProbeOutcome> {
    let config = ProbeConfig::try_from(args)?;
    let probe = Probe::new(config).await?;
    Ok(probe.run().await?)
}
