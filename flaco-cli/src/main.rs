//! flaco command-line entry point
//!
//! Probes (`dns`, `ping`, `socket`, `url`, `check`) and SSH batch jobs
//! (`dispatch`, `fetch`). Logs go to stderr; results go to stdout.

mod cli;
mod commands;
mod config;
mod element;

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

/// How long exit waits for blocking SSH calls still running after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(commands::run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    };
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    code
}

/// `-v`/`-vv` win over `RUST_LOG`, which wins over the `info` default.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}
