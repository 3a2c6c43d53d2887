//! muxline: print a template line filled with the latest line of each input.
//!
//! # Usage
//!
//! ```text
//! muxline [-k 0,1,...] [-v] <FORMAT> <INPUT>...
//! ```
//!
//! Rendered lines go to stdout; diagnostics go to stderr, filtered by
//! `RUST_LOG` (default `warn`). Inputs that cannot be opened are reported
//! whatever the filter says.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use muxline::{open_inputs, KillSet, Mux, Outcome, Template, OPEN_TARGET};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "muxline",
    version,
    about = "Multiplex the latest line of each input into one template line",
    long_about = None,
)]
struct Args {
    /// Indices of the inputs which, when closed, cause the program to quit
    #[arg(short, long, value_name = "0,1,...", env = "MUXLINE_KILL")]
    kill: Option<KillSet>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Format string; `%N` is replaced by the latest line of input N
    format: String,

    /// Inputs to read, numbered from 0
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default))
        .add_directive(format!("{}=error", OPEN_TARGET).parse()?);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let template = Template::compile(&args.format).context("invalid format string")?;
    let kill_set = args.kill.unwrap_or_default();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let result = runtime.block_on(async {
        let inputs = open_inputs(&args.inputs).await;
        Mux::new(template, kill_set)
            .run(inputs, tokio::io::stdout())
            .await
    });

    // Workers may still be parked on blocking reads (e.g. an idle FIFO).
    runtime.shutdown_background();

    match result.context("output failed")? {
        Outcome::Killed(index) => tracing::debug!(index, "stopped by kill set"),
        Outcome::Exhausted => tracing::debug!("all inputs closed"),
    }

    Ok(())
}
