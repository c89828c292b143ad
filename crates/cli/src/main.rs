//! swc - Swift object storage CLI
//!
//! A command-line interface for Swift-compatible object storage services
//! authenticated through Keystone.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use swift_cli::commands::{self, Cli};
use swift_cli::exit_code::ExitCode;

/// Log level used when `--debug` is given and `RUST_LOG` is not set
const DEBUG_FILTER: &str = "warn,swc_core=debug,swc_swift=debug,swift_cli=debug";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.debug { DEBUG_FILTER } else { "warn" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Dropping the command future cancels requests still in flight
    let exit_code = tokio::select! {
        code = commands::execute(cli) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
            ExitCode::Interrupted
        }
    };

    std::process::exit(exit_code.as_i32());
}
