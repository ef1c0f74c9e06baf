//! mvnsecrets CLI application
//!
//! Fetches repository-manager credentials, renders a short-lived settings
//! file and runs the build tool against it.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use ::tracing::Instrument;
use mvnsecrets::cli::{self, EXIT_FAILURE, EXIT_OK, exit_code_for, render_error};
use mvnsecrets::commands;
use mvnsecrets::tracing::{self, Level, TracingConfig};
use std::io::Write;

fn main() {
    // NOTE: eprintln! is used because tracing may be unusable during a panic.
    // Unwinding still drops the rendered settings file.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();
    let json = cli.json;

    let tracing_config = TracingConfig {
        format: cli.tracing_format(),
        level: Level::from(cli.level),
    };
    if let Err(e) = tracing::init_tracing(tracing_config) {
        eprintln!("Warning: {e}");
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let invocation = commands::execute(cli).instrument(tracing::invocation_span());
    let exit_code = match rt.block_on(invocation) {
        Ok(output) => {
            if !output.is_empty() {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(output.as_bytes());
                if !output.ends_with('\n') {
                    let _ = stdout.write_all(b"\n");
                }
                let _ = stdout.flush();
            }
            EXIT_OK
        }
        Err(err) => {
            ::tracing::debug!(kind = err.kind(), "Command failed");
            render_error(&err, json);
            exit_code_for(&err)
        }
    };

    drop(rt);
    std::process::exit(exit_code);
}
