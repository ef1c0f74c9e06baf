//! mvnsecrets - run Maven with repository-manager credentials from a secrets store
//!
//! The binary is a thin shell over [`mvnsecrets_core::Pipeline`]: it parses
//! arguments, sets up tracing, picks a secret resolver and maps errors onto
//! exit codes.

// CLI output goes to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;
