//! Secret resolver implementations
//!
//! Built-in resolvers that require no cloud SDK:
//!
//! - [`EnvSecretResolver`] - JSON payload held in an environment variable
//! - [`ExecSecretResolver`] - JSON payload printed by a command
//!
//! AWS Secrets Manager lives in the `mvnsecrets-aws` crate.

mod env;
mod exec;

pub use env::EnvSecretResolver;
pub use exec::{ExecSecretConfig, ExecSecretResolver};
