//! AWS integration for mvnsecrets
//!
//! Reads repository-manager credentials from AWS Secrets Manager via the
//! [`secrets`] module.

pub mod secrets;

pub use secrets::{AwsResolver, AwsResolverOptions, AwsSecretConfig};
