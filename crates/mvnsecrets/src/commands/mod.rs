//! Subcommand implementations
//!
//! Each command returns the text to print on stdout (possibly empty); the
//! binary owns printing and exit codes.

pub mod fetch;
pub mod placeholders;
pub mod render;
pub mod run;

use crate::cli::{Cli, CliError, Commands};
use mvnsecrets_aws::{AwsResolver, AwsResolverOptions};
use mvnsecrets_core::{Config, Pipeline};
use mvnsecrets_secrets::{EnvSecretResolver, ExecSecretResolver, SecretRegistry, SecretResolver};
use std::path::Path;
use std::sync::Arc;

/// Load configuration for this invocation: file, then env and flags
///
/// # Errors
///
/// Returns a configuration error if an explicit config file is missing or invalid.
pub fn load_config(cli: &Cli, cwd: &Path) -> Result<Config, CliError> {
    let config = Config::load(cli.config.as_deref(), cwd)?.with_overrides(cli.source.overrides());
    tracing::debug!(
        provider = %config.secret.provider,
        secret_id = ?config.secret.id,
        program = %config.tool.program,
        "Configuration resolved"
    );
    Ok(config)
}

/// Registry of the resolvers available for `config`
///
/// The AWS resolver is only initialized when it is the configured provider,
/// since loading the AWS configuration touches the environment and profile
/// files.
///
/// # Errors
///
/// Returns an error if the AWS resolver cannot be initialized.
pub async fn registry_for(config: &Config) -> Result<SecretRegistry, CliError> {
    let mut registry = SecretRegistry::new();
    registry.register(Arc::new(EnvSecretResolver::new()));
    registry.register(Arc::new(ExecSecretResolver::new()));

    if config.secret.provider == "aws" {
        let options = AwsResolverOptions {
            region: config.secret.region.clone(),
            endpoint_url: config.secret.endpoint_url.clone(),
            profile: config.secret.profile.clone(),
        };
        registry.register(Arc::new(AwsResolver::new(options).await?));
    }

    Ok(registry)
}

/// Build the pipeline for `config` with its configured resolver
///
/// # Errors
///
/// Returns a configuration error for an unknown provider or unreadable template.
pub async fn build_pipeline(config: Config) -> Result<Pipeline, CliError> {
    let registry = registry_for(&config).await?;
    let resolver: Arc<dyn SecretResolver> = registry.require(&config.secret.provider)?;
    Ok(Pipeline::new(config, resolver)?)
}

/// Dispatch a parsed command line
///
/// # Errors
///
/// Returns the command's error, mapped for exit-code selection.
pub async fn execute(cli: Cli) -> Result<String, CliError> {
    let cwd = std::env::current_dir()
        .map_err(|e| CliError::other(format!("cannot determine working directory: {e}")))?;
    let config = load_config(&cli, &cwd)?;

    match cli.command {
        Commands::Run { args } => run::execute(config, &args).await,
        Commands::Render { check } => render::execute(config, check, cli.json).await,
        Commands::Fetch => fetch::execute(config, cli.json).await,
        Commands::Placeholders => placeholders::execute(config, cli.json).await,
    }
}

/// Serialize a JSON success envelope
pub(crate) fn ok_envelope(data: serde_json::Value) -> Result<String, CliError> {
    serde_json::to_string(&crate::cli::OkEnvelope::new(data))
        .map_err(|e| CliError::other(format!("failed to serialize output: {e}")))
}
