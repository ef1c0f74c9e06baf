//! Command execution secret resolver

use crate::{SecretError, SecretResolver, SecretSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Configuration for exec-based secret resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExecSecretConfig {
    /// Command to execute
    pub command: String,

    /// Arguments to pass to the command
    #[serde(default)]
    pub args: Vec<String>,
}

impl ExecSecretConfig {
    /// Create a new exec secret config
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// Resolves secrets by executing commands
///
/// The command's stdout is the secret payload. The `source` field in
/// [`SecretSpec`] is interpreted as a JSON-encoded [`ExecSecretConfig`], or as
/// a shell command line if parsing fails. Failures are classified from the
/// command's stderr (see [`SecretError::from_provider_message`]).
#[derive(Debug, Clone, Default)]
pub struct ExecSecretResolver;

impl ExecSecretResolver {
    /// Create a new command execution resolver
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Execute a command and return its output
    async fn execute_command(
        &self,
        name: &str,
        source: &str,
        command: &str,
        args: &[String],
    ) -> Result<String, SecretError> {
        tracing::debug!(command, "Executing secret command");

        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SecretError::NotFound {
                        name: name.to_string(),
                        secret_source: source.to_string(),
                    }
                } else {
                    SecretError::ResolutionFailed {
                        name: name.to_string(),
                        message: format!("Failed to execute command '{command}': {e}"),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(status = ?output.status.code(), "Secret command failed");
            return Err(SecretError::from_provider_message(name, source, &stderr));
        }

        SecretError::payload_from_utf8(name, output.stdout)
    }
}

#[async_trait]
impl SecretResolver for ExecSecretResolver {
    fn provider_name(&self) -> &'static str {
        "exec"
    }

    async fn resolve(&self, name: &str, spec: &SecretSpec) -> Result<String, SecretError> {
        // Try to parse source as JSON ExecSecretConfig
        if let Ok(config) = serde_json::from_str::<ExecSecretConfig>(&spec.source) {
            return self
                .execute_command(name, &spec.source, &config.command, &config.args)
                .await;
        }

        // Fallback: treat source as a shell command line
        self.execute_command(
            name,
            &spec.source,
            "sh",
            &["-c".to_string(), spec.source.clone()],
        )
        .await
    }
}
