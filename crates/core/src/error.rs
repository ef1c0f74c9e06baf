//! Error types for mvnsecrets-core

use crate::runner::RunError;
use crate::template::RenderError;
use miette::Diagnostic;
use mvnsecrets_secrets::SecretError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mvnsecrets operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(mvnsecrets::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// The secrets store could not supply the credential pair
    #[error("{source}")]
    #[diagnostic(code(mvnsecrets::secret))]
    Secret {
        /// The underlying secret error
        #[source]
        source: SecretError,
        /// Kind-specific help text
        #[help]
        help: Option<String>,
    },

    /// Template rendering failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    /// The build tool could not be started or awaited
    #[error(transparent)]
    #[diagnostic(transparent)]
    Run(#[from] RunError),

    /// The build tool ran and exited unsuccessfully
    #[error("'{program}' exited with status {code}")]
    #[diagnostic(code(mvnsecrets::run::non_zero_exit))]
    NonZeroExit {
        /// The program that was run
        program: String,
        /// Its exit code (128 + signal for signal deaths)
        code: i32,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(
        code(mvnsecrets::io::error),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<PathBuf>,
        /// Description of the operation that failed
        operation: String,
    },
}

impl Error {
    /// Create a configuration error with help text
    #[must_use]
    pub fn configuration_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an I/O error with context
    #[must_use]
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path,
            operation: operation.into(),
        }
    }

    /// Stable machine-readable kind, used in JSON error envelopes
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "config",
            Self::Secret { source, .. } => match source {
                SecretError::NotFound { .. } => "secret_not_found",
                SecretError::AccessDenied { .. } => "access_denied",
                SecretError::MalformedPayload { .. } => "malformed_secret_payload",
                SecretError::ResolutionFailed { .. } => "secret_resolution_failed",
                SecretError::UnsupportedResolver { .. } => "unsupported_provider",
            },
            Self::Render(RenderError::MissingValue { .. }) => "missing_template_value",
            Self::Run(RunError::Launch { .. }) => "launch_failed",
            Self::Run(RunError::Wait { .. }) => "wait_failed",
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::Io { .. } => "io",
        }
    }
}

impl From<SecretError> for Error {
    fn from(source: SecretError) -> Self {
        let help = match &source {
            SecretError::NotFound { .. } => {
                Some("Check the secret id and the region/endpoint it lives in")
            }
            SecretError::AccessDenied { .. } => Some(
                "The current identity needs read access to the secret (e.g. secretsmanager:GetSecretValue)",
            ),
            SecretError::MalformedPayload { .. } => Some(
                "The secret must be a JSON object with string fields for the configured username and password names",
            ),
            SecretError::UnsupportedResolver { .. } => Some("Supported providers: aws, env, exec"),
            SecretError::ResolutionFailed { .. } => None,
        };
        Self::Secret {
            source,
            help: help.map(str::to_string),
        }
    }
}

/// Result type alias for mvnsecrets operations
pub type Result<T> = std::result::Result<T, Error>;
