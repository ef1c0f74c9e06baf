use crate::tracing::TracingFormat;
use clap::{Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use mvnsecrets_core::{ConfigOverrides, RunError};
use mvnsecrets_secrets::SecretError;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Unexpected failure (I/O, waiting on the build tool)
pub const EXIT_FAILURE: i32 = 1;
/// CLI, configuration or template error exit code
pub const EXIT_CLI: i32 = 2;
/// Secrets store error exit code
pub const EXIT_SECRET: i32 = 3;
/// Build tool could not be launched
pub const EXIT_LAUNCH: i32 = 4;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI, configuration or template error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(mvnsecrets::cli::config))]
    Config {
        /// Machine-readable kind
        kind: &'static str,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The secrets store could not supply the credentials (exit code 3)
    #[error("Secret error: {message}")]
    #[diagnostic(code(mvnsecrets::cli::secret))]
    Secret {
        /// Machine-readable kind
        kind: &'static str,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The build tool could not be started (exit code 4)
    #[error("Launch error: {message}")]
    #[diagnostic(code(mvnsecrets::cli::launch))]
    Launch {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The build tool exited unsuccessfully (its exit code is propagated)
    #[error("'{program}' exited with status {code}")]
    #[diagnostic(code(mvnsecrets::cli::tool_exit))]
    ToolExit {
        /// Program that was run
        program: String,
        /// Its exit code
        code: i32,
    },
    /// Other unexpected error (exit code 1)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(mvnsecrets::cli::other))]
    Other {
        /// Machine-readable kind
        kind: &'static str,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            kind: "other",
            message: message.into(),
            help: None,
        }
    }

    /// Machine-readable kind used in JSON error envelopes
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config { kind, .. } | Self::Secret { kind, .. } | Self::Other { kind, .. } => {
                *kind
            }
            Self::Launch { .. } => "launch_failed",
            Self::ToolExit { .. } => "non_zero_exit",
        }
    }
}

fn help_of(diagnostic: &dyn Diagnostic) -> Option<String> {
    diagnostic.help().map(|h| h.to_string())
}

/// Convert `mvnsecrets_core::Error` to the appropriate `CliError` variant.
///
/// - configuration, template and provider-name problems -> Config (exit code 2)
/// - secrets store failures -> Secret (exit code 3)
/// - launch failures -> Launch (exit code 4)
/// - build tool failures -> `ToolExit` (the tool's own code)
/// - I/O and everything else -> Other (exit code 1)
impl From<mvnsecrets_core::Error> for CliError {
    fn from(err: mvnsecrets_core::Error) -> Self {
        use mvnsecrets_core::Error;

        let kind = err.kind();
        match err {
            Error::Configuration { message, help } => Self::Config {
                kind,
                message,
                help,
            },
            Error::Render(ref render) => Self::Config {
                kind,
                message: render.to_string(),
                help: help_of(render),
            },
            Error::Secret {
                source: SecretError::UnsupportedResolver { ref resolver },
                help,
            } => Self::Config {
                kind,
                message: format!("unsupported secret provider '{resolver}'"),
                help,
            },
            Error::Secret { source, help } => Self::Secret {
                kind,
                message: source.to_string(),
                help,
            },
            Error::Run(ref run @ RunError::Launch { .. }) => Self::Launch {
                message: run.to_string(),
                help: help_of(run),
            },
            Error::NonZeroExit { program, code } => Self::ToolExit { program, code },
            Error::Run(RunError::Wait { .. }) => Self::Other {
                kind,
                message: err.to_string(),
                help: None,
            },
            Error::Io {
                ref source,
                ref path,
                ref operation,
            } => {
                let path_str = path
                    .as_ref()
                    .map_or(String::new(), |p| format!(" on {}", p.display()));
                Self::Other {
                    kind,
                    message: format!("I/O {operation} failed{path_str}: {source}"),
                    help: Some("Check file permissions and ensure the path exists".to_string()),
                }
            }
        }
    }
}

impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        mvnsecrets_core::Error::from(err).into()
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Secret { .. } => EXIT_SECRET,
        CliError::Launch { .. } => EXIT_LAUNCH,
        CliError::ToolExit { code, .. } => *code,
        CliError::Other { .. } => EXIT_FAILURE,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let mut error = serde_json::json!({
            "code": err.kind(),
            "message": err.to_string(),
        });
        if let CliError::ToolExit { code, .. } = err {
            error["exit_code"] = serde_json::json!(code);
        }

        match serde_json::to_string(&ErrorEnvelope::new(error)) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Run Maven with repository-manager credentials fetched from a secrets store.
#[derive(Parser, Debug)]
#[command(name = "mvnsecrets")]
#[command(about = "Run Maven with repository-manager credentials fetched from a secrets store")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    /// Emit JSON logs and JSON envelopes.
    #[arg(long, global = true, help = "Emit JSON logs and JSON envelopes")]
    pub json: bool,

    /// Log output format; defaults to json with `--json`, compact otherwise.
    #[arg(
        long,
        global = true,
        env = "MVNSECRETS_LOG_FORMAT",
        value_name = "FORMAT",
        value_enum
    )]
    pub log_format: Option<TracingFormat>,

    /// Configuration file.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "MVNSECRETS_CONFIG",
        help = "Configuration file (default: ./mvnsecrets.toml if present)"
    )]
    pub config: Option<PathBuf>,

    /// Values layered over the configuration file.
    #[command(flatten)]
    pub source: SourceArgs,
}

impl Cli {
    /// Log format for this invocation
    #[must_use]
    pub fn tracing_format(&self) -> TracingFormat {
        match (self.log_format, self.json) {
            (Some(format), _) => format,
            (None, true) => TracingFormat::Json,
            (None, false) => TracingFormat::Compact,
        }
    }
}

/// Settings that may come from flags or environment variables
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Secret id (name or ARN for aws, variable name for env, command for exec)
    #[arg(long, global = true, env = "MVNSECRETS_SECRET_ID", value_name = "ID")]
    pub secret_id: Option<String>,

    /// Secret provider: aws, env or exec
    #[arg(long, global = true, env = "MVNSECRETS_PROVIDER", value_name = "NAME")]
    pub provider: Option<String>,

    /// Region the secret lives in
    #[arg(long, global = true, env = "MVNSECRETS_REGION")]
    pub region: Option<String>,

    /// Secrets store endpoint override
    #[arg(long, global = true, env = "MVNSECRETS_ENDPOINT_URL", value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Named cloud profile
    #[arg(long, global = true, env = "MVNSECRETS_PROFILE")]
    pub profile: Option<String>,

    /// Repository manager mirror URL
    #[arg(long, global = true, env = "MVNSECRETS_MIRROR_URL", value_name = "URL")]
    pub mirror_url: Option<String>,

    /// Settings template (the built-in one is used otherwise)
    #[arg(long, global = true, env = "MVNSECRETS_TEMPLATE", value_name = "PATH")]
    pub template: Option<PathBuf>,

    /// Build tool to run
    #[arg(long, global = true, env = "MVNSECRETS_TOOL", value_name = "PROGRAM")]
    pub tool: Option<String>,
}

impl SourceArgs {
    /// Overrides to layer over the configuration file
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            provider: self.provider.clone(),
            secret_id: self.secret_id.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            profile: self.profile.clone(),
            mirror_url: self.mirror_url.clone(),
            template: self.template.clone(),
            program: self.tool.clone(),
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch credentials, render settings and run the build tool.
    #[command(about = "Fetch credentials, render settings and run the build tool")]
    Run {
        /// Arguments passed to the build tool after `--`.
        #[arg(last = true, value_name = "ARGS")]
        args: Vec<String>,
    },
    /// Print the rendered settings with secret values redacted.
    #[command(about = "Print the rendered settings with secret values redacted")]
    Render {
        /// Only check that every placeholder resolves.
        #[arg(long)]
        check: bool,
    },
    /// Check that the secret can be fetched and parsed.
    #[command(about = "Check that the secret can be fetched and parsed")]
    Fetch,
    /// List the placeholders the template uses.
    #[command(about = "List the placeholders the template uses")]
    Placeholders,
}

/// Parse command-line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args_after_double_dash() {
        let cli = Cli::try_parse_from([
            "mvnsecrets",
            "run",
            "--secret-id",
            "build/nexus",
            "--",
            "-B",
            "clean",
            "verify",
        ])
        .unwrap();

        assert_eq!(cli.source.secret_id.as_deref(), Some("build/nexus"));
        match cli.command {
            Commands::Run { args } => assert_eq!(args, vec!["-B", "clean", "verify"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mvnsecrets", "render", "--check", "--json", "-L", "debug"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.level, crate::tracing::LogLevel::Debug);
        assert!(matches!(cli.command, Commands::Render { check: true }));
    }

    #[test]
    fn test_tracing_format_selection() {
        temp_env::with_var_unset("MVNSECRETS_LOG_FORMAT", || {
            let plain = Cli::try_parse_from(["mvnsecrets", "fetch"]).unwrap();
            assert_eq!(plain.tracing_format(), TracingFormat::Compact);

            let json = Cli::try_parse_from(["mvnsecrets", "fetch", "--json"]).unwrap();
            assert_eq!(json.tracing_format(), TracingFormat::Json);

            let explicit =
                Cli::try_parse_from(["mvnsecrets", "fetch", "--json", "--log-format", "dev"]).unwrap();
            assert_eq!(explicit.tracing_format(), TracingFormat::Dev);
        });

        temp_env::with_var("MVNSECRETS_LOG_FORMAT", Some("pretty"), || {
            let cli = Cli::try_parse_from(["mvnsecrets", "fetch"]).unwrap();
            assert_eq!(cli.tracing_format(), TracingFormat::Pretty);
        });
    }

    #[test]
    fn test_env_fills_source_args() {
        temp_env::with_vars(
            [
                ("MVNSECRETS_PROVIDER", Some("env")),
                ("MVNSECRETS_MIRROR_URL", Some("https://nexus.example.com/")),
                ("MVNSECRETS_TOOL", None),
            ],
            || {
                let cli = Cli::try_parse_from(["mvnsecrets", "fetch", "--provider", "exec"]).unwrap();
                let overrides = cli.source.overrides();
                assert_eq!(overrides.provider.as_deref(), Some("exec"));
                assert_eq!(overrides.mirror_url.as_deref(), Some("https://nexus.example.com/"));
                assert_eq!(overrides.program, None);
            },
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(EXIT_OK, 0);
        let config = CliError::Config {
            kind: "config",
            message: "x".to_string(),
            help: None,
        };
        assert_eq!(exit_code_for(&config), EXIT_CLI);
        assert_eq!(exit_code_for(&CliError::other("x")), EXIT_FAILURE);
        assert_eq!(
            exit_code_for(&CliError::ToolExit {
                program: "mvn".to_string(),
                code: 17
            }),
            17
        );
    }

    #[test]
    fn test_core_error_mapping() {
        let not_found = CliError::from(SecretError::NotFound {
            name: "nexus".to_string(),
            secret_source: "build/nexus".to_string(),
        });
        assert_eq!(exit_code_for(&not_found), EXIT_SECRET);
        assert_eq!(not_found.kind(), "secret_not_found");

        let unsupported = CliError::from(SecretError::UnsupportedResolver {
            resolver: "vault".to_string(),
        });
        assert_eq!(exit_code_for(&unsupported), EXIT_CLI);
        assert_eq!(unsupported.kind(), "unsupported_provider");

        let missing: CliError = mvnsecrets_core::Error::from(mvnsecrets_core::RenderError::MissingValue {
            names: vec!["MVN_MIRROR_URL".to_string()],
        })
        .into();
        assert_eq!(exit_code_for(&missing), EXIT_CLI);
        assert_eq!(missing.kind(), "missing_template_value");

        let launch: CliError = mvnsecrets_core::Error::from(RunError::Launch {
            program: "mvn".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        })
        .into();
        assert_eq!(exit_code_for(&launch), EXIT_LAUNCH);
        assert!(matches!(launch, CliError::Launch { help: Some(_), .. }));
    }

    #[test]
    fn test_error_envelope_shape() {
        let envelope = ErrorEnvelope::new(serde_json::json!({"code": "config"}));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["code"], "config");
    }
}
