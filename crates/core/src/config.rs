//! Configuration types for mvnsecrets
//!
//! Settings are layered: built-in defaults, then an optional TOML file
//! (`mvnsecrets.toml`), then [`ConfigOverrides`] collected from environment
//! variables and command-line flags.

use crate::{Error, Result};
use mvnsecrets_secrets::CredentialFields;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "mvnsecrets.toml";

/// Main configuration structure for mvnsecrets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the credential pair comes from
    pub secret: SecretConfig,

    /// Placeholder names the credential pair and mirror URL are bound to
    pub placeholders: PlaceholderConfig,

    /// Repository manager mirror
    pub mirror: MirrorConfig,

    /// Build tool invocation
    pub tool: ToolConfig,

    /// Custom settings template (the built-in one is used otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

/// Secrets store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretConfig {
    /// Resolver name: `aws`, `env` or `exec`
    pub provider: String,

    /// Secret id, JSON provider config, env var name or command, per provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Region the secret lives in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Secrets store endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,

    /// Named cloud profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// JSON field names of the credential pair
    pub fields: CredentialFields,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            provider: "aws".to_string(),
            id: None,
            region: None,
            endpoint_url: None,
            profile: None,
            fields: CredentialFields::default(),
        }
    }
}

/// Template placeholder names (the `NAME` in `${env.NAME}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PlaceholderConfig {
    /// Placeholder receiving the username
    pub username: String,
    /// Placeholder receiving the password
    pub password: String,
    /// Placeholder receiving the mirror URL
    pub mirror_url: String,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            username: "MVN_USERNAME".to_string(),
            password: "MVN_PASSWORD".to_string(),
            mirror_url: "MVN_MIRROR_URL".to_string(),
        }
    }
}

/// Repository manager mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Mirror URL, preferably with a DNS host name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Build tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Program to run
    pub program: String,

    /// Directory for the rendered settings file (system temp dir otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: crate::runner::DEFAULT_PROGRAM.to_string(),
            temp_dir: None,
        }
    }
}

/// Values that take precedence over the configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Secret provider
    pub provider: Option<String>,
    /// Secret id
    pub secret_id: Option<String>,
    /// Secrets store region
    pub region: Option<String>,
    /// Secrets store endpoint
    pub endpoint_url: Option<String>,
    /// Cloud profile
    pub profile: Option<String>,
    /// Mirror URL
    pub mirror_url: Option<String>,
    /// Template path
    pub template: Option<PathBuf>,
    /// Build tool program
    pub program: Option<String>,
}

impl Config {
    /// Parse a configuration document
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid TOML or unknown keys.
    pub fn from_toml(source: &str, origin: &Path) -> Result<Self> {
        toml::from_str(source).map_err(|e| {
            Error::configuration_with_help(
                format!("invalid configuration in {}: {e}", origin.display()),
                "See the [secret], [placeholders], [mirror] and [tool] tables in the readme",
            )
        })
    }

    /// Load configuration.
    ///
    /// With an explicit `path` the file must exist. Without one,
    /// `mvnsecrets.toml` in `cwd` is used if present, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if an explicit file is missing or if
    /// the file is unreadable or invalid.
    pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (cwd.join(CONFIG_FILE_NAME), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(source) => {
                tracing::debug!(path = %path.display(), "Loaded configuration file");
                Self::from_toml(&source, &path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(Error::configuration_with_help(
                format!("cannot read configuration {}: {e}", path.display()),
                "Check the --config path",
            )),
        }
    }

    /// Apply overrides; set values replace file values
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(provider) = overrides.provider {
            self.secret.provider = provider;
        }
        if overrides.secret_id.is_some() {
            self.secret.id = overrides.secret_id;
        }
        if overrides.region.is_some() {
            self.secret.region = overrides.region;
        }
        if overrides.endpoint_url.is_some() {
            self.secret.endpoint_url = overrides.endpoint_url;
        }
        if overrides.profile.is_some() {
            self.secret.profile = overrides.profile;
        }
        if overrides.mirror_url.is_some() {
            self.mirror.url = overrides.mirror_url;
        }
        if overrides.template.is_some() {
            self.template = overrides.template;
        }
        if let Some(program) = overrides.program {
            self.tool.program = program;
        }
        self
    }

    /// The configured secret id
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no secret id is set.
    pub fn secret_id(&self) -> Result<&str> {
        self.secret
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration_with_help(
                    "no secret id configured",
                    "Set `secret.id` in mvnsecrets.toml, MVNSECRETS_SECRET_ID, or pass --secret-id",
                )
            })
    }
}

/// Extract the host of a URL like `https://host:port/path`
fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    if let Some(bracketed) = host_port.strip_prefix('[') {
        return bracketed.split_once(']').map(|(host, _)| host);
    }

    let host = host_port.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Whether the URL addresses its server by IP literal rather than DNS name
#[must_use]
pub fn uses_ip_literal(url: &str) -> bool {
    url_host(url).is_some_and(|host| host.parse::<IpAddr>().is_ok())
}
