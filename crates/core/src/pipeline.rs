//! The fetch → render → run → cleanup sequence

use crate::config::{Config, uses_ip_literal};
use crate::rendered::RenderedConfig;
use crate::runner::{ProcessRunner, TerminationSignals};
use crate::template::{Bindings, RenderError, Template};
use crate::{Error, Result};
use mvnsecrets_secrets::{CredentialFetcher, Credentials, SecretResolver, SecretSpec, SecureSecret};
use std::sync::Arc;

/// What a template placeholder is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderSource {
    /// Username field of the secret
    Username,
    /// Password field of the secret
    Password,
    /// Configured mirror URL
    MirrorUrl,
    /// Nothing; rendering will fail
    Unbound,
}

impl std::fmt::Display for PlaceholderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Username => "secret username",
            Self::Password => "secret password",
            Self::MirrorUrl => "mirror url",
            Self::Unbound => "unbound",
        };
        f.write_str(s)
    }
}

/// One invocation's worth of work against a secrets store and build tool
pub struct Pipeline {
    config: Config,
    resolver: Arc<dyn SecretResolver>,
    template: Template,
    runner: ProcessRunner,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.resolver.provider_name())
            .field("secret_id", &self.config.secret.id)
            .field("program", &self.runner.program())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline, loading the configured template (or the built-in one)
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a configured template cannot be read.
    pub fn new(config: Config, resolver: Arc<dyn SecretResolver>) -> Result<Self> {
        let template = match &config.template {
            Some(path) => Template::load(path)?,
            None => Template::builtin(),
        };
        let runner = ProcessRunner::new(config.tool.program.clone());

        Ok(Self {
            config,
            resolver,
            template,
            runner,
        })
    }

    /// Replace the process runner
    #[must_use]
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    /// The template in use
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Each template placeholder with what it will be bound to
    #[must_use]
    pub fn placeholders(&self) -> Vec<(&str, PlaceholderSource)> {
        self.template
            .placeholders()
            .into_iter()
            .map(|name| (name, self.source_of(name)))
            .collect()
    }

    fn source_of(&self, name: &str) -> PlaceholderSource {
        let names = &self.config.placeholders;
        if name == names.username {
            PlaceholderSource::Username
        } else if name == names.password {
            PlaceholderSource::Password
        } else if name == names.mirror_url && self.config.mirror.url.is_some() {
            PlaceholderSource::MirrorUrl
        } else {
            PlaceholderSource::Unbound
        }
    }

    /// Fail before touching the secrets store if some placeholder can never be bound
    fn check_placeholders(&self) -> std::result::Result<(), RenderError> {
        let names: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|(_, source)| *source == PlaceholderSource::Unbound)
            .map(|(name, _)| name.to_string())
            .collect();

        if names.is_empty() {
            Ok(())
        } else {
            Err(RenderError::MissingValue { names })
        }
    }

    /// Fetch the credential pair from the secrets store
    ///
    /// # Errors
    ///
    /// Returns a configuration error without a secret id, otherwise the
    /// secret error (not found, access denied, malformed payload).
    #[tracing::instrument(name = "fetch", skip(self), fields(provider = self.resolver.provider_name()))]
    pub async fn fetch(&self) -> Result<Credentials> {
        let spec = SecretSpec::new(self.config.secret_id()?);
        let fetcher = CredentialFetcher::new(self.config.secret.fields.clone());
        let credentials = fetcher.fetch(self.resolver.as_ref(), &spec).await?;
        tracing::info!(
            username_len = credentials.username().len(),
            password_len = credentials.password().len(),
            "Credentials fetched"
        );
        Ok(credentials)
    }

    /// Placeholder bindings for a credential pair plus the mirror URL
    #[must_use]
    pub fn bindings(&self, credentials: &Credentials) -> Bindings {
        let names = &self.config.placeholders;
        let mut bindings = Bindings::new();
        bindings.insert_secret(&names.username, credentials.username().clone());
        bindings.insert_secret(&names.password, credentials.password().clone());

        if let Some(url) = &self.config.mirror.url {
            if uses_ip_literal(url) {
                tracing::warn!(
                    url = %url,
                    "Mirror URL uses an IP address; prefer a DNS name so the repository manager can move"
                );
            }
            bindings.insert_plain(&names.mirror_url, url.clone());
        }

        bindings
    }

    /// Render the template with secret values shown as `[REDACTED]`.
    ///
    /// The secret is still fetched so that access and payload shape are
    /// verified. Nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns secret or render errors.
    #[tracing::instrument(name = "preview", skip(self))]
    pub async fn preview(&self) -> Result<String> {
        self.check_placeholders()?;
        let credentials = self.fetch().await?;
        let rendered = self.template.render(&self.bindings(&credentials).redacted())?;
        Ok(rendered)
    }

    /// Fetch, render, run the build tool and remove the settings file.
    ///
    /// The settings file is removed before this returns, whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns the first failure: configuration, secret, render, I/O, launch,
    /// or [`Error::NonZeroExit`] carrying the build tool's exit code.
    #[tracing::instrument(
        name = "pipeline",
        skip(self, args),
        fields(provider = self.resolver.provider_name(), program = %self.runner.program())
    )]
    pub async fn run(&self, args: &[String]) -> Result<()> {
        self.check_placeholders()?;

        let credentials = self.fetch().await?;
        let document = SecureSecret::new(self.template.render(&self.bindings(&credentials))?);
        drop(credentials);

        // Listening before the file exists keeps a signal from killing the
        // process while the settings are on disk.
        let mut signals = TerminationSignals::install();
        let rendered = RenderedConfig::write(self.config.tool.temp_dir.as_deref(), document.expose())?;
        drop(document);

        let outcome = self.runner.run(rendered.path(), args, &mut signals).await;
        let cleanup = rendered.close();

        let code = match (outcome, cleanup) {
            (Ok(code), Ok(())) => code,
            (Ok(_), Err(cleanup_err)) => return Err(cleanup_err),
            (Err(run_err), Ok(())) => return Err(run_err.into()),
            (Err(run_err), Err(cleanup_err)) => {
                tracing::warn!(error = %cleanup_err, "Failed to remove rendered settings");
                return Err(run_err.into());
            }
        };

        if code == 0 {
            Ok(())
        } else {
            Err(Error::NonZeroExit {
                program: self.runner.program().to_string(),
                code,
            })
        }
    }
}
