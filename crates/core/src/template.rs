//! Settings template parsing and placeholder substitution
//!
//! Placeholders use the build tool's own environment syntax, `${env.NAME}`.
//! Only that form is substituted; every other `${...}` expression (for
//! example `${user.home}`) is left for the build tool to interpolate.

use crate::{Error, Result};
use miette::Diagnostic;
use mvnsecrets_secrets::SecureSecret;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Settings template shipped with the tool
pub const BUILTIN_TEMPLATE: &str = include_str!("../templates/settings.xml");

#[allow(clippy::expect_used)]
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{env\.([A-Za-z_][A-Za-z0-9_.\-]*)\}").expect("placeholder pattern is valid")
});

/// Errors raised while rendering a template
#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    /// One or more placeholders had no value
    #[error("Template has unresolved placeholders: {}", format_names(.names))]
    #[diagnostic(
        code(mvnsecrets::render::missing_value),
        help("Provide a value for each placeholder (secret fields, mirror URL) or remove it from the template")
    )]
    MissingValue {
        /// Names of the unresolved placeholders, in order of first appearance
        names: Vec<String>,
    },
}

fn format_names(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("${{env.{name}}}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A value bound to a placeholder
#[derive(Debug, Clone)]
enum Binding {
    Secret(SecureSecret),
    Plain(String),
}

impl Binding {
    fn expose(&self) -> &str {
        match self {
            Self::Secret(secret) => secret.expose(),
            Self::Plain(value) => value,
        }
    }
}

/// Placeholder name to value mapping used for rendering
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<String, Binding>,
}

impl Bindings {
    /// Create an empty set of bindings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a secret value. It is shown as `[REDACTED]` in previews.
    pub fn insert_secret(&mut self, name: impl Into<String>, value: SecureSecret) {
        self.values.insert(name.into(), Binding::Secret(value));
    }

    /// Bind a non-secret value
    pub fn insert_plain(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), Binding::Plain(value.into()));
    }

    /// Check whether a placeholder has a value
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Copy of these bindings with every secret replaced by `[REDACTED]`
    #[must_use]
    pub fn redacted(&self) -> Self {
        let values = self
            .values
            .iter()
            .map(|(name, binding)| {
                let redacted = match binding {
                    Binding::Secret(_) => Binding::Plain("[REDACTED]".to_string()),
                    Binding::Plain(value) => Binding::Plain(value.clone()),
                };
                (name.clone(), redacted)
            })
            .collect();
        Self { values }
    }

    fn get(&self, name: &str) -> Option<&Binding> {
        self.values.get(name)
    }
}

/// A settings template with `${env.NAME}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
}

impl Template {
    /// Wrap template text
    #[must_use]
    pub fn parse(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The template shipped with the tool
    #[must_use]
    pub fn builtin() -> Self {
        Self::parse(BUILTIN_TEMPLATE)
    }

    /// Read a template from disk
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_help(
                format!("cannot read template {}: {e}", path.display()),
                "Check `template` in mvnsecrets.toml or MVNSECRETS_TEMPLATE",
            )
        })?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "Loaded settings template");
        Ok(Self::parse(source))
    }

    /// The raw template text
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Distinct placeholder names in order of first appearance
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in PLACEHOLDER
            .captures_iter(&self.source)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
        {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Substitute every placeholder.
    ///
    /// Values are XML-escaped. Rendering is all-or-nothing: if any placeholder
    /// is unbound, nothing is produced.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MissingValue`] listing every unbound placeholder.
    pub fn render(&self, bindings: &Bindings) -> std::result::Result<String, RenderError> {
        let missing: Vec<String> = self
            .placeholders()
            .into_iter()
            .filter(|name| !bindings.contains(name))
            .map(str::to_string)
            .collect();

        if !missing.is_empty() {
            return Err(RenderError::MissingValue { names: missing });
        }

        let rendered = PLACEHOLDER.replace_all(&self.source, |caps: &Captures<'_>| {
            caps.get(1)
                .and_then(|name| bindings.get(name.as_str()))
                .map(|binding| escape_xml(binding.expose()))
                .unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }
}

/// Escape the five XML special characters
fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
