//! Credential pair parsing
//!
//! A repository-manager secret is stored as a JSON object holding (at least)
//! a username and a password field. [`CredentialFetcher`] resolves the raw
//! payload through any [`SecretResolver`] and extracts exactly those two
//! values.

use crate::{SecretError, SecretResolver, SecretSpec, SecureSecret};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Names of the two JSON fields that make up a credential pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CredentialFields {
    /// Field holding the identifier (username)
    #[serde(default = "default_username_field")]
    pub username: String,

    /// Field holding the secret value (password or token)
    #[serde(default = "default_password_field")]
    pub password: String,
}

fn default_username_field() -> String {
    "username".to_string()
}

fn default_password_field() -> String {
    "password".to_string()
}

impl Default for CredentialFields {
    fn default() -> Self {
        Self {
            username: default_username_field(),
            password: default_password_field(),
        }
    }
}

impl CredentialFields {
    /// Create a field mapping with custom names
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// A resolved username/password pair.
///
/// Both values are held as [`SecureSecret`] and zeroed on drop.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: SecureSecret,
    password: SecureSecret,
}

impl Credentials {
    /// Create a credential pair from already-resolved values
    #[must_use]
    pub fn new(username: SecureSecret, password: SecureSecret) -> Self {
        Self { username, password }
    }

    /// The identifier half of the pair
    #[must_use]
    pub fn username(&self) -> &SecureSecret {
        &self.username
    }

    /// The secret half of the pair
    #[must_use]
    pub fn password(&self) -> &SecureSecret {
        &self.password
    }
}

/// Fetches a secret and parses it into [`Credentials`].
#[derive(Debug, Clone, Default)]
pub struct CredentialFetcher {
    fields: CredentialFields,
}

impl CredentialFetcher {
    /// Create a fetcher that reads the given field names
    #[must_use]
    pub fn new(fields: CredentialFields) -> Self {
        Self { fields }
    }

    /// Resolve the secret and parse the credential pair out of it.
    ///
    /// # Errors
    ///
    /// Propagates the resolver's error ([`SecretError::NotFound`],
    /// [`SecretError::AccessDenied`], ...) and returns
    /// [`SecretError::MalformedPayload`] if the payload lacks either field.
    #[tracing::instrument(
        name = "fetch_credentials",
        skip(self, resolver),
        fields(provider = resolver.provider_name(), source = %spec.source)
    )]
    pub async fn fetch(
        &self,
        resolver: &dyn SecretResolver,
        spec: &SecretSpec,
    ) -> Result<Credentials, SecretError> {
        let payload = resolver.resolve_secure(&spec.source, spec).await?;
        tracing::debug!(payload_len = payload.len(), "Secret payload resolved");
        self.parse(&spec.source, &payload)
    }

    /// Parse a raw JSON payload into a credential pair.
    ///
    /// Extra fields in the payload are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::MalformedPayload`] if the payload is not a JSON
    /// object or if either configured field is absent or not a string.
    pub fn parse(&self, name: &str, payload: &SecureSecret) -> Result<Credentials, SecretError> {
        // Only position and category: serde_json messages can quote the input
        let object: Map<String, Value> =
            serde_json::from_str(payload.expose()).map_err(|e| SecretError::MalformedPayload {
                name: name.to_string(),
                message: format!(
                    "payload is not a JSON object ({:?} error at line {}, column {})",
                    e.classify(),
                    e.line(),
                    e.column()
                ),
            })?;

        let username = Self::string_field(name, &object, &self.fields.username)?;
        let password = Self::string_field(name, &object, &self.fields.password)?;

        Ok(Credentials::new(username, password))
    }

    fn string_field(
        name: &str,
        object: &Map<String, Value>,
        field: &str,
    ) -> Result<SecureSecret, SecretError> {
        match object.get(field) {
            Some(Value::String(value)) => Ok(SecureSecret::new(value.clone())),
            Some(_) => Err(SecretError::MalformedPayload {
                name: name.to_string(),
                message: format!("field '{field}' is not a string"),
            }),
            None => Err(SecretError::MalformedPayload {
                name: name.to_string(),
                message: format!("missing field '{field}'"),
            }),
        }
    }
}
