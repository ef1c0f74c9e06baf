//! Secret resolution for mvnsecrets
//!
//! Provides a unified interface for reading a named secret from a secrets
//! store (AWS Secrets Manager, environment variables, command execution) and
//! parsing the username/password pair a repository manager expects.
//!
//! ```ignore
//! use mvnsecrets_secrets::{CredentialFetcher, SecretSpec};
//!
//! let fetcher = CredentialFetcher::default();
//! let credentials = fetcher
//!     .fetch(resolver.as_ref(), &SecretSpec::new("build/nexus"))
//!     .await?;
//!
//! // Values are zeroed when `credentials` goes out of scope
//! render(credentials.username().expose(), credentials.password().expose());
//! ```

mod credentials;
mod registry;
pub mod resolvers;
mod types;

pub use credentials::{CredentialFetcher, CredentialFields, Credentials};
pub use registry::SecretRegistry;
pub use types::SecureSecret;

// Re-export built-in resolvers (no external dependencies)
pub use resolvers::{EnvSecretResolver, ExecSecretResolver};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for secret resolution
#[derive(Debug, Error)]
pub enum SecretError {
    /// Secret not found
    #[error("Secret '{name}' not found from source '{secret_source}'")]
    NotFound {
        /// Secret name
        name: String,
        /// Source that was searched (e.g., secret id or env var name)
        secret_source: String,
    },

    /// Caller is not permitted to read the secret
    #[error("Access to secret '{name}' denied: {message}")]
    AccessDenied {
        /// Secret name
        name: String,
        /// Error message from the provider
        message: String,
    },

    /// Secret payload is not the expected JSON object
    #[error("Secret '{name}' has a malformed payload: {message}")]
    MalformedPayload {
        /// Secret name
        name: String,
        /// What was wrong with the payload
        message: String,
    },

    /// Resolver execution failed
    #[error("Failed to resolve secret '{name}': {message}")]
    ResolutionFailed {
        /// Secret name
        name: String,
        /// Error message from the resolver
        message: String,
    },

    /// Unsupported resolver type
    #[error("Unsupported secret resolver: {resolver}")]
    UnsupportedResolver {
        /// The resolver type that was requested
        resolver: String,
    },
}

/// Provider error markers that mean the secret does not exist.
const NOT_FOUND_MARKERS: &[&str] = &[
    "ResourceNotFoundException",
    "SecretNotFound",
    "can't find the specified secret",
    "not found",
];

/// Provider error markers that mean the caller lacks permission.
const ACCESS_DENIED_MARKERS: &[&str] = &[
    "AccessDeniedException",
    "AccessDenied",
    "UnrecognizedClientException",
    "ExpiredToken",
    "InvalidSignatureException",
    "not authorized",
    "permission denied",
];

impl SecretError {
    /// Classify a provider failure message into a typed error.
    ///
    /// Stores that only report failures as text (CLIs, helper scripts) are
    /// mapped onto [`SecretError::NotFound`] and [`SecretError::AccessDenied`]
    /// by well-known markers. Anything else stays a
    /// [`SecretError::ResolutionFailed`].
    #[must_use]
    pub fn from_provider_message(name: &str, source: &str, message: &str) -> Self {
        let lowered = message.to_lowercase();
        let matches = |markers: &[&str]| {
            markers
                .iter()
                .any(|marker| lowered.contains(&marker.to_lowercase()))
        };

        // Authorization markers win over not-found markers
        if matches(ACCESS_DENIED_MARKERS) {
            Self::AccessDenied {
                name: name.to_string(),
                message: message.trim().to_string(),
            }
        } else if matches(NOT_FOUND_MARKERS) {
            Self::NotFound {
                name: name.to_string(),
                secret_source: source.to_string(),
            }
        } else {
            Self::ResolutionFailed {
                name: name.to_string(),
                message: message.trim().to_string(),
            }
        }
    }

    /// Decode a payload read from a provider's stdout, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::MalformedPayload`] if the bytes are not UTF-8.
    pub fn payload_from_utf8(name: &str, bytes: Vec<u8>) -> Result<String, Self> {
        let text = String::from_utf8(bytes).map_err(|e| Self::MalformedPayload {
            name: name.to_string(),
            message: format!("payload is not valid UTF-8 (byte {})", e.utf8_error().valid_up_to()),
        })?;
        Ok(text.trim().to_string())
    }
}

/// Configuration for a secret to resolve
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretSpec {
    /// Source reference (secret id, JSON provider config, env var name, command)
    pub source: String,
}

impl SecretSpec {
    /// Create a new secret spec
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Trait for resolving secrets from various providers.
///
/// Implementors must provide:
/// - [`resolve`](SecretResolver::resolve) - Raw payload resolution
/// - [`provider_name`](SecretResolver::provider_name) - Provider identifier for registry lookup
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Resolve the raw payload of a secret by name and spec.
    async fn resolve(&self, name: &str, spec: &SecretSpec) -> Result<String, SecretError>;

    /// Get the provider name for this resolver.
    ///
    /// Examples: `"env"`, `"exec"`, `"aws"`
    fn provider_name(&self) -> &'static str;

    /// Resolve a secret returning a secure value.
    ///
    /// The returned [`SecureSecret`] will automatically zero its memory on drop.
    async fn resolve_secure(
        &self,
        name: &str,
        spec: &SecretSpec,
    ) -> Result<SecureSecret, SecretError> {
        let value = self.resolve(name, spec).await?;
        Ok(SecureSecret::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_error_not_found() {
        let err = SecretError::NotFound {
            name: "nexus".to_string(),
            secret_source: "build/nexus".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("nexus"));
        assert!(msg.contains("build/nexus"));
    }

    #[test]
    fn test_secret_error_access_denied() {
        let err = SecretError::AccessDenied {
            name: "nexus".to_string(),
            message: "no GetSecretValue".to_string(),
        };
        assert!(err.to_string().contains("denied"));
        assert!(err.to_string().contains("no GetSecretValue"));
    }

    #[test]
    fn test_secret_error_malformed_payload() {
        let err = SecretError::MalformedPayload {
            name: "nexus".to_string(),
            message: "missing field 'password'".to_string(),
        };
        assert!(err.to_string().contains("malformed"));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_payload_from_utf8() {
        let payload = SecretError::payload_from_utf8("nexus", b" {\"username\":\"u\"}\n".to_vec());
        assert_eq!(payload.unwrap(), r#"{"username":"u"}"#);

        let err = SecretError::payload_from_utf8("nexus", b"{\"password\":\"p\xff\"}".to_vec()).unwrap_err();
        assert!(matches!(err, SecretError::MalformedPayload { .. }));
        assert!(!err.to_string().contains("\"p"));
    }

    #[test]
    fn test_classify_not_found() {
        let err = SecretError::from_provider_message(
            "nexus",
            "build/nexus",
            "An error occurred (ResourceNotFoundException) when calling the GetSecretValue operation",
        );
        assert!(matches!(err, SecretError::NotFound { ref secret_source, .. } if secret_source == "build/nexus"));
    }

    #[test]
    fn test_classify_access_denied() {
        let err = SecretError::from_provider_message(
            "nexus",
            "build/nexus",
            "An error occurred (AccessDeniedException) when calling the GetSecretValue operation: \
             User is not authorized to perform secretsmanager:GetSecretValue",
        );
        assert!(matches!(err, SecretError::AccessDenied { .. }));
    }

    #[test]
    fn test_classify_expired_token() {
        let err = SecretError::from_provider_message(
            "nexus",
            "build/nexus",
            "An error occurred (ExpiredTokenException): The security token included in the request is expired",
        );
        assert!(matches!(err, SecretError::AccessDenied { .. }));
    }

    #[test]
    fn test_classify_other_failure() {
        let err = SecretError::from_provider_message("nexus", "build/nexus", "connection reset\n");
        match err {
            SecretError::ResolutionFailed { message, .. } => assert_eq!(message, "connection reset"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_secret_spec_new() {
        let spec = SecretSpec::new("build/nexus");
        assert_eq!(spec.source, "build/nexus");
    }

    #[test]
    fn test_secret_spec_deserialization() {
        let spec: SecretSpec = serde_json::from_str(r#"{"source": "build/nexus"}"#).unwrap();
        assert_eq!(spec, SecretSpec::new("build/nexus"));
    }
}
