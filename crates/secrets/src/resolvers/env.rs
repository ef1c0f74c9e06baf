//! Environment variable secret resolver

use crate::{SecretError, SecretResolver, SecretSpec};
use async_trait::async_trait;

/// Resolves secrets from environment variables
///
/// The `source` field in [`SecretSpec`] is interpreted as the environment
/// variable name. Its value is the raw secret payload, typically injected by
/// a CI system that already has access to the secrets store.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretResolver;

impl EnvSecretResolver {
    /// Create a new environment variable resolver
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretResolver for EnvSecretResolver {
    fn provider_name(&self) -> &'static str {
        "env"
    }

    async fn resolve(&self, name: &str, spec: &SecretSpec) -> Result<String, SecretError> {
        match std::env::var(&spec.source) {
            Ok(value) => Ok(value),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound {
                name: name.to_string(),
                secret_source: spec.source.clone(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::MalformedPayload {
                name: name.to_string(),
                message: format!("environment variable '{}' is not valid UTF-8", spec.source),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_from_env() {
        temp_env::async_with_vars([("MVNSECRETS_TEST_ENV_1", Some("value1"))], async {
            let resolver = EnvSecretResolver::new();
            let spec = SecretSpec::new("MVNSECRETS_TEST_ENV_1");
            let result = resolver.resolve("nexus", &spec).await;

            assert_eq!(result.unwrap(), "value1");
        })
        .await;
    }

    #[tokio::test]
    async fn test_missing_env_var() {
        let resolver = EnvSecretResolver::new();
        let spec = SecretSpec::new("NONEXISTENT_ENV_VAR_12345");
        let result = resolver.resolve("missing", &spec).await;

        assert!(matches!(result, Err(SecretError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resolve_secure_redacts() {
        temp_env::async_with_vars([("MVNSECRETS_TEST_ENV_2", Some("hunter2"))], async {
            let resolver = EnvSecretResolver::new();
            let spec = SecretSpec::new("MVNSECRETS_TEST_ENV_2");
            let secret = resolver.resolve_secure("nexus", &spec).await.unwrap();

            assert_eq!(secret.expose(), "hunter2");
            assert_eq!(format!("{secret:?}"), "[REDACTED]");
        })
        .await;
    }
}
