//! Secret provider registry

use crate::{SecretError, SecretResolver};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry for secret resolvers
///
/// Maps provider names (`aws`, `env`, `exec`) to resolvers so the configured
/// provider can be selected at runtime.
///
/// # Example
///
/// ```ignore
/// use mvnsecrets_secrets::{SecretRegistry, EnvSecretResolver, SecretSpec};
///
/// let mut registry = SecretRegistry::new();
/// registry.register(Arc::new(EnvSecretResolver::new()));
///
/// let payload = registry
///     .require("env")?
///     .resolve("nexus", &SecretSpec::new("NEXUS_SECRET_JSON"))
///     .await?;
/// ```
#[derive(Default)]
pub struct SecretRegistry {
    resolvers: HashMap<&'static str, Arc<dyn SecretResolver>>,
}

impl SecretRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Register a resolver
    ///
    /// The resolver's `provider_name()` is used as the key. If a resolver
    /// with the same name already exists, it is replaced.
    pub fn register(&mut self, resolver: Arc<dyn SecretResolver>) {
        self.resolvers.insert(resolver.provider_name(), resolver);
    }

    /// Get a resolver by provider name, failing for unknown providers
    ///
    /// # Errors
    ///
    /// Returns `SecretError::UnsupportedResolver` if nothing is registered
    /// under `provider`.
    pub fn require(&self, provider: &str) -> Result<Arc<dyn SecretResolver>, SecretError> {
        self.resolvers
            .get(provider)
            .cloned()
            .ok_or_else(|| SecretError::UnsupportedResolver {
                resolver: provider.to_string(),
            })
    }

    /// Get all registered provider names
    #[must_use]
    pub fn providers(&self) -> Vec<&'static str> {
        self.resolvers.keys().copied().collect()
    }
}

impl std::fmt::Debug for SecretRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}
