//! Secure secret types with automatic memory zeroing

use secrecy::{ExposeSecret, SecretString};

/// A resolved secret value with automatic memory zeroing on drop.
///
/// This type wraps `secrecy::SecretString` to ensure:
/// - Secret values are zeroed from memory when dropped
/// - Debug output shows `[REDACTED]` instead of the actual value
/// - Explicit `.expose()` call required to access the value
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Create a new secure secret from a string.
    ///
    /// The string value is moved into secure storage and will be
    /// automatically zeroed when this `SecureSecret` is dropped.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Expose the secret value for use.
    ///
    /// The caller must ensure the exposed value is not logged and is only
    /// written to the scoped settings file.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Get the length of the secret value without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Check if the secret value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl From<&str> for SecureSecret {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_secret_debug_is_redacted() {
        let secret = SecureSecret::new("my-super-secret-password".to_string());
        let debug_output = format!("{secret:?}");
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("password"));
    }

    #[test]
    fn secure_secret_display_is_redacted() {
        let secret = SecureSecret::from("my-super-secret-password");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn secure_secret_expose_returns_value() {
        let secret = SecureSecret::new("test-value".to_string());
        assert_eq!(secret.expose(), "test-value");
    }

    #[test]
    fn secure_secret_len_works() {
        let secret = SecureSecret::new("12345".to_string());
        assert_eq!(secret.len(), 5);
        assert!(!secret.is_empty());
        assert!(SecureSecret::from("").is_empty());
    }
}
