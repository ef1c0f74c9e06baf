//! AWS Secrets Manager secret resolver with auto-negotiating dual-mode (HTTP + CLI)

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use mvnsecrets_secrets::{SecretError, SecretResolver, SecretSpec};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Configuration for AWS Secrets Manager resolution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsSecretConfig {
    /// Secret ID - can be ARN or secret name
    pub secret_id: String,

    /// Version ID (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    /// Version stage (optional, defaults to AWSCURRENT)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_stage: Option<String>,

    /// Key of a nested object holding the credential pair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_key: Option<String>,
}

impl AwsSecretConfig {
    /// Create a new AWS secret config with just the secret ID
    #[must_use]
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            version_id: None,
            version_stage: None,
            json_key: None,
        }
    }

    /// Parse a [`SecretSpec`] source: JSON config or a plain secret id
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        serde_json::from_str::<Self>(source).unwrap_or_else(|_| Self::new(source))
    }
}

/// Where and how to reach Secrets Manager
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsResolverOptions {
    /// Region override (otherwise taken from the AWS environment/profile)
    pub region: Option<String>,
    /// Endpoint override, e.g. a VPC endpoint or a local emulator
    pub endpoint_url: Option<String>,
    /// Named profile for the `aws` CLI and the SDK config loader
    pub profile: Option<String>,
}

/// Resolves secrets from AWS Secrets Manager
///
/// Mode is auto-negotiated based on environment:
/// - If `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` are set, or a profile
///   is configured → HTTP mode
/// - Otherwise → CLI mode (uses `aws` CLI)
///
/// The `source` field in [`SecretSpec`] can be:
/// - A simple secret ID (name or ARN)
/// - A JSON-encoded [`AwsSecretConfig`] for advanced options
pub struct AwsResolver {
    http_client: Option<Client>,
    options: AwsResolverOptions,
}

impl std::fmt::Debug for AwsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsResolver")
            .field("mode", &if self.can_use_http() { "http" } else { "cli" })
            .field("options", &self.options)
            .finish()
    }
}

impl AwsResolver {
    /// Create a new AWS resolver with auto-detected mode
    ///
    /// If AWS credentials are available in environment or a profile is
    /// configured, initializes HTTP client. Otherwise, CLI mode will be used.
    ///
    /// # Errors
    /// Returns error if AWS configuration cannot be loaded.
    pub async fn new(options: AwsResolverOptions) -> Result<Self, SecretError> {
        let http_client = if Self::http_credentials_available() || options.profile.is_some() {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &options.region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            if let Some(endpoint_url) = &options.endpoint_url {
                loader = loader.endpoint_url(endpoint_url);
            }
            if let Some(profile) = &options.profile {
                loader = loader.profile_name(profile);
            }
            let config = loader.load().await;
            Some(Client::new(&config))
        } else {
            None
        };

        tracing::debug!(
            mode = if http_client.is_some() { "http" } else { "cli" },
            region = ?options.region,
            endpoint_url = ?options.endpoint_url,
            "AWS Secrets Manager resolver initialized"
        );

        Ok(Self {
            http_client,
            options,
        })
    }

    /// Check if HTTP credentials are available in environment
    fn http_credentials_available() -> bool {
        std::env::var("AWS_ACCESS_KEY_ID").is_ok() && std::env::var("AWS_SECRET_ACCESS_KEY").is_ok()
    }

    /// Check if this resolver can use HTTP mode
    const fn can_use_http(&self) -> bool {
        self.http_client.is_some()
    }

    /// Resolve using the AWS SDK (HTTP mode)
    async fn resolve_http(
        &self,
        name: &str,
        config: &AwsSecretConfig,
    ) -> Result<String, SecretError> {
        let client = self
            .http_client
            .as_ref()
            .ok_or_else(|| SecretError::ResolutionFailed {
                name: name.to_string(),
                message: "HTTP client not available".to_string(),
            })?;

        let mut request = client.get_secret_value().secret_id(&config.secret_id);

        if let Some(version_id) = &config.version_id {
            request = request.version_id(version_id);
        }

        if let Some(version_stage) = &config.version_stage {
            request = request.version_stage(version_stage);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::classify_sdk_error(name, &config.secret_id, e))?;

        let secret_string =
            response
                .secret_string()
                .ok_or_else(|| SecretError::MalformedPayload {
                    name: name.to_string(),
                    message: "secret has no string value (may be binary)".to_string(),
                })?;

        Self::extract_json_key(name, secret_string, config.json_key.as_ref())
    }

    /// Map an SDK failure onto the typed secret errors
    fn classify_sdk_error(
        name: &str,
        secret_id: &str,
        err: SdkError<GetSecretValueError>,
    ) -> SecretError {
        let message = DisplayErrorContext(&err).to_string();
        let service_error = err.into_service_error();

        if service_error.is_resource_not_found_exception() {
            return SecretError::NotFound {
                name: name.to_string(),
                secret_source: secret_id.to_string(),
            };
        }

        match service_error.code() {
            Some(code) => {
                SecretError::from_provider_message(name, secret_id, &format!("{code}: {message}"))
            }
            None => SecretError::ResolutionFailed {
                name: name.to_string(),
                message: format!("AWS Secrets Manager error: {message}"),
            },
        }
    }

    /// Build the `aws` CLI argument list
    fn cli_args(&self, config: &AwsSecretConfig) -> Vec<String> {
        let mut args = vec![
            "secretsmanager".to_string(),
            "get-secret-value".to_string(),
            "--secret-id".to_string(),
            config.secret_id.clone(),
            "--query".to_string(),
            "SecretString".to_string(),
            "--output".to_string(),
            "text".to_string(),
        ];

        if let Some(version_id) = &config.version_id {
            args.push("--version-id".to_string());
            args.push(version_id.clone());
        }

        if let Some(version_stage) = &config.version_stage {
            args.push("--version-stage".to_string());
            args.push(version_stage.clone());
        }

        if let Some(region) = &self.options.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }

        if let Some(endpoint_url) = &self.options.endpoint_url {
            args.push("--endpoint-url".to_string());
            args.push(endpoint_url.clone());
        }

        if let Some(profile) = &self.options.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }

        args
    }

    /// Resolve using the AWS CLI
    async fn resolve_cli(
        &self,
        name: &str,
        config: &AwsSecretConfig,
    ) -> Result<String, SecretError> {
        let output = Command::new("aws")
            .args(self.cli_args(config))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SecretError::ResolutionFailed {
                name: name.to_string(),
                message: format!("Failed to execute aws CLI: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::from_provider_message(
                name,
                &config.secret_id,
                &stderr,
            ));
        }

        let secret_string = SecretError::payload_from_utf8(name, output.stdout)?;
        Self::extract_json_key(name, &secret_string, config.json_key.as_ref())
    }

    /// Extract a nested value from a JSON secret
    fn extract_json_key(
        name: &str,
        secret_string: &str,
        json_key: Option<&String>,
    ) -> Result<String, SecretError> {
        if let Some(key) = json_key {
            let parsed: serde_json::Value =
                serde_json::from_str(secret_string).map_err(|e| SecretError::MalformedPayload {
                    name: name.to_string(),
                    message: format!(
                        "secret is not valid JSON ({:?} error at line {}, column {})",
                        e.classify(),
                        e.line(),
                        e.column()
                    ),
                })?;

            let value = parsed
                .get(key)
                .ok_or_else(|| SecretError::MalformedPayload {
                    name: name.to_string(),
                    message: format!("JSON key '{key}' not found in secret"),
                })?;

            return match value {
                serde_json::Value::String(s) => Ok(s.clone()),
                other => Ok(other.to_string()),
            };
        }

        Ok(secret_string.to_string())
    }
}

#[async_trait]
impl SecretResolver for AwsResolver {
    fn provider_name(&self) -> &'static str {
        "aws"
    }

    async fn resolve(&self, name: &str, spec: &SecretSpec) -> Result<String, SecretError> {
        let config = AwsSecretConfig::from_source(&spec.source);

        if self.http_client.is_some() {
            return self.resolve_http(name, &config).await;
        }

        self.resolve_cli(name, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_resolver(options: AwsResolverOptions) -> AwsResolver {
        AwsResolver {
            http_client: None,
            options,
        }
    }

    #[test]
    fn test_aws_config_serialization() {
        let config = AwsSecretConfig {
            secret_id: "build/nexus".to_string(),
            version_id: Some("v1".to_string()),
            version_stage: None,
            json_key: Some("nexus".to_string()),
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("secretId"));
        let parsed: AwsSecretConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_from_source_plain_id() {
        let config =
            AwsSecretConfig::from_source("arn:aws:secretsmanager:us-east-1:123456:secret:nexus");
        assert_eq!(
            config.secret_id,
            "arn:aws:secretsmanager:us-east-1:123456:secret:nexus"
        );
        assert!(config.version_id.is_none());
        assert!(config.json_key.is_none());
    }

    #[test]
    fn test_from_source_json() {
        let config =
            AwsSecretConfig::from_source(r#"{"secretId":"build/nexus","versionStage":"AWSPREVIOUS"}"#);
        assert_eq!(config.secret_id, "build/nexus");
        assert_eq!(config.version_stage.as_deref(), Some("AWSPREVIOUS"));
    }

    #[test]
    fn test_cli_args_include_region_and_endpoint() {
        let resolver = cli_resolver(AwsResolverOptions {
            region: Some("eu-west-1".to_string()),
            endpoint_url: Some("https://secretsmanager.internal.example".to_string()),
            profile: None,
        });
        let args = resolver.cli_args(&AwsSecretConfig::new("build/nexus"));

        let joined = args.join(" ");
        assert!(joined.starts_with("secretsmanager get-secret-value --secret-id build/nexus"));
        assert!(joined.contains("--region eu-west-1"));
        assert!(joined.contains("--endpoint-url https://secretsmanager.internal.example"));
        assert!(!joined.contains("--profile"));
    }

    #[test]
    fn test_cli_args_minimal() {
        let resolver = cli_resolver(AwsResolverOptions::default());
        let args = resolver.cli_args(&AwsSecretConfig::new("build/nexus"));
        assert_eq!(args.len(), 8);
    }

    #[test]
    fn test_extract_json_key_nested_object() {
        let value = AwsResolver::extract_json_key(
            "nexus",
            r#"{"nexus":{"username":"u","password":"p"},"other":1}"#,
            Some(&"nexus".to_string()),
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&value).unwrap();
        assert_eq!(parsed["username"], "u");
        assert_eq!(parsed["password"], "p");
    }

    #[test]
    fn test_extract_json_key_missing() {
        let err = AwsResolver::extract_json_key("nexus", r#"{"a":1}"#, Some(&"b".to_string()))
            .unwrap_err();
        assert!(matches!(err, SecretError::MalformedPayload { .. }));
    }

    #[test]
    fn test_extract_without_key_is_identity() {
        let value = AwsResolver::extract_json_key("nexus", "raw", None).unwrap();
        assert_eq!(value, "raw");
    }

    #[tokio::test]
    async fn test_cli_mode_without_env_credentials() {
        temp_env::async_with_vars(
            [
                ("AWS_ACCESS_KEY_ID", None::<&str>),
                ("AWS_SECRET_ACCESS_KEY", None),
            ],
            async {
                let resolver = AwsResolver::new(AwsResolverOptions::default()).await.unwrap();
                assert!(!resolver.can_use_http());
                assert!(format!("{resolver:?}").contains("cli"));
            },
        )
        .await;
    }
}
