//! `mvnsecrets fetch`

use crate::cli::CliError;
use mvnsecrets_core::Config;
use std::fmt::Write;

/// Fetch and parse the secret, reporting field names and value lengths only
///
/// # Errors
///
/// Returns configuration or secret errors.
#[tracing::instrument(name = "fetch_command", skip_all)]
pub async fn execute(config: Config, json: bool) -> Result<String, CliError> {
    let provider = config.secret.provider.clone();
    let secret_id = config.secret_id()?.to_string();
    let fields = config.secret.fields.clone();

    let pipeline = super::build_pipeline(config).await?;
    let credentials = pipeline.fetch().await?;

    if json {
        let mut lengths = serde_json::Map::new();
        lengths.insert(
            fields.username.clone(),
            serde_json::json!({ "length": credentials.username().len() }),
        );
        lengths.insert(
            fields.password.clone(),
            serde_json::json!({ "length": credentials.password().len() }),
        );
        return super::ok_envelope(serde_json::json!({
            "provider": provider,
            "secret_id": secret_id,
            "fields": lengths,
        }));
    }

    let mut output = String::new();
    let _ = writeln!(output, "Fetched '{secret_id}' via {provider}");
    let _ = writeln!(
        output,
        "  {}: {} characters",
        fields.username,
        credentials.username().len()
    );
    let _ = writeln!(
        output,
        "  {}: {} characters",
        fields.password,
        credentials.password().len()
    );
    Ok(output)
}
