//! `mvnsecrets render`

use crate::cli::CliError;
use mvnsecrets_core::Config;

/// Render the settings with secret values redacted, or only check that they render
///
/// # Errors
///
/// Returns configuration, secret or template errors.
#[tracing::instrument(name = "render_command", skip_all, fields(check = check))]
pub async fn execute(config: Config, check: bool, json: bool) -> Result<String, CliError> {
    let pipeline = super::build_pipeline(config).await?;
    let preview = pipeline.preview().await?;
    let placeholders = pipeline.template().placeholders();

    match (check, json) {
        (true, true) => super::ok_envelope(serde_json::json!({
            "resolved": true,
            "placeholders": placeholders,
        })),
        (true, false) => Ok(format!(
            "All {} placeholders resolve\n",
            placeholders.len()
        )),
        (false, true) => super::ok_envelope(serde_json::json!({ "settings": preview })),
        (false, false) => Ok(preview),
    }
}
