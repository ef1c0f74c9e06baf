//! `mvnsecrets placeholders`

use crate::cli::CliError;
use mvnsecrets_core::Config;
use std::fmt::Write;

/// List the template's placeholders and what each is bound to
///
/// # Errors
///
/// Returns a configuration error for an unreadable template or unknown provider.
pub async fn execute(config: Config, json: bool) -> Result<String, CliError> {
    let pipeline = super::build_pipeline(config).await?;
    let placeholders = pipeline.placeholders();

    if json {
        let entries: Vec<serde_json::Value> = placeholders
            .iter()
            .map(|(name, source)| serde_json::json!({ "name": name, "source": source.to_string() }))
            .collect();
        return super::ok_envelope(serde_json::json!({ "placeholders": entries }));
    }

    let width = placeholders.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    let mut output = String::new();
    for (name, source) in &placeholders {
        let _ = writeln!(output, "{name:<width$}  {source}");
    }
    Ok(output)
}
