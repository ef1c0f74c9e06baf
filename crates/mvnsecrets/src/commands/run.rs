//! `mvnsecrets run`

use crate::cli::CliError;
use mvnsecrets_core::Config;

/// Run the full pipeline; the build tool's own output goes straight to the terminal
///
/// # Errors
///
/// Returns the pipeline error. A non-zero build tool exit surfaces as
/// [`CliError::ToolExit`] carrying the tool's code.
#[tracing::instrument(name = "run_command", skip_all)]
pub async fn execute(config: Config, args: &[String]) -> Result<String, CliError> {
    let pipeline = super::build_pipeline(config).await?;
    pipeline.run(args).await?;
    Ok(String::new())
}
