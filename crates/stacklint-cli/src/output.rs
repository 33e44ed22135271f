//! # Report Rendering
//!
//! Text output prints one line per diagnostic:
//!
//! ```text
//! template.yaml: E3012 [error] Resources/Queue/Properties/DelaySeconds: "x" is not of type 'integer' (us-east-1)
//! ```
//!
//! JSON output is an array of `{file, diagnostics}` objects using the
//! diagnostics' own serialization.

use std::path::PathBuf;

use serde::Serialize;

use stacklint_engine::Diagnostic;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// The diagnostics of one template file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

/// Bitwise OR of the severities found across `reports`.
pub fn exit_code(reports: &[FileReport]) -> u8 {
    reports
        .iter()
        .flat_map(|r| &r.diagnostics)
        .fold(0, |code, d| code | d.severity.exit_bit())
}

/// Render reports as text lines.
pub fn render_text(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for report in reports {
        for d in &report.diagnostics {
            out.push_str(&format!(
                "{}: {} [{}] {}: {}",
                report.file.display(),
                d.rule_id,
                d.severity,
                d.display_path(),
                d.message
            ));
            if !d.regions.is_empty() {
                let regions: Vec<&str> = d.regions.iter().map(|r| r.as_str()).collect();
                out.push_str(&format!(" ({})", regions.join(", ")));
            }
            out.push('\n');
        }
    }
    out
}

/// Render reports as pretty-printed JSON.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn render_json(reports: &[FileReport]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(reports)
}

/// Render in `format`.
///
/// # Errors
///
/// Propagates JSON serialization failures.
pub fn render(reports: &[FileReport], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(reports)),
        OutputFormat::Json => render_json(reports),
    }
}
