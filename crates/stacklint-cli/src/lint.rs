//! # Lint Command
//!
//! Loads configuration, builds the standard registry and a schema store,
//! and lints each template file. Command-line flags override values from
//! the configuration file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use stacklint_core::{load_document, Region};
use stacklint_engine::{LintConfig, Linter};
use stacklint_rules::standard_registry;
use stacklint_schema::{InMemorySchemaStore, SchemaStore};

use crate::output::{exit_code, render, FileReport, OutputFormat};

/// Arguments for a lint run.
#[derive(Args, Debug, Clone, Default)]
pub struct LintArgs {
    /// Template files (JSON or YAML).
    #[arg(required = true)]
    pub templates: Vec<PathBuf>,

    /// Regions to validate in. Defaults to the configuration file, then `us-east-1`.
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Directory of resource schemas (`all/` plus per-region directories).
    /// The bundled schemas are used when absent.
    #[arg(long)]
    pub schemas: Option<PathBuf>,

    /// Configuration file (JSON or YAML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Rule id prefixes to ignore, added to those in the configuration file.
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub ignore_checks: Vec<String>,

    /// Require exact scalar types.
    #[arg(long)]
    pub strict_types: bool,
}

/// The effective configuration: file values overridden by flags.
pub fn effective_config(args: &LintArgs) -> Result<LintConfig> {
    let mut config = match &args.config {
        Some(path) => LintConfig::load(path)?,
        None => LintConfig::default(),
    };
    if !args.regions.is_empty() {
        config.regions = args
            .regions
            .iter()
            .map(|r| Region::new(r.as_str()).with_context(|| format!("invalid region '{r}'")))
            .collect::<Result<_>>()?;
    }
    config.ignore_checks.extend(args.ignore_checks.iter().cloned());
    config.strict_types |= args.strict_types;
    Ok(config)
}

fn schema_store(args: &LintArgs) -> Result<Arc<dyn SchemaStore>> {
    let store = match &args.schemas {
        Some(dir) => InMemorySchemaStore::load_dir(dir)
            .with_context(|| format!("loading resource schemas from {}", dir.display()))?,
        None => InMemorySchemaStore::bundled().context("loading bundled resource schemas")?,
    };
    tracing::debug!(types = store.len(), "schema store ready");
    Ok(Arc::new(store))
}

/// Lint every template in `args`.
pub fn lint_files(args: &LintArgs) -> Result<Vec<FileReport>> {
    let config = effective_config(args)?;
    let registry = Arc::new(standard_registry().context("building rule registry")?);
    let linter = Linter::new(registry, schema_store(args)?, config)?;

    let mut reports = Vec::with_capacity(args.templates.len());
    for file in &args.templates {
        let document = load_document(file).with_context(|| format!("reading template {}", file.display()))?;
        let diagnostics = linter
            .lint_value(document, &[])
            .with_context(|| format!("linting {}", file.display()))?;
        tracing::info!(file = %file.display(), findings = diagnostics.len(), "template linted");
        reports.push(FileReport {
            file: file.clone(),
            diagnostics,
        });
    }
    Ok(reports)
}

/// Run the lint command, print the report and return the exit status.
pub fn run_lint(args: &LintArgs) -> Result<u8> {
    let reports = lint_files(args)?;
    let rendered = render(&reports, args.format).context("rendering report")?;
    print!("{rendered}");
    if args.format == OutputFormat::Json {
        println!();
    }
    Ok(exit_code(&reports))
}
