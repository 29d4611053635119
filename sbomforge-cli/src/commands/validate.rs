//! `sbomforge validate` command handler

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;
use tracing::info;

use sbomforge_core::config::ForgeConfig;
use sbomforge_core::types::{Action, HashAlgorithm};
use sbomforge_workflow::{
    Conformance, ValidateWorkflow, ValidationReport, WorkflowConfig, WorkflowConfigBuilder,
};

use crate::cli::ValidateArgs;
use crate::commands::{apply_drop_args, parse_manifest_version};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// Exit code 3 when integrity errors remain after `--ignore-missing`,
/// 4 when the manifest is malformed or its sidecar does not match.
pub async fn execute(
    args: ValidateArgs,
    config: &ForgeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let workflow_config = build_config(args, config)?;
    let manifest = workflow_config
        .manifest_file(workflow_config.validate_version)
        .display()
        .to_string();
    let report_file = workflow_config
        .report_path
        .as_ref()
        .map(|p| p.display().to_string());

    info!(manifest = %manifest, "starting validation");
    let outcome = ValidateWorkflow::new(workflow_config).run().await?;

    let report = ValidateReport {
        manifest,
        report_file,
        report: outcome.report,
    };
    writer.render(&report)?;

    if !outcome.success {
        return Err(CliError::ValidationFailed(format!(
            "{} file(s) failed integrity checks",
            report.report.summary.failures
        )));
    }

    Ok(())
}

fn build_config(args: ValidateArgs, config: &ForgeConfig) -> Result<WorkflowConfig, CliError> {
    let base = WorkflowConfig::from_core(config, Action::Validate);
    let mut builder = apply_drop_args(WorkflowConfigBuilder::from_config(base), args.drop);

    if let Some(version) = args.manifest_version {
        builder = builder.validate_version(parse_manifest_version(&version)?);
    }
    if let Some(algorithm) = args.hash_algorithm {
        let algorithm = HashAlgorithm::from_str_loose(&algorithm).ok_or_else(|| {
            CliError::Command(format!(
                "invalid hash algorithm: {} (expected: SHA1, SHA256, SHA512)",
                algorithm
            ))
        })?;
        builder = builder.hash_algorithm(algorithm);
    }
    if args.ignore_missing {
        builder = builder.ignore_missing(true);
    }
    if let Some(path) = args.report_path {
        builder = builder.report_path(path);
    }
    if let Some(standard) = args.conformance {
        let conformance = Conformance::from_str_loose(&standard).ok_or_else(|| {
            CliError::Command(format!(
                "invalid conformance standard: {} (expected: ntia)",
                standard
            ))
        })?;
        builder = builder.conformance(conformance);
    }
    if args.skip_signature {
        builder = builder.verify_signature(false);
    }

    Ok(builder.build()?)
}

/// Validation result with the manifest it was checked against.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReport {
    pub manifest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,
    #[serde(flatten)]
    pub report: ValidationReport,
}

impl Render for ValidateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let s = &self.report.summary;
        writeln!(w, "Validate: {}", self.manifest.bold())?;
        if self.report.is_success() {
            writeln!(w, "  Result: {}", "SUCCESS".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "FAILURE".red().bold())?;
        }
        writeln!(w, "  Manifest version: {}", s.manifest_version)?;
        writeln!(
            w,
            "  Files: {} validated, {} ok, {} failed",
            s.total_files_validated,
            s.successful_files.to_string().green(),
            failure_count(s.failures)
        )?;
        if s.ignore_missing {
            writeln!(
                w,
                "  Ignore missing: {} ({} missing not counted)",
                "on".yellow(),
                s.raw_missing_count
            )?;
        }
        writeln!(w, "  Packages: {}", s.packages)?;
        writeln!(w, "  Duration: {:.2}s", s.duration_secs)?;
        if let Some(ref path) = self.report_file {
            writeln!(w, "  Report: {}", path.dimmed())?;
        }

        write_groups(w, "Invalid files", &self.report.invalid_files, true)?;
        write_groups(w, "Skipped files", &self.report.skipped_files, false)?;

        Ok(())
    }
}

fn failure_count(failures: u64) -> colored::ColoredString {
    use colored::Colorize;

    if failures == 0 {
        failures.to_string().normal()
    } else {
        failures.to_string().red().bold()
    }
}

fn write_groups<K: std::fmt::Display>(
    w: &mut dyn Write,
    title: &str,
    groups: &BTreeMap<K, Vec<String>>,
    failure: bool,
) -> std::io::Result<()> {
    use colored::Colorize;

    if groups.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{}:", title)?;
    for (kind, paths) in groups {
        let label = format!("{} ({})", kind, paths.len());
        if failure {
            writeln!(w, "  {}", label.red())?;
        } else {
            writeln!(w, "  {}", label.yellow())?;
        }
        for path in paths {
            writeln!(w, "    {}", path.dimmed())?;
        }
    }
    Ok(())
}
