//! `sbomforge aggregate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use sbomforge_core::config::ForgeConfig;
use sbomforge_core::types::{Action, ManifestVersion};
use sbomforge_workflow::{
    AggregateOutcome, AggregateSource, AggregateWorkflow, SourceState, WorkflowConfig,
    WorkflowConfigBuilder,
};

use crate::cli::AggregateArgs;
use crate::commands::generate::GenerateReport;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `aggregate` command.
pub async fn execute(
    args: AggregateArgs,
    config: &ForgeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let workflow_config = build_config(args, config)?;
    let build_drop = workflow_config.build_drop_path.display().to_string();

    info!(
        sources = workflow_config.aggregate_sources.len(),
        "starting aggregation"
    );
    let outcome = AggregateWorkflow::new(workflow_config).run().await?;

    let report = AggregateReport::from_outcome(build_drop, &outcome);
    writer.render(&report)?;

    if !report.success {
        let failed = report.sources.iter().filter(|s| s.state == "failed").count();
        return Err(CliError::Command(format!(
            "aggregation failed ({} source(s) excluded)",
            failed
        )));
    }

    Ok(())
}

fn build_config(args: AggregateArgs, config: &ForgeConfig) -> Result<WorkflowConfig, CliError> {
    let base = WorkflowConfig::from_core(config, Action::Aggregate);
    let name = args
        .package_name
        .unwrap_or_else(|| base.package_name.clone());
    let version = args
        .package_version
        .unwrap_or_else(|| base.package_version.clone());

    let mut builder = WorkflowConfigBuilder::from_config(base).package(name, version);
    if let Some(path) = args.build_drop_path {
        builder = builder.build_drop_path(path);
    }
    if let Some(path) = args.manifest_dir_path {
        builder = builder.manifest_dir_path(path);
    }
    if let Some(supplier) = args.package_supplier {
        builder = builder.package_supplier(supplier);
    }
    if !args.sources.is_empty() {
        let sources = args
            .sources
            .into_iter()
            .map(|build_drop_path| AggregateSource {
                build_drop_path,
                manifest_dir_path: None,
                manifest_version: ManifestVersion::Spdx22,
            })
            .collect();
        builder = builder.aggregate_sources(sources);
    }

    Ok(builder.build()?)
}

/// Result of an aggregation run.
#[derive(Serialize)]
pub struct AggregateReport {
    pub success: bool,
    pub sources: Vec<SourceEntry>,
    pub generate: GenerateReport,
}

#[derive(Serialize)]
pub struct SourceEntry {
    pub manifest: String,
    pub version: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AggregateReport {
    fn from_outcome(build_drop: String, outcome: &AggregateOutcome) -> Self {
        let sources = outcome
            .sources
            .iter()
            .map(|s| {
                let (packages, reason) = match &s.state {
                    SourceState::Merged { packages } => (Some(*packages), None),
                    SourceState::Skipped { reason } | SourceState::Failed { reason } => {
                        (None, Some(reason.clone()))
                    }
                };
                SourceEntry {
                    manifest: s.manifest.display().to_string(),
                    version: s.version.as_str().to_owned(),
                    state: s.state.as_str().to_owned(),
                    packages,
                    reason,
                }
            })
            .collect();

        Self {
            success: outcome.success,
            sources,
            generate: GenerateReport::from_outcome(build_drop, &outcome.generate),
        }
    }
}

impl Render for AggregateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Sources:")?;
        for s in &self.sources {
            let state = match s.state.as_str() {
                "merged" => s.state.green(),
                "skipped" => s.state.yellow(),
                _ => s.state.red(),
            };
            match (s.packages, &s.reason) {
                (Some(packages), _) => {
                    writeln!(w, "  {:<8} {} ({} packages)", state, s.manifest, packages)?
                }
                (None, Some(reason)) => {
                    writeln!(w, "  {:<8} {}", state, s.manifest)?;
                    writeln!(w, "           {}", reason.dimmed())?;
                }
                (None, None) => writeln!(w, "  {:<8} {}", state, s.manifest)?,
            }
        }
        writeln!(w)?;
        self.generate.render_text(w)
    }
}
