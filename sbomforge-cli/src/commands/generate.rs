//! `sbomforge generate` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use sbomforge_core::config::ForgeConfig;
use sbomforge_core::types::{Action, FileValidationResult};
use sbomforge_workflow::{GenerateOutcome, GenerateWorkflow, WorkflowConfig, WorkflowConfigBuilder};

use crate::cli::GenerateArgs;
use crate::commands::{apply_drop_args, parse_manifest_version};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `generate` command.
pub async fn execute(
    args: GenerateArgs,
    config: &ForgeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let workflow_config = build_config(args, config)?;
    let build_drop = workflow_config.build_drop_path.display().to_string();

    info!(build_drop = %build_drop, "starting manifest generation");
    let outcome = GenerateWorkflow::new(workflow_config).run().await?;

    let report = GenerateReport::from_outcome(build_drop, &outcome);
    writer.render(&report)?;

    if !report.success {
        return Err(CliError::Command(format!(
            "generation failed with {} error(s)",
            report.errors.len()
        )));
    }

    Ok(())
}

fn build_config(args: GenerateArgs, config: &ForgeConfig) -> Result<WorkflowConfig, CliError> {
    let base = WorkflowConfig::from_core(config, Action::Generate);
    let name = args
        .package_name
        .unwrap_or_else(|| base.package_name.clone());
    let version = args
        .package_version
        .unwrap_or_else(|| base.package_version.clone());

    let mut builder = apply_drop_args(WorkflowConfigBuilder::from_config(base), args.drop)
        .package(name, version);

    if !args.manifest_versions.is_empty() {
        let versions = args
            .manifest_versions
            .iter()
            .map(|v| parse_manifest_version(v))
            .collect::<Result<Vec<_>, _>>()?;
        builder = builder.manifest_versions(versions);
    }
    if let Some(supplier) = args.package_supplier {
        builder = builder.package_supplier(supplier);
    }
    if let Some(uri) = args.namespace_base_uri {
        builder = builder.namespace_base_uri(uri);
    }
    if let Some(path) = args.external_document_list_file {
        builder = builder.external_document_list_file(path);
    }
    if args.no_component_scan {
        builder = builder.scan_components(false);
    }
    if args.fail_if_no_packages {
        builder = builder.fail_if_no_packages(true);
    }

    Ok(builder.build()?)
}

/// Result of a generation run.
#[derive(Serialize)]
pub struct GenerateReport {
    pub build_drop: String,
    pub success: bool,
    pub files: usize,
    pub packages: usize,
    pub manifests: Vec<ManifestEntry>,
    pub errors: Vec<IssueEntry>,
    pub skipped: usize,
    pub duration_secs: f64,
}

#[derive(Serialize)]
pub struct ManifestEntry {
    pub version: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<String>,
    pub elements: usize,
}

#[derive(Serialize)]
pub struct IssueEntry {
    pub path: String,
    pub kind: String,
}

impl From<&FileValidationResult> for IssueEntry {
    fn from(r: &FileValidationResult) -> Self {
        Self {
            path: r.path.clone(),
            kind: r.kind.as_str().to_owned(),
        }
    }
}

impl GenerateReport {
    pub fn from_outcome(build_drop: String, outcome: &GenerateOutcome) -> Self {
        Self {
            build_drop,
            success: outcome.success,
            files: outcome.files,
            packages: outcome.packages,
            manifests: outcome
                .manifests
                .iter()
                .map(|m| ManifestEntry {
                    version: m.version.as_str().to_owned(),
                    path: m.path.display().to_string(),
                    sidecar: m.sidecar.as_ref().map(|p| p.display().to_string()),
                    elements: m.elements_written,
                })
                .collect(),
            errors: outcome.errors.iter().map(IssueEntry::from).collect(),
            skipped: outcome.skipped.len(),
            duration_secs: outcome.summary.duration_secs,
        }
    }
}

impl Render for GenerateReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Generate: {}", self.build_drop.bold())?;
        if self.success {
            writeln!(w, "  Result: {}", "SUCCESS".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "FAILURE".red().bold())?;
        }
        writeln!(w, "  Files: {}", self.files)?;
        writeln!(w, "  Packages: {}", self.packages)?;
        if self.skipped > 0 {
            writeln!(w, "  Skipped: {}", self.skipped.to_string().dimmed())?;
        }
        writeln!(w, "  Duration: {:.2}s", self.duration_secs)?;

        if !self.manifests.is_empty() {
            writeln!(w)?;
            writeln!(w, "Manifests:")?;
            for m in &self.manifests {
                writeln!(
                    w,
                    "  SPDX {:<4} {} ({} elements)",
                    m.version.bold(),
                    m.path,
                    m.elements
                )?;
                if let Some(ref sidecar) = m.sidecar {
                    writeln!(w, "            {}", sidecar.dimmed())?;
                }
            }
        }

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors:")?;
            for e in &self.errors {
                writeln!(w, "  {:<16} {}", e.kind.red(), e.path)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomforge_core::types::ManifestVersion;
    use std::path::PathBuf;

    fn args(drop: &str) -> GenerateArgs {
        GenerateArgs {
            drop: crate::cli::DropArgs {
                build_drop_path: Some(PathBuf::from(drop)),
                ..Default::default()
            },
            manifest_versions: Vec::new(),
            package_name: None,
            package_version: None,
            package_supplier: None,
            namespace_base_uri: None,
            external_document_list_file: None,
            no_component_scan: false,
            fail_if_no_packages: false,
        }
    }

    #[test]
    fn test_build_config_uses_core_values() {
        let core = ForgeConfig::parse(
            r#"
[generate]
package_name = "svc"
package_version = "3.1.0"
manifest_versions = ["3.0"]
"#,
        )
        .expect("valid config");
        let config = build_config(args("/drop"), &core).expect("config should build");
        assert_eq!(config.package_name, "svc");
        assert_eq!(config.package_version, "3.1.0");
        assert_eq!(config.manifest_versions, vec![ManifestVersion::Spdx30]);
        assert_eq!(config.build_drop_path, PathBuf::from("/drop"));
    }

    #[test]
    fn test_build_config_cli_overrides_win() {
        let mut a = args("/drop");
        a.package_name = Some("app".to_owned());
        a.manifest_versions = vec!["2.2".to_owned(), "3.0".to_owned()];
        a.no_component_scan = true;
        a.package_supplier = Some("Organization: Contoso".to_owned());

        let config = build_config(a, &ForgeConfig::default()).expect("config should build");
        assert_eq!(config.package_name, "app");
        assert_eq!(
            config.manifest_versions,
            vec![ManifestVersion::Spdx22, ManifestVersion::Spdx30]
        );
        assert!(!config.scan_components);
        assert_eq!(config.package_supplier, "Contoso");
    }

    #[test]
    fn test_build_config_rejects_unknown_version() {
        let mut a = args("/drop");
        a.manifest_versions = vec!["9.9".to_owned()];
        assert!(build_config(a, &ForgeConfig::default()).is_err());
    }

    #[test]
    fn test_render_failure_lists_errors() {
        let report = GenerateReport {
            build_drop: "/drop".to_owned(),
            success: false,
            files: 3,
            packages: 0,
            manifests: Vec::new(),
            errors: vec![IssueEntry {
                path: "/drop".to_owned(),
                kind: "NoPackagesFound".to_owned(),
            }],
            skipped: 0,
            duration_secs: 0.1,
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("FAILURE"));
        assert!(output.contains("NoPackagesFound"));
    }
}
