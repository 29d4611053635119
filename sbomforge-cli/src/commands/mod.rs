//! Command handlers -- one module per subcommand

pub mod aggregate;
pub mod config;
pub mod generate;
pub mod validate;

use std::path::{Path, PathBuf};

use sbomforge_core::config::ForgeConfig;
use sbomforge_core::types::ManifestVersion;
use sbomforge_workflow::WorkflowConfigBuilder;
use tracing::debug;

use crate::cli::{DEFAULT_CONFIG_FILE, DropArgs};
use crate::error::CliError;

/// Resolve the configuration file to read.
///
/// An explicit `--config` must exist. Without one, `sbomforge.toml` in the
/// working directory is used when present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

/// Human-readable name of the configuration source.
pub fn config_source(explicit: Option<&Path>) -> String {
    resolve_config_path(explicit)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".to_owned())
}

/// Load the effective configuration (file + env overrides + defaults).
pub async fn load_config(explicit: Option<&Path>) -> Result<ForgeConfig, CliError> {
    match resolve_config_path(explicit) {
        Some(path) => Ok(ForgeConfig::load(&path).await?),
        None => {
            debug!("no configuration file found, using defaults");
            let mut config = ForgeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Apply the shared drop options on top of the configured values.
pub(crate) fn apply_drop_args(
    mut builder: WorkflowConfigBuilder,
    args: DropArgs,
) -> WorkflowConfigBuilder {
    if let Some(path) = args.build_drop_path {
        builder = builder.build_drop_path(path);
    }
    if let Some(path) = args.manifest_dir_path {
        builder = builder.manifest_dir_path(path);
    }
    if let Some(path) = args.build_list_file {
        builder = builder.build_list_file(path);
    }
    if let Some(parallelism) = args.parallelism {
        builder = builder.parallelism(parallelism);
    }
    if !args.root_path_filter.is_empty() {
        builder = builder.root_path_filter(args.root_path_filter);
    }
    builder
}

pub(crate) fn parse_manifest_version(s: &str) -> Result<ManifestVersion, CliError> {
    ManifestVersion::from_str_loose(s).ok_or_else(|| {
        CliError::Command(format!(
            "invalid manifest version: {} (expected: 2.2, 3.0)",
            s
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_manifest_version() {
        assert_eq!(
            parse_manifest_version("2.2").expect("2.2 should parse"),
            ManifestVersion::Spdx22
        );
        assert_eq!(
            parse_manifest_version("SPDX:3.0").expect("3.0 should parse"),
            ManifestVersion::Spdx30
        );
        let err = parse_manifest_version("1.0").expect_err("1.0 should be rejected");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_resolve_explicit_config_path() {
        let path = Path::new("/etc/sbomforge/custom.toml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
        assert_eq!(config_source(Some(path)), "/etc/sbomforge/custom.toml");
    }

    #[tokio::test]
    #[serial]
    async fn test_load_config_applies_env_without_file() {
        // SAFETY: serialised with other env-mutating tests
        unsafe { std::env::set_var("SBOMFORGE_SCAN_PARALLELISM", "3") };
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let explicit = load_config(Some(&missing)).await;
        let defaults = load_config(None).await;
        unsafe { std::env::remove_var("SBOMFORGE_SCAN_PARALLELISM") };

        assert!(explicit.is_err(), "explicit missing file should fail");
        let config = defaults.expect("defaults should load");
        assert_eq!(config.scan.parallelism, 3);
    }

    #[test]
    fn test_apply_drop_args_overrides_builder() {
        let args = DropArgs {
            build_drop_path: Some(PathBuf::from("/drop")),
            parallelism: Some(2),
            root_path_filter: vec!["bin".to_owned()],
            ..Default::default()
        };
        let config = apply_drop_args(WorkflowConfigBuilder::new(), args)
            .build()
            .expect("config should be valid");
        assert_eq!(config.build_drop_path, PathBuf::from("/drop"));
        assert_eq!(config.parallelism, 2);
        assert_eq!(config.root_path_filter, vec!["bin"]);
    }
}
