//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sbomforge.toml";

/// sbomforge -- SPDX build manifest generator and validator.
///
/// Use `sbomforge <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "sbomforge", version, about, long_about = None)]
pub struct Cli {
    /// Path to the sbomforge.toml configuration file.
    ///
    /// When omitted, `sbomforge.toml` is used if it exists; otherwise
    /// built-in defaults (plus environment overrides) apply.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate SPDX manifests for a build drop.
    Generate(GenerateArgs),

    /// Validate a build drop against its manifest.
    Validate(ValidateArgs),

    /// Merge several validated manifests into one.
    Aggregate(AggregateArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

/// Options shared by every workflow command.
#[derive(Args, Debug, Default)]
pub struct DropArgs {
    /// Build drop root (overrides `scan.build_drop_path`).
    #[arg(short = 'b', long)]
    pub build_drop_path: Option<PathBuf>,

    /// Manifest directory (default: `<build_drop>/_manifest`).
    #[arg(short = 'm', long)]
    pub manifest_dir_path: Option<PathBuf>,

    /// Read the file list from this file instead of walking the drop.
    #[arg(long)]
    pub build_list_file: Option<PathBuf>,

    /// Number of parallel hashing lanes (1-64).
    #[arg(short = 'p', long)]
    pub parallelism: Option<usize>,

    /// Only include files under these relative prefixes (repeatable).
    #[arg(long = "root-path-filter")]
    pub root_path_filter: Vec<String>,
}

// ---- generate ----

/// Generate SPDX manifests for a build drop.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub drop: DropArgs,

    /// Manifest versions to emit, e.g. `2.2`, `3.0` (repeatable).
    #[arg(long = "manifest-version")]
    pub manifest_versions: Vec<String>,

    /// Root package name.
    #[arg(long)]
    pub package_name: Option<String>,

    /// Root package version.
    #[arg(long)]
    pub package_version: Option<String>,

    /// Root package supplier organization.
    #[arg(long)]
    pub package_supplier: Option<String>,

    /// Base URI for the document namespace.
    #[arg(long)]
    pub namespace_base_uri: Option<String>,

    /// File listing external SBOM documents to reference.
    #[arg(long)]
    pub external_document_list_file: Option<PathBuf>,

    /// Skip lockfile component detection.
    #[arg(long)]
    pub no_component_scan: bool,

    /// Fail the run when no packages are detected.
    #[arg(long)]
    pub fail_if_no_packages: bool,
}

// ---- validate ----

/// Validate a build drop against its manifest.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub drop: DropArgs,

    /// Manifest version to validate against (`2.2` or `3.0`).
    #[arg(long = "manifest-version")]
    pub manifest_version: Option<String>,

    /// Hash algorithm to compare (SHA1, SHA256, SHA512).
    #[arg(long)]
    pub hash_algorithm: Option<String>,

    /// Do not fail on files listed in the manifest but absent on disk.
    #[arg(long)]
    pub ignore_missing: bool,

    /// Write the JSON report to this path.
    #[arg(short = 'r', long)]
    pub report_path: Option<PathBuf>,

    /// Conformance standard to check (`ntia`).
    #[arg(long)]
    pub conformance: Option<String>,

    /// Skip the manifest sidecar check.
    #[arg(long)]
    pub skip_signature: bool,
}

// ---- aggregate ----

/// Merge several validated manifests into one.
#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Output drop for the aggregated manifest.
    #[arg(short = 'b', long)]
    pub build_drop_path: Option<PathBuf>,

    /// Output manifest directory (default: `<build_drop>/_manifest`).
    #[arg(short = 'm', long)]
    pub manifest_dir_path: Option<PathBuf>,

    /// Source build drop with a `_manifest/spdx_2.2` manifest (repeatable).
    ///
    /// Replaces `[[aggregate.sources]]` from the configuration file.
    #[arg(short = 's', long = "source")]
    pub sources: Vec<PathBuf>,

    /// Root package name.
    #[arg(long)]
    pub package_name: Option<String>,

    /// Root package version.
    #[arg(long)]
    pub package_version: Option<String>,

    /// Root package supplier organization.
    #[arg(long)]
    pub package_supplier: Option<String>,
}

// ---- config ----

/// Manage sbomforge configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, scan, generate, validate, aggregate).
        #[arg(long)]
        section: Option<String>,
    },
}
