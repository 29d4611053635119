//! End-to-end tests for the `sbomforge` binary.
//!
//! Each test runs the compiled binary against a temporary build drop and
//! checks exit codes and JSON output.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CARGO_LOCK: &str = r#"
version = 3

[[package]]
name = "app"
version = "0.1.0"
dependencies = ["serde"]

[[package]]
name = "serde"
version = "1.0.200"
source = "registry+https://github.com/rust-lang/crates.io-index"
"#;

fn sbomforge(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sbomforge"))
        .current_dir(cwd)
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("should spawn sbomforge")
}

fn build_drop(dir: &Path) {
    std::fs::create_dir_all(dir.join("bin")).expect("create bin");
    std::fs::write(dir.join("bin/app"), b"\x7fELF").expect("write app");
    std::fs::write(dir.join("bin/app.pdb"), b"symbols").expect("write pdb");
    std::fs::write(dir.join("readme.md"), b"# app").expect("write readme");
    std::fs::write(dir.join("Cargo.lock"), CARGO_LOCK).expect("write lockfile");
}

fn generate(cwd: &Path, drop: &Path, name: &str) -> Output {
    let drop = drop.to_str().expect("utf-8 path");
    sbomforge(
        cwd,
        &[
            "generate",
            "-b",
            drop,
            "--package-name",
            name,
            "--package-version",
            "1.0.0",
            "--package-supplier",
            "Contoso",
            "--output",
            "json",
        ],
    )
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_generate_then_validate_succeeds() {
    // Given: A build drop
    let cwd = TempDir::new().expect("temp dir");
    let drop = TempDir::new().expect("temp dir");
    build_drop(drop.path());

    // When: Generating a manifest
    let generated = generate(cwd.path(), drop.path(), "app");

    // Then: Exit 0 with one manifest and its sidecar
    assert_eq!(generated.status.code(), Some(0), "{:?}", generated);
    let report = json(&generated);
    assert_eq!(report["success"], true);
    assert_eq!(report["files"], 4);
    assert_eq!(report["manifests"].as_array().map(Vec::len), Some(1));
    assert!(report["manifests"][0]["sidecar"].is_string());

    // When: Validating the unchanged drop
    let drop_str = drop.path().to_str().expect("utf-8 path");
    let validated = sbomforge(cwd.path(), &["validate", "-b", drop_str, "--output", "json"]);

    // Then: Exit 0 and every file verified
    assert_eq!(validated.status.code(), Some(0), "{:?}", validated);
    let report = json(&validated);
    assert_eq!(report["result"], "Success");
    assert_eq!(report["summary"]["successfulFiles"], 4);
}

#[test]
fn test_validate_drift_exits_with_3() {
    // Given: A drop that changed after generation
    let cwd = TempDir::new().expect("temp dir");
    let drop = TempDir::new().expect("temp dir");
    build_drop(drop.path());
    assert_eq!(generate(cwd.path(), drop.path(), "app").status.code(), Some(0));
    std::fs::write(drop.path().join("bin/extra.dll"), b"new").expect("write extra");
    std::fs::remove_file(drop.path().join("bin/app.pdb")).expect("remove pdb");

    // When: Validating with a report file
    let drop_str = drop.path().to_str().expect("utf-8 path");
    let report_path = cwd.path().join("report.json");
    let report_str = report_path.to_str().expect("utf-8 path");
    let validated = sbomforge(
        cwd.path(),
        &["validate", "-b", drop_str, "-r", report_str, "--output", "json"],
    );

    // Then: Exit 3 and both failures reported
    assert_eq!(validated.status.code(), Some(3), "{:?}", validated);
    let report = json(&validated);
    assert_eq!(report["invalidFiles"]["AdditionalFile"][0], "/bin/extra.dll");
    assert_eq!(report["invalidFiles"]["MissingFile"][0], "/bin/app.pdb");
    assert!(report_path.exists(), "report file should be written");

    // When: Ignoring missing files
    let lenient = sbomforge(
        cwd.path(),
        &["validate", "-b", drop_str, "--ignore-missing", "--output", "json"],
    );

    // Then: Still failing on the additional file only
    assert_eq!(lenient.status.code(), Some(3));
    let report = json(&lenient);
    assert_eq!(report["summary"]["failures"], 1);
    assert_eq!(report["summary"]["rawMissingCount"], 1);
}

#[test]
fn test_tampered_manifest_exits_with_4() {
    // Given: A manifest modified after its sidecar was written
    let cwd = TempDir::new().expect("temp dir");
    let drop = TempDir::new().expect("temp dir");
    build_drop(drop.path());
    let generated = json(&generate(cwd.path(), drop.path(), "app"));
    let manifest = generated["manifests"][0]["path"]
        .as_str()
        .expect("manifest path")
        .to_owned();
    let mut bytes = std::fs::read(&manifest).expect("read manifest");
    bytes.push(b' ');
    std::fs::write(&manifest, bytes).expect("write manifest");

    // When: Validating
    let drop_str = drop.path().to_str().expect("utf-8 path");
    let validated = sbomforge(cwd.path(), &["validate", "-b", drop_str]);

    // Then: Signature failure exit code
    assert_eq!(validated.status.code(), Some(4), "{:?}", validated);
    let stderr = String::from_utf8_lossy(&validated.stderr);
    assert!(stderr.contains("signature"), "stderr: {}", stderr);

    // When: Skipping the sidecar check
    let unchecked = sbomforge(cwd.path(), &["validate", "-b", drop_str, "--skip-signature"]);

    // Then: The content itself still matches
    assert_eq!(unchecked.status.code(), Some(0), "{:?}", unchecked);
}

#[test]
fn test_generate_without_packages_fails_when_required() {
    // Given: A drop without lockfiles
    let cwd = TempDir::new().expect("temp dir");
    let drop = TempDir::new().expect("temp dir");
    std::fs::write(drop.path().join("data.bin"), b"data").expect("write data");

    // When: Requiring packages
    let drop_str = drop.path().to_str().expect("utf-8 path");
    let output = sbomforge(
        cwd.path(),
        &[
            "generate",
            "-b",
            drop_str,
            "--package-name",
            "data",
            "--package-version",
            "1.0.0",
            "--fail-if-no-packages",
            "--output",
            "json",
        ],
    );

    // Then: Command error and no manifest directory left behind
    assert_eq!(output.status.code(), Some(1), "{:?}", output);
    let report = json(&output);
    assert_eq!(report["errors"][0]["kind"], "NoPackagesFound");
    assert!(!drop.path().join("_manifest").exists());
}

#[test]
fn test_aggregate_merges_generated_drops() {
    // Given: Two generated drops
    let cwd = TempDir::new().expect("temp dir");
    let service = TempDir::new().expect("temp dir");
    let worker = TempDir::new().expect("temp dir");
    build_drop(service.path());
    build_drop(worker.path());
    assert_eq!(generate(cwd.path(), service.path(), "service").status.code(), Some(0));
    assert_eq!(generate(cwd.path(), worker.path(), "worker").status.code(), Some(0));

    // When: Aggregating into a new drop
    let out = TempDir::new().expect("temp dir");
    let output = sbomforge(
        cwd.path(),
        &[
            "aggregate",
            "-b",
            out.path().to_str().expect("utf-8 path"),
            "-s",
            service.path().to_str().expect("utf-8 path"),
            "-s",
            worker.path().to_str().expect("utf-8 path"),
            "--package-name",
            "platform",
            "--package-version",
            "2024.1",
            "--output",
            "json",
        ],
    );

    // Then: Both sources merged into one manifest
    assert_eq!(output.status.code(), Some(0), "{:?}", output);
    let report = json(&output);
    assert_eq!(report["sources"][0]["state"], "merged");
    assert_eq!(report["sources"][1]["state"], "merged");
    assert!(
        out.path()
            .join("_manifest/spdx_2.2/manifest.spdx.json")
            .exists()
    );
}

#[test]
fn test_config_validate_invalid_file_exits_with_2() {
    // Given: A config with an out-of-range value
    let cwd = TempDir::new().expect("temp dir");
    std::fs::write(cwd.path().join("sbomforge.toml"), "[scan]\nparallelism = 100\n")
        .expect("write config");

    // When: Validating the default config file
    let output = sbomforge(cwd.path(), &["config", "validate", "--output", "json"]);

    // Then: Invalid report and configuration exit code
    assert_eq!(output.status.code(), Some(2), "{:?}", output);
    let report = json(&output);
    assert_eq!(report["valid"], false);
    assert!(report["errors"][0]
        .as_str()
        .is_some_and(|e| e.contains("parallelism")));
}

#[test]
fn test_config_show_uses_defaults_without_file() {
    // Given: No config file in the working directory
    let cwd = TempDir::new().expect("temp dir");

    // When: Showing the scan section
    let output = sbomforge(cwd.path(), &["config", "show", "--section", "scan"]);

    // Then: Defaults are displayed
    assert_eq!(output.status.code(), Some(0), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(defaults)"));
    assert!(stdout.contains("parallelism = 8"));
}

#[test]
fn test_missing_explicit_config_exits_with_2() {
    let cwd = TempDir::new().expect("temp dir");
    let output = sbomforge(cwd.path(), &["-c", "missing.toml", "generate"]);
    assert_eq!(output.status.code(), Some(2), "{:?}", output);
}
