//! Cargo.lock 파서
//!
//! `[[package]]` 테이블마다 원시 패키지 하나를 만듭니다. 의존성 항목은
//! `name`, `name version`, `name version (source)` 세 가지 형식입니다.

use std::path::Path;

use serde::Deserialize;

use crate::error::WorkflowError;
use crate::scanner::lockfile::LockfileParser;
use crate::scanner::{Dependency, Ecosystem, RawPackage};

/// Cargo.lock 파서
pub struct CargoLockParser;

#[derive(Deserialize)]
struct CargoLockFile {
    #[serde(default)]
    package: Vec<CargoPackageEntry>,
}

#[derive(Deserialize)]
struct CargoPackageEntry {
    name: String,
    version: String,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

impl LockfileParser for CargoLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cargo
    }

    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "Cargo.lock")
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<RawPackage>, WorkflowError> {
        let lock_file: CargoLockFile =
            toml::from_str(content).map_err(|e| WorkflowError::LockfileParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(lock_file
            .package
            .into_iter()
            .map(|entry| RawPackage {
                purl: Ecosystem::Cargo.purl(&entry.name, &entry.version),
                dependencies: entry.dependencies.iter().map(|d| parse_dependency(d)).collect(),
                name: entry.name,
                version: entry.version,
                ecosystem: Ecosystem::Cargo,
                checksum: entry.checksum,
                license: None,
                source_file: source_path.to_owned(),
            })
            .collect())
    }
}

fn parse_dependency(entry: &str) -> Dependency {
    let mut parts = entry.split_whitespace();
    Dependency {
        name: parts.next().unwrap_or_default().to_owned(),
        version: parts.next().map(str::to_owned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CARGO_LOCK: &str = r#"
version = 4

[[package]]
name = "app"
version = "0.1.0"
dependencies = [
 "serde",
 "itoa 1.0.11",
]

[[package]]
name = "serde"
version = "1.0.204"
source = "registry+https://github.com/rust-lang/crates.io-index"
checksum = "bc76f558e0cbb2a839d37354c575f1dc3fdc6546b5be373ba43d95f231bf7c12"

[[package]]
name = "itoa"
version = "1.0.11"
source = "registry+https://github.com/rust-lang/crates.io-index"
checksum = "49f1f14873335454500d59611f1cf4a4b0f786f9ac11f4312a78e4cf2566695b"
"#;

    #[test]
    fn parse_sample_cargo_lock() {
        let packages = CargoLockParser.parse(SAMPLE_CARGO_LOCK, "Cargo.lock").unwrap();

        assert_eq!(packages.len(), 3);
        let app = &packages[0];
        assert_eq!(app.name, "app");
        assert!(app.checksum.is_none());
        assert_eq!(
            app.dependencies,
            vec![
                Dependency {
                    name: "serde".to_owned(),
                    version: None
                },
                Dependency {
                    name: "itoa".to_owned(),
                    version: Some("1.0.11".to_owned())
                },
            ]
        );

        let serde = &packages[1];
        assert_eq!(serde.purl, "pkg:cargo/serde@1.0.204");
        assert_eq!(serde.checksum.as_deref().map(str::len), Some(64));
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = CargoLockParser.parse("[[package]\nname =", "Cargo.lock");
        assert!(matches!(result, Err(WorkflowError::LockfileParse { .. })));
    }

    #[test]
    fn dependency_with_source_suffix() {
        let dep = parse_dependency("serde 1.0.204 (registry+https://github.com/rust-lang/crates.io-index)");
        assert_eq!(dep.name, "serde");
        assert_eq!(dep.version.as_deref(), Some("1.0.204"));
    }
}
