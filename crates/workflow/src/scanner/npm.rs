//! package-lock.json 파서
//!
//! NPM lockfile v2/v3의 `packages` 맵을 읽습니다. 키가 빈 문자열인 항목은
//! 프로젝트 자신이므로 건너뜁니다.
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "lockfileVersion": 3,
//!   "packages": {
//!     "": { "name": "my-app", "version": "1.0.0" },
//!     "node_modules/lodash": { "version": "4.17.21", "integrity": "sha512-..." }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::WorkflowError;
use crate::scanner::lockfile::LockfileParser;
use crate::scanner::{Dependency, Ecosystem, RawPackage};

/// package-lock.json 파서
pub struct NpmLockParser;

#[derive(Deserialize)]
struct NpmLockFile {
    #[serde(default)]
    packages: BTreeMap<String, NpmPackageEntry>,
}

#[derive(Deserialize)]
struct NpmPackageEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    integrity: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

impl LockfileParser for NpmLockParser {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn can_parse(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name == "package-lock.json")
    }

    fn parse(&self, content: &str, source_path: &str) -> Result<Vec<RawPackage>, WorkflowError> {
        let lock_file: NpmLockFile =
            serde_json::from_str(content).map_err(|e| WorkflowError::LockfileParse {
                path: source_path.to_owned(),
                reason: e.to_string(),
            })?;

        let mut packages = Vec::new();
        for (key, entry) in lock_file.packages {
            if key.is_empty() {
                continue;
            }

            let name = entry.name.unwrap_or_else(|| extract_package_name(&key));
            // 버전 없는 항목(링크된 워크스페이스 등)은 그대로 넘겨 변환 단계에서 보고
            let version = entry.version.unwrap_or_default();

            let dependencies = entry
                .dependencies
                .into_keys()
                .map(|name| Dependency {
                    name,
                    version: None,
                })
                .collect();

            packages.push(RawPackage {
                purl: Ecosystem::Npm.purl(&name, &version),
                name,
                version,
                ecosystem: Ecosystem::Npm,
                checksum: entry.integrity,
                license: entry.license,
                dependencies,
                source_file: source_path.to_owned(),
            });
        }

        Ok(packages)
    }
}

/// "node_modules/@scope/name" 또는 "node_modules/name" 에서 패키지명 추출
fn extract_package_name(key: &str) -> String {
    match key.rfind("node_modules/") {
        Some(pos) => key[pos + "node_modules/".len()..].to_owned(),
        None => key.to_owned(),
    }
}
