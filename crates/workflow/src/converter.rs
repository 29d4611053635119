//! 원시 패키지 -> 패키지 레코드 변환
//!
//! 스캐너가 내놓은 [`RawPackage`]를 결정적 ID를 가진 [`PackageRecord`]로
//! 바꾸고, 이름 기반 의존성 참조를 패키지 ID로 해석합니다.

use std::collections::HashMap;

use tracing::debug;

use sbomforge_core::types::{
    Checksums, ErrorKind, FileValidationResult, HashAlgorithm, LicenseInfo, PackageRecord,
};
use sbomforge_spdx::ids;

use crate::scanner::{Dependency, Ecosystem, RawPackage};

/// 변환 결과
#[derive(Debug, Default)]
pub struct PackageConversion {
    pub packages: Vec<PackageRecord>,
    pub errors: Vec<FileValidationResult>,
}

/// 패키지 변환기
#[derive(Debug, Default)]
pub struct PackageConverter;

impl PackageConverter {
    pub fn new() -> Self {
        Self
    }

    /// 원시 패키지를 변환합니다.
    ///
    /// - 이름이나 버전이 비어 있으면 `PackageError`
    /// - 같은 `name@version`이 여러 lockfile에 나오면 하나로 합치고 의존성을 합집합
    /// - 해석할 수 없는 의존성 참조는 버림
    pub fn convert(&self, raw: Vec<RawPackage>) -> PackageConversion {
        let mut conversion = PackageConversion::default();
        let mut valid = Vec::with_capacity(raw.len());

        for package in raw {
            if package.name.trim().is_empty() || package.version.trim().is_empty() {
                let path = if package.name.trim().is_empty() {
                    package.source_file.clone()
                } else {
                    format!("{}@{}", package.name, package.version)
                };
                debug!(package = %package, source = %package.source_file, "invalid package record");
                conversion
                    .errors
                    .push(FileValidationResult::new(path, ErrorKind::PackageError));
                continue;
            }
            valid.push(package);
        }

        let mut by_name: HashMap<(Ecosystem, &str), Vec<(&str, String)>> = HashMap::new();
        for package in &valid {
            by_name
                .entry((package.ecosystem, package.name.as_str()))
                .or_default()
                .push((
                    package.version.as_str(),
                    ids::package_id(&package.name, &package.version),
                ));
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        for package in &valid {
            let id = ids::package_id(&package.name, &package.version);
            let depends_on: Vec<String> = package
                .dependencies
                .iter()
                .filter_map(|dep| resolve(&by_name, package.ecosystem, dep))
                .filter(|dep_id| *dep_id != id)
                .collect();

            match index.get(&id) {
                Some(&existing) => {
                    let deps = &mut conversion.packages[existing].depends_on;
                    for dep in depends_on {
                        if !deps.contains(&dep) {
                            deps.push(dep);
                        }
                    }
                }
                None => {
                    index.insert(id.clone(), conversion.packages.len());
                    conversion.packages.push(to_record(package, id, depends_on));
                }
            }
        }

        conversion
    }
}

fn resolve(
    by_name: &HashMap<(Ecosystem, &str), Vec<(&str, String)>>,
    ecosystem: Ecosystem,
    dep: &Dependency,
) -> Option<String> {
    let Some(candidates) = by_name.get(&(ecosystem, dep.name.as_str())) else {
        debug!(dependency = %dep.name, "unresolved dependency reference");
        return None;
    };
    match &dep.version {
        Some(version) => candidates
            .iter()
            .find(|(v, _)| v == version)
            .map(|(_, id)| id.clone()),
        None => candidates.first().map(|(_, id)| id.clone()),
    }
}

fn to_record(package: &RawPackage, id: String, depends_on: Vec<String>) -> PackageRecord {
    let mut checksums = Checksums::new();
    if let Some(checksum) = &package.checksum {
        if is_hex_digest(checksum, HashAlgorithm::Sha256) {
            checksums.insert(HashAlgorithm::Sha256, checksum.to_ascii_lowercase());
        } else {
            debug!(package = %package, "non-hex checksum not recorded");
        }
    }

    PackageRecord {
        id,
        name: package.name.clone(),
        version: package.version.clone(),
        checksums,
        license: LicenseInfo {
            concluded: None,
            declared: package.license.clone(),
        },
        supplier: None,
        depends_on,
        purl: Some(package.purl.clone()),
    }
}

fn is_hex_digest(value: &str, algorithm: HashAlgorithm) -> bool {
    value.len() == algorithm.hex_len() && value.chars().all(|c| c.is_ascii_hexdigit())
}
