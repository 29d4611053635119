//! 적합성 표준 검사
//!
//! NTIA 최소 요소 기준: 모든 패키지는 이름, 버전, 공급자를 가져야 하고
//! 모든 파일은 SHA256 다이제스트를 가져야 합니다. 위반은
//! `ConformanceStandardError` 항목으로 보고됩니다.

use std::fmt;

use sbomforge_core::types::{
    ErrorKind, FileRecord, FileValidationResult, HashAlgorithm, PackageRecord,
};

/// 적합성 표준
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Conformance {
    /// 검사하지 않음
    #[default]
    None,
    /// NTIA 최소 요소
    Ntia,
}

impl Conformance {
    /// `""`, `"none"`, `"ntia"`를 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Some(Self::None),
            "ntia" => Some(Self::Ntia),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != Self::None
    }

    /// 매니페스트 파일 레코드를 검사합니다.
    pub fn check_files(&self, files: &[FileRecord]) -> Vec<FileValidationResult> {
        if !self.is_enabled() {
            return Vec::new();
        }
        files
            .iter()
            .filter(|file| file.checksum(HashAlgorithm::Sha256).is_none())
            .map(|file| FileValidationResult::new(&file.path, ErrorKind::ConformanceStandardError))
            .collect()
    }

    /// 패키지 레코드를 검사합니다. 결과 경로는 패키지 ID입니다.
    pub fn check_packages(&self, packages: &[PackageRecord]) -> Vec<FileValidationResult> {
        if !self.is_enabled() {
            return Vec::new();
        }
        packages
            .iter()
            .filter(|package| {
                package.name.trim().is_empty()
                    || package.version.trim().is_empty()
                    || package.supplier.as_deref().is_none_or(|s| s.trim().is_empty())
            })
            .map(|package| {
                FileValidationResult::new(&package.id, ErrorKind::ConformanceStandardError)
            })
            .collect()
    }
}

impl fmt::Display for Conformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Ntia => write!(f, "ntia"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomforge_core::types::FileLocation;

    #[test]
    fn parses_known_standards() {
        assert_eq!(Conformance::from_str_loose(""), Some(Conformance::None));
        assert_eq!(Conformance::from_str_loose("NTIA"), Some(Conformance::Ntia));
        assert_eq!(Conformance::from_str_loose("fedramp"), None);
    }

    #[test]
    fn disabled_reports_nothing() {
        let file = FileRecord::new("/a", FileLocation::InManifest);
        assert!(Conformance::None.check_files(&[file]).is_empty());
    }

    #[test]
    fn ntia_requires_sha256_on_files() {
        let ok = FileRecord::new("/a", FileLocation::InManifest)
            .with_checksum(HashAlgorithm::Sha256, "ab");
        let sha1_only = FileRecord::new("/b", FileLocation::InManifest)
            .with_checksum(HashAlgorithm::Sha1, "cd");

        let errors = Conformance::Ntia.check_files(&[ok, sha1_only]);
        assert_eq!(
            errors,
            vec![FileValidationResult::new("/b", ErrorKind::ConformanceStandardError)]
        );
    }

    #[test]
    fn ntia_requires_supplier_on_packages() {
        let complete = PackageRecord {
            id: "SPDXRef-Package-a".to_owned(),
            name: "a".to_owned(),
            version: "1.0".to_owned(),
            supplier: Some("Organization: Acme".to_owned()),
            ..Default::default()
        };
        let anonymous = PackageRecord {
            id: "SPDXRef-Package-b".to_owned(),
            name: "b".to_owned(),
            version: "2.0".to_owned(),
            ..Default::default()
        };

        let errors = Conformance::Ntia.check_packages(&[complete, anonymous]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "SPDXRef-Package-b");
    }
}
