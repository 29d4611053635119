//! 도메인 타입: 파이프라인 전역에서 사용되는 공통 레코드
//!
//! 파일/패키지/관계 레코드와 닫힌 에러 종류 분류를 정의합니다.
//! 파일 경로는 매니페스트 기준 상대 경로(`/bin/app.dll` 형식)로 표현하며,
//! 조정(reconciliation) 키는 대소문자를 구분하지 않습니다.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// 해시 알고리즘
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-1 (SPDX 2.2 필수)
    #[serde(rename = "SHA1")]
    Sha1,
    /// SHA-256
    #[serde(rename = "SHA256")]
    Sha256,
    /// SHA-512
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// 지원하는 모든 알고리즘
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha1, Self::Sha256, Self::Sha512];

    /// SPDX 2.x 표기 (`SHA256`)
    pub fn spdx_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
        }
    }

    /// SPDX 3.0 표기 (`sha256`)
    pub fn spdx3_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// 16진 다이제스트 길이
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    /// 문자열에서 알고리즘을 파싱합니다 (대소문자, `-`/`_` 무시).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "SHA1" => Some(Self::Sha1),
            "SHA256" => Some(Self::Sha256),
            "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spdx_name())
    }
}

/// 알고리즘별 16진 다이제스트
pub type Checksums = BTreeMap<HashAlgorithm, String>;

/// 파일 레코드가 관측된 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileLocation {
    /// 디스크 탐색에서 관측됨
    OnDisk,
    /// 매니페스트에 선언됨
    InManifest,
    /// 양쪽 모두 (조정 완료)
    Both,
}

/// 파일 유형 플래그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FileType {
    /// 다른 SPDX 문서 (`*.spdx.json`)
    Spdx,
}

/// 파일 레코드
///
/// Hash 단계 또는 매니페스트 파싱에서 생성됩니다.
/// 조정 단계 외에는 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// 매니페스트 기준 경로 (`/dir/file.txt`)
    pub path: String,
    /// 알고리즘별 다이제스트
    pub checksums: Checksums,
    /// 파일 유형 플래그
    pub file_types: BTreeSet<FileType>,
    /// 관측 위치
    pub location: FileLocation,
}

impl FileRecord {
    /// 체크섬 없는 레코드를 생성합니다.
    pub fn new(path: impl Into<String>, location: FileLocation) -> Self {
        Self {
            path: path.into(),
            checksums: Checksums::new(),
            file_types: BTreeSet::new(),
            location,
        }
    }

    /// 체크섬을 추가합니다. 다이제스트는 소문자로 저장됩니다.
    pub fn with_checksum(mut self, algorithm: HashAlgorithm, value: impl Into<String>) -> Self {
        self.checksums
            .insert(algorithm, value.into().to_ascii_lowercase());
        self
    }

    /// 특정 알고리즘의 다이제스트를 반환합니다.
    pub fn checksum(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.checksums.get(&algorithm).map(String::as_str)
    }

    /// 조정 키 (대소문자 무시)
    pub fn key(&self) -> String {
        path_key(&self.path)
    }

    /// SPDX `fileName` 표기 (`./dir/file.txt`)
    pub fn spdx_file_name(&self) -> String {
        format!(".{}", self.path)
    }
}

/// 대소문자와 구분자를 정규화한 조정 키를 만듭니다.
pub fn path_key(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// 루트 기준 절대 경로를 매니페스트 경로(`/a/b.txt`)로 변환합니다.
///
/// `full`이 `root` 아래에 있지 않으면 `None`을 반환합니다.
pub fn manifest_path(root: &Path, full: &Path) -> Option<String> {
    let relative = full.strip_prefix(root).ok()?;
    let mut out = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                out.push('/');
                out.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

/// SPDX `fileName` 값에서 매니페스트 경로를 복원합니다.
pub fn manifest_path_from_spdx(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    if let Some(rest) = normalized.strip_prefix("./") {
        format!("/{rest}")
    } else if normalized.starts_with('/') {
        normalized
    } else {
        format!("/{normalized}")
    }
}

/// 패키지 라이선스 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    /// 결론 라이선스
    pub concluded: Option<String>,
    /// 선언 라이선스
    pub declared: Option<String>,
}

/// 패키지 레코드
///
/// 컴포넌트 스캐너의 원시 출력을 변환해 생성되며,
/// 패키지 문서 생성과 집계 병합에서 사용됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// 문서 내 고유 ID (`SPDXRef-Package-...`)
    pub id: String,
    /// 패키지 이름
    pub name: String,
    /// 패키지 버전
    pub version: String,
    /// 알고리즘별 다이제스트
    pub checksums: Checksums,
    /// 라이선스 정보
    pub license: LicenseInfo,
    /// 공급자 (`Organization: ...`)
    pub supplier: Option<String>,
    /// 의존하는 패키지 ID 목록
    pub depends_on: Vec<String>,
    /// Package URL
    pub purl: Option<String>,
}

/// 관계 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationshipType {
    Describes,
    Contains,
    DependsOn,
    DescendantOf,
    Other,
}

impl RelationshipType {
    /// SPDX 2.2 표기 (`DEPENDS_ON`)
    pub fn spdx22_name(&self) -> &'static str {
        match self {
            Self::Describes => "DESCRIBES",
            Self::Contains => "CONTAINS",
            Self::DependsOn => "DEPENDS_ON",
            Self::DescendantOf => "DESCENDANT_OF",
            Self::Other => "OTHER",
        }
    }

    /// SPDX 3.0 표기 (`dependsOn`)
    pub fn spdx3_name(&self) -> &'static str {
        match self {
            Self::Describes => "describes",
            Self::Contains => "contains",
            Self::DependsOn => "dependsOn",
            Self::DescendantOf => "descendantOf",
            Self::Other => "other",
        }
    }

    /// 두 버전의 표기를 모두 받아 파싱합니다. 알 수 없는 값은 `Other`.
    pub fn from_spdx_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "describes" => Self::Describes,
            "contains" => Self::Contains,
            "dependson" => Self::DependsOn,
            "descendantof" => Self::DescendantOf,
            _ => Self::Other,
        }
    }
}

/// 관계 레코드
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: RelationshipType,
}

impl RelationshipRecord {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type,
        }
    }
}

/// 외부 SBOM 문서 참조
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalDocumentReference {
    /// 참조 ID (`DocumentRef-...`)
    pub id: String,
    /// 참조 문서 이름
    pub document_name: String,
    /// 참조 문서 네임스페이스
    pub document_namespace: String,
    /// 참조 문서 파일의 SHA-1
    pub sha1: String,
    /// 참조 문서가 기술하는 루트 요소 ID
    pub described_element_id: String,
}

/// 파일 단위 에러 종류 (닫힌 분류)
///
/// `InvalidInputFile`을 제외한 모든 종류는 복구 가능하며 누적됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingFile,
    AdditionalFile,
    InvalidHash,
    FilteredRootPath,
    ManifestFolder,
    ReferencedSbomFile,
    PackageError,
    JsonSerializationError,
    UnsupportedHashAlgorithm,
    NoPackagesFound,
    ConformanceStandardError,
    Other,
    InvalidInputFile,
}

impl ErrorKind {
    /// 모든 에러 종류
    pub const ALL: [ErrorKind; 13] = [
        Self::MissingFile,
        Self::AdditionalFile,
        Self::InvalidHash,
        Self::FilteredRootPath,
        Self::ManifestFolder,
        Self::ReferencedSbomFile,
        Self::PackageError,
        Self::JsonSerializationError,
        Self::UnsupportedHashAlgorithm,
        Self::NoPackagesFound,
        Self::ConformanceStandardError,
        Self::Other,
        Self::InvalidInputFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFile => "MissingFile",
            Self::AdditionalFile => "AdditionalFile",
            Self::InvalidHash => "InvalidHash",
            Self::FilteredRootPath => "FilteredRootPath",
            Self::ManifestFolder => "ManifestFolder",
            Self::ReferencedSbomFile => "ReferencedSbomFile",
            Self::PackageError => "PackageError",
            Self::JsonSerializationError => "JsonSerializationError",
            Self::UnsupportedHashAlgorithm => "UnsupportedHashAlgorithm",
            Self::NoPackagesFound => "NoPackagesFound",
            Self::ConformanceStandardError => "ConformanceStandardError",
            Self::Other => "Other",
            Self::InvalidInputFile => "InvalidInputFile",
        }
    }

    /// 워크플로우를 즉시 중단시키는 종류인지 여부
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidInputFile)
    }

    /// 필터링 결과로, 실패 판정에 포함되지 않는 종류인지 여부
    pub fn is_filter_exclusion(&self) -> bool {
        matches!(
            self,
            Self::FilteredRootPath | Self::ManifestFolder | Self::ReferencedSbomFile
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파일 단위 검증 결과 (에러 레코드)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileValidationResult {
    /// 대상 경로 (파일 경로 또는 패키지 ID)
    pub path: String,
    /// 에러 종류
    pub kind: ErrorKind,
}

impl FileValidationResult {
    pub fn new(path: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for FileValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.path)
    }
}

/// 매니페스트 스키마 버전
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManifestVersion {
    /// SPDX 2.2 (카테고리별 배열)
    #[serde(rename = "2.2")]
    Spdx22,
    /// SPDX 3.0 (평면 `@graph`)
    #[serde(rename = "3.0")]
    Spdx30,
}

impl ManifestVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spdx22 => "2.2",
            Self::Spdx30 => "3.0",
        }
    }

    /// 출력 디렉토리 이름 (`spdx_2.2`)
    pub fn dir_name(&self) -> String {
        format!("spdx_{}", self.as_str())
    }

    /// `2.2`, `SPDX-2.2`, `spdx:3.0` 같은 표기를 파싱합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        let version = lower
            .strip_prefix("spdx")
            .map(|rest| rest.trim_start_matches([':', '-', '_', ' ']))
            .unwrap_or(lower.as_str());
        if version == "2.2" {
            Some(Self::Spdx22)
        } else if version == "3.0" || version.starts_with("3.0.") {
            Some(Self::Spdx30)
        } else {
            None
        }
    }
}

impl fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SPDX {}", self.as_str())
    }
}

/// 워크플로우 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Generate,
    Validate,
    Aggregate,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Validate => write!(f, "validate"),
            Self::Aggregate => write!(f, "aggregate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn hash_algorithm_from_str_loose() {
        assert_eq!(HashAlgorithm::from_str_loose("sha256"), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_str_loose("SHA-1"), Some(HashAlgorithm::Sha1));
        assert_eq!(HashAlgorithm::from_str_loose("sha_512"), Some(HashAlgorithm::Sha512));
        assert_eq!(HashAlgorithm::from_str_loose("md5"), None);
    }

    #[test]
    fn hash_algorithm_serializes_as_spdx_name() {
        let json = serde_json::to_string(&HashAlgorithm::Sha256).unwrap();
        assert_eq!(json, "\"SHA256\"");
    }

    #[test]
    fn checksum_is_stored_lowercase() {
        let record =
            FileRecord::new("/a.txt", FileLocation::OnDisk).with_checksum(HashAlgorithm::Sha1, "ABCDEF");
        assert_eq!(record.checksum(HashAlgorithm::Sha1), Some("abcdef"));
        assert_eq!(record.checksum(HashAlgorithm::Sha256), None);
    }

    #[test]
    fn path_key_is_case_insensitive() {
        assert_eq!(path_key("/Bin/App.DLL"), path_key("/bin/app.dll"));
        assert_eq!(path_key("\\bin\\a.txt"), "/bin/a.txt");
    }

    #[test]
    fn manifest_path_relative_to_root() {
        let root = PathBuf::from("/drop");
        let full = PathBuf::from("/drop/bin/a.txt");
        assert_eq!(manifest_path(&root, &full).as_deref(), Some("/bin/a.txt"));
        assert_eq!(manifest_path(&root, &PathBuf::from("/other/a.txt")), None);
        assert_eq!(manifest_path(&root, &root), None);
    }

    #[test]
    fn spdx_file_name_roundtrip() {
        let record = FileRecord::new("/bin/a.txt", FileLocation::OnDisk);
        assert_eq!(record.spdx_file_name(), "./bin/a.txt");
        assert_eq!(manifest_path_from_spdx("./bin/a.txt"), "/bin/a.txt");
        assert_eq!(manifest_path_from_spdx("bin/a.txt"), "/bin/a.txt");
        assert_eq!(manifest_path_from_spdx(".\\bin\\a.txt"), "/bin/a.txt");
    }

    #[test]
    fn relationship_type_parses_both_versions() {
        assert_eq!(RelationshipType::from_spdx_name("DEPENDS_ON"), RelationshipType::DependsOn);
        assert_eq!(RelationshipType::from_spdx_name("dependsOn"), RelationshipType::DependsOn);
        assert_eq!(RelationshipType::from_spdx_name("DESCENDANT_OF"), RelationshipType::DescendantOf);
        assert_eq!(RelationshipType::from_spdx_name("GENERATED_FROM"), RelationshipType::Other);
    }

    #[test]
    fn only_invalid_input_is_fatal() {
        let fatal: Vec<_> = ErrorKind::ALL.iter().filter(|k| k.is_fatal()).collect();
        assert_eq!(fatal, vec![&ErrorKind::InvalidInputFile]);
    }

    #[test]
    fn filter_exclusions() {
        assert!(ErrorKind::FilteredRootPath.is_filter_exclusion());
        assert!(ErrorKind::ManifestFolder.is_filter_exclusion());
        assert!(ErrorKind::ReferencedSbomFile.is_filter_exclusion());
        assert!(!ErrorKind::MissingFile.is_filter_exclusion());
        assert!(!ErrorKind::InvalidHash.is_filter_exclusion());
    }

    #[test]
    fn manifest_version_from_str_loose() {
        assert_eq!(ManifestVersion::from_str_loose("2.2"), Some(ManifestVersion::Spdx22));
        assert_eq!(ManifestVersion::from_str_loose("SPDX-2.2"), Some(ManifestVersion::Spdx22));
        assert_eq!(ManifestVersion::from_str_loose("spdx:3.0"), Some(ManifestVersion::Spdx30));
        assert_eq!(ManifestVersion::from_str_loose("3.0.1"), Some(ManifestVersion::Spdx30));
        assert_eq!(ManifestVersion::from_str_loose("2.3"), None);
        assert_eq!(ManifestVersion::Spdx22.dir_name(), "spdx_2.2");
    }

    #[test]
    fn validation_result_display() {
        let result = FileValidationResult::new("/c.txt", ErrorKind::MissingFile);
        assert_eq!(result.to_string(), "MissingFile: /c.txt");
    }
}
