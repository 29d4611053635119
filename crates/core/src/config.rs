//! 설정 관리: sbomforge.toml 파싱 및 런타임 설정
//!
//! [`ForgeConfig`]는 모든 워크플로우의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SBOMFORGE_SCAN_PARALLELISM=16` 형식)
//! 3. 설정 파일 (`sbomforge.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), sbomforge_core::error::SbomError> {
//! use sbomforge_core::config::ForgeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ForgeConfig::load("sbomforge.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ForgeConfig::parse("[scan]\nparallelism = 4")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SbomError};
use crate::types::{HashAlgorithm, ManifestVersion};

/// 병렬 레인 수 상한
pub const MAX_PARALLELISM: usize = 64;

/// 지원하는 적합성 표준
pub const CONFORMANCE_STANDARDS: [&str; 2] = ["", "ntia"];

/// sbomforge 통합 설정
///
/// `sbomforge.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파일 탐색 설정
    #[serde(default)]
    pub scan: ScanConfig,
    /// 생성 설정
    #[serde(default)]
    pub generate: GenerateConfig,
    /// 검증 설정
    #[serde(default)]
    pub validate: ValidateConfig,
    /// 집계 설정
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

impl ForgeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SbomError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SbomError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SbomError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SbomError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SbomError> {
        toml::from_str(toml_str).map_err(|e| {
            SbomError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SBOMFORGE_{SECTION}_{FIELD}`
    /// 예: `SBOMFORGE_VALIDATE_IGNORE_MISSING=true`
    ///
    /// `[aggregate]`의 소스 목록은 파일에서만 설정합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SBOMFORGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SBOMFORGE_GENERAL_LOG_FORMAT");

        // Scan
        override_string(
            &mut self.scan.build_drop_path,
            "SBOMFORGE_SCAN_BUILD_DROP_PATH",
        );
        override_string(
            &mut self.scan.manifest_dir_path,
            "SBOMFORGE_SCAN_MANIFEST_DIR_PATH",
        );
        override_string(
            &mut self.scan.build_list_file,
            "SBOMFORGE_SCAN_BUILD_LIST_FILE",
        );
        override_string(
            &mut self.scan.external_document_list_file,
            "SBOMFORGE_SCAN_EXTERNAL_DOCUMENT_LIST_FILE",
        );
        override_usize(&mut self.scan.parallelism, "SBOMFORGE_SCAN_PARALLELISM");
        override_bool(
            &mut self.scan.follow_symlinks,
            "SBOMFORGE_SCAN_FOLLOW_SYMLINKS",
        );
        override_csv(
            &mut self.scan.root_path_filter,
            "SBOMFORGE_SCAN_ROOT_PATH_FILTER",
        );

        // Generate
        override_csv(
            &mut self.generate.manifest_versions,
            "SBOMFORGE_GENERATE_MANIFEST_VERSIONS",
        );
        override_string(
            &mut self.generate.package_name,
            "SBOMFORGE_GENERATE_PACKAGE_NAME",
        );
        override_string(
            &mut self.generate.package_version,
            "SBOMFORGE_GENERATE_PACKAGE_VERSION",
        );
        override_string(
            &mut self.generate.package_supplier,
            "SBOMFORGE_GENERATE_PACKAGE_SUPPLIER",
        );
        override_string(
            &mut self.generate.namespace_base_uri,
            "SBOMFORGE_GENERATE_NAMESPACE_BASE_URI",
        );
        override_bool(
            &mut self.generate.delete_manifest_dir_if_present,
            "SBOMFORGE_GENERATE_DELETE_MANIFEST_DIR_IF_PRESENT",
        );
        override_bool(
            &mut self.generate.fail_if_no_packages,
            "SBOMFORGE_GENERATE_FAIL_IF_NO_PACKAGES",
        );
        override_bool(
            &mut self.generate.scan_components,
            "SBOMFORGE_GENERATE_SCAN_COMPONENTS",
        );

        // Validate
        override_string(
            &mut self.validate.hash_algorithm,
            "SBOMFORGE_VALIDATE_HASH_ALGORITHM",
        );
        override_bool(
            &mut self.validate.ignore_missing,
            "SBOMFORGE_VALIDATE_IGNORE_MISSING",
        );
        override_string(
            &mut self.validate.manifest_version,
            "SBOMFORGE_VALIDATE_MANIFEST_VERSION",
        );
        override_string(
            &mut self.validate.output_path,
            "SBOMFORGE_VALIDATE_OUTPUT_PATH",
        );
        override_string(
            &mut self.validate.conformance,
            "SBOMFORGE_VALIDATE_CONFORMANCE",
        );
        override_bool(
            &mut self.validate.verify_signature,
            "SBOMFORGE_VALIDATE_VERIFY_SIGNATURE",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SbomError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.scan.parallelism == 0 || self.scan.parallelism > MAX_PARALLELISM {
            return Err(invalid(
                "scan.parallelism",
                format!("must be 1-{MAX_PARALLELISM}"),
            ));
        }

        if self.generate.manifest_versions.is_empty() {
            return Err(invalid(
                "generate.manifest_versions",
                "at least one manifest version required".to_owned(),
            ));
        }
        for version in &self.generate.manifest_versions {
            if ManifestVersion::from_str_loose(version).is_none() {
                return Err(invalid(
                    "generate.manifest_versions",
                    format!("unsupported version '{version}' (expected: 2.2, 3.0)"),
                ));
            }
        }

        if HashAlgorithm::from_str_loose(&self.validate.hash_algorithm).is_none() {
            return Err(invalid(
                "validate.hash_algorithm",
                "must be one of: SHA1, SHA256, SHA512".to_owned(),
            ));
        }

        if ManifestVersion::from_str_loose(&self.validate.manifest_version).is_none() {
            return Err(invalid(
                "validate.manifest_version",
                "must be one of: 2.2, 3.0".to_owned(),
            ));
        }

        if !CONFORMANCE_STANDARDS.contains(&self.validate.conformance.as_str()) {
            return Err(invalid(
                "validate.conformance",
                "must be empty or 'ntia'".to_owned(),
            ));
        }

        for (index, source) in self.aggregate.sources.iter().enumerate() {
            if source.build_drop_path.is_empty() {
                return Err(invalid(
                    &format!("aggregate.sources[{index}].build_drop_path"),
                    "must not be empty".to_owned(),
                ));
            }
            if ManifestVersion::from_str_loose(&source.manifest_version).is_none() {
                return Err(invalid(
                    &format!("aggregate.sources[{index}].manifest_version"),
                    "must be one of: 2.2, 3.0".to_owned(),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> SbomError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 파일 탐색 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 빌드 산출물 루트
    pub build_drop_path: String,
    /// 매니페스트 디렉토리 (비어있으면 `<build_drop>/_manifest`)
    pub manifest_dir_path: String,
    /// 탐색 대신 사용할 파일 목록 (한 줄에 하나)
    pub build_list_file: String,
    /// 외부 SBOM 문서 목록 (한 줄에 하나)
    pub external_document_list_file: String,
    /// 병렬 레인 수
    pub parallelism: usize,
    /// 심볼릭 링크 추적 여부
    pub follow_symlinks: bool,
    /// 포함할 루트 경로 접두사 (비어있으면 필터링 없음)
    pub root_path_filter: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            build_drop_path: ".".to_owned(),
            manifest_dir_path: String::new(),
            build_list_file: String::new(),
            external_document_list_file: String::new(),
            parallelism: 8,
            follow_symlinks: true,
            root_path_filter: Vec::new(),
        }
    }
}

/// 생성 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// 생성할 매니페스트 버전 목록 (2.2, 3.0)
    pub manifest_versions: Vec<String>,
    /// 루트 패키지 이름
    pub package_name: String,
    /// 루트 패키지 버전
    pub package_version: String,
    /// 루트 패키지 공급자
    pub package_supplier: String,
    /// 문서 네임스페이스 기본 URI
    pub namespace_base_uri: String,
    /// 기본 매니페스트 디렉토리가 있으면 삭제 후 재생성
    pub delete_manifest_dir_if_present: bool,
    /// 패키지가 하나도 없으면 실패
    pub fail_if_no_packages: bool,
    /// lockfile 컴포넌트 스캔 실행 여부
    pub scan_components: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            manifest_versions: vec!["2.2".to_owned()],
            package_name: "unnamed-package".to_owned(),
            package_version: "0.0.0".to_owned(),
            package_supplier: "Organization: unknown".to_owned(),
            namespace_base_uri: "https://sbomforge.local/spdxdocs".to_owned(),
            delete_manifest_dir_if_present: true,
            fail_if_no_packages: false,
            scan_components: true,
        }
    }
}

/// 검증 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// 비교에 사용할 해시 알고리즘 (SHA1, SHA256, SHA512)
    pub hash_algorithm: String,
    /// 누락 파일을 최종 실패 목록에서 제외
    pub ignore_missing: bool,
    /// 검증할 매니페스트 버전
    pub manifest_version: String,
    /// JSON 리포트 출력 경로 (비어있으면 파일로 쓰지 않음)
    pub output_path: String,
    /// 적합성 표준 ("" 또는 "ntia")
    pub conformance: String,
    /// `.sha256` 사이드카로 매니페스트 서명 검증
    pub verify_signature: bool,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: "SHA256".to_owned(),
            ignore_missing: false,
            manifest_version: "2.2".to_owned(),
            output_path: String::new(),
            conformance: String::new(),
            verify_signature: true,
        }
    }
}

/// 집계 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// 집계 대상 소스 목록
    pub sources: Vec<AggregateSourceConfig>,
}

/// 집계 소스 하나
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSourceConfig {
    /// 소스 빌드 산출물 루트
    pub build_drop_path: String,
    /// 소스 매니페스트 디렉토리 (비어있으면 `<build_drop>/_manifest`)
    pub manifest_dir_path: String,
    /// 소스 매니페스트 버전
    pub manifest_version: String,
}

impl Default for AggregateSourceConfig {
    fn default() -> Self {
        Self {
            build_drop_path: String::new(),
            manifest_dir_path: String::new(),
            manifest_version: "2.2".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
