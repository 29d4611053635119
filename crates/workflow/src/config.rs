//! 워크플로우 설정
//!
//! [`WorkflowConfig`]는 core의 [`ForgeConfig`]를 한 번의 실행에 필요한
//! 해석된 값(경로, 알고리즘, 버전 목록)으로 바꾼 것입니다.
//!
//! # 사용 예시
//!
//! ```
//! use sbomforge_core::types::Action;
//! use sbomforge_workflow::WorkflowConfigBuilder;
//!
//! let config = WorkflowConfigBuilder::new()
//!     .action(Action::Validate)
//!     .build_drop_path("/drop")
//!     .parallelism(4)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.manifest_dir(), std::path::PathBuf::from("/drop/_manifest"));
//! ```

use std::path::{Component, Path, PathBuf};

use sbomforge_core::config::{ForgeConfig, MAX_PARALLELISM};
use sbomforge_core::types::{Action, HashAlgorithm, ManifestVersion};
use sbomforge_spdx::{BuildMetadataProvider, manifest_file_path};

use crate::conformance::Conformance;
use crate::error::WorkflowError;

/// 기본 매니페스트 디렉토리 이름 (`<build_drop>/_manifest`)
pub const DEFAULT_MANIFEST_DIR_NAME: &str = "_manifest";

/// 경로 길이 제한
const MAX_PATH_LEN: usize = 4096;

/// 집계 소스 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSource {
    pub build_drop_path: PathBuf,
    /// 비어 있으면 `<build_drop>/_manifest`
    pub manifest_dir_path: Option<PathBuf>,
    pub manifest_version: ManifestVersion,
}

impl AggregateSource {
    pub fn manifest_dir(&self) -> PathBuf {
        resolve_manifest_dir(&self.build_drop_path, self.manifest_dir_path.as_deref())
    }
}

/// 한 번의 워크플로우 실행 설정
///
/// # 필드
///
/// - **action**: 실행할 워크플로우
/// - **build_drop_path**: 빌드 산출물 루트
/// - **manifest_dir_path**: 사용자 지정 매니페스트 디렉토리 (`None`이면 기본 경로)
/// - **parallelism**: 해시/조정 병렬 레인 수
/// - **hash_algorithm**: 검증 비교 알고리즘
/// - **ignore_missing**: 누락 파일을 최종 실패에서 제외
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub action: Action,
    pub build_drop_path: PathBuf,
    pub manifest_dir_path: Option<PathBuf>,
    pub build_list_file: Option<PathBuf>,
    pub external_document_list_file: Option<PathBuf>,
    pub parallelism: usize,
    pub follow_symlinks: bool,
    pub root_path_filter: Vec<String>,

    // --- generate ---
    pub manifest_versions: Vec<ManifestVersion>,
    pub package_name: String,
    pub package_version: String,
    /// 공급자 조직 이름 (`Organization:` 접두어 없음)
    pub package_supplier: String,
    pub namespace_base_uri: String,
    pub delete_manifest_dir_if_present: bool,
    pub fail_if_no_packages: bool,
    pub scan_components: bool,

    // --- validate ---
    pub hash_algorithm: HashAlgorithm,
    pub ignore_missing: bool,
    pub validate_version: ManifestVersion,
    pub report_path: Option<PathBuf>,
    pub conformance: Conformance,
    pub verify_signature: bool,

    // --- aggregate ---
    pub aggregate_sources: Vec<AggregateSource>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            action: Action::Generate,
            build_drop_path: PathBuf::from("."),
            manifest_dir_path: None,
            build_list_file: None,
            external_document_list_file: None,
            parallelism: 8,
            follow_symlinks: true,
            root_path_filter: Vec::new(),
            manifest_versions: vec![ManifestVersion::Spdx22],
            package_name: "unnamed-package".to_owned(),
            package_version: "0.0.0".to_owned(),
            package_supplier: "unknown".to_owned(),
            namespace_base_uri: "https://sbomforge.local/spdxdocs".to_owned(),
            delete_manifest_dir_if_present: true,
            fail_if_no_packages: false,
            scan_components: true,
            hash_algorithm: HashAlgorithm::Sha256,
            ignore_missing: false,
            validate_version: ManifestVersion::Spdx22,
            report_path: None,
            conformance: Conformance::None,
            verify_signature: true,
            aggregate_sources: Vec::new(),
        }
    }
}

impl WorkflowConfig {
    /// core의 `ForgeConfig`에서 실행 설정을 생성합니다.
    ///
    /// 해석할 수 없는 문자열 값은 기본값으로 대체됩니다. core 설정은
    /// 로드 시점에 이미 검증되어 있습니다.
    pub fn from_core(core: &ForgeConfig, action: Action) -> Self {
        let defaults = Self::default();

        let manifest_versions: Vec<ManifestVersion> = core
            .generate
            .manifest_versions
            .iter()
            .filter_map(|v| ManifestVersion::from_str_loose(v))
            .collect();

        let aggregate_sources = core
            .aggregate
            .sources
            .iter()
            .map(|source| AggregateSource {
                build_drop_path: PathBuf::from(&source.build_drop_path),
                manifest_dir_path: non_empty_path(&source.manifest_dir_path),
                manifest_version: ManifestVersion::from_str_loose(&source.manifest_version)
                    .unwrap_or(ManifestVersion::Spdx22),
            })
            .collect();

        Self {
            action,
            build_drop_path: PathBuf::from(&core.scan.build_drop_path),
            manifest_dir_path: non_empty_path(&core.scan.manifest_dir_path),
            build_list_file: non_empty_path(&core.scan.build_list_file),
            external_document_list_file: non_empty_path(&core.scan.external_document_list_file),
            parallelism: core.scan.parallelism,
            follow_symlinks: core.scan.follow_symlinks,
            root_path_filter: core.scan.root_path_filter.clone(),
            manifest_versions: if manifest_versions.is_empty() {
                defaults.manifest_versions
            } else {
                manifest_versions
            },
            package_name: core.generate.package_name.clone(),
            package_version: core.generate.package_version.clone(),
            package_supplier: strip_supplier_prefix(&core.generate.package_supplier),
            namespace_base_uri: core.generate.namespace_base_uri.clone(),
            delete_manifest_dir_if_present: core.generate.delete_manifest_dir_if_present,
            fail_if_no_packages: core.generate.fail_if_no_packages,
            scan_components: core.generate.scan_components,
            hash_algorithm: HashAlgorithm::from_str_loose(&core.validate.hash_algorithm)
                .unwrap_or(defaults.hash_algorithm),
            ignore_missing: core.validate.ignore_missing,
            validate_version: ManifestVersion::from_str_loose(&core.validate.manifest_version)
                .unwrap_or(defaults.validate_version),
            report_path: non_empty_path(&core.validate.output_path),
            conformance: Conformance::from_str_loose(&core.validate.conformance)
                .unwrap_or_default(),
            verify_signature: core.validate.verify_signature,
            aggregate_sources,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `parallelism`: 1-64
    /// - `build_drop_path`: 비어있으면 안 됨, 4096자 이하
    /// - `root_path_filter`: 상대 접두어, `..` 금지
    /// - `manifest_versions`: 하나 이상
    /// - `package_name`, `package_version`: 생성 시 비어있으면 안 됨
    /// - `aggregate_sources`: 집계 시 하나 이상
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.parallelism == 0 || self.parallelism > MAX_PARALLELISM {
            return Err(config_error(
                "parallelism",
                format!("must be 1-{MAX_PARALLELISM}"),
            ));
        }

        check_path("build_drop_path", &self.build_drop_path)?;
        for (field, path) in [
            ("manifest_dir_path", &self.manifest_dir_path),
            ("build_list_file", &self.build_list_file),
            ("external_document_list_file", &self.external_document_list_file),
            ("report_path", &self.report_path),
        ] {
            if let Some(path) = path {
                check_path(field, path)?;
            }
        }

        for prefix in &self.root_path_filter {
            // Path traversal 체크: 필터 접두어는 빌드 루트 밖을 가리킬 수 없음
            if Path::new(prefix)
                .components()
                .any(|c| c == Component::ParentDir)
            {
                return Err(config_error(
                    "root_path_filter",
                    format!("prefix '{prefix}' contains path traversal pattern '..'"),
                ));
            }
        }

        if self.manifest_versions.is_empty() {
            return Err(config_error(
                "manifest_versions",
                "at least one manifest version required".to_owned(),
            ));
        }

        if self.action != Action::Validate {
            if self.package_name.trim().is_empty() {
                return Err(config_error(
                    "package_name",
                    "must not be empty".to_owned(),
                ));
            }
            if self.package_version.trim().is_empty() {
                return Err(config_error(
                    "package_version",
                    "must not be empty".to_owned(),
                ));
            }
        }

        if self.action == Action::Aggregate && self.aggregate_sources.is_empty() {
            return Err(config_error(
                "aggregate_sources",
                "at least one source required for aggregate".to_owned(),
            ));
        }
        for source in &self.aggregate_sources {
            check_path("aggregate_sources.build_drop_path", &source.build_drop_path)?;
        }

        Ok(())
    }

    /// 해석된 매니페스트 디렉토리
    pub fn manifest_dir(&self) -> PathBuf {
        resolve_manifest_dir(&self.build_drop_path, self.manifest_dir_path.as_deref())
    }

    /// 도구 소유의 기본 경로를 쓰는지 여부
    ///
    /// 사용자가 지정한 디렉토리는 절대 삭제하지 않습니다.
    pub fn uses_default_manifest_dir(&self) -> bool {
        self.manifest_dir_path.is_none()
    }

    /// 버전별 매니페스트 파일 경로
    pub fn manifest_file(&self, version: ManifestVersion) -> PathBuf {
        manifest_file_path(&self.manifest_dir(), version)
    }

    /// 빌드 설정 기반 메타데이터 제공자
    pub fn metadata_provider(&self) -> BuildMetadataProvider {
        BuildMetadataProvider::new(
            &self.package_name,
            &self.package_version,
            &self.package_supplier,
            &self.namespace_base_uri,
        )
    }

    /// 집계 소스 하나를 검증하기 위한 설정을 만듭니다.
    pub fn for_source(&self, source: &AggregateSource) -> Self {
        Self {
            action: Action::Validate,
            build_drop_path: source.build_drop_path.clone(),
            manifest_dir_path: source.manifest_dir_path.clone(),
            build_list_file: None,
            external_document_list_file: None,
            root_path_filter: Vec::new(),
            validate_version: source.manifest_version,
            report_path: None,
            ignore_missing: false,
            aggregate_sources: Vec::new(),
            ..self.clone()
        }
    }
}

fn resolve_manifest_dir(build_drop: &Path, user: Option<&Path>) -> PathBuf {
    match user {
        Some(dir) => dir.to_path_buf(),
        None => build_drop.join(DEFAULT_MANIFEST_DIR_NAME),
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// `Organization: Acme` -> `Acme`
fn strip_supplier_prefix(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("Organization:")
        .map_or(trimmed, str::trim)
        .to_owned()
}

fn check_path(field: &str, path: &Path) -> Result<(), WorkflowError> {
    let len = path.as_os_str().len();
    if len == 0 {
        return Err(config_error(field, "path must not be empty".to_owned()));
    }
    if len > MAX_PATH_LEN {
        return Err(config_error(
            field,
            format!("path exceeds maximum length {MAX_PATH_LEN}"),
        ));
    }
    Ok(())
}

fn config_error(field: &str, reason: String) -> WorkflowError {
    WorkflowError::Config {
        field: field.to_owned(),
        reason,
    }
}

/// [`WorkflowConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 설정에서 시작합니다.
    pub fn from_config(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn action(mut self, action: Action) -> Self {
        self.config.action = action;
        self
    }

    pub fn build_drop_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.build_drop_path = path.into();
        self
    }

    /// 사용자 지정 매니페스트 디렉토리를 설정합니다.
    pub fn manifest_dir_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_dir_path = Some(path.into());
        self
    }

    pub fn build_list_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.build_list_file = Some(path.into());
        self
    }

    pub fn external_document_list_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.external_document_list_file = Some(path.into());
        self
    }

    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.config.parallelism = parallelism;
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    pub fn root_path_filter(mut self, prefixes: Vec<String>) -> Self {
        self.config.root_path_filter = prefixes;
        self
    }

    pub fn manifest_versions(mut self, versions: Vec<ManifestVersion>) -> Self {
        self.config.manifest_versions = versions;
        self
    }

    /// 루트 패키지 이름과 버전을 설정합니다.
    pub fn package(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.package_name = name.into();
        self.config.package_version = version.into();
        self
    }

    /// 공급자를 설정합니다. `Organization:` 접두어는 제거됩니다.
    pub fn package_supplier(mut self, supplier: impl AsRef<str>) -> Self {
        self.config.package_supplier = strip_supplier_prefix(supplier.as_ref());
        self
    }

    pub fn namespace_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.config.namespace_base_uri = uri.into();
        self
    }

    pub fn delete_manifest_dir_if_present(mut self, delete: bool) -> Self {
        self.config.delete_manifest_dir_if_present = delete;
        self
    }

    pub fn fail_if_no_packages(mut self, fail: bool) -> Self {
        self.config.fail_if_no_packages = fail;
        self
    }

    pub fn scan_components(mut self, scan: bool) -> Self {
        self.config.scan_components = scan;
        self
    }

    pub fn hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.config.hash_algorithm = algorithm;
        self
    }

    pub fn ignore_missing(mut self, ignore: bool) -> Self {
        self.config.ignore_missing = ignore;
        self
    }

    pub fn validate_version(mut self, version: ManifestVersion) -> Self {
        self.config.validate_version = version;
        self
    }

    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = Some(path.into());
        self
    }

    pub fn conformance(mut self, conformance: Conformance) -> Self {
        self.config.conformance = conformance;
        self
    }

    pub fn verify_signature(mut self, verify: bool) -> Self {
        self.config.verify_signature = verify;
        self
    }

    pub fn aggregate_sources(mut self, sources: Vec<AggregateSource>) -> Self {
        self.config.aggregate_sources = sources;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `WorkflowError::Config` 반환
    pub fn build(self) -> Result<WorkflowConfig, WorkflowError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
