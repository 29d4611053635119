//! Generate 워크플로우
//!
//! 출력 디렉토리를 준비하고, 빌드 드롭을 걷거나 파일 목록을 읽어
//! 필터 -> 해시 단계를 거친 파일 레코드와 컴포넌트 스캔 결과로
//! 설정된 스키마 버전마다 매니페스트를 씁니다.
//!
//! # 흐름
//!
//! ```text
//! walk | list --> FilterChain --> FileHasher --> files ─┐
//! ComponentScanner (spawn_blocking) --> PackageConverter ┼──> ManifestGenerator (2.2 | 3.0)
//! SBOM list --> external document references ───────────┘            |
//!                                                      success: .sha256 사이드카
//!                                                      failure: 도구 소유 출력 삭제
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use sbomforge_core::metrics as m;
use sbomforge_core::telemetry::{RunRecorder, RunSummary};
use sbomforge_core::types::{
    Action, ErrorKind, ExternalDocumentReference, FileRecord, FileValidationResult,
    ManifestVersion, PackageRecord,
};
use sbomforge_pipeline::{
    DirectoryWalker, FileHasher, FileListReader, FilterChain, ManifestFolderFilter,
    ReferencedSbomFilter, RootPathFilter, merge,
};
use sbomforge_spdx::{
    DocumentContent, ManifestGenerator, MetadataProvider, SbomConfig, required_algorithms,
    root_package,
};

use crate::config::WorkflowConfig;
use crate::converter::PackageConverter;
use crate::error::WorkflowError;
use crate::output::{OutputDirectory, write_sidecar};
use crate::references::{ExternalReferences, collect_external_references};
use crate::scanner::{ComponentScanner, LockfileComponentScanner};

/// 생성된 매니페스트 하나
#[derive(Debug, Clone)]
pub struct GeneratedManifest {
    pub version: ManifestVersion,
    pub path: PathBuf,
    /// 성공한 실행에서만 기록됩니다.
    pub sidecar: Option<PathBuf>,
    pub elements_written: usize,
}

/// 문서에 들어갈 수집 결과
///
/// 집계 워크플로우는 파일 탐색 없이 이 값을 직접 채워 넘깁니다.
#[derive(Debug, Default)]
pub struct GenerateInput {
    pub files: Vec<FileRecord>,
    pub packages: Vec<PackageRecord>,
    pub external_refs: Vec<ExternalDocumentReference>,
    /// 루트 패키지의 명시적 의존 대상 (집계 소스 루트)
    pub root_depends_on: Vec<String>,
    /// 수집 단계에서 누적된 항목 단위 에러 (제외 종류 포함)
    pub errors: Vec<FileValidationResult>,
}

/// Generate 실행 결과
#[derive(Debug)]
pub struct GenerateOutcome {
    pub success: bool,
    pub manifests: Vec<GeneratedManifest>,
    /// 실패로 판정된 항목
    pub errors: Vec<FileValidationResult>,
    /// 필터로 제외된 항목
    pub skipped: Vec<FileValidationResult>,
    pub files: usize,
    pub packages: usize,
    pub summary: RunSummary,
}

/// Generate 워크플로우
pub struct GenerateWorkflow {
    config: WorkflowConfig,
    scanner: Arc<dyn ComponentScanner>,
    metadata: Arc<dyn MetadataProvider>,
}

impl GenerateWorkflow {
    /// 기본 lockfile 스캐너와 설정 기반 메타데이터 제공자를 사용합니다.
    pub fn new(config: WorkflowConfig) -> Self {
        let scanner = LockfileComponentScanner::new().with_excluded_dir(config.manifest_dir());
        let metadata = config.metadata_provider();
        Self {
            config,
            scanner: Arc::new(scanner),
            metadata: Arc::new(metadata),
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<dyn ComponentScanner>) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_metadata_provider(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// 빌드 드롭을 수집해 매니페스트를 생성합니다.
    pub async fn run(&self) -> Result<GenerateOutcome, WorkflowError> {
        let recorder = Arc::new(RunRecorder::new(Action::Generate));
        self.execute(recorder, None).await
    }

    /// 이미 수집된 내용으로 매니페스트를 생성합니다. 파일 탐색을 하지 않습니다.
    pub(crate) async fn run_with_input(
        &self,
        recorder: Arc<RunRecorder>,
        input: GenerateInput,
    ) -> Result<GenerateOutcome, WorkflowError> {
        self.execute(recorder, Some(input)).await
    }

    async fn execute(
        &self,
        recorder: Arc<RunRecorder>,
        input: Option<GenerateInput>,
    ) -> Result<GenerateOutcome, WorkflowError> {
        info!(
            build_drop = %self.config.build_drop_path.display(),
            versions = ?self.config.manifest_versions,
            "starting generate"
        );
        let output = OutputDirectory::prepare(&self.config).await?;

        let result = match input {
            Some(input) => self.emit(&recorder, &output, input).await,
            None => match self.collect(&recorder).await {
                Ok(input) => self.emit(&recorder, &output, input).await,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(outcome) => {
                if !outcome.success {
                    output.cleanup_on_failure().await;
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "generate aborted");
                output.cleanup_on_failure().await;
                recorder.finish(false);
                Err(e)
            }
        }
    }

    /// 파일, 패키지, 외부 참조를 수집합니다.
    async fn collect(&self, recorder: &Arc<RunRecorder>) -> Result<GenerateInput, WorkflowError> {
        let root = self.config.build_drop_path.clone();

        let references = match &self.config.external_document_list_file {
            Some(list) => collect_external_references(list, &root).await?,
            None => ExternalReferences::default(),
        };

        // 파일 해시와 동시에 컴포넌트 스캔을 진행
        let scan = self.config.scan_components.then(|| {
            let scanner = Arc::clone(&self.scanner);
            let root = root.clone();
            tokio::task::spawn_blocking(move || scanner.scan(&root))
        });

        let discovered = match &self.config.build_list_file {
            Some(list) => FileListReader::read(list, &root).await?,
            None => DirectoryWalker::new(self.config.follow_symlinks).walk(&root)?,
        };
        let filtered = FilterChain::new(&root)
            .with_filter(ManifestFolderFilter::new(self.config.manifest_dir()))
            .with_filter(RootPathFilter::new(&root, &self.config.root_path_filter))
            .with_filter(ReferencedSbomFilter::new(&root, &references.paths))
            .apply(discovered.items);
        let algorithms = required_algorithms(&self.config.manifest_versions);
        let hashed = FileHasher::new(&root, &algorithms)
            .with_parallelism(self.config.parallelism)
            .run(filtered.items);

        let error_stream = merge(vec![discovered.errors, filtered.errors, hashed.errors]);
        let (mut files, mut errors) = tokio::join!(hashed.items.collect(), error_stream.collect());
        files.sort_by(|a, b| a.path.cmp(&b.path));
        errors.extend(references.errors);
        debug!(files = files.len(), errors = errors.len(), "build drop collected");

        let mut packages = Vec::new();
        if let Some(scan) = scan {
            let scan = scan.await.map_err(WorkflowError::join)??;
            if !scan.failed_sources.is_empty() {
                recorder.add_property(
                    "component_scan.failed_sources",
                    scan.failed_sources.len().to_string(),
                );
            }
            recorder.add_property("component_scan.scanner", self.scanner.name());

            let conversion = PackageConverter::new().convert(scan.packages);
            errors.extend(conversion.errors);
            packages = conversion.packages;
        }

        if packages.is_empty() && self.config.fail_if_no_packages {
            warn!(build_drop = %root.display(), "no packages found");
            errors.push(FileValidationResult::new(
                root.display().to_string(),
                ErrorKind::NoPackagesFound,
            ));
        }

        Ok(GenerateInput {
            files,
            packages,
            external_refs: references.references,
            root_depends_on: Vec::new(),
            errors,
        })
    }

    /// 버전마다 매니페스트를 쓰고 실행을 마무리합니다.
    async fn emit(
        &self,
        recorder: &Arc<RunRecorder>,
        output: &OutputDirectory,
        input: GenerateInput,
    ) -> Result<GenerateOutcome, WorkflowError> {
        let GenerateInput {
            files,
            packages,
            external_refs,
            root_depends_on,
            errors: collected,
        } = input;
        recorder.record_errors(&collected);

        let mut errors = collected;
        let mut manifests = Vec::with_capacity(self.config.manifest_versions.len());

        for &version in &self.config.manifest_versions {
            let metadata = self.metadata.metadata(version);
            let mut root = root_package(&metadata);
            root.depends_on = root_depends_on.clone();
            let content = DocumentContent::new(
                files.clone(),
                root,
                packages.clone(),
                external_refs.clone(),
            );
            let dir = output.path().to_path_buf();
            let run_recorder = Arc::clone(recorder);

            let result = tokio::task::spawn_blocking(move || {
                let config = SbomConfig::create(version, &dir, metadata, run_recorder)?;
                ManifestGenerator::new(config).generate(&content)
            })
            .await
            .map_err(WorkflowError::join)??;

            info!(
                version = version.as_str(),
                path = %result.path.display(),
                elements = result.elements_written,
                errors = result.errors.len(),
                "manifest written"
            );
            metrics::counter!(
                m::WORKFLOW_MANIFESTS_WRITTEN_TOTAL,
                m::LABEL_VERSION => version.as_str()
            )
            .increment(1);
            errors.extend(result.errors);
            manifests.push(GeneratedManifest {
                version: result.version,
                path: result.path,
                sidecar: None,
                elements_written: result.elements_written,
            });
        }

        let (skipped, failures): (Vec<_>, Vec<_>) = errors
            .into_iter()
            .partition(|e| e.kind.is_filter_exclusion());
        let success = failures.is_empty();

        if success {
            for manifest in &mut manifests {
                manifest.sidecar = Some(write_sidecar(&manifest.path).await?);
            }
        } else {
            warn!(failures = failures.len(), "generate finished with failures");
        }

        let summary = recorder.finish(success);
        Ok(GenerateOutcome {
            success,
            manifests,
            errors: failures,
            skipped,
            files: files.len(),
            packages: packages.len(),
            summary,
        })
    }
}
