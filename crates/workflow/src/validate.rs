//! Validate 워크플로우
//!
//! 기존 매니페스트를 스트리밍 파서로 읽으면서 같은 빌드 드롭을 동시에
//! 걷고 해시해, 두 레코드 스트림을 무결성 엔진에서 조정합니다.
//!
//! ```text
//! signature check ──(fail)──> Err(SignatureInvalid)
//!        |
//! walk | list --> FilterChain --> FileHasher ──────────────┐
//!                                                         merge --> IntegrityValidator --> report
//! manifest --> ManifestParser (spawn_blocking) --> feed ──┘
//! ```
//!
//! 매니페스트 구조 오류(`InvalidInputFile`)는 누적되지 않고 즉시 `Err`입니다.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use sbomforge_core::telemetry::{RunRecorder, RunSummary};
use sbomforge_core::types::{
    Action, ErrorKind, FileRecord, FileValidationResult, PackageRecord,
};
use sbomforge_pipeline::{
    DirectoryWalker, FileHasher, FileListReader, FilterChain, IntegrityValidator,
    ManifestExpectationMap, ManifestFolderFilter, ReferencedSbomFilter, RootPathFilter,
    StreamWriter, channel, merge,
};
use sbomforge_spdx::{ManifestParser, ManifestVisitor};

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::report::{ReportInput, ValidationReport};
use crate::signing::{NoopSignatureValidator, SidecarHashValidator, SignatureValidator};

/// Validate 실행 결과
#[derive(Debug)]
pub struct ValidationOutcome {
    pub success: bool,
    pub report: ValidationReport,
    pub summary: RunSummary,
}

/// Validate 워크플로우
pub struct ValidateWorkflow {
    config: WorkflowConfig,
    signature: Arc<dyn SignatureValidator>,
}

impl ValidateWorkflow {
    /// `verify_signature`이면 사이드카 검증기, 아니면 항상 통과하는 검증기를 씁니다.
    pub fn new(config: WorkflowConfig) -> Self {
        let signature: Arc<dyn SignatureValidator> = if config.verify_signature {
            Arc::new(SidecarHashValidator)
        } else {
            Arc::new(NoopSignatureValidator)
        };
        Self { config, signature }
    }

    pub fn with_signature_validator(mut self, validator: Arc<dyn SignatureValidator>) -> Self {
        self.signature = validator;
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<ValidationOutcome, WorkflowError> {
        let recorder = Arc::new(RunRecorder::new(Action::Validate));
        let result = self.execute(&recorder).await;
        if let Err(e) = &result {
            warn!(error = %e, "validate aborted");
            recorder.finish(false);
        }
        result
    }

    async fn execute(&self, recorder: &Arc<RunRecorder>) -> Result<ValidationOutcome, WorkflowError> {
        let version = self.config.validate_version;
        let algorithm = self.config.hash_algorithm;
        let manifest = self.config.manifest_file(version);
        let root = self.config.build_drop_path.clone();
        info!(
            manifest = %manifest.display(),
            build_drop = %root.display(),
            algorithm = %algorithm,
            "starting validate"
        );

        let signature = self.signature.validate(&manifest).await?;
        for (key, value) in &signature.telemetry {
            recorder.add_property(key.clone(), value.clone());
        }
        if !signature.passed {
            let reason = signature
                .telemetry
                .get("signature.reason")
                .cloned()
                .unwrap_or_else(|| format!("{} rejected the manifest", self.signature.name()));
            return Err(WorkflowError::SignatureInvalid { reason });
        }

        let bytes = tokio::fs::read(&manifest)
            .await
            .map_err(|e| WorkflowError::io(&manifest, e))?;

        let referenced = match &self.config.external_document_list_file {
            Some(list) => FileListReader::read_paths(list, &root).await?,
            None => Vec::new(),
        };
        let chain = FilterChain::new(&root)
            .with_filter(ManifestFolderFilter::new(self.config.manifest_dir()))
            .with_filter(RootPathFilter::new(&root, &self.config.root_path_filter))
            .with_filter(ReferencedSbomFilter::new(&root, &referenced));
        let expectations = Arc::new(ManifestExpectationMap::new());

        // 디스크 쪽
        let discovered = match &self.config.build_list_file {
            Some(list) => FileListReader::read(list, &root).await?,
            None => DirectoryWalker::new(self.config.follow_symlinks).walk(&root)?,
        };
        let filtered = chain.apply(discovered.items);
        let hashed = FileHasher::new(&root, &[algorithm])
            .with_expectations(Arc::clone(&expectations))
            .with_parallelism(self.config.parallelism)
            .run(filtered.items);

        // 매니페스트 쪽
        let (writer, manifest_records) = channel();
        let feed = ManifestFeed {
            writer,
            expectations: Arc::clone(&expectations),
            chain,
            root,
            keep_files: self.config.conformance.is_enabled(),
            seen: SeenManifest::default(),
        };
        let source = manifest.display().to_string();
        let parse = tokio::task::spawn_blocking(move || {
            let mut feed = feed;
            let result = ManifestParser::new(version, source).parse(&bytes, &mut feed);
            (result, feed.finish())
        });

        let engine = Arc::new(
            IntegrityValidator::new(algorithm, expectations).with_recorder(Arc::clone(recorder)),
        );
        let stage_errors = merge(vec![discovered.errors, filtered.errors, hashed.errors]);
        let (outcome, mut errors) = tokio::join!(
            engine.validate(
                merge(vec![hashed.items, manifest_records]),
                self.config.parallelism
            ),
            stage_errors.collect()
        );

        let (parsed, seen) = parse.await.map_err(WorkflowError::join)?;
        let info = parsed?;
        debug!(
            files = info.files,
            packages = info.packages,
            relationships = info.relationships,
            "manifest parsed"
        );

        errors.extend(outcome.failures);
        errors.extend(seen.skipped);
        errors.extend(self.config.conformance.check_files(&seen.files));
        errors.extend(self.config.conformance.check_packages(&seen.packages));

        let (mut skipped, mut failures): (Vec<_>, Vec<_>) = errors
            .into_iter()
            .partition(|e| e.kind.is_filter_exclusion());
        // 같은 경로가 디스크와 매니페스트 양쪽에서 걸러질 수 있음
        skipped.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));
        skipped.dedup();
        recorder.record_errors(&skipped);
        recorder.record_errors(&failures);

        if self.config.ignore_missing {
            let before = failures.len();
            failures.retain(|f| f.kind != ErrorKind::MissingFile);
            debug!(ignored = before - failures.len(), "missing files ignored");
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path).then(a.kind.cmp(&b.kind)));

        let success = failures.is_empty();
        let summary = recorder.finish(success);
        let report = ValidationReport::new(ReportInput {
            version,
            successes: outcome.successes.len() as u64,
            failures: &failures,
            skipped: &skipped,
            ignore_missing: self.config.ignore_missing,
            packages: seen.packages.len(),
            run: &summary,
        });

        if let Some(path) = &self.config.report_path {
            report.write_to(path).await?;
            info!(path = %path.display(), "validation report written");
        }

        Ok(ValidationOutcome {
            success,
            report,
            summary,
        })
    }
}

/// 파싱 중 매니페스트 쪽에서 모은 값
#[derive(Default)]
struct SeenManifest {
    skipped: Vec<FileValidationResult>,
    files: Vec<FileRecord>,
    packages: Vec<PackageRecord>,
}

/// 파서 이벤트를 기대값 맵과 엔진 입력 스트림으로 보냅니다.
///
/// 디스크 쪽과 같은 필터 체인을 적용하므로 걸러진 선언은 기대값이 되지 않습니다.
struct ManifestFeed {
    writer: StreamWriter<FileRecord>,
    expectations: Arc<ManifestExpectationMap>,
    chain: FilterChain,
    root: PathBuf,
    keep_files: bool,
    seen: SeenManifest,
}

impl ManifestFeed {
    fn finish(self) -> SeenManifest {
        self.writer.complete();
        self.seen
    }
}

impl ManifestVisitor for ManifestFeed {
    fn on_file(&mut self, file: FileRecord) {
        let full = self.root.join(file.path.trim_start_matches('/'));
        if let Some(kind) = self.chain.check(&full) {
            self.seen.skipped.push(FileValidationResult::new(file.path, kind));
            return;
        }

        self.expectations.insert(&file);
        if self.keep_files {
            self.seen.files.push(file.clone());
        }
        self.writer.write(file);
    }

    fn on_package(&mut self, package: PackageRecord) {
        self.seen.packages.push(package);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfigBuilder;
    use crate::conformance::Conformance;
    use crate::output::write_sidecar;
    use sbomforge_core::types::{HashAlgorithm, ManifestVersion};
    use sbomforge_pipeline::digest_hex;
    use sbomforge_spdx::SpdxError;

    fn file_entry(path: &str, content: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "fileName": format!(".{path}"),
            "SPDXID": format!("SPDXRef-File-{}", path.trim_start_matches('/')),
            "checksums": [
                {"algorithm": "SHA256", "checksumValue": digest_hex(HashAlgorithm::Sha256, content)}
            ]
        })
    }

    /// `_manifest/spdx_2.2/manifest.spdx.json`에 파일 목록만 있는 문서를 씁니다.
    fn write_manifest(drop: &std::path::Path, files: Vec<serde_json::Value>) -> PathBuf {
        let doc = serde_json::json!({
            "spdxVersion": "SPDX-2.2",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "app 1.0",
            "documentNamespace": "https://example.com/app/1.0/x",
            "files": files,
            "packages": [],
            "relationships": []
        });
        let path = drop.join("_manifest/spdx_2.2/manifest.spdx.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
        path
    }

    fn config(drop: &std::path::Path) -> WorkflowConfigBuilder {
        WorkflowConfigBuilder::new()
            .action(Action::Validate)
            .build_drop_path(drop)
            .parallelism(4)
            .verify_signature(false)
    }

    #[tokio::test]
    async fn additional_file_on_disk_is_reported() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(drop.path().join("b.txt"), b"beta").unwrap();
        write_manifest(drop.path(), vec![file_entry("/a.txt", b"alpha")]);

        let outcome = ValidateWorkflow::new(config(drop.path()).build().unwrap())
            .run()
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.report.summary.successful_files, 1);
        assert_eq!(
            outcome.report.invalid_files[&ErrorKind::AdditionalFile],
            vec!["/b.txt"]
        );
        assert_eq!(outcome.report.summary.failures, 1);
    }

    #[tokio::test]
    async fn missing_file_respects_ignore_missing() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        write_manifest(
            drop.path(),
            vec![file_entry("/a.txt", b"alpha"), file_entry("/c.txt", b"gamma")],
        );

        let strict = ValidateWorkflow::new(config(drop.path()).build().unwrap())
            .run()
            .await
            .unwrap();
        assert!(!strict.success);
        assert_eq!(strict.report.invalid_files[&ErrorKind::MissingFile], vec!["/c.txt"]);

        let lenient = ValidateWorkflow::new(config(drop.path()).ignore_missing(true).build().unwrap())
            .run()
            .await
            .unwrap();
        assert!(lenient.success);
        assert!(lenient.report.invalid_files.is_empty());
        assert_eq!(lenient.summary.raw_missing_count, 1);
        assert_eq!(lenient.report.summary.raw_missing_count, 1);
    }

    #[tokio::test]
    async fn digest_mismatch_is_invalid_hash() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"changed").unwrap();
        write_manifest(drop.path(), vec![file_entry("/a.txt", b"alpha")]);

        let outcome = ValidateWorkflow::new(config(drop.path()).build().unwrap())
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.report.invalid_files[&ErrorKind::InvalidHash], vec!["/a.txt"]);
        assert_eq!(outcome.report.summary.successful_files, 0);
    }

    #[tokio::test]
    async fn path_keys_are_case_insensitive() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("Readme.TXT"), b"doc").unwrap();
        write_manifest(drop.path(), vec![file_entry("/readme.txt", b"doc")]);

        let outcome = ValidateWorkflow::new(config(drop.path()).build().unwrap())
            .run()
            .await
            .unwrap();
        assert!(outcome.success, "report: {:?}", outcome.report.invalid_files);
    }

    #[tokio::test]
    async fn root_path_filter_applies_to_both_sides() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(drop.path().join("bin")).unwrap();
        std::fs::write(drop.path().join("bin/a.txt"), b"alpha").unwrap();
        std::fs::write(drop.path().join("notes.txt"), b"notes").unwrap();
        write_manifest(
            drop.path(),
            vec![file_entry("/bin/a.txt", b"alpha"), file_entry("/notes.txt", b"notes")],
        );

        let config = config(drop.path())
            .root_path_filter(vec!["bin".to_owned()])
            .build()
            .unwrap();
        let outcome = ValidateWorkflow::new(config).run().await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.report.summary.successful_files, 1);
        assert_eq!(
            outcome.report.skipped_files[&ErrorKind::FilteredRootPath],
            vec!["/notes.txt"]
        );
    }

    #[tokio::test]
    async fn root_path_filter_matches_mixed_case_manifest_paths() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(drop.path().join("bin")).unwrap();
        std::fs::write(drop.path().join("bin/a.txt"), b"alpha").unwrap();
        write_manifest(drop.path(), vec![file_entry("/BIN/a.txt", b"alpha")]);

        let config = config(drop.path())
            .root_path_filter(vec!["bin".to_owned()])
            .build()
            .unwrap();
        let outcome = ValidateWorkflow::new(config).run().await.unwrap();

        assert!(outcome.success, "report: {:?}", outcome.report.invalid_files);
        assert_eq!(outcome.report.summary.successful_files, 1);
        assert!(
            !outcome
                .report
                .skipped_files
                .contains_key(&ErrorKind::FilteredRootPath)
        );
    }

    #[tokio::test]
    async fn signature_check_is_on_by_default() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        write_manifest(drop.path(), vec![file_entry("/a.txt", b"alpha")]);

        let config = WorkflowConfigBuilder::new()
            .action(Action::Validate)
            .build_drop_path(drop.path())
            .build()
            .unwrap();
        let result = ValidateWorkflow::new(config).run().await;
        assert!(matches!(result, Err(WorkflowError::SignatureInvalid { .. })));
    }

    #[tokio::test]
    async fn malformed_manifest_is_fatal() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        let path = drop.path().join("_manifest/spdx_2.2/manifest.spdx.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"[1, 2, 3]").unwrap();

        let result = ValidateWorkflow::new(config(drop.path()).build().unwrap())
            .run()
            .await;
        assert!(matches!(
            result,
            Err(WorkflowError::Spdx(SpdxError::InvalidInput { .. }))
        ));
    }

    #[tokio::test]
    async fn tampered_manifest_fails_signature() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        let manifest = write_manifest(drop.path(), vec![file_entry("/a.txt", b"alpha")]);
        write_sidecar(&manifest).await.unwrap();

        let config = config(drop.path()).verify_signature(true).build().unwrap();
        let outcome = ValidateWorkflow::new(config.clone()).run().await.unwrap();
        assert!(outcome.success);
        assert_eq!(
            outcome.summary.properties.get("signature.passed").map(String::as_str),
            Some("true")
        );

        write_manifest(drop.path(), vec![]);
        let result = ValidateWorkflow::new(config).run().await;
        assert!(matches!(result, Err(WorkflowError::SignatureInvalid { .. })));
    }

    #[tokio::test]
    async fn ntia_requires_supplier_and_sha256() {
        let drop = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        let doc = serde_json::json!({
            "spdxVersion": "SPDX-2.2",
            "files": [file_entry("/a.txt", b"alpha")],
            "packages": [{"SPDXID": "SPDXRef-Package-x", "name": "x", "versionInfo": "1.0"}]
        });
        let path = drop.path().join("_manifest/spdx_2.2/manifest.spdx.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let config = config(drop.path())
            .conformance(Conformance::Ntia)
            .build()
            .unwrap();
        let outcome = ValidateWorkflow::new(config).run().await.unwrap();

        assert!(!outcome.success);
        assert_eq!(
            outcome.report.invalid_files[&ErrorKind::ConformanceStandardError],
            vec!["SPDXRef-Package-x"]
        );
        assert_eq!(outcome.report.summary.packages, 1);
    }

    #[tokio::test]
    async fn report_is_written_when_configured() {
        let drop = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(drop.path().join("a.txt"), b"alpha").unwrap();
        write_manifest(drop.path(), vec![file_entry("/a.txt", b"alpha")]);
        let report_path = out.path().join("report.json");

        let config = config(drop.path())
            .validate_version(ManifestVersion::Spdx22)
            .report_path(&report_path)
            .build()
            .unwrap();
        let outcome = ValidateWorkflow::new(config).run().await.unwrap();

        assert!(outcome.success);
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(report_path).unwrap()).unwrap();
        assert_eq!(json["result"], "Success");
        assert_eq!(json["summary"]["successfulFiles"], 1);
    }
}
