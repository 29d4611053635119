//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `sbomforge_`
//! - 영역명: `pipeline_`, `integrity_`, `serializer_`, `workflow_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use sbomforge_core::metrics as m;
//!
//! metrics::counter!(m::PIPELINE_FILES_HASHED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 워크플로우 동작 레이블 키 (generate, validate, aggregate)
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 에러 종류 레이블 키 (MissingFile, InvalidHash, ...)
pub const LABEL_KIND: &str = "kind";

/// 매니페스트 버전 레이블 키 (2.2, 3.0)
pub const LABEL_VERSION: &str = "version";

// ─── Pipeline 메트릭 ───────────────────────────────────────────────

/// Pipeline: 탐색된 파일 수 (counter)
pub const PIPELINE_FILES_DISCOVERED_TOTAL: &str = "sbomforge_pipeline_files_discovered_total";

/// Pipeline: 필터에서 제외된 파일 수 (counter, label: kind)
pub const PIPELINE_FILES_FILTERED_TOTAL: &str = "sbomforge_pipeline_files_filtered_total";

/// Pipeline: 해시 계산된 파일 수 (counter)
pub const PIPELINE_FILES_HASHED_TOTAL: &str = "sbomforge_pipeline_files_hashed_total";

/// Pipeline: 해시 계산 실패 수 (counter)
pub const PIPELINE_HASH_FAILURES_TOTAL: &str = "sbomforge_pipeline_hash_failures_total";

// ─── Integrity 메트릭 ──────────────────────────────────────────────

/// Integrity: 조정 성공 수 (counter)
pub const INTEGRITY_SUCCESSES_TOTAL: &str = "sbomforge_integrity_successes_total";

/// Integrity: 조정 실패 수 (counter, label: kind)
pub const INTEGRITY_FAILURES_TOTAL: &str = "sbomforge_integrity_failures_total";

/// Integrity: 종결 이후 중복 관측으로 건너뛴 수 (counter)
pub const INTEGRITY_DUPLICATE_SKIPS_TOTAL: &str = "sbomforge_integrity_duplicate_skips_total";

// ─── Serializer 메트릭 ─────────────────────────────────────────────

/// Serializer: 기록된 문서 요소 수 (counter, label: version)
pub const SERIALIZER_ELEMENTS_WRITTEN_TOTAL: &str = "sbomforge_serializer_elements_written_total";

/// Serializer: ID 중복으로 건너뛴 요소 수 (counter, label: version)
pub const SERIALIZER_ELEMENTS_DEDUPLICATED_TOTAL: &str =
    "sbomforge_serializer_elements_deduplicated_total";

// ─── Workflow 메트릭 ───────────────────────────────────────────────

/// Workflow: 실행 수 (counter, label: action, result)
pub const WORKFLOW_RUNS_TOTAL: &str = "sbomforge_workflow_runs_total";

/// Workflow: 실행 소요 시간 (histogram, 초, label: action)
pub const WORKFLOW_DURATION_SECONDS: &str = "sbomforge_workflow_duration_seconds";

/// Workflow: 기록된 매니페스트 수 (counter, label: version)
pub const WORKFLOW_MANIFESTS_WRITTEN_TOTAL: &str = "sbomforge_workflow_manifests_written_total";

/// Workflow: 집계 소스 처리 결과 (counter, label: result)
pub const WORKFLOW_AGGREGATE_SOURCES_TOTAL: &str = "sbomforge_workflow_aggregate_sources_total";

/// 워크플로우 소요 시간 히스토그램 버킷 (초)
pub const WORKFLOW_DURATION_BUCKETS: [f64; 9] = [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없어도 패닉하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Pipeline
    describe_counter!(
        PIPELINE_FILES_DISCOVERED_TOTAL,
        "Total number of files emitted by the walker or file list"
    );
    describe_counter!(
        PIPELINE_FILES_FILTERED_TOTAL,
        "Files dropped by a filter stage, per error kind"
    );
    describe_counter!(
        PIPELINE_FILES_HASHED_TOTAL,
        "Total number of files hashed successfully"
    );
    describe_counter!(
        PIPELINE_HASH_FAILURES_TOTAL,
        "Total number of files whose digest could not be computed"
    );

    // Integrity
    describe_counter!(
        INTEGRITY_SUCCESSES_TOTAL,
        "Paths reconciled with matching on-disk and manifest digests"
    );
    describe_counter!(
        INTEGRITY_FAILURES_TOTAL,
        "Integrity failures per error kind"
    );
    describe_counter!(
        INTEGRITY_DUPLICATE_SKIPS_TOTAL,
        "Observations ignored because the path was already classified"
    );

    // Serializer
    describe_counter!(
        SERIALIZER_ELEMENTS_WRITTEN_TOTAL,
        "Document elements written per manifest version"
    );
    describe_counter!(
        SERIALIZER_ELEMENTS_DEDUPLICATED_TOTAL,
        "Document elements skipped because their id was already written"
    );

    // Workflow
    describe_counter!(WORKFLOW_RUNS_TOTAL, "Workflow runs per action and result");
    describe_histogram!(
        WORKFLOW_DURATION_SECONDS,
        "Workflow wall-clock duration in seconds"
    );
    describe_counter!(
        WORKFLOW_MANIFESTS_WRITTEN_TOTAL,
        "Manifest documents written per version"
    );
    describe_counter!(
        WORKFLOW_AGGREGATE_SOURCES_TOTAL,
        "Aggregate sources per outcome (merged, skipped, failed)"
    );
}
