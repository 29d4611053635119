//! 경로 키 기반 무결성 조정 엔진
//!
//! 디스크 해시 스트림과 매니페스트 스트림이 어떤 순서로 도착하든,
//! 경로 하나는 정확히 한 번 분류됩니다(성공 또는 에러 종류 하나).
//!
//! # 상태 전이
//!
//! ```text
//!            관측 (빈 쪽 채움)              양쪽 채워짐
//! (없음) ──────────────────> Pending ─────────────────> Resolved
//!                               │   같은 쪽 재관측
//!                               └─────────────────────> Invalidated (AdditionalFile)
//!
//! Resolved / Invalidated 이후 관측 ──> DuplicateSkip
//! ```
//!
//! 모든 변경은 DashMap 엔트리 잠금 안에서 순수 함수 [`transition`]으로
//! 이루어지므로 여러 레인이 같은 경로를 동시에 관측해도 갱신이 유실되지 않습니다.
//!
//! 같은 위치의 중복 관측을 `AdditionalFile`로 보는 동작은 실제 중복이 아닌
//! 탐색 경합일 수도 있지만 관측 가능한 결과를 유지하기 위해 그대로 둡니다.
//! 키가 대소문자를 무시하므로 대소문자만 다른 두 디스크 파일도 이 경로로
//! 분류됩니다.

use std::mem;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use sbomforge_core::metrics as m;
use sbomforge_core::telemetry::RunRecorder;
use sbomforge_core::types::{ErrorKind, FileLocation, FileRecord, FileValidationResult, HashAlgorithm};

use crate::expectation::ManifestExpectationMap;
use crate::stream::{StageOutput, StreamReader, channel, split};

/// 경로별 조정 상태
#[derive(Debug, Clone)]
enum EntryState {
    /// 한쪽 또는 양쪽 대기 중
    Pending {
        on_disk: Option<FileRecord>,
        in_manifest: Option<FileRecord>,
    },
    /// 분류 완료
    Resolved,
    /// 같은 위치 중복으로 무효화됨
    Invalidated,
}

impl EntryState {
    fn empty() -> Self {
        Self::Pending {
            on_disk: None,
            in_manifest: None,
        }
    }
}

/// 관측 한 건의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// 반대쪽 관측 대기
    Pending,
    /// 다이제스트 일치 (위치 `Both`)
    Success(FileRecord),
    /// 분류된 실패
    Failure(FileValidationResult),
    /// 이미 분류된 경로의 재관측
    DuplicateSkip,
}

/// 조정 결과
#[derive(Debug, Default)]
pub struct IntegrityOutcome {
    pub successes: Vec<FileRecord>,
    pub failures: Vec<FileValidationResult>,
}

/// 순수 상태 전이 함수
fn transition(
    state: EntryState,
    record: FileRecord,
    algorithm: HashAlgorithm,
) -> (EntryState, Observation) {
    let (mut on_disk, mut in_manifest) = match state {
        EntryState::Pending {
            on_disk,
            in_manifest,
        } => (on_disk, in_manifest),
        terminal @ (EntryState::Resolved | EntryState::Invalidated) => {
            return (terminal, Observation::DuplicateSkip);
        }
    };

    let slot = match record.location {
        FileLocation::InManifest => &mut in_manifest,
        FileLocation::OnDisk | FileLocation::Both => &mut on_disk,
    };
    if slot.is_some() {
        let failure = FileValidationResult::new(record.path, ErrorKind::AdditionalFile);
        return (EntryState::Invalidated, Observation::Failure(failure));
    }
    *slot = Some(record);

    match (on_disk, in_manifest) {
        (Some(disk), Some(manifest)) => (EntryState::Resolved, compare(disk, &manifest, algorithm)),
        (on_disk, in_manifest) => (
            EntryState::Pending {
                on_disk,
                in_manifest,
            },
            Observation::Pending,
        ),
    }
}

fn compare(disk: FileRecord, manifest: &FileRecord, algorithm: HashAlgorithm) -> Observation {
    match (disk.checksum(algorithm), manifest.checksum(algorithm)) {
        (Some(actual), Some(expected)) if actual.eq_ignore_ascii_case(expected) => {
            let mut record = disk;
            record.location = FileLocation::Both;
            Observation::Success(record)
        }
        (Some(_), Some(_)) => {
            Observation::Failure(FileValidationResult::new(disk.path, ErrorKind::InvalidHash))
        }
        _ => Observation::Failure(FileValidationResult::new(
            disk.path,
            ErrorKind::UnsupportedHashAlgorithm,
        )),
    }
}

/// 무결성 조정 엔진
pub struct IntegrityValidator {
    algorithm: HashAlgorithm,
    entries: DashMap<String, EntryState>,
    expectations: Arc<ManifestExpectationMap>,
    recorder: Option<Arc<RunRecorder>>,
}

impl IntegrityValidator {
    pub fn new(algorithm: HashAlgorithm, expectations: Arc<ManifestExpectationMap>) -> Self {
        Self {
            algorithm,
            entries: DashMap::new(),
            expectations,
            recorder: None,
        }
    }

    /// 성공/중복 건너뜀 수를 기록할 recorder를 연결합니다.
    pub fn with_recorder(mut self, recorder: Arc<RunRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn expectations(&self) -> &Arc<ManifestExpectationMap> {
        &self.expectations
    }

    /// 레코드 하나를 관측합니다.
    pub fn observe(&self, record: FileRecord) -> Observation {
        let path = record.path.clone();

        let observation = if self.expectations.is_discarded(&path) {
            Observation::DuplicateSkip
        } else {
            let mut entry = self.entries.entry(record.key()).or_insert_with(EntryState::empty);
            let current = mem::replace(entry.value_mut(), EntryState::Invalidated);
            let (next, observation) = transition(current, record, self.algorithm);
            *entry.value_mut() = next;
            observation
        };

        match &observation {
            Observation::Pending => {}
            Observation::Success(_) => {
                self.expectations.remove(&path);
                metrics::counter!(m::INTEGRITY_SUCCESSES_TOTAL).increment(1);
                if let Some(recorder) = &self.recorder {
                    recorder.record_success();
                }
            }
            Observation::Failure(failure) => {
                if failure.kind == ErrorKind::AdditionalFile {
                    self.expectations.discard(&path);
                } else {
                    self.expectations.remove(&path);
                }
                metrics::counter!(
                    m::INTEGRITY_FAILURES_TOTAL,
                    m::LABEL_KIND => failure.kind.as_str()
                )
                .increment(1);
            }
            Observation::DuplicateSkip => {
                debug!(path = %path, "path already classified, skipping observation");
                metrics::counter!(m::INTEGRITY_DUPLICATE_SKIPS_TOTAL).increment(1);
                if let Some(recorder) = &self.recorder {
                    recorder.record_duplicate_skip();
                }
            }
        }

        observation
    }

    /// 입력 스트림을 `parallelism`개 레인으로 나눠 조정합니다.
    ///
    /// 반환된 스트림은 입력이 모두 소진된 뒤 완료됩니다. 한쪽만 관측된
    /// 경로는 여기서 보고되지 않으며 [`finalize`](Self::finalize)가 처리합니다.
    pub fn run(self: &Arc<Self>, input: StreamReader<FileRecord>, parallelism: usize) -> StageOutput<FileRecord> {
        let (successes, items) = channel();
        let (errors, error_reader) = channel();

        for mut lane in split(input, parallelism) {
            let engine = Arc::clone(self);
            let successes = successes.clone();
            let errors = errors.clone();
            tokio::spawn(async move {
                while let Some(record) = lane.read().await {
                    match engine.observe(record) {
                        Observation::Success(record) => {
                            successes.write(record);
                        }
                        Observation::Failure(failure) => {
                            errors.write(failure);
                        }
                        Observation::Pending | Observation::DuplicateSkip => {}
                    }
                }
            });
        }

        StageOutput::new(items, error_reader)
    }

    /// 모든 입력 소진 후 남은 경로를 분류합니다.
    ///
    /// 디스크에만 있는 대기 항목은 `AdditionalFile`, 기대값 맵에 남은 경로는
    /// `MissingFile`이 됩니다. 결과는 경로순으로 정렬됩니다.
    pub fn finalize(&self) -> Vec<FileValidationResult> {
        let mut failures = Vec::new();

        for mut entry in self.entries.iter_mut() {
            let disk_only = match entry.value() {
                EntryState::Pending {
                    on_disk: Some(disk),
                    in_manifest: None,
                } => Some(disk.path.clone()),
                _ => None,
            };
            if let Some(path) = disk_only {
                *entry.value_mut() = EntryState::Resolved;
                failures.push(FileValidationResult::new(path, ErrorKind::AdditionalFile));
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));

        let missing: Vec<FileValidationResult> = self
            .expectations
            .remaining()
            .into_iter()
            .map(|path| FileValidationResult::new(path, ErrorKind::MissingFile))
            .collect();
        for path in &missing {
            self.expectations.discard(&path.path);
        }
        failures.extend(missing);

        for failure in &failures {
            metrics::counter!(
                m::INTEGRITY_FAILURES_TOTAL,
                m::LABEL_KIND => failure.kind.as_str()
            )
            .increment(1);
        }
        failures
    }

    /// 스트림 조정과 마무리를 한 번에 수행합니다.
    pub async fn validate(
        self: &Arc<Self>,
        input: StreamReader<FileRecord>,
        parallelism: usize,
    ) -> IntegrityOutcome {
        let (successes, mut failures) = self.run(input, parallelism).collect().await;
        failures.extend(self.finalize());
        IntegrityOutcome {
            successes,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomforge_core::types::Action;

    const ALG: HashAlgorithm = HashAlgorithm::Sha256;

    fn disk(path: &str, digest: &str) -> FileRecord {
        FileRecord::new(path, FileLocation::OnDisk).with_checksum(ALG, digest)
    }

    fn manifest(path: &str, digest: &str) -> FileRecord {
        FileRecord::new(path, FileLocation::InManifest).with_checksum(ALG, digest)
    }

    fn engine_with(manifest_records: &[FileRecord]) -> Arc<IntegrityValidator> {
        let expectations = Arc::new(ManifestExpectationMap::new());
        for record in manifest_records {
            expectations.insert(record);
        }
        Arc::new(IntegrityValidator::new(ALG, expectations))
    }

    #[test]
    fn transition_waits_for_other_side() {
        let (state, obs) = transition(EntryState::empty(), disk("/a", "aa"), ALG);
        assert_eq!(obs, Observation::Pending);
        assert!(matches!(state, EntryState::Pending { on_disk: Some(_), in_manifest: None }));
    }

    #[test]
    fn transition_compares_case_insensitively() {
        let (state, _) = transition(EntryState::empty(), manifest("/a", "ABCD"), ALG);
        let (state, obs) = transition(state, disk("/a", "abcd"), ALG);
        assert!(matches!(state, EntryState::Resolved));
        match obs {
            Observation::Success(record) => assert_eq!(record.location, FileLocation::Both),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn transition_same_side_twice_invalidates() {
        let (state, _) = transition(EntryState::empty(), disk("/a", "aa"), ALG);
        let (state, obs) = transition(state, disk("/a", "aa"), ALG);
        assert!(matches!(state, EntryState::Invalidated));
        assert_eq!(
            obs,
            Observation::Failure(FileValidationResult::new("/a", ErrorKind::AdditionalFile))
        );
    }

    #[test]
    fn transition_after_terminal_is_skip() {
        let (_, obs) = transition(EntryState::Resolved, disk("/a", "aa"), ALG);
        assert_eq!(obs, Observation::DuplicateSkip);
        let (_, obs) = transition(EntryState::Invalidated, manifest("/a", "aa"), ALG);
        assert_eq!(obs, Observation::DuplicateSkip);
    }

    #[test]
    fn missing_digest_is_unsupported_algorithm() {
        let (state, _) = transition(
            EntryState::empty(),
            FileRecord::new("/a", FileLocation::InManifest).with_checksum(HashAlgorithm::Sha1, "aa"),
            ALG,
        );
        let (_, obs) = transition(state, disk("/a", "aa"), ALG);
        assert_eq!(
            obs,
            Observation::Failure(FileValidationResult::new(
                "/a",
                ErrorKind::UnsupportedHashAlgorithm
            ))
        );
    }

    #[test]
    fn mismatch_is_invalid_hash_and_clears_expectation() {
        let m = manifest("/a", "11");
        let engine = engine_with(std::slice::from_ref(&m));
        engine.observe(m);
        let obs = engine.observe(disk("/a", "22"));
        assert_eq!(
            obs,
            Observation::Failure(FileValidationResult::new("/a", ErrorKind::InvalidHash))
        );
        assert!(engine.finalize().is_empty());
    }

    #[test]
    fn duplicate_after_success_is_skipped_and_counted() {
        let recorder = Arc::new(RunRecorder::new(Action::Validate));
        let m = manifest("/a", "11");
        let expectations = Arc::new(ManifestExpectationMap::new());
        expectations.insert(&m);
        let engine = IntegrityValidator::new(ALG, expectations).with_recorder(Arc::clone(&recorder));

        engine.observe(m);
        assert!(matches!(engine.observe(disk("/a", "11")), Observation::Success(_)));
        assert_eq!(engine.observe(disk("/A", "11")), Observation::DuplicateSkip);

        let summary = recorder.summary();
        assert_eq!(summary.successes, 1);
        assert_eq!(summary.duplicate_skips, 1);
    }

    #[tokio::test]
    async fn scenario_extra_disk_file() {
        let a = manifest("/a.txt", "aa");
        let engine = engine_with(std::slice::from_ref(&a));
        let input = StreamReader::from_items([a, disk("/a.txt", "aa"), disk("/b.txt", "bb")]);

        let outcome = engine.validate(input, 4).await;
        assert_eq!(outcome.successes.len(), 1);
        assert_eq!(outcome.successes[0].path, "/a.txt");
        assert_eq!(
            outcome.failures,
            vec![FileValidationResult::new("/b.txt", ErrorKind::AdditionalFile)]
        );
    }

    #[tokio::test]
    async fn scenario_missing_file() {
        let c = manifest("/c.txt", "cc");
        let engine = engine_with(std::slice::from_ref(&c));

        let outcome = engine.validate(StreamReader::from_items([c]), 2).await;
        assert!(outcome.successes.is_empty());
        assert_eq!(
            outcome.failures,
            vec![FileValidationResult::new("/c.txt", ErrorKind::MissingFile)]
        );
    }

    #[tokio::test]
    async fn invalidated_path_is_not_also_missing() {
        let m = manifest("/dup.txt", "aa");
        let engine = engine_with(std::slice::from_ref(&m));
        let input = StreamReader::from_items([disk("/dup.txt", "aa"), disk("/dup.txt", "aa")]);

        let outcome = engine.validate(input, 1).await;
        assert_eq!(
            outcome.failures,
            vec![FileValidationResult::new("/dup.txt", ErrorKind::AdditionalFile)]
        );
    }

    #[tokio::test]
    async fn discarded_path_is_skipped() {
        let m = manifest("/bad.txt", "aa");
        let engine = engine_with(std::slice::from_ref(&m));
        engine.expectations().discard("/bad.txt");

        let outcome = engine.validate(StreamReader::from_items([m]), 1).await;
        assert!(outcome.successes.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn concurrent_lanes_classify_each_path_once() {
        let manifest_records: Vec<FileRecord> = (0..200)
            .map(|i| manifest(&format!("/f{i}.txt"), &format!("{i:04x}")))
            .collect();
        let engine = engine_with(&manifest_records);

        let mut input: Vec<FileRecord> = Vec::new();
        for (i, record) in manifest_records.iter().enumerate() {
            input.push(record.clone());
            // 절반은 일치, 나머지는 불일치
            let digest = if i % 2 == 0 { format!("{i:04x}") } else { "ffff".to_owned() };
            input.push(disk(&record.path, &digest));
        }

        let outcome = engine.validate(StreamReader::from_items(input), 8).await;
        assert_eq!(outcome.successes.len(), 100);
        assert_eq!(outcome.failures.len(), 100);
        assert!(
            outcome
                .failures
                .iter()
                .all(|f| f.kind == ErrorKind::InvalidHash)
        );

        let mut paths: Vec<&str> = outcome
            .successes
            .iter()
            .map(|r| r.path.as_str())
            .chain(outcome.failures.iter().map(|f| f.path.as_str()))
            .collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_path_from_many_lanes_resolves_once() {
        for round in 0..50 {
            let declared = manifest("/x.bin", "abcd");
            let engine = engine_with(std::slice::from_ref(&declared));

            let mut input = vec![declared];
            for copy in 0..16 {
                let path = if copy % 2 == 0 { "/x.bin" } else { "/X.BIN" };
                input.push(disk(path, "ABCD"));
            }
            input.rotate_left(round % 17);

            let outcome = engine.validate(StreamReader::from_items(input), 8).await;
            assert_eq!(
                outcome.successes.len() + outcome.failures.len(),
                1,
                "round {round}: {outcome:?}"
            );
            assert!(engine.expectations().remaining().is_empty());
        }
    }
}
