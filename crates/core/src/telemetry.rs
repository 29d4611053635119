//! 실행 단위 텔레메트리 기록기
//!
//! [`RunRecorder`]는 한 번의 워크플로우 실행 동안 결과 수를 누적합니다.
//! `IgnoreMissing` 설정으로 최종 실패 목록에서 빠지는 `MissingFile`도
//! 여기서는 원래 개수 그대로 기록됩니다.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::metrics as m;
use crate::types::{Action, ErrorKind, FileValidationResult};

/// 실행 단위 텔레메트리 기록기
///
/// 여러 태스크에서 동시에 호출될 수 있도록 카운터는 원자적으로 갱신됩니다.
pub struct RunRecorder {
    action: Action,
    started: Instant,
    successes: AtomicU64,
    duplicate_skips: AtomicU64,
    error_counts: [AtomicU64; ErrorKind::ALL.len()],
    properties: Mutex<BTreeMap<String, String>>,
}

/// 실행 요약
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub action: Action,
    pub successes: u64,
    pub duplicate_skips: u64,
    /// 필터링 전 에러 종류별 개수
    pub error_counts: BTreeMap<ErrorKind, u64>,
    /// `IgnoreMissing` 적용 전 `MissingFile` 개수
    pub raw_missing_count: u64,
    /// 외부 협력자(서명 검증기 등)가 남긴 키-값
    pub properties: BTreeMap<String, String>,
    pub duration_secs: f64,
}

impl RunRecorder {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            started: Instant::now(),
            successes: AtomicU64::new(0),
            duplicate_skips: AtomicU64::new(0),
            error_counts: std::array::from_fn(|_| AtomicU64::new(0)),
            properties: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_skip(&self) {
        self.duplicate_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.error_counts[kind as usize].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_errors(&self, errors: &[FileValidationResult]) {
        for error in errors {
            self.record_error(error.kind);
        }
    }

    /// 외부 협력자의 텔레메트리 키-값을 추가합니다.
    pub fn add_property(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut properties = self
            .properties
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        properties.insert(key.into(), value.into());
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.error_counts[kind as usize].load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 현재까지의 요약을 만듭니다.
    pub fn summary(&self) -> RunSummary {
        let error_counts = ErrorKind::ALL
            .iter()
            .filter_map(|kind| {
                let count = self.error_count(*kind);
                (count > 0).then_some((*kind, count))
            })
            .collect();
        let properties = self
            .properties
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        RunSummary {
            action: self.action,
            successes: self.successes.load(Ordering::Relaxed),
            duplicate_skips: self.duplicate_skips.load(Ordering::Relaxed),
            error_counts,
            raw_missing_count: self.error_count(ErrorKind::MissingFile),
            properties,
            duration_secs: self.elapsed().as_secs_f64(),
        }
    }

    /// 실행을 마무리하고 요약을 로그와 메트릭으로 내보냅니다.
    pub fn finish(&self, success: bool) -> RunSummary {
        let summary = self.summary();
        let result = if success { "success" } else { "failure" };
        let action = self.action.to_string();

        metrics::counter!(
            m::WORKFLOW_RUNS_TOTAL,
            m::LABEL_ACTION => action.clone(),
            m::LABEL_RESULT => result
        )
        .increment(1);
        metrics::histogram!(m::WORKFLOW_DURATION_SECONDS, m::LABEL_ACTION => action)
            .record(summary.duration_secs);

        info!(
            action = %self.action,
            result,
            successes = summary.successes,
            raw_missing = summary.raw_missing_count,
            duplicate_skips = summary.duplicate_skips,
            duration_secs = summary.duration_secs,
            "run finished"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_errors_per_kind() {
        let recorder = RunRecorder::new(Action::Validate);
        recorder.record_error(ErrorKind::MissingFile);
        recorder.record_error(ErrorKind::MissingFile);
        recorder.record_errors(&[FileValidationResult::new("/a", ErrorKind::InvalidHash)]);

        let summary = recorder.summary();
        assert_eq!(summary.raw_missing_count, 2);
        assert_eq!(summary.error_counts.get(&ErrorKind::InvalidHash), Some(&1));
        assert!(!summary.error_counts.contains_key(&ErrorKind::Other));
    }

    #[test]
    fn properties_are_kept() {
        let recorder = RunRecorder::new(Action::Validate);
        recorder.add_property("signature.validator", "sidecar-sha256");
        let summary = recorder.summary();
        assert_eq!(
            summary.properties.get("signature.validator").map(String::as_str),
            Some("sidecar-sha256")
        );
    }

    #[tokio::test]
    async fn concurrent_recording_is_not_lost() {
        let recorder = Arc::new(RunRecorder::new(Action::Generate));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let recorder = Arc::clone(&recorder);
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    recorder.record_success();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(recorder.summary().successes, 800);
    }

    #[test]
    fn finish_without_recorder_does_not_panic() {
        let recorder = RunRecorder::new(Action::Aggregate);
        let summary = recorder.finish(true);
        assert_eq!(summary.action, Action::Aggregate);
    }
}
