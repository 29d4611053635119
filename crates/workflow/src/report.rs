//! 검증 결과 리포트
//!
//! JSON 리포트(`result`, `summary`, `invalidFiles`, `skippedFiles`)와
//! 사람이 읽는 텍스트 요약을 만듭니다.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use sbomforge_core::telemetry::RunSummary;
use sbomforge_core::types::{ErrorKind, FileValidationResult, ManifestVersion};

use crate::error::WorkflowError;

/// 전체 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportResult {
    Success,
    Failure,
}

/// 리포트 요약
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub manifest_version: ManifestVersion,
    pub total_files_validated: u64,
    pub successful_files: u64,
    pub failures: u64,
    /// 필터링 전 에러 종류별 개수
    pub error_counts: BTreeMap<ErrorKind, u64>,
    pub raw_missing_count: u64,
    pub ignore_missing: bool,
    pub packages: usize,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// 검증 리포트
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub result: ReportResult,
    pub summary: ReportSummary,
    /// 실패 항목 (종류별)
    pub invalid_files: BTreeMap<ErrorKind, Vec<String>>,
    /// 필터로 제외된 항목 (종류별)
    pub skipped_files: BTreeMap<ErrorKind, Vec<String>>,
}

/// 리포트 입력
pub struct ReportInput<'a> {
    pub version: ManifestVersion,
    pub successes: u64,
    /// `IgnoreMissing` 적용 후 최종 실패
    pub failures: &'a [FileValidationResult],
    pub skipped: &'a [FileValidationResult],
    pub ignore_missing: bool,
    pub packages: usize,
    pub run: &'a RunSummary,
}

impl ValidationReport {
    pub fn new(input: ReportInput<'_>) -> Self {
        let result = if input.failures.is_empty() {
            ReportResult::Success
        } else {
            ReportResult::Failure
        };

        let failures = input.failures.len() as u64;
        Self {
            result,
            summary: ReportSummary {
                manifest_version: input.version,
                total_files_validated: input.successes + failures,
                successful_files: input.successes,
                failures,
                error_counts: input.run.error_counts.clone(),
                raw_missing_count: input.run.raw_missing_count,
                ignore_missing: input.ignore_missing,
                packages: input.packages,
                duration_secs: input.run.duration_secs,
                properties: input.run.properties.clone(),
            },
            invalid_files: group(input.failures),
            skipped_files: group(input.skipped),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ReportResult::Success
    }

    pub fn to_json(&self) -> Result<String, WorkflowError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| WorkflowError::Spdx(sbomforge_spdx::SpdxError::from(e)))
    }

    /// JSON 리포트를 파일로 씁니다.
    pub async fn write_to(&self, path: &Path) -> Result<(), WorkflowError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WorkflowError::io(parent, e))?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|e| WorkflowError::io(path, e))
    }

    /// 사람이 읽는 요약
    pub fn render_text(&self) -> String {
        let s = &self.summary;
        let mut out = String::new();
        let result = match self.result {
            ReportResult::Success => "Success",
            ReportResult::Failure => "Failure",
        };
        let _ = writeln!(out, "Validation result: {result}");
        let _ = writeln!(out, "Manifest version:  {}", s.manifest_version);
        let _ = writeln!(out, "Files validated:   {}", s.total_files_validated);
        let _ = writeln!(out, "Successful:        {}", s.successful_files);
        let _ = writeln!(out, "Failures:          {}", s.failures);
        let _ = writeln!(
            out,
            "Ignore missing:    {} (raw missing: {})",
            s.ignore_missing, s.raw_missing_count
        );
        let _ = writeln!(out, "Packages:          {}", s.packages);
        let _ = writeln!(out, "Duration:          {:.2}s", s.duration_secs);

        write_groups(&mut out, "Invalid files", &self.invalid_files);
        write_groups(&mut out, "Skipped files", &self.skipped_files);
        out
    }
}

fn group(items: &[FileValidationResult]) -> BTreeMap<ErrorKind, Vec<String>> {
    let mut grouped: BTreeMap<ErrorKind, Vec<String>> = BTreeMap::new();
    for item in items {
        grouped.entry(item.kind).or_default().push(item.path.clone());
    }
    for paths in grouped.values_mut() {
        paths.sort();
    }
    grouped
}

fn write_groups(out: &mut String, title: &str, groups: &BTreeMap<ErrorKind, Vec<String>>) {
    if groups.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}:");
    for (kind, paths) in groups {
        let _ = writeln!(out, "  {kind} ({})", paths.len());
        for path in paths {
            let _ = writeln!(out, "    {path}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbomforge_core::telemetry::RunRecorder;
    use sbomforge_core::types::Action;

    fn report(failures: &[FileValidationResult], skipped: &[FileValidationResult]) -> ValidationReport {
        let recorder = RunRecorder::new(Action::Validate);
        recorder.record_errors(failures);
        recorder.record_error(ErrorKind::MissingFile);
        let run = recorder.summary();
        ValidationReport::new(ReportInput {
            version: ManifestVersion::Spdx22,
            successes: 3,
            failures,
            skipped,
            ignore_missing: true,
            packages: 2,
            run: &run,
        })
    }

    #[test]
    fn success_when_no_failures() {
        let r = report(&[], &[FileValidationResult::new("/_manifest/x", ErrorKind::ManifestFolder)]);
        assert!(r.is_success());
        assert_eq!(r.summary.total_files_validated, 3);
        assert_eq!(r.summary.raw_missing_count, 1);
        assert_eq!(r.skipped_files[&ErrorKind::ManifestFolder], vec!["/_manifest/x"]);
    }

    #[test]
    fn json_groups_failures_by_kind() {
        let failures = [
            FileValidationResult::new("/b", ErrorKind::InvalidHash),
            FileValidationResult::new("/a", ErrorKind::InvalidHash),
            FileValidationResult::new("/c", ErrorKind::AdditionalFile),
        ];
        let r = report(&failures, &[]);
        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();

        assert_eq!(json["result"], "Failure");
        assert_eq!(json["summary"]["failures"], 3);
        assert_eq!(json["summary"]["ignoreMissing"], true);
        assert_eq!(json["summary"]["errorCounts"]["InvalidHash"], 2);
        assert_eq!(json["invalidFiles"]["InvalidHash"], serde_json::json!(["/a", "/b"]));
        assert_eq!(json["summary"]["manifestVersion"], "2.2");
    }

    #[test]
    fn text_lists_groups() {
        let r = report(&[FileValidationResult::new("/x", ErrorKind::MissingFile)], &[]);
        let text = r.render_text();
        assert!(text.contains("Validation result: Failure"));
        assert!(text.contains("MissingFile (1)"));
        assert!(text.contains("    /x"));
    }

    #[tokio::test]
    async fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        report(&[], &[]).write_to(&path).await.unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("\"result\""));
    }
}
