//! Aggregate 워크플로우
//!
//! 여러 빌드의 SPDX 2.2 매니페스트를 각각 검증한 뒤 패키지와 의존 관계를
//! 합쳐 하나의 매니페스트로 다시 생성합니다.
//!
//! - 2.2가 아닌 소스는 경고 후 건너뜁니다.
//! - 검증에 실패한 소스는 병합에서 빠지고 실행 전체를 실패로 만듭니다.
//! - 소스 루트 패키지는 `package_id(name, version)`으로 재식별되어
//!   일반 패키지가 되고, 새 루트가 이들에 의존합니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use sbomforge_core::metrics as m;
use sbomforge_core::telemetry::RunRecorder;
use sbomforge_core::types::{Action, ErrorKind, FileValidationResult, ManifestVersion, PackageRecord};
use sbomforge_spdx::{MergeableContent, content_provider_for, ids, manifest_file_path};

use crate::config::{AggregateSource, WorkflowConfig};
use crate::error::WorkflowError;
use crate::generate::{GenerateInput, GenerateOutcome, GenerateWorkflow};
use crate::validate::ValidateWorkflow;

/// 소스 하나의 처리 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceState {
    /// 병합됨 (패키지 수)
    Merged { packages: usize },
    /// 지원하지 않는 버전
    Skipped { reason: String },
    /// 검증 또는 추출 실패
    Failed { reason: String },
}

impl SourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merged { .. } => "merged",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
        }
    }
}

/// 소스별 상태
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub manifest: PathBuf,
    pub version: ManifestVersion,
    pub state: SourceState,
}

/// Aggregate 실행 결과
#[derive(Debug)]
pub struct AggregateOutcome {
    pub success: bool,
    pub sources: Vec<SourceStatus>,
    pub generate: GenerateOutcome,
}

/// id 기준 패키지 병합
#[derive(Debug, Default)]
struct PackageMerge {
    packages: Vec<PackageRecord>,
    index: HashMap<String, usize>,
    roots: Vec<String>,
}

impl PackageMerge {
    /// 소스 내용을 합칩니다. 병합된 패키지 수를 반환합니다.
    fn add(&mut self, content: MergeableContent) -> usize {
        let renamed: HashMap<String, String> = content
            .root_packages()
            .map(|root| (root.id.clone(), ids::package_id(&root.name, &root.version)))
            .collect();

        let count = content.packages.len();
        for mut package in content.packages {
            if let Some(new_id) = renamed.get(&package.id) {
                package.id = new_id.clone();
                if !self.roots.contains(new_id) {
                    self.roots.push(new_id.clone());
                }
            }
            for dependency in &mut package.depends_on {
                if let Some(new_id) = renamed.get(dependency.as_str()) {
                    *dependency = new_id.clone();
                }
            }
            self.insert(package);
        }
        count
    }

    fn insert(&mut self, package: PackageRecord) {
        match self.index.get(&package.id) {
            Some(&i) => {
                let existing = &mut self.packages[i];
                for dependency in package.depends_on {
                    if !existing.depends_on.contains(&dependency) {
                        existing.depends_on.push(dependency);
                    }
                }
            }
            None => {
                self.index.insert(package.id.clone(), self.packages.len());
                self.packages.push(package);
            }
        }
    }
}

/// Aggregate 워크플로우
pub struct AggregateWorkflow {
    config: WorkflowConfig,
    generate: GenerateWorkflow,
}

impl AggregateWorkflow {
    pub fn new(config: WorkflowConfig) -> Self {
        let generate = GenerateWorkflow::new(config.clone());
        Self { config, generate }
    }

    /// 생성 단계의 메타데이터 제공자 등을 바꿀 때 사용합니다.
    pub fn with_generate(mut self, generate: GenerateWorkflow) -> Self {
        self.generate = generate;
        self
    }

    pub async fn run(&self) -> Result<AggregateOutcome, WorkflowError> {
        let recorder = Arc::new(RunRecorder::new(Action::Aggregate));
        info!(sources = self.config.aggregate_sources.len(), "starting aggregate");

        let mut merge = PackageMerge::default();
        let mut sources = Vec::with_capacity(self.config.aggregate_sources.len());
        let mut errors = Vec::new();

        for source in &self.config.aggregate_sources {
            let manifest = manifest_file_path(&source.manifest_dir(), source.manifest_version);
            let state = if source.manifest_version != ManifestVersion::Spdx22 {
                warn!(
                    manifest = %manifest.display(),
                    version = source.manifest_version.as_str(),
                    "only SPDX 2.2 sources can be aggregated, skipping"
                );
                SourceState::Skipped {
                    reason: format!("{} is not supported for aggregation", source.manifest_version),
                }
            } else {
                match self.merge_source(source, &manifest).await {
                    Ok(content) => SourceState::Merged {
                        packages: merge.add(content),
                    },
                    Err(reason) => {
                        warn!(manifest = %manifest.display(), reason = %reason, "source excluded from aggregate");
                        errors.push(FileValidationResult::new(
                            manifest.display().to_string(),
                            ErrorKind::Other,
                        ));
                        SourceState::Failed { reason }
                    }
                }
            };
            metrics::counter!(
                m::WORKFLOW_AGGREGATE_SOURCES_TOTAL,
                m::LABEL_RESULT => state.as_str()
            )
            .increment(1);
            sources.push(SourceStatus {
                manifest,
                version: source.manifest_version,
                state,
            });
        }

        let merged = sources
            .iter()
            .filter(|s| matches!(s.state, SourceState::Merged { .. }))
            .count();
        recorder.add_property("aggregate.sources", sources.len().to_string());
        recorder.add_property("aggregate.merged", merged.to_string());
        if merged == 0 {
            recorder.finish(false);
            return Err(WorkflowError::Aggregation(
                "no source manifest could be merged".to_owned(),
            ));
        }

        let input = GenerateInput {
            packages: merge.packages,
            root_depends_on: merge.roots,
            errors,
            ..Default::default()
        };
        let generate = self.generate.run_with_input(recorder, input).await?;

        Ok(AggregateOutcome {
            success: generate.success,
            sources,
            generate,
        })
    }

    /// 소스를 검증하고 병합 가능 내용을 추출합니다. 실패 사유를 `Err`로 돌려줍니다.
    async fn merge_source(
        &self,
        source: &AggregateSource,
        manifest: &std::path::Path,
    ) -> Result<MergeableContent, String> {
        let outcome = ValidateWorkflow::new(self.config.for_source(source))
            .run()
            .await
            .map_err(|e| e.to_string())?;
        if !outcome.success {
            return Err(format!(
                "validation failed with {} error(s)",
                outcome.report.summary.failures
            ));
        }

        let bytes = tokio::fs::read(manifest).await.map_err(|e| e.to_string())?;
        let version = source.manifest_version;
        let name = manifest.display().to_string();
        tokio::task::spawn_blocking(move || content_provider_for(version).extract(&name, &bytes))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(id: &str, name: &str, deps: &[&str]) -> PackageRecord {
        PackageRecord {
            id: id.to_owned(),
            name: name.to_owned(),
            version: "1.0".to_owned(),
            depends_on: deps.iter().map(|d| (*d).to_owned()).collect(),
            ..Default::default()
        }
    }

    fn content(root_name: &str, packages: Vec<PackageRecord>) -> MergeableContent {
        let mut all = vec![package(ids::ROOT_PACKAGE_ID, root_name, &["SPDXRef-Package-shared"])];
        all.extend(packages);
        MergeableContent {
            source: format!("{root_name}/manifest.spdx.json"),
            root_ids: vec![ids::ROOT_PACKAGE_ID.to_owned()],
            packages: all,
            ..Default::default()
        }
    }

    #[test]
    fn roots_are_reidentified_and_packages_merged() {
        let mut merge = PackageMerge::default();
        merge.add(content(
            "svc-a",
            vec![package("SPDXRef-Package-shared", "shared", &["SPDXRef-Package-x"])],
        ));
        merge.add(content(
            "svc-b",
            vec![package("SPDXRef-Package-shared", "shared", &["SPDXRef-Package-y"])],
        ));

        let a = ids::package_id("svc-a", "1.0");
        let b = ids::package_id("svc-b", "1.0");
        assert_eq!(merge.roots, vec![a.clone(), b.clone()]);
        assert!(merge.packages.iter().all(|p| p.id != ids::ROOT_PACKAGE_ID));

        let shared: Vec<_> = merge
            .packages
            .iter()
            .filter(|p| p.id == "SPDXRef-Package-shared")
            .collect();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].depends_on, vec!["SPDXRef-Package-x", "SPDXRef-Package-y"]);
        assert_eq!(merge.packages.len(), 3);
    }
}
