//! 경로 필터 단계
//!
//! 각 필터는 술어 하나와 그 술어를 통과하지 못한 경로에 붙일 에러 종류를
//! 가집니다. [`FilterChain`]은 필터를 등록 순서대로 적용하며, 처음 실패한
//! 필터의 종류로 경로를 보고하고 나머지 필터는 건너뜁니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use sbomforge_core::metrics as m;
use sbomforge_core::types::{ErrorKind, FileValidationResult, manifest_path, path_key};

use crate::stream::{StageOutput, StreamReader, channel};

/// 경로 필터 capability
pub trait PathFilter: Send + Sync {
    /// 필터 이름 (로그용)
    fn name(&self) -> &str;

    /// 통과하지 못한 경로에 붙는 에러 종류
    fn error_kind(&self) -> ErrorKind;

    /// 경로가 통과하면 `true`
    fn is_valid(&self, path: &Path) -> bool;
}

/// 설정된 루트 경로 접두어 아래의 파일만 통과시킵니다.
///
/// 접두어 목록이 비어 있으면 모든 경로가 통과합니다. 비교는 조정 키와 같이
/// 대소문자를 구분하지 않습니다.
pub struct RootPathFilter {
    root: PathBuf,
    prefixes: Vec<String>,
}

impl RootPathFilter {
    /// `root` 기준 상대 접두어로 필터를 만듭니다.
    pub fn new(root: &Path, prefixes: &[String]) -> Self {
        let prefixes = prefixes
            .iter()
            .map(|prefix| path_key(prefix.trim_matches(|c| c == '/' || c == '\\')))
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| format!("/{prefix}"))
            .collect();
        Self {
            root: root.to_path_buf(),
            prefixes,
        }
    }
}

impl PathFilter for RootPathFilter {
    fn name(&self) -> &str {
        "root-path"
    }

    fn error_kind(&self) -> ErrorKind {
        ErrorKind::FilteredRootPath
    }

    fn is_valid(&self, path: &Path) -> bool {
        if self.prefixes.is_empty() {
            return true;
        }
        let Some(key) = drop_key(&self.root, path) else {
            return false;
        };
        self.prefixes.iter().any(|prefix| {
            key.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// 매니페스트 출력 디렉토리 안의 파일을 제외합니다.
pub struct ManifestFolderFilter {
    manifest_dir: PathBuf,
}

impl ManifestFolderFilter {
    pub fn new(manifest_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_dir: manifest_dir.into(),
        }
    }
}

impl PathFilter for ManifestFolderFilter {
    fn name(&self) -> &str {
        "manifest-folder"
    }

    fn error_kind(&self) -> ErrorKind {
        ErrorKind::ManifestFolder
    }

    fn is_valid(&self, path: &Path) -> bool {
        !path.starts_with(&self.manifest_dir)
    }
}

/// 외부 문서 참조로 기술되는 SBOM 파일을 파일 목록에서 제외합니다.
///
/// 목록 항목과 후보 경로 모두 `root` 기준 조정 키로 비교하므로
/// `./dep.spdx.json` 같은 항목도 탐색된 경로와 일치합니다.
pub struct ReferencedSbomFilter {
    root: PathBuf,
    referenced: HashSet<String>,
}

impl ReferencedSbomFilter {
    pub fn new<I, P>(root: &Path, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let referenced = paths
            .into_iter()
            .filter_map(|p| drop_key(root, p.as_ref()))
            .collect();
        Self {
            root: root.to_path_buf(),
            referenced,
        }
    }
}

impl PathFilter for ReferencedSbomFilter {
    fn name(&self) -> &str {
        "referenced-sbom"
    }

    fn error_kind(&self) -> ErrorKind {
        ErrorKind::ReferencedSbomFile
    }

    fn is_valid(&self, path: &Path) -> bool {
        drop_key(&self.root, path).is_none_or(|key| !self.referenced.contains(&key))
    }
}

/// 빌드 드롭 안의 경로를 조정 키(`/dir/file.txt`, 소문자)로 바꿉니다.
fn drop_key(root: &Path, path: &Path) -> Option<String> {
    manifest_path(root, path).map(|p| path_key(&p))
}

/// 순차 필터 체인
#[derive(Clone)]
pub struct FilterChain {
    root: PathBuf,
    filters: Vec<Arc<dyn PathFilter>>,
}

impl FilterChain {
    /// 에러 경로를 `root` 기준 매니페스트 경로로 보고하는 빈 체인
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl PathFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// 경로를 검사해 처음 실패한 필터의 에러 종류를 반환합니다.
    pub fn check(&self, path: &Path) -> Option<ErrorKind> {
        self.filters
            .iter()
            .find(|filter| !filter.is_valid(path))
            .map(|filter| {
                debug!(path = %path.display(), filter = filter.name(), "path filtered");
                filter.error_kind()
            })
    }

    /// 입력 스트림에 체인을 적용합니다.
    pub fn apply(&self, mut input: StreamReader<PathBuf>) -> StageOutput<PathBuf> {
        let (passed, items) = channel();
        let (errors, error_reader) = channel();
        let chain = self.clone();

        tokio::spawn(async move {
            while let Some(path) = input.read().await {
                match chain.check(&path) {
                    None => {
                        passed.write(path);
                    }
                    Some(kind) => {
                        metrics::counter!(
                            m::PIPELINE_FILES_FILTERED_TOTAL,
                            m::LABEL_KIND => kind.as_str()
                        )
                        .increment(1);
                        let reported = manifest_path(&chain.root, &path)
                            .unwrap_or_else(|| path.display().to_string());
                        errors.write(FileValidationResult::new(reported, kind));
                    }
                }
            }
        });

        StageOutput::new(items, error_reader)
    }
}
