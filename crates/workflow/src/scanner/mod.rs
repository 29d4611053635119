//! 컴포넌트 스캐너
//!
//! [`ComponentScanner`]는 빌드 산출물에서 원시 패키지 레코드를 찾아내는
//! capability입니다. 기본 구현 [`LockfileComponentScanner`]는 빌드 루트를
//! 재귀 탐색하여 `Cargo.lock`과 `package-lock.json`을 파싱합니다.
//!
//! 읽거나 파싱하지 못한 lockfile은 경고 후 건너뛰고
//! [`ComponentScan::failed_sources`]에 남깁니다.

pub mod cargo;
pub mod lockfile;
pub mod npm;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::WorkflowError;
use cargo::CargoLockParser;
use lockfile::{LockfileDetector, LockfileParser};
use npm::NpmLockParser;

/// lockfile 기본 최대 크기 (10 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// 탐색하지 않는 디렉토리 이름
const SKIPPED_DIRS: [&str; 3] = [".git", "node_modules", "target"];

/// 패키지 생태계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    /// Rust (Cargo.lock)
    Cargo,
    /// JavaScript/TypeScript (package-lock.json)
    Npm,
}

impl Ecosystem {
    /// Package URL 타입 (`pkg:<type>/...`)
    pub fn purl_type(&self) -> &'static str {
        match self {
            Self::Cargo => "cargo",
            Self::Npm => "npm",
        }
    }

    /// 패키지 이름과 버전으로 PURL을 생성합니다.
    pub fn purl(&self, name: &str, version: &str) -> String {
        format!("pkg:{}/{}@{}", self.purl_type(), name, version)
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.purl_type())
    }
}

/// 의존성 참조 (버전은 lockfile이 명시할 때만)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: Option<String>,
}

/// 스캐너가 내놓는 원시 패키지 레코드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPackage {
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
    pub purl: String,
    /// lockfile에 기록된 체크섬 (Cargo: SHA256 hex, npm: SRI integrity)
    pub checksum: Option<String>,
    pub license: Option<String>,
    pub dependencies: Vec<Dependency>,
    /// 원본 lockfile 경로
    pub source_file: String,
}

impl fmt::Display for RawPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.ecosystem)
    }
}

/// 스캔 결과
#[derive(Debug, Default)]
pub struct ComponentScan {
    pub packages: Vec<RawPackage>,
    /// 읽거나 파싱하지 못한 lockfile
    pub failed_sources: Vec<String>,
}

/// 컴포넌트 스캔 capability
///
/// 블로킹 I/O를 수행하므로 호출자는 `spawn_blocking`에서 실행합니다.
pub trait ComponentScanner: Send + Sync {
    fn name(&self) -> &str;

    fn scan(&self, root: &Path) -> Result<ComponentScan, WorkflowError>;
}

/// lockfile 기반 기본 스캐너
pub struct LockfileComponentScanner {
    detector: LockfileDetector,
    parsers: Vec<Box<dyn LockfileParser>>,
    max_file_size: u64,
    excluded: Vec<PathBuf>,
}

impl LockfileComponentScanner {
    pub fn new() -> Self {
        Self {
            detector: LockfileDetector::new(),
            parsers: vec![Box::new(CargoLockParser), Box::new(NpmLockParser)],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            excluded: Vec::new(),
        }
    }

    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// 탐색에서 제외할 디렉토리 (예: 매니페스트 출력 디렉토리)
    pub fn with_excluded_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    fn parser_for(&self, path: &Path) -> Option<&dyn LockfileParser> {
        self.parsers
            .iter()
            .find(|parser| parser.can_parse(path))
            .map(|parser| parser.as_ref())
    }

    fn parse_file(&self, path: &Path) -> Option<Vec<RawPackage>> {
        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read lockfile metadata");
                return None;
            }
        };
        if metadata.len() > self.max_file_size {
            warn!(
                path = %path.display(),
                size = metadata.len(),
                max = self.max_file_size,
                "lockfile too large, skipping"
            );
            return None;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read lockfile");
                return None;
            }
        };

        let parser = self.parser_for(path)?;
        match parser.parse(&content, &path.display().to_string()) {
            Ok(packages) => {
                debug!(
                    path = %path.display(),
                    ecosystem = %parser.ecosystem(),
                    packages = packages.len(),
                    "lockfile parsed"
                );
                Some(packages)
            }
            Err(e) => {
                warn!(error = %e, "failed to parse lockfile, skipping");
                None
            }
        }
    }
}

impl Default for LockfileComponentScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentScanner for LockfileComponentScanner {
    fn name(&self) -> &str {
        "lockfile"
    }

    fn scan(&self, root: &Path) -> Result<ComponentScan, WorkflowError> {
        let lockfiles = discover_lockfiles(root, &self.detector, &self.excluded)?;

        let mut scan = ComponentScan::default();
        for path in &lockfiles {
            match self.parse_file(path) {
                Some(packages) => scan.packages.extend(packages),
                None => scan.failed_sources.push(path.display().to_string()),
            }
        }

        info!(
            root = %root.display(),
            lockfiles = lockfiles.len(),
            packages = scan.packages.len(),
            failed = scan.failed_sources.len(),
            "component scan completed"
        );
        Ok(scan)
    }
}

/// 빌드 루트 아래의 lockfile을 찾습니다.
///
/// 루트 자체를 읽지 못하면 에러, 하위 디렉토리 읽기 실패는 경고 후 건너뜁니다.
fn discover_lockfiles(
    root: &Path,
    detector: &LockfileDetector,
    excluded: &[PathBuf],
) -> Result<Vec<PathBuf>, WorkflowError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut is_root = true;

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(WorkflowError::io(&dir, e)),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to read directory, skipping");
                continue;
            }
        };
        is_root = false;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "failed to read directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                let skipped = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name));
                if !skipped && !excluded.iter().any(|dir| path.starts_with(dir)) {
                    pending.push(path);
                }
            } else if file_type.is_file() && detector.is_lockfile(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}
