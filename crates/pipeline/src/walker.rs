//! 디렉토리 동시 탐색
//!
//! [`DirectoryWalker`]는 디렉토리의 파일을 먼저 내보낸 뒤, 하위 디렉토리마다
//! 별도 태스크를 띄워 재귀 탐색합니다. 태스크 fan-out에는 상한이 없어
//! 아주 넓거나 깊은 트리에서는 태스크 수가 디렉토리 수만큼 늘어납니다.
//!
//! 디렉토리 하나를 열거하지 못하면(권한 거부 등) 그 디렉토리에 대해 `Other`
//! 에러 하나만 내보내고 형제/상위 탐색은 계속됩니다.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{debug, warn};

use sbomforge_core::metrics as m;
use sbomforge_core::types::{ErrorKind, FileValidationResult};

use crate::error::StageError;
use crate::stream::{ErrorWriter, StageOutput, StreamWriter, channel};

/// 디렉토리 탐색기
#[derive(Debug, Clone, Copy)]
pub struct DirectoryWalker {
    follow_symlinks: bool,
}

/// 탐색 태스크들이 공유하는 상태
struct WalkContext {
    follow_symlinks: bool,
    /// 심볼릭 링크 추적 시 방문한 정규 경로 (순환 방지)
    visited: DashSet<PathBuf>,
}

impl DirectoryWalker {
    pub fn new(follow_symlinks: bool) -> Self {
        Self { follow_symlinks }
    }

    /// 루트부터 탐색을 시작합니다.
    ///
    /// 루트가 없거나 디렉토리가 아니면 스트림을 만들지 않고 즉시 실패합니다.
    pub fn walk(&self, root: &Path) -> Result<StageOutput<PathBuf>, StageError> {
        if !root.is_dir() {
            return Err(StageError::RootNotFound {
                path: root.display().to_string(),
            });
        }

        let (paths, items) = channel();
        let (errors, error_reader) = channel();
        let context = Arc::new(WalkContext {
            follow_symlinks: self.follow_symlinks,
            visited: DashSet::new(),
        });

        debug!(root = %root.display(), follow_symlinks = self.follow_symlinks, "starting walk");
        tokio::spawn(walk_dir(root.to_path_buf(), context, paths, errors));

        Ok(StageOutput::new(items, error_reader))
    }
}

fn walk_dir(
    dir: PathBuf,
    context: Arc<WalkContext>,
    paths: StreamWriter<PathBuf>,
    errors: ErrorWriter,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        if context.follow_symlinks {
            match tokio::fs::canonicalize(&dir).await {
                Ok(canonical) => {
                    if !context.visited.insert(canonical) {
                        debug!(dir = %dir.display(), "directory already visited, skipping");
                        return;
                    }
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to canonicalize directory");
                    errors.write(FileValidationResult::new(
                        dir.display().to_string(),
                        ErrorKind::Other,
                    ));
                    return;
                }
            }
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to enumerate directory");
                errors.write(FileValidationResult::new(
                    dir.display().to_string(),
                    ErrorKind::Other,
                ));
                return;
            }
        };

        let mut subdirs = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "directory enumeration interrupted");
                    errors.write(FileValidationResult::new(
                        dir.display().to_string(),
                        ErrorKind::Other,
                    ));
                    break;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read file type");
                    errors.write(FileValidationResult::new(
                        path.display().to_string(),
                        ErrorKind::Other,
                    ));
                    continue;
                }
            };

            if file_type.is_symlink() {
                if !context.follow_symlinks {
                    debug!(path = %path.display(), "skipping symlink");
                    continue;
                }
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_dir() => subdirs.push(path),
                    Ok(_) => emit_file(&paths, path),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "dangling symlink");
                        errors.write(FileValidationResult::new(
                            path.display().to_string(),
                            ErrorKind::Other,
                        ));
                    }
                }
            } else if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                emit_file(&paths, path);
            }
        }

        for subdir in subdirs {
            tokio::spawn(walk_dir(
                subdir,
                Arc::clone(&context),
                paths.clone(),
                errors.clone(),
            ));
        }
    })
}

fn emit_file(paths: &StreamWriter<PathBuf>, path: PathBuf) {
    metrics::counter!(m::PIPELINE_FILES_DISCOVERED_TOTAL).increment(1);
    paths.write(path);
}
