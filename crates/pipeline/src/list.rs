//! 파일 목록 입력
//!
//! 디렉토리 탐색 대신 텍스트 파일의 경로 목록을 스트림으로 내보냅니다.
//! 한 줄에 경로 하나, 빈 줄은 무시합니다. 상대 경로는 기준 디렉토리에
//! 붙여 해석합니다.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use sbomforge_core::metrics as m;
use sbomforge_core::types::{ErrorKind, FileValidationResult};

use crate::error::StageError;
use crate::stream::{StageOutput, StreamReader, channel};

/// 경로 목록 파일 읽기
pub struct FileListReader;

impl FileListReader {
    /// 목록 파일을 읽어 경로 스트림을 만듭니다.
    ///
    /// 목록 파일 자체를 읽지 못하면 즉시 실패합니다. 목록의 항목 중
    /// 존재하지 않는 파일은 `Other` 에러로 스트림에 보고됩니다.
    pub async fn read(list_file: &Path, base: &Path) -> Result<StageOutput<PathBuf>, StageError> {
        let content = tokio::fs::read_to_string(list_file)
            .await
            .map_err(|source| StageError::ListFile {
                path: list_file.display().to_string(),
                source,
            })?;

        let entries = parse_list(&content);
        debug!(
            list_file = %list_file.display(),
            count = entries.len(),
            "read file list"
        );

        let (paths, items) = channel();
        let (errors, error_reader) = channel();
        let base = base.to_path_buf();

        tokio::spawn(async move {
            for entry in entries {
                let path = resolve(&base, &entry);
                match tokio::fs::metadata(&path).await {
                    Ok(meta) if meta.is_file() => {
                        metrics::counter!(m::PIPELINE_FILES_DISCOVERED_TOTAL).increment(1);
                        paths.write(path);
                    }
                    Ok(_) => {
                        warn!(path = %path.display(), "list entry is not a regular file");
                        errors.write(FileValidationResult::new(
                            path.display().to_string(),
                            ErrorKind::Other,
                        ));
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "list entry not accessible");
                        errors.write(FileValidationResult::new(
                            path.display().to_string(),
                            ErrorKind::Other,
                        ));
                    }
                }
            }
        });

        Ok(StageOutput::new(items, error_reader))
    }

    /// 목록 파일을 읽어 경로만 반환합니다. 존재 여부는 확인하지 않습니다.
    pub async fn read_paths(list_file: &Path, base: &Path) -> Result<Vec<PathBuf>, StageError> {
        let content = tokio::fs::read_to_string(list_file)
            .await
            .map_err(|source| StageError::ListFile {
                path: list_file.display().to_string(),
                source,
            })?;
        Ok(parse_list(&content)
            .iter()
            .map(|entry| resolve(base, entry))
            .collect())
    }

    /// 이미 알고 있는 경로 목록을 완료된 스트림으로 감쌉니다.
    pub fn from_paths(paths: Vec<PathBuf>) -> StageOutput<PathBuf> {
        StageOutput::new(StreamReader::from_items(paths), StreamReader::empty())
    }
}

/// 목록 내용을 줄 단위로 나눕니다. 앞뒤 공백과 빈 줄은 제거합니다.
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

fn resolve(base: &Path, entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
