//! 파이프라인 단계 에러 타입
//!
//! 파일 단위 실패는 에러 스트림으로 흐르므로, [`StageError`]는
//! 단계를 시작조차 할 수 없는 치명적 조건만 나타냅니다.

use sbomforge_core::error::{PipelineError, SbomError};

/// 파이프라인 단계 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// 탐색 루트가 없거나 디렉토리가 아님
    #[error("walk root does not exist or is not a directory: {path}")]
    RootNotFound {
        /// 루트 경로
        path: String,
    },

    /// 파일 목록 읽기 실패
    #[error("failed to read list file: {path}: {source}")]
    ListFile {
        /// 목록 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<StageError> for SbomError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::RootNotFound { path } => {
                SbomError::Pipeline(PipelineError::RootNotFound { path })
            }
            StageError::ListFile { path, source } => SbomError::Pipeline(PipelineError::ListFile {
                path,
                reason: source.to_string(),
            }),
        }
    }
}
