//! 워크플로우 에러 타입
//!
//! [`WorkflowError`]는 워크플로우 전체를 중단시키는 조건을 나타냅니다.
//! `From<WorkflowError> for SbomError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **설정**: `Config`
//! - **파이프라인/문서**: `Stage`, `Spdx`
//! - **Lockfile 파싱**: `LockfileParse`
//! - **출력 디렉토리**: `OutputDirNotEmpty`
//! - **서명**: `SignatureInvalid`
//! - **집계**: `Aggregation`
//! - **파일 I/O / 태스크**: `Io`, `TaskJoin`

use sbomforge_core::error::{ConfigError, PipelineError, SbomError, WorkflowFailure};
use sbomforge_pipeline::StageError;
use sbomforge_spdx::SpdxError;

/// 워크플로우 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파이프라인 단계 시작 실패
    #[error(transparent)]
    Stage(#[from] StageError),

    /// 문서 생성/파싱 실패
    #[error(transparent)]
    Spdx(#[from] SpdxError),

    /// Lockfile 파싱 실패
    #[error("lockfile parse error: {path}: {reason}")]
    LockfileParse {
        /// 파싱 대상 파일 경로
        path: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 사용자 지정 출력 디렉토리가 비어있지 않음
    #[error("output directory is not empty: {path}")]
    OutputDirNotEmpty { path: String },

    /// 서명 검증 실패
    #[error("signature validation failed: {reason}")]
    SignatureInvalid { reason: String },

    /// 집계 실패
    #[error("aggregation failed: {0}")]
    Aggregation(String),

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 블로킹 태스크 합류 실패
    #[error("task join failed: {0}")]
    TaskJoin(String),
}

impl WorkflowError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn join(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}

impl From<WorkflowError> for SbomError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Config { field, reason } => {
                SbomError::Config(ConfigError::InvalidValue { field, reason })
            }
            WorkflowError::Stage(e) => e.into(),
            WorkflowError::Spdx(e) => e.into(),
            WorkflowError::LockfileParse { path, reason } => SbomError::Workflow(
                WorkflowFailure::ComponentScan(format!("{path}: {reason}")),
            ),
            WorkflowError::OutputDirNotEmpty { path } => {
                SbomError::Workflow(WorkflowFailure::OutputDirNotEmpty { path })
            }
            WorkflowError::SignatureInvalid { reason } => {
                SbomError::Workflow(WorkflowFailure::SignatureInvalid { reason })
            }
            WorkflowError::Aggregation(msg) => {
                SbomError::Workflow(WorkflowFailure::Aggregation(msg))
            }
            WorkflowError::Io { source, .. } => SbomError::Io(source),
            WorkflowError::TaskJoin(msg) => SbomError::Pipeline(PipelineError::TaskJoin(msg)),
        }
    }
}
