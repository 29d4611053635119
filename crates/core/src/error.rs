//! 에러 타입: 영역별 에러 정의
//!
//! 파일 단위로 복구 가능한 실패(누락 파일, 해시 불일치 등)는 Rust 에러가 아니라
//! [`FileValidationResult`](crate::types::FileValidationResult) 값으로 에러 스트림에 흐릅니다.
//! 여기 정의된 타입은 워크플로우 전체를 중단시키는 치명적 조건만 표현합니다.

/// sbomforge 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SbomError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 단계 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 매니페스트 문서 에러
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// 워크플로우 수준 실패
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowFailure),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SbomError {
    /// 매니페스트 구조 자체가 잘못된 치명적 에러인지 확인합니다.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::Manifest(ManifestError::InvalidInputFile { .. }))
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 단계 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 탐색 루트가 존재하지 않음
    #[error("walk root does not exist: {path}")]
    RootNotFound { path: String },

    /// 입력 목록 파일 읽기 실패
    #[error("failed to read list file {path}: {reason}")]
    ListFile { path: String, reason: String },

    /// 백그라운드 태스크 합류 실패
    #[error("task join failed: {0}")]
    TaskJoin(String),
}

/// 매니페스트 문서 에러
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// 매니페스트 구조가 잘못됨 (치명적)
    #[error("invalid input file {path}: {reason}")]
    InvalidInputFile { path: String, reason: String },

    /// 지원하지 않는 매니페스트 버전
    #[error("unsupported manifest version: {0}")]
    UnsupportedVersion(String),

    /// 문서 직렬화 실패
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// 워크플로우 수준 실패
#[derive(Debug, thiserror::Error)]
pub enum WorkflowFailure {
    /// 사용자 지정 출력 디렉토리가 비어있지 않음
    #[error("output directory is not empty: {path}")]
    OutputDirNotEmpty { path: String },

    /// 서명 검증 실패
    #[error("signature validation failed: {reason}")]
    SignatureInvalid { reason: String },

    /// 생성 단계에서 에러가 누적됨
    #[error("generation failed with {errors} error(s)")]
    GenerationFailed { errors: usize },

    /// 집계 실패
    #[error("aggregation failed: {0}")]
    Aggregation(String),

    /// 컴포넌트 스캔 실패
    #[error("component scan failed: {0}")]
    ComponentScan(String),
}
