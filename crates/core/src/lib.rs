//! sbomforge 공통 크레이트
//!
//! 모든 sbomforge 크레이트가 공유하는 도메인 타입, 에러 분류, 설정, 메트릭 이름을 정의합니다.
//!
//! - [`error`]: 최상위 에러 [`SbomError`]와 영역별 하위 에러
//! - [`types`]: 파일/패키지/관계 레코드, 에러 종류 분류([`ErrorKind`])
//! - [`config`]: `sbomforge.toml` 설정 로딩 ([`ForgeConfig`])
//! - [`metrics`]: 메트릭 이름 상수와 설명 등록
//! - [`telemetry`]: 실행 단위 텔레메트리 기록기 ([`RunRecorder`])

pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ManifestError, PipelineError, SbomError, WorkflowFailure};

// 설정
pub use config::ForgeConfig;

// 텔레메트리
pub use telemetry::{RunRecorder, RunSummary};

// 도메인 타입
pub use types::{
    Action, ErrorKind, ExternalDocumentReference, FileLocation, FileRecord, FileType,
    FileValidationResult, HashAlgorithm, LicenseInfo, ManifestVersion, PackageRecord,
    RelationshipRecord, RelationshipType,
};
