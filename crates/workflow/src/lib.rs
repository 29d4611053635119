//! sbomforge 워크플로우 크레이트
//!
//! Generate / Validate / Aggregate 실행을 조립합니다. 파이프라인 단계와
//! SPDX 문서 계층을 엮고, 외부 협력자(컴포넌트 스캐너, 서명 검증기,
//! 메타데이터 제공자)를 trait 객체로 주입받습니다.
//!
//! # Module Structure
//!
//! - [`config`]: 실행 설정과 빌더 (`WorkflowConfig`, `WorkflowConfigBuilder`)
//! - [`error`]: 도메인 에러 (`WorkflowError`)
//! - [`generate`]: 생성 워크플로우 (`GenerateWorkflow`)
//! - [`validate`]: 검증 워크플로우 (`ValidateWorkflow`)
//! - [`aggregate`]: 집계 워크플로우 (`AggregateWorkflow`)
//! - [`output`]: 출력 디렉토리 수명주기와 `.sha256` 사이드카
//! - [`signing`]: 서명 검증 capability (`SignatureValidator`)
//! - [`scanner`]: 컴포넌트 스캔 capability (`ComponentScanner`, lockfile 파서)
//! - [`converter`]: 원시 패키지 -> `PackageRecord` 변환
//! - [`references`]: 외부 SBOM 문서 참조 수집
//! - [`conformance`]: NTIA 최소 요소 검사
//! - [`report`]: 검증 리포트 (JSON / 텍스트)
//!
//! # Example
//!
//! ```no_run
//! use sbomforge_workflow::{GenerateWorkflow, ValidateWorkflow, WorkflowConfigBuilder};
//! use sbomforge_core::types::Action;
//!
//! # async fn run() -> Result<(), sbomforge_workflow::WorkflowError> {
//! let config = WorkflowConfigBuilder::new()
//!     .build_drop_path("/drop")
//!     .package("app", "1.0.0")
//!     .package_supplier("Contoso")
//!     .build()?;
//! let generated = GenerateWorkflow::new(config.clone()).run().await?;
//! assert!(generated.success);
//!
//! let validate = WorkflowConfigBuilder::from_config(config)
//!     .action(Action::Validate)
//!     .build()?;
//! let outcome = ValidateWorkflow::new(validate).run().await?;
//! println!("{}", outcome.report.render_text());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod conformance;
pub mod converter;
pub mod error;
pub mod generate;
pub mod output;
pub mod references;
pub mod report;
pub mod scanner;
pub mod signing;
pub mod validate;

// --- Public API Re-exports ---

// Config
pub use config::{AggregateSource, DEFAULT_MANIFEST_DIR_NAME, WorkflowConfig, WorkflowConfigBuilder};
pub use conformance::Conformance;

// Workflows
pub use aggregate::{AggregateOutcome, AggregateWorkflow, SourceState, SourceStatus};
pub use generate::{GenerateInput, GenerateOutcome, GeneratedManifest, GenerateWorkflow};
pub use validate::{ValidateWorkflow, ValidationOutcome};

// Collaborators
pub use scanner::{ComponentScan, ComponentScanner, LockfileComponentScanner, RawPackage};
pub use signing::{
    BoxFuture, NoopSignatureValidator, SidecarHashValidator, SignatureOutcome, SignatureValidator,
};

// Output
pub use output::{OutputDirectory, manifest_digest, sidecar_path, write_sidecar};
pub use report::{ReportResult, ReportSummary, ValidationReport};

// Error
pub use error::WorkflowError;
