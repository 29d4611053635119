//! sbomforge SPDX 크레이트
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 (`SpdxError`)
//! - [`ids`]: 결정적 SPDX 식별자
//! - [`metadata`]: 문서 메타데이터 제공자 (`MetadataProvider`, `BuildMetadataProvider`)
//! - [`generator`]: 버전별 요소 생성기 (`DocumentGenerator`, `Spdx22Generator`, `Spdx30Generator`)
//! - [`writer`]: 스트리밍 JSON 작성기 (`ManifestWriter`)
//! - [`strategy`]: 버전별 직렬화 전략 (`SerializationStrategy`)
//! - [`relationships`]: 문서 관계 구성
//! - [`sbom_config`]: 버전별 출력 구성 (`SbomConfig`)
//! - [`emitter`]: 매니페스트 생성기 (`ManifestGenerator`, `DocumentContent`)
//! - [`parser`]: 스트리밍 매니페스트 파서 (`ManifestParser`, `ManifestVisitor`)
//! - [`content`]: 집계용 내용 추출 (`ContentProvider`, `MergeableContent`)
//!
//! # Architecture
//!
//! ```text
//! DocumentContent --> ManifestGenerator --> DocumentGenerator (2.2 | 3.0)
//!                            |                      |
//!                            |                   Element
//!                            |                      |
//!                            +------------> SerializationStrategy --> ManifestWriter --> manifest.spdx.json
//!
//! manifest.spdx.json --> ManifestParser --> ManifestVisitor (validate: FileRecord stream)
//!                                       \--> ContentProvider (aggregate: MergeableContent)
//! ```

pub mod content;
pub mod emitter;
pub mod error;
pub mod generator;
pub mod ids;
pub mod metadata;
pub mod parser;
pub mod relationships;
pub mod sbom_config;
pub mod strategy;
pub mod writer;

// --- Public API Re-exports ---

// Generation
pub use emitter::{DocumentContent, GenerationResult, ManifestGenerator, root_package, verification_code};
pub use generator::{
    DocumentGenerator, Element, GenerationContext, Spdx22Generator, Spdx30Generator,
    generator_for, required_algorithms,
};
pub use metadata::{BuildMetadataProvider, DocumentMetadata, MetadataProvider, TOOL_NAME};
pub use relationships::build_relationships;
pub use sbom_config::{MANIFEST_FILE_NAME, SbomConfig, manifest_file_path};
pub use strategy::{Section, SerializationStrategy};
pub use writer::ManifestWriter;

// Parsing
pub use content::{ContentProvider, MergeableContent, SpdxContentProvider, content_provider_for};
pub use parser::{DocumentInfo, ManifestParser, ManifestVisitor, ParserState};

// Error
pub use error::SpdxError;
