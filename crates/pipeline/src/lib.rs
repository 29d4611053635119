//! sbomforge 파이프라인 크레이트
//!
//! # Module Structure
//!
//! - [`stream`]: 완료 신호를 가진 비동기 스트림과 `split`/`merge` 조합자
//! - [`walker`]: 디렉토리 동시 탐색 (`DirectoryWalker`)
//! - [`list`]: 파일 목록 입력 (`FileListReader`)
//! - [`filter`]: 경로 필터 단계 (`PathFilter`, `FilterChain`)
//! - [`hasher`]: 다이제스트 계산 단계 (`HashProvider`, `FileHasher`)
//! - [`expectation`]: 매니페스트 기대값 맵 (`ManifestExpectationMap`)
//! - [`integrity`]: 경로 키 기반 무결성 조정 엔진 (`IntegrityValidator`)
//!
//! # Architecture
//!
//! ```text
//! root --> DirectoryWalker --> FilterChain --> FileHasher --+
//!                                                           |
//!                                                         merge --> IntegrityValidator
//!                                                           |             |
//! manifest --> (parser) --> ManifestExpectationMap <--------+-------------+
//! ```
//!
//! 모든 단계는 (항목 스트림, 에러 스트림) 쌍을 반환하고,
//! 단계가 어떤 경로로 끝나든 두 스트림을 모두 완료시킵니다.

pub mod error;
pub mod expectation;
pub mod filter;
pub mod hasher;
pub mod integrity;
pub mod list;
pub mod stream;
pub mod walker;

// --- Public API Re-exports ---

pub use error::StageError;
pub use expectation::ManifestExpectationMap;
pub use filter::{
    FilterChain, ManifestFolderFilter, PathFilter, ReferencedSbomFilter, RootPathFilter,
};
pub use hasher::{DefaultHashProvider, FileHasher, HashProvider, digest_hex, hash_path};
pub use integrity::{IntegrityOutcome, IntegrityValidator, Observation};
pub use list::FileListReader;
pub use stream::{
    ErrorReader, ErrorWriter, StageOutput, StreamReader, StreamWriter, channel, merge, split,
};
pub use walker::DirectoryWalker;
