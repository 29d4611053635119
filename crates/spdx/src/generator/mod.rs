//! 버전별 문서 요소 생성기
//!
//! 파일, 패키지, 관계, 외부 문서 참조 하나를 스키마 버전에 맞는 JSON
//! 요소로 바꿉니다. 생성기는 상태가 없으며, 요소를 어느 배열에 어떻게
//! 쓸지는 [`SerializationStrategy`](crate::strategy::SerializationStrategy)가 정합니다.

pub mod spdx22;
pub mod spdx30;

use std::collections::HashMap;

use serde_json::Value;

use sbomforge_core::types::{
    ErrorKind, ExternalDocumentReference, FileRecord, HashAlgorithm, ManifestVersion,
    PackageRecord, RelationshipRecord,
};

use crate::metadata::DocumentMetadata;

pub use spdx22::Spdx22Generator;
pub use spdx30::Spdx30Generator;

/// 생성된 문서 요소
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// 중복 제거 키 (3.0에서는 `spdxId`)
    pub id: String,
    pub value: Value,
}

impl Element {
    pub fn new(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

/// 요소 생성 중 공유되는 문서 단위 문맥
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub metadata: DocumentMetadata,
    /// 외부 문서 참조 ID -> 참조 문서 네임스페이스
    pub external_namespaces: HashMap<String, String>,
}

impl GenerationContext {
    pub fn new(metadata: DocumentMetadata, references: &[ExternalDocumentReference]) -> Self {
        let external_namespaces = references
            .iter()
            .map(|r| (r.id.clone(), r.document_namespace.clone()))
            .collect();
        Self {
            metadata,
            external_namespaces,
        }
    }

    /// 지역 ID를 3.0 IRI로 바꿉니다.
    ///
    /// `DocumentRef-x:SPDXRef-y` 형태는 참조 문서의 네임스페이스로 풀립니다.
    pub fn iri(&self, id: &str) -> String {
        let external = id.split_once(':').and_then(|(doc_ref, element)| {
            self.external_namespaces
                .get(doc_ref)
                .map(|namespace| format!("{namespace}#{element}"))
        });
        external.unwrap_or_else(|| format!("{}#{}", self.metadata.namespace, id))
    }
}

/// 요소 생성 capability
pub trait DocumentGenerator: Send + Sync {
    fn version(&self) -> ManifestVersion;

    /// 파일 요소에 필요한 다이제스트 알고리즘
    fn required_algorithms(&self) -> &'static [HashAlgorithm];

    fn file(&self, file: &FileRecord, ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind>;

    fn package(&self, package: &PackageRecord, ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind>;

    /// 루트 패키지. 2.2에서는 파일 SHA1로 계산한 검증 코드를 함께 씁니다.
    fn root_package(
        &self,
        root: &PackageRecord,
        verification_code: Option<&str>,
        ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind>;

    fn relationship(
        &self,
        relationship: &RelationshipRecord,
        ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind>;

    fn external_reference(
        &self,
        reference: &ExternalDocumentReference,
        ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind>;
}

/// 버전에 맞는 생성기를 반환합니다.
pub fn generator_for(version: ManifestVersion) -> Box<dyn DocumentGenerator> {
    match version {
        ManifestVersion::Spdx22 => Box::new(Spdx22Generator),
        ManifestVersion::Spdx30 => Box::new(Spdx30Generator),
    }
}

/// 여러 버전이 요구하는 알고리즘의 합집합 (정렬됨)
pub fn required_algorithms(versions: &[ManifestVersion]) -> Vec<HashAlgorithm> {
    let mut algorithms: Vec<HashAlgorithm> = versions
        .iter()
        .flat_map(|v| generator_for(*v).required_algorithms().to_vec())
        .collect();
    algorithms.sort();
    algorithms.dedup();
    algorithms
}

/// 라이선스 필드 값. 비어 있으면 `NOASSERTION`.
pub(crate) fn license_or_noassertion(license: Option<&String>) -> String {
    license
        .filter(|l| !l.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| "NOASSERTION".to_owned())
}
