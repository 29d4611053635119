//! 집계용 병합 가능 내용 추출
//!
//! 검증을 통과한 원본 매니페스트에서 패키지와 관계만 꺼냅니다.
//! `DEPENDS_ON` 관계는 원본 패키지의 `depends_on` 목록으로 접어 넣어
//! 병합 후 관계를 다시 계산할 수 있게 합니다.

use std::collections::HashMap;

use sbomforge_core::types::{
    ExternalDocumentReference, FileRecord, ManifestVersion, PackageRecord, RelationshipRecord,
    RelationshipType,
};

use crate::error::SpdxError;
use crate::parser::{ManifestParser, ManifestVisitor};

/// 원본 하나에서 추출한 병합 가능 내용
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeableContent {
    /// 원본 식별자 (매니페스트 경로)
    pub source: String,
    pub document_name: String,
    pub namespace: String,
    /// 문서가 기술하는 루트 요소 ID
    pub root_ids: Vec<String>,
    pub packages: Vec<PackageRecord>,
    pub relationships: Vec<RelationshipRecord>,
}

impl MergeableContent {
    /// 루트 패키지 레코드들
    pub fn root_packages(&self) -> impl Iterator<Item = &PackageRecord> {
        self.packages
            .iter()
            .filter(|p| self.root_ids.iter().any(|id| id == &p.id))
    }
}

/// 버전별 내용 추출 capability
pub trait ContentProvider: Send + Sync {
    fn version(&self) -> ManifestVersion;

    fn extract(&self, source: &str, bytes: &[u8]) -> Result<MergeableContent, SpdxError>;
}

/// 스트리밍 파서 기반 기본 제공자
#[derive(Debug, Clone, Copy)]
pub struct SpdxContentProvider {
    version: ManifestVersion,
}

impl SpdxContentProvider {
    pub fn new(version: ManifestVersion) -> Self {
        Self { version }
    }
}

#[derive(Default)]
struct Collector {
    packages: Vec<PackageRecord>,
    relationships: Vec<RelationshipRecord>,
}

impl ManifestVisitor for Collector {
    fn on_file(&mut self, _file: FileRecord) {}

    fn on_package(&mut self, package: PackageRecord) {
        self.packages.push(package);
    }

    fn on_relationship(&mut self, relationship: RelationshipRecord) {
        if matches!(
            relationship.relationship_type,
            RelationshipType::DependsOn | RelationshipType::Describes
        ) {
            self.relationships.push(relationship);
        }
    }

    fn on_reference(&mut self, _reference: ExternalDocumentReference) {}
}

impl ContentProvider for SpdxContentProvider {
    fn version(&self) -> ManifestVersion {
        self.version
    }

    fn extract(&self, source: &str, bytes: &[u8]) -> Result<MergeableContent, SpdxError> {
        let mut collector = Collector::default();
        let info = ManifestParser::new(self.version, source).parse(bytes, &mut collector)?;

        let mut packages = collector.packages;
        let index: HashMap<String, usize> = packages
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        for relationship in &collector.relationships {
            if relationship.relationship_type != RelationshipType::DependsOn {
                continue;
            }
            let (Some(&from), true) = (
                index.get(&relationship.source_id),
                index.contains_key(&relationship.target_id),
            ) else {
                continue;
            };
            let deps = &mut packages[from].depends_on;
            if !deps.contains(&relationship.target_id) {
                deps.push(relationship.target_id.clone());
            }
        }

        let root_ids = if info.describes.is_empty() {
            collector
                .relationships
                .iter()
                .filter(|r| r.relationship_type == RelationshipType::Describes)
                .map(|r| r.target_id.clone())
                .collect()
        } else {
            info.describes
        };

        Ok(MergeableContent {
            source: source.to_owned(),
            document_name: info.name.unwrap_or_default(),
            namespace: info.namespace.unwrap_or_default(),
            root_ids,
            packages,
            relationships: collector.relationships,
        })
    }
}

/// 버전에 맞는 내용 제공자를 반환합니다.
pub fn content_provider_for(version: ManifestVersion) -> Box<dyn ContentProvider> {
    Box::new(SpdxContentProvider::new(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "files": [{"fileName": "./a", "checksums": []}],
        "packages": [
            {"SPDXID": "SPDXRef-RootPackage", "name": "app", "versionInfo": "1.0"},
            {"SPDXID": "SPDXRef-Package-a", "name": "a", "versionInfo": "1.0"},
            {"SPDXID": "SPDXRef-Package-b", "name": "b", "versionInfo": "2.0"}
        ],
        "relationships": [
            {"spdxElementId": "SPDXRef-DOCUMENT", "relatedSpdxElement": "SPDXRef-RootPackage", "relationshipType": "DESCRIBES"},
            {"spdxElementId": "SPDXRef-RootPackage", "relatedSpdxElement": "SPDXRef-Package-a", "relationshipType": "DEPENDS_ON"},
            {"spdxElementId": "SPDXRef-Package-a", "relatedSpdxElement": "SPDXRef-Package-b", "relationshipType": "DEPENDS_ON"},
            {"spdxElementId": "SPDXRef-Package-a", "relatedSpdxElement": "SPDXRef-Package-b", "relationshipType": "DEPENDS_ON"},
            {"spdxElementId": "SPDXRef-RootPackage", "relatedSpdxElement": "SPDXRef-File-a", "relationshipType": "CONTAINS"}
        ],
        "spdxVersion": "SPDX-2.2",
        "name": "app 1.0",
        "documentNamespace": "https://x/app",
        "documentDescribes": ["SPDXRef-RootPackage"]
    }"#;

    #[test]
    fn folds_dependencies_into_packages() {
        let content = SpdxContentProvider::new(ManifestVersion::Spdx22)
            .extract("app/manifest.spdx.json", DOC.as_bytes())
            .unwrap();

        assert_eq!(content.document_name, "app 1.0");
        assert_eq!(content.root_ids, vec!["SPDXRef-RootPackage"]);
        assert_eq!(content.packages.len(), 3);

        let a = content.packages.iter().find(|p| p.id == "SPDXRef-Package-a").unwrap();
        assert_eq!(a.depends_on, vec!["SPDXRef-Package-b"]);
        let root: Vec<_> = content.root_packages().collect();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].depends_on, vec!["SPDXRef-Package-a"]);

        assert!(
            content
                .relationships
                .iter()
                .all(|r| r.relationship_type != RelationshipType::Contains)
        );
    }

    #[test]
    fn invalid_manifest_propagates() {
        let err = content_provider_for(ManifestVersion::Spdx22)
            .extract("bad", b"not json")
            .unwrap_err();
        assert!(matches!(err, SpdxError::InvalidInput { .. }));
    }
}
