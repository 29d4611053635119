//! 문서 관계 구성
//!
//! 파일, 패키지, 외부 참조로부터 문서에 기록할 관계 목록을 만듭니다.
//! 같은 (source, type, target) 관계는 한 번만 나오고, 목록 안에 없는
//! 패키지를 가리키는 의존 관계는 버립니다.

use std::collections::HashSet;

use tracing::debug;

use sbomforge_core::types::{
    ExternalDocumentReference, FileRecord, PackageRecord, RelationshipRecord, RelationshipType,
};

use crate::ids::{self, DOCUMENT_ID};

/// 관계 목록을 만듭니다.
///
/// - 문서 `DESCRIBES` 루트 패키지
/// - 루트 `CONTAINS` 각 파일
/// - 루트 `DEPENDS_ON` 다른 패키지가 의존하지 않는 최상위 패키지와 루트의 명시적 의존 대상
/// - 패키지 `DEPENDS_ON` 각 의존 패키지
/// - 루트 `DESCENDANT_OF` 각 외부 문서의 루트 요소
pub fn build_relationships(
    files: &[FileRecord],
    root: &PackageRecord,
    packages: &[PackageRecord],
    external_refs: &[ExternalDocumentReference],
) -> Vec<RelationshipRecord> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |record: RelationshipRecord| {
        if seen.insert(record.clone()) {
            out.push(record);
        }
    };

    push(RelationshipRecord::new(DOCUMENT_ID, &root.id, RelationshipType::Describes));

    for file in files {
        push(RelationshipRecord::new(&root.id, ids::file_id(file), RelationshipType::Contains));
    }

    let known: HashSet<&str> = packages.iter().map(|p| p.id.as_str()).collect();
    let dependents: HashSet<&str> = packages
        .iter()
        .filter(|p| p.id != root.id)
        .flat_map(|p| p.depends_on.iter().map(String::as_str))
        .collect();

    for target in &root.depends_on {
        if known.contains(target.as_str()) {
            push(RelationshipRecord::new(&root.id, target, RelationshipType::DependsOn));
        }
    }
    for package in packages.iter().filter(|p| p.id != root.id) {
        if !dependents.contains(package.id.as_str()) {
            push(RelationshipRecord::new(&root.id, &package.id, RelationshipType::DependsOn));
        }
    }

    for package in packages.iter().filter(|p| p.id != root.id) {
        for dependency in &package.depends_on {
            if !known.contains(dependency.as_str()) {
                debug!(package = %package.id, dependency = %dependency, "dependency not in package set, skipping");
                continue;
            }
            if dependency == &package.id {
                continue;
            }
            push(RelationshipRecord::new(&package.id, dependency, RelationshipType::DependsOn));
        }
    }

    for reference in external_refs {
        push(RelationshipRecord::new(
            &root.id,
            format!("{}:{}", reference.id, reference.described_element_id),
            RelationshipType::DescendantOf,
        ));
    }

    out
}
