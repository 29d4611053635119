//! SPDX 식별자 생성
//!
//! 모든 ID는 입력만으로 결정되므로 같은 트리를 다시 생성해도 같은 ID가 나옵니다.

use sbomforge_core::types::{FileRecord, HashAlgorithm, path_key};
use sbomforge_pipeline::digest_hex;

/// 문서 요소 ID
pub const DOCUMENT_ID: &str = "SPDXRef-DOCUMENT";

/// 루트 패키지 ID
pub const ROOT_PACKAGE_ID: &str = "SPDXRef-RootPackage";

/// ID 접미어로 쓰는 다이제스트 길이
const ID_DIGEST_LEN: usize = 16;

/// SPDX ID에 허용되지 않는 문자를 `-`로 바꿉니다.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '-' })
        .collect()
}

fn short_digest(value: &str) -> String {
    let mut digest = digest_hex(HashAlgorithm::Sha256, value.as_bytes());
    digest.truncate(ID_DIGEST_LEN);
    digest
}

/// 파일 ID (`SPDXRef-File--bin-a.txt-<digest>`)
///
/// 다이제스트는 대소문자를 무시한 경로 키에서 계산합니다.
pub fn file_id(file: &FileRecord) -> String {
    format!(
        "SPDXRef-File-{}-{}",
        sanitize(&file.path),
        short_digest(&path_key(&file.path))
    )
}

/// 패키지 ID (`SPDXRef-Package-<sha256(name@version) 앞부분>`)
pub fn package_id(name: &str, version: &str) -> String {
    format!("SPDXRef-Package-{}", short_digest(&format!("{name}@{version}")))
}

/// 외부 문서 참조 ID (`DocumentRef-<name>-<sha1>`)
pub fn document_ref_id(document_name: &str, sha1: &str) -> String {
    format!("DocumentRef-{}-{}", sanitize(document_name), sha1)
}

/// 3.0 조직 요소 지역 ID
pub fn organization_id(name: &str) -> String {
    format!("SPDXRef-Organization-{}", short_digest(name))
}

/// 3.0 라이선스 표현식 요소 지역 ID
pub fn license_id(expression: &str) -> String {
    format!("SPDXRef-LicenseExpression-{}", short_digest(expression))
}

/// 3.0 관계 요소 지역 ID
pub fn relationship_id(source: &str, kind: &str, target: &str) -> String {
    format!(
        "SPDXRef-Relationship-{}",
        short_digest(&format!("{source}|{kind}|{target}"))
    )
}

/// 3.0 IRI(`<namespace>#<id>`)에서 지역 ID를 꺼냅니다.
pub fn local_id(iri: &str) -> &str {
    iri.rsplit_once('#').map_or(iri, |(_, local)| local)
}
