//! 외부 SBOM 문서 참조
//!
//! SBOM 목록 파일의 각 항목을 읽어 문서 이름과 네임스페이스를 꺼내고,
//! 파일 전체의 SHA1을 계산해 외부 문서 참조를 만듭니다. 참조된 파일은
//! 생성 단계의 파일 목록에서 `ReferencedSbomFile`로 제외됩니다.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use sbomforge_core::types::{
    ErrorKind, ExternalDocumentReference, FileValidationResult, HashAlgorithm,
};
use sbomforge_pipeline::{FileListReader, digest_hex};
use sbomforge_spdx::ids;

use crate::error::WorkflowError;

/// 외부 문서 참조 수집 결과
#[derive(Debug, Default)]
pub struct ExternalReferences {
    pub references: Vec<ExternalDocumentReference>,
    /// 목록에 있던 모든 경로 (읽기 실패 포함)
    pub paths: Vec<PathBuf>,
    pub errors: Vec<FileValidationResult>,
}

/// 참조 문서에서 읽는 최소 헤더
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentHeader {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    document_namespace: Option<String>,
    #[serde(default)]
    document_describes: Vec<String>,
}

/// SBOM 목록 파일을 읽어 외부 문서 참조를 만듭니다.
///
/// 목록 파일 자체를 읽지 못하면 에러, 개별 문서 실패는 `Other`로 누적합니다.
pub async fn collect_external_references(
    list_file: &Path,
    base: &Path,
) -> Result<ExternalReferences, WorkflowError> {
    let paths = FileListReader::read_paths(list_file, base).await?;

    let mut result = ExternalReferences::default();
    for path in &paths {
        match read_reference(path).await {
            Ok(reference) => {
                debug!(path = %path.display(), id = %reference.id, "external document reference");
                result.references.push(reference);
            }
            Err(reason) => {
                warn!(path = %path.display(), reason = %reason, "skipping external document");
                result.errors.push(FileValidationResult::new(
                    path.display().to_string(),
                    ErrorKind::Other,
                ));
            }
        }
    }
    result.paths = paths;
    Ok(result)
}

async fn read_reference(path: &Path) -> Result<ExternalDocumentReference, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    let header: DocumentHeader = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;

    let name = header
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| "document has no name".to_owned())?;
    let namespace = header
        .document_namespace
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| "document has no documentNamespace".to_owned())?;
    let sha1 = digest_hex(HashAlgorithm::Sha1, &bytes);

    Ok(ExternalDocumentReference {
        id: ids::document_ref_id(&name, &sha1),
        document_name: name,
        document_namespace: namespace,
        sha1,
        described_element_id: header
            .document_describes
            .into_iter()
            .next()
            .unwrap_or_else(|| ids::ROOT_PACKAGE_ID.to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_name_namespace_and_sha1() {
        let dir = tempfile::tempdir().unwrap();
        let doc = br#"{"name": "lib 1.0", "documentNamespace": "https://x/lib", "documentDescribes": ["SPDXRef-RootPackage"]}"#;
        std::fs::write(dir.path().join("lib.spdx.json"), doc).unwrap();
        std::fs::write(dir.path().join("broken.spdx.json"), b"{").unwrap();
        let list = dir.path().join("sboms.txt");
        std::fs::write(&list, "lib.spdx.json\n\nbroken.spdx.json\n").unwrap();

        let refs = collect_external_references(&list, dir.path()).await.unwrap();

        assert_eq!(refs.paths.len(), 2);
        assert_eq!(refs.references.len(), 1);
        let reference = &refs.references[0];
        assert_eq!(reference.document_name, "lib 1.0");
        assert_eq!(reference.sha1, digest_hex(HashAlgorithm::Sha1, doc));
        assert_eq!(reference.id, ids::document_ref_id("lib 1.0", &reference.sha1));
        assert_eq!(refs.errors.len(), 1);
        assert_eq!(refs.errors[0].kind, ErrorKind::Other);
    }

    #[tokio::test]
    async fn missing_list_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = collect_external_references(&dir.path().join("none.txt"), dir.path()).await;
        assert!(matches!(result, Err(WorkflowError::Stage(_))));
    }
}
