//! 매니페스트 생성기
//!
//! 카테고리 순서(파일, 패키지, 관계, 외부 참조)대로 요소를 생성해
//! 직렬화 전략에 넘깁니다. 요소 하나의 실패는 에러 목록에 쌓이고
//! 나머지 요소 생성은 계속됩니다. 파일 입출력 실패만 생성을 중단합니다.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use sbomforge_core::types::{
    ErrorKind, ExternalDocumentReference, FileRecord, FileValidationResult, HashAlgorithm,
    ManifestVersion, PackageRecord, RelationshipRecord,
};
use sbomforge_pipeline::digest_hex;

use crate::error::SpdxError;
use crate::generator::{DocumentGenerator, Element, GenerationContext, generator_for};
use crate::ids::ROOT_PACKAGE_ID;
use crate::metadata::DocumentMetadata;
use crate::relationships::build_relationships;
use crate::sbom_config::SbomConfig;
use crate::strategy::{Section, SerializationStrategy};

/// 한 문서에 들어갈 내용
#[derive(Debug, Clone, Default)]
pub struct DocumentContent {
    pub files: Vec<FileRecord>,
    pub root: PackageRecord,
    pub packages: Vec<PackageRecord>,
    pub relationships: Vec<RelationshipRecord>,
    pub external_refs: Vec<ExternalDocumentReference>,
}

impl DocumentContent {
    /// 관계 목록을 계산해 내용을 구성합니다.
    pub fn new(
        files: Vec<FileRecord>,
        root: PackageRecord,
        packages: Vec<PackageRecord>,
        external_refs: Vec<ExternalDocumentReference>,
    ) -> Self {
        let relationships = build_relationships(&files, &root, &packages, &external_refs);
        Self {
            files,
            root,
            packages,
            relationships,
            external_refs,
        }
    }
}

/// 메타데이터로 루트 패키지를 만듭니다.
pub fn root_package(metadata: &DocumentMetadata) -> PackageRecord {
    PackageRecord {
        id: ROOT_PACKAGE_ID.to_owned(),
        name: metadata.package_name.clone(),
        version: metadata.package_version.clone(),
        supplier: Some(metadata.supplier_field()),
        ..Default::default()
    }
}

/// SPDX 2.2 패키지 검증 코드
///
/// 파일 SHA1을 정렬해 이어 붙인 문자열의 SHA1입니다.
pub fn verification_code(files: &[FileRecord]) -> String {
    let mut digests: Vec<&str> = files
        .iter()
        .filter_map(|f| f.checksum(HashAlgorithm::Sha1))
        .collect();
    digests.sort_unstable();
    digest_hex(HashAlgorithm::Sha1, digests.concat().as_bytes())
}

/// 생성 결과
#[derive(Debug)]
pub struct GenerationResult {
    pub version: ManifestVersion,
    pub path: PathBuf,
    pub errors: Vec<FileValidationResult>,
    pub elements_written: usize,
}

/// 버전별 매니페스트 생성기
pub struct ManifestGenerator {
    config: SbomConfig,
    generator: Box<dyn DocumentGenerator>,
    strategy: SerializationStrategy,
    elements_written: usize,
}

impl ManifestGenerator {
    pub fn new(config: SbomConfig) -> Self {
        let version = config.version;
        Self {
            config,
            generator: generator_for(version),
            strategy: SerializationStrategy::for_version(version),
            elements_written: 0,
        }
    }

    pub fn version(&self) -> ManifestVersion {
        self.config.version
    }

    /// 문서를 생성해 파일에 씁니다.
    pub fn generate(mut self, content: &DocumentContent) -> Result<GenerationResult, SpdxError> {
        let ctx = GenerationContext::new(self.config.metadata.clone(), &content.external_refs);
        let version = self.config.version;

        self.strategy.begin_document(&mut self.config.writer)?;

        let mut errors = Vec::new();

        let file_errors = self.section(Section::Files, &content.files, |g, file| {
            (file.path.clone(), g.file(file, &ctx))
        })?;
        errors.extend(file_errors);

        let code = verification_code(&content.files);
        let root = std::slice::from_ref(&content.root);
        let root_errors = self.section_open(Section::Packages, root, |g, package| {
            let code = (version == ManifestVersion::Spdx22).then_some(code.as_str());
            (package.id.clone(), g.root_package(package, code, &ctx))
        })?;
        errors.extend(root_errors);
        let package_errors = self.section_close(Section::Packages, &content.packages, |g, package| {
            (package.id.clone(), g.package(package, &ctx))
        })?;
        errors.extend(package_errors);

        let relationship_errors =
            self.section(Section::Relationships, &content.relationships, |g, relationship| {
                (
                    format!(
                        "{} {} {}",
                        relationship.source_id,
                        relationship.relationship_type.spdx22_name(),
                        relationship.target_id
                    ),
                    g.relationship(relationship, &ctx),
                )
            })?;
        errors.extend(relationship_errors);

        let reference_errors =
            self.section(Section::ExternalDocumentRefs, &content.external_refs, |g, reference| {
                (reference.id.clone(), g.external_reference(reference, &ctx))
            })?;
        errors.extend(reference_errors);

        self.strategy.end_document(&mut self.config.writer, &ctx)?;

        self.config.recorder.record_errors(&errors);
        self.config.recorder.add_property(
            format!("elements_written.{}", version.as_str()),
            self.elements_written.to_string(),
        );

        if errors.is_empty() {
            info!(
                path = %self.config.manifest_path.display(),
                version = version.as_str(),
                elements = self.elements_written,
                "manifest generated"
            );
        } else {
            warn!(
                path = %self.config.manifest_path.display(),
                version = version.as_str(),
                errors = errors.len(),
                "manifest generated with errors"
            );
        }

        Ok(GenerationResult {
            version,
            path: self.config.manifest_path,
            errors,
            elements_written: self.elements_written,
        })
    }

    fn section<T, F>(&mut self, section: Section, items: &[T], build: F) -> Result<Vec<FileValidationResult>, SpdxError>
    where
        F: Fn(&dyn DocumentGenerator, &T) -> (String, Result<Vec<Element>, ErrorKind>),
    {
        self.strategy.begin_section(&mut self.config.writer, section)?;
        let errors = self.write_items(items, build)?;
        self.strategy.end_section(&mut self.config.writer, section)?;
        Ok(errors)
    }

    fn section_open<T, F>(&mut self, section: Section, items: &[T], build: F) -> Result<Vec<FileValidationResult>, SpdxError>
    where
        F: Fn(&dyn DocumentGenerator, &T) -> (String, Result<Vec<Element>, ErrorKind>),
    {
        self.strategy.begin_section(&mut self.config.writer, section)?;
        self.write_items(items, build)
    }

    fn section_close<T, F>(&mut self, section: Section, items: &[T], build: F) -> Result<Vec<FileValidationResult>, SpdxError>
    where
        F: Fn(&dyn DocumentGenerator, &T) -> (String, Result<Vec<Element>, ErrorKind>),
    {
        let errors = self.write_items(items, build)?;
        self.strategy.end_section(&mut self.config.writer, section)?;
        Ok(errors)
    }

    fn write_items<T, F>(&mut self, items: &[T], build: F) -> Result<Vec<FileValidationResult>, SpdxError>
    where
        F: Fn(&dyn DocumentGenerator, &T) -> (String, Result<Vec<Element>, ErrorKind>),
    {
        let mut errors = Vec::new();
        for item in items {
            let (key, elements) = build(self.generator.as_ref(), item);
            let elements = match elements {
                Ok(elements) => elements,
                Err(kind) => {
                    debug!(item = %key, kind = kind.as_str(), "element generation failed");
                    errors.push(FileValidationResult::new(key, kind));
                    continue;
                }
            };
            for element in elements {
                match self.strategy.write_element(&mut self.config.writer, element) {
                    Ok(true) => self.elements_written += 1,
                    Ok(false) => {}
                    Err(SpdxError::Serialization(reason)) => {
                        debug!(item = %key, reason = %reason, "element serialization failed");
                        errors.push(FileValidationResult::new(
                            key.clone(),
                            ErrorKind::JsonSerializationError,
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sbomforge_core::telemetry::RunRecorder;
    use sbomforge_core::types::{Action, FileLocation, RelationshipType};
    use serde_json::Value;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            document_name: "app 1.0".to_owned(),
            namespace: "https://x/app/1.0/uuid".to_owned(),
            created: "2024-01-01T00:00:00Z".to_owned(),
            creators: vec!["Tool: sbomforge".to_owned()],
            package_name: "app".to_owned(),
            package_version: "1.0".to_owned(),
            package_supplier: "Contoso".to_owned(),
        }
    }

    fn file(path: &str, content: &[u8]) -> FileRecord {
        FileRecord::new(path, FileLocation::OnDisk)
            .with_checksum(HashAlgorithm::Sha1, digest_hex(HashAlgorithm::Sha1, content))
            .with_checksum(HashAlgorithm::Sha256, digest_hex(HashAlgorithm::Sha256, content))
    }

    fn package(id: &str, supplier: &str) -> PackageRecord {
        PackageRecord {
            id: id.to_owned(),
            name: id.to_owned(),
            version: "1.0".to_owned(),
            supplier: Some(format!("Organization: {supplier}")),
            license: sbomforge_core::types::LicenseInfo {
                concluded: None,
                declared: Some("MIT".to_owned()),
            },
            ..Default::default()
        }
    }

    fn generate(version: ManifestVersion, content: &DocumentContent) -> (GenerationResult, Value) {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(RunRecorder::new(Action::Generate));
        let config = SbomConfig::create(version, dir.path(), metadata(), recorder).unwrap();
        let result = ManifestGenerator::new(config).generate(content).unwrap();
        let doc = serde_json::from_slice(&std::fs::read(&result.path).unwrap()).unwrap();
        (result, doc)
    }

    #[test]
    fn verification_code_is_order_independent() {
        let a = file("/a", b"a");
        let b = file("/b", b"b");
        assert_eq!(
            verification_code(&[a.clone(), b.clone()]),
            verification_code(&[b, a])
        );
    }

    #[test]
    fn spdx22_document_has_all_sections() {
        let content = DocumentContent::new(
            vec![file("/a.txt", b"a"), file("/b.txt", b"b")],
            root_package(&metadata()),
            vec![package("SPDXRef-Package-1", "Acme")],
            vec![],
        );
        let (result, doc) = generate(ManifestVersion::Spdx22, &content);

        assert!(result.errors.is_empty());
        assert_eq!(doc["spdxVersion"], "SPDX-2.2");
        assert_eq!(doc["files"].as_array().unwrap().len(), 2);
        assert_eq!(doc["packages"].as_array().unwrap().len(), 2);
        assert_eq!(doc["packages"][0]["SPDXID"], ROOT_PACKAGE_ID);
        assert_eq!(
            doc["packages"][0]["packageVerificationCode"]["packageVerificationCodeValue"],
            verification_code(&content.files)
        );
        assert_eq!(doc["externalDocumentRefs"], serde_json::json!([]));
        assert!(
            doc["relationships"]
                .as_array()
                .unwrap()
                .iter()
                .any(|r| r["relationshipType"] == "DESCRIBES")
        );
    }

    #[test]
    fn failing_element_does_not_stop_generation() {
        let unhashed = FileRecord::new("/nohash", FileLocation::OnDisk);
        let nameless = PackageRecord {
            id: "SPDXRef-Package-x".to_owned(),
            ..Default::default()
        };
        let content = DocumentContent::new(
            vec![file("/a.txt", b"a"), unhashed],
            root_package(&metadata()),
            vec![nameless, package("SPDXRef-Package-1", "Acme")],
            vec![],
        );
        let (result, doc) = generate(ManifestVersion::Spdx22, &content);

        assert_eq!(
            result.errors,
            vec![
                FileValidationResult::new("/nohash", ErrorKind::UnsupportedHashAlgorithm),
                FileValidationResult::new("SPDXRef-Package-x", ErrorKind::PackageError),
            ]
        );
        assert_eq!(doc["files"].as_array().unwrap().len(), 1);
        assert_eq!(doc["packages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn spdx30_shares_supplier_and_license_elements() {
        let content = DocumentContent::new(
            vec![file("/a.txt", b"a")],
            root_package(&metadata()),
            vec![
                package("SPDXRef-Package-1", "Acme"),
                package("SPDXRef-Package-2", "Acme"),
            ],
            vec![],
        );
        let (result, doc) = generate(ManifestVersion::Spdx30, &content);
        assert!(result.errors.is_empty());

        let graph = doc["@graph"].as_array().unwrap();
        let organizations = graph
            .iter()
            .filter(|e| e["type"] == "Organization" && e["name"] == "Acme")
            .count();
        let licenses = graph
            .iter()
            .filter(|e| e["type"] == "simplelicensing_LicenseExpression")
            .count();
        assert_eq!(organizations, 1);
        assert_eq!(licenses, 1);

        let mut ids: Vec<&str> = graph.iter().filter_map(|e| e["spdxId"].as_str()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn relationships_section_uses_record_order() {
        let content = DocumentContent::new(vec![], root_package(&metadata()), vec![], vec![]);
        assert_eq!(content.relationships.len(), 1);
        assert_eq!(content.relationships[0].relationship_type, RelationshipType::Describes);
    }
}
