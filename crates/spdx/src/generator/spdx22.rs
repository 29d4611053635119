//! SPDX 2.2 요소 생성
//!
//! 파일은 SHA1과 SHA256을 모두 요구합니다. SHA1은 패키지 검증 코드 계산에 쓰입니다.

use serde::Serialize;

use sbomforge_core::types::{
    ErrorKind, ExternalDocumentReference, FileRecord, FileType, HashAlgorithm, ManifestVersion,
    PackageRecord, RelationshipRecord,
};

use super::{DocumentGenerator, Element, GenerationContext, license_or_noassertion};
use crate::ids;

const NOASSERTION: &str = "NOASSERTION";

#[derive(Serialize)]
pub(crate) struct Spdx22Checksum<'a> {
    pub algorithm: &'static str,
    #[serde(rename = "checksumValue")]
    pub checksum_value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22File<'a> {
    file_name: String,
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    checksums: Vec<Spdx22Checksum<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    file_types: Vec<&'static str>,
    license_concluded: &'static str,
    license_info_in_files: Vec<&'static str>,
    copyright_text: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22ExternalRef<'a> {
    reference_category: &'static str,
    reference_type: &'static str,
    reference_locator: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22VerificationCode<'a> {
    package_verification_code_value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22Package<'a> {
    name: &'a str,
    #[serde(rename = "SPDXID")]
    spdx_id: &'a str,
    version_info: &'a str,
    download_location: &'static str,
    files_analyzed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    package_verification_code: Option<Spdx22VerificationCode<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    checksums: Vec<Spdx22Checksum<'a>>,
    license_concluded: String,
    license_declared: String,
    copyright_text: &'static str,
    supplier: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    external_refs: Vec<Spdx22ExternalRef<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22Relationship<'a> {
    spdx_element_id: &'a str,
    related_spdx_element: &'a str,
    relationship_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22ExternalDocumentRef<'a> {
    external_document_id: &'a str,
    spdx_document: &'a str,
    checksum: Spdx22Checksum<'a>,
}

fn to_element<T: Serialize>(id: String, value: &T) -> Result<Vec<Element>, ErrorKind> {
    let value = serde_json::to_value(value).map_err(|_| ErrorKind::JsonSerializationError)?;
    Ok(vec![Element::new(id, value)])
}

fn checksums(record: &sbomforge_core::types::Checksums) -> Vec<Spdx22Checksum<'_>> {
    record
        .iter()
        .map(|(algorithm, value)| Spdx22Checksum {
            algorithm: algorithm.spdx_name(),
            checksum_value: value,
        })
        .collect()
}

/// SPDX 2.2 생성기
#[derive(Debug, Default, Clone, Copy)]
pub struct Spdx22Generator;

impl Spdx22Generator {
    fn package_element(
        package: &PackageRecord,
        verification_code: Option<&str>,
    ) -> Result<Vec<Element>, ErrorKind> {
        if package.id.is_empty() || package.name.trim().is_empty() {
            return Err(ErrorKind::PackageError);
        }

        let external_refs = package
            .purl
            .as_deref()
            .map(|purl| {
                vec![Spdx22ExternalRef {
                    reference_category: "PACKAGE-MANAGER",
                    reference_type: "purl",
                    reference_locator: purl,
                }]
            })
            .unwrap_or_default();

        let element = Spdx22Package {
            name: &package.name,
            spdx_id: &package.id,
            version_info: &package.version,
            download_location: NOASSERTION,
            files_analyzed: verification_code.is_some(),
            package_verification_code: verification_code.map(|code| Spdx22VerificationCode {
                package_verification_code_value: code,
            }),
            checksums: checksums(&package.checksums),
            license_concluded: license_or_noassertion(package.license.concluded.as_ref()),
            license_declared: license_or_noassertion(package.license.declared.as_ref()),
            copyright_text: NOASSERTION,
            supplier: package
                .supplier
                .clone()
                .unwrap_or_else(|| NOASSERTION.to_owned()),
            external_refs,
        };
        to_element(package.id.clone(), &element)
    }
}

impl DocumentGenerator for Spdx22Generator {
    fn version(&self) -> ManifestVersion {
        ManifestVersion::Spdx22
    }

    fn required_algorithms(&self) -> &'static [HashAlgorithm] {
        &[HashAlgorithm::Sha1, HashAlgorithm::Sha256]
    }

    fn file(&self, file: &FileRecord, _ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind> {
        if self
            .required_algorithms()
            .iter()
            .any(|algorithm| file.checksum(*algorithm).is_none())
        {
            return Err(ErrorKind::UnsupportedHashAlgorithm);
        }

        let id = ids::file_id(file);
        let element = Spdx22File {
            file_name: file.spdx_file_name(),
            spdx_id: id.clone(),
            checksums: checksums(&file.checksums),
            file_types: file
                .file_types
                .iter()
                .map(|t| match t {
                    FileType::Spdx => "SPDX",
                })
                .collect(),
            license_concluded: NOASSERTION,
            license_info_in_files: vec![NOASSERTION],
            copyright_text: NOASSERTION,
        };
        to_element(id, &element)
    }

    fn package(&self, package: &PackageRecord, _ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind> {
        Self::package_element(package, None)
    }

    fn root_package(
        &self,
        root: &PackageRecord,
        verification_code: Option<&str>,
        _ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind> {
        Self::package_element(root, Some(verification_code.unwrap_or_default()))
    }

    fn relationship(
        &self,
        relationship: &RelationshipRecord,
        _ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind> {
        let element = Spdx22Relationship {
            spdx_element_id: &relationship.source_id,
            related_spdx_element: &relationship.target_id,
            relationship_type: relationship.relationship_type.spdx22_name(),
        };
        let id = format!(
            "{}|{}|{}",
            relationship.source_id,
            relationship.relationship_type.spdx22_name(),
            relationship.target_id
        );
        to_element(id, &element)
    }

    fn external_reference(
        &self,
        reference: &ExternalDocumentReference,
        _ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind> {
        if reference.sha1.is_empty() {
            return Err(ErrorKind::UnsupportedHashAlgorithm);
        }
        let element = Spdx22ExternalDocumentRef {
            external_document_id: &reference.id,
            spdx_document: &reference.document_namespace,
            checksum: Spdx22Checksum {
                algorithm: HashAlgorithm::Sha1.spdx_name(),
                checksum_value: &reference.sha1,
            },
        };
        to_element(reference.id.clone(), &element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::DocumentMetadata;
    use sbomforge_core::types::{FileLocation, LicenseInfo, RelationshipType};

    fn ctx() -> GenerationContext {
        GenerationContext::new(
            DocumentMetadata {
                document_name: "app 1.0".to_owned(),
                namespace: "https://x/ns".to_owned(),
                created: "2024-01-01T00:00:00Z".to_owned(),
                creators: vec![],
                package_name: "app".to_owned(),
                package_version: "1.0".to_owned(),
                package_supplier: "Contoso".to_owned(),
            },
            &[],
        )
    }

    fn hashed_file() -> FileRecord {
        FileRecord::new("/bin/a.txt", FileLocation::OnDisk)
            .with_checksum(HashAlgorithm::Sha1, "11")
            .with_checksum(HashAlgorithm::Sha256, "22")
    }

    #[test]
    fn file_element_shape() {
        let elements = Spdx22Generator.file(&hashed_file(), &ctx()).unwrap();
        let value = &elements[0].value;
        assert_eq!(value["fileName"], "./bin/a.txt");
        assert_eq!(value["checksums"][0]["algorithm"], "SHA1");
        assert_eq!(value["checksums"][1]["checksumValue"], "22");
        assert!(value["SPDXID"].as_str().unwrap().starts_with("SPDXRef-File-"));
        assert!(value.get("fileTypes").is_none());
    }

    #[test]
    fn file_without_sha1_is_rejected() {
        let file = FileRecord::new("/a", FileLocation::OnDisk).with_checksum(HashAlgorithm::Sha256, "22");
        assert_eq!(
            Spdx22Generator.file(&file, &ctx()).unwrap_err(),
            ErrorKind::UnsupportedHashAlgorithm
        );
    }

    #[test]
    fn spdx_file_type_flag_is_written() {
        let mut file = hashed_file();
        file.file_types.insert(FileType::Spdx);
        let elements = Spdx22Generator.file(&file, &ctx()).unwrap();
        assert_eq!(elements[0].value["fileTypes"], serde_json::json!(["SPDX"]));
    }

    #[test]
    fn package_element_shape() {
        let package = PackageRecord {
            id: "SPDXRef-Package-1".to_owned(),
            name: "serde".to_owned(),
            version: "1.0.0".to_owned(),
            license: LicenseInfo {
                concluded: None,
                declared: Some("MIT".to_owned()),
            },
            supplier: Some("Organization: serde-rs".to_owned()),
            purl: Some("pkg:cargo/serde@1.0.0".to_owned()),
            ..Default::default()
        };
        let value = &Spdx22Generator.package(&package, &ctx()).unwrap()[0].value;
        assert_eq!(value["versionInfo"], "1.0.0");
        assert_eq!(value["licenseConcluded"], "NOASSERTION");
        assert_eq!(value["licenseDeclared"], "MIT");
        assert_eq!(value["filesAnalyzed"], false);
        assert_eq!(value["externalRefs"][0]["referenceLocator"], "pkg:cargo/serde@1.0.0");
        assert!(value.get("packageVerificationCode").is_none());
    }

    #[test]
    fn package_without_name_is_package_error() {
        let package = PackageRecord {
            id: "SPDXRef-Package-1".to_owned(),
            ..Default::default()
        };
        assert_eq!(
            Spdx22Generator.package(&package, &ctx()).unwrap_err(),
            ErrorKind::PackageError
        );
    }

    #[test]
    fn root_package_carries_verification_code() {
        let root = PackageRecord {
            id: ids::ROOT_PACKAGE_ID.to_owned(),
            name: "app".to_owned(),
            version: "1.0".to_owned(),
            ..Default::default()
        };
        let value = &Spdx22Generator
            .root_package(&root, Some("abc"), &ctx())
            .unwrap()[0]
            .value;
        assert_eq!(value["filesAnalyzed"], true);
        assert_eq!(value["packageVerificationCode"]["packageVerificationCodeValue"], "abc");
    }

    #[test]
    fn relationship_uses_upper_snake_case() {
        let rel = RelationshipRecord::new("SPDXRef-RootPackage", "SPDXRef-Package-1", RelationshipType::DependsOn);
        let value = &Spdx22Generator.relationship(&rel, &ctx()).unwrap()[0].value;
        assert_eq!(value["relationshipType"], "DEPENDS_ON");
        assert_eq!(value["spdxElementId"], "SPDXRef-RootPackage");
    }
}
