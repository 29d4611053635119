//! SPDX 3.0 요소 생성
//!
//! 모든 요소는 평면 `@graph`에 들어가며, 여러 패키지가 공유하는 공급자
//! 조직과 라이선스 표현식은 같은 ID로 반복 생성됩니다. 반복 요소는
//! 직렬화 전략의 ID 집합에서 한 번만 기록됩니다.

use serde::Serialize;

use sbomforge_core::types::{
    ErrorKind, ExternalDocumentReference, FileRecord, FileType, HashAlgorithm, ManifestVersion,
    PackageRecord, RelationshipRecord,
};

use super::{DocumentGenerator, Element, GenerationContext};
use crate::ids;
use crate::metadata::TOOL_NAME;

/// 모든 요소가 참조하는 생성 정보 blank node
pub const CREATION_INFO_ID: &str = "_:creationinfo";

/// 3.0 JSON-LD 컨텍스트
pub const SPDX3_CONTEXT: &str = "https://spdx.org/rdf/3.0.1/spdx-context.jsonld";

/// 3.0 사양 버전
pub const SPEC_VERSION: &str = "3.0.1";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Hash<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub algorithm: &'static str,
    pub hash_value: &'a str,
}

impl<'a> Hash<'a> {
    pub fn new(algorithm: HashAlgorithm, value: &'a str) -> Self {
        Self {
            kind: "Hash",
            algorithm: algorithm.spdx3_name(),
            hash_value: value,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct File<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    spdx_id: String,
    creation_info: &'static str,
    name: String,
    verified_using: Vec<Hash<'a>>,
    #[serde(rename = "software_fileKind")]
    file_kind: &'static str,
    #[serde(rename = "software_primaryPurpose", skip_serializing_if = "Option::is_none")]
    primary_purpose: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Package<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    spdx_id: String,
    creation_info: &'static str,
    name: &'a str,
    #[serde(rename = "software_packageVersion")]
    package_version: &'a str,
    #[serde(rename = "software_downloadLocation")]
    download_location: &'static str,
    #[serde(rename = "software_packageUrl", skip_serializing_if = "Option::is_none")]
    package_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    supplied_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    verified_using: Vec<Hash<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Agent<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub spdx_id: String,
    pub creation_info: &'static str,
    pub name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LicenseExpression<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    spdx_id: String,
    creation_info: &'static str,
    #[serde(rename = "simplelicensing_licenseExpression")]
    expression: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Relationship {
    #[serde(rename = "type")]
    kind: &'static str,
    spdx_id: String,
    creation_info: &'static str,
    from: String,
    relationship_type: &'static str,
    to: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExternalMap<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    external_spdx_id: String,
    location_hint: &'a str,
    verified_using: Vec<Hash<'a>>,
}

pub(crate) fn element<T: Serialize>(id: String, value: &T) -> Result<Element, ErrorKind> {
    serde_json::to_value(value)
        .map(|value| Element::new(id, value))
        .map_err(|_| ErrorKind::JsonSerializationError)
}

fn relationship_element(
    ctx: &GenerationContext,
    from: &str,
    kind: &'static str,
    to: &str,
) -> Result<Element, ErrorKind> {
    let spdx_id = ctx.iri(&ids::relationship_id(from, kind, to));
    element(
        spdx_id.clone(),
        &Relationship {
            kind: "Relationship",
            spdx_id,
            creation_info: CREATION_INFO_ID,
            from: ctx.iri(from),
            relationship_type: kind,
            to: vec![ctx.iri(to)],
        },
    )
}

/// 공급자 표기(`Organization: X`)에서 조직 이름을 꺼냅니다.
fn supplier_name(supplier: &str) -> &str {
    supplier
        .split_once(':')
        .map_or(supplier, |(_, name)| name)
        .trim()
}

/// 도구 요소 (문서 헤더에서 사용)
pub(crate) fn tool_agent(ctx: &GenerationContext) -> Result<Element, ErrorKind> {
    let spdx_id = ctx.iri(&format!("SPDXRef-Tool-{}", ids::sanitize(TOOL_NAME)));
    element(
        spdx_id.clone(),
        &Agent {
            kind: "Tool",
            spdx_id,
            creation_info: CREATION_INFO_ID,
            name: TOOL_NAME,
        },
    )
}

/// 조직 요소
pub(crate) fn organization_agent(ctx: &GenerationContext, name: &str) -> Result<Element, ErrorKind> {
    let spdx_id = ctx.iri(&ids::organization_id(name));
    element(
        spdx_id.clone(),
        &Agent {
            kind: "Organization",
            spdx_id,
            creation_info: CREATION_INFO_ID,
            name,
        },
    )
}

/// SPDX 3.0 생성기
#[derive(Debug, Default, Clone, Copy)]
pub struct Spdx30Generator;

impl Spdx30Generator {
    fn package_elements(package: &PackageRecord, ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind> {
        if package.id.is_empty() || package.name.trim().is_empty() {
            return Err(ErrorKind::PackageError);
        }

        let mut elements = Vec::new();

        let supplied_by = match package.supplier.as_deref().map(supplier_name) {
            Some(name) if !name.is_empty() && name != "NOASSERTION" => {
                let organization = organization_agent(ctx, name)?;
                let id = organization.id.clone();
                elements.push(organization);
                Some(id)
            }
            _ => None,
        };

        let spdx_id = ctx.iri(&package.id);
        elements.push(element(
            spdx_id.clone(),
            &Package {
                kind: "software_Package",
                spdx_id,
                creation_info: CREATION_INFO_ID,
                name: &package.name,
                package_version: &package.version,
                download_location: "NOASSERTION",
                package_url: package.purl.as_deref(),
                supplied_by,
                verified_using: package
                    .checksums
                    .iter()
                    .map(|(algorithm, value)| Hash::new(*algorithm, value))
                    .collect(),
            },
        )?);

        let licenses = [
            ("hasConcludedLicense", package.license.concluded.as_deref()),
            ("hasDeclaredLicense", package.license.declared.as_deref()),
        ];
        for (kind, expression) in licenses {
            let Some(expression) = expression.filter(|e| !e.trim().is_empty()) else {
                continue;
            };
            let license_local = ids::license_id(expression);
            let license_iri = ctx.iri(&license_local);
            elements.push(element(
                license_iri.clone(),
                &LicenseExpression {
                    kind: "simplelicensing_LicenseExpression",
                    spdx_id: license_iri,
                    creation_info: CREATION_INFO_ID,
                    expression,
                },
            )?);
            elements.push(relationship_element(ctx, &package.id, kind, &license_local)?);
        }

        Ok(elements)
    }
}

impl DocumentGenerator for Spdx30Generator {
    fn version(&self) -> ManifestVersion {
        ManifestVersion::Spdx30
    }

    fn required_algorithms(&self) -> &'static [HashAlgorithm] {
        &[HashAlgorithm::Sha256]
    }

    fn file(&self, file: &FileRecord, ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind> {
        let Some(sha256) = file.checksum(HashAlgorithm::Sha256) else {
            return Err(ErrorKind::UnsupportedHashAlgorithm);
        };

        let spdx_id = ctx.iri(&ids::file_id(file));
        let mut verified_using = vec![Hash::new(HashAlgorithm::Sha256, sha256)];
        for (algorithm, value) in &file.checksums {
            if *algorithm != HashAlgorithm::Sha256 {
                verified_using.push(Hash::new(*algorithm, value));
            }
        }

        let record = File {
            kind: "software_File",
            spdx_id: spdx_id.clone(),
            creation_info: CREATION_INFO_ID,
            name: file.spdx_file_name(),
            verified_using,
            file_kind: "file",
            primary_purpose: file.file_types.contains(&FileType::Spdx).then_some("bom"),
        };
        element(spdx_id, &record).map(|e| vec![e])
    }

    fn package(&self, package: &PackageRecord, ctx: &GenerationContext) -> Result<Vec<Element>, ErrorKind> {
        Self::package_elements(package, ctx)
    }

    fn root_package(
        &self,
        root: &PackageRecord,
        _verification_code: Option<&str>,
        ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind> {
        Self::package_elements(root, ctx)
    }

    fn relationship(
        &self,
        relationship: &RelationshipRecord,
        ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind> {
        relationship_element(
            ctx,
            &relationship.source_id,
            relationship.relationship_type.spdx3_name(),
            &relationship.target_id,
        )
        .map(|e| vec![e])
    }

    fn external_reference(
        &self,
        reference: &ExternalDocumentReference,
        _ctx: &GenerationContext,
    ) -> Result<Vec<Element>, ErrorKind> {
        if reference.sha1.is_empty() {
            return Err(ErrorKind::UnsupportedHashAlgorithm);
        }
        let external_spdx_id = format!(
            "{}#{}",
            reference.document_namespace, reference.described_element_id
        );
        element(
            reference.id.clone(),
            &ExternalMap {
                kind: "ExternalMap",
                external_spdx_id,
                location_hint: &reference.document_namespace,
                verified_using: vec![Hash::new(HashAlgorithm::Sha1, &reference.sha1)],
            },
        )
        .map(|e| vec![e])
    }
}
