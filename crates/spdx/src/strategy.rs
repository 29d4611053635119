//! 버전별 직렬화 전략
//!
//! - 2.2: 카테고리마다 이름 있는 배열(`files`, `packages`, `relationships`,
//!   `externalDocumentRefs`)을 열고 닫습니다. 문서 헤더는 모든 배열이 닫힌 뒤 씁니다.
//! - 3.0: `@context`를 먼저 쓰고 하나의 `@graph` 배열에 모든 요소를 씁니다.
//!   이미 기록된 `spdxId`는 건너뜁니다.

use std::io::Write;

use dashmap::DashSet;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use sbomforge_core::metrics as m;
use sbomforge_core::types::ManifestVersion;

use crate::error::SpdxError;
use crate::generator::spdx30::{self, CREATION_INFO_ID, SPDX3_CONTEXT, SPEC_VERSION};
use crate::generator::{Element, GenerationContext};
use crate::ids::{DOCUMENT_ID, ROOT_PACKAGE_ID};
use crate::writer::ManifestWriter;

/// 2.2 데이터 라이선스
pub const DATA_LICENSE: &str = "CC0-1.0";

/// 문서 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Files,
    Packages,
    Relationships,
    ExternalDocumentRefs,
}

impl Section {
    /// 2.2 배열 이름
    pub fn spdx22_name(&self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Packages => "packages",
            Self::Relationships => "relationships",
            Self::ExternalDocumentRefs => "externalDocumentRefs",
        }
    }
}

/// SPDX 2.2 전략
#[derive(Debug, Default)]
pub struct Spdx22Strategy {
    open: Option<Section>,
}

/// SPDX 3.0 전략
#[derive(Debug, Default)]
pub struct Spdx30Strategy {
    written: DashSet<String>,
    imports: Vec<Value>,
}

/// 버전별 직렬화 전략
#[derive(Debug)]
pub enum SerializationStrategy {
    Spdx22(Spdx22Strategy),
    Spdx30(Spdx30Strategy),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreationInfo22<'a> {
    created: &'a str,
    creators: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreationInfo30<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "@id")]
    id: &'static str,
    spec_version: &'static str,
    created: &'a str,
    created_by: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpdxDocument30<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    spdx_id: String,
    creation_info: &'static str,
    name: &'a str,
    data_license: &'static str,
    profile_conformance: [&'static str; 2],
    root_element: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    import: Vec<Value>,
}

impl SerializationStrategy {
    pub fn for_version(version: ManifestVersion) -> Self {
        match version {
            ManifestVersion::Spdx22 => Self::Spdx22(Spdx22Strategy::default()),
            ManifestVersion::Spdx30 => Self::Spdx30(Spdx30Strategy::default()),
        }
    }

    pub fn version(&self) -> ManifestVersion {
        match self {
            Self::Spdx22(_) => ManifestVersion::Spdx22,
            Self::Spdx30(_) => ManifestVersion::Spdx30,
        }
    }

    /// 문서를 엽니다. 3.0은 `@context`와 `@graph`까지 씁니다.
    pub fn begin_document<W: Write>(&mut self, writer: &mut ManifestWriter<W>) -> Result<(), SpdxError> {
        writer.start_document()?;
        if let Self::Spdx30(_) = self {
            writer.write_property("@context", &[SPDX3_CONTEXT])?;
            writer.start_array("@graph")?;
        }
        Ok(())
    }

    pub fn begin_section<W: Write>(
        &mut self,
        writer: &mut ManifestWriter<W>,
        section: Section,
    ) -> Result<(), SpdxError> {
        match self {
            Self::Spdx22(state) => {
                if let Some(open) = state.open {
                    return Err(SpdxError::Serialization(format!(
                        "section {} is still open",
                        open.spdx22_name()
                    )));
                }
                writer.start_array(section.spdx22_name())?;
                state.open = Some(section);
                Ok(())
            }
            Self::Spdx30(_) => Ok(()),
        }
    }

    pub fn end_section<W: Write>(
        &mut self,
        writer: &mut ManifestWriter<W>,
        section: Section,
    ) -> Result<(), SpdxError> {
        match self {
            Self::Spdx22(state) => {
                if state.open != Some(section) {
                    return Err(SpdxError::Serialization(format!(
                        "section {} is not open",
                        section.spdx22_name()
                    )));
                }
                state.open = None;
                writer.end_array()
            }
            Self::Spdx30(_) => Ok(()),
        }
    }

    /// 요소 하나를 씁니다. 3.0에서 이미 기록된 ID면 건너뛰고 `false`를 반환합니다.
    pub fn write_element<W: Write>(
        &mut self,
        writer: &mut ManifestWriter<W>,
        element: Element,
    ) -> Result<bool, SpdxError> {
        let version = self.version().as_str();
        match self {
            Self::Spdx22(_) => {
                writer.write_element(&element.value)?;
            }
            Self::Spdx30(state) => {
                if element.value.get("type").and_then(Value::as_str) == Some("ExternalMap") {
                    state.imports.push(element.value);
                    return Ok(true);
                }
                if !state.written.insert(element.id.clone()) {
                    debug!(id = %element.id, "element already written, skipping");
                    metrics::counter!(m::SERIALIZER_ELEMENTS_DEDUPLICATED_TOTAL, m::LABEL_VERSION => version)
                        .increment(1);
                    return Ok(false);
                }
                if let Err(e) = writer.write_element(&element.value) {
                    state.written.remove(&element.id);
                    return Err(e);
                }
            }
        }
        metrics::counter!(m::SERIALIZER_ELEMENTS_WRITTEN_TOTAL, m::LABEL_VERSION => version).increment(1);
        Ok(true)
    }

    /// 문서를 닫습니다.
    ///
    /// 2.2는 모든 배열 뒤에 헤더 속성을, 3.0은 생성 정보와 `SpdxDocument`
    /// 요소를 그래프 끝에 씁니다.
    pub fn end_document<W: Write>(
        &mut self,
        writer: &mut ManifestWriter<W>,
        ctx: &GenerationContext,
    ) -> Result<(), SpdxError> {
        let meta = &ctx.metadata;
        match self {
            Self::Spdx22(state) => {
                if let Some(open) = state.open {
                    return Err(SpdxError::Serialization(format!(
                        "section {} is still open",
                        open.spdx22_name()
                    )));
                }
                writer.write_property("spdxVersion", "SPDX-2.2")?;
                writer.write_property("dataLicense", DATA_LICENSE)?;
                writer.write_property("SPDXID", DOCUMENT_ID)?;
                writer.write_property("name", &meta.document_name)?;
                writer.write_property("documentNamespace", &meta.namespace)?;
                writer.write_property(
                    "creationInfo",
                    &CreationInfo22 {
                        created: &meta.created,
                        creators: &meta.creators,
                    },
                )?;
                writer.write_property("documentDescribes", &[ROOT_PACKAGE_ID])?;
            }
            Self::Spdx30(_) => {
                let tool = spdx30::tool_agent(ctx).map_err(header_error)?;
                let organization =
                    spdx30::organization_agent(ctx, &meta.package_supplier).map_err(header_error)?;
                let creation_info = Element::new(
                    CREATION_INFO_ID,
                    serde_json::to_value(CreationInfo30 {
                        kind: "CreationInfo",
                        id: CREATION_INFO_ID,
                        spec_version: SPEC_VERSION,
                        created: &meta.created,
                        created_by: vec![organization.id.clone(), tool.id.clone()],
                    })?,
                );

                for element in [creation_info, tool, organization] {
                    self.write_element(writer, element)?;
                }

                let imports = match self {
                    Self::Spdx30(state) => std::mem::take(&mut state.imports),
                    Self::Spdx22(_) => Vec::new(),
                };
                let document_id = ctx.iri(DOCUMENT_ID);
                let document = Element::new(
                    document_id.clone(),
                    serde_json::to_value(SpdxDocument30 {
                        kind: "SpdxDocument",
                        spdx_id: document_id,
                        creation_info: CREATION_INFO_ID,
                        name: &meta.document_name,
                        data_license: DATA_LICENSE,
                        profile_conformance: ["core", "software"],
                        root_element: vec![ctx.iri(ROOT_PACKAGE_ID)],
                        import: imports,
                    })?,
                );
                self.write_element(writer, document)?;
                writer.end_array()?;
            }
        }
        writer.end_document()
    }

    /// 3.0에서 지금까지 기록된 요소 ID 수
    pub fn written_count(&self) -> usize {
        match self {
            Self::Spdx22(_) => 0,
            Self::Spdx30(state) => state.written.len(),
        }
    }
}

fn header_error(kind: sbomforge_core::types::ErrorKind) -> SpdxError {
    SpdxError::Serialization(format!("failed to build document header: {kind}"))
}
