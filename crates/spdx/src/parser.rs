//! 스트리밍 매니페스트 파서
//!
//! 매니페스트 바이트를 속성 단위로 읽으면서 배열 섹션은 요소 하나씩
//! 역직렬화해 [`ManifestVisitor`]에 넘깁니다. 문서 전체를 `Value`로
//! 만들지 않으므로 큰 매니페스트도 요소 하나 크기의 메모리로 처리됩니다.
//!
//! # 상태 전이
//!
//! ```text
//! None -> Metadata -> Files -> Packages -> Relationships -> References -> Finished
//!            \______________ InternalSkip (알 수 없는 속성) ______________/
//! ```
//!
//! 2.2 문서는 속성 이름(`files`, `packages`, ...)으로, 3.0 문서는 `@graph`
//! 요소의 `type`으로 상태가 정해집니다. 구조 오류는 모두
//! [`SpdxError::InvalidInput`]이며 워크플로우를 즉시 중단시킵니다.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{
    DeserializeOwned, DeserializeSeed, Deserializer, Error as _, IgnoredAny, MapAccess, SeqAccess,
    Visitor,
};
use serde::Deserialize;
use tracing::debug;

use sbomforge_core::types::{
    ExternalDocumentReference, FileLocation, FileRecord, FileType, HashAlgorithm, LicenseInfo,
    ManifestVersion, PackageRecord, RelationshipRecord, RelationshipType, manifest_path_from_spdx,
};

use crate::error::SpdxError;
use crate::ids::{self, ROOT_PACKAGE_ID};

/// 파서 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    None,
    Metadata,
    Files,
    Packages,
    Relationships,
    References,
    Finished,
    InternalSkip,
}

/// 파싱된 요소를 받는 콜백
///
/// 모든 메서드는 기본 구현이 비어 있어 필요한 섹션만 구현하면 됩니다.
pub trait ManifestVisitor {
    fn on_state(&mut self, _state: ParserState) {}
    fn on_file(&mut self, _file: FileRecord) {}
    fn on_package(&mut self, _package: PackageRecord) {}
    fn on_relationship(&mut self, _relationship: RelationshipRecord) {}
    fn on_reference(&mut self, _reference: ExternalDocumentReference) {}
}

/// 문서 수준 정보와 섹션별 요소 수
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub spdx_version: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub created: Option<String>,
    /// 문서가 기술하는 루트 요소 (지역 ID)
    pub describes: Vec<String>,
    pub files: usize,
    pub packages: usize,
    pub relationships: usize,
    pub references: usize,
}

/// 스트리밍 매니페스트 파서
#[derive(Debug)]
pub struct ManifestParser {
    version: ManifestVersion,
    source: String,
    state: ParserState,
}

impl ManifestParser {
    /// `source`는 에러 메시지에 쓰이는 매니페스트 경로입니다.
    pub fn new(version: ManifestVersion, source: impl Into<String>) -> Self {
        Self {
            version,
            source: source.into(),
            state: ParserState::None,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn version(&self) -> ManifestVersion {
        self.version
    }

    /// 매니페스트를 끝까지 읽으며 요소를 `visitor`에 넘깁니다.
    pub fn parse(
        &mut self,
        bytes: &[u8],
        visitor: &mut dyn ManifestVisitor,
    ) -> Result<DocumentInfo, SpdxError> {
        let mut de = serde_json::Deserializer::from_slice(bytes);
        let (result, info, saw_graph) = {
            let mut cursor = Cursor {
                version: self.version,
                state: &mut self.state,
                visitor,
                info: DocumentInfo::default(),
                agents: HashMap::new(),
                saw_graph: false,
            };
            let result = DocumentSeed { cursor: &mut cursor }
                .deserialize(&mut de)
                .and_then(|()| de.end());
            (result, cursor.info, cursor.saw_graph)
        };

        if let Err(e) = result {
            return Err(self.invalid(e.to_string()));
        }

        match self.version {
            ManifestVersion::Spdx22 if info.spdx_version.is_none() => {
                return Err(self.invalid("missing spdxVersion"));
            }
            ManifestVersion::Spdx30 if !saw_graph => {
                return Err(self.invalid("missing @graph"));
            }
            _ => {}
        }

        self.state = ParserState::Finished;
        debug!(
            source = %self.source,
            files = info.files,
            packages = info.packages,
            relationships = info.relationships,
            references = info.references,
            "manifest parsed"
        );
        Ok(info)
    }

    fn invalid(&self, reason: impl Into<String>) -> SpdxError {
        SpdxError::InvalidInput {
            path: self.source.clone(),
            reason: reason.into(),
        }
    }
}

struct Cursor<'s, 'v> {
    version: ManifestVersion,
    state: &'s mut ParserState,
    visitor: &'v mut dyn ManifestVisitor,
    info: DocumentInfo,
    /// 3.0 조직 ID -> 이름
    agents: HashMap<String, String>,
    saw_graph: bool,
}

impl Cursor<'_, '_> {
    fn enter(&mut self, state: ParserState) {
        if *self.state != state {
            *self.state = state;
            self.visitor.on_state(state);
        }
    }

    fn emit_file(&mut self, file: FileRecord) {
        self.enter(ParserState::Files);
        self.info.files += 1;
        self.visitor.on_file(file);
    }

    fn emit_package(&mut self, package: PackageRecord) {
        self.enter(ParserState::Packages);
        self.info.packages += 1;
        self.visitor.on_package(package);
    }

    fn emit_relationship(&mut self, relationship: RelationshipRecord) {
        self.enter(ParserState::Relationships);
        self.info.relationships += 1;
        self.visitor.on_relationship(relationship);
    }

    fn emit_reference(&mut self, reference: ExternalDocumentReference) {
        self.enter(ParserState::References);
        self.info.references += 1;
        self.visitor.on_reference(reference);
    }

    fn skip<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        debug!(property = key, "skipping unknown property");
        self.enter(ParserState::InternalSkip);
        map.next_value::<IgnoredAny>()?;
        Ok(())
    }

    fn spdx22_property<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "files" => map.next_value_seed(SectionSeed::<Spdx22FileIn>::new(self)),
            "packages" => map.next_value_seed(SectionSeed::<Spdx22PackageIn>::new(self)),
            "relationships" => map.next_value_seed(SectionSeed::<Spdx22RelationshipIn>::new(self)),
            "externalDocumentRefs" => map.next_value_seed(SectionSeed::<Spdx22ReferenceIn>::new(self)),
            "spdxVersion" => {
                self.enter(ParserState::Metadata);
                let version: String = map.next_value()?;
                if version != "SPDX-2.2" {
                    return Err(A::Error::custom(format!(
                        "unsupported spdxVersion {version}, expected SPDX-2.2"
                    )));
                }
                self.info.spdx_version = Some(version);
                Ok(())
            }
            "name" => {
                self.enter(ParserState::Metadata);
                self.info.name = Some(map.next_value()?);
                Ok(())
            }
            "documentNamespace" => {
                self.enter(ParserState::Metadata);
                self.info.namespace = Some(map.next_value()?);
                Ok(())
            }
            "documentDescribes" => {
                self.enter(ParserState::Metadata);
                self.info.describes = map.next_value()?;
                Ok(())
            }
            "creationInfo" => {
                self.enter(ParserState::Metadata);
                let creation: CreationInfoIn = map.next_value()?;
                self.info.created = creation.created;
                Ok(())
            }
            "@context" | "@graph" => Err(A::Error::custom(
                "found SPDX 3.0 property in a 2.2 manifest",
            )),
            _ => self.skip(key, map),
        }
    }

    fn spdx30_property<'de, A: MapAccess<'de>>(&mut self, key: &str, map: &mut A) -> Result<(), A::Error> {
        match key {
            "@context" => {
                self.enter(ParserState::Metadata);
                map.next_value::<IgnoredAny>()?;
                Ok(())
            }
            "@graph" => {
                self.saw_graph = true;
                map.next_value_seed(SectionSeed::<GraphElementIn>::new(self))
            }
            "spdxVersion" => Err(A::Error::custom(
                "found SPDX 2.2 property in a 3.0 manifest",
            )),
            _ => self.skip(key, map),
        }
    }
}

struct DocumentSeed<'c, 's, 'v> {
    cursor: &'c mut Cursor<'s, 'v>,
}

impl<'de> DeserializeSeed<'de> for DocumentSeed<'_, '_, '_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed<'_, '_, '_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an SPDX document object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        let cursor = self.cursor;
        cursor.enter(ParserState::Metadata);
        while let Some(key) = map.next_key::<String>()? {
            match cursor.version {
                ManifestVersion::Spdx22 => cursor.spdx22_property(&key, &mut map)?,
                ManifestVersion::Spdx30 => cursor.spdx30_property(&key, &mut map)?,
            }
        }
        Ok(())
    }
}

/// 배열 섹션의 요소 하나
trait SectionItem: DeserializeOwned {
    fn emit(self, cursor: &mut Cursor<'_, '_>) -> Result<(), String>;
}

struct SectionSeed<'c, 's, 'v, T> {
    cursor: &'c mut Cursor<'s, 'v>,
    marker: PhantomData<T>,
}

impl<'c, 's, 'v, T> SectionSeed<'c, 's, 'v, T> {
    fn new(cursor: &'c mut Cursor<'s, 'v>) -> Self {
        Self {
            cursor,
            marker: PhantomData,
        }
    }
}

impl<'de, T: SectionItem> DeserializeSeed<'de> for SectionSeed<'_, '_, '_, T> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, T: SectionItem> Visitor<'de> for SectionSeed<'_, '_, '_, T> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of SPDX elements")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        let cursor = self.cursor;
        while let Some(item) = seq.next_element::<T>()? {
            item.emit(cursor).map_err(A::Error::custom)?;
        }
        Ok(())
    }
}

// ─── 입력 요소 ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreationInfoIn {
    created: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChecksumIn {
    algorithm: String,
    checksum_value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashIn {
    algorithm: String,
    hash_value: String,
}

fn with_checksums<'a>(
    mut record: FileRecord,
    checksums: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> FileRecord {
    for (algorithm, value) in checksums {
        match HashAlgorithm::from_str_loose(algorithm) {
            Some(algorithm) => record = record.with_checksum(algorithm, value),
            None => debug!(algorithm, path = %record.path, "ignoring unsupported checksum algorithm"),
        }
    }
    record
}

fn package_checksums<'a>(
    checksums: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> sbomforge_core::types::Checksums {
    checksums
        .into_iter()
        .filter_map(|(algorithm, value)| {
            HashAlgorithm::from_str_loose(algorithm).map(|a| (a, value.to_ascii_lowercase()))
        })
        .collect()
}

/// `NOASSERTION`, `NONE`, 빈 값은 값 없음으로 봅니다.
fn asserted(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != "NOASSERTION" && v != "NONE"
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22FileIn {
    file_name: String,
    checksums: Vec<ChecksumIn>,
    #[serde(default)]
    file_types: Vec<String>,
}

impl SectionItem for Spdx22FileIn {
    fn emit(self, cursor: &mut Cursor<'_, '_>) -> Result<(), String> {
        if self.file_name.trim().is_empty() {
            return Err("file element with empty fileName".to_owned());
        }
        let mut record = with_checksums(
            FileRecord::new(manifest_path_from_spdx(&self.file_name), FileLocation::InManifest),
            self.checksums
                .iter()
                .map(|c| (c.algorithm.as_str(), c.checksum_value.as_str())),
        );
        if self.file_types.iter().any(|t| t.eq_ignore_ascii_case("SPDX")) {
            record.file_types.insert(FileType::Spdx);
        }
        cursor.emit_file(record);
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalRefIn {
    reference_type: String,
    reference_locator: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22PackageIn {
    #[serde(rename = "SPDXID")]
    spdx_id: String,
    name: String,
    version_info: Option<String>,
    #[serde(default)]
    checksums: Vec<ChecksumIn>,
    license_concluded: Option<String>,
    license_declared: Option<String>,
    supplier: Option<String>,
    #[serde(default)]
    external_refs: Vec<ExternalRefIn>,
}

impl SectionItem for Spdx22PackageIn {
    fn emit(self, cursor: &mut Cursor<'_, '_>) -> Result<(), String> {
        let purl = self
            .external_refs
            .into_iter()
            .find(|r| r.reference_type == "purl")
            .map(|r| r.reference_locator);
        let package = PackageRecord {
            id: self.spdx_id,
            name: self.name,
            version: self.version_info.unwrap_or_default(),
            checksums: package_checksums(
                self.checksums
                    .iter()
                    .map(|c| (c.algorithm.as_str(), c.checksum_value.as_str())),
            ),
            license: LicenseInfo {
                concluded: asserted(self.license_concluded),
                declared: asserted(self.license_declared),
            },
            supplier: asserted(self.supplier),
            depends_on: Vec::new(),
            purl,
        };
        cursor.emit_package(package);
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22RelationshipIn {
    spdx_element_id: String,
    related_spdx_element: String,
    relationship_type: String,
}

impl SectionItem for Spdx22RelationshipIn {
    fn emit(self, cursor: &mut Cursor<'_, '_>) -> Result<(), String> {
        cursor.emit_relationship(RelationshipRecord::new(
            self.spdx_element_id,
            self.related_spdx_element,
            RelationshipType::from_spdx_name(&self.relationship_type),
        ));
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx22ReferenceIn {
    external_document_id: String,
    spdx_document: String,
    checksum: ChecksumIn,
}

impl SectionItem for Spdx22ReferenceIn {
    fn emit(self, cursor: &mut Cursor<'_, '_>) -> Result<(), String> {
        let document_name = self
            .external_document_id
            .strip_prefix("DocumentRef-")
            .unwrap_or(&self.external_document_id)
            .to_owned();
        cursor.emit_reference(ExternalDocumentReference {
            id: self.external_document_id,
            document_name,
            document_namespace: self.spdx_document,
            sha1: self.checksum.checksum_value.to_ascii_lowercase(),
            described_element_id: ROOT_PACKAGE_ID.to_owned(),
        });
        Ok(())
    }
}

/// 3.0 `@graph` 요소. `type`으로 분류한 뒤 해당 형태로 다시 읽습니다.
#[derive(Deserialize)]
struct GraphElementIn(serde_json::Map<String, serde_json::Value>);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx30FileIn {
    name: String,
    #[serde(default)]
    verified_using: Vec<HashIn>,
    #[serde(rename = "software_primaryPurpose")]
    primary_purpose: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx30PackageIn {
    spdx_id: String,
    name: String,
    #[serde(rename = "software_packageVersion")]
    package_version: Option<String>,
    #[serde(rename = "software_packageUrl")]
    package_url: Option<String>,
    supplied_by: Option<String>,
    #[serde(default)]
    verified_using: Vec<HashIn>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx30RelationshipIn {
    from: String,
    relationship_type: String,
    #[serde(default)]
    to: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx30AgentIn {
    spdx_id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx30ImportIn {
    external_spdx_id: String,
    location_hint: Option<String>,
    #[serde(default)]
    verified_using: Vec<HashIn>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Spdx30DocumentIn {
    spdx_id: String,
    name: Option<String>,
    #[serde(default)]
    root_element: Vec<String>,
    #[serde(default)]
    import: Vec<Spdx30ImportIn>,
}

fn read<T: DeserializeOwned>(kind: &str, value: serde_json::Map<String, serde_json::Value>) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::Object(value)).map_err(|e| format!("invalid {kind} element: {e}"))
}

impl SectionItem for GraphElementIn {
    fn emit(self, cursor: &mut Cursor<'_, '_>) -> Result<(), String> {
        let kind = self
            .0
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| "graph element without type".to_owned())?
            .to_owned();

        match kind.as_str() {
            "software_File" => {
                let file: Spdx30FileIn = read(&kind, self.0)?;
                if file.name.trim().is_empty() {
                    return Err("file element with empty name".to_owned());
                }
                let mut record = with_checksums(
                    FileRecord::new(manifest_path_from_spdx(&file.name), FileLocation::InManifest),
                    file.verified_using
                        .iter()
                        .map(|h| (h.algorithm.as_str(), h.hash_value.as_str())),
                );
                if file.primary_purpose.as_deref() == Some("bom") {
                    record.file_types.insert(FileType::Spdx);
                }
                cursor.emit_file(record);
            }
            "software_Package" => {
                let package: Spdx30PackageIn = read(&kind, self.0)?;
                let supplier = package
                    .supplied_by
                    .as_deref()
                    .and_then(|id| cursor.agents.get(id))
                    .map(|name| format!("Organization: {name}"));
                cursor.emit_package(PackageRecord {
                    id: ids::local_id(&package.spdx_id).to_owned(),
                    name: package.name,
                    version: package.package_version.unwrap_or_default(),
                    checksums: package_checksums(
                        package
                            .verified_using
                            .iter()
                            .map(|h| (h.algorithm.as_str(), h.hash_value.as_str())),
                    ),
                    license: LicenseInfo::default(),
                    supplier,
                    depends_on: Vec::new(),
                    purl: package.package_url,
                });
            }
            "Relationship" => {
                let relationship: Spdx30RelationshipIn = read(&kind, self.0)?;
                let relationship_type = RelationshipType::from_spdx_name(&relationship.relationship_type);
                let source = ids::local_id(&relationship.from).to_owned();
                for target in &relationship.to {
                    cursor.emit_relationship(RelationshipRecord::new(
                        source.clone(),
                        ids::local_id(target),
                        relationship_type,
                    ));
                }
            }
            "Organization" | "Person" | "Tool" => {
                let agent: Spdx30AgentIn = read(&kind, self.0)?;
                cursor.enter(ParserState::Metadata);
                cursor.agents.insert(agent.spdx_id, agent.name);
            }
            "CreationInfo" => {
                cursor.enter(ParserState::Metadata);
                cursor.info.created = self
                    .0
                    .get("created")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned);
            }
            "SpdxDocument" => {
                let document: Spdx30DocumentIn = read(&kind, self.0)?;
                cursor.enter(ParserState::Metadata);
                cursor.info.name = document.name;
                cursor.info.namespace = Some(
                    document
                        .spdx_id
                        .rsplit_once('#')
                        .map_or(document.spdx_id.as_str(), |(ns, _)| ns)
                        .to_owned(),
                );
                cursor.info.describes = document
                    .root_element
                    .iter()
                    .map(|id| ids::local_id(id).to_owned())
                    .collect();
                for import in document.import {
                    let Some(sha1) = import
                        .verified_using
                        .iter()
                        .find(|h| HashAlgorithm::from_str_loose(&h.algorithm) == Some(HashAlgorithm::Sha1))
                        .map(|h| h.hash_value.to_ascii_lowercase())
                    else {
                        return Err(format!(
                            "import {} has no sha1 verification",
                            import.external_spdx_id
                        ));
                    };
                    let namespace = import.location_hint.unwrap_or_else(|| {
                        import
                            .external_spdx_id
                            .rsplit_once('#')
                            .map_or(import.external_spdx_id.as_str(), |(ns, _)| ns)
                            .to_owned()
                    });
                    cursor.emit_reference(ExternalDocumentReference {
                        id: ids::document_ref_id(&namespace, &sha1),
                        document_name: namespace.clone(),
                        document_namespace: namespace,
                        sha1,
                        described_element_id: ids::local_id(&import.external_spdx_id).to_owned(),
                    });
                }
            }
            other => {
                debug!(kind = other, "skipping graph element");
                cursor.enter(ParserState::InternalSkip);
            }
        }
        Ok(())
    }
}
