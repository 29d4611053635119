//! 생성 -> 파싱 왕복 통합 테스트

use std::collections::BTreeMap;
use std::sync::Arc;

use sbomforge_core::telemetry::RunRecorder;
use sbomforge_core::types::{
    Action, ExternalDocumentReference, FileLocation, FileRecord, FileType, HashAlgorithm,
    ManifestVersion, PackageRecord, RelationshipType,
};
use sbomforge_pipeline::digest_hex;
use sbomforge_spdx::{
    BuildMetadataProvider, DocumentContent, ManifestGenerator, ManifestParser, ManifestVisitor,
    MetadataProvider, SbomConfig, content_provider_for, ids, root_package,
};

#[derive(Default)]
struct Files(Vec<FileRecord>);

impl ManifestVisitor for Files {
    fn on_file(&mut self, file: FileRecord) {
        self.0.push(file);
    }
}

fn file(path: &str, content: &[u8]) -> FileRecord {
    let mut record = FileRecord::new(path, FileLocation::OnDisk);
    for algorithm in [HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
        record = record.with_checksum(algorithm, digest_hex(algorithm, content));
    }
    record
}

fn package(name: &str, version: &str, deps: &[&str]) -> PackageRecord {
    PackageRecord {
        id: ids::package_id(name, version),
        name: name.to_owned(),
        version: version.to_owned(),
        supplier: Some("Organization: Acme".to_owned()),
        depends_on: deps.iter().map(|d| (*d).to_owned()).collect(),
        ..Default::default()
    }
}

fn content(provider: &BuildMetadataProvider, version: ManifestVersion) -> (DocumentContent, sbomforge_spdx::DocumentMetadata) {
    let metadata = provider.metadata(version);
    let b = package("b", "2.0", &[]);
    let a = package("a", "1.0", &[&b.id]);
    let mut bom = file("/lib/other.spdx.json", b"{}");
    bom.file_types.insert(FileType::Spdx);
    let content = DocumentContent::new(
        vec![file("/bin/app", b"app"), file("/README.md", b"readme"), bom],
        root_package(&metadata),
        vec![a, b],
        vec![ExternalDocumentReference {
            id: ids::document_ref_id("lib", "0123"),
            document_name: "lib".to_owned(),
            document_namespace: "https://lib/ns".to_owned(),
            sha1: "0123".to_owned(),
            described_element_id: ids::ROOT_PACKAGE_ID.to_owned(),
        }],
    );
    (content, metadata)
}

fn generate(dir: &std::path::Path, version: ManifestVersion) -> (DocumentContent, Vec<u8>) {
    let provider = BuildMetadataProvider::new("app", "1.0", "Contoso", "https://sbom.example");
    let (content, metadata) = content(&provider, version);
    let config = SbomConfig::create(
        version,
        dir,
        metadata,
        Arc::new(RunRecorder::new(Action::Generate)),
    )
    .unwrap();
    let result = ManifestGenerator::new(config).generate(&content).unwrap();
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    (content, std::fs::read(result.path).unwrap())
}

fn by_path(files: &[FileRecord]) -> BTreeMap<String, (Option<String>, bool)> {
    files
        .iter()
        .map(|f| {
            (
                f.path.clone(),
                (
                    f.checksum(HashAlgorithm::Sha256).map(str::to_owned),
                    f.file_types.contains(&FileType::Spdx),
                ),
            )
        })
        .collect()
}

#[test]
fn spdx22_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (content, bytes) = generate(dir.path(), ManifestVersion::Spdx22);

    let mut visitor = Files::default();
    let info = ManifestParser::new(ManifestVersion::Spdx22, "m")
        .parse(&bytes, &mut visitor)
        .unwrap();

    assert_eq!(info.files, 3);
    assert_eq!(info.references, 1);
    assert_eq!(by_path(&visitor.0), by_path(&content.files));
    assert!(visitor.0.iter().all(|f| f.location == FileLocation::InManifest));
}

#[test]
fn spdx30_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (content, bytes) = generate(dir.path(), ManifestVersion::Spdx30);

    let mut visitor = Files::default();
    let info = ManifestParser::new(ManifestVersion::Spdx30, "m")
        .parse(&bytes, &mut visitor)
        .unwrap();

    assert_eq!(info.describes, vec![ids::ROOT_PACKAGE_ID]);
    assert_eq!(info.references, 1);
    assert_eq!(by_path(&visitor.0), by_path(&content.files));
}

#[test]
fn spdx22_content_keeps_dependency_graph() {
    let dir = tempfile::tempdir().unwrap();
    let (content, bytes) = generate(dir.path(), ManifestVersion::Spdx22);

    let extracted = content_provider_for(ManifestVersion::Spdx22)
        .extract("m", &bytes)
        .unwrap();

    assert_eq!(extracted.root_ids, vec![ids::ROOT_PACKAGE_ID]);
    let a = &content.packages[0];
    let b = &content.packages[1];
    let extracted_a = extracted.packages.iter().find(|p| p.id == a.id).unwrap();
    assert_eq!(extracted_a.depends_on, vec![b.id.clone()]);
    assert_eq!(extracted_a.supplier.as_deref(), Some("Organization: Acme"));

    let root = extracted.root_packages().next().unwrap();
    assert_eq!(root.depends_on, vec![a.id.clone()]);
}

#[test]
fn spdx30_content_keeps_dependency_graph() {
    let dir = tempfile::tempdir().unwrap();
    let (content, bytes) = generate(dir.path(), ManifestVersion::Spdx30);

    let extracted = content_provider_for(ManifestVersion::Spdx30)
        .extract("m", &bytes)
        .unwrap();

    let a = &content.packages[0];
    let extracted_a = extracted.packages.iter().find(|p| p.id == a.id).unwrap();
    assert_eq!(extracted_a.depends_on, vec![content.packages[1].id.clone()]);
    assert!(
        extracted
            .relationships
            .iter()
            .any(|r| r.relationship_type == RelationshipType::DependsOn)
    );
}

#[test]
fn spdx30_graph_ids_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let (_, bytes) = generate(dir.path(), ManifestVersion::Spdx30);
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let mut ids: Vec<&str> = doc["@graph"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["spdxId"].as_str())
        .collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
}
