//! 버전별 매니페스트 출력 구성
//!
//! 한 스키마 버전의 매니페스트 파일 하나를 쓰는 데 필요한 작성기,
//! 메타데이터, 실행 기록기를 묶습니다.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use sbomforge_core::telemetry::RunRecorder;
use sbomforge_core::types::ManifestVersion;

use crate::error::SpdxError;
use crate::metadata::DocumentMetadata;
use crate::writer::ManifestWriter;

/// 매니페스트 파일 이름
pub const MANIFEST_FILE_NAME: &str = "manifest.spdx.json";

/// `<manifest_dir>/spdx_<version>/manifest.spdx.json`
pub fn manifest_file_path(manifest_dir: &Path, version: ManifestVersion) -> PathBuf {
    manifest_dir.join(version.dir_name()).join(MANIFEST_FILE_NAME)
}

/// 버전별 출력 구성
pub struct SbomConfig {
    pub version: ManifestVersion,
    pub manifest_path: PathBuf,
    pub writer: ManifestWriter<BufWriter<File>>,
    pub metadata: DocumentMetadata,
    pub recorder: Arc<RunRecorder>,
}

impl SbomConfig {
    /// 버전 디렉토리를 만들고 매니페스트 파일을 엽니다.
    pub fn create(
        version: ManifestVersion,
        manifest_dir: &Path,
        metadata: DocumentMetadata,
        recorder: Arc<RunRecorder>,
    ) -> Result<Self, SpdxError> {
        let manifest_path = manifest_file_path(manifest_dir, version);
        let target = manifest_path.display().to_string();

        if let Some(parent) = manifest_path.parent() {
            fs::create_dir_all(parent).map_err(|source| SpdxError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let file = File::create(&manifest_path).map_err(|source| SpdxError::Io {
            path: target.clone(),
            source,
        })?;
        debug!(path = %target, version = version.as_str(), "manifest file created");

        Ok(Self {
            version,
            manifest_path,
            writer: ManifestWriter::new(BufWriter::new(file), target),
            metadata,
            recorder,
        })
    }
}
