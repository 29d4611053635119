//! SPDX 크레이트 에러 타입

use sbomforge_core::error::{ManifestError, SbomError};

/// 문서 생성/파싱 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SpdxError {
    /// 매니페스트 파일 입출력 실패
    #[error("manifest io error: {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// JSON 직렬화 실패
    #[error("json serialization failed: {0}")]
    Serialization(String),

    /// 매니페스트 구조 오류 (치명적)
    #[error("invalid manifest {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    /// 지원하지 않는 문서 버전
    #[error("unsupported manifest version: {0}")]
    UnsupportedVersion(String),
}

impl From<serde_json::Error> for SpdxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SpdxError> for SbomError {
    fn from(err: SpdxError) -> Self {
        match err {
            SpdxError::Io { source, .. } => SbomError::Io(source),
            SpdxError::Serialization(reason) => {
                SbomError::Manifest(ManifestError::Serialization(reason))
            }
            SpdxError::InvalidInput { path, reason } => {
                SbomError::Manifest(ManifestError::InvalidInputFile { path, reason })
            }
            SpdxError::UnsupportedVersion(version) => {
                SbomError::Manifest(ManifestError::UnsupportedVersion(version))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_fatal_manifest_error() {
        let err: SbomError = SpdxError::InvalidInput {
            path: "manifest.spdx.json".to_owned(),
            reason: "expected an object".to_owned(),
        }
        .into();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn serde_error_converts() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SpdxError::from(serde_err);
        assert!(matches!(err, SpdxError::Serialization(_)));
    }
}
