//! 출력 디렉토리 수명주기와 `.sha256` 사이드카
//!
//! 기본 경로(`<build_drop>/_manifest`)는 도구 소유이므로 삭제 후 재생성하고
//! 실패 시 정리합니다. 사용자가 지정한 디렉토리는 절대 삭제하지 않으며,
//! 비어있지 않으면 생성을 거부합니다.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use sbomforge_core::types::HashAlgorithm;
use sbomforge_pipeline::hash_path;

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;

/// 사이드카 확장자
pub const SIDECAR_EXTENSION: &str = "sha256";

/// 준비된 출력 디렉토리
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    path: PathBuf,
    tool_owned: bool,
}

impl OutputDirectory {
    /// 설정에 따라 출력 디렉토리를 준비합니다.
    ///
    /// - 기본 경로: `delete_manifest_dir_if_present`이면 삭제 후 재생성,
    ///   아니면 비어있을 때만 사용
    /// - 사용자 경로: 비어있지 않으면 `OutputDirNotEmpty`
    pub async fn prepare(config: &WorkflowConfig) -> Result<Self, WorkflowError> {
        let path = config.manifest_dir();
        let tool_owned = config.uses_default_manifest_dir();

        if tokio::fs::try_exists(&path)
            .await
            .map_err(|e| WorkflowError::io(&path, e))?
        {
            if tool_owned && config.delete_manifest_dir_if_present {
                info!(path = %path.display(), "removing existing manifest directory");
                tokio::fs::remove_dir_all(&path)
                    .await
                    .map_err(|e| WorkflowError::io(&path, e))?;
            } else if !is_empty_dir(&path).await? {
                return Err(WorkflowError::OutputDirNotEmpty {
                    path: path.display().to_string(),
                });
            }
        }

        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| WorkflowError::io(&path, e))?;
        Ok(Self { path, tool_owned })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_tool_owned(&self) -> bool {
        self.tool_owned
    }

    /// 실패 시 정리합니다. 도구 소유 경로만 삭제합니다.
    pub async fn cleanup_on_failure(&self) {
        if !self.tool_owned {
            warn!(
                path = %self.path.display(),
                "generation failed; leaving user-provided output directory in place"
            );
            return;
        }
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => info!(path = %self.path.display(), "removed partial manifest output"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove partial output"),
        }
    }
}

async fn is_empty_dir(path: &Path) -> Result<bool, WorkflowError> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| WorkflowError::io(path, e))?;
    Ok(entries
        .next_entry()
        .await
        .map_err(|e| WorkflowError::io(path, e))?
        .is_none())
}

/// 매니페스트의 사이드카 경로 (`manifest.spdx.json.sha256`)
pub fn sidecar_path(manifest: &Path) -> PathBuf {
    let mut name = manifest.as_os_str().to_owned();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

/// 매니페스트의 SHA256을 계산해 사이드카 파일로 씁니다.
pub async fn write_sidecar(manifest: &Path) -> Result<PathBuf, WorkflowError> {
    let digest = manifest_digest(manifest).await?;
    let sidecar = sidecar_path(manifest);
    tokio::fs::write(&sidecar, format!("{digest}\n"))
        .await
        .map_err(|e| WorkflowError::io(&sidecar, e))?;
    Ok(sidecar)
}

/// 매니페스트 파일의 소문자 hex SHA256
pub async fn manifest_digest(manifest: &Path) -> Result<String, WorkflowError> {
    let path = manifest.to_path_buf();
    let mut checksums =
        tokio::task::spawn_blocking(move || hash_path(&path, &[HashAlgorithm::Sha256]))
            .await
            .map_err(WorkflowError::join)?
            .map_err(|e| WorkflowError::io(manifest, e))?;
    checksums.remove(&HashAlgorithm::Sha256).ok_or_else(|| {
        WorkflowError::io(manifest, std::io::Error::other("sha256 digest missing"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfigBuilder;
    use sbomforge_pipeline::digest_hex;

    #[tokio::test]
    async fn default_dir_is_recreated() {
        let drop = tempfile::tempdir().unwrap();
        let stale = drop.path().join("_manifest/spdx_2.2/old.json");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"{}").unwrap();

        let config = WorkflowConfigBuilder::new()
            .build_drop_path(drop.path())
            .build()
            .unwrap();
        let output = OutputDirectory::prepare(&config).await.unwrap();

        assert!(output.is_tool_owned());
        assert!(output.path().exists());
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn non_empty_user_dir_is_rejected_and_kept() {
        let drop = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("keep.txt"), b"mine").unwrap();

        let config = WorkflowConfigBuilder::new()
            .build_drop_path(drop.path())
            .manifest_dir_path(out.path())
            .build()
            .unwrap();
        let result = OutputDirectory::prepare(&config).await;

        assert!(matches!(result, Err(WorkflowError::OutputDirNotEmpty { .. })));
        assert!(out.path().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn empty_user_dir_is_accepted_and_never_cleaned() {
        let drop = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let config = WorkflowConfigBuilder::new()
            .build_drop_path(drop.path())
            .manifest_dir_path(out.path())
            .build()
            .unwrap();
        let output = OutputDirectory::prepare(&config).await.unwrap();
        assert!(!output.is_tool_owned());

        output.cleanup_on_failure().await;
        assert!(out.path().exists());
    }

    #[tokio::test]
    async fn tool_owned_dir_is_cleaned_on_failure() {
        let drop = tempfile::tempdir().unwrap();
        let config = WorkflowConfigBuilder::new()
            .build_drop_path(drop.path())
            .build()
            .unwrap();
        let output = OutputDirectory::prepare(&config).await.unwrap();

        output.cleanup_on_failure().await;
        assert!(!output.path().exists());
    }

    #[tokio::test]
    async fn sidecar_holds_lowercase_digest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.spdx.json");
        std::fs::write(&manifest, b"{\"a\":1}").unwrap();

        let sidecar = write_sidecar(&manifest).await.unwrap();

        assert_eq!(sidecar, dir.path().join("manifest.spdx.json.sha256"));
        let content = std::fs::read_to_string(sidecar).unwrap();
        assert_eq!(
            content.trim(),
            digest_hex(HashAlgorithm::Sha256, b"{\"a\":1}")
        );
    }
}
