//! 매니페스트 서명 검증
//!
//! [`SignatureValidator`]는 파싱 전에 매니페스트 무결성을 확인하는
//! capability입니다. 실패하면 Validate 워크플로우 전체가 중단됩니다.

use std::collections::BTreeMap;
use std::path::Path;
use std::pin::Pin;

use tracing::debug;

use crate::error::WorkflowError;
use crate::output::{manifest_digest, sidecar_path};

/// 서명 검증 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureOutcome {
    pub passed: bool,
    /// 실행 텔레메트리에 합쳐지는 키-값
    pub telemetry: BTreeMap<String, String>,
}

impl SignatureOutcome {
    fn new(validator: &str, passed: bool) -> Self {
        let mut telemetry = BTreeMap::new();
        telemetry.insert("signature.validator".to_owned(), validator.to_owned());
        telemetry.insert("signature.passed".to_owned(), passed.to_string());
        Self { passed, telemetry }
    }

    fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.telemetry.insert(format!("signature.{key}"), value.into());
        self
    }
}

/// 동적 디스패치용 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 서명 검증 capability
///
/// `Arc<dyn SignatureValidator>`로 워크플로우에 주입되도록 `BoxFuture`를 반환합니다.
pub trait SignatureValidator: Send + Sync {
    fn name(&self) -> &str;

    /// 매니페스트를 검증합니다. 검증 자체를 수행할 수 없을 때만 `Err`.
    fn validate<'a>(
        &'a self,
        manifest: &'a Path,
    ) -> BoxFuture<'a, Result<SignatureOutcome, WorkflowError>>;
}

/// `.sha256` 사이드카와 매니페스트 다이제스트를 비교합니다.
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarHashValidator;

impl SignatureValidator for SidecarHashValidator {
    fn name(&self) -> &str {
        "sidecar-sha256"
    }

    fn validate<'a>(
        &'a self,
        manifest: &'a Path,
    ) -> BoxFuture<'a, Result<SignatureOutcome, WorkflowError>> {
        Box::pin(self.compare(manifest))
    }
}

impl SidecarHashValidator {
    async fn compare(&self, manifest: &Path) -> Result<SignatureOutcome, WorkflowError> {
        let sidecar = sidecar_path(manifest);
        let expected = match tokio::fs::read_to_string(&sidecar).await {
            Ok(content) => content.trim().to_ascii_lowercase(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(sidecar = %sidecar.display(), "signature sidecar not found");
                return Ok(SignatureOutcome::new(self.name(), false).with("reason", "sidecar missing"));
            }
            Err(e) => return Err(WorkflowError::io(&sidecar, e)),
        };

        let actual = manifest_digest(manifest).await?;
        let passed = actual == expected;
        debug!(manifest = %manifest.display(), passed, "sidecar digest compared");

        let outcome = SignatureOutcome::new(self.name(), passed);
        Ok(if passed {
            outcome
        } else {
            outcome.with("reason", "digest mismatch")
        })
    }
}

/// 항상 통과하는 검증기 (`verify_signature = false`)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSignatureValidator;

impl SignatureValidator for NoopSignatureValidator {
    fn name(&self) -> &str {
        "noop"
    }

    fn validate<'a>(
        &'a self,
        _manifest: &'a Path,
    ) -> BoxFuture<'a, Result<SignatureOutcome, WorkflowError>> {
        Box::pin(async move { Ok(SignatureOutcome::new(self.name(), true)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::write_sidecar;

    #[tokio::test]
    async fn sidecar_match_passes() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.spdx.json");
        std::fs::write(&manifest, b"{}").unwrap();
        write_sidecar(&manifest).await.unwrap();

        let outcome = SidecarHashValidator.validate(&manifest).await.unwrap();
        assert!(outcome.passed);
        assert_eq!(
            outcome.telemetry.get("signature.validator").map(String::as_str),
            Some("sidecar-sha256")
        );
    }

    #[tokio::test]
    async fn tampered_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.spdx.json");
        std::fs::write(&manifest, b"{}").unwrap();
        write_sidecar(&manifest).await.unwrap();
        std::fs::write(&manifest, b"{\"x\":1}").unwrap();

        let outcome = SidecarHashValidator.validate(&manifest).await.unwrap();
        assert!(!outcome.passed);
        assert_eq!(
            outcome.telemetry.get("signature.reason").map(String::as_str),
            Some("digest mismatch")
        );
    }

    #[tokio::test]
    async fn missing_sidecar_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.spdx.json");
        std::fs::write(&manifest, b"{}").unwrap();

        let outcome = SidecarHashValidator.validate(&manifest).await.unwrap();
        assert!(!outcome.passed);
    }

    #[tokio::test]
    async fn noop_always_passes() {
        let outcome = NoopSignatureValidator
            .validate(Path::new("/nonexistent"))
            .await
            .unwrap();
        assert!(outcome.passed);
    }
}
