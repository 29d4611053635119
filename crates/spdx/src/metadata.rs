//! 문서 메타데이터 제공자
//!
//! 문서 이름, 네임스페이스, 생성 시각, 작성자처럼 문서 수준 헤더에 들어가는
//! 값을 만듭니다. 네임스페이스는 호출마다 새 UUID를 붙이므로 같은 빌드를
//! 다시 생성해도 문서끼리 구분됩니다.

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use sbomforge_core::types::ManifestVersion;

/// 도구 이름과 버전 (`Tool:` 작성자 항목)
pub const TOOL_NAME: &str = concat!("sbomforge-", env!("CARGO_PKG_VERSION"));

/// 문서 수준 메타데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub document_name: String,
    pub namespace: String,
    /// RFC3339 UTC (`2024-01-01T00:00:00Z`)
    pub created: String,
    /// SPDX 2.2 작성자 표기 (`Tool: ...`, `Organization: ...`)
    pub creators: Vec<String>,
    pub package_name: String,
    pub package_version: String,
    /// 공급자 조직 이름 (접두어 없음)
    pub package_supplier: String,
}

impl DocumentMetadata {
    /// 루트 패키지 공급자 표기 (`Organization: ...`)
    pub fn supplier_field(&self) -> String {
        format!("Organization: {}", self.package_supplier)
    }
}

/// 메타데이터 제공 capability
pub trait MetadataProvider: Send + Sync {
    fn metadata(&self, version: ManifestVersion) -> DocumentMetadata;
}

/// 빌드 설정 기반 기본 제공자
#[derive(Debug, Clone)]
pub struct BuildMetadataProvider {
    package_name: String,
    package_version: String,
    package_supplier: String,
    namespace_base_uri: String,
}

impl BuildMetadataProvider {
    pub fn new(
        package_name: impl Into<String>,
        package_version: impl Into<String>,
        package_supplier: impl Into<String>,
        namespace_base_uri: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            package_version: package_version.into(),
            package_supplier: package_supplier.into(),
            namespace_base_uri: namespace_base_uri.into(),
        }
    }
}

impl MetadataProvider for BuildMetadataProvider {
    fn metadata(&self, _version: ManifestVersion) -> DocumentMetadata {
        let base = self.namespace_base_uri.trim_end_matches('/');
        let namespace = format!(
            "{base}/{}/{}/{}",
            self.package_name,
            self.package_version,
            Uuid::new_v4()
        );

        DocumentMetadata {
            document_name: format!("{} {}", self.package_name, self.package_version),
            namespace,
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            creators: vec![
                format!("Organization: {}", self.package_supplier),
                format!("Tool: {TOOL_NAME}"),
            ],
            package_name: self.package_name.clone(),
            package_version: self.package_version.clone(),
            package_supplier: self.package_supplier.clone(),
        }
    }
}
