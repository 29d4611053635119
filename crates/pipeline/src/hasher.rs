//! 다이제스트 계산 단계
//!
//! [`FileHasher`]는 경로 스트림을 `parallelism`개 레인으로 나누고, 레인마다
//! `spawn_blocking`으로 파일을 읽어 다이제스트를 계산합니다.
//! 알고리즘 구현은 [`HashProvider`] capability로 교체할 수 있습니다.
//!
//! 해시에 실패한 경로는 `Other` 에러가 되고, 기대값 맵에 등록되어 있었다면
//! 폐기(툼스톤)되어 `MissingFile`로 다시 집계되지 않습니다.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, warn};

use sbomforge_core::metrics as m;
use sbomforge_core::types::{
    Checksums, ErrorKind, FileLocation, FileRecord, FileType, FileValidationResult, HashAlgorithm,
    manifest_path,
};

use crate::expectation::ManifestExpectationMap;
use crate::stream::{ErrorWriter, StageOutput, StreamReader, StreamWriter, channel, split};

/// 읽기 버퍼 크기
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// SPDX 문서로 취급하는 파일 접미어
const SPDX_FILE_SUFFIX: &str = ".spdx.json";

/// 다이제스트 계산 capability
pub trait HashProvider: Send + Sync {
    /// 리더 내용을 끝까지 읽어 요청한 모든 알고리즘의 16진 다이제스트를 계산합니다.
    fn compute(&self, reader: &mut dyn Read, algorithms: &[HashAlgorithm]) -> io::Result<Checksums>;
}

/// RustCrypto `sha1`/`sha2` 기반 기본 구현
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHashProvider;

enum Digester {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Digester {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha1(d) => d.update(data),
            Self::Sha256(d) => d.update(data),
            Self::Sha512(d) => d.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha1(d) => hex::encode(d.finalize()),
            Self::Sha256(d) => hex::encode(d.finalize()),
            Self::Sha512(d) => hex::encode(d.finalize()),
        }
    }
}

impl HashProvider for DefaultHashProvider {
    fn compute(&self, reader: &mut dyn Read, algorithms: &[HashAlgorithm]) -> io::Result<Checksums> {
        let mut digesters: Vec<(HashAlgorithm, Digester)> = algorithms
            .iter()
            .map(|algorithm| (*algorithm, Digester::new(*algorithm)))
            .collect();

        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for (_, digester) in &mut digesters {
                digester.update(&buffer[..read]);
            }
        }

        Ok(digesters
            .into_iter()
            .map(|(algorithm, digester)| (algorithm, digester.finalize_hex()))
            .collect())
    }
}

/// 메모리 버퍼의 다이제스트를 소문자 16진수로 계산합니다.
pub fn digest_hex(algorithm: HashAlgorithm, data: &[u8]) -> String {
    let mut digester = Digester::new(algorithm);
    digester.update(data);
    digester.finalize_hex()
}

/// 파일 해시 단계
#[derive(Clone)]
pub struct FileHasher {
    root: PathBuf,
    algorithms: Vec<HashAlgorithm>,
    provider: Arc<dyn HashProvider>,
    expectations: Option<Arc<ManifestExpectationMap>>,
    parallelism: usize,
}

impl FileHasher {
    /// 기본 provider로 해시 단계를 만듭니다.
    ///
    /// `algorithms`는 정렬/중복 제거됩니다.
    pub fn new(root: impl Into<PathBuf>, algorithms: &[HashAlgorithm]) -> Self {
        let mut algorithms = algorithms.to_vec();
        algorithms.sort();
        algorithms.dedup();
        Self {
            root: root.into(),
            algorithms,
            provider: Arc::new(DefaultHashProvider),
            expectations: None,
            parallelism: 1,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn HashProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// 실패 시 폐기할 기대값 맵을 연결합니다.
    pub fn with_expectations(mut self, expectations: Arc<ManifestExpectationMap>) -> Self {
        self.expectations = Some(expectations);
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn algorithms(&self) -> &[HashAlgorithm] {
        &self.algorithms
    }

    /// 경로 스트림을 해시된 디스크 레코드 스트림으로 바꿉니다.
    pub fn run(&self, input: StreamReader<PathBuf>) -> StageOutput<FileRecord> {
        let (records, items) = channel();
        let (errors, error_reader) = channel();

        for lane in split(input, self.parallelism) {
            let hasher = self.clone();
            let records = records.clone();
            let errors = errors.clone();
            tokio::spawn(async move {
                hasher.run_lane(lane, records, errors).await;
            });
        }

        StageOutput::new(items, error_reader)
    }

    async fn run_lane(
        &self,
        mut lane: StreamReader<PathBuf>,
        records: StreamWriter<FileRecord>,
        errors: ErrorWriter,
    ) {
        while let Some(path) = lane.read().await {
            let Some(relative) = manifest_path(&self.root, &path) else {
                warn!(path = %path.display(), root = %self.root.display(), "path is outside the build drop");
                errors.write(FileValidationResult::new(
                    path.display().to_string(),
                    ErrorKind::Other,
                ));
                continue;
            };

            match self.hash_file(path.clone()).await {
                Ok(checksums) => {
                    metrics::counter!(m::PIPELINE_FILES_HASHED_TOTAL).increment(1);
                    let mut record = FileRecord::new(relative, FileLocation::OnDisk);
                    for (algorithm, digest) in checksums {
                        record = record.with_checksum(algorithm, digest);
                    }
                    if record.path.to_ascii_lowercase().ends_with(SPDX_FILE_SUFFIX) {
                        record.file_types.insert(FileType::Spdx);
                    }
                    records.write(record);
                }
                Err(e) => {
                    metrics::counter!(m::PIPELINE_HASH_FAILURES_TOTAL).increment(1);
                    warn!(path = %path.display(), error = %e, "failed to hash file");
                    if let Some(expectations) = &self.expectations {
                        expectations.discard(&relative);
                    }
                    errors.write(FileValidationResult::new(relative, ErrorKind::Other));
                }
            }
        }
    }

    /// 파일 하나를 블로킹 스레드에서 해시하고 결과를 검증합니다.
    async fn hash_file(&self, path: PathBuf) -> io::Result<Checksums> {
        let provider = Arc::clone(&self.provider);
        let algorithms = self.algorithms.clone();

        let checksums = tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path)?;
            provider.compute(&mut file, &algorithms)
        })
        .await
        .map_err(|e| io::Error::other(format!("hash task failed: {e}")))??;

        for algorithm in &self.algorithms {
            match checksums.get(algorithm) {
                Some(digest) if is_valid_digest(*algorithm, digest) => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("provider returned an empty or malformed {algorithm} digest"),
                    ));
                }
            }
        }

        debug!(algorithms = self.algorithms.len(), "file hashed");
        Ok(checksums)
    }
}

fn is_valid_digest(algorithm: HashAlgorithm, digest: &str) -> bool {
    digest.len() == algorithm.hex_len() && digest.chars().all(|c| c.is_ascii_hexdigit())
}

/// 단일 파일의 다이제스트를 동기적으로 계산합니다.
pub fn hash_path(path: &Path, algorithms: &[HashAlgorithm]) -> io::Result<Checksums> {
    let mut file = std::fs::File::open(path)?;
    DefaultHashProvider.compute(&mut file, algorithms)
}
