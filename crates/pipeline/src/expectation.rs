//! 매니페스트 기대값 맵
//!
//! 매니페스트가 선언한 경로와 기대 체크섬을 대소문자 무시 키로 보관합니다.
//! 디스크 파일과 조정되는 즉시 항목이 제거되고, 탐색이 끝난 뒤 남은 항목이
//! `MissingFile`로 보고됩니다.
//!
//! 해시 실패나 엔진 무효화로 폐기된 경로는 툼스톤으로 남습니다.
//! 이후 같은 경로의 등록은 무시되므로 폐기된 경로가 `MissingFile`로
//! 되살아나지 않습니다.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use sbomforge_core::types::{Checksums, FileRecord, path_key};

/// 기대값 항목
#[derive(Debug, Clone)]
enum Slot {
    /// 매니페스트 선언 (원래 표기 경로 유지)
    Expected { path: String, checksums: Checksums },
    /// 폐기됨
    Discarded,
}

/// 매니페스트 기대값 맵
///
/// 프로세스 전역 싱글톤이 아니라 실행마다 생성되어 `Arc`로 공유됩니다.
#[derive(Debug, Default)]
pub struct ManifestExpectationMap {
    entries: DashMap<String, Slot>,
}

impl ManifestExpectationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 매니페스트 레코드를 등록합니다.
    ///
    /// 이미 같은 키가 있으면 먼저 등록된 값을 유지하고 `false`를 반환합니다.
    /// 폐기된 키도 `false`.
    pub fn insert(&self, record: &FileRecord) -> bool {
        match self.entries.entry(record.key()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Expected {
                    path: record.path.clone(),
                    checksums: record.checksums.clone(),
                });
                true
            }
        }
    }

    /// 조정된 경로를 제거합니다. 기대값이 있었으면 `true`.
    ///
    /// 툼스톤은 제거하지 않습니다.
    pub fn remove(&self, path: &str) -> bool {
        self.entries
            .remove_if(&path_key(path), |_, slot| {
                matches!(slot, Slot::Expected { .. })
            })
            .is_some()
    }

    /// 경로를 폐기합니다(툼스톤).
    pub fn discard(&self, path: &str) {
        self.entries.insert(path_key(path), Slot::Discarded);
    }

    pub fn is_discarded(&self, path: &str) -> bool {
        self.entries
            .get(&path_key(path))
            .is_some_and(|slot| matches!(slot.value(), Slot::Discarded))
    }

    /// 아직 조정되지 않은 기대값이 있는지 여부
    pub fn contains(&self, path: &str) -> bool {
        self.entries
            .get(&path_key(path))
            .is_some_and(|slot| matches!(slot.value(), Slot::Expected { .. }))
    }

    /// 기대 체크섬을 복제해 반환합니다.
    pub fn expected(&self, path: &str) -> Option<Checksums> {
        self.entries
            .get(&path_key(path))
            .and_then(|slot| match slot.value() {
                Slot::Expected { checksums, .. } => Some(checksums.clone()),
                Slot::Discarded => None,
            })
    }

    /// 남은 기대값 수 (툼스톤 제외)
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Expected { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 남은 기대값의 원래 경로를 정렬해 반환합니다.
    pub fn remaining(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .entries
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Expected { path, .. } => Some(path.clone()),
                Slot::Discarded => None,
            })
            .collect();
        paths.sort();
        paths
    }
}
