#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use sbomforge_core::types::{FileRecord, PackageRecord, ManifestVersion};
use sbomforge_spdx::{ManifestParser, ManifestVisitor, ParserState};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    spdx3: bool,
    bytes: &'a [u8],
}

/// 콜백 호출 수가 문서 정보와 일치하는지 확인하는 방문자
#[derive(Default)]
struct Counter {
    files: usize,
    packages: usize,
}

impl ManifestVisitor for Counter {
    fn on_file(&mut self, _file: FileRecord) {
        self.files += 1;
    }

    fn on_package(&mut self, _package: PackageRecord) {
        self.packages += 1;
    }
}

fuzz_target!(|input: Input<'_>| {
    let version = if input.spdx3 {
        ManifestVersion::Spdx30
    } else {
        ManifestVersion::Spdx22
    };
    let mut parser = ManifestParser::new(version, "fuzz/manifest.spdx.json");
    let mut counter = Counter::default();

    if let Ok(info) = parser.parse(input.bytes, &mut counter) {
        assert_eq!(parser.state(), ParserState::Finished);
        assert_eq!(info.files, counter.files);
        assert_eq!(info.packages, counter.packages);
    }
});
