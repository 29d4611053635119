#![no_main]

use libfuzzer_sys::fuzz_target;
use sbomforge_workflow::scanner::cargo::CargoLockParser;
use sbomforge_workflow::scanner::lockfile::LockfileParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = CargoLockParser.parse(content, "fuzz/Cargo.lock");
    }
});
