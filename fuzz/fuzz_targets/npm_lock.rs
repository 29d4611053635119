#![no_main]

use libfuzzer_sys::fuzz_target;
use sbomforge_workflow::scanner::lockfile::LockfileParser;
use sbomforge_workflow::scanner::npm::NpmLockParser;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = NpmLockParser.parse(content, "fuzz/package-lock.json");
    }
});
