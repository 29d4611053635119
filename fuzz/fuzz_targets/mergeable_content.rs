#![no_main]

use libfuzzer_sys::fuzz_target;

use sbomforge_core::types::ManifestVersion;
use sbomforge_spdx::content_provider_for;

fuzz_target!(|data: &[u8]| {
    let provider = content_provider_for(ManifestVersion::Spdx22);
    if let Ok(content) = provider.extract("fuzz/manifest.spdx.json", data) {
        for root in content.root_packages() {
            assert!(content.packages.iter().any(|p| p.id == root.id));
        }
    }
});
