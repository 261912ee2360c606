#![no_main]

use libfuzzer_sys::fuzz_target;
use netwarden_detection::capture::ProviderLoader;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        let _ = ProviderLoader::parse_yaml(yaml_str, "fuzz-input.yml");
    }
});
