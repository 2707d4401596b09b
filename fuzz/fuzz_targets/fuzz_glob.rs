#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary override paths must compile or fail with InvalidPattern, never panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let (pattern, path) = text.split_once('\n').unwrap_or((text, "a.b.c"));
        if let Ok(glob) = mongo2elastic_core::GlobPattern::compile(pattern) {
            let _ = glob.is_match(path);
        }
    }
});
