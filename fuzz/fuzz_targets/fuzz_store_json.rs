#![no_main]

use libfuzzer_sys::fuzz_target;
use relaypanel::config::{AliasStore, AppConfig};

fuzz_target!(|data: &[u8]| {
    // Both JSON files are user-editable; parsing must fail cleanly, never panic
    if let Ok(s) = std::str::from_utf8(data) {
        let _config: Result<AppConfig, _> = serde_json::from_str(s);
        if let Ok(store) = AliasStore::parse(s) {
            let _ = store.len();
        }
    }
});
