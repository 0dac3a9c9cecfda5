#![no_main]

use libfuzzer_sys::fuzz_target;
use relaypanel::device::DeviceId;
use relaypanel::relay::{ChannelRow, TimeUnit, parse_duration};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    for unit in TimeUnit::ALL {
        if let Ok(seconds) = parse_duration(s, unit) {
            assert!(seconds.is_finite() && seconds >= 0.0);
        }
    }

    let _ = DeviceId::new(s);

    // A rejected entry must leave the previous duration in place
    if let Ok(id) = DeviceId::new("AB12C") {
        let mut row = ChannelRow::new(id, 0, 1, 0.2, "AB12C1");
        if row.set_duration(s, "ms").is_err() {
            assert!((row.duration() - 0.2).abs() < f64::EPSILON);
        }
    }
});
