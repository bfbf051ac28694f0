#![no_main]
use libfuzzer_sys::fuzz_target;
use sigcmp_trace::{OpenOptions, TraceFile};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must be rejected with an error, never a panic
    let Ok(mut trace) = TraceFile::from_reader(Cursor::new(data.to_vec()), OpenOptions::default()) else {
        return;
    };
    let names: Vec<String> = trace.catalog().names().map(str::to_string).collect();
    for name in names.iter().take(16) {
        let _ = trace.materialize(name, 0, None);
        let _ = trace.materialize(name, 3, Some(5));
    }
});
