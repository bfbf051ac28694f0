#![no_main]
use libfuzzer_sys::fuzz_target;
use sigcmp_trace::{Lane, OpenOptions, TraceFile, TraceWriter, WriterOptions};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let Some((&flags, values)) = data.split_first() else {
        return;
    };
    let options = WriterOptions::default().with_compression(flags & 1 == 1);
    let mut writer = TraceWriter::new(options);
    let Ok(lane) = Lane::scalar("Fuzz.Lane.Bytes", values.to_vec()) else {
        return;
    };
    if writer.add(lane.clone()).is_err() {
        return;
    }
    let Ok(bytes) = writer.to_bytes() else {
        return;
    };

    let mut trace = TraceFile::from_reader(Cursor::new(bytes), OpenOptions::default())
        .expect("encoder output must decode");
    let back = trace
        .materialize("Fuzz.Lane.Bytes", 0, None)
        .expect("encoded lane must materialize");
    assert_eq!(back, lane);
});
