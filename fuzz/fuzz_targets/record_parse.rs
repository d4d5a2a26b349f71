//! Fuzz the record boundary with arbitrary bytes.
//!
//! Anything that parses must re-encode to exactly the bytes it was parsed
//! from.

#![no_main]

use bytes::{Bytes, BytesMut};
use dlm_proto::RecordBuf;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(parsed) = RecordBuf::parse(Bytes::copy_from_slice(data)) else {
        return;
    };

    let mut buf = BytesMut::new();
    let record = parsed.record().clone();
    if record.encode(&mut buf).is_err() {
        panic!("parsed record failed to encode: {record:?}");
    }

    // Reserved and pad bytes are written as zero, so compare decoded values
    let reparsed = RecordBuf::parse(buf.freeze());
    assert_eq!(reparsed.map(RecordBuf::into_record).ok(), Some(record));
});
