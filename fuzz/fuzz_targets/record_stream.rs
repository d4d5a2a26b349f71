//! Fuzz stream framing: feed arbitrary bytes in arbitrary chunk sizes and
//! check framing never panics or loops.

#![no_main]

use bytes::BytesMut;
use dlm_proto::RecordBuf;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, &[u8])| {
    let (chunk, data) = input;
    let chunk = usize::from(chunk.max(1));

    let mut stream = BytesMut::new();
    for piece in data.chunks(chunk) {
        stream.extend_from_slice(piece);
        loop {
            match RecordBuf::split_from(&mut stream) {
                Ok(Some(record)) => assert!(record.as_bytes().len() >= 16),
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
});
