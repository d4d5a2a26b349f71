//! Codecs share no state, so encoding on many threads at once must give the
//! same bytes as encoding one record after another.

use std::thread;

use bytes::{Bytes, BytesMut};
use dlm_proto::{Message, MessageType, Rcom, RcomLock, RcomPayload, Record, RecordBuf, hash};

fn records() -> Vec<Record> {
    (0u32..32)
        .map(|i| {
            if i % 2 == 0 {
                let mut message = Message::new(MessageType::Convert, i, i + 1)
                    .with_extra(Bytes::from(format!("resource-{i}")));
                message.lkid = i.wrapping_mul(0x9E37_79B9);
                message.range = [u64::from(i), u64::MAX - u64::from(i)];
                Record::Message(message)
            } else {
                let lock = RcomLock {
                    lkid: i,
                    range: [u64::from(i); 4],
                    name: Bytes::from(format!("recovered-{i}")),
                    ..RcomLock::default()
                };
                Record::Rcom(Rcom::new(i, i + 1, u64::from(i) << 32, RcomPayload::Lock(lock)))
            }
        })
        .collect()
}

fn encode(record: &Record) -> Bytes {
    let mut buf = BytesMut::with_capacity(record.encoded_len());
    record.encode(&mut buf).unwrap();
    buf.freeze()
}

#[test]
fn concurrent_encoding_matches_sequential() {
    let records = records();
    let sequential: Vec<Bytes> = records.iter().map(encode).collect();

    let concurrent: Vec<Bytes> = thread::scope(|scope| {
        let handles: Vec<_> =
            records.iter().map(|record| scope.spawn(move || encode(record))).collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(concurrent, sequential);
}

#[test]
fn concurrent_decoding_matches_sequential() {
    let records = records();
    let encoded: Vec<Bytes> = records.iter().map(encode).collect();

    let decoded: Vec<Record> = thread::scope(|scope| {
        let handles: Vec<_> = encoded
            .iter()
            .map(|bytes| {
                let bytes = bytes.clone();
                scope.spawn(move || RecordBuf::parse(bytes).unwrap().into_record())
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(decoded, records);
}

#[test]
fn concurrent_hashing_matches_sequential() {
    let names: Vec<String> = (0..64).map(|i| format!("lock-resource-{i}")).collect();
    let sequential: Vec<u32> = names.iter().map(|name| hash(name.as_bytes())).collect();

    let concurrent: Vec<u32> = thread::scope(|scope| {
        let handles: Vec<_> =
            names.iter().map(|name| scope.spawn(move || hash(name.as_bytes()))).collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(concurrent, sequential);
}
