//! Byte-exact wire layout tests.
//!
//! These pin the encoding that existing cluster peers expect. If one of these
//! fails, the change breaks interoperability, not just a test.

use bytes::{Bytes, BytesMut};
use dlm_proto::{
    Header, Message, MessageType, Rcom, RcomLock, RcomPayload, RcomType, Record, RecordBuf,
    RecordKind, WireHeader, WireMessage, WireRcom, WireRcomLock, encode_header,
};
use hex_literal::hex;
use zerocopy::IntoBytes;

fn sample_message() -> Message {
    let mut message = Message::new(MessageType::Request, 0x20, 3)
        .with_extra(Bytes::from_static(b"res"));
    message.nodeid = 7;
    message.pid = 0x1234;
    message.lkid = 0x55;
    message.remid = 0x66;
    message.exflags = 0x10;
    message.flags = 0x2;
    message.lvbseq = 9;
    message.status = 1;
    message.rqmode = 5;
    message.result = (-11i32) as u32;
    message.range = [0, u64::MAX];
    message
}

fn sample_lock_rcom() -> Rcom {
    let lock = RcomLock {
        ownpid: 0x1000,
        lkid: 9,
        lvbseq: 3,
        wait_type: 2,
        range: [1, 2, 3, 4],
        name: Bytes::from_static(b"res"),
        ..RcomLock::default()
    };
    Rcom::new(0x20, 3, 77, RcomPayload::Lock(lock))
}

fn encode(record: impl Into<Record>) -> Bytes {
    let mut buf = BytesMut::new();
    record.into().encode(&mut buf).unwrap();
    buf.freeze()
}

#[test]
fn fixed_sizes() {
    assert_eq!(WireHeader::SIZE, 16);
    assert_eq!(WireMessage::SIZE, 104);
    assert_eq!(WireRcom::SIZE, 32);
    assert_eq!(WireRcomLock::SIZE, 72);
}

#[test]
fn header_is_little_endian_regardless_of_host() {
    let header = Header { version: 1, lockspace: 0x0A0B_0C0D, nodeid: 2, length: 0x0102, cmd: 1 };
    let wire = encode_header(&header);

    // Same bytes whether the test runs on a little- or big-endian host
    assert_eq!(wire.as_bytes(), hex!("01000000 0d0c0b0a 02000000 0201 01 00"));
    assert_ne!(&wire.as_bytes()[0..4], &1u32.to_be_bytes());
}

#[test]
fn message_layout() {
    let bytes = encode(sample_message());
    insta::assert_snapshot!(
        hex::encode(&bytes),
        @"0100020020000000030000006b00010001000000070000003412000055000000660000000000000000000000100000000000000002000000090000000100000000000000050000000000000000000000f5ffffff000000000000000000000000ffffffffffffffff726573"
    );
}

#[test]
fn lock_rcom_layout() {
    let bytes = encode(sample_lock_rcom());
    insta::assert_snapshot!(
        hex::encode(&bytes),
        @"0100020020000000030000006b00020004000000000000004d00000000000000001000000900000000000000000000000000000000000000000000000300000000000000020003000100000000000000020000000000000003000000000000000400000000000000726573"
    );
}

#[test]
fn opaque_rcom_layout() {
    let payload = RcomPayload::opaque(RcomType::Status, Bytes::from_static(&[1, 2, 3, 4])).unwrap();
    let bytes = encode(Rcom::new(0x20, 3, 0x0102_0304_0506_0708, payload));

    assert_eq!(
        &bytes[..],
        hex!(
            "01000200 20000000 03000000 2400 02 00"
            "0100 0000 00000000 0807060504030201"
            "01020304"
        )
    );
}

#[test]
fn decoding_known_bytes() {
    let bytes = Bytes::copy_from_slice(&hex!(
        "01000200 20000000 03000000 6b00 02 00"
        "0400 0000 00000000 4d00000000000000"
        "00100000 09000000 00000000 00000000 00000000 00000000 00000000 03000000 00000000"
        "0200 0300"
        "0100000000000000 0200000000000000 0300000000000000 0400000000000000"
        "726573"
    ));

    let parsed = RecordBuf::parse(bytes).unwrap();
    assert_eq!(parsed.kind(), RecordKind::Rcom);
    assert_eq!(parsed.header().nodeid, 3);
    assert_eq!(parsed.into_record(), Record::Rcom(sample_lock_rcom()));
}
