//! Record boundary between the transport and the codecs.
//!
//! The transport hands bytes to [`RecordBuf::parse`] (or frames them off a
//! stream with [`RecordBuf::split_from`]). That is the only place a record is
//! checked: header present, `length` within bounds for the record kind,
//! command byte and recovery tag known, lock name inside the record. A
//! `RecordBuf` that exists is a record the rest of the lock manager can use
//! without further checks.
//!
//! Payload regions (message `extra`, opaque recovery payloads, lock names)
//! are slices of the input buffer, not copies.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};
use zerocopy::FromBytes;

use crate::{
    errors::{ProtocolError, Result},
    header::{Header, RecordKind, WireHeader},
    message::{Message, WireMessage},
    rcom::{Rcom, WireRcom},
};

/// A decoded record of either kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Lock operation message
    Message(Message),
    /// Recovery command
    Rcom(Rcom),
}

impl Record {
    /// Envelope of the record.
    pub const fn header(&self) -> &Header {
        match self {
            Self::Message(message) => &message.header,
            Self::Rcom(rcom) => &rcom.header,
        }
    }

    /// Record kind, from the variant.
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Message(_) => RecordKind::Message,
            Self::Rcom(_) => RecordKind::Rcom,
        }
    }

    /// Size of the encoded record.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Message(message) => message.encoded_len(),
            Self::Rcom(rcom) => rcom.encoded_len(),
        }
    }

    /// Write the record to the front of `dst`, returning the bytes written.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        match self {
            Self::Message(message) => message.encode_into(dst),
            Self::Rcom(rcom) => rcom.encode_into(dst),
        }
    }

    /// Append the record to `dst`, returning the bytes written.
    ///
    /// On error `dst` is left as it was.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<usize> {
        let start = dst.len();
        dst.resize(start + self.encoded_len(), 0);

        match self.encode_into(&mut dst[start..]) {
            Ok(written) => Ok(written),
            Err(err) => {
                dst.truncate(start);
                Err(err)
            },
        }
    }
}

impl From<Message> for Record {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Rcom> for Record {
    fn from(rcom: Rcom) -> Self {
        Self::Rcom(rcom)
    }
}

/// Validated record together with the bytes it was read from.
#[derive(Debug, Clone)]
pub struct RecordBuf {
    bytes: Bytes,
    record: Record,
}

impl RecordBuf {
    /// Validate and decode one record from the front of `bytes`.
    ///
    /// Bytes past the header `length` are not part of the record and are
    /// dropped.
    pub fn parse(bytes: Bytes) -> Result<Self> {
        Self::parse_record(bytes).inspect_err(|err| debug!(%err, "rejected record"))
    }

    /// Frame one record off the front of a stream buffer.
    ///
    /// Returns `Ok(None)` until `buf` holds a whole record. A header whose
    /// length could never frame a record is an error, since waiting for more
    /// bytes would not help.
    pub fn split_from(buf: &mut BytesMut) -> Result<Option<Self>> {
        let Ok((header, _)) = WireHeader::read_from_prefix(buf) else {
            return Ok(None);
        };

        let length = header.length();
        if usize::from(length) < WireHeader::SIZE {
            debug!(length, "unframeable record length");
            return Err(ProtocolError::InvalidLength { declared: length, minimum: WireHeader::SIZE });
        }
        if buf.len() < usize::from(length) {
            trace!(length, buffered = buf.len(), "waiting for rest of record");
            return Ok(None);
        }

        Self::parse(buf.split_to(usize::from(length)).freeze()).map(Some)
    }

    fn parse_record(mut bytes: Bytes) -> Result<Self> {
        let (header, _) = WireHeader::read_from_prefix(&bytes).map_err(|_| {
            ProtocolError::Truncated { needed: WireHeader::SIZE, available: bytes.len() }
        })?;

        let kind = RecordKind::try_from(header.cmd())?;
        let minimum = match kind {
            RecordKind::Message => WireMessage::SIZE,
            RecordKind::Rcom => WireRcom::SIZE,
        };

        let declared = header.length();
        let length = usize::from(declared);
        if length < minimum {
            return Err(ProtocolError::InvalidLength { declared, minimum });
        }
        if length > bytes.len() {
            return Err(ProtocolError::Truncated { needed: length, available: bytes.len() });
        }
        bytes.truncate(length);

        let record = match kind {
            RecordKind::Message => Record::Message(Message::parse(&bytes)?),
            RecordKind::Rcom => Record::Rcom(Rcom::parse(&bytes)?),
        };

        trace!(?kind, length, "parsed record");
        Ok(Self { bytes, record })
    }

    /// Envelope of the record.
    pub const fn header(&self) -> &Header {
        self.record.header()
    }

    /// Record kind.
    pub const fn kind(&self) -> RecordKind {
        self.record.kind()
    }

    /// The record's bytes, exactly `header().length` long.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decoded record.
    pub const fn record(&self) -> &Record {
        &self.record
    }

    /// Take the decoded record.
    pub fn into_record(self) -> Record {
        self.record
    }

    /// Take the record's bytes, for forwarding without re-encoding.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        message::MessageType,
        rcom::{RcomLock, RcomPayload},
    };

    fn message() -> Message {
        let mut message = Message::new(MessageType::Request, 0x20, 3)
            .with_extra(Bytes::from_static(b"lock-name"));
        message.lkid = 0x55;
        message.range = [0, u64::MAX];
        message
    }

    fn lock_rcom() -> Rcom {
        let lock = RcomLock {
            lkid: 9,
            wait_type: 2,
            name: Bytes::from_static(b"res"),
            ..RcomLock::default()
        };
        Rcom::new(0x20, 3, 77, RcomPayload::Lock(lock))
    }

    fn encoded(record: &Record) -> BytesMut {
        let mut buf = BytesMut::new();
        record.encode(&mut buf).unwrap();
        buf
    }

    #[test]
    fn parse_message() {
        let record = Record::from(message());
        let parsed = RecordBuf::parse(encoded(&record).freeze()).unwrap();

        assert_eq!(parsed.kind(), RecordKind::Message);
        assert_eq!(parsed.record(), &record);
        assert_eq!(parsed.as_bytes().len(), usize::from(parsed.header().length));
    }

    #[test]
    fn parse_drops_bytes_past_length() {
        let record = Record::from(lock_rcom());
        let mut buf = encoded(&record);
        buf.extend_from_slice(b"next record");

        let parsed = RecordBuf::parse(buf.freeze()).unwrap();
        assert_eq!(parsed.into_record(), record);
    }

    #[test]
    fn parse_rejects_short_header() {
        assert_eq!(
            RecordBuf::parse(Bytes::from_static(&[1, 0, 0, 0])).err(),
            Some(ProtocolError::Truncated { needed: WireHeader::SIZE, available: 4 })
        );
    }

    #[test]
    fn parse_rejects_unknown_kind() {
        let mut buf = encoded(&Record::from(message()));
        buf[14] = 9;
        assert_eq!(
            RecordBuf::parse(buf.freeze()).err(),
            Some(ProtocolError::UnknownRecordKind(9))
        );
    }

    #[test]
    fn parse_rejects_length_below_fixed_part() {
        let mut buf = encoded(&Record::from(message()));
        buf[12..14].copy_from_slice(&40u16.to_le_bytes());
        assert_eq!(
            RecordBuf::parse(buf.freeze()).err(),
            Some(ProtocolError::InvalidLength { declared: 40, minimum: WireMessage::SIZE })
        );
    }

    #[test]
    fn parse_rejects_length_past_buffer() {
        let buf = encoded(&Record::from(message()));
        let cut = buf.len() - 1;
        assert_eq!(
            RecordBuf::parse(buf.freeze().slice(..cut)).err(),
            Some(ProtocolError::Truncated { needed: cut + 1, available: cut })
        );
    }

    #[test]
    fn split_from_frames_a_stream() {
        let first = Record::from(message());
        let second = Record::from(lock_rcom());
        let mut stream = encoded(&first);
        stream.extend_from_slice(&encoded(&second));

        // Hold back the last byte of the second record
        let last = stream.split_off(stream.len() - 1);

        let a = RecordBuf::split_from(&mut stream).unwrap().unwrap();
        assert_eq!(a.record(), &first);
        assert!(RecordBuf::split_from(&mut stream).unwrap().is_none());

        stream.unsplit(last);
        let b = RecordBuf::split_from(&mut stream).unwrap().unwrap();
        assert_eq!(b.record(), &second);
        assert!(stream.is_empty());
        assert!(RecordBuf::split_from(&mut stream).unwrap().is_none());
    }

    #[test]
    fn split_from_rejects_zero_length() {
        let mut stream = BytesMut::from(&[0u8; WireHeader::SIZE][..]);
        assert_eq!(
            RecordBuf::split_from(&mut stream).err(),
            Some(ProtocolError::InvalidLength { declared: 0, minimum: WireHeader::SIZE })
        );
    }

    #[test]
    fn encode_leaves_buffer_untouched_on_error() {
        let mut message = message();
        message.header.length += 1;

        let mut buf = BytesMut::from(&b"prefix"[..]);
        assert!(Record::from(message).encode(&mut buf).is_err());
        assert_eq!(&buf[..], b"prefix");
    }

    #[test]
    fn forwarded_bytes_match_encoding() {
        let record = Record::from(lock_rcom());
        let bytes = encoded(&record).freeze();
        let parsed = RecordBuf::parse(bytes.clone()).unwrap();
        assert_eq!(parsed.into_bytes(), bytes);
    }
}
