//! Lock operation messages.
//!
//! # Wire layout
//!
//! ```text
//! Bytes 0-15:    header
//! Bytes 16-83:   type, nodeid, pid, lkid, remid, parent_lkid, parent_remid,
//!                exflags, sbflags, flags, lvbseq, status, grmode, rqmode,
//!                bastmode, asts, result (u32 LE each)
//! Bytes 84-87:   reserved (zero; keeps range 8-byte aligned for C peers)
//! Bytes 88-103:  range[0], range[1] (u64 LE)
//! Bytes 104-:    extra (resource name or lock value block, opaque)
//! ```

use bytes::Bytes;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    little_endian::{U32, U64},
};

use crate::{
    errors::{ProtocolError, Result},
    header::{Header, RecordKind, WireHeader, check_encoded_len, decode_header, encode_header},
};

/// Lock operation carried in a message's type field.
///
/// The codec never checks the type field against this list; it is here for
/// callers that dispatch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    /// New lock request
    Request = 1,
    /// Mode conversion of a held lock
    Convert = 2,
    /// Release a lock
    Unlock = 3,
    /// Cancel an outstanding request or conversion
    Cancel = 4,
    /// Reply to [`MessageType::Request`]
    RequestReply = 5,
    /// Reply to [`MessageType::Convert`]
    ConvertReply = 6,
    /// Reply to [`MessageType::Unlock`]
    UnlockReply = 7,
    /// Reply to [`MessageType::Cancel`]
    CancelReply = 8,
    /// Asynchronous grant of a queued request
    Grant = 9,
    /// Blocking notification to a holder
    Bast = 10,
    /// Directory lookup of a resource master
    Lookup = 11,
    /// Remove a directory entry
    Remove = 12,
    /// Reply to [`MessageType::Lookup`]
    LookupReply = 13,
}

impl MessageType {
    /// Convert from the raw type field.
    pub const fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            1 => Self::Request,
            2 => Self::Convert,
            3 => Self::Unlock,
            4 => Self::Cancel,
            5 => Self::RequestReply,
            6 => Self::ConvertReply,
            7 => Self::UnlockReply,
            8 => Self::CancelReply,
            9 => Self::Grant,
            10 => Self::Bast,
            11 => Self::Lookup,
            12 => Self::Remove,
            13 => Self::LookupReply,
            _ => return None,
        })
    }

    /// Raw type field.
    pub const fn to_u32(self) -> u32 {
        self as u32
    }
}

/// Lock operation message in host representation.
///
/// `header.nodeid` and `nodeid` are distinct fields. The first is always the
/// sender; the second is context the lock layer fills in (for example the
/// node a lookup was made on behalf of).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Envelope
    pub header: Header,
    /// Operation type (see [`MessageType`])
    pub msg_type: u32,
    /// Node context field, independent of `header.nodeid`
    pub nodeid: u32,
    /// Owning process id
    pub pid: u32,
    /// Lock id on the sending node
    pub lkid: u32,
    /// Lock id on the receiving node
    pub remid: u32,
    /// Parent lock id on the sending node
    pub parent_lkid: u32,
    /// Parent lock id on the receiving node
    pub parent_remid: u32,
    /// Flags visible outside the lock manager
    pub exflags: u32,
    /// Status block flags
    pub sbflags: u32,
    /// Internal lock flags
    pub flags: u32,
    /// Lock value block sequence
    pub lvbseq: u32,
    /// Lock status
    pub status: u32,
    /// Granted mode
    pub grmode: u32,
    /// Requested mode
    pub rqmode: u32,
    /// Mode reported to the blocking callback
    pub bastmode: u32,
    /// Pending callback bitmask
    pub asts: u32,
    /// Result code
    pub result: u32,
    /// Byte range the lock covers
    pub range: [u64; 2],
    /// Opaque trailing bytes, never byte-order converted
    pub extra: Bytes,
}

impl Message {
    /// Empty message of `msg_type` sent by `nodeid` in `lockspace`.
    ///
    /// The header length is set to the fixed message size.
    pub fn new(msg_type: MessageType, lockspace: u32, nodeid: u32) -> Self {
        let mut header = Header::new(RecordKind::Message, lockspace, nodeid);
        header.length = WireMessage::SIZE as u16;
        Self { header, msg_type: msg_type.to_u32(), ..Self::default() }
    }

    /// Attach trailing bytes and update the header length to match.
    ///
    /// A length past `u16::MAX` saturates; encoding then reports
    /// [`crate::ProtocolError::RecordTooLarge`].
    #[must_use]
    pub fn with_extra(mut self, extra: Bytes) -> Self {
        self.header.length = u16::try_from(WireMessage::SIZE + extra.len()).unwrap_or(u16::MAX);
        self.extra = extra;
        self
    }

    /// Size of the encoded record.
    pub fn encoded_len(&self) -> usize {
        WireMessage::SIZE + self.extra.len()
    }

    /// Write the record to the front of `dst`, returning the bytes written.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        let len = self.encoded_len();
        check_encoded_len(&self.header, RecordKind::Message, len, dst.len())?;

        dst[..WireMessage::SIZE].copy_from_slice(encode_message(self).as_bytes());
        dst[WireMessage::SIZE..len].copy_from_slice(&self.extra);
        Ok(len)
    }

    /// Decode a record whose length has already been checked against the
    /// header. Everything past the fixed part becomes `extra`.
    pub(crate) fn parse(record: &Bytes) -> Result<Self> {
        let (wire, _) = WireMessage::read_from_prefix(record).map_err(|_| {
            ProtocolError::Truncated { needed: WireMessage::SIZE, available: record.len() }
        })?;
        Ok(decode_message(&wire, record.slice(WireMessage::SIZE..)))
    }
}

/// Fixed part of a message in wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct WireMessage {
    header: WireHeader,
    msg_type: U32,
    nodeid: U32,
    pid: U32,
    lkid: U32,
    remid: U32,
    parent_lkid: U32,
    parent_remid: U32,
    exflags: U32,
    sbflags: U32,
    flags: U32,
    lvbseq: U32,
    status: U32,
    grmode: U32,
    rqmode: U32,
    bastmode: U32,
    asts: U32,
    result: U32,
    reserved: [u8; 4],
    range: [U64; 2],
}

const _: () = assert!(size_of::<WireMessage>() == WireMessage::SIZE);

impl WireMessage {
    /// Encoded size of the fixed part.
    pub const SIZE: usize = 104;

    /// Envelope of this message.
    pub const fn header(&self) -> &WireHeader {
        &self.header
    }
}

/// Convert the fixed part of a message to wire representation.
///
/// `message.extra` is not part of the result; it follows the fixed part
/// unchanged.
pub fn encode_message(message: &Message) -> WireMessage {
    WireMessage {
        header: encode_header(&message.header),
        msg_type: U32::new(message.msg_type),
        nodeid: U32::new(message.nodeid),
        pid: U32::new(message.pid),
        lkid: U32::new(message.lkid),
        remid: U32::new(message.remid),
        parent_lkid: U32::new(message.parent_lkid),
        parent_remid: U32::new(message.parent_remid),
        exflags: U32::new(message.exflags),
        sbflags: U32::new(message.sbflags),
        flags: U32::new(message.flags),
        lvbseq: U32::new(message.lvbseq),
        status: U32::new(message.status),
        grmode: U32::new(message.grmode),
        rqmode: U32::new(message.rqmode),
        bastmode: U32::new(message.bastmode),
        asts: U32::new(message.asts),
        result: U32::new(message.result),
        reserved: [0; 4],
        range: message.range.map(U64::new),
    }
}

/// Convert a message to host representation, attaching its trailing bytes.
pub fn decode_message(wire: &WireMessage, extra: Bytes) -> Message {
    Message {
        header: decode_header(&wire.header),
        msg_type: wire.msg_type.get(),
        nodeid: wire.nodeid.get(),
        pid: wire.pid.get(),
        lkid: wire.lkid.get(),
        remid: wire.remid.get(),
        parent_lkid: wire.parent_lkid.get(),
        parent_remid: wire.parent_remid.get(),
        exflags: wire.exflags.get(),
        sbflags: wire.sbflags.get(),
        flags: wire.flags.get(),
        lvbseq: wire.lvbseq.get(),
        status: wire.status.get(),
        grmode: wire.grmode.get(),
        rqmode: wire.rqmode.get(),
        bastmode: wire.bastmode.get(),
        asts: wire.asts.get(),
        result: wire.result.get(),
        range: wire.range.map(U64::get),
        extra,
    }
}
