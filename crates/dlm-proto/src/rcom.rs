//! Recovery commands.
//!
//! A recovery command is a generic envelope followed by a payload whose shape
//! depends on the command type. Only [`RcomType::Lock`] payloads have a typed
//! layout ([`RcomLock`]); every other type carries bytes the recovery layer
//! interprets itself, and those bytes cross the wire untouched.
//!
//! # Wire layout
//!
//! ```text
//! Envelope (32 bytes):
//!   Bytes 0-15:   header
//!   Bytes 16-17:  type     (u16 LE)
//!   Bytes 18-19:  result   (u16 LE)
//!   Bytes 20-23:  reserved (zero)
//!   Bytes 24-31:  id       (u64 LE)
//!   Bytes 32-:    payload
//!
//! Lock payload (72 bytes + name + tail):
//!   Bytes 0-35:   ownpid, lkid, remid, parent_lkid, parent_remid,
//!                 exflags, flags, lvbseq, result (u32 LE each)
//!   Bytes 36-37:  wait_type (u16 LE)
//!   Bytes 38-39:  namelen   (u16 LE)
//!   Bytes 40-71:  range[0..4] (u64 LE)
//!   Bytes 72-:    name (namelen bytes), then tail
//! ```

use bytes::Bytes;
use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    little_endian::{U16, U32, U64},
};

use crate::{
    errors::{ProtocolError, Result},
    header::{Header, RecordKind, WireHeader, check_encoded_len, decode_header, encode_header},
};

/// Recovery command type carried in the envelope tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RcomType {
    /// Ask a node for its recovery status
    Status = 1,
    /// Ask a node for the resource names it masters
    Names = 2,
    /// Look up a resource master
    Lookup = 3,
    /// Send a lock to the new resource master
    Lock = 4,
    /// Reply to [`RcomType::Status`]
    StatusReply = 5,
    /// Reply to [`RcomType::Names`]
    NamesReply = 6,
    /// Reply to [`RcomType::Lookup`]
    LookupReply = 7,
    /// Reply to [`RcomType::Lock`]
    LockReply = 8,
}

impl RcomType {
    /// Convert from the raw envelope tag.
    pub const fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            1 => Self::Status,
            2 => Self::Names,
            3 => Self::Lookup,
            4 => Self::Lock,
            5 => Self::StatusReply,
            6 => Self::NamesReply,
            7 => Self::LookupReply,
            8 => Self::LockReply,
            _ => return None,
        })
    }

    /// Raw envelope tag.
    pub const fn to_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for RcomType {
    type Error = ProtocolError;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        Self::from_u16(value).ok_or(ProtocolError::UnknownRcomType(value))
    }
}

/// Lock carried by a [`RcomType::Lock`] command, in host representation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RcomLock {
    /// Owning process id
    pub ownpid: u32,
    /// Lock id on the sending node
    pub lkid: u32,
    /// Lock id on the new master
    pub remid: u32,
    /// Parent lock id on the sending node
    pub parent_lkid: u32,
    /// Parent lock id on the new master
    pub parent_remid: u32,
    /// Flags visible outside the lock manager
    pub exflags: u32,
    /// Internal lock flags
    pub flags: u32,
    /// Lock value block sequence
    pub lvbseq: u32,
    /// Result code
    pub result: u32,
    /// Operation the lock was waiting on
    pub wait_type: u16,
    /// Byte ranges the lock covers
    pub range: [u64; 4],
    /// Resource name; its length is the wire `namelen`
    pub name: Bytes,
    /// Opaque bytes after the name (lock value block when present)
    pub tail: Bytes,
}

impl RcomLock {
    /// Encoded size of the sub-record.
    pub fn encoded_len(&self) -> usize {
        WireRcomLock::SIZE + self.name.len() + self.tail.len()
    }
}

/// Payload of a recovery command, keyed by command type.
///
/// The envelope tag is derived from the variant, so a LOCK tag always comes
/// with a typed lock and no other tag ever does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RcomPayload {
    /// [`RcomType::Status`]
    Status(Bytes),
    /// [`RcomType::Names`]
    Names(Bytes),
    /// [`RcomType::Lookup`]
    Lookup(Bytes),
    /// [`RcomType::Lock`]
    Lock(RcomLock),
    /// [`RcomType::StatusReply`]
    StatusReply(Bytes),
    /// [`RcomType::NamesReply`]
    NamesReply(Bytes),
    /// [`RcomType::LookupReply`]
    LookupReply(Bytes),
    /// [`RcomType::LockReply`]
    LockReply(Bytes),
}

impl RcomPayload {
    /// Opaque payload for any type except [`RcomType::Lock`].
    ///
    /// Returns `None` for `Lock`, whose payload must be built as an
    /// [`RcomLock`].
    pub fn opaque(rc_type: RcomType, bytes: Bytes) -> Option<Self> {
        Some(match rc_type {
            RcomType::Status => Self::Status(bytes),
            RcomType::Names => Self::Names(bytes),
            RcomType::Lookup => Self::Lookup(bytes),
            RcomType::Lock => return None,
            RcomType::StatusReply => Self::StatusReply(bytes),
            RcomType::NamesReply => Self::NamesReply(bytes),
            RcomType::LookupReply => Self::LookupReply(bytes),
            RcomType::LockReply => Self::LockReply(bytes),
        })
    }

    /// Command type this payload is sent under.
    pub const fn rcom_type(&self) -> RcomType {
        match self {
            Self::Status(_) => RcomType::Status,
            Self::Names(_) => RcomType::Names,
            Self::Lookup(_) => RcomType::Lookup,
            Self::Lock(_) => RcomType::Lock,
            Self::StatusReply(_) => RcomType::StatusReply,
            Self::NamesReply(_) => RcomType::NamesReply,
            Self::LookupReply(_) => RcomType::LookupReply,
            Self::LockReply(_) => RcomType::LockReply,
        }
    }

    /// Opaque payload bytes, or `None` for a lock.
    pub const fn as_opaque(&self) -> Option<&Bytes> {
        match self {
            Self::Lock(_) => None,
            Self::Status(bytes)
            | Self::Names(bytes)
            | Self::Lookup(bytes)
            | Self::StatusReply(bytes)
            | Self::NamesReply(bytes)
            | Self::LookupReply(bytes)
            | Self::LockReply(bytes) => Some(bytes),
        }
    }

    /// Encoded size of the payload.
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Lock(lock) => lock.encoded_len(),
            other => other.as_opaque().map_or(0, Bytes::len),
        }
    }
}

/// Recovery command in host representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rcom {
    /// Envelope
    pub header: Header,
    /// Result code
    pub result: u16,
    /// Transaction id matching a reply to its request
    pub id: u64,
    /// Type-tagged payload
    pub payload: RcomPayload,
}

impl Rcom {
    /// Recovery command sent by `nodeid` in `lockspace`.
    ///
    /// The header length is computed from the payload and saturates at
    /// `u16::MAX`; encoding then reports
    /// [`ProtocolError::RecordTooLarge`].
    pub fn new(lockspace: u32, nodeid: u32, id: u64, payload: RcomPayload) -> Self {
        let mut header = Header::new(RecordKind::Rcom, lockspace, nodeid);
        header.length =
            u16::try_from(WireRcom::SIZE + payload.encoded_len()).unwrap_or(u16::MAX);
        Self { header, result: 0, id, payload }
    }

    /// Command type, derived from the payload.
    pub const fn rcom_type(&self) -> RcomType {
        self.payload.rcom_type()
    }

    /// Size of the encoded record.
    pub fn encoded_len(&self) -> usize {
        WireRcom::SIZE + self.payload.encoded_len()
    }

    /// Write the record to the front of `dst`, returning the bytes written.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        if let RcomPayload::Lock(lock) = &self.payload
            && u16::try_from(lock.name.len()).is_err()
        {
            return Err(ProtocolError::NameTooLong(lock.name.len()));
        }
        let len = self.encoded_len();
        check_encoded_len(&self.header, RecordKind::Rcom, len, dst.len())?;

        let (envelope, lock) = encode_rcom(self);
        dst[..WireRcom::SIZE].copy_from_slice(envelope.as_bytes());
        let payload = &mut dst[WireRcom::SIZE..len];

        match (&self.payload, lock) {
            (RcomPayload::Lock(host), Some(wire)) => {
                let name_end = WireRcomLock::SIZE + host.name.len();
                payload[..WireRcomLock::SIZE].copy_from_slice(wire.as_bytes());
                payload[WireRcomLock::SIZE..name_end].copy_from_slice(&host.name);
                payload[name_end..].copy_from_slice(&host.tail);
            },
            (other, _) => {
                if let Some(bytes) = other.as_opaque() {
                    payload.copy_from_slice(bytes);
                }
            },
        }
        Ok(len)
    }

    /// Decode a record whose length has already been checked against the
    /// header.
    pub(crate) fn parse(record: &Bytes) -> Result<Self> {
        let (envelope, _) = WireRcom::read_from_prefix(record).map_err(|_| {
            ProtocolError::Truncated { needed: WireRcom::SIZE, available: record.len() }
        })?;
        decode_rcom(&envelope, record.slice(WireRcom::SIZE..))
    }
}

/// Recovery command envelope in wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct WireRcom {
    header: WireHeader,
    rc_type: U16,
    result: U16,
    reserved: [u8; 4],
    id: U64,
}

const _: () = assert!(size_of::<WireRcom>() == WireRcom::SIZE);

impl WireRcom {
    /// Encoded size of the envelope.
    pub const SIZE: usize = 32;

    /// Envelope header.
    pub const fn header(&self) -> &WireHeader {
        &self.header
    }
}

/// Lock sub-record in wire representation, without the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct WireRcomLock {
    ownpid: U32,
    lkid: U32,
    remid: U32,
    parent_lkid: U32,
    parent_remid: U32,
    exflags: U32,
    flags: U32,
    lvbseq: U32,
    result: U32,
    wait_type: U16,
    namelen: U16,
    range: [U64; 4],
}

const _: () = assert!(size_of::<WireRcomLock>() == WireRcomLock::SIZE);

impl WireRcomLock {
    /// Encoded size of the fixed part.
    pub const SIZE: usize = 72;

    /// Length of the name following the fixed part.
    pub fn namelen(&self) -> u16 {
        self.namelen.get()
    }
}

/// Convert a recovery command to wire representation.
///
/// The tag is taken from the host payload before anything is converted; a
/// LOCK payload also yields its converted sub-record. Names, tails and opaque
/// payloads are copied as they are by the writer. A name longer than
/// `u16::MAX` saturates `namelen`, which [`Rcom::encode_into`] rejects up
/// front.
pub fn encode_rcom(rcom: &Rcom) -> (WireRcom, Option<WireRcomLock>) {
    let envelope = WireRcom {
        header: encode_header(&rcom.header),
        rc_type: U16::new(rcom.rcom_type().to_u16()),
        result: U16::new(rcom.result),
        reserved: [0; 4],
        id: U64::new(rcom.id),
    };

    let lock = match &rcom.payload {
        RcomPayload::Lock(lock) => Some(encode_rcom_lock(lock)),
        _ => None,
    };

    (envelope, lock)
}

/// Convert a recovery command to host representation.
///
/// The envelope is converted first and the tag tested on its host value. A
/// LOCK payload is split into its converted sub-record, the name and the
/// tail; any other payload is kept as the bytes given.
pub fn decode_rcom(envelope: &WireRcom, payload: Bytes) -> Result<Rcom> {
    let rc_type = RcomType::try_from(envelope.rc_type.get())?;

    let payload = if rc_type == RcomType::Lock {
        RcomPayload::Lock(decode_rcom_lock_payload(&payload)?)
    } else {
        RcomPayload::opaque(rc_type, payload)
            .ok_or(ProtocolError::UnknownRcomType(rc_type.to_u16()))?
    };

    Ok(Rcom {
        header: decode_header(&envelope.header),
        result: envelope.result.get(),
        id: envelope.id.get(),
        payload,
    })
}

fn encode_rcom_lock(lock: &RcomLock) -> WireRcomLock {
    WireRcomLock {
        ownpid: U32::new(lock.ownpid),
        lkid: U32::new(lock.lkid),
        remid: U32::new(lock.remid),
        parent_lkid: U32::new(lock.parent_lkid),
        parent_remid: U32::new(lock.parent_remid),
        exflags: U32::new(lock.exflags),
        flags: U32::new(lock.flags),
        lvbseq: U32::new(lock.lvbseq),
        result: U32::new(lock.result),
        wait_type: U16::new(lock.wait_type),
        namelen: U16::new(u16::try_from(lock.name.len()).unwrap_or(u16::MAX)),
        range: lock.range.map(U64::new),
    }
}

fn decode_rcom_lock_payload(payload: &Bytes) -> Result<RcomLock> {
    let (wire, rest) = WireRcomLock::read_from_prefix(payload).map_err(|_| {
        ProtocolError::Truncated { needed: WireRcomLock::SIZE, available: payload.len() }
    })?;

    let namelen = wire.namelen.get();
    let name_end = WireRcomLock::SIZE + usize::from(namelen);
    if usize::from(namelen) > rest.len() {
        return Err(ProtocolError::NameOverflow { namelen, available: rest.len() });
    }

    Ok(RcomLock {
        ownpid: wire.ownpid.get(),
        lkid: wire.lkid.get(),
        remid: wire.remid.get(),
        parent_lkid: wire.parent_lkid.get(),
        parent_remid: wire.parent_remid.get(),
        exflags: wire.exflags.get(),
        flags: wire.flags.get(),
        lvbseq: wire.lvbseq.get(),
        result: wire.result.get(),
        wait_type: wire.wait_type.get(),
        range: wire.range.map(U64::get),
        name: payload.slice(WireRcomLock::SIZE..name_end),
        tail: payload.slice(name_end..),
    })
}
