//! Common record envelope.
//!
//! # Wire layout
//!
//! ```text
//! Bytes 0-3:   version   (u32 LE)
//! Bytes 4-7:   lockspace (u32 LE)
//! Bytes 8-11:  nodeid    (u32 LE)
//! Bytes 12-13: length    (u16 LE, whole record including this header)
//! Byte 14:     cmd       (record kind)
//! Byte 15:     pad       (zero)
//! ```
//!
//! Every record begins with these 16 bytes, so any record can be read as a
//! [`WireHeader`] before its kind is known.

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    little_endian::{U16, U32},
};

use crate::errors::{ProtocolError, Result};

/// Major half of the protocol version.
pub const HEADER_MAJOR: u32 = 0x0002_0000;

/// Minor half of the protocol version.
pub const HEADER_MINOR: u32 = 0x0000_0001;

/// Version stamped on records built by this crate.
pub const PROTOCOL_VERSION: u32 = HEADER_MAJOR | HEADER_MINOR;

/// Record kind carried in the header command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    /// Lock operation request or reply ([`crate::Message`])
    Message = 1,
    /// Recovery command ([`crate::Rcom`])
    Rcom = 2,
}

impl RecordKind {
    /// Convert from the raw command byte.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Message),
            2 => Some(Self::Rcom),
            _ => None,
        }
    }

    /// Raw command byte.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RecordKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(ProtocolError::UnknownRecordKind(value))
    }
}

/// Envelope in host representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Header {
    /// Protocol version, interpreted by the surrounding protocol
    pub version: u32,
    /// Lockspace the record belongs to
    pub lockspace: u32,
    /// Sending node
    pub nodeid: u32,
    /// Total encoded record size in bytes
    pub length: u16,
    /// Record kind byte (see [`RecordKind`])
    pub cmd: u8,
}

impl Header {
    /// Header for a record of `kind` at the current protocol version.
    ///
    /// `length` is left at zero; record constructors fill it in.
    pub const fn new(kind: RecordKind, lockspace: u32, nodeid: u32) -> Self {
        Self { version: PROTOCOL_VERSION, lockspace, nodeid, length: 0, cmd: kind.to_u8() }
    }

    /// Record kind, if the command byte names one.
    pub const fn kind(&self) -> Option<RecordKind> {
        RecordKind::from_u8(self.cmd)
    }
}

/// Envelope in wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct WireHeader {
    version: U32,
    lockspace: U32,
    nodeid: U32,
    length: U16,
    cmd: u8,
    pad: u8,
}

const _: () = assert!(size_of::<WireHeader>() == WireHeader::SIZE);

impl WireHeader {
    /// Encoded size in bytes.
    pub const SIZE: usize = 16;

    /// Declared record length, read without decoding the rest.
    pub fn length(&self) -> u16 {
        self.length.get()
    }

    /// Raw command byte.
    pub const fn cmd(&self) -> u8 {
        self.cmd
    }
}

/// Convert an envelope to wire representation.
pub fn encode_header(header: &Header) -> WireHeader {
    WireHeader {
        version: U32::new(header.version),
        lockspace: U32::new(header.lockspace),
        nodeid: U32::new(header.nodeid),
        length: U16::new(header.length),
        cmd: header.cmd,
        pad: 0,
    }
}

/// Convert an envelope to host representation.
pub fn decode_header(wire: &WireHeader) -> Header {
    Header {
        version: wire.version.get(),
        lockspace: wire.lockspace.get(),
        nodeid: wire.nodeid.get(),
        length: wire.length.get(),
        cmd: wire.cmd,
    }
}

/// Check that `header` describes an `actual`-byte record of `kind` and that
/// the record fits in `available` bytes of destination.
pub(crate) fn check_encoded_len(
    header: &Header,
    kind: RecordKind,
    actual: usize,
    available: usize,
) -> Result<()> {
    if header.cmd != kind.to_u8() {
        return Err(ProtocolError::KindMismatch { cmd: header.cmd, expected: kind });
    }
    let length = u16::try_from(actual).map_err(|_| ProtocolError::RecordTooLarge(actual))?;
    if header.length != length {
        return Err(ProtocolError::LengthMismatch { declared: header.length, actual });
    }
    if available < actual {
        return Err(ProtocolError::BufferTooSmall { needed: actual, available });
    }
    Ok(())
}

impl From<&Header> for WireHeader {
    fn from(header: &Header) -> Self {
        encode_header(header)
    }
}

impl From<&WireHeader> for Header {
    fn from(wire: &WireHeader) -> Self {
        decode_header(wire)
    }
}
