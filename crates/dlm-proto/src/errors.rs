//! Errors raised at the record boundary.
//!
//! The field codecs themselves never fail. Everything here is detected either
//! while validating transport bytes ([`crate::RecordBuf::parse`]) or while
//! writing a host record into a caller-supplied buffer.

use thiserror::Error;

use crate::header::RecordKind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Malformed or unrepresentable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer ends before a fixed-size part of the record
    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Header `length` is smaller than the record's fixed part
    #[error("declared length {declared} is below the {minimum}-byte minimum for this record")]
    InvalidLength {
        /// Value of the header length field
        declared: u16,
        /// Fixed size of the record kind
        minimum: usize,
    },

    /// Header command byte names no known record kind
    #[error("unknown record kind {0}")]
    UnknownRecordKind(u8),

    /// Recovery command tag is not a defined command type
    #[error("unknown recovery command type {0}")]
    UnknownRcomType(u16),

    /// Lock sub-record `namelen` runs past the end of the record
    #[error("name length {namelen} exceeds the {available} payload bytes left")]
    NameOverflow {
        /// Value of the namelen field
        namelen: u16,
        /// Payload bytes after the sub-record's fixed part
        available: usize,
    },

    /// Destination buffer cannot hold the encoded record
    #[error("destination too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Header `length` disagrees with the record content being encoded
    #[error("header length {declared} does not match encoded size {actual}")]
    LengthMismatch {
        /// Value of the header length field
        declared: u16,
        /// Size of the encoded record
        actual: usize,
    },

    /// Header command byte disagrees with the record being encoded
    #[error("header command {cmd} does not match a {expected:?} record")]
    KindMismatch {
        /// Value of the header command byte
        cmd: u8,
        /// Kind of the record being encoded
        expected: RecordKind,
    },

    /// Resource name does not fit the 16-bit namelen field
    #[error("resource name of {0} bytes does not fit a 16-bit length")]
    NameTooLong(usize),

    /// Record does not fit the 16-bit header length field
    #[error("record of {0} bytes does not fit a 16-bit length")]
    RecordTooLarge(usize),
}
