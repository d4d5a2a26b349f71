//! Wire format for the distributed lock manager's inter-node protocol.
//!
//! Every record starts with a fixed 16-byte [`Header`] followed by either a
//! lock-operation [`Message`] or a recovery command ([`Rcom`]). All multi-byte
//! integers are little-endian on the wire, whatever the host byte order is.
//! That is not network order, and it has to stay that way: existing cluster
//! peers read these bytes directly into their own structs.
//!
//! Each record type has two representations:
//!
//! - a host type with native integers ([`Header`], [`Message`], [`Rcom`]),
//! - a wire type built from `zerocopy` little-endian integers
//!   ([`WireHeader`], [`WireMessage`], [`WireRcom`], [`WireRcomLock`]) whose
//!   layout is checked at compile time.
//!
//! Converting between them is a pure transform that cannot fail. Validation
//! lives in exactly one place, [`RecordBuf::parse`], which turns transport
//! bytes into a handle whose record kind, length and payload tag are already
//! known to be sound.
//!
//! The [`hash`] module maps resource names to 32-bit fingerprints (FNV-1a) so
//! every node agrees on which node masters a given resource.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod hash;
pub mod header;
pub mod message;
pub mod rcom;
pub mod record;

pub use errors::{ProtocolError, Result};
pub use hash::{BuildFnv1a, Fnv1aHasher, hash};
pub use header::{Header, RecordKind, WireHeader, decode_header, encode_header};
pub use message::{Message, MessageType, WireMessage, decode_message, encode_message};
pub use rcom::{
    Rcom, RcomLock, RcomPayload, RcomType, WireRcom, WireRcomLock, decode_rcom, encode_rcom,
};
pub use record::{Record, RecordBuf};
