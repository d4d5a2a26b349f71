//! Operator tool for the lock manager wire format.
//!
//! `hash` shows the fingerprint of a resource name and the directory node it
//! maps to; `decode` validates hex-dumped records and prints them.

use std::{
    io::{self, Write},
    num::NonZeroU32,
};

use bytes::BytesMut;
use clap::{Parser, Subcommand};
use dlm_proto::{ProtocolError, Record, RecordBuf, hash};
use thiserror::Error;
use tracing::{debug, info};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "dlm-inspect", version, about = "Inspect lock manager wire records")]
pub struct Cli {
    /// Log at debug level (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hash resource names and show their directory node
    Hash {
        /// Resource names
        #[arg(required = true)]
        names: Vec<String>,

        /// Number of directory nodes in the lockspace
        #[arg(short, long, default_value = "1")]
        nodes: NonZeroU32,
    },

    /// Decode hex-encoded records laid end to end
    Decode {
        /// Hex dump; whitespace and multiple arguments are joined
        #[arg(required = true)]
        hex: Vec<String>,
    },
}

/// Errors reported by the tool.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Input is not valid hex
    #[error("invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    /// A record failed validation
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Input ends in the middle of a record
    #[error("{0} trailing bytes do not form a whole record")]
    Trailing(usize),

    /// Writing output failed
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Index of the directory node for a resource fingerprint.
///
/// The low 16 bits vary most between similar names and are left for hash
/// table bucketing, so node selection uses the high half.
pub fn directory_node(hash: u32, nodes: NonZeroU32) -> u32 {
    (hash >> 16) % nodes.get()
}

/// Decode every record in a hex dump.
pub fn decode_hex<S: AsRef<str>>(input: &[S]) -> Result<Vec<Record>, InspectError> {
    let digits: String = input
        .iter()
        .flat_map(|part| part.as_ref().chars())
        .filter(|c| !c.is_whitespace())
        .collect();
    let mut buf = BytesMut::from(&hex::decode(digits)?[..]);

    let mut records = Vec::new();
    while let Some(record) = RecordBuf::split_from(&mut buf)? {
        debug!(kind = ?record.kind(), length = record.header().length, "decoded record");
        records.push(record.into_record());
    }
    if !buf.is_empty() {
        return Err(InspectError::Trailing(buf.len()));
    }

    Ok(records)
}

/// Execute `cli`, writing results to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<(), InspectError> {
    match &cli.command {
        Command::Hash { names, nodes } => {
            for name in names {
                let fingerprint = hash(name.as_bytes());
                let node = directory_node(fingerprint, *nodes);
                writeln!(out, "{name}\t{fingerprint:#010x}\tnode {node}")?;
            }
        },
        Command::Decode { hex } => {
            let records = decode_hex(hex.as_slice())?;
            info!(count = records.len(), "decoded records");
            for record in records {
                writeln!(out, "{:?} ({} bytes)", record.kind(), record.header().length)?;
                writeln!(out, "{record:#?}")?;
            }
        },
    }

    Ok(())
}
