//! Checkpoint/restart for pfield simulations.
//!
//! A checkpoint is one binary record holding the time state and every
//! field's value vector, in field declaration order:
//!
//! ```text
//! magic "PFCK" | version u8
//! step u64 | time f64 | dt f64 | field_count u32
//! field_count × { name: u32 len + UTF-8 | value_count u64 | values f64... }
//! fnv1a u64 over every preceding byte
//! ```
//!
//! All integers and floats are little-endian; floats are stored as raw
//! bits so a restored run continues bit for bit.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod hash;
pub mod manager;
pub mod record;

pub use codec::{decode_record, encode_record};
pub use error::CheckpointError;
pub use hash::Fnv1a;
pub use manager::CheckpointManager;
pub use record::{CheckpointRecord, FieldBlock};

/// Magic bytes identifying a checkpoint file.
pub const MAGIC: [u8; 4] = *b"PFCK";

/// Current checkpoint format version.
pub const FORMAT_VERSION: u8 = 1;
