//! Error types for checkpoint save and restore.

use pfield_core::ErrorKind;
use std::io;
use thiserror::Error;

/// Errors from writing or reading checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// An I/O error occurred during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with `b"PFCK"`.
    #[error("invalid magic bytes (expected b\"PFCK\")")]
    InvalidMagic,

    /// The format version is not supported by this build.
    #[error("unsupported checkpoint format version {found}")]
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },

    /// The record could not be decoded (truncated or corrupt data).
    #[error("malformed checkpoint: {detail}")]
    Malformed {
        /// What went wrong.
        detail: String,
    },

    /// The integrity hash does not match the contents.
    #[error("checkpoint hash mismatch: stored={stored:#018x}, computed={computed:#018x}")]
    HashMismatch {
        /// Hash from the trailer.
        stored: u64,
        /// Hash of the bytes read.
        computed: u64,
    },

    /// The record's fields do not match the running simulation.
    #[error("checkpoint does not match registered fields: {detail}")]
    FieldMismatch {
        /// Which field differs and how.
        detail: String,
    },

    /// No checkpoint exists in the directory.
    #[error("no checkpoint found in {dir}")]
    NotFound {
        /// Directory searched.
        dir: String,
    },
}

impl CheckpointError {
    /// Classification for the driver.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FieldMismatch { .. } => ErrorKind::Configuration,
            _ => ErrorKind::Io,
        }
    }
}
