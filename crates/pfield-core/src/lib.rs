//! Core types and traits for the pfield phase-field engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions shared by every other crate in the
//! workspace: field identifiers and descriptors, the time state that is
//! checkpointed, the error classification the driver maps to exit codes,
//! and the read-only field access trait used during assembly.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod time;
pub mod traits;

pub use error::ErrorKind;
pub use field::{FieldDef, FieldRank, FieldSet, FieldSetIter, PdeType};
pub use id::{FieldId, StepIndex};
pub use time::TimeState;
pub use traits::FieldReader;
