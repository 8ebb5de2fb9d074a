//! Error classification shared by every subsystem.
//!
//! Each crate defines its own error enum; all of them report an
//! [`ErrorKind`], which decides whether the stepper may retry and what the
//! driver prints before exiting.

use std::fmt;

/// Taxonomy of failures a run can encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid parameters. Fatal, raised before any field is built.
    Configuration,
    /// Contradictory or unsatisfiable boundary conditions. Fatal at build.
    InvalidBc,
    /// Allocation failure or exhausted thread resources. Fatal.
    Resource,
    /// A non-finite value appeared during assembly or an update.
    /// Recoverable by step-size reduction up to the retry limit.
    Numerical,
    /// An implicit solve hit its iteration cap. Recoverable like
    /// [`Numerical`](Self::Numerical).
    Convergence,
    /// Storage unavailable or corrupt. Non-fatal for checkpoint writes,
    /// fatal for a requested restore.
    Io,
    /// A field name that was never declared.
    Lookup,
}

impl ErrorKind {
    /// Returns `true` if the stepper may retry the step with a reduced `dt`.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Numerical | Self::Convergence)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configuration => "configuration error",
            Self::InvalidBc => "invalid boundary condition",
            Self::Resource => "resource error",
            Self::Numerical => "numerical error",
            Self::Convergence => "convergence failure",
            Self::Io => "I/O error",
            Self::Lookup => "lookup error",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_solver_failures_are_recoverable() {
        let recoverable: Vec<ErrorKind> = [
            ErrorKind::Configuration,
            ErrorKind::InvalidBc,
            ErrorKind::Resource,
            ErrorKind::Numerical,
            ErrorKind::Convergence,
            ErrorKind::Io,
            ErrorKind::Lookup,
        ]
        .into_iter()
        .filter(|k| k.is_recoverable())
        .collect();
        assert_eq!(recoverable, vec![ErrorKind::Numerical, ErrorKind::Convergence]);
    }
}
