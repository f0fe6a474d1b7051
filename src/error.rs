//! Error types for the assembler.
//!
//! `eonasm.c` splits failures into two tiers: whatever `error()` logs and
//! counts (non-fatal, assembly keeps going) and whatever calls `exit(1)`
//! directly (fatal, assembly stops right there). We keep that split as two
//! Rust types instead of one flat enum, so a fatal condition is a real
//! `Result::Err` the pass driver must propagate, while non-fatal
//! diagnostics are data a `Diagnostics` sink collects (see `diagnostics.rs`).

use std::fmt;

/// One non-fatal diagnostic, already carrying the context needed to print
/// it the way `eonasm.c`'s `error()` does: `eonasm error at line N of file: msg`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eonasm error at line {} of {}: {}",
            self.line, self.file, self.message
        )
    }
}

/// Conditions that abort assembly immediately, matching each `exit(1)`
/// call site in `eonasm.c`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FatalError {
    OpenInput { path: String, message: String },
    ReadInput { path: String, message: String },
    OpenOutput { path: String, message: String },
    LineTooLong { path: String, line: u32 },
    SymbolTableOverflow { globals: usize, locals: usize },
    TooManyErrors { count: u32 },
    NonConvergent { passes: u32 },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::OpenInput { path, message } => {
                write!(f, "error opening [{}]: {}", path, message)
            }
            FatalError::ReadInput { path, message } => {
                write!(f, "eonasm: error reading [{}]: {}", path, message)
            }
            FatalError::OpenOutput { path, message } => write!(
                f,
                "eonasm: can not create output file [{}]: {}",
                path, message
            ),
            FatalError::LineTooLong { path, line } => {
                write!(f, "eonasm: line {} of [{}] is too long", line, path)
            }
            FatalError::SymbolTableOverflow { globals, locals } => write!(
                f,
                "eonasm: too many labels (> {}) {} global {} local",
                crate::symtab::MAX_LABELS,
                globals,
                locals
            ),
            FatalError::TooManyErrors { count } => write!(f, "eonasm: {} errors.", count),
            FatalError::NonConvergent { passes } => {
                write!(f, "eonasm: assembly did not converge after {} passes", passes)
            }
        }
    }
}

impl std::error::Error for FatalError {}

/// Top level error type returned by the library's fallible entry points.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    Fatal(FatalError),
}

impl From<FatalError> for Error {
    fn from(err: FatalError) -> Error {
        Error::Fatal(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Fatal(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
