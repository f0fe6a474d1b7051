//! A classical two-pass assembler for the eon CPU.
//!
//! The crate is organized the way the reference implementation's single
//! `eonasm.c` translation unit is organized internally, just split across
//! modules instead of `static` functions in one file: lexical helpers
//! ([`lex`]), the expression evaluator ([`expr`]), the symbol table
//! ([`symtab`]), the opcode/register tables ([`opcodes`]), the instruction
//! template matcher and encoder ([`template`], [`encode`]), the per-line
//! state machine ([`line`]), the Intel HEX writer ([`hex`]), the `-l`
//! listing formatter ([`listing`]), non-fatal diagnostic collection
//! ([`diagnostics`]) and the pass driver that ties them all together
//! ([`pass`]).
//!
//! [`pass::assemble`] is the one real entry point; everything else is
//! exposed for callers who want to drive the pieces directly.

pub mod diagnostics;
pub mod encode;
pub mod error;
pub mod expr;
pub mod hex;
pub mod lex;
pub mod line;
pub mod listing;
pub mod opcodes;
pub mod pass;
pub mod source_map;
pub mod symtab;
pub mod template;

pub use error::{Error, FatalError, Result};
pub use pass::{assemble, AssembleOptions, AssembleOutput, Source};
pub use source_map::{SourceMap, SourceMapItem};

#[cfg(test)]
mod test;
