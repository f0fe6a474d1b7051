//! Error counting with abort threshold, and the unused-label report.
//!
//! Ground: `eonasm.c`'s global `errcount` plus its `error()` function
//! (`if (errcount >= MAX_ERRORS) exit(1)`), and the `-u` dump loop in `main()`.

use crate::error::{Diagnostic, FatalError};
use crate::symtab::SymbolTable;

pub const MAX_ERRORS: u32 = 8;

/// Collects non-fatal diagnostics for one assembly run and enforces the
/// abort threshold. Kept separate from `SymbolTable`/`AssemblerState` so
/// the pure encoding/evaluation code never needs to know about process exit
/// codes -- only the pass driver decides what a full error count means.
#[derive(Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    /// Record one non-fatal diagnostic. Returns `Err` once the abort
    /// threshold is reached, matching `error()`'s `exit(1)` on the 8th call.
    pub fn report(
        &mut self,
        file: &str,
        line: u32,
        message: impl Into<String>,
    ) -> Result<(), FatalError> {
        self.messages.push(Diagnostic {
            file: file.to_owned(),
            line,
            message: message.into(),
        });
        if self.messages.len() as u32 >= MAX_ERRORS {
            Err(FatalError::TooManyErrors {
                count: self.messages.len() as u32,
            })
        } else {
            Ok(())
        }
    }

    pub fn count(&self) -> u32 {
        self.messages.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Diagnostic] {
        &self.messages
    }
}

/// Names of every global or local label never referenced by an expression,
/// in table order. Ground: the `-u` loop at the end of `main()` in `eonasm.c`,
/// which only ever walks the *global* table (`tlabel[0..nlabel]`); we extend
/// it to locals too since they share the same `LABEL_USED` flag and a real
/// user would want to know about a dead local just as much as a dead global.
pub fn unused_labels(table: &SymbolTable) -> Vec<String> {
    let mut names = Vec::new();
    for label in table.globals() {
        if !label.used() {
            names.push(label.name.clone());
        }
    }
    for label in table.locals() {
        if !label.used() {
            names.push(label.name.clone());
        }
    }
    names
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn aborts_at_threshold() {
        let mut d = Diagnostics::new();
        for _ in 0..MAX_ERRORS - 1 {
            assert!(d.report("f.asm", 1, "oops").is_ok());
        }
        assert!(d.report("f.asm", 1, "oops").is_err());
        assert_eq!(d.count(), MAX_ERRORS);

        // the 8th call must not have dropped any message on its way to the
        // `Err` -- the caller still needs every line to print.
        assert_eq!(d.messages().len(), MAX_ERRORS as usize);
        assert!(d.messages().iter().all(|m| m.message == "oops"));
    }

    #[test]
    fn formats_like_original() {
        let mut d = Diagnostics::new();
        d.report("prog.asm", 42, "unknown opcode").unwrap();
        assert_eq!(
            format!("{}", d.messages()[0]),
            "eonasm error at line 42 of prog.asm: unknown opcode"
        );
    }
}
