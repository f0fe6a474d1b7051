//! Two-region symbol table: globals grow up, locals grow down.
//!
//! Ground: `eonasm.c`'s `struct label_t`, `tlabel[MAX_LABELS]`, `nlabel`,
//! `lstack`, `find_label`/`add_label` (§4.1 of the specification). The C
//! source packs both regions into one fixed 256-slot array and walks it
//! with raw indices; per the specification's own design note ("re-implement
//! as two dynamic sequences ... preserve the invariant that locals attach
//! to the most-recently-defined global"), this keeps that invariant with
//! two growable `Vec`s instead of simulating a two-stack array.

use crate::error::FatalError;
use crate::lex::normalize_label;

pub const MAX_LABELS: usize = 256;
pub const MAX_CHAR_LABEL: usize = 22;

pub const LABEL_USED: u8 = 0x01;
pub const LABEL_EQU: u8 = 0x02;

#[derive(Clone, Debug)]
pub struct Label {
    pub name: String,
    pub value: u32,
    pub flags: u8,
    /// Index into the locals vec where this global's local region begins.
    pub lbegin: usize,
    /// Index where this global's local region ends, exclusive. `None`
    /// means "still open" -- this is the most recently defined global and
    /// no later global has closed its range yet.
    pub lend: Option<usize>,
}

impl Label {
    fn new(name: String, value: u32) -> Self {
        Label {
            name,
            value,
            flags: 0,
            lbegin: 0,
            lend: None,
        }
    }

    pub fn used(&self) -> bool {
        self.flags & LABEL_USED != 0
    }

    pub fn is_equ(&self) -> bool {
        self.flags & LABEL_EQU != 0
    }

    pub fn mark_used(&mut self) {
        self.flags |= LABEL_USED;
    }

    pub fn mark_equ(&mut self) {
        self.flags |= LABEL_EQU;
    }
}

/// Identifies a label already resident in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelId {
    Global(usize),
    Local(usize),
}

#[derive(Default)]
pub struct SymbolTable {
    globals: Vec<Label>,
    locals: Vec<Label>,
    /// Index of the global whose local region is still open (the most
    /// recently inserted global, i.e. the "main label" of the line
    /// processor -- tracked here too so `insert_global` can close the
    /// previous one's range).
    open_global: Option<usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    fn local_range(&self, global: usize) -> std::ops::Range<usize> {
        let g = &self.globals[global];
        g.lbegin..g.lend.unwrap_or(self.locals.len())
    }

    pub fn find_global(&self, name: &str) -> Option<LabelId> {
        let norm = normalize_label(name);
        self.globals
            .iter()
            .position(|l| l.name == norm)
            .map(LabelId::Global)
    }

    pub fn find_local(&self, owner: usize, name: &str) -> Option<LabelId> {
        let norm = normalize_label(name);
        let range = self.local_range(owner);
        self.locals[range.clone()]
            .iter()
            .position(|l| l.name == norm)
            .map(|i| LabelId::Local(range.start + i))
    }

    fn capacity_check(&self) -> Result<(), FatalError> {
        if self.globals.len() + self.locals.len() >= MAX_LABELS {
            Err(FatalError::SymbolTableOverflow {
                globals: self.globals.len(),
                locals: self.locals.len(),
            })
        } else {
            Ok(())
        }
    }

    /// Insert a new global label, closing the previously open global's
    /// local region at the current size of the local stack.
    pub fn insert_global(&mut self, name: &str, value: u32) -> Result<LabelId, FatalError> {
        self.capacity_check()?;
        if let Some(prev) = self.open_global {
            self.globals[prev].lend = Some(self.locals.len());
        }
        let mut label = Label::new(normalize_label(name), value);
        label.lbegin = self.locals.len();
        let idx = self.globals.len();
        self.globals.push(label);
        self.open_global = Some(idx);
        Ok(LabelId::Global(idx))
    }

    /// Insert a local label owned by `owner`. Fails fatally without room,
    /// matching `add_label`'s overflow check.
    pub fn insert_local(&mut self, owner: usize, name: &str, value: u32) -> Result<LabelId, FatalError> {
        self.capacity_check()?;
        let label = Label::new(normalize_label(name), value);
        let idx = self.locals.len();
        self.locals.push(label);
        // the owning global's range always runs to "current tail" while open
        debug_assert!(self.globals[owner].lend.is_none() || owner == self.open_global.unwrap());
        Ok(LabelId::Local(idx))
    }

    pub fn get(&self, id: LabelId) -> &Label {
        match id {
            LabelId::Global(i) => &self.globals[i],
            LabelId::Local(i) => &self.locals[i],
        }
    }

    pub fn get_mut(&mut self, id: LabelId) -> &mut Label {
        match id {
            LabelId::Global(i) => &mut self.globals[i],
            LabelId::Local(i) => &mut self.locals[i],
        }
    }

    pub fn globals(&self) -> &[Label] {
        &self.globals
    }

    pub fn locals(&self) -> &[Label] {
        &self.locals
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn local_count(&self) -> usize {
        self.locals.len()
    }
}
