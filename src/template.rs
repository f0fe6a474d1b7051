//! Instruction templates: `(opcode, arity, argument-kind tuple)` to an
//! encoding recipe and its fixed bits.
//!
//! Ground: `eonasm.c`'s `struct tentry_t tmatch[]` and `match()` (§4.4).
//! The table below is a line-for-line transcription of `tmatch[]` -- same
//! order, same arities, same argument-kind tuples, same base words -- with
//! the single-character `kind` field spelled out as `EncodeKind` variants
//! instead of raw `char`s. `match_template` performs the same linear
//! exact-match scan as `match()`; the table is small and accessed once per
//! line, so there is no reason to reach for a `HashMap` the reference
//! doesn't use either.

use crate::opcodes::Op;

/// What kind of operand a template slot accepts. `_` in the original
/// table (meaning "this slot doesn't exist for this arity") is simply
/// represented by `arity` being smaller than 3; unused trailing slots in
/// `kinds` are never read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Reg,
    Num,
    Mem,
}

/// The encoding recipe selected for a matched template row. Primary kinds
/// encode directly; sugar kinds rewrite the operand vector and hand off to
/// another kind (see `encode.rs`), mirroring the reference's `goto again`
/// with `k` reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeKind {
    /// `N` -- opcode word only, no operands.
    Direct,
    /// `R` -- three registers packed into the low nibbles.
    ThreeReg,
    /// `r` -- `op rd, rs` sugar for `ThreeReg` (src duplicated into both slots).
    ThreeRegSugar,
    /// `A` -- two registers plus a 16-bit immediate.
    RegRegImm,
    /// `a` -- `op rd, imm` sugar for `RegRegImm`.
    RegImmSugar,
    /// `B` -- branch, 16-bit PC-relative offset in halfwords.
    Branch,
    /// `b` -- `op rs1, rs2, target` sugar for `Branch`.
    BranchCondSugar,
    /// `!` -- `op rs1, target` sugar for `Branch` (single operand register).
    BranchUnarySugar,
    /// `U` -- unary, two distinct registers.
    Unary,
    /// `u` -- `op r` sugar for `Unary` (same register twice).
    UnarySugar,
    /// `E` -- single 16-bit immediate, encoded as a zero-register `RegRegImm`.
    ImmAsRegRegImm,
    /// `M` -- register plus `[reg+imm]` memory operand (load shape).
    Memory,
    /// `m` -- `op [reg+imm], rs` sugar for `Memory` (store shape, operands swapped).
    MemoryStoreSugar,
    /// `J` -- jump/call, 32-bit PC-relative offset in halfwords.
    Jump,
    /// `L` -- `LEA rd, label`, 32-bit PC-relative byte offset.
    Lea,
    /// `l` -- `LEA rd, [reg+imm]` sugar: `Memory` if base is `SP`, else `RegRegImm`.
    LeaMemSugar,
    /// `I` -- `LI rd, imm`, with the zero/one/16-bit/32-bit special cases.
    LoadImmediate,
    /// `1` -- single register operand.
    OneReg,
    /// `=` -- `MV rd, rs`.
    Move,
    /// `G` -- `GET rd, n` special register read, n range-checked 0..=15.
    Get,
    /// `g` -- `SET n, rs` sugar for `Get` (operands swapped).
    SetSugar,
}

pub struct TemplateRow {
    pub op: Op,
    pub arity: u8,
    pub kinds: [ArgKind; 3],
    pub encoding: EncodeKind,
    pub word: u16,
}

macro_rules! row {
    ($op:expr, $arity:expr, [$($kind:ident),*], $enc:ident, $word:expr) => {
        TemplateRow {
            op: $op,
            arity: $arity,
            kinds: row!(@pad [$($kind),*]),
            encoding: EncodeKind::$enc,
            word: $word,
        }
    };
    (@pad []) => { [ArgKind::Reg, ArgKind::Reg, ArgKind::Reg] };
    (@pad [$a:ident]) => { [ArgKind::$a, ArgKind::Reg, ArgKind::Reg] };
    (@pad [$a:ident, $b:ident]) => { [ArgKind::$a, ArgKind::$b, ArgKind::Reg] };
    (@pad [$a:ident, $b:ident, $c:ident]) => { [ArgKind::$a, ArgKind::$b, ArgKind::$c] };
}

pub static TMATCH: &[TemplateRow] = &[
    row!(Op::Add, 3, [Reg, Reg, Reg], ThreeReg, 0x4000),
    row!(Op::Add, 3, [Reg, Reg, Num], RegRegImm, 0x3004),
    row!(Op::Add, 2, [Reg, Num], RegImmSugar, 0x3004),
    row!(Op::Add, 2, [Reg, Reg], ThreeRegSugar, 0x4000),
    row!(Op::And, 3, [Reg, Reg, Reg], ThreeReg, 0x8000),
    row!(Op::And, 3, [Reg, Reg, Num], RegRegImm, 0x3008),
    row!(Op::And, 2, [Reg, Num], RegImmSugar, 0x3008),
    row!(Op::And, 2, [Reg, Reg], ThreeRegSugar, 0x8000),
    row!(Op::Beq, 3, [Reg, Reg, Num], BranchCondSugar, 0x2000),
    row!(Op::Ble, 3, [Reg, Reg, Num], BranchCondSugar, 0x2004),
    row!(Op::Blei, 3, [Reg, Reg, Num], BranchCondSugar, 0x2005),
    row!(Op::Blt, 3, [Reg, Reg, Num], BranchCondSugar, 0x2002),
    row!(Op::Blti, 3, [Reg, Reg, Num], BranchCondSugar, 0x2003),
    row!(Op::Bne, 3, [Reg, Reg, Num], BranchCondSugar, 0x2001),
    row!(Op::Bnz, 2, [Reg, Num], BranchUnarySugar, 0x20f1),
    row!(Op::Bra, 1, [Num], Branch, 0x2ff0),
    row!(Op::Bswap, 2, [Reg, Reg], Unary, 0x0004),
    row!(Op::Bswap, 1, [Reg], UnarySugar, 0x0004),
    row!(Op::Bz, 2, [Reg, Num], BranchUnarySugar, 0x20f0),
    row!(Op::Csetn, 2, [Reg, Reg], Unary, 0x000a),
    row!(Op::Csetn, 1, [Reg], UnarySugar, 0x000a),
    row!(Op::Csetnn, 2, [Reg, Reg], Unary, 0x000b),
    row!(Op::Csetnn, 1, [Reg], UnarySugar, 0x000b),
    row!(Op::Csetnp, 2, [Reg, Reg], Unary, 0x000d),
    row!(Op::Csetnp, 1, [Reg], UnarySugar, 0x000d),
    row!(Op::Csetnz, 2, [Reg, Reg], Unary, 0x0009),
    row!(Op::Csetnz, 1, [Reg], UnarySugar, 0x0009),
    row!(Op::Csetp, 2, [Reg, Reg], Unary, 0x000c),
    row!(Op::Csetp, 1, [Reg], UnarySugar, 0x000c),
    row!(Op::Csetz, 2, [Reg, Reg], Unary, 0x0008),
    row!(Op::Csetz, 1, [Reg], UnarySugar, 0x0008),
    row!(Op::Enter, 1, [Num], ImmAsRegRegImm, 0x0ff8),
    row!(Op::Eret, 0, [], Direct, 0x0ff6),
    row!(Op::Get, 2, [Reg, Num], Get, 0x0f08),
    row!(Op::Illegal, 0, [], Direct, 0x0ff0),
    row!(Op::In, 2, [Reg, Reg], Unary, 0x000e),
    row!(Op::Iret, 0, [], Direct, 0x0ff4),
    row!(Op::Istat, 1, [Reg], OneReg, 0x0f04),
    row!(Op::Jal, 1, [Num], Jump, 0x0ffd),
    row!(Op::Jal, 1, [Reg], OneReg, 0x0f01),
    row!(Op::Jmp, 1, [Num], Jump, 0x0ffc),
    row!(Op::Jmp, 1, [Reg], OneReg, 0x0f00),
    row!(Op::Ld1, 2, [Reg, Mem], Memory, 0x1000),
    row!(Op::Ld1i, 2, [Reg, Mem], Memory, 0x1001),
    row!(Op::Ld2, 2, [Reg, Mem], Memory, 0x1002),
    row!(Op::Ld2i, 2, [Reg, Mem], Memory, 0x1003),
    row!(Op::Ld4, 2, [Reg, Mem], Memory, 0x1004),
    row!(Op::Ld4i, 2, [Reg, Mem], Memory, 0x1005),
    row!(Op::Ld8, 2, [Reg, Mem], Memory, 0x1006),
    row!(Op::Lea, 2, [Reg, Num], Lea, 0x0f0d),
    row!(Op::Lea, 2, [Reg, Mem], LeaMemSugar, 0x0f0a),
    row!(Op::Li, 2, [Reg, Num], LoadImmediate, 0x0f0c),
    row!(Op::Mv, 2, [Reg, Reg], Move, 0x90f0),
    row!(Op::Nop, 0, [], Direct, 0x0ff1),
    row!(Op::Or, 3, [Reg, Reg, Reg], ThreeReg, 0x9000),
    row!(Op::Or, 3, [Reg, Reg, Num], RegRegImm, 0x3009),
    row!(Op::Or, 2, [Reg, Num], RegImmSugar, 0x3009),
    row!(Op::Or, 2, [Reg, Reg], ThreeRegSugar, 0x9000),
    row!(Op::Out, 2, [Reg, Reg], Unary, 0x000f),
    row!(Op::Ret, 0, [], Direct, 0x0fe0),
    row!(Op::Set, 2, [Num, Reg], SetSugar, 0x0f09),
    row!(Op::Sext1, 2, [Reg, Reg], Unary, 0x0005),
    row!(Op::Sext1, 1, [Reg], UnarySugar, 0x0005),
    row!(Op::Sext2, 2, [Reg, Reg], Unary, 0x0006),
    row!(Op::Sext2, 1, [Reg], UnarySugar, 0x0006),
    row!(Op::Sext4, 2, [Reg, Reg], Unary, 0x0007),
    row!(Op::Sext4, 1, [Reg], UnarySugar, 0x0007),
    row!(Op::Shl, 3, [Reg, Reg, Reg], ThreeReg, 0xb000),
    row!(Op::Shl, 3, [Reg, Reg, Num], RegRegImm, 0x300b),
    row!(Op::Shl, 2, [Reg, Num], RegImmSugar, 0x300b),
    row!(Op::Shl, 2, [Reg, Reg], ThreeRegSugar, 0xb000),
    row!(Op::Shr, 3, [Reg, Reg, Reg], ThreeReg, 0xc000),
    row!(Op::Shr, 3, [Reg, Reg, Num], RegRegImm, 0x300c),
    row!(Op::Shr, 2, [Reg, Num], RegImmSugar, 0x300c),
    row!(Op::Shr, 2, [Reg, Reg], ThreeRegSugar, 0xc000),
    row!(Op::Shri, 3, [Reg, Reg, Reg], ThreeReg, 0xd000),
    row!(Op::Shri, 3, [Reg, Reg, Num], RegRegImm, 0x300d),
    row!(Op::Shri, 2, [Reg, Num], RegImmSugar, 0x300d),
    row!(Op::Shri, 2, [Reg, Reg], ThreeRegSugar, 0xd000),
    row!(Op::Signal, 1, [Num], ImmAsRegRegImm, 0x0ff9),
    row!(Op::Sret, 0, [], Direct, 0x0ff5),
    row!(Op::St1, 2, [Mem, Reg], MemoryStoreSugar, 0x1008),
    row!(Op::St2, 2, [Mem, Reg], MemoryStoreSugar, 0x1009),
    row!(Op::St4, 2, [Mem, Reg], MemoryStoreSugar, 0x100a),
    row!(Op::St8, 2, [Mem, Reg], MemoryStoreSugar, 0x100b),
    row!(Op::Sub, 3, [Reg, Reg, Reg], ThreeReg, 0x5000),
    row!(Op::Sub, 3, [Reg, Reg, Num], RegRegImm, 0x3005),
    row!(Op::Sub, 2, [Reg, Num], RegImmSugar, 0x3005),
    row!(Op::Sub, 2, [Reg, Reg], ThreeRegSugar, 0x5000),
    row!(Op::Syscall, 0, [], Direct, 0x0ff2),
    row!(Op::Wait, 0, [], Direct, 0x0ff3),
    row!(Op::Xor, 3, [Reg, Reg, Reg], ThreeReg, 0xa000),
    row!(Op::Xor, 3, [Reg, Reg, Num], RegRegImm, 0x300a),
    row!(Op::Xor, 2, [Reg, Num], RegImmSugar, 0x300a),
    row!(Op::Xor, 2, [Reg, Reg], ThreeRegSugar, 0xa000),
    row!(Op::Zext1, 2, [Reg, Reg], Unary, 0x0001),
    row!(Op::Zext1, 1, [Reg], UnarySugar, 0x0001),
    row!(Op::Zext2, 2, [Reg, Reg], Unary, 0x0002),
    row!(Op::Zext2, 1, [Reg], UnarySugar, 0x0002),
    row!(Op::Zext4, 2, [Reg, Reg], Unary, 0x0003),
    row!(Op::Zext4, 1, [Reg], UnarySugar, 0x0003),
];

/// Linear exact-match scan over `TMATCH`, mirroring `match()`: first row
/// whose `(op, arity, kinds[..arity])` matches the given operands wins.
pub fn match_template(op: Op, kinds: &[ArgKind]) -> Option<&'static TemplateRow> {
    TMATCH.iter().find(|row| {
        row.op == op
            && row.arity as usize == kinds.len()
            && row.kinds[..kinds.len()] == *kinds
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_arity_and_kind_match_required() {
        let row = match_template(Op::Add, &[ArgKind::Reg, ArgKind::Reg, ArgKind::Reg]).unwrap();
        assert_eq!(row.encoding, EncodeKind::ThreeReg);
        assert_eq!(row.word, 0x4000);

        let row = match_template(Op::Add, &[ArgKind::Reg, ArgKind::Num]).unwrap();
        assert_eq!(row.encoding, EncodeKind::RegImmSugar);

        assert!(match_template(Op::Add, &[ArgKind::Reg]).is_none());
        assert!(match_template(Op::Nop, &[ArgKind::Reg]).is_none());
    }

    #[test]
    fn zero_arity_opcodes_present() {
        let row = match_template(Op::Nop, &[]).unwrap();
        assert_eq!(row.encoding, EncodeKind::Direct);
        assert_eq!(row.word, 0x0ff1);
    }

    #[test]
    fn li_has_single_template_row_dispatching_all_special_cases() {
        let row = match_template(Op::Li, &[ArgKind::Reg, ArgKind::Num]).unwrap();
        assert_eq!(row.encoding, EncodeKind::LoadImmediate);
    }

    #[test]
    fn table_row_count_matches_reference() {
        assert_eq!(TMATCH.len(), 101);
    }
}
