//! Register names and mnemonics, looked up by binary search over a sorted
//! static table.
//!
//! Ground: `eonasm.c`'s `vreg[]`/`reg_find()` and `vop[]`/`op_find()`
//! (§4.3). Both tables there are hand-sorted alphabetically and searched
//! with a manual binary search; we keep the same sorted-table-plus-binary-
//! search shape (over `&'static str` instead of fixed-size `char[]`
//! buffers) rather than reach for a generated match statement, since a
//! linear name-to-id match is not what the reference does and the
//! specification calls out the sorted-table search explicitly.

/// `R0`..`R15`, plus the `SP` alias for `R15`, sorted the same way
/// `vreg[]` is (alphabetically, not numerically: `R10` sorts before `R2`).
const REGISTERS: &[(&str, u8)] = &[
    ("R0", 0),
    ("R1", 1),
    ("R10", 10),
    ("R11", 11),
    ("R12", 12),
    ("R13", 13),
    ("R14", 14),
    ("R2", 2),
    ("R3", 3),
    ("R4", 4),
    ("R5", 5),
    ("R6", 6),
    ("R7", 7),
    ("R8", 8),
    ("R9", 9),
    ("SP", 15),
];

pub fn find_register(name: &str) -> Option<u8> {
    REGISTERS
        .binary_search_by(|(n, _)| (*n).cmp(name))
        .ok()
        .map(|i| REGISTERS[i].1)
}

/// Mnemonic identifiers, in the same order as `vop[]`'s enum ids. Used as
/// the `op` field of `template::TemplateRow`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Op {
    Add,
    And,
    Beq,
    Ble,
    Blei,
    Blt,
    Blti,
    Bne,
    Bnz,
    Bra,
    Bswap,
    Bz,
    Csetn,
    Csetnn,
    Csetnp,
    Csetnz,
    Csetp,
    Csetz,
    Enter,
    Eret,
    Get,
    Illegal,
    In,
    Iret,
    Istat,
    Jal,
    Jmp,
    Ld1,
    Ld1i,
    Ld2,
    Ld2i,
    Ld4,
    Ld4i,
    Ld8,
    Lea,
    Li,
    Mv,
    Nop,
    Or,
    Out,
    Ret,
    Set,
    Sext1,
    Sext2,
    Sext4,
    Shl,
    Shr,
    Shri,
    Signal,
    Sret,
    St1,
    St2,
    St4,
    St8,
    Sub,
    Syscall,
    Wait,
    Xor,
    Zext1,
    Zext2,
    Zext4,
}

/// Mnemonics sorted alphabetically, matching `vop[]` exactly.
const OPCODES: &[(&str, Op)] = &[
    ("ADD", Op::Add),
    ("AND", Op::And),
    ("BEQ", Op::Beq),
    ("BLE", Op::Ble),
    ("BLEI", Op::Blei),
    ("BLT", Op::Blt),
    ("BLTI", Op::Blti),
    ("BNE", Op::Bne),
    ("BNZ", Op::Bnz),
    ("BRA", Op::Bra),
    ("BSWAP", Op::Bswap),
    ("BZ", Op::Bz),
    ("CSETN", Op::Csetn),
    ("CSETNN", Op::Csetnn),
    ("CSETNP", Op::Csetnp),
    ("CSETNZ", Op::Csetnz),
    ("CSETP", Op::Csetp),
    ("CSETZ", Op::Csetz),
    ("ENTER", Op::Enter),
    ("ERET", Op::Eret),
    ("GET", Op::Get),
    ("ILLEGAL", Op::Illegal),
    ("IN", Op::In),
    ("IRET", Op::Iret),
    ("ISTAT", Op::Istat),
    ("JAL", Op::Jal),
    ("JMP", Op::Jmp),
    ("LD1", Op::Ld1),
    ("LD1I", Op::Ld1i),
    ("LD2", Op::Ld2),
    ("LD2I", Op::Ld2i),
    ("LD4", Op::Ld4),
    ("LD4I", Op::Ld4i),
    ("LD8", Op::Ld8),
    ("LEA", Op::Lea),
    ("LI", Op::Li),
    ("MV", Op::Mv),
    ("NOP", Op::Nop),
    ("OR", Op::Or),
    ("OUT", Op::Out),
    ("RET", Op::Ret),
    ("SET", Op::Set),
    ("SEXT1", Op::Sext1),
    ("SEXT2", Op::Sext2),
    ("SEXT4", Op::Sext4),
    ("SHL", Op::Shl),
    ("SHR", Op::Shr),
    ("SHRI", Op::Shri),
    ("SIGNAL", Op::Signal),
    ("SRET", Op::Sret),
    ("ST1", Op::St1),
    ("ST2", Op::St2),
    ("ST4", Op::St4),
    ("ST8", Op::St8),
    ("SUB", Op::Sub),
    ("SYSCALL", Op::Syscall),
    ("WAIT", Op::Wait),
    ("XOR", Op::Xor),
    ("ZEXT1", Op::Zext1),
    ("ZEXT2", Op::Zext2),
    ("ZEXT4", Op::Zext4),
];

pub fn find_opcode(name: &str) -> Option<Op> {
    OPCODES
        .binary_search_by(|(n, _)| (*n).cmp(name))
        .ok()
        .map(|i| OPCODES[i].1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_is_sorted() {
        let mut names: Vec<&str> = REGISTERS.iter().map(|(n, _)| *n).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);

        names = OPCODES.iter().map(|(n, _)| *n).collect();
        sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn register_lookup() {
        assert_eq!(find_register("R0"), Some(0));
        assert_eq!(find_register("R10"), Some(10));
        assert_eq!(find_register("SP"), Some(15));
        assert_eq!(find_register("R16"), None);
    }

    #[test]
    fn opcode_lookup() {
        assert_eq!(find_opcode("ADD"), Some(Op::Add));
        assert_eq!(find_opcode("ZEXT4"), Some(Op::Zext4));
        assert_eq!(find_opcode("NOPE"), None);
    }
}
