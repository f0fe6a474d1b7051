//! Instruction word encoder: turns a matched `template::TemplateRow` plus
//! parsed operands into the final instruction bytes.
//!
//! Ground: `eonasm.c`'s `again: switch (k) { ... }` inside `assemble()`
//! (§4.4). Every primary kind and every sugar kind (which rewrites the
//! operand slots and the working opcode word, then re-enters the switch --
//! `goto again`) is translated one-for-one below, as a bounded loop instead
//! of `goto`.

use crate::diagnostics::Diagnostics;
use crate::error::FatalError;
use crate::template::EncodeKind;
use byteorder::{BigEndian, WriteBytesExt};

/// One operand slot. Mirrors `arg_t`: `reg` is meaningful for register and
/// memory-base slots, `val` for immediate and memory-offset slots. Which
/// field a given slot actually holds is determined entirely by which
/// `ArgKind` the matched template expects there -- the encoder (like the
/// reference) never tags a slot itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct Operand {
    pub reg: u8,
    pub val: i32,
}

pub struct EncodeCtx<'a> {
    pub diags: &'a mut Diagnostics,
    pub file: &'a str,
    pub line: u32,
    pub pc: u32,
    /// Only the final, emitting pass range-checks immediates -- matches
    /// `out` gating every `error()` call in the reference's switch, so a
    /// forward reference that hasn't settled yet doesn't spuriously fail
    /// range checks on intermediate passes.
    pub out: bool,
}

const MAX_REWRITES: u32 = 4;

/// Encode one matched instruction. `operands` holds up to three slots;
/// slots beyond the template's arity are ignored on entry but may still be
/// written by a sugar rewrite before it hands off to the kind that reads
/// them (exactly as the reference does).
pub fn encode(
    mut kind: EncodeKind,
    mut word: u16,
    mut operands: [Operand; 3],
    ctx: &mut EncodeCtx,
) -> Result<Vec<u8>, FatalError> {
    let mut code = Vec::with_capacity(6);
    let mut rewrites = 0;

    loop {
        match kind {
            EncodeKind::Direct => {
                code.write_u16::<BigEndian>(word).expect("Vec<u8> writes never fail");
                return Ok(code);
            }
            EncodeKind::ThreeReg => {
                code.push((word >> 8) as u8 | operands[0].reg);
                code.push((operands[1].reg << 4) | operands[2].reg);
                return Ok(code);
            }
            EncodeKind::ThreeRegSugar => {
                operands[2].reg = operands[1].reg;
                operands[1].reg = operands[0].reg;
                kind = EncodeKind::ThreeReg;
            }
            EncodeKind::RegRegImm => {
                code.push((word >> 8) as u8 | operands[0].reg);
                code.push((word as u8) | (operands[1].reg << 4));
                push_i16(&mut code, operands[2].val);
                if ctx.out && !(-32768..=32767).contains(&operands[2].val) {
                    ctx.diags.report(ctx.file, ctx.line, "immediate out of range")?;
                }
                return Ok(code);
            }
            EncodeKind::RegImmSugar => {
                operands[2].val = operands[1].val;
                operands[1].reg = operands[0].reg;
                kind = EncodeKind::RegRegImm;
            }
            EncodeKind::Branch => {
                code.write_u16::<BigEndian>(word).expect("Vec<u8> writes never fail");
                let off = (operands[0].val - (ctx.pc as i32 + 4)) / 2;
                push_i16(&mut code, off);
                if ctx.out && !(-32768..=32767).contains(&off) {
                    ctx.diags.report(ctx.file, ctx.line, "branch out of range")?;
                }
                return Ok(code);
            }
            EncodeKind::BranchCondSugar => {
                word |= ((operands[0].reg as u16) << 8) | ((operands[1].reg as u16) << 4);
                operands[0].val = operands[2].val;
                kind = EncodeKind::Branch;
            }
            EncodeKind::BranchUnarySugar => {
                word |= (operands[0].reg as u16) << 8;
                operands[0].val = operands[1].val;
                kind = EncodeKind::Branch;
            }
            EncodeKind::Unary => {
                code.push((word >> 8) as u8 | operands[0].reg);
                code.push((word as u8) | (operands[1].reg << 4));
                return Ok(code);
            }
            EncodeKind::UnarySugar => {
                code.push((word >> 8) as u8 | operands[0].reg);
                code.push((word as u8) | (operands[0].reg << 4));
                return Ok(code);
            }
            EncodeKind::ImmAsRegRegImm => {
                operands[0].reg = 0;
                operands[1].reg = 0;
                operands[2].val = operands[0].val;
                kind = EncodeKind::RegRegImm;
            }
            EncodeKind::Memory => {
                code.push((word >> 8) as u8 | operands[0].reg);
                code.push((word as u8) | (operands[1].reg << 4));
                push_i16(&mut code, operands[1].val);
                if ctx.out && !(-32768..=32767).contains(&operands[1].val) {
                    ctx.diags
                        .report(ctx.file, ctx.line, "memory offset out of range")?;
                }
                return Ok(code);
            }
            EncodeKind::MemoryStoreSugar => {
                operands[2].reg = operands[1].reg;
                operands[1].reg = operands[0].reg;
                operands[1].val = operands[0].val;
                operands[0].reg = operands[2].reg;
                kind = EncodeKind::Memory;
            }
            EncodeKind::Jump => {
                code.write_u16::<BigEndian>(word).expect("Vec<u8> writes never fail");
                let off = (operands[0].val - (ctx.pc as i32 + 6)) / 2;
                push_i32(&mut code, off);
                return Ok(code);
            }
            EncodeKind::Lea => {
                code.push((word >> 8) as u8);
                code.push((word as u8) | (operands[0].reg << 4));
                let off = operands[1].val - (ctx.pc as i32 + 6);
                push_i32(&mut code, off);
                return Ok(code);
            }
            EncodeKind::LeaMemSugar => {
                if operands[1].reg == 15 {
                    operands[1].reg = operands[0].reg;
                    operands[0].reg = 0;
                    kind = EncodeKind::Memory;
                } else {
                    word = 0x3004;
                    operands[2].val = operands[1].val;
                    kind = EncodeKind::RegRegImm;
                }
            }
            EncodeKind::LoadImmediate => {
                let n = operands[1].val;
                if n == 0 {
                    code.push(0x80 | operands[0].reg);
                    code.push(0xff);
                    return Ok(code);
                } else if n == 1 {
                    code.push(operands[0].reg);
                    code.push(0xf8);
                    return Ok(code);
                } else if (-32768..=32767).contains(&n) {
                    word = 0x30f9;
                    operands[1].reg = 0;
                    operands[2].val = n;
                    kind = EncodeKind::RegRegImm;
                } else {
                    code.push((word >> 8) as u8);
                    code.push((word as u8) | (operands[0].reg << 4));
                    push_i32(&mut code, n);
                    return Ok(code);
                }
            }
            EncodeKind::OneReg => {
                code.push((word >> 8) as u8);
                code.push((word as u8) | (operands[0].reg << 4));
                return Ok(code);
            }
            EncodeKind::Move => {
                code.push((word >> 8) as u8 | operands[0].reg);
                code.push((word as u8) | operands[1].reg);
                return Ok(code);
            }
            EncodeKind::Get => {
                code.push((word >> 8) as u8);
                code.push((word as u8) | (operands[0].reg << 4));
                push_i16(&mut code, operands[1].val);
                if ctx.out && !(0..=15).contains(&operands[1].val) {
                    ctx.diags
                        .report(ctx.file, ctx.line, "special register out of range")?;
                }
                return Ok(code);
            }
            EncodeKind::SetSugar => {
                operands[0].reg = operands[1].reg;
                operands[1].val = operands[0].val;
                kind = EncodeKind::Get;
            }
        }

        rewrites += 1;
        if rewrites > MAX_REWRITES {
            ctx.diags.report(ctx.file, ctx.line, "opcode type")?;
            return Ok(code);
        }
    }
}

fn push_i16(code: &mut Vec<u8>, v: i32) {
    code.write_i16::<BigEndian>(v as i16).expect("Vec<u8> writes never fail");
}

fn push_i32(code: &mut Vec<u8>, v: i32) {
    code.write_i32::<BigEndian>(v).expect("Vec<u8> writes never fail");
}
