//! Per-line state machine: optional label, then a directive or an opcode
//! with up to three operands.
//!
//! Ground: `eonasm.c`'s `assemble()` line body, from the label prefix
//! through the trailing `extra characters at end` check (§4.5/§4.6). The
//! reference folds label handling, directive dispatch, operand parsing,
//! template matching and encoding into one large function working over a
//! raw `uint8_t *p`; we keep the same sequence of steps but split each into
//! its own small function for readability, since nothing here needs the
//! `goto next`-style early exits C relies on (`?` does that job).

use crate::diagnostics::Diagnostics;
use crate::encode::{encode, EncodeCtx, Operand as EncOperand};
use crate::error::FatalError;
use crate::expr::{eval, ExprCtx};
use crate::lex::{is_alnum, is_alpha, is_digit, to_upper, Cursor};
use crate::opcodes::{find_opcode, find_register};
use crate::symtab::{LabelId, SymbolTable};
use crate::template::{match_template, ArgKind};

/// What a processed line produced, for the pass driver / listing /
/// hex-emitter to consume.
pub struct LineOutcome {
    /// Encoded bytes for this line (empty for directives/labels that emit
    /// nothing, e.g. `.EQU`, a bare label, `.SPACE`).
    pub bytes: Vec<u8>,
    /// `.ORG` moved the program counter without emitting bytes in between.
    pub org: bool,
    /// `.SPACE` reserved this many bytes without defining their contents.
    pub space: Option<u32>,
    /// Set when the line was `label: .EQU expr` -- the listing prints
    /// `= hi.lo` instead of a hex dump for these.
    pub equ_value: Option<u32>,
    pub pc_before: u32,
    pub source: String,
    pub lineno: u32,
}

impl LineOutcome {
    fn empty(pc: u32, lineno: u32, source: String) -> Self {
        LineOutcome {
            bytes: Vec::new(),
            org: false,
            space: None,
            equ_value: None,
            pc_before: pc,
            source,
            lineno,
        }
    }
}

/// Everything `process_line` needs beyond the raw text.
pub struct LineCtx<'a> {
    pub table: &'a mut SymbolTable,
    pub diags: &'a mut Diagnostics,
    pub file: &'a str,
    pub lineno: u32,
    pub pc: u32,
    /// The enclosing global label for this file, threaded by the caller
    /// across lines and reset to `None` at the start of each file.
    pub main_label: &'a mut Option<usize>,
    /// `true` only on the final, emitting pass.
    pub out: bool,
    /// `true` only on pass 0, where seeing a label name already in the
    /// table means a duplicate definition rather than a later-pass revisit.
    pub pass_zero: bool,
    /// Set when a label was newly inserted or changed value this pass,
    /// telling the pass driver another pass is needed before the final
    /// emitting one. Owned by the driver and reset at the start of each
    /// pass; only label (re)definition ever sets it (ground: `eonasm.c`'s
    /// `bool *pmore` out-parameter to `assemble()`).
    pub more: &'a mut bool,
}

/// Process one source line. Returns `Ok(None)` for a line that set `*pmore`
/// without otherwise needing further handling from the caller beyond that
/// (this mirrors `continue`/`goto next` exits in the reference); the caller
/// inspects `more` via `ctx` side effects instead of a return flag, since
/// label (re)definition is the only thing that can set it and that already
/// happens inside this function against `ctx.table`.
pub fn process_line(source: &str, ctx: &mut LineCtx) -> Result<Option<LineOutcome>, FatalError> {
    let mut cur = Cursor::new(source);

    let lbl = parse_label(&mut cur, ctx)?;

    cur.skip_spaces();

    let outcome = if cur.peek() == b'.' {
        match parse_directive(&mut cur, ctx, lbl)? {
            Some(o) => o,
            None => return Ok(None),
        }
    } else if is_alpha(cur.peek()) {
        match parse_instruction(&mut cur, ctx)? {
            Some(bytes) => {
                let mut o = LineOutcome::empty(ctx.pc, ctx.lineno, source.to_owned());
                o.bytes = bytes;
                o
            }
            None => return Ok(None),
        }
    } else {
        LineOutcome::empty(ctx.pc, ctx.lineno, source.to_owned())
    };

    cur.skip_spaces();
    let trailing = cur.peek();
    if trailing != 0 && trailing != b';' && trailing != b'#' {
        ctx.diags
            .report(ctx.file, ctx.lineno, "extra characters at end")?;
    }

    Ok(Some(outcome))
}

/// Parses an optional leading label, registering or updating it. Returns
/// the label id if one was present on this line (used by `.EQU`).
fn parse_label(cur: &mut Cursor, ctx: &mut LineCtx) -> Result<Option<LabelId>, FatalError> {
    if !(is_alpha(cur.peek()) || cur.peek() == b'.') {
        return Ok(None);
    }

    let local = cur.peek() == b'.';
    if local {
        cur.bump();
    }
    let mut name = String::new();
    while is_alnum(cur.peek()) || cur.peek() == b'_' {
        name.push(to_upper(cur.bump()) as char);
    }

    if local && ctx.main_label.is_none() {
        ctx.diags
            .report(ctx.file, ctx.lineno, "local label without main label")?;
    }

    let owner = if local { *ctx.main_label } else { None };
    let found = match owner {
        Some(g) => ctx.table.find_local(g, &name),
        None => ctx.table.find_global(&name),
    };

    let id = if let Some(id) = found {
        if ctx.lineno_is_first_pass() {
            ctx.diags.report(ctx.file, ctx.lineno, "duplicated label")?;
        } else {
            let label = ctx.table.get_mut(id);
            if !label.is_equ() && label.value != ctx.pc {
                *ctx.more = true;
                label.value = ctx.pc;
            }
        }
        id
    } else {
        *ctx.more = true;
        let id = match owner {
            Some(g) => ctx.table.insert_local(g, &name, ctx.pc)?,
            None => ctx.table.insert_global(&name, ctx.pc)?,
        };
        if ctx.out {
            ctx.diags
                .report(ctx.file, ctx.lineno, "undefined label on last pass !")?;
        }
        id
    };

    if !local {
        if let LabelId::Global(g) = id {
            *ctx.main_label = Some(g);
        }
    }

    if cur.peek() == b':' {
        cur.bump();
    }

    Ok(Some(id))
}

impl<'a> LineCtx<'a> {
    /// First pass is pass 0: a label seen again there is a duplicate
    /// definition within the same source, never a later-pass re-visit.
    fn lineno_is_first_pass(&self) -> bool {
        self.pass_zero
    }
}

fn expr_ctx<'a, 'b>(cur_ctx: &'a mut LineCtx<'b>) -> ExprCtx<'a> {
    ExprCtx {
        table: cur_ctx.table,
        diags: cur_ctx.diags,
        file: cur_ctx.file,
        line: cur_ctx.lineno,
        main_label: *cur_ctx.main_label,
        allow_undef: !cur_ctx.out,
        pc: cur_ctx.pc,
    }
}

/// `.ORG`/`.EQU`/`.ZERO`/`.SPACE` always evaluate their size/address
/// expression with `allow_undef = false`, unlike `.BYTE`/`.WORD` and
/// instruction operands (which relax to `!out` until the final pass).
/// Ground: `eonasm.c` passes a literal `false` for these four directives'
/// `expr()` call, never `!out` -- an undefined label in a `.ORG` target or
/// an `.EQU` value is always an error, immediately, on every pass.
fn expr_ctx_strict<'a, 'b>(cur_ctx: &'a mut LineCtx<'b>) -> ExprCtx<'a> {
    let mut ectx = expr_ctx(cur_ctx);
    ectx.allow_undef = false;
    ectx
}

fn parse_directive(
    cur: &mut Cursor,
    ctx: &mut LineCtx,
    lbl: Option<LabelId>,
) -> Result<Option<LineOutcome>, FatalError> {
    cur.bump(); // '.'
    let mut name = String::new();
    while is_alpha(cur.peek()) {
        name.push(to_upper(cur.bump()) as char);
    }
    cur.skip_spaces();

    let mut out = LineOutcome::empty(ctx.pc, ctx.lineno, String::new());

    match name.as_str() {
        "ORG" => {
            let v = match eval(cur, &mut expr_ctx_strict(ctx))? {
                None => return Ok(None),
                Some(v) => v,
            };
            out.bytes = vec![0; (v.wrapping_sub(ctx.pc)) as usize];
            out.org = true;
        }
        "EQU" => {
            let v = match eval(cur, &mut expr_ctx_strict(ctx))? {
                None => return Ok(None),
                Some(v) => v,
            };
            match lbl {
                Some(id) => {
                    let label = ctx.table.get_mut(id);
                    label.value = v;
                    label.mark_used();
                    label.mark_equ();
                    out.equ_value = Some(v);
                }
                None => {
                    ctx.diags
                        .report(ctx.file, ctx.lineno, ".EQU without label")?;
                    return Ok(None);
                }
            }
        }
        "ZERO" => {
            let v = match eval(cur, &mut expr_ctx_strict(ctx))? {
                None => return Ok(None),
                Some(v) => v,
            };
            if v as usize > MAX_LINE_BYTES {
                ctx.diags
                    .report(ctx.file, ctx.lineno, ".ZERO size overflow")?;
                return Ok(None);
            }
            out.bytes = vec![0; v as usize];
        }
        "SPACE" => {
            let v = match eval(cur, &mut expr_ctx_strict(ctx))? {
                None => return Ok(None),
                Some(v) => v,
            };
            out.space = Some(v);
            out.bytes = vec![0; v as usize];
        }
        "BYTE" => loop {
            cur.skip_spaces();
            if cur.peek() == b'"' {
                cur.bump();
                while cur.peek() != 0 && cur.peek() != b'"' {
                    out.bytes.push(cur.bump());
                }
                if cur.bump() != b'"' {
                    ctx.diags.report(ctx.file, ctx.lineno, "incomplete string")?;
                    return Ok(None);
                }
                cur.skip_spaces();
            } else {
                let v = match eval(cur, &mut expr_ctx(ctx))? {
                    None => return Ok(None),
                    Some(v) => v,
                };
                if ctx.out && v > 255 {
                    ctx.diags.report(ctx.file, ctx.lineno, ".BYTE overflow")?;
                }
                out.bytes.push(v as u8);
            }
            if cur.peek() != b',' {
                break;
            }
            cur.bump();
        },
        "WORD" => loop {
            let v = match eval(cur, &mut expr_ctx(ctx))? {
                None => return Ok(None),
                Some(v) => v,
            };
            out.bytes.push((v >> 8) as u8);
            out.bytes.push(v as u8);
            // `> 65536`, not `> 65535`: preserved verbatim from the
            // reference's own off-by-one so a value of exactly 65536
            // silently round-trips through the 16-bit truncation instead
            // of being flagged -- not "fixed" here, since diverging would
            // change which programs assemble clean.
            if ctx.out && v > 65536 {
                ctx.diags.report(ctx.file, ctx.lineno, ".WORD overflow")?;
            }
            if cur.peek() != b',' {
                break;
            }
            cur.bump();
        },
        _ => {
            ctx.diags.report(ctx.file, ctx.lineno, "unknown directive")?;
            return Ok(None);
        }
    }

    Ok(Some(out))
}

const MAX_LINE_BYTES: usize = 128;

/// One parsed operand before template matching, tagged by kind.
enum RawOperand {
    Reg(u8),
    Num(i32),
    Mem { reg: u8, offset: i32 },
}

impl RawOperand {
    fn kind(&self) -> ArgKind {
        match self {
            RawOperand::Reg(_) => ArgKind::Reg,
            RawOperand::Num(_) => ArgKind::Num,
            RawOperand::Mem { .. } => ArgKind::Mem,
        }
    }
}

fn parse_instruction(cur: &mut Cursor, ctx: &mut LineCtx) -> Result<Option<Vec<u8>>, FatalError> {
    let mut name = String::new();
    while is_alnum(cur.peek()) {
        name.push(to_upper(cur.bump()) as char);
    }

    let op = match find_opcode(&name) {
        Some(op) => op,
        None => {
            ctx.diags.report(ctx.file, ctx.lineno, "unknown opcode")?;
            return Ok(None);
        }
    };

    let mut args: Vec<RawOperand> = Vec::with_capacity(3);
    let mut need_sep = false;
    while args.len() < 3 {
        cur.skip_spaces();

        if cur.peek() == b',' {
            cur.bump();
            if !need_sep {
                ctx.diags.report(ctx.file, ctx.lineno, "unexpected ','")?;
            }
            need_sep = false;
            continue;
        }

        if is_alpha(cur.peek()) {
            let save = cur.pos();
            let mut word = String::new();
            while is_alnum(cur.peek()) {
                word.push(to_upper(cur.bump()) as char);
            }
            match find_register(&word) {
                Some(r) => args.push(RawOperand::Reg(r)),
                None => {
                    cur.set_pos(save);
                    let v = match eval(cur, &mut expr_ctx(ctx))? {
                        None => return Ok(None),
                        Some(v) => v,
                    };
                    args.push(RawOperand::Num(v as i32));
                }
            }
        } else if cur.peek() == b'[' {
            cur.bump();
            cur.skip_spaces();
            let mut word = String::new();
            while is_alnum(cur.peek()) {
                word.push(to_upper(cur.bump()) as char);
            }
            let reg = match find_register(&word) {
                Some(r) => r,
                None => {
                    ctx.diags.report(ctx.file, ctx.lineno, "unknown register")?;
                    0
                }
            };
            cur.skip_spaces();

            let mut offset = 0i32;
            if cur.peek() == b'+' || cur.peek() == b'-' {
                let minus = cur.peek() == b'-';
                cur.bump();
                let v = match eval(cur, &mut expr_ctx(ctx))? {
                    None => return Ok(None),
                    Some(v) => v,
                };
                offset = if minus { 0i32.wrapping_sub(v as i32) } else { v as i32 };
            }

            if cur.bump() != b']' {
                ctx.diags
                    .report(ctx.file, ctx.lineno, "memory access arg without ']'")?;
                return Ok(None);
            }
            args.push(RawOperand::Mem { reg, offset });
        } else if matches!(cur.peek(), b':' | b'.' | b'$' | b'\'' | b'-') || is_digit(cur.peek()) {
            let v = match eval(cur, &mut expr_ctx(ctx))? {
                None => return Ok(None),
                Some(v) => v,
            };
            args.push(RawOperand::Num(v as i32));
        } else {
            break;
        }

        need_sep = true;
    }

    cur.skip_spaces();

    let kinds: Vec<ArgKind> = args.iter().map(RawOperand::kind).collect();
    let row = match match_template(op, &kinds) {
        Some(row) => row,
        None => {
            ctx.diags
                .report(ctx.file, ctx.lineno, "unknown combination of opcode and args")?;
            return Ok(None);
        }
    };

    let mut operands = [EncOperand::default(); 3];
    for (slot, arg) in operands.iter_mut().zip(args.iter()) {
        match *arg {
            RawOperand::Reg(r) => slot.reg = r,
            RawOperand::Num(v) => slot.val = v,
            RawOperand::Mem { reg, offset } => {
                slot.reg = reg;
                slot.val = offset;
            }
        }
    }

    let mut encode_ctx = EncodeCtx {
        diags: ctx.diags,
        file: ctx.file,
        line: ctx.lineno,
        pc: ctx.pc,
        out: ctx.out,
    };
    let bytes = encode(row.encoding, row.word, operands, &mut encode_ctx)?;
    Ok(Some(bytes))
}
