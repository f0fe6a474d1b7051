//! Recursive arithmetic expression evaluator.
//!
//! Ground: `eonasm.c`'s `expr()` (§4.2 of the specification). The original
//! scans one token at a time -- without distinguishing "I expect a value"
//! from "I expect an operator" ahead of time -- and only afterwards checks
//! that values and operators came in strict alternation, via two small
//! stacks it reduces from the top once the whole expression has been
//! scanned. We keep that *same token dispatch order* (it matters: a `-`
//! immediately followed by a digit is a signed literal, never the subtract
//! operator, and that rule is checked before the generic operator branch)
//! but fold left-to-right as each value arrives instead of stack-and-reduce
//! at the end.
//!
//! Decision (see `DESIGN.md`, OQ-5): the reference implementation's final
//! reduction pops both stacks from the end (LIFO), which for three or more
//! terms chained with non-commutative operators folds *right-to-left*
//! (`2 - 3 - 1` reduces as `2 - (3 - 1)`, not `(2 - 3) - 1`) even though the
//! specification's prose states "left-to-right". We implement the prose's
//! explicitly stated left-to-right semantics rather than the reference
//! binary's incidental stack-order quirk.

use crate::diagnostics::Diagnostics;
use crate::error::FatalError;
use crate::lex::{is_alnum, is_digit, to_upper, Cursor};
use crate::symtab::{LabelId, SymbolTable};

/// Everything the evaluator needs beyond the cursor over the current line.
pub struct ExprCtx<'a> {
    pub table: &'a mut SymbolTable,
    pub diags: &'a mut Diagnostics,
    pub file: &'a str,
    pub line: u32,
    /// The enclosing global label, for resolving `.local` references.
    pub main_label: Option<usize>,
    /// `true` on passes where an unresolved label is not yet an error
    /// (forward references still settling); `false` on the final pass.
    pub allow_undef: bool,
    pub pc: u32,
}

enum Token {
    Value(u32),
    Op(u8),
    /// Nothing recognizable at the current position; cursor untouched.
    Stop,
}

/// Evaluate one expression starting at `cur`'s current position. `cur` is
/// advanced past everything consumed. `Ok(None)` means a diagnostic was
/// already reported and the caller should abandon the rest of the line
/// (mirrors the reference's `p = NULL` sentinel); it is not a `FatalError`
/// by itself, only the diagnostic abort-threshold can escalate it to one.
pub fn eval(cur: &mut Cursor, ctx: &mut ExprCtx) -> Result<Option<u32>, FatalError> {
    let mut acc: u32 = 0;
    let mut pending_op: Option<u8> = None;
    let mut n_values: u32 = 0;
    let mut n_ops: u32 = 0;

    loop {
        cur.skip_spaces();
        match parse_token(cur, ctx)? {
            None => return Ok(None),
            Some(Token::Stop) => break,
            Some(Token::Op(op)) => {
                if n_ops + 1 != n_values {
                    break;
                }
                n_ops += 1;
                pending_op = Some(op);
            }
            Some(Token::Value(v)) => {
                if n_values != n_ops {
                    break;
                }
                n_values += 1;
                acc = match pending_op.take() {
                    Some(op) => apply_op(op, acc, v, ctx)?,
                    None => v,
                };
            }
        }
    }

    if n_ops + 1 != n_values {
        ctx.diags.report(ctx.file, ctx.line, "expr syntax")?;
        return Ok(None);
    }

    Ok(Some(acc))
}

fn apply_op(op: u8, l: u32, r: u32, ctx: &mut ExprCtx) -> Result<u32, FatalError> {
    Ok(match op {
        b'+' => l.wrapping_add(r),
        b'-' => l.wrapping_sub(r),
        b'*' => l.wrapping_mul(r),
        b'/' => {
            if r == 0 {
                ctx.diags
                    .report(ctx.file, ctx.line, "division by zero in expression")?;
                0
            } else {
                l.wrapping_div(r)
            }
        }
        b'%' => {
            if r == 0 {
                ctx.diags
                    .report(ctx.file, ctx.line, "division by zero in expression")?;
                0
            } else {
                l.wrapping_rem(r)
            }
        }
        b'&' => l & r,
        b'|' => l | r,
        _ => unreachable!("apply_op called with non-operator byte"),
    })
}

fn parse_token(cur: &mut Cursor, ctx: &mut ExprCtx) -> Result<Option<Token>, FatalError> {
    let c = cur.peek();

    if c == b'(' {
        cur.bump();
        return match eval(cur, ctx)? {
            None => Ok(None),
            Some(v) => {
                cur.skip_spaces();
                if cur.peek() == b')' {
                    cur.bump();
                    Ok(Some(Token::Value(v)))
                } else {
                    ctx.diags.report(ctx.file, ctx.line, "missing closing )")?;
                    Ok(None)
                }
            }
        };
    }

    if c == b'$' {
        cur.bump();
        if cur.peek() == b'$' {
            cur.bump();
            return Ok(Some(Token::Value(ctx.pc)));
        }
        let mut v: u32 = 0;
        while let Some(d) = hex_digit(cur.peek()) {
            v = (v << 4) | d as u32;
            cur.bump();
        }
        return Ok(Some(Token::Value(v)));
    }

    if is_digit(c) || (c == b'-' && is_digit(cur.peek_at(1))) {
        let minus = c == b'-';
        if minus {
            cur.bump();
        }
        let mut v: u32 = 0;
        while is_digit(cur.peek()) {
            v = v.wrapping_mul(10).wrapping_add((cur.bump() - b'0') as u32);
        }
        return Ok(Some(Token::Value(if minus { 0u32.wrapping_sub(v) } else { v })));
    }

    if c == b'\'' {
        if cur.peek_at(1) != 0 && cur.peek_at(2) == b'\'' {
            let ch = cur.peek_at(1);
            cur.bump();
            cur.bump();
            cur.bump();
            return Ok(Some(Token::Value(ch as u32)));
        }
        ctx.diags.report(ctx.file, ctx.line, "missing closing '")?;
        return Ok(None);
    }

    if matches!(c, b'+' | b'-' | b'&' | b'|' | b'*' | b'%' | b'/') {
        cur.bump();
        return Ok(Some(Token::Op(c)));
    }

    if c == b':' || is_alpha_start(c) || c == b'.' {
        if c == b':' {
            cur.bump();
        }
        let local = cur.peek() == b'.';
        if local {
            cur.bump();
        }
        if local && ctx.main_label.is_none() {
            ctx.diags
                .report(ctx.file, ctx.line, "local label in expr without main label")?;
        }

        let mut name = String::new();
        while cur.peek() == b'_' || is_alnum(cur.peek()) {
            name.push(to_upper(cur.bump()) as char);
        }

        let owner = if local { ctx.main_label } else { None };
        let found = match owner {
            Some(g) => ctx.table.find_local(g, &name),
            None => ctx.table.find_global(&name),
        };

        let value = match found {
            Some(id) => {
                ctx.table.get_mut(id).mark_used();
                ctx.table.get(id).value
            }
            None => {
                if !ctx.allow_undef {
                    ctx.diags.report(ctx.file, ctx.line, "undefined label in expr")?;
                }
                0
            }
        };
        return Ok(Some(Token::Value(value)));
    }

    Ok(Some(Token::Stop))
}

fn is_alpha_start(c: u8) -> bool {
    crate::lex::is_alpha(c)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn eval_str(input: &str, table: &mut SymbolTable, main_label: Option<usize>, allow_undef: bool, pc: u32) -> Option<u32> {
        let mut diags = Diagnostics::new();
        let mut cur = Cursor::new(input);
        let mut ctx = ExprCtx {
            table,
            diags: &mut diags,
            file: "t.asm",
            line: 1,
            main_label,
            allow_undef,
            pc,
        };
        eval(&mut cur, &mut ctx).unwrap()
    }

    #[test]
    fn decimal_and_hex_and_pc() {
        let mut t = SymbolTable::new();
        assert_eq!(eval_str("42", &mut t, None, false, 0), Some(42));
        assert_eq!(eval_str("-7", &mut t, None, false, 0), Some(0u32.wrapping_sub(7)));
        assert_eq!(eval_str("$ff", &mut t, None, false, 0), Some(0xff));
        assert_eq!(eval_str("$$", &mut t, None, false, 0x1234), Some(0x1234));
        assert_eq!(eval_str("'A'", &mut t, None, false, 0), Some(b'A' as u32));
    }

    #[test]
    fn left_to_right_no_precedence() {
        let mut t = SymbolTable::new();
        // (2 - 3) - 1 = -2, NOT 2 - (3 - 1) = 0
        assert_eq!(eval_str("2 - 3 - 1", &mut t, None, false, 0), Some(0u32.wrapping_sub(2)));
        assert_eq!(eval_str("2 + 3 * 4", &mut t, None, false, 0), Some((2 + 3) * 4));
    }

    #[test]
    fn parens_and_label_reference() {
        let mut t = SymbolTable::new();
        t.insert_global("FOO", 10).unwrap();
        assert_eq!(eval_str("(FOO + 2) * 3", &mut t, None, false, 0), Some(36));
        let id = t.find_global("FOO").unwrap();
        assert!(t.get(id).used());
    }

    #[test]
    fn undefined_label_allowed_when_forward() {
        let mut t = SymbolTable::new();
        assert_eq!(eval_str("MISSING", &mut t, None, true, 0), Some(0));
    }

    #[test]
    fn undefined_label_errors_on_final_pass() {
        let mut t = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let mut cur = Cursor::new("MISSING");
        let mut ctx = ExprCtx {
            table: &mut t,
            diags: &mut diags,
            file: "t.asm",
            line: 3,
            main_label: None,
            allow_undef: false,
            pc: 0,
        };
        let result = eval(&mut cur, &mut ctx).unwrap();
        assert_eq!(result, Some(0));
        assert_eq!(diags.count(), 1);
    }

    #[test]
    fn local_label_scoped_to_main() {
        let mut t = SymbolTable::new();
        let main = match t.insert_global("LOOP", 100).unwrap() {
            LabelId::Global(i) => i,
            _ => unreachable!(),
        };
        t.insert_local(main, ".again", 104).unwrap();
        assert_eq!(eval_str(".again", &mut t, Some(main), false, 0), Some(104));
    }

    #[test]
    fn malformed_paren_is_malformed() {
        let mut t = SymbolTable::new();
        assert_eq!(eval_str("(1 + 2", &mut t, None, false, 0), None);
    }

    #[test]
    fn division_by_zero_is_nonfatal_and_yields_zero() {
        let mut t = SymbolTable::new();
        let mut diags = Diagnostics::new();
        let mut cur = Cursor::new("5 / 0");
        let mut ctx = ExprCtx {
            table: &mut t,
            diags: &mut diags,
            file: "t.asm",
            line: 1,
            main_label: None,
            allow_undef: false,
            pc: 0,
        };
        assert_eq!(eval(&mut cur, &mut ctx).unwrap(), Some(0));
        assert_eq!(diags.count(), 1);
    }
}
