//! `-l` listing pretty-printer.
//!
//! Ground: the "print line" block inside `eonasm.c`'s `assemble()`, plus
//! the per-file banner and end-of-run stats line printed from `main()`
//! (§6). Each source line gets its address, up to six bytes of hex dump
//! (or the `= hi.lo` / `? size` special displays for `.EQU`/`.SPACE`),
//! the line number and the verbatim source text; lines producing more than
//! six bytes continue on further address-prefixed rows.

const BYTES_PER_ROW: usize = 6;

/// Render one processed line the way `-l` does.
pub fn format_line(
    pc: u32,
    bytes: &[u8],
    org: bool,
    space: Option<u32>,
    equ: Option<u32>,
    lineno: u32,
    source: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:04X} ", pc));

    let count = if org { 0 } else { bytes.len() };

    if let Some(v) = equ {
        out.push_str(&format!("= {:04X}.{:04X} ", v >> 16, v & 0xffff));
    } else if let Some(sp) = space {
        out.push_str(&format!("? {:04X} {:>5}", sp, sp));
    } else {
        for i in 0..BYTES_PER_ROW {
            if i < count {
                out.push_str(&format!("{:02X}", bytes[i]));
            } else {
                out.push_str("  ");
            }
        }
    }

    out.push_str(&format!(" {:>5}\t{}\n", lineno, source));

    if count > BYTES_PER_ROW && space.is_none() {
        let mut i = BYTES_PER_ROW;
        while i < count {
            out.push_str(&format!("{:04X} ", pc.wrapping_add(i as u32)));
            for _ in 0..BYTES_PER_ROW {
                if i < count {
                    out.push_str(&format!("{:02X}", bytes[i]));
                } else {
                    out.push_str("  ");
                }
                i += 1;
            }
            out.push('\n');
        }
    }

    out
}

/// Banner printed once per input file, on the final (emitting) pass only.
pub fn file_header(name: &str) -> String {
    format!("####################### {}\n", name)
}

/// End-of-run summary, printed whenever `-l` was given or any error fired.
pub fn stats_line(passes: u32, max_labels: usize, globals: usize, locals: usize) -> String {
    format!(
        "####################### {:>5} passes. global/local labels (MAX {:>5}): {:>5} / {:>5}\n",
        passes, max_labels, globals, locals
    )
}
