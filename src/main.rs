#[macro_use]
extern crate clap;

use clap::Arg;
use eonasm::{AssembleOptions, FatalError, Source};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("listing")
                .short("l")
                .help("prints a listing to standard output on the final pass"),
        )
        .arg(
            Arg::with_name("unused")
                .short("u")
                .help("reports labels never referenced by an expression"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .help("prints per-pass progress to standard error"),
        )
        .arg(
            Arg::with_name("OUTFILE")
                .help("HEX image to write")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("INFILE")
                .help("source file(s) to assemble, in order")
                .required(true)
                .multiple(true)
                .index(2),
        )
        .get_matches();

    let opts = AssembleOptions {
        listing: matches.is_present("listing"),
        unused: matches.is_present("unused"),
        verbose: matches.is_present("verbose"),
    };
    let outfile = PathBuf::from(matches.value_of("OUTFILE").unwrap());
    let infiles: Vec<&str> = matches.values_of("INFILE").unwrap().collect();

    exit(run(&outfile, &infiles, &opts));
}

/// Loads every input, drives the pass loop, and writes whatever output was
/// requested. Returns the process exit code (ground: `eonasm.c`'s `main()`
/// -- `0` on a clean run, `1` for a fatal I/O condition or an accumulated
/// non-fatal diagnostic).
fn run(outfile: &PathBuf, infiles: &[&str], opts: &AssembleOptions) -> i32 {
    let mut texts: Vec<(String, String)> = Vec::with_capacity(infiles.len());
    for path in infiles {
        let mut file = match fs::File::open(path) {
            Ok(f) => f,
            Err(err) => {
                eprintln!(
                    "{}",
                    FatalError::OpenInput {
                        path: (*path).to_owned(),
                        message: err.to_string(),
                    }
                );
                return 1;
            }
        };
        let mut text = String::new();
        if let Err(err) = io::Read::read_to_string(&mut file, &mut text) {
            eprintln!(
                "{}",
                FatalError::ReadInput {
                    path: (*path).to_owned(),
                    message: err.to_string(),
                }
            );
            return 1;
        }
        texts.push(((*path).to_owned(), text));
    }
    let sources: Vec<Source> = texts
        .iter()
        .map(|(name, text)| Source { name, text })
        .collect();

    let output = match eonasm::assemble(&sources, opts) {
        Ok(out) => out,
        Err(err) => {
            eprintln!("{}", err);
            return 1;
        }
    };

    if let Some(listing) = &output.listing {
        print!("{}", listing);
    }

    if opts.listing || !output.diagnostics.is_empty() {
        print!("{}", output.stats);
    }

    if !output.diagnostics.is_empty() {
        for diag in &output.diagnostics {
            eprintln!("{}", diag);
        }
        eprintln!("eonasm: {} errors.", output.diagnostics.len());
        return 1;
    }

    if let Err(err) = fs::write(outfile, &output.hex) {
        eprintln!(
            "{}",
            FatalError::OpenOutput {
                path: outfile.display().to_string(),
                message: err.to_string(),
            }
        );
        return 1;
    }

    if opts.unused {
        for name in &output.unused_labels {
            eprintln!("eonasm: unused label [{}]", name);
        }
    }

    if opts.listing {
        let _ = io::stdout().flush();
    }

    0
}
