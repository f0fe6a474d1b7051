//! Black-box, source-text-in/HEX-text-out scenarios, mirroring the
//! end-to-end examples enumerated in spec.md §8.

use crate::{assemble, AssembleOptions, Source};

fn assemble_one(text: &str) -> crate::AssembleOutput {
    assemble(&[Source { name: "t.asm", text }], &AssembleOptions::default()).unwrap()
}

#[test]
fn public_api_assembles_a_trivial_program() {
    let out = assemble_one("NOP\n");
    assert!(out.diagnostics.is_empty());
    assert!(!out.hex.is_empty());
}

#[test]
fn scenario_1_nop() {
    let out = assemble_one("NOP\n");
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.hex, ":020000000FF1FE\n:00000001FF\n");
}

#[test]
fn scenario_2_org_then_three_reg_add() {
    let out = assemble_one(".ORG $10\nADD R1, R2, R3\n");
    assert!(out.diagnostics.is_empty());
    let upper = out.hex.to_uppercase();
    assert!(upper.contains(":02001000"));
    assert!(upper.contains("4123"));
}

#[test]
fn scenario_3_unconditional_self_branch() {
    let out = assemble_one("L: BRA L\n");
    assert!(out.diagnostics.is_empty());
    assert!(out.hex.to_uppercase().contains("2FF0FFFE"));
}

#[test]
fn scenario_4_byte_directive_string_and_trailing_zero() {
    let out = assemble_one("MSG: .BYTE \"Hi\",0\n");
    assert!(out.diagnostics.is_empty());
    assert!(out.hex.to_uppercase().contains("486900"));
}

#[test]
fn scenario_5_equ_feeds_li_small_immediate() {
    let out = assemble_one("X .EQU 5\nLI R1, X\n");
    assert!(out.diagnostics.is_empty());
    assert!(out.hex.to_uppercase().contains("31F90005"));
}

#[test]
fn scenario_6_add_then_rewritten_conditional_branch() {
    // A: ADD R1, R1, 1   (4 bytes, A-form, at PC 0): 31 14 00 01
    // B: BNE R1, R0, A   (b -> B rewrite, at PC 4, target 0, off = (0-8)/2 = -4): 21 01 FF FC
    let out = assemble_one("A: ADD R1, R1, 1\nB: BNE R1, R0, A\n");
    assert!(out.diagnostics.is_empty());
    assert!(out.hex.to_uppercase().contains("311400012101FFFC"));
}

#[test]
fn boundary_immediate_exactly_32767_is_a_form_and_32768_is_a_range_error() {
    let ok = assemble_one("ADD R1, R2, 32767\n");
    assert!(ok.diagnostics.is_empty());

    let bad = assemble_one("ADD R1, R2, 32768\n");
    assert!(!bad.diagnostics.is_empty());
}

#[test]
fn boundary_immediate_exactly_negative_32768_is_a_form_and_one_less_is_a_range_error() {
    let ok = assemble_one("ADD R1, R2, -32768\n");
    assert!(ok.diagnostics.is_empty());

    let bad = assemble_one("ADD R1, R2, -32769\n");
    assert!(!bad.diagnostics.is_empty());
}

#[test]
fn li_special_cases_by_immediate_value() {
    let zero = assemble_one("LI R2, 0\n");
    assert!(zero.diagnostics.is_empty());
    assert!(zero.hex.to_uppercase().contains("82FF"));

    let one = assemble_one("LI R2, 1\n");
    assert!(one.diagnostics.is_empty());
    assert!(one.hex.to_uppercase().contains("02F8"));

    let small = assemble_one("LI R2, 2\n");
    assert!(small.diagnostics.is_empty());
    assert!(small.hex.to_uppercase().contains("32F90002"));

    let large = assemble_one("LI R1, $100000\n");
    assert!(large.diagnostics.is_empty());
    assert!(large.hex.to_uppercase().contains("00100000"));
}

#[test]
fn org_and_equ_only_source_emits_just_the_terminator() {
    let out = assemble_one(".ORG $10\nX: .EQU 1\n");
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.hex, ":00000001FF\n");
}

#[test]
fn running_twice_is_byte_identical() {
    let text = "LOOP: ADD R1, R1, 1\nBNE R1, R0, LOOP\nNOP\n";
    let a = assemble_one(text);
    let b = assemble_one(text);
    assert_eq!(a.hex, b.hex);
}

#[test]
fn multiple_files_assemble_in_command_line_order() {
    let a = Source {
        name: "a.asm",
        text: "NOP\n",
    };
    let b = Source {
        name: "b.asm",
        text: "NOP\n",
    };
    let out = assemble(&[a, b], &AssembleOptions::default()).unwrap();
    assert!(out.diagnostics.is_empty());
    // two NOPs, contiguous, fold into a single 4-byte record.
    assert!(out.hex.to_uppercase().starts_with(":040000000FF10FF1"));
}

#[test]
fn unused_label_report_names_only_unreferenced_labels() {
    let text = "USED: NOP\nLOOP: BRA USED\n";
    let opts = AssembleOptions {
        unused: true,
        ..AssembleOptions::default()
    };
    let out = assemble(&[Source { name: "t.asm", text }], &opts).unwrap();
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.unused_labels, vec!["LOOP".to_owned()]);
}

#[test]
fn listing_is_only_produced_when_requested() {
    let opts = AssembleOptions {
        listing: true,
        ..AssembleOptions::default()
    };
    let out = assemble(
        &[Source {
            name: "t.asm",
            text: "NOP\n",
        }],
        &opts,
    )
    .unwrap();
    assert!(out.listing.is_some());
    assert!(out.listing.unwrap().contains("NOP"));

    let out2 = assemble(
        &[Source {
            name: "t.asm",
            text: "NOP\n",
        }],
        &AssembleOptions::default(),
    )
    .unwrap();
    assert!(out2.listing.is_none());
}
