mod common;

use common::{assemble, assemble_proc, lines};
use tal_asm::assemble_source;
use tal_isa::Opcode;
use tal_unit::CompileUnit;

#[test]
fn straight_line_code() {
    let unit = assemble("push a; push b; add").unwrap();
    assert_eq!(
        unit.code(),
        &[Opcode::PUSH1.raw(), 0, Opcode::PUSH1.raw(), 1, Opcode::ADD.raw()]
    );
    assert_eq!(unit.max_stack_depth, 2);
    assert_eq!(unit.current_stack_depth, 1);
}

#[test]
fn variadic_instructions_track_their_counts() {
    let unit = assemble("push a; push b; push c; list 3").unwrap();
    assert_eq!(unit.max_stack_depth, 3);

    let unit = assemble("push d; push k1; push k2; push def; dictGetDef 2").unwrap();
    assert_eq!(unit.max_stack_depth, 4);

    let unit = assemble("push a; push b; over 1; pop; pop").unwrap();
    assert_eq!(unit.max_stack_depth, 3);

    let unit = assemble("push a; push b; reverse 2; pop").unwrap();
    assert_eq!(unit.max_stack_depth, 2);

    let unit = assemble_proc(&["d"], "push k; push v; dictSet 1 d").unwrap();
    assert_eq!(unit.max_stack_depth, 2);
}

#[test]
fn paths_that_agree_are_accepted() {
    let text = lines(&[
        "push a",
        "jumpTrue L1",
        "push b",
        "jump L2",
        "label L1",
        "push c",
        "label L2",
    ]);
    let unit = assemble(&text).unwrap();
    assert_eq!(unit.max_stack_depth, 1);
}

#[test]
fn loops_reach_a_fixed_depth() {
    let unit = assemble("label top\npush 1\njumpTrue top\npush done").unwrap();
    assert_eq!(unit.max_stack_depth, 1);
}

#[test]
fn empty_result_is_pushed() {
    let unit = assemble("").unwrap();
    assert_eq!(unit.code(), &[Opcode::PUSH1.raw(), 0]);
    assert_eq!(unit.literals().get(0), Some(""));
    assert_eq!(unit.max_stack_depth, 1);

    let unit = assemble("push a; pop").unwrap();
    assert_eq!(unit.code().len(), 5);
    assert_eq!(unit.literals().get(1), Some(""));
}

#[test]
fn unreachable_end_is_left_alone() {
    let unit = assemble("label top\njump top").unwrap();
    assert_eq!(unit.code(), &[Opcode::JUMP1.raw(), 0]);
    assert_eq!(unit.current_stack_depth, 0);
}

#[test]
fn depth_adds_to_enclosing_code() {
    let mut unit = CompileUnit::new();
    unit.current_stack_depth = 2;
    unit.max_stack_depth = 3;
    assemble_source(&mut unit, "push a; push b; push c; list 3").unwrap();
    assert_eq!(unit.max_stack_depth, 5);
    assert_eq!(unit.current_stack_depth, 3);
}

#[test]
fn unreachable_code_is_not_checked() {
    let unit = assemble("push a\njump end\npop\npop\nlabel end").unwrap();
    assert_eq!(unit.max_stack_depth, 1);
}
