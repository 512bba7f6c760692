mod common;

use common::{assemble, assemble_proc, lines, mnemonics};
use tal_asm::assemble_source;
use tal_isa::Opcode;
use tal_unit::CompileUnit;

const PUSH1: u8 = Opcode::PUSH1.raw();

#[test]
fn push_switches_to_four_byte_index() {
    let mut unit = CompileUnit::new();
    for i in 0..256 {
        unit.register_literal(&format!("l{i}"));
    }
    assemble_source(&mut unit, "push l255\npop\npush new").unwrap();
    assert_eq!(
        unit.code(),
        &[PUSH1, 255, Opcode::POP.raw(), Opcode::PUSH4.raw(), 0, 0, 1, 0]
    );
}

#[test]
fn local_slots_pick_their_width() {
    let locals: Vec<String> = (0..301).map(|i| format!("v{i}")).collect();
    let names: Vec<&str> = locals.iter().map(String::as_str).collect();

    let unit = assemble_proc(&names, "load v0").unwrap();
    assert_eq!(unit.code(), &[Opcode::LOAD_SCALAR1.raw(), 0]);

    let unit = assemble_proc(&names, "load v300").unwrap();
    assert_eq!(unit.code(), &[Opcode::LOAD_SCALAR4.raw(), 0, 0, 1, 44]);
}

#[test]
fn new_locals_are_created_on_demand() {
    let unit = assemble_proc(&["a"], "push 1\nstore b").unwrap();
    assert_eq!(unit.code(), &[PUSH1, 0, Opcode::STORE_SCALAR1.raw(), 1]);
    assert_eq!(unit.locals().map(|t| t.len()), Some(2));
}

#[test]
fn invoke_count_picks_its_width() {
    let unit = assemble("push a; push b; invokeStk 2").unwrap();
    assert_eq!(unit.code(), &[PUSH1, 0, PUSH1, 1, Opcode::INVOKE_STK1.raw(), 2]);

    let mut commands = vec!["push x"; 300];
    commands.push("invokeStk 300");
    let unit = assemble(&lines(&commands)).unwrap();
    assert_eq!(&unit.code()[600..], &[Opcode::INVOKE_STK4.raw(), 0, 0, 1, 44]);
    assert_eq!(unit.max_stack_depth, 300);
}

#[test]
fn immediates() {
    let unit = assemble_proc(&["v"], "incrImm v -3").unwrap();
    assert_eq!(unit.code(), &[Opcode::INCR_SCALAR1_IMM.raw(), 0, 0xfd]);

    let unit = assemble("push {a b c}; listIndexImm end-1").unwrap();
    assert_eq!(
        unit.code(),
        &[PUSH1, 0, Opcode::LIST_INDEX_IMM.raw(), 0xff, 0xff, 0xff, 0xfd]
    );

    let unit = assemble("clockRead 2").unwrap();
    assert_eq!(unit.code(), &[Opcode::CLOCK_READ.raw(), 2]);

    let unit = assemble("push 5; strclass digit").unwrap();
    assert_eq!(unit.code(), &[PUSH1, 0, Opcode::STR_CLASS.raw(), 4]);

    let unit = assemble("push a; push b; concat 2").unwrap();
    assert_eq!(unit.code(), &[PUSH1, 0, PUSH1, 1, Opcode::STR_CONCAT1.raw(), 2]);
}

#[test]
fn regexp_flags() {
    let unit = assemble("push a; push b; regexp 0").unwrap();
    assert_eq!(unit.code()[4..], [Opcode::REGEXP.raw(), 3]);
    let unit = assemble("push a; push b; regexp yes").unwrap();
    assert_eq!(unit.code()[4..], [Opcode::REGEXP.raw(), 11]);
}

#[test]
fn two_operand_forms() {
    let unit = assemble_proc(&["d"], "push k; push v; dictSet 1 d").unwrap();
    assert_eq!(
        unit.code()[4..],
        [Opcode::DICT_SET.raw(), 0, 0, 0, 1, 0, 0, 0, 0]
    );

    let unit = assemble_proc(&["v"], "unset 1 v; push x").unwrap();
    assert_eq!(
        unit.code(),
        &[Opcode::UNSET_SCALAR.raw(), 1, 0, 0, 0, 0, PUSH1, 0]
    );

    let unit = assemble("push a; push b; over 1; pop; pop").unwrap();
    assert_eq!(
        mnemonics(&unit),
        ["push1", "push1", "over", "pop", "pop"]
    );
}

#[test]
fn embedded_code_is_deferred_without_a_compiler() {
    let unit = assemble("eval {push 1}").unwrap();
    assert_eq!(unit.code(), &[PUSH1, 0, Opcode::EVAL_STK.raw()]);
    assert_eq!(unit.literals().get(0), Some("push 1"));

    let unit = assemble("expr {1 + 2}").unwrap();
    assert_eq!(unit.code(), &[PUSH1, 0, Opcode::EXPR_STK.raw()]);
}

#[test]
fn comments_and_separators() {
    let text = "# setup\npush a ;# trailing\n\npush b; add\n";
    let unit = assemble(text).unwrap();
    assert_eq!(mnemonics(&unit), ["push1", "push1", "add"]);
}

#[test]
fn labels_sharing_an_offset() {
    let unit = assemble("push 1\njumpTrue B\nlabel A\nlabel B\npush x").unwrap();
    assert_eq!(
        unit.code(),
        &[PUSH1, 0, Opcode::JUMP_TRUE1.raw(), 2, PUSH1, 1]
    );

    let unit = assemble("push 1\njumpTrue A\nlabel A\nlabel B\npush x").unwrap();
    assert_eq!(
        unit.code(),
        &[PUSH1, 0, Opcode::JUMP_TRUE1.raw(), 2, PUSH1, 1]
    );
}
