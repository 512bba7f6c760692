mod common;

use common::{assemble, failure, lines};
use tal_asm::{ErrorKind, assemble_source};
use tal_isa::Opcode;
use tal_isa::encoding::{read_int1, read_uint4};
use tal_unit::{AuxData, CompileUnit, JumpTable};

fn dispatch() -> String {
    lines(&[
        "push x",
        "jumpTable {a La b Lb}",
        "push none",
        "jump Done",
        "label La",
        "push A",
        "jump Done",
        "label Lb",
        "push B",
        "label Done",
    ])
}

#[test]
fn entries_are_relative_to_the_jump_table_instruction() {
    let unit = assemble(&dispatch()).unwrap();
    let code = unit.code();

    assert_eq!(code[2], Opcode::JUMP_TABLE.raw());
    assert_eq!(read_uint4(code, 3), 0);
    let table = unit.aux_data()[0].as_jump_table().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("a"), Some(9));
    assert_eq!(table.get("b"), Some(13));

    assert_eq!(read_int1(code, 10), 8);
    assert_eq!(read_int1(code, 14), 4);
    assert_eq!(code.len(), 17);
    assert_eq!(unit.max_stack_depth, 1);
}

#[test]
fn aux_index_follows_existing_records() {
    let mut unit = CompileUnit::new();
    unit.create_aux_data(AuxData::JumpTable(JumpTable::default()));
    assemble_source(&mut unit, &dispatch()).unwrap();

    assert_eq!(unit.aux_data().len(), 2);
    assert_eq!(read_uint4(unit.code(), 3), 1);
    assert!(unit.aux_data()[0].as_jump_table().unwrap().is_empty());
}

#[test]
fn keys_keep_their_list_form() {
    let text = lines(&[
        "push x",
        "jumpTable {{two words} L \"q\" L}",
        "push d",
        "label L",
    ]);
    let err = assemble(&text).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InconsistentStack);

    let text = lines(&[
        "push x",
        "jumpTable {{two words} L \"q\" L}",
        "label L",
        "push d",
    ]);
    let unit = assemble(&text).unwrap();
    let table = unit.aux_data()[0].as_jump_table().unwrap();
    assert_eq!(table.get("two words"), Some(5));
    assert_eq!(table.get("q"), Some(5));
}

#[test]
fn targets_must_agree_on_depth() {
    let text = lines(&[
        "push x",
        "jumpTable {a L}",
        "push extra",
        "label L",
        "push y",
    ]);
    assert_eq!(failure(&text), ErrorKind::InconsistentStack);
}

#[test]
fn bad_list_is_reported() {
    assert!(matches!(failure("push x\njumpTable {a \"b}"), ErrorKind::BadList(_)));
    assert_eq!(failure("push x\njumpTable {a \"b}").tag(), "BADLIST");
}
