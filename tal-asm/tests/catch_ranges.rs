mod common;

use common::{assemble, lines};
use tal_isa::Opcode;
use tal_isa::encoding::read_uint4;
use tal_unit::{CompileUnit, ExceptionRange};

fn range(nesting: u32, start: usize, len: usize, handler: usize) -> ExceptionRange {
    let mut r = ExceptionRange::catch(nesting, start, handler);
    r.num_code_bytes = len;
    r
}

#[test]
fn single_catch_round_trip() {
    let text = lines(&[
        "beginCatch L1",
        "push a",
        "endCatch",
        "jump L2",
        "label L1",
        "pushReturnCode",
        "endCatch",
        "label L2",
    ]);
    let unit = assemble(&text).unwrap();

    assert_eq!(
        unit.code(),
        &[
            Opcode::BEGIN_CATCH4.raw(), 0, 0, 0, 0,
            Opcode::PUSH1.raw(), 0,
            Opcode::END_CATCH.raw(),
            Opcode::JUMP1.raw(), 4,
            Opcode::PUSH_RETURN_CODE.raw(),
            Opcode::END_CATCH.raw(),
        ]
    );
    assert_eq!(unit.exception_ranges(), &[range(0, 5, 3, 10)]);
    assert_eq!(unit.max_except_depth, 1);
    assert_eq!(unit.max_stack_depth, 1);
}

#[test]
fn nested_catches_and_protected_handlers() {
    let text = lines(&[
        "beginCatch H1",
        "beginCatch H2",
        "push a",
        "pop",
        "endCatch",
        "endCatch",
        "push ok",
        "jump Done",
        "label H2",
        "pushReturnCode",
        "pop",
        "endCatch",
        "endCatch",
        "push h2",
        "jump Done",
        "label H1",
        "pushReturnCode",
        "pop",
        "endCatch",
        "push h1",
        "label Done",
    ]);
    let unit = assemble(&text).unwrap();

    // The inner handler still runs under the outer catch.
    assert_eq!(
        unit.exception_ranges(),
        &[range(0, 5, 10, 27), range(1, 10, 4, 19), range(0, 19, 4, 27)]
    );
    assert_eq!(unit.max_except_depth, 2);

    let code = unit.code();
    assert_eq!(read_uint4(code, 1), 0);
    assert_eq!(read_uint4(code, 6), 1);
    assert_eq!(code.len(), 32);
}

#[test]
fn ranges_honour_outer_exception_depth() {
    let mut unit = CompileUnit::new();
    unit.except_depth = 2;
    let text = lines(&[
        "beginCatch H",
        "push a",
        "endCatch",
        "jump Done",
        "label H",
        "pushReturnCode",
        "endCatch",
        "label Done",
    ]);
    tal_asm::assemble_source(&mut unit, &text).unwrap();

    assert_eq!(unit.exception_ranges()[0].nesting_level, 2);
    assert_eq!(unit.max_except_depth, 3);
}

#[test]
fn ranges_are_appended_after_existing_code() {
    let mut unit = CompileUnit::new();
    unit.code_mut().extend([Opcode::NOP.raw(); 3]);
    unit.add_exception_range(ExceptionRange::catch(0, 0, 1));
    let text = lines(&[
        "beginCatch H",
        "push a",
        "endCatch",
        "jump Done",
        "label H",
        "pushReturnCode",
        "endCatch",
        "label Done",
    ]);
    tal_asm::assemble_source(&mut unit, &text).unwrap();

    assert_eq!(unit.exception_ranges().len(), 2);
    assert_eq!(unit.exception_ranges()[1], range(0, 8, 3, 13));
    assert_eq!(read_uint4(unit.code(), 4), 1);
}

#[test]
fn handler_may_leave_through_a_jump() {
    let text = lines(&[
        "beginCatch H",
        "push a",
        "endCatch",
        "jump Done",
        "label H",
        "pushResult",
        "endCatch",
        "jump Done",
        "label Done",
    ]);
    let unit = assemble(&text).unwrap();
    assert_eq!(unit.exception_ranges().len(), 1);
    assert_eq!(unit.exception_ranges()[0].catch_offset, Some(10));
}
