//! Consistency checks over the whole opcode table.

use tal_isa::{NON_THROWING, Opcode, OpcodeFlags, OperandKind, lookup, opcode_count, opcode_table};

#[test]
fn table_is_dense_and_ordered() {
    for (i, info) in opcode_table().iter().enumerate() {
        assert_eq!(
            info.opcode().raw() as usize,
            i,
            "opcode '{}' is out of place",
            info.mnemonic()
        );
    }
    assert_eq!(opcode_count(), 191);
}

#[test]
fn lookup_roundtrip_for_all_opcodes() {
    for info in opcode_table() {
        let found = lookup(info.opcode().raw()).unwrap();
        assert_eq!(found.mnemonic(), info.mnemonic());
    }
    assert!(lookup(opcode_count() as u8).is_none());
}

#[test]
fn mnemonics_are_unique() {
    let mut names: Vec<_> = opcode_table().iter().map(|i| i.mnemonic()).collect();
    names.sort_unstable();
    let before = names.len();
    names.dedup();
    assert_eq!(before, names.len());
}

#[test]
fn sizes_follow_operand_widths() {
    assert_eq!(Opcode::PUSH1.info().unwrap().size(), 2);
    assert_eq!(Opcode::PUSH4.info().unwrap().size(), 5);
    assert_eq!(Opcode::JUMP1.info().unwrap().size(), 2);
    assert_eq!(Opcode::JUMP4.info().unwrap().size(), 5);
    assert_eq!(Opcode::BEGIN_CATCH4.info().unwrap().size(), 5);
    assert_eq!(Opcode::START_CMD.info().unwrap().size(), 9);
    assert_eq!(Opcode::UNSET_SCALAR.info().unwrap().size(), 6);
    assert_eq!(Opcode::INVOKE_REPLACE.info().unwrap().size(), 6);
    assert_eq!(Opcode::INCR_SCALAR1_IMM.info().unwrap().size(), 3);
}

#[test]
fn wide_jumps_follow_narrow_ones() {
    for narrow in [Opcode::JUMP1, Opcode::JUMP_TRUE1, Opcode::JUMP_FALSE1] {
        let wide = Opcode(narrow.raw() + 1);
        assert_eq!(narrow.info().unwrap().operands(), &[OperandKind::Offset1]);
        assert_eq!(wide.info().unwrap().operands(), &[OperandKind::Offset4]);
        assert!(wide.info().unwrap().is_jump());
    }
}

#[test]
fn non_throwing_list_matches_flags() {
    assert!(NON_THROWING.windows(2).all(|w| w[0] < w[1]));
    for info in opcode_table() {
        let listed = NON_THROWING.contains(&info.opcode());
        assert_eq!(
            listed,
            info.flags().contains(OpcodeFlags::NO_THROW),
            "'{}' disagrees with the non-throwing list",
            info.mnemonic()
        );
    }
}

#[test]
fn can_throw() {
    assert!(!Opcode::PUSH1.can_throw());
    assert!(!Opcode::PUSH_RETURN_CODE.can_throw());
    assert!(!Opcode::END_CATCH.can_throw());
    assert!(Opcode::ADD.can_throw());
    assert!(Opcode::JUMP_TRUE1.can_throw());
    assert!(Opcode(250).can_throw());
}
