mod common;

use common::{assemble, assemble_proc, lines};
use tal_asm::Listing;

#[test]
fn lists_instructions_and_tables() {
    let text = lines(&[
        "push x",
        "jumpTable {a La}",
        "push none",
        "jump Done",
        "label La",
        "push A",
        "label Done",
    ]);
    let unit = assemble(&text).unwrap();
    let listing = Listing::new(&unit).unwrap();
    assert_eq!(listing.instructions().len(), 5);

    let text = listing.to_string();
    assert!(text.starts_with("Code 13 bytes, 3 literals"));
    assert!(text.contains("  (0) push1 0\t# \"x\"\n"));
    assert!(text.contains("  (9) jump1 +4\t# pc 13\n"));
    assert!(text.contains("    0: jump table {\"a\" +9}\n"));
}

#[test]
fn lists_locals_and_ranges() {
    let text = lines(&[
        "beginCatch H",
        "load v",
        "endCatch",
        "jump Done",
        "label H",
        "pushReturnCode",
        "endCatch",
        "label Done",
    ]);
    let unit = assemble_proc(&["v"], &text).unwrap();
    let text = Listing::new(&unit).unwrap().to_string();
    assert!(text.contains("loadScalar1 %v0\t# var \"v\""));
    assert!(text.contains("    0: level 0, pc 5-7, catch 10\n"));
}
