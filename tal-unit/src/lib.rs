//! The compilation unit the assembler writes into.
//!
//! Holds the code stream, the literal pool, the optional local-variable table
//! of a procedure body, auxiliary data records (jump tables), the exception
//! range table, and the stack/exception depth watermarks the interpreter
//! needs to size its frames.

pub mod auxdata;
pub mod error;
pub mod exception;
pub mod literal;
pub mod local;
mod unit;

pub use auxdata::{AuxData, JumpTable};
pub use error::{Error, Result};
pub use exception::{ExceptionRange, RangeKind};
pub use literal::LiteralPool;
pub use local::LocalTable;
pub use unit::{Checkpoint, CompileUnit};
