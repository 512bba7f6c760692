//! Assembler for the stack bytecode interpreter.
//!
//! Commands are emitted into basic blocks as they arrive. [`Assembler::finish`]
//! then resolves labels, relaxes one-byte jumps that cannot reach their
//! targets, fills in jump offsets and jump tables, derives exception ranges
//! from `beginCatch`/`endCatch`, and verifies that every path agrees on the
//! stack depth.
//!
//! ```text
//! push a
//! jumpTrue L1
//! push b
//! jump L2
//! label L1
//! push c
//! label L2
//! ```

mod assembler;
pub mod block;
mod builder;
mod catch;
pub mod descriptor;
pub mod embed;
pub mod error;
pub mod listing;
pub mod operand;
mod relax;
pub mod source;
mod stack;

pub use assembler::{Assembler, assemble, assemble_source, assemble_source_with};
pub use embed::{EmbeddedKind, NestedAssembly, ScriptCompiler};
pub use error::{AssembleError, Constraint, ErrorKind, Result};
pub use listing::Listing;
pub use source::{CommandLine, Word};
