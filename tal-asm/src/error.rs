use std::fmt;

use thiserror::Error;

/// Numeric constraint an operand failed to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    OneByte,
    SignedByte,
    NonNegative,
    Positive,
    AtLeastTwo,
    ClockSelector,
}

impl Constraint {
    fn tag(self) -> &'static str {
        match self {
            Self::OneByte | Self::SignedByte => "1BYTE",
            Self::NonNegative => "NONNEGATIVE",
            Self::Positive => "POSITIVE",
            Self::AtLeastTwo => "OPERAND>=2",
            Self::ClockSelector => "CLOCK",
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneByte | Self::SignedByte => "operand does not fit in one byte",
            Self::NonNegative => "operand must be nonnegative",
            Self::Positive => "operand must be positive",
            Self::AtLeastTwo => "operand must be >=2",
            Self::ClockSelector => "operand must be [0..3]",
        })
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("bad instruction \"{0}\"")]
    UnknownInstruction(String),

    #[error("wrong # args: should be \"{0}\"")]
    WrongArgs(String),

    #[error("assembly code may not contain substitutions")]
    Substitution,

    #[error("expected integer but got \"{0}\"")]
    NotAnInteger(String),

    #[error("expected boolean value but got \"{0}\"")]
    NotABoolean(String),

    #[error("{0}")]
    OutOfRange(Constraint),

    #[error("bad index \"{0}\": must be integer?[+-]integer? or end?[+-]integer?")]
    BadIndex(String),

    #[error("bad class \"{0}\": must be {classes}", classes = crate::operand::CHAR_CLASSES.join(", "))]
    BadCharClass(String),

    #[error("cannot use this instruction to create a variable in a non-proc context")]
    NotInProcedure,

    #[error("variable \"{0}\" is not local")]
    BadVarName(String),

    #[error("duplicate definition of label \"{0}\"")]
    DuplicateLabel(String),

    #[error("undefined label \"{0}\"")]
    UndefinedLabel(String),

    #[error("jump table must have an even number of list elements")]
    OddJumpTable,

    #[error("duplicate entry in jump table for \"{0}\"")]
    DuplicateJumpTableEntry(String),

    #[error("{0}")]
    BadList(String),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("inconsistent stack depths on two execution paths")]
    InconsistentStack,

    #[error("code pops stack below level of enclosing catch")]
    PopBelowCatch,

    #[error("stack is unbalanced on exit from the code (depth={0})")]
    UnbalancedExit(i64),

    #[error("stack depth exceeds {}", i32::MAX)]
    StackTooDeep,

    #[error("execution reaches an instruction in inconsistent exception contexts")]
    InconsistentCatch,

    #[error("endCatch without a corresponding beginCatch")]
    EndCatchWithoutBegin,

    #[error("catch still active on exit from assembly code")]
    UnclosedCatch,

    #[error(
        "\"{0}\" instruction may not appear in a context where an exception has been caught and not disposed of."
    )]
    ThrowAfterCatch(&'static str),

    #[error("error in embedded code: {0}")]
    Embedded(String),

    #[error("{0}")]
    Syntax(&'static str),

    #[error("out of memory growing {0}")]
    Resource(&'static str),

    #[error("assembly was abandoned after an earlier error")]
    Aborted,
}

impl ErrorKind {
    /// Stable machine-readable tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::UnknownInstruction(_) => "BADINST",
            Self::WrongArgs(_) => "WRONGARGS",
            Self::Substitution => "NOSUBST",
            Self::NotAnInteger(_) => "BADINT",
            Self::NotABoolean(_) => "BADBOOL",
            Self::OutOfRange(c) => c.tag(),
            Self::BadIndex(_) => "BADINDEX",
            Self::BadCharClass(_) => "BADCLASS",
            Self::NotInProcedure => "LVT",
            Self::BadVarName(_) => "BADVARNAME",
            Self::DuplicateLabel(_) => "DUPLABEL",
            Self::UndefinedLabel(_) => "NOLABEL",
            Self::OddJumpTable => "BADJUMPTABLE",
            Self::DuplicateJumpTableEntry(_) => "DUPJUMPTABLEENTRY",
            Self::BadList(_) => "BADLIST",
            Self::StackUnderflow
            | Self::InconsistentStack
            | Self::UnbalancedExit(_)
            | Self::StackTooDeep => "BADSTACK",
            Self::PopBelowCatch => "BADSTACKINCATCH",
            Self::InconsistentCatch => "BADCATCH",
            Self::EndCatchWithoutBegin => "BADENDCATCH",
            Self::UnclosedCatch => "UNCLOSEDCATCH",
            Self::ThrowAfterCatch(_) => "BADTHROW",
            Self::Embedded(_) => "EMBEDDED",
            Self::Syntax(_) => "PARSE",
            Self::Resource(_) => "RESOURCE",
            Self::Aborted => "ABORTED",
        }
    }
}

impl From<tal_unit::Error> for ErrorKind {
    fn from(err: tal_unit::Error) -> Self {
        match err {
            tal_unit::Error::NotInProcedure(_) => Self::NotInProcedure,
            tal_unit::Error::OutOfMemory(what) => Self::Resource(what),
            other => Self::Embedded(other.to_string()),
        }
    }
}

/// An assembly failure with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    /// 1-based source line of the offending command, when known.
    pub line: Option<u32>,
    pub kind: ErrorKind,
    /// Line span of the basic block a flow error was detected in.
    pub context: Option<(u32, u32)>,
}

impl AssembleError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            line: None,
            kind,
            context: None,
        }
    }

    pub fn at(line: u32, kind: ErrorKind) -> Self {
        Self {
            line: Some(line),
            kind,
            context: None,
        }
    }

    pub fn in_block(kind: ErrorKind, first_line: u32, last_line: u32) -> Self {
        Self {
            line: Some(first_line),
            kind,
            context: Some((first_line, last_line)),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match (self.context, self.line) {
            (Some((first, last)), _) => {
                write!(f, "\n    (in assembly code between lines {first} and {last})")
            }
            (None, Some(line)) => write!(f, "\n    (assembly line {line})"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<ErrorKind> for AssembleError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

pub type Result<T> = std::result::Result<T, AssembleError>;
