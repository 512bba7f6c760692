//! The table of assembler mnemonics.

use tal_isa::Opcode;

/// How an instruction's operands are written and encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// No operands.
    None,
    /// `push value`: literal index, push1 or push4.
    Push,
    /// One boolean, encoded in a byte.
    Bool,
    /// Boolean and a local variable (always 4-byte slot).
    BoolLvt4,
    /// Clock selector 0..=3.
    Clock,
    /// One-byte positive count.
    Concat1,
    /// Four-byte nonnegative count.
    List,
    /// Four-byte positive count.
    LindexMulti,
    /// Four-byte count of at least two.
    LsetFlat,
    /// Four-byte nonnegative count, `count + 1` consumed.
    Over,
    /// Four-byte nonnegative count.
    Reverse,
    /// Positive count, `count + 1` consumed.
    DictGet,
    /// Positive count, `count + 2` consumed.
    DictGetDef,
    /// Positive count and a local, `count + 1` consumed.
    DictSet,
    /// Positive count and a local, `count` consumed.
    DictUnset,
    /// Positive count; invokeStk1 when it fits a byte.
    Invoke,
    /// List index encoded as a four-byte integer.
    Index,
    /// Local variable; narrow or wide by slot.
    Lvt,
    /// Local variable whose slot must fit one byte.
    Lvt1,
    /// One-byte local and signed one-byte immediate.
    Lvt1Sint1,
    /// Local variable, always a 4-byte slot.
    Lvt4,
    /// Signed one-byte immediate.
    Sint1,
    /// Signed four-byte immediate and a 4-byte local.
    Sint4Lvt4,
    /// Jump to a label, relaxed from one-byte to four-byte offsets.
    Jump,
    /// Jump to a label with a four-byte offset.
    Jump4,
    /// `jumpTable {key label ...}`.
    JumpTable,
    /// `beginCatch handlerLabel`.
    BeginCatch,
    EndCatch,
    Label,
    /// Embedded script or expression.
    Eval,
    /// Boolean selecting case-insensitive matching.
    Regexp,
    /// Character class name.
    StrClass,
}

impl Shape {
    /// Operand synopsis used in "wrong # args" messages.
    pub fn synopsis(self) -> &'static str {
        match self {
            Self::None | Self::EndCatch => "",
            Self::Push => "value",
            Self::Bool | Self::Regexp => "boolean",
            Self::BoolLvt4 => "boolean varName",
            Self::Clock | Self::Concat1 | Self::Sint1 => "imm8",
            Self::List
            | Self::LindexMulti
            | Self::LsetFlat
            | Self::Over
            | Self::Reverse
            | Self::DictGet
            | Self::DictGetDef
            | Self::Invoke => "count",
            Self::DictSet | Self::DictUnset => "count varName",
            Self::Index => "index",
            Self::Lvt | Self::Lvt1 | Self::Lvt4 => "varName",
            Self::Lvt1Sint1 => "varName imm8",
            Self::Sint4Lvt4 => "imm32 varName",
            Self::Jump | Self::Jump4 | Self::BeginCatch => "label",
            Self::JumpTable => "table",
            Self::Label => "name",
            Self::Eval => "script",
            Self::StrClass => "className",
        }
    }

    /// Number of operand words the shape takes.
    pub fn arity(self) -> usize {
        match self {
            Self::None | Self::EndCatch => 0,
            Self::BoolLvt4 | Self::DictSet | Self::DictUnset | Self::Lvt1Sint1 | Self::Sint4Lvt4 => {
                2
            }
            _ => 1,
        }
    }

    /// Whether the shape picks between a narrow opcode and the wide one after it.
    pub fn has_wide_form(self) -> bool {
        matches!(self, Self::Push | Self::Invoke | Self::Lvt | Self::Jump)
    }
}

/// Declared operand consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    Fixed(i32),
    /// Taken from the instruction's count operand.
    Variadic,
}

/// One assembler mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub name: &'static str,
    pub shape: Shape,
    /// The opcode emitted; the narrow one when the shape has a wide form.
    pub opcode: Opcode,
    pub consumed: Consumed,
    /// Values pushed. A negative `p` means the net effect over the variadic
    /// count is `-1 - p`.
    pub produced: i32,
}

impl Descriptor {
    /// The wide encoding, which always directly follows the narrow opcode.
    pub fn wide_opcode(&self) -> Opcode {
        Opcode(self.opcode.raw() + 1)
    }

    /// Values consumed and produced for an instruction with the given count.
    pub fn stack_effect(&self, count: i64) -> (i64, i64) {
        let consumed = match self.consumed {
            Consumed::Fixed(n) => i64::from(n),
            Consumed::Variadic => count,
        };
        let produced = if self.produced < 0 {
            consumed - i64::from(self.produced) - 1
        } else {
            i64::from(self.produced)
        };
        (consumed, produced)
    }

    /// `mnemonic operands...` for error messages.
    pub fn usage(&self) -> String {
        match self.shape.synopsis() {
            "" => self.name.to_owned(),
            synopsis => format!("{} {synopsis}", self.name),
        }
    }
}

const VAR: Consumed = Consumed::Variadic;

macro_rules! descriptors {
    ($( $name:literal => $shape:ident, $op:ident, $consumed:expr, $produced:expr; )*) => {
        static DESCRIPTORS: &[Descriptor] = &[
            $(
                Descriptor {
                    name: $name,
                    shape: Shape::$shape,
                    opcode: Opcode::$op,
                    consumed: $consumed,
                    produced: $produced,
                },
            )*
        ];
    };
}

const fn n(count: i32) -> Consumed {
    Consumed::Fixed(count)
}

// Sorted by mnemonic for binary search. `label` never emits its opcode.
descriptors! {
    "add" => None, ADD, n(2), 1;
    "append" => Lvt, APPEND_SCALAR1, n(1), 1;
    "appendArray" => Lvt, APPEND_ARRAY1, n(2), 1;
    "appendArrayStk" => None, APPEND_ARRAY_STK, n(3), 1;
    "appendStk" => None, APPEND_STK, n(2), 1;
    "arrayExistsImm" => Lvt4, ARRAY_EXISTS_IMM, n(0), 1;
    "arrayExistsStk" => None, ARRAY_EXISTS_STK, n(1), 1;
    "arrayMakeImm" => Lvt4, ARRAY_MAKE_IMM, n(0), 0;
    "arrayMakeStk" => None, ARRAY_MAKE_STK, n(1), 0;
    "beginCatch" => BeginCatch, BEGIN_CATCH4, n(0), 0;
    "bitand" => None, BITAND, n(2), 1;
    "bitnot" => None, BITNOT, n(1), 1;
    "bitor" => None, BITOR, n(2), 1;
    "bitxor" => None, BITXOR, n(2), 1;
    "clockRead" => Clock, CLOCK_READ, n(0), 1;
    "concat" => Concat1, STR_CONCAT1, VAR, 1;
    "concatStk" => List, CONCAT_STK, VAR, 1;
    "coroName" => None, COROUTINE_NAME, n(0), 1;
    "currentNamespace" => None, NS_CURRENT, n(0), 1;
    "dictAppend" => Lvt4, DICT_APPEND, n(2), 1;
    "dictExists" => DictGet, DICT_EXISTS, VAR, 1;
    "dictExpand" => None, DICT_EXPAND, n(3), 1;
    "dictGet" => DictGet, DICT_GET, VAR, 1;
    "dictGetDef" => DictGetDef, DICT_GET_DEF, VAR, 1;
    "dictIncrImm" => Sint4Lvt4, DICT_INCR_IMM, n(1), 1;
    "dictLappend" => Lvt4, DICT_LAPPEND, n(2), 1;
    "dictRecombineImm" => Lvt4, DICT_RECOMBINE_IMM, n(2), 0;
    "dictRecombineStk" => None, DICT_RECOMBINE_STK, n(3), 0;
    "dictSet" => DictSet, DICT_SET, VAR, 1;
    "dictUnset" => DictUnset, DICT_UNSET, VAR, 1;
    "div" => None, DIV, n(2), 1;
    "dup" => None, DUP, n(1), 2;
    "endCatch" => EndCatch, END_CATCH, n(0), 0;
    "eq" => None, EQ, n(2), 1;
    "eval" => Eval, EVAL_STK, n(1), 1;
    "evalStk" => None, EVAL_STK, n(1), 1;
    "exist" => Lvt4, EXIST_SCALAR, n(0), 1;
    "existArray" => Lvt4, EXIST_ARRAY, n(1), 1;
    "existArrayStk" => None, EXIST_ARRAY_STK, n(2), 1;
    "existStk" => None, EXIST_STK, n(1), 1;
    "expon" => None, EXPON, n(2), 1;
    "expr" => Eval, EXPR_STK, n(1), 1;
    "exprStk" => None, EXPR_STK, n(1), 1;
    "ge" => None, GE, n(2), 1;
    "gt" => None, GT, n(2), 1;
    "incr" => Lvt1, INCR_SCALAR1, n(1), 1;
    "incrArray" => Lvt1, INCR_ARRAY1, n(2), 1;
    "incrArrayImm" => Lvt1Sint1, INCR_ARRAY1_IMM, n(1), 1;
    "incrArrayStk" => None, INCR_ARRAY_STK, n(3), 1;
    "incrArrayStkImm" => Sint1, INCR_ARRAY_STK_IMM, n(2), 1;
    "incrImm" => Lvt1Sint1, INCR_SCALAR1_IMM, n(0), 1;
    "incrStk" => None, INCR_STK, n(2), 1;
    "incrStkImm" => Sint1, INCR_STK_IMM, n(1), 1;
    "infoLevelArgs" => None, INFO_LEVEL_ARGS, n(1), 1;
    "infoLevelNumber" => None, INFO_LEVEL_NUM, n(0), 1;
    "invokeStk" => Invoke, INVOKE_STK1, VAR, 1;
    "jump" => Jump, JUMP1, n(0), 0;
    "jump4" => Jump4, JUMP4, n(0), 0;
    "jumpFalse" => Jump, JUMP_FALSE1, n(1), 0;
    "jumpFalse4" => Jump4, JUMP_FALSE4, n(1), 0;
    "jumpTable" => JumpTable, JUMP_TABLE, n(1), 0;
    "jumpTrue" => Jump, JUMP_TRUE1, n(1), 0;
    "jumpTrue4" => Jump4, JUMP_TRUE4, n(1), 0;
    "label" => Label, DONE, n(0), 0;
    "land" => None, LAND, n(2), 1;
    "lappend" => Lvt, LAPPEND_SCALAR1, n(1), 1;
    "lappendArray" => Lvt, LAPPEND_ARRAY1, n(2), 1;
    "lappendArrayStk" => None, LAPPEND_ARRAY_STK, n(3), 1;
    "lappendList" => Lvt4, LAPPEND_LIST, n(1), 1;
    "lappendListArray" => Lvt4, LAPPEND_LIST_ARRAY, n(2), 1;
    "lappendListArrayStk" => None, LAPPEND_LIST_ARRAY_STK, n(3), 1;
    "lappendListStk" => None, LAPPEND_LIST_STK, n(2), 1;
    "lappendStk" => None, LAPPEND_STK, n(2), 1;
    "le" => None, LE, n(2), 1;
    "lindexMulti" => LindexMulti, LIST_INDEX_MULTI, VAR, 1;
    "list" => List, LIST, VAR, 1;
    "listConcat" => None, LIST_CONCAT, n(2), 1;
    "listIn" => None, LIST_IN, n(2), 1;
    "listIndex" => None, LIST_INDEX, n(2), 1;
    "listIndexImm" => Index, LIST_INDEX_IMM, n(1), 1;
    "listLength" => None, LIST_LENGTH, n(1), 1;
    "listNotIn" => None, LIST_NOT_IN, n(2), 1;
    "load" => Lvt, LOAD_SCALAR1, n(0), 1;
    "loadArray" => Lvt, LOAD_ARRAY1, n(1), 1;
    "loadArrayStk" => None, LOAD_ARRAY_STK, n(2), 1;
    "loadStk" => None, LOAD_STK, n(1), 1;
    "lor" => None, LOR, n(2), 1;
    "lsetFlat" => LsetFlat, LSET_FLAT, VAR, 1;
    "lsetList" => None, LSET_LIST, n(3), 1;
    "lshift" => None, LSHIFT, n(2), 1;
    "lt" => None, LT, n(2), 1;
    "mod" => None, MOD, n(2), 1;
    "mult" => None, MULT, n(2), 1;
    "neq" => None, NEQ, n(2), 1;
    "nop" => None, NOP, n(0), 0;
    "not" => None, LNOT, n(1), 1;
    "nsupvar" => Lvt4, NSUPVAR, n(2), 1;
    "numericType" => None, NUM_TYPE, n(1), 1;
    "originCmd" => None, ORIGIN_COMMAND, n(1), 1;
    "over" => Over, OVER, VAR, -2;
    "pop" => None, POP, n(1), 0;
    "push" => Push, PUSH1, n(0), 1;
    "pushResult" => None, PUSH_RESULT, n(0), 1;
    "pushReturnCode" => None, PUSH_RETURN_CODE, n(0), 1;
    "pushReturnOpts" => None, PUSH_RETURN_OPTIONS, n(0), 1;
    "regexp" => Regexp, REGEXP, n(2), 1;
    "resolveCmd" => None, RESOLVE_COMMAND, n(1), 1;
    "reverse" => Reverse, REVERSE, VAR, -1;
    "rshift" => None, RSHIFT, n(2), 1;
    "store" => Lvt, STORE_SCALAR1, n(1), 1;
    "storeArray" => Lvt, STORE_ARRAY1, n(2), 1;
    "storeArrayStk" => None, STORE_ARRAY_STK, n(3), 1;
    "storeStk" => None, STORE_STK, n(2), 1;
    "strcaseLower" => None, STR_LOWER, n(1), 1;
    "strcaseTitle" => None, STR_TITLE, n(1), 1;
    "strcaseUpper" => None, STR_UPPER, n(1), 1;
    "strclass" => StrClass, STR_CLASS, n(1), 1;
    "strcmp" => None, STR_CMP, n(2), 1;
    "streq" => None, STR_EQ, n(2), 1;
    "strfind" => None, STR_FIND, n(2), 1;
    "strindex" => None, STR_INDEX, n(2), 1;
    "strlen" => None, STR_LEN, n(1), 1;
    "strmap" => None, STR_MAP, n(3), 1;
    "strmatch" => Bool, STR_MATCH, n(2), 1;
    "strneq" => None, STR_NEQ, n(2), 1;
    "strrange" => None, STR_RANGE, n(3), 1;
    "strreplace" => None, STR_REPLACE, n(4), 1;
    "strrfind" => None, STR_FIND_LAST, n(2), 1;
    "strtrim" => None, STR_TRIM, n(2), 1;
    "strtrimLeft" => None, STR_TRIM_LEFT, n(2), 1;
    "strtrimRight" => None, STR_TRIM_RIGHT, n(2), 1;
    "sub" => None, SUB, n(2), 1;
    "tclooClass" => None, TCLOO_CLASS, n(1), 1;
    "tclooIsObject" => None, TCLOO_IS_OBJECT, n(1), 1;
    "tclooNamespace" => None, TCLOO_NS, n(1), 1;
    "tclooSelf" => None, TCLOO_SELF, n(0), 1;
    "tryCvtToBoolean" => None, TRY_CVT_TO_BOOLEAN, n(1), 2;
    "tryCvtToNumeric" => None, TRY_CVT_TO_NUMERIC, n(1), 1;
    "uminus" => None, UMINUS, n(1), 1;
    "unset" => BoolLvt4, UNSET_SCALAR, n(0), 0;
    "unsetArray" => BoolLvt4, UNSET_ARRAY, n(1), 0;
    "unsetArrayStk" => Bool, UNSET_ARRAY_STK, n(2), 0;
    "unsetStk" => Bool, UNSET_STK, n(1), 0;
    "uplus" => None, UPLUS, n(1), 1;
    "upvar" => Lvt4, UPVAR, n(2), 1;
    "variable" => Lvt4, VARIABLE, n(1), 0;
    "verifyDict" => None, DICT_VERIFY, n(1), 0;
    "yield" => None, YIELD, n(1), 1;
}

/// Find the descriptor for an exact mnemonic.
pub fn find(name: &str) -> Option<&'static Descriptor> {
    DESCRIPTORS
        .binary_search_by(|d| d.name.cmp(name))
        .ok()
        .map(|i| &DESCRIPTORS[i])
}

/// All mnemonics, sorted.
pub fn descriptors() -> &'static [Descriptor] {
    DESCRIPTORS
}
