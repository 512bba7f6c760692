use std::fmt;

bitflags::bitflags! {
    /// Static properties of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpcodeFlags: u8 {
        /// Transfers control to a relative offset.
        const JUMP = 1 << 0;
        /// Jump taken only when the popped value tests true/false.
        const CONDITIONAL = 1 << 1;
        /// Never raises an exception, under any circumstances.
        const NO_THROW = 1 << 2;
        /// Opens an exception range (operand is the range index).
        const BEGIN_CATCH = 1 << 3;
        /// Operand refers to an auxiliary data record.
        const AUX = 1 << 4;
    }
}

/// Kind of a single encoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// Signed one-byte integer.
    Int1,
    /// Signed four-byte integer.
    Int4,
    /// Unsigned one-byte integer.
    Uint1,
    /// Unsigned four-byte integer.
    Uint4,
    /// Encoded list index (`end`-relative values are negative).
    Idx4,
    /// One-byte local variable slot.
    Lvt1,
    /// Four-byte local variable slot.
    Lvt4,
    /// Four-byte auxiliary data index.
    Aux4,
    /// Signed one-byte jump offset, relative to the instruction start.
    Offset1,
    /// Signed four-byte jump offset, relative to the instruction start.
    Offset4,
    /// One-byte literal pool index.
    Lit1,
    /// Four-byte literal pool index.
    Lit4,
    /// One-byte character class selector.
    Scls1,
}

impl OperandKind {
    /// Encoded width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Int1 | Self::Uint1 | Self::Lvt1 | Self::Offset1 | Self::Lit1 | Self::Scls1 => 1,
            Self::Int4
            | Self::Uint4
            | Self::Idx4
            | Self::Lvt4
            | Self::Aux4
            | Self::Offset4
            | Self::Lit4 => 4,
        }
    }

    /// Whether the operand is read as a signed value.
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int1 | Self::Int4 | Self::Idx4 | Self::Offset1 | Self::Offset4
        )
    }
}

/// A raw interpreter opcode.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Opcode(pub u8);

impl Opcode {
    /// The raw byte value.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Static metadata for this opcode, if it is known to the interpreter.
    pub fn info(self) -> Option<&'static OpcodeInfo> {
        lookup(self.0)
    }

    /// Mnemonic of the opcode, or `"<unknown>"`.
    pub fn mnemonic(self) -> &'static str {
        self.info().map_or("<unknown>", |info| info.mnemonic)
    }

    /// Whether executing the opcode can raise an exception.
    ///
    /// Unknown opcodes are conservatively treated as throwing.
    pub fn can_throw(self) -> bool {
        self.info()
            .is_none_or(|info| !info.flags.contains(OpcodeFlags::NO_THROW))
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({}={})", self.0, self.mnemonic())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Static metadata describing one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    opcode: Opcode,
    mnemonic: &'static str,
    operands: &'static [OperandKind],
    flags: OpcodeFlags,
}

impl OpcodeInfo {
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub const fn mnemonic(&self) -> &'static str {
        self.mnemonic
    }

    pub const fn operands(&self) -> &'static [OperandKind] {
        self.operands
    }

    pub const fn flags(&self) -> OpcodeFlags {
        self.flags
    }

    /// Total encoded size in bytes, opcode included.
    pub fn size(&self) -> usize {
        1 + self.operands.iter().map(|k| k.width()).sum::<usize>()
    }

    pub fn is_jump(&self) -> bool {
        self.flags.contains(OpcodeFlags::JUMP)
    }
}

macro_rules! opcodes {
    ($( $konst:ident = $code:literal, $name:literal, [$($kind:ident),*] $(, $flag:ident)* ;)*) => {
        impl Opcode {
            $( pub const $konst: Opcode = Opcode($code); )*
        }

        static OPCODE_TABLE: &[OpcodeInfo] = &[
            $(
                OpcodeInfo {
                    opcode: Opcode($code),
                    mnemonic: $name,
                    operands: &[$(OperandKind::$kind),*],
                    flags: OpcodeFlags::empty()$(.union(OpcodeFlags::$flag))*,
                },
            )*
        ];
    };
}

// Numbering, operand widths and the NO_THROW set are shared with the
// interpreter and must not be reordered.
opcodes! {
    DONE = 0, "done", [];
    PUSH1 = 1, "push1", [Lit1], NO_THROW;
    PUSH4 = 2, "push4", [Lit4], NO_THROW;
    POP = 3, "pop", [], NO_THROW;
    DUP = 4, "dup", [], NO_THROW;
    STR_CONCAT1 = 5, "strcat", [Uint1];
    INVOKE_STK1 = 6, "invokeStk1", [Uint1];
    INVOKE_STK4 = 7, "invokeStk4", [Uint4];
    EVAL_STK = 8, "evalStk", [];
    EXPR_STK = 9, "exprStk", [];
    LOAD_SCALAR1 = 10, "loadScalar1", [Lvt1];
    LOAD_SCALAR4 = 11, "loadScalar4", [Lvt4];
    LOAD_SCALAR_STK = 12, "loadScalarStk", [];
    LOAD_ARRAY1 = 13, "loadArray1", [Lvt1];
    LOAD_ARRAY4 = 14, "loadArray4", [Lvt4];
    LOAD_ARRAY_STK = 15, "loadArrayStk", [];
    LOAD_STK = 16, "loadStk", [];
    STORE_SCALAR1 = 17, "storeScalar1", [Lvt1];
    STORE_SCALAR4 = 18, "storeScalar4", [Lvt4];
    STORE_SCALAR_STK = 19, "storeScalarStk", [];
    STORE_ARRAY1 = 20, "storeArray1", [Lvt1];
    STORE_ARRAY4 = 21, "storeArray4", [Lvt4];
    STORE_ARRAY_STK = 22, "storeArrayStk", [];
    STORE_STK = 23, "storeStk", [];
    INCR_SCALAR1 = 24, "incrScalar1", [Lvt1];
    INCR_SCALAR_STK = 25, "incrScalarStk", [];
    INCR_ARRAY1 = 26, "incrArray1", [Lvt1];
    INCR_ARRAY_STK = 27, "incrArrayStk", [];
    INCR_STK = 28, "incrStk", [];
    INCR_SCALAR1_IMM = 29, "incrScalar1Imm", [Lvt1, Int1];
    INCR_SCALAR_STK_IMM = 30, "incrScalarStkImm", [Int1];
    INCR_ARRAY1_IMM = 31, "incrArray1Imm", [Lvt1, Int1];
    INCR_ARRAY_STK_IMM = 32, "incrArrayStkImm", [Int1];
    INCR_STK_IMM = 33, "incrStkImm", [Int1];
    JUMP1 = 34, "jump1", [Offset1], JUMP, NO_THROW;
    JUMP4 = 35, "jump4", [Offset4], JUMP, NO_THROW;
    JUMP_TRUE1 = 36, "jumpTrue1", [Offset1], JUMP, CONDITIONAL;
    JUMP_TRUE4 = 37, "jumpTrue4", [Offset4], JUMP, CONDITIONAL;
    JUMP_FALSE1 = 38, "jumpFalse1", [Offset1], JUMP, CONDITIONAL;
    JUMP_FALSE4 = 39, "jumpFalse4", [Offset4], JUMP, CONDITIONAL;
    LOR = 40, "lor", [];
    LAND = 41, "land", [];
    BITOR = 42, "bitor", [];
    BITXOR = 43, "bitxor", [];
    BITAND = 44, "bitand", [];
    EQ = 45, "eq", [];
    NEQ = 46, "neq", [];
    LT = 47, "lt", [];
    GT = 48, "gt", [];
    LE = 49, "le", [];
    GE = 50, "ge", [];
    LSHIFT = 51, "lshift", [];
    RSHIFT = 52, "rshift", [];
    ADD = 53, "add", [];
    SUB = 54, "sub", [];
    MULT = 55, "mult", [];
    DIV = 56, "div", [];
    MOD = 57, "mod", [];
    UPLUS = 58, "uplus", [];
    UMINUS = 59, "uminus", [];
    BITNOT = 60, "bitnot", [];
    LNOT = 61, "not", [];
    CALL_BUILTIN_FUNC1 = 62, "callBuiltinFunc1", [Uint1];
    CALL_FUNC1 = 63, "callFunc1", [Uint1];
    TRY_CVT_TO_NUMERIC = 64, "tryCvtToNumeric", [];
    BREAK = 65, "break", [];
    CONTINUE = 66, "continue", [];
    FOREACH_START4 = 67, "foreach_start4", [Aux4], AUX;
    FOREACH_STEP4 = 68, "foreach_step4", [Aux4], AUX;
    BEGIN_CATCH4 = 69, "beginCatch4", [Uint4], BEGIN_CATCH;
    END_CATCH = 70, "endCatch", [], NO_THROW;
    PUSH_RESULT = 71, "pushResult", [], NO_THROW;
    PUSH_RETURN_CODE = 72, "pushReturnCode", [], NO_THROW;
    STR_EQ = 73, "streq", [], NO_THROW;
    STR_NEQ = 74, "strneq", [], NO_THROW;
    STR_CMP = 75, "strcmp", [], NO_THROW;
    STR_LEN = 76, "strlen", [], NO_THROW;
    STR_INDEX = 77, "strindex", [];
    STR_MATCH = 78, "strmatch", [Int1];
    LIST = 79, "list", [Uint4], NO_THROW;
    LIST_INDEX = 80, "listIndex", [];
    LIST_LENGTH = 81, "listLength", [];
    APPEND_SCALAR1 = 82, "appendScalar1", [Lvt1];
    APPEND_SCALAR4 = 83, "appendScalar4", [Lvt4];
    APPEND_ARRAY1 = 84, "appendArray1", [Lvt1];
    APPEND_ARRAY4 = 85, "appendArray4", [Lvt4];
    APPEND_ARRAY_STK = 86, "appendArrayStk", [];
    APPEND_STK = 87, "appendStk", [];
    LAPPEND_SCALAR1 = 88, "lappendScalar1", [Lvt1];
    LAPPEND_SCALAR4 = 89, "lappendScalar4", [Lvt4];
    LAPPEND_ARRAY1 = 90, "lappendArray1", [Lvt1];
    LAPPEND_ARRAY4 = 91, "lappendArray4", [Lvt4];
    LAPPEND_ARRAY_STK = 92, "lappendArrayStk", [];
    LAPPEND_STK = 93, "lappendStk", [];
    LIST_INDEX_MULTI = 94, "lindexMulti", [Uint4];
    OVER = 95, "over", [Uint4], NO_THROW;
    LSET_LIST = 96, "lsetList", [];
    LSET_FLAT = 97, "lsetFlat", [Uint4];
    RETURN_IMM = 98, "returnImm", [Int4, Uint4];
    EXPON = 99, "expon", [];
    EXPAND_START = 100, "expandStart", [];
    EXPAND_STKTOP = 101, "expandStkTop", [Uint4];
    INVOKE_EXPANDED = 102, "invokeExpanded", [];
    LIST_INDEX_IMM = 103, "listIndexImm", [Idx4];
    LIST_RANGE_IMM = 104, "listRangeImm", [Idx4, Idx4];
    START_CMD = 105, "startCommand", [Offset4, Uint4];
    LIST_IN = 106, "listIn", [];
    LIST_NOT_IN = 107, "listNotIn", [];
    PUSH_RETURN_OPTIONS = 108, "pushReturnOpts", [], NO_THROW;
    RETURN_STK = 109, "returnStk", [];
    DICT_GET = 110, "dictGet", [Uint4];
    DICT_SET = 111, "dictSet", [Uint4, Lvt4];
    DICT_UNSET = 112, "dictUnset", [Uint4, Lvt4];
    DICT_INCR_IMM = 113, "dictIncrImm", [Int4, Lvt4];
    DICT_APPEND = 114, "dictAppend", [Lvt4];
    DICT_LAPPEND = 115, "dictLappend", [Lvt4];
    DICT_FIRST = 116, "dictFirst", [Lvt4];
    DICT_NEXT = 117, "dictNext", [Lvt4];
    DICT_DONE = 118, "dictDone", [Lvt4];
    DICT_UPDATE_START = 119, "dictUpdateStart", [Lvt4, Aux4], AUX;
    DICT_UPDATE_END = 120, "dictUpdateEnd", [Lvt4, Aux4], AUX;
    JUMP_TABLE = 121, "jumpTable", [Aux4], AUX;
    UPVAR = 122, "upvar", [Lvt4];
    NSUPVAR = 123, "nsupvar", [Lvt4];
    VARIABLE = 124, "variable", [Lvt4];
    SYNTAX = 125, "syntax", [Int4, Uint4];
    REVERSE = 126, "reverse", [Uint4], NO_THROW;
    REGEXP = 127, "regexp", [Int1];
    EXIST_SCALAR = 128, "existScalar", [Lvt4];
    EXIST_ARRAY = 129, "existArray", [Lvt4];
    EXIST_ARRAY_STK = 130, "existArrayStk", [];
    EXIST_STK = 131, "existStk", [];
    NOP = 132, "nop", [], NO_THROW;
    RETURN_CODE_BRANCH = 133, "returnCodeBranch", [];
    UNSET_SCALAR = 134, "unsetScalar", [Uint1, Lvt4];
    UNSET_ARRAY = 135, "unsetArray", [Uint1, Lvt4];
    UNSET_ARRAY_STK = 136, "unsetArrayStk", [Uint1];
    UNSET_STK = 137, "unsetStk", [Uint1];
    DICT_EXPAND = 138, "dictExpand", [];
    DICT_RECOMBINE_STK = 139, "dictRecombineStk", [];
    DICT_RECOMBINE_IMM = 140, "dictRecombineImm", [Lvt4];
    DICT_EXISTS = 141, "dictExists", [Uint4];
    DICT_VERIFY = 142, "verifyDict", [];
    STR_MAP = 143, "strmap", [], NO_THROW;
    STR_FIND = 144, "strfind", [], NO_THROW;
    STR_FIND_LAST = 145, "strrfind", [];
    STR_RANGE_IMM = 146, "strrangeImm", [Idx4, Idx4];
    STR_RANGE = 147, "strrange", [];
    YIELD = 148, "yield", [];
    COROUTINE_NAME = 149, "coroName", [], NO_THROW;
    TAILCALL = 150, "tailcall", [Uint1];
    NS_CURRENT = 151, "currentNamespace", [], NO_THROW;
    INFO_LEVEL_NUM = 152, "infoLevelNumber", [], NO_THROW;
    INFO_LEVEL_ARGS = 153, "infoLevelArgs", [];
    RESOLVE_COMMAND = 154, "resolveCmd", [], NO_THROW;
    TCLOO_SELF = 155, "tclooSelf", [];
    TCLOO_CLASS = 156, "tclooClass", [];
    TCLOO_NS = 157, "tclooNamespace", [];
    TCLOO_IS_OBJECT = 158, "tclooIsObject", [];
    ARRAY_EXISTS_STK = 159, "arrayExistsStk", [];
    ARRAY_EXISTS_IMM = 160, "arrayExistsImm", [Lvt4];
    ARRAY_MAKE_STK = 161, "arrayMakeStk", [];
    ARRAY_MAKE_IMM = 162, "arrayMakeImm", [Lvt4];
    INVOKE_REPLACE = 163, "invokeReplace", [Uint4, Uint1];
    LIST_CONCAT = 164, "listConcat", [];
    EXPAND_DROP = 165, "expandDrop", [];
    FOREACH_START = 166, "foreach_start", [Aux4], AUX;
    FOREACH_STEP = 167, "foreach_step", [];
    FOREACH_END = 168, "foreach_end", [];
    LMAP_COLLECT = 169, "lmap_collect", [];
    STR_TRIM = 170, "strtrim", [], NO_THROW;
    STR_TRIM_LEFT = 171, "strtrimLeft", [], NO_THROW;
    STR_TRIM_RIGHT = 172, "strtrimRight", [], NO_THROW;
    CONCAT_STK = 173, "concatStk", [Uint4], NO_THROW;
    STR_UPPER = 174, "strcaseUpper", [], NO_THROW;
    STR_LOWER = 175, "strcaseLower", [], NO_THROW;
    STR_TITLE = 176, "strcaseTitle", [], NO_THROW;
    STR_REPLACE = 177, "strreplace", [];
    ORIGIN_COMMAND = 178, "originCmd", [];
    TCLOO_NEXT = 179, "tclooNext", [Uint1];
    TCLOO_NEXT_CLASS = 180, "tclooNextClass", [Uint1];
    YIELD_TO_INVOKE = 181, "yieldToInvoke", [];
    NUM_TYPE = 182, "numericType", [], NO_THROW;
    TRY_CVT_TO_BOOLEAN = 183, "tryCvtToBoolean", [];
    STR_CLASS = 184, "strclass", [Scls1];
    LAPPEND_LIST = 185, "lappendList", [Lvt4];
    LAPPEND_LIST_ARRAY = 186, "lappendListArray", [Lvt4];
    LAPPEND_LIST_ARRAY_STK = 187, "lappendListArrayStk", [];
    LAPPEND_LIST_STK = 188, "lappendListStk", [];
    CLOCK_READ = 189, "clockRead", [Uint1];
    DICT_GET_DEF = 190, "dictGetDef", [Uint4];
}

/// Opcodes that can never raise, in ascending order.
///
/// These are the only opcodes allowed in code that runs after an exception
/// was caught but before its range was popped with `endCatch`.
pub const NON_THROWING: &[Opcode] = &[
    Opcode::PUSH1,
    Opcode::PUSH4,
    Opcode::POP,
    Opcode::DUP,
    Opcode::JUMP1,
    Opcode::JUMP4,
    Opcode::END_CATCH,
    Opcode::PUSH_RESULT,
    Opcode::PUSH_RETURN_CODE,
    Opcode::STR_EQ,
    Opcode::STR_NEQ,
    Opcode::STR_CMP,
    Opcode::STR_LEN,
    Opcode::LIST,
    Opcode::OVER,
    Opcode::PUSH_RETURN_OPTIONS,
    Opcode::REVERSE,
    Opcode::NOP,
    Opcode::STR_MAP,
    Opcode::STR_FIND,
    Opcode::COROUTINE_NAME,
    Opcode::NS_CURRENT,
    Opcode::INFO_LEVEL_NUM,
    Opcode::RESOLVE_COMMAND,
    Opcode::STR_TRIM,
    Opcode::STR_TRIM_LEFT,
    Opcode::STR_TRIM_RIGHT,
    Opcode::CONCAT_STK,
    Opcode::STR_UPPER,
    Opcode::STR_LOWER,
    Opcode::STR_TITLE,
    Opcode::NUM_TYPE,
];

/// Look up static metadata by raw opcode byte.
pub fn lookup(raw: u8) -> Option<&'static OpcodeInfo> {
    OPCODE_TABLE.get(raw as usize)
}

/// Every opcode known to the interpreter, ordered by numeric value.
pub fn opcode_table() -> &'static [OpcodeInfo] {
    OPCODE_TABLE
}

/// Number of opcodes known to the interpreter.
pub fn opcode_count() -> usize {
    OPCODE_TABLE.len()
}
