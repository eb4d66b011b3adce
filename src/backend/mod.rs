//! The code-emission backend: an LLVM-shaped IR with the narrow
//! surface the compiler core needs — module, external declarations,
//! functions of basic blocks, entry allocas, loads/stores, arithmetic
//! and comparisons by primitive type, branches, calls, returns — plus
//! a verifier, a textual printer, and an object writer.
//!
//! The core only talks to `Builder` and `Module`; nothing outside this
//! module depends on how instructions are stored.

pub mod builder;
pub mod object;
pub mod print;
pub mod verify;

/// Backend value types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IrType {
    I1,
    I32,
    F64,
    I8,
    Ptr(Box<IrType>),
}

impl IrType {
    pub fn ptr(inner: IrType) -> IrType {
        IrType::Ptr(Box::new(inner))
    }

    pub fn i8_ptr() -> IrType {
        IrType::ptr(IrType::I8)
    }
}

impl std::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrType::I1 => write!(f, "i1"),
            IrType::I32 => write!(f, "i32"),
            IrType::F64 => write!(f, "double"),
            IrType::I8 => write!(f, "i8"),
            IrType::Ptr(inner) => write!(f, "{}*", inner),
        }
    }
}

/// Handle types. All are plain indices into the owning module or
/// function; they are only meaningful together with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FuncId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrId(pub usize);

/// An SSA value: a constant, a function argument, an instruction
/// result, or a pointer to an interned string constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    I32(i32),
    F64(f64),
    I1(bool),
    Arg(usize),
    Inst(InstId),
    Str(StrId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl ArithOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::SDiv => "sdiv",
            ArithOp::SRem => "srem",
            ArithOp::FAdd => "fadd",
            ArithOp::FSub => "fsub",
            ArithOp::FMul => "fmul",
            ArithOp::FDiv => "fdiv",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            ArithOp::FAdd | ArithOp::FSub | ArithOp::FMul | ArithOp::FDiv
        )
    }
}

/// Signed integer comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntPred {
    Eq,
    Ne,
    Slt,
    Sgt,
    Sle,
    Sge,
}

impl IntPred {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            IntPred::Eq => "eq",
            IntPred::Ne => "ne",
            IntPred::Slt => "slt",
            IntPred::Sgt => "sgt",
            IntPred::Sle => "sle",
            IntPred::Sge => "sge",
        }
    }
}

/// Ordered floating-point comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloatPred {
    Oeq,
    One,
    Olt,
    Ogt,
    Ole,
    Oge,
}

impl FloatPred {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            FloatPred::Oeq => "oeq",
            FloatPred::One => "one",
            FloatPred::Olt => "olt",
            FloatPred::Ogt => "ogt",
            FloatPred::Ole => "ole",
            FloatPred::Oge => "oge",
        }
    }
}

/// Instructions. Value-producing variants carry a base name used for
/// the printed register; the printer uniquifies repeats.
#[derive(Clone, Debug)]
pub enum Inst {
    Alloca {
        name: String,
        ty: IrType,
    },
    Load {
        name: String,
        ty: IrType,
        ptr: Value,
    },
    Store {
        ty: IrType,
        value: Value,
        ptr: Value,
    },
    Arith {
        name: String,
        op: ArithOp,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    /// Integer negate: `sub ty 0, value`.
    Neg {
        name: String,
        ty: IrType,
        value: Value,
    },
    FNeg {
        name: String,
        value: Value,
    },
    Icmp {
        name: String,
        pred: IntPred,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Fcmp {
        name: String,
        pred: FloatPred,
        lhs: Value,
        rhs: Value,
    },
    And {
        name: String,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Or {
        name: String,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Xor {
        name: String,
        ty: IrType,
        lhs: Value,
        rhs: Value,
    },
    Sitofp {
        name: String,
        value: Value,
    },
    Fptosi {
        name: String,
        value: Value,
    },
    Zext {
        name: String,
        from: IrType,
        to: IrType,
        value: Value,
    },
    Uitofp {
        name: String,
        from: IrType,
        value: Value,
    },
    Call {
        /// Result register base name; None for calls whose value is
        /// dropped at the IR level (none currently).
        name: String,
        callee: String,
        ret: IrType,
        /// Fixed parameter types of the callee, for variadic call
        /// signatures.
        sig_params: Vec<IrType>,
        variadic: bool,
        args: Vec<(IrType, Value)>,
    },
    Br {
        target: BlockId,
    },
    CondBr {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    Ret {
        ty: IrType,
        value: Value,
    },
    /// Terminates a block no control flow reaches, e.g. the merge
    /// block of a conditional whose branches both return.
    Unreachable,
}

impl Inst {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. } | Inst::Unreachable
        )
    }

    /// The type of the instruction's result, if it produces one.
    pub fn result_type(&self) -> Option<IrType> {
        match self {
            Inst::Alloca { ty, .. } => Some(IrType::ptr(ty.clone())),
            Inst::Load { ty, .. } => Some(ty.clone()),
            Inst::Arith { ty, .. } => Some(ty.clone()),
            Inst::Neg { ty, .. } => Some(ty.clone()),
            Inst::FNeg { .. } => Some(IrType::F64),
            Inst::Icmp { .. } | Inst::Fcmp { .. } => Some(IrType::I1),
            Inst::And { ty, .. } | Inst::Or { ty, .. } | Inst::Xor { ty, .. } => Some(ty.clone()),
            Inst::Sitofp { .. } | Inst::Uitofp { .. } => Some(IrType::F64),
            Inst::Fptosi { .. } => Some(IrType::I32),
            Inst::Zext { to, .. } => Some(to.clone()),
            Inst::Call { ret, .. } => Some(ret.clone()),
            Inst::Store { .. }
            | Inst::Br { .. }
            | Inst::CondBr { .. }
            | Inst::Ret { .. }
            | Inst::Unreachable => None,
        }
    }
}

/// A basic block: a label and the instructions scheduled into it.
#[derive(Clone, Debug)]
pub struct Block {
    pub label: String,
    pub insts: Vec<InstId>,
}

/// An external function declaration (printf/scanf style).
#[derive(Clone, Debug)]
pub struct ExternDecl {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<IrType>,
    pub variadic: bool,
}

/// A defined function. Instructions live in one arena per function;
/// blocks hold ordered instruction ids.
#[derive(Clone, Debug)]
pub struct FunctionDef {
    pub name: String,
    pub ret: IrType,
    pub params: Vec<(String, IrType)>,
    pub insts: Vec<Inst>,
    pub blocks: Vec<Block>,
}

impl FunctionDef {
    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn is_terminated(&self, id: BlockId) -> bool {
        self.blocks[id.0]
            .insts
            .last()
            .map(|inst| self.insts[inst.0].is_terminator())
            .unwrap_or(false)
    }

    /// The type of a value in this function's context.
    pub fn value_type(&self, value: &Value) -> IrType {
        match value {
            Value::I32(_) => IrType::I32,
            Value::F64(_) => IrType::F64,
            Value::I1(_) => IrType::I1,
            Value::Str(_) => IrType::i8_ptr(),
            Value::Arg(i) => self.params[*i].1.clone(),
            Value::Inst(id) => self.insts[id.0]
                .result_type()
                .unwrap_or(IrType::I32),
        }
    }
}

/// A module: interned string constants, external declarations, and
/// function definitions.
#[derive(Clone, Debug)]
pub struct Module {
    pub name: String,
    pub strings: Vec<String>,
    pub declares: Vec<ExternDecl>,
    pub funcs: Vec<FunctionDef>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            strings: Vec::new(),
            declares: Vec::new(),
            funcs: Vec::new(),
        }
    }

    pub fn declare_external(
        &mut self,
        name: &str,
        ret: IrType,
        params: Vec<IrType>,
        variadic: bool,
    ) {
        self.declares.push(ExternDecl {
            name: name.to_string(),
            ret,
            params,
            variadic,
        });
    }

    /// Intern a string constant, reusing an existing slot for repeats.
    pub fn intern_string(&mut self, text: &str) -> StrId {
        if let Some(index) = self.strings.iter().position(|s| s == text) {
            return StrId(index);
        }
        self.strings.push(text.to_string());
        StrId(self.strings.len() - 1)
    }

    pub fn func(&self, id: FuncId) -> &FunctionDef {
        &self.funcs[id.0]
    }

    /// Drop a failed function definition from the module.
    pub fn remove_function(&mut self, id: FuncId) {
        self.funcs.remove(id.0);
    }
}
