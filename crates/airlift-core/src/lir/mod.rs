//! Data model for the low-level input IR (LIR).
//!
//! LIR is a typed, three-address SSA form: functions hold basic blocks,
//! blocks hold instructions and a terminator, and values reference
//! instruction results, parameters, constants, globals or functions. The
//! importer only ever reads this model.

pub mod debug;
pub mod layout;
pub mod ty;

pub use debug::{DiEncoding, DiType, RecordKind, VariableRecord};
pub use layout::DataLayout;
pub use ty::LirType;

pub type FunId = u32;
pub type GlobalId = u32;
pub type BlockId = u32;
pub type InstId = u32;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
    pub data_layout: DataLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    /// Always a `LirType::Function`.
    pub ty: LirType,
    pub param_names: Vec<Option<String>>,
    /// Empty for declarations. Block ids are indices into this vector; the
    /// entry block is block 0.
    pub blocks: Vec<Block>,
    pub intrinsic: Option<Intrinsic>,
    /// Whether debug info attaches a subprogram to this function.
    pub has_subprogram: bool,
    pub debug_records: Vec<VariableRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    /// Type of the initialized value; a reference to the global has type
    /// pointer-to-`ty`.
    pub ty: LirType,
    pub has_debug_info: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: Option<String>,
    pub insts: Vec<Instruction>,
    pub terminator: Terminator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Unique within the enclosing function (shared id space with invoke
    /// terminators, which also produce a value).
    pub id: InstId,
    /// Result type; `Void` for instructions without a result.
    pub ty: LirType,
    pub kind: InstKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    Alloca {
        allocated_ty: LirType,
        array_size: Value,
        align: u32,
    },
    Load {
        ptr: Value,
        align: u32,
        volatile: bool,
    },
    Store {
        ptr: Value,
        value: Value,
        align: u32,
        volatile: bool,
    },
    Call(CallInst),
    Cast {
        op: CastOp,
        operand: Value,
    },
    Gep {
        base: Value,
        indices: Vec<Value>,
    },
    Binary {
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        nsw: bool,
        nuw: bool,
        exact: bool,
    },
    Cmp {
        pred: CmpPred,
        lhs: Value,
        rhs: Value,
    },
    Phi {
        incoming: Vec<(Value, BlockId)>,
    },
    ExtractValue {
        aggregate: Value,
        indices: Vec<u32>,
    },
    InsertValue {
        aggregate: Value,
        element: Value,
        indices: Vec<u32>,
    },
    LandingPad {
        cleanup: bool,
    },
    Select {
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallInst {
    pub callee: Value,
    pub args: Vec<Value>,
    /// Per-argument alignment attributes; empty when none are attached
    /// (memory intrinsics carry them).
    pub param_aligns: Vec<u32>,
}

impl CallInst {
    pub fn new(callee: Value, args: Vec<Value>) -> Self {
        Self {
            callee,
            args,
            param_aligns: Vec::new(),
        }
    }

    pub fn param_align(&self, index: usize) -> u32 {
        self.param_aligns.get(index).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
}

impl CastOp {
    pub fn name(self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FPTrunc => "fptrunc",
            CastOp::FPExt => "fpext",
            CastOp::FPToUI => "fptoui",
            CastOp::FPToSI => "fptosi",
            CastOp::UIToFP => "uitofp",
            CastOp::SIToFP => "sitofp",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::BitCast => "bitcast",
            CastOp::AddrSpaceCast => "addrspacecast",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    pub fn is_float(self) -> bool {
        matches!(
            self,
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::URem => "urem",
            BinaryOp::SRem => "srem",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
        }
    }
}

/// Comparison predicates, integer and float families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPred {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
    Foeq,
    Fogt,
    Foge,
    Folt,
    Fole,
    Fone,
    Ford,
    Funo,
    Fueq,
    Fugt,
    Fuge,
    Fult,
    Fule,
    Fune,
    Ffalse,
    Ftrue,
}

impl CmpPred {
    pub fn is_int_predicate(self) -> bool {
        matches!(
            self,
            CmpPred::Eq
                | CmpPred::Ne
                | CmpPred::Ugt
                | CmpPred::Uge
                | CmpPred::Ult
                | CmpPred::Ule
                | CmpPred::Sgt
                | CmpPred::Sge
                | CmpPred::Slt
                | CmpPred::Sle
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            CmpPred::Sgt | CmpPred::Sge | CmpPred::Slt | CmpPred::Sle
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            CmpPred::Ugt | CmpPred::Uge | CmpPred::Ult | CmpPred::Ule
        )
    }

    pub fn is_float_predicate(self) -> bool {
        !self.is_int_predicate()
    }

    pub fn name(self) -> &'static str {
        match self {
            CmpPred::Eq => "eq",
            CmpPred::Ne => "ne",
            CmpPred::Ugt => "ugt",
            CmpPred::Uge => "uge",
            CmpPred::Ult => "ult",
            CmpPred::Ule => "ule",
            CmpPred::Sgt => "sgt",
            CmpPred::Sge => "sge",
            CmpPred::Slt => "slt",
            CmpPred::Sle => "sle",
            CmpPred::Foeq => "oeq",
            CmpPred::Fogt => "ogt",
            CmpPred::Foge => "oge",
            CmpPred::Folt => "olt",
            CmpPred::Fole => "ole",
            CmpPred::Fone => "one",
            CmpPred::Ford => "ord",
            CmpPred::Funo => "uno",
            CmpPred::Fueq => "ueq",
            CmpPred::Fugt => "ugt",
            CmpPred::Fuge => "uge",
            CmpPred::Fult => "ult",
            CmpPred::Fule => "ule",
            CmpPred::Fune => "une",
            CmpPred::Ffalse => "false",
            CmpPred::Ftrue => "true",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Ret(Option<Value>),
    Br(BlockId),
    CondBr {
        cond: Value,
        if_true: BlockId,
        if_false: BlockId,
    },
    /// The one value-producing terminator; carries its own instruction id.
    Invoke(InvokeTerm),
    Resume(Value),
    Unreachable,
    Switch {
        value: Value,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeTerm {
    pub id: InstId,
    pub ty: LirType,
    pub call: CallInst,
    pub normal: BlockId,
    pub unwind: BlockId,
}

impl Terminator {
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::Ret(_) | Terminator::Resume(_) | Terminator::Unreachable => Vec::new(),
            Terminator::Br(succ) => vec![*succ],
            Terminator::CondBr {
                if_true, if_false, ..
            } => vec![*if_true, *if_false],
            Terminator::Invoke(invoke) => vec![invoke.normal, invoke.unwind],
            Terminator::Switch { default, cases, .. } => {
                let mut succs = vec![*default];
                succs.extend(cases.iter().map(|(_, bb)| *bb));
                succs
            }
        }
    }
}

/// Known intrinsic functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intrinsic {
    DbgDeclare,
    DbgAddr,
    DbgValue,
    LifetimeStart,
    LifetimeEnd,
    Assume,
    MemCpy,
    MemMove,
    MemSet,
    VaStart,
    VaEnd,
    VaCopy,
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Inst(InstId),
    Param(u32),
    Constant(Constant),
    Global(GlobalId),
    Function(FunId),
    InlineAsm { asm: String, ty: LirType },
}

impl Value {
    pub fn int(value: i64, ty: LirType) -> Value {
        Value::Constant(Constant::Int(value, ty))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Constant(_))
    }

    /// Key identifying a value that maps to an AIR variable.
    pub fn key(&self) -> Option<ValueKey> {
        match self {
            Value::Inst(id) => Some(ValueKey::Inst(*id)),
            Value::Param(index) => Some(ValueKey::Param(*index)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64, LirType),
    Float(f64, LirType),
    Null(LirType),
    Undef(LirType),
}

impl Constant {
    pub fn ty(&self) -> &LirType {
        match self {
            Constant::Int(_, ty)
            | Constant::Float(_, ty)
            | Constant::Null(ty)
            | Constant::Undef(ty) => ty,
        }
    }
}

/// Identifies an SSA value that the importer records a variable for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Inst(InstId),
    Param(u32),
}

impl Module {
    pub fn function(&self, id: FunId) -> &Function {
        &self.functions[id as usize]
    }

    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id as usize]
    }

    /// Resolve the LIR type of a value in the context of a function.
    pub fn value_ty(&self, fun: &Function, value: &Value) -> Option<LirType> {
        match value {
            Value::Inst(id) => fun.result_ty(*id).cloned(),
            Value::Param(index) => fun.param_types().get(*index as usize).cloned(),
            Value::Constant(cst) => Some(cst.ty().clone()),
            Value::Global(id) => Some(LirType::pointer_to(self.global(*id).ty.clone())),
            Value::Function(id) => Some(LirType::pointer_to(self.function(*id).ty.clone())),
            Value::InlineAsm { ty, .. } => Some(ty.clone()),
        }
    }
}

impl Function {
    pub fn new(name: impl Into<String>, ty: LirType) -> Self {
        let param_count = match &ty {
            LirType::Function { param_types, .. } => param_types.len(),
            _ => 0,
        };
        Self {
            name: name.into(),
            ty,
            param_names: vec![None; param_count],
            blocks: Vec::new(),
            intrinsic: None,
            has_subprogram: false,
            debug_records: Vec::new(),
        }
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id as usize]
    }

    pub fn entry_block(&self) -> BlockId {
        0
    }

    pub fn param_types(&self) -> &[LirType] {
        match &self.ty {
            LirType::Function { param_types, .. } => param_types,
            _ => &[],
        }
    }

    pub fn return_ty(&self) -> &LirType {
        static VOID: LirType = LirType::Void;
        match &self.ty {
            LirType::Function { return_type, .. } => return_type,
            _ => &VOID,
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(
            &self.ty,
            LirType::Function {
                is_variadic: true,
                ..
            }
        )
    }

    /// Result type of an instruction or invoke terminator.
    pub fn result_ty(&self, id: InstId) -> Option<&LirType> {
        for block in &self.blocks {
            for inst in &block.insts {
                if inst.id == id {
                    return Some(&inst.ty);
                }
            }
            if let Terminator::Invoke(invoke) = &block.terminator {
                if invoke.id == id {
                    return Some(&invoke.ty);
                }
            }
        }
        None
    }

    /// Predecessors of a block, in block definition order.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        let mut preds = Vec::new();
        for (index, block) in self.blocks.iter().enumerate() {
            if block.terminator.successors().contains(&id) {
                preds.push(index as BlockId);
            }
        }
        preds
    }
}

impl Block {
    pub fn new(insts: Vec<Instruction>, terminator: Terminator) -> Self {
        Self {
            name: None,
            insts,
            terminator,
        }
    }
}

impl Instruction {
    pub fn new(id: InstId, ty: LirType, kind: InstKind) -> Self {
        Self { id, ty, kind }
    }
}
