//! Data model for the analysis IR (AIR).
//!
//! AIR is a block-and-statement form with explicit signedness on integer
//! operations. Blocks carry no data on edges; joins introduced by PHI nodes
//! become assignments in per-predecessor input blocks. Every node is owned by
//! the enclosing `Code` and referenced by index.

pub mod pretty;
pub mod ty;

pub use ty::{AirType, BinaryOp, FloatSemantics, Predicate, Signedness, UnaryOp};

use crate::lir;

pub type FunId = u32;
pub type GlobalId = u32;
pub type BlockId = u32;
pub type VarId = u32;

/// The AIR-side module: every translated function and global variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bundle {
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalVariable>,
}

impl Bundle {
    pub fn function(&self, id: FunId) -> &Function {
        &self.functions[id as usize]
    }

    pub fn global(&self, id: GlobalId) -> &GlobalVariable {
        &self.globals[id as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariable {
    pub name: String,
    /// Pointer to the initialized value's type.
    pub ty: AirType,
    pub has_debug_info: bool,
    pub frontend: Option<lir::GlobalId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    /// Always an `AirType::Function`.
    pub ty: AirType,
    pub frontend: Option<lir::FunId>,
    /// Body; `None` for declarations.
    pub code: Option<Code>,
}

impl Function {
    pub fn new(name: impl Into<String>, ty: AirType) -> Self {
        Self {
            name: name.into(),
            ty,
            frontend: None,
            code: None,
        }
    }

    pub fn return_type(&self) -> &AirType {
        static VOID: AirType = AirType::Void;
        self.ty.return_type().unwrap_or(&VOID)
    }

    pub fn param_types(&self) -> &[AirType] {
        self.ty.param_types()
    }

    pub fn is_var_arg(&self) -> bool {
        self.ty.is_var_arg()
    }
}

/// A function body: the owning container of variables and basic blocks, with
/// designated entry/exit/unreachable/ehresume slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub vars: Vec<Variable>,
    /// Parameter variables, pre-created from the function type.
    pub params: Vec<VarId>,
    pub blocks: Vec<BasicBlock>,
    pub entry: Option<BlockId>,
    pub exit: Option<BlockId>,
    pub unreachable: Option<BlockId>,
    pub ehresume: Option<BlockId>,
}

impl Code {
    /// Create an empty body, pre-creating one parameter variable per
    /// parameter of the function type.
    pub fn new(fun_ty: &AirType) -> Self {
        let mut code = Self {
            vars: Vec::new(),
            params: Vec::new(),
            blocks: Vec::new(),
            entry: None,
            exit: None,
            unreachable: None,
            ehresume: None,
        };
        for param_ty in fun_ty.param_types() {
            let id = code.new_var(param_ty.clone(), VarKind::Param);
            code.params.push(id);
        }
        code
    }

    fn new_var(&mut self, ty: AirType, kind: VarKind) -> VarId {
        let id = self.vars.len() as VarId;
        self.vars.push(Variable {
            ty,
            kind,
            name: None,
            frontend: None,
        });
        id
    }

    /// SSA result variable.
    pub fn new_internal_var(&mut self, ty: AirType) -> VarId {
        self.new_var(ty, VarKind::Internal)
    }

    /// Stack variable backing an allocation.
    pub fn new_local_var(&mut self, ty: AirType, align: u32) -> VarId {
        self.new_var(ty, VarKind::Local { align })
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id as usize]
    }

    pub fn var_ty(&self, id: VarId) -> &AirType {
        &self.vars[id as usize].ty
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = self.blocks.len() as BlockId;
        self.blocks.push(BasicBlock::default());
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id as usize]
    }

    /// Add a successor edge. Each edge is added exactly once.
    pub fn add_successor(&mut self, from: BlockId, to: BlockId) {
        let block = self.block_mut(from);
        debug_assert!(!block.successors.contains(&to));
        block.successors.push(to);
    }

    pub fn push_stmt(&mut self, block: BlockId, stmt: Statement) {
        self.block_mut(block).stmts.push(stmt);
    }

    /// Resolve the type of an operand in the context of this body.
    pub fn operand_ty(&self, bundle: &Bundle, operand: &Operand) -> AirType {
        match operand {
            Operand::Var(id) => self.var_ty(*id).clone(),
            Operand::Int { ty, .. }
            | Operand::Float { ty, .. }
            | Operand::Null { ty }
            | Operand::Undef { ty }
            | Operand::Asm { ty, .. } => ty.clone(),
            Operand::Global(id) => bundle.global(*id).ty.clone(),
            Operand::FunctionPtr(id) => AirType::pointer_to(bundle.function(*id).ty.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub ty: AirType,
    pub kind: VarKind,
    pub name: Option<String>,
    pub frontend: Option<lir::ValueKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarKind {
    Param,
    Local { align: u32 },
    Internal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicBlock {
    pub name: Option<String>,
    pub stmts: Vec<Statement>,
    /// Edges only; no data is attached to an edge.
    pub successors: Vec<BlockId>,
    pub frontend: Option<lir::BlockId>,
}

impl BasicBlock {
    pub fn last(&self) -> Option<&Statement> {
        self.stmts.last()
    }

    pub fn pop(&mut self) -> Option<Statement> {
        self.stmts.pop()
    }
}

/// A statement, with a provenance back-pointer into LIR for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub frontend: Option<lir::InstId>,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            frontend: None,
        }
    }

    pub fn with_frontend(kind: StatementKind, frontend: lir::InstId) -> Self {
        Self {
            kind,
            frontend: Some(frontend),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Allocate {
        result: VarId,
        allocated_ty: AirType,
        count: Operand,
    },
    Load {
        result: VarId,
        ptr: Operand,
        align: u32,
        volatile: bool,
    },
    Store {
        ptr: Operand,
        value: Operand,
        align: u32,
        volatile: bool,
    },
    MemoryCopy {
        dest: Operand,
        src: Operand,
        len: Operand,
        dest_align: u32,
        src_align: u32,
        volatile: bool,
    },
    MemoryMove {
        dest: Operand,
        src: Operand,
        len: Operand,
        dest_align: u32,
        src_align: u32,
        volatile: bool,
    },
    MemorySet {
        dest: Operand,
        value: Operand,
        len: Operand,
        align: u32,
        volatile: bool,
    },
    VarArgStart {
        operand: Operand,
    },
    VarArgEnd {
        operand: Operand,
    },
    VarArgCopy {
        dest: Operand,
        src: Operand,
    },
    Call {
        result: Option<VarId>,
        callee: Operand,
        args: Vec<Operand>,
    },
    /// A call with two continuations; the destinations are patched right
    /// after the statement is appended, before anything reads them.
    Invoke {
        result: Option<VarId>,
        callee: Operand,
        args: Vec<Operand>,
        normal_dest: BlockId,
        exception_dest: BlockId,
    },
    Unary {
        op: UnaryOp,
        result: VarId,
        operand: Operand,
    },
    Binary {
        op: BinaryOp,
        result: VarId,
        lhs: Operand,
        rhs: Operand,
        no_wrap: bool,
        exact: bool,
    },
    /// An assumption on the current path; produces no value.
    Comparison {
        pred: Predicate,
        lhs: Operand,
        rhs: Operand,
    },
    Assignment {
        result: VarId,
        operand: Operand,
    },
    /// `result = base + sum(stride * index)` over byte strides.
    PointerShift {
        result: VarId,
        base: Operand,
        terms: Vec<(u64, Operand)>,
    },
    ExtractElement {
        result: VarId,
        aggregate: Operand,
        offset: Operand,
    },
    InsertElement {
        result: VarId,
        aggregate: Operand,
        offset: Operand,
        element: Operand,
    },
    ReturnValue {
        operand: Option<Operand>,
    },
    LandingPad {
        result: VarId,
    },
    Resume {
        operand: Operand,
    },
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Var(VarId),
    Int { value: i128, ty: AirType },
    Float { value: f64, ty: AirType },
    Null { ty: AirType },
    Undef { ty: AirType },
    Global(GlobalId),
    FunctionPtr(FunId),
    Asm { asm: String, ty: AirType },
}

impl Operand {
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            Operand::Var(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Operand::Int { value, .. } => Some(*value),
            _ => None,
        }
    }
}
