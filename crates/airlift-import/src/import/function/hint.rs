//! Type and signedness inference over signless LIR values.
//!
//! The inferred AIR type of a value comes from, in order: identity debug
//! records on allocas, identity `dbg.value` records, and hints gathered from
//! every use of the value. Hints are scored and summed per candidate type;
//! the highest score wins, with insertion order breaking ties.

use airlift_core::air::{AirType, Signedness};
use airlift_core::error::ImportError;
use airlift_core::lir::{
    self, BinaryOp, CastOp, Constant, InstKind, Terminator, Value, ValueKey,
};
use airlift_core::Result;

use super::{FunctionImporter, InstView, Use, UserRef};

/// A scored type preference gathered from one use site, or no preference at
/// all.
#[derive(Debug, Clone, Default)]
pub(super) struct TypeHint(Option<(AirType, u32)>);

impl TypeHint {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn new(ty: AirType, score: u32) -> Self {
        Self(Some((ty, score)))
    }

    pub fn with_score(mut self, score: u32) -> Self {
        if let Some((_, current)) = &mut self.0 {
            *current = score;
        }
        self
    }

    fn map_type(self, f: impl FnOnce(AirType) -> Option<AirType>) -> Self {
        match self.0 {
            Some((ty, score)) => Self(f(ty).map(|ty| (ty, score))),
            None => Self(None),
        }
    }
}

/// Hint accumulator: scores are summed per type, insertion order is kept so
/// that ties break deterministically.
#[derive(Debug, Default)]
pub(super) struct TypeHints {
    entries: Vec<(AirType, u32)>,
}

impl TypeHints {
    pub fn add(&mut self, hint: TypeHint) {
        let Some((ty, score)) = hint.0 else {
            return;
        };
        match self.entries.iter_mut().find(|(entry, _)| *entry == ty) {
            Some((_, total)) => *total += score,
            None => self.entries.push((ty, score)),
        }
    }

    pub fn best(self) -> Option<AirType> {
        let mut best: Option<(AirType, u32)> = None;
        for (ty, score) in self.entries {
            match &best {
                Some((_, best_score)) if score <= *best_score => {}
                _ => best = Some((ty, score)),
            }
        }
        best.map(|(ty, _)| ty)
    }
}

/// Map `nsw`/`nuw` flags to a signedness. Untagged operations are unsigned:
/// in the source model, overflow is only well-defined on unsigned
/// arithmetic. Both flags at once only come from aggressive optimization
/// passes; the original attribute is lost, signed is the fixed choice.
pub(super) fn sign_from_wraps(nsw: bool, nuw: bool) -> Signedness {
    if nuw && !nsw {
        Signedness::Unsigned
    } else if nsw {
        Signedness::Signed
    } else {
        Signedness::Unsigned
    }
}

impl<'a, 'm> FunctionImporter<'a, 'm> {
    /// Infer the AIR type of the value produced by instruction `id`.
    pub(super) fn infer_type(&self, id: lir::InstId) -> Result<AirType> {
        let types = self.ctx.type_importer();
        let key = ValueKey::Inst(id);
        let lenient = self.ctx.options.allow_debug_info_mismatch;

        // dbg.declare / dbg.addr on allocas
        if let InstView::Inst(inst) = self.inst_view(id) {
            if let InstKind::Alloca {
                allocated_ty,
                array_size,
                ..
            } = &inst.kind
            {
                if let Some(record) = self.lir_fun.find_dbg_addr(key) {
                    let is_array =
                        !matches!(array_size, Value::Constant(Constant::Int(1, _)));
                    if !is_array
                        && (!lenient || types.match_di_type(&record.di_type, allocated_ty))
                    {
                        let pointee = types.translate_di_type(&record.di_type, allocated_ty);
                        return Ok(AirType::pointer_to(pointee));
                    }
                    if is_array && (!lenient || types.match_di_type(&record.di_type, &inst.ty)) {
                        return Ok(types.translate_di_type(&record.di_type, &inst.ty));
                    }
                }
            }
        }

        // dbg.value
        if let Some(record) = self.lir_fun.find_dbg_value(key) {
            let value_ty = self.result_ty(id);
            if !lenient {
                return Ok(types.translate_di_type(&record.di_type, &value_ty));
            }
            if types.match_di_type(&record.di_type, &value_ty) {
                return Ok(types.translate_di_type(&record.di_type, &value_ty));
            }
            if let InstView::Inst(inst) = self.inst_view(id) {
                if let InstKind::Alloca { allocated_ty, .. } = &inst.kind {
                    if types.match_di_type(&record.di_type, allocated_ty) {
                        let pointee = types.translate_di_type(&record.di_type, allocated_ty);
                        return Ok(AirType::pointer_to(pointee));
                    }
                }
            }
            tracing::debug!(
                function = %self.lir_fun.name,
                inst = id,
                "mismatching dbg.value record demoted"
            );
        }

        let mut hints = TypeHints::default();
        for use_ in self.uses.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
            hints.add(self.infer_type_hint_use(use_)?);
        }

        match hints.best() {
            Some(ty) => Ok(ty),
            None => self.infer_default_type(id),
        }
    }

    /// No hints: translate the LIR type with a signed preference, except for
    /// direct calls (callee return type wins) and casts whose opcode fixes
    /// the sign.
    fn infer_default_type(&self, id: lir::InstId) -> Result<AirType> {
        let mut preferred = Signedness::Signed;

        if let InstView::Inst(inst) = self.inst_view(id) {
            match &inst.kind {
                InstKind::Call(call) => {
                    if let Value::Function(callee) = &call.callee {
                        if let Some(air_id) = self.ctx.translate_function(*callee) {
                            return Ok(self.ctx.bundle.function(air_id).return_type().clone());
                        }
                    }
                }
                InstKind::Cast { op, .. } => {
                    preferred = if matches!(op, CastOp::ZExt | CastOp::FPToUI) {
                        Signedness::Unsigned
                    } else {
                        Signedness::Signed
                    };
                }
                _ => {}
            }
        }

        Ok(self
            .ctx
            .type_importer()
            .translate_type(&self.result_ty(id), preferred))
    }

    fn infer_type_hint_use(&self, use_: &Use) -> Result<TypeHint> {
        match use_.user {
            UserRef::Inst(id) => {
                let InstView::Inst(inst) = self.inst_view(id) else {
                    unreachable!("invoke users are recorded as terminators");
                };
                self.infer_type_hint_inst(inst, use_.operand_no)
            }
            UserRef::Term(bb) => {
                self.infer_type_hint_term(&self.lir_fun.block(bb).terminator, use_.operand_no)
            }
        }
    }

    fn infer_type_hint_inst(
        &self,
        inst: &lir::Instruction,
        operand_no: usize,
    ) -> Result<TypeHint> {
        let types = self.ctx.type_importer();

        match &inst.kind {
            // The allocation count has to be unsigned.
            InstKind::Alloca { array_size, .. } => {
                let ty = types.translate_type(&self.value_ty(array_size)?, Signedness::Unsigned);
                Ok(TypeHint::new(ty, 5))
            }
            InstKind::Store { value, ptr, .. } => {
                if operand_no == 0 {
                    // Stored value: pointee of the pointer operand's hint.
                    Ok(self
                        .infer_type_hint_operand(ptr)?
                        .map_type(|ty| ty.pointee().cloned()))
                } else {
                    // Pointer operand: pointer to the stored value's hint.
                    Ok(self
                        .infer_type_hint_operand(value)?
                        .map_type(|ty| Some(AirType::pointer_to(ty))))
                }
            }
            InstKind::Load { .. } => Ok(self
                .infer_type_hint_operand(&Value::Inst(inst.id))?
                .map_type(|ty| Some(AirType::pointer_to(ty)))),
            InstKind::Call(call) => self.infer_type_hint_call(call, operand_no),
            InstKind::Cast { op, operand } => {
                let sign = match op {
                    CastOp::ZExt | CastOp::UIToFP | CastOp::IntToPtr => Signedness::Unsigned,
                    CastOp::SExt | CastOp::SIToFP => Signedness::Signed,
                    CastOp::Trunc
                    | CastOp::FPTrunc
                    | CastOp::FPExt
                    | CastOp::FPToUI
                    | CastOp::FPToSI
                    | CastOp::PtrToInt
                    | CastOp::BitCast => return Ok(TypeHint::none()),
                    CastOp::AddrSpaceCast => {
                        return Err(ImportError::UnsupportedCast("addrspacecast"))
                    }
                };
                let ty = types.translate_type(&self.value_ty(operand)?, sign);
                Ok(TypeHint::new(ty, 5))
            }
            // The base can point at anything and the indices can be integers
            // of any signedness and width.
            InstKind::Gep { .. } => Ok(TypeHint::none()),
            InstKind::Binary {
                op,
                lhs,
                rhs,
                nsw,
                nuw,
                ..
            } => {
                let mut score = 5;
                let sign = match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => sign_from_wraps(*nsw, *nuw),
                    BinaryOp::UDiv | BinaryOp::URem => Signedness::Unsigned,
                    BinaryOp::SDiv | BinaryOp::SRem => Signedness::Signed,
                    BinaryOp::Shl => return Ok(TypeHint::none()),
                    BinaryOp::LShr if operand_no == 0 => Signedness::Unsigned,
                    BinaryOp::AShr if operand_no == 0 => Signedness::Signed,
                    BinaryOp::LShr | BinaryOp::AShr => return Ok(TypeHint::none()),
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                        // Weak preference for unsigned types on bitwise
                        // operators.
                        score = 1;
                        Signedness::Unsigned
                    }
                    _ => return Ok(TypeHint::none()), // float operators
                };
                let operand = if operand_no == 0 { lhs } else { rhs };
                let ty = types.translate_type(&self.value_ty(operand)?, sign);
                Ok(TypeHint::new(ty, score))
            }
            InstKind::Cmp { pred, lhs, rhs } => {
                let operand = if operand_no == 0 { lhs } else { rhs };
                let other = if operand_no == 0 { rhs } else { lhs };
                let operand_ty = self.value_ty(operand)?;

                if pred.is_int_predicate() && operand_ty.is_integer() {
                    if pred.is_signed() {
                        let ty = types.translate_type(&operand_ty, Signedness::Signed);
                        Ok(TypeHint::new(ty, 5))
                    } else if pred.is_unsigned() {
                        let ty = types.translate_type(&operand_ty, Signedness::Unsigned);
                        Ok(TypeHint::new(ty, 5))
                    } else {
                        Ok(self.infer_type_hint_operand(other)?.with_score(2))
                    }
                } else if pred.is_int_predicate() && operand_ty.is_pointer() {
                    Ok(self.infer_type_hint_operand(other)?.with_score(2))
                } else if pred.is_float_predicate() {
                    Ok(TypeHint::none())
                } else {
                    Err(ImportError::Invariant(format!(
                        "unexpected comparison (predicate: {})",
                        pred.name()
                    )))
                }
            }
            InstKind::Phi { .. } => self.infer_type_hint_operand(&Value::Inst(inst.id)),
            InstKind::ExtractValue { .. } | InstKind::InsertValue { .. } => Ok(TypeHint::none()),
            InstKind::LandingPad { .. } => Ok(TypeHint::none()),
            InstKind::Select { .. } => Err(ImportError::SelectNotSupported),
        }
    }

    fn infer_type_hint_term(&self, term: &Terminator, operand_no: usize) -> Result<TypeHint> {
        let types = self.ctx.type_importer();

        match term {
            Terminator::CondBr { cond, .. } => {
                // Prefer unsigned booleans.
                let ty = types.translate_type(&self.value_ty(cond)?, Signedness::Unsigned);
                Ok(TypeHint::new(ty, 2))
            }
            Terminator::Ret(_) => Ok(TypeHint::new(self.air_return_ty(), 5)),
            Terminator::Invoke(invoke) => self.infer_type_hint_call(&invoke.call, operand_no),
            Terminator::Resume(_) => Ok(TypeHint::none()),
            Terminator::Switch { .. } => Err(ImportError::SwitchNotSupported),
            Terminator::Br(_) | Terminator::Unreachable => {
                unreachable!("terminator without operands")
            }
        }
    }

    /// Argument positions of direct calls hint the callee's declared
    /// parameter type; debug info on the callee makes that hint almost
    /// authoritative.
    fn infer_type_hint_call(&self, call: &lir::CallInst, operand_no: usize) -> Result<TypeHint> {
        if operand_no >= call.args.len() {
            // Called function pointer.
            return Ok(TypeHint::none());
        }

        let Value::Function(callee) = &call.callee else {
            // Indirect call.
            return Ok(TypeHint::none());
        };

        let Some(air_id) = self.ctx.translate_function(*callee) else {
            // Ignored intrinsic call.
            return Ok(TypeHint::none());
        };

        let air_fun = self.ctx.bundle.function(air_id);
        if air_fun.is_var_arg() && operand_no >= air_fun.param_types().len() {
            return Ok(TypeHint::none());
        }
        let Some(param_ty) = air_fun.param_types().get(operand_no) else {
            return Ok(TypeHint::none());
        };

        let score = if self.ctx.module.function(*callee).has_subprogram {
            1000
        } else {
            10
        };
        Ok(TypeHint::new(param_ty.clone(), score))
    }

    /// Hint carried by a value appearing as the "other side" of a use:
    /// globals and functions know their type; already-translated values
    /// contribute their recorded type with a weak score. The recursion never
    /// re-enters `infer_type`.
    fn infer_type_hint_operand(&self, value: &Value) -> Result<TypeHint> {
        match value {
            Value::Global(global) => {
                let air_id = self.ctx.translate_global_variable(*global);
                let score = if self.ctx.module.global(*global).has_debug_info {
                    1000
                } else {
                    10
                };
                Ok(TypeHint::new(
                    self.ctx.bundle.global(air_id).ty.clone(),
                    score,
                ))
            }
            Value::Function(callee) => match self.ctx.translate_function(*callee) {
                Some(air_id) => {
                    let ty = AirType::pointer_to(self.ctx.bundle.function(air_id).ty.clone());
                    let score = if self.ctx.module.function(*callee).has_subprogram {
                        1000
                    } else {
                        10
                    };
                    Ok(TypeHint::new(ty, score))
                }
                None => Ok(TypeHint::none()),
            },
            Value::Inst(id) => match self.variables.get(&ValueKey::Inst(*id)) {
                Some(&var) => Ok(TypeHint::new(self.code.var_ty(var).clone(), 2)),
                None => Ok(TypeHint::none()),
            },
            Value::Param(index) => {
                let var = self.variables[&ValueKey::Param(*index)];
                let score = if self.lir_fun.has_subprogram { 1000 } else { 10 };
                Ok(TypeHint::new(self.code.var_ty(var).clone(), score))
            }
            // No sign information in bare constants.
            Value::Constant(_) => Ok(TypeHint::none()),
            Value::InlineAsm { .. } => Err(ImportError::InvalidOperand {
                context: "infer_type_hint_operand",
            }),
        }
    }
}
