//! Per-opcode translation of LIR instructions and terminators into AIR
//! statements.

use airlift_core::air::{
    self, AirType, Operand, Predicate, Signedness, Statement, StatementKind, UnaryOp, VarId,
};
use airlift_core::error::ImportError;
use airlift_core::lir::{
    self, CastOp, CmpPred, Constant, InstKind, Intrinsic, LirType, Terminator, Value, ValueKey,
};
use airlift_core::Result;

use super::block::BlockTranslation;
use super::value::value_frontend;
use super::FunctionImporter;
use crate::import::bundle::BundleImporter;

/// A call-shaped site: a call instruction or an invoke terminator.
pub(super) struct CallSite<'m> {
    pub id: lir::InstId,
    pub ty: &'m LirType,
    pub call: &'m lir::CallInst,
}

impl<'a, 'm> FunctionImporter<'a, 'm> {
    pub(super) fn translate_instruction(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &'m lir::Instruction,
    ) -> Result<()> {
        // With more than one open output, merge before anything that is not
        // a comparison, a binary operator or a branch. Appending a
        // value-carrying statement to a join of predicate fan-outs would
        // produce a diamond in the graph, and abstract joins on a diamond
        // lose precision.
        if translation.outputs.len() > 1
            && !matches!(inst.kind, InstKind::Cmp { .. } | InstKind::Binary { .. })
        {
            translation.merge_outputs(&mut self.code);
        }

        match &inst.kind {
            InstKind::Alloca {
                allocated_ty,
                array_size,
                align,
            } => self.translate_alloca(translation, inst, allocated_ty, array_size, *align),
            InstKind::Load {
                ptr,
                align,
                volatile,
            } => self.translate_load(translation, inst, ptr, *align, *volatile),
            InstKind::Store {
                ptr,
                value,
                align,
                volatile,
            } => self.translate_store(translation, inst, ptr, value, *align, *volatile),
            InstKind::Call(call) => self.translate_call(translation, inst, call),
            InstKind::Cast { op, operand } => {
                self.translate_cast(translation, inst, *op, operand)
            }
            InstKind::Gep { base, indices } => {
                self.translate_getelementptr(translation, inst, base, indices)
            }
            InstKind::Binary {
                op,
                lhs,
                rhs,
                nsw,
                nuw,
                exact,
            } => self.translate_binary_operator(
                translation,
                inst,
                *op,
                lhs,
                rhs,
                *nsw,
                *nuw,
                *exact,
            ),
            InstKind::Cmp { pred, lhs, rhs } => {
                self.translate_cmp(translation, inst, *pred, lhs, rhs)
            }
            InstKind::Phi { .. } => self.translate_phi(inst),
            InstKind::ExtractValue { aggregate, indices } => {
                self.translate_extractvalue(translation, inst, aggregate, indices)
            }
            InstKind::InsertValue {
                aggregate,
                element,
                indices,
            } => self.translate_insertvalue(translation, inst, aggregate, element, indices),
            InstKind::LandingPad { .. } => self.translate_landingpad(translation, inst),
            InstKind::Select { .. } => Err(ImportError::SelectNotSupported),
        }
    }

    pub(super) fn translate_terminator(
        &mut self,
        translation: &mut BlockTranslation,
        term: &'m Terminator,
    ) -> Result<()> {
        if translation.outputs.len() > 1
            && !matches!(term, Terminator::Br(_) | Terminator::CondBr { .. })
        {
            translation.merge_outputs(&mut self.code);
        }

        match term {
            Terminator::Ret(value) => self.translate_return(translation, value.as_ref()),
            Terminator::Br(succ) => {
                translation.add_unconditional_branching(*succ);
                Ok(())
            }
            Terminator::CondBr {
                cond,
                if_true,
                if_false,
            } => self.translate_branch(translation, cond, *if_true, *if_false),
            Terminator::Invoke(invoke) => self.translate_invoke(translation, invoke),
            Terminator::Resume(value) => self.translate_resume(translation, value),
            Terminator::Unreachable => {
                translation
                    .add_statement(&mut self.code, Statement::new(StatementKind::Unreachable));
                Ok(())
            }
            Terminator::Switch { .. } => Err(ImportError::SwitchNotSupported),
        }
    }

    fn translate_alloca(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        allocated_ty: &LirType,
        array_size: &Value,
        align: u32,
    ) -> Result<()> {
        if inst.ty.pointee() != Some(allocated_ty) {
            return Err(ImportError::Invariant(
                "unexpected allocated type for alloca".to_string(),
            ));
        }

        let var_ty = self.infer_type(inst.id)?;
        let pointee = var_ty
            .pointee()
            .cloned()
            .ok_or(ImportError::UnexpectedType { context: "alloca" })?;

        let var = self.code.new_local_var(var_ty, align);
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let size_ty = self.ctx.type_importer().size_type();
        let count = self.translate_cast_integer_value(translation, array_size, &size_ty)?;

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::Allocate {
                    result: var,
                    allocated_ty: pointee,
                    count,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    fn translate_store(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        ptr: &Value,
        value: &Value,
        align: u32,
        volatile: bool,
    ) -> Result<()> {
        let pointer = self.translate_value(translation, ptr, None)?;
        let pointee = self
            .operand_ty(&pointer)
            .pointee()
            .cloned()
            .ok_or(ImportError::UnexpectedType { context: "store" })?;
        let value = self.translate_value(translation, value, Some(&pointee))?;

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::Store {
                    ptr: pointer,
                    value,
                    align,
                    volatile,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    fn translate_load(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        ptr: &Value,
        align: u32,
        volatile: bool,
    ) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty.clone());
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let ptr_ty = AirType::pointer_to(var_ty);
        let pointer = self.translate_value(translation, ptr, Some(&ptr_ty))?;

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::Load {
                    result: var,
                    ptr: pointer,
                    align,
                    volatile,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    fn translate_call(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &'m lir::Instruction,
        call: &'m lir::CallInst,
    ) -> Result<()> {
        if let Value::Function(callee) = &call.callee {
            if let Some(intrinsic) = &self.ctx.module.function(*callee).intrinsic {
                return self.translate_intrinsic_call(translation, inst, call, intrinsic);
            }
        }

        let site = CallSite {
            id: inst.id,
            ty: &inst.ty,
            call,
        };

        // Direct calls get exact argument types; calls through a function
        // pointer allow implicit signedness and pointer conversions.
        let force_args_cast = matches!(call.callee, Value::Function(_));

        self.translate_call_helper(
            translation,
            site,
            /* force_return_cast */ true,
            force_args_cast,
            |result, callee, args| StatementKind::Call {
                result,
                callee,
                args,
            },
        )
    }

    fn translate_intrinsic_call(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &'m lir::Instruction,
        call: &'m lir::CallInst,
        intrinsic: &'m Intrinsic,
    ) -> Result<()> {
        let void_ptr = AirType::void_pointer();
        let si8 = AirType::signed(8);
        let size_ty = self.ctx.type_importer().size_type();

        if BundleImporter::ignore_intrinsic(intrinsic) {
            return Ok(());
        }

        match intrinsic {
            Intrinsic::MemCpy | Intrinsic::MemMove => {
                let dest = self.translate_value(translation, call_arg(call, 0)?, Some(&void_ptr))?;
                let src = self.translate_value(translation, call_arg(call, 1)?, Some(&void_ptr))?;
                let len = self.translate_value(translation, call_arg(call, 2)?, Some(&size_ty))?;
                let dest_align = call.param_align(0);
                let src_align = call.param_align(1);
                let volatile = volatile_flag(call, 3);

                let kind = if matches!(intrinsic, Intrinsic::MemCpy) {
                    StatementKind::MemoryCopy {
                        dest,
                        src,
                        len,
                        dest_align,
                        src_align,
                        volatile,
                    }
                } else {
                    StatementKind::MemoryMove {
                        dest,
                        src,
                        len,
                        dest_align,
                        src_align,
                        volatile,
                    }
                };
                translation.add_statement(&mut self.code, Statement::with_frontend(kind, inst.id));
                Ok(())
            }
            Intrinsic::MemSet => {
                let dest = self.translate_value(translation, call_arg(call, 0)?, Some(&void_ptr))?;
                let value = self.translate_value(translation, call_arg(call, 1)?, Some(&si8))?;
                let len = self.translate_value(translation, call_arg(call, 2)?, Some(&size_ty))?;

                translation.add_statement(
                    &mut self.code,
                    Statement::with_frontend(
                        StatementKind::MemorySet {
                            dest,
                            value,
                            len,
                            align: call.param_align(0),
                            volatile: volatile_flag(call, 3),
                        },
                        inst.id,
                    ),
                );
                Ok(())
            }
            Intrinsic::VaStart => {
                let operand =
                    self.translate_value(translation, call_arg(call, 0)?, Some(&void_ptr))?;
                translation.add_statement(
                    &mut self.code,
                    Statement::with_frontend(StatementKind::VarArgStart { operand }, inst.id),
                );
                Ok(())
            }
            Intrinsic::VaEnd => {
                let operand =
                    self.translate_value(translation, call_arg(call, 0)?, Some(&void_ptr))?;
                translation.add_statement(
                    &mut self.code,
                    Statement::with_frontend(StatementKind::VarArgEnd { operand }, inst.id),
                );
                Ok(())
            }
            Intrinsic::VaCopy => {
                let dest = self.translate_value(translation, call_arg(call, 0)?, Some(&void_ptr))?;
                let src = self.translate_value(translation, call_arg(call, 1)?, Some(&void_ptr))?;
                translation.add_statement(
                    &mut self.code,
                    Statement::with_frontend(StatementKind::VarArgCopy { dest, src }, inst.id),
                );
                Ok(())
            }
            // Unrecognized intrinsics go through the generic call path with
            // forced casts.
            Intrinsic::Other(_) => self.translate_call_helper(
                translation,
                CallSite {
                    id: inst.id,
                    ty: &inst.ty,
                    call,
                },
                true,
                true,
                |result, callee, args| StatementKind::Call {
                    result,
                    callee,
                    args,
                },
            ),
            _ => unreachable!("ignored intrinsics are filtered above"),
        }
    }

    fn translate_invoke(
        &mut self,
        translation: &mut BlockTranslation,
        invoke: &'m lir::InvokeTerm,
    ) -> Result<()> {
        let site = CallSite {
            id: invoke.id,
            ty: &invoke.ty,
            call: &invoke.call,
        };
        let force_args_cast = matches!(invoke.call.callee, Value::Function(_));

        // The invoke has to stay the last statement of its block, so the
        // return value is not cast. Both destinations point at main for
        // now; add_invoke_branching patches them.
        let main = translation.main;
        self.translate_call_helper(
            translation,
            site,
            /* force_return_cast */ false,
            force_args_cast,
            move |result, callee, args| StatementKind::Invoke {
                result,
                callee,
                args,
                normal_dest: main,
                exception_dest: main,
            },
        )?;

        translation.add_invoke_branching(&mut self.code, invoke.normal, invoke.unwind)
    }

    fn translate_call_helper(
        &mut self,
        translation: &mut BlockTranslation,
        site: CallSite<'m>,
        force_return_cast: bool,
        force_args_cast: bool,
        make_stmt: impl FnOnce(Option<VarId>, Operand, Vec<Operand>) -> StatementKind,
    ) -> Result<()> {
        let called = self.translate_value(translation, &site.call.callee, None)?;
        let called_ty = self.operand_ty(&called);
        let fun_ty = called_ty
            .pointee()
            .filter(|ty| matches!(ty, AirType::Function { .. }))
            .cloned()
            .ok_or(ImportError::UnexpectedType { context: "call" })?;
        let ret_ty = fun_ty.return_type().cloned().unwrap_or(AirType::Void);

        let has_result = !site.ty.is_void();
        if has_result == ret_ty.is_void() {
            return Err(ImportError::Invariant(
                "call result does not match the callee's return type".to_string(),
            ));
        }

        let var = if has_result {
            let ty = if force_return_cast {
                self.infer_type(site.id)?
            } else {
                ret_ty.clone()
            };
            let var = self.code.new_internal_var(ty);
            self.mark_variable(ValueKey::Inst(site.id), var);
            Some(var)
        } else {
            None
        };

        // With a forced return cast the statement writes a temporary, and a
        // bitcast reconciles it with the inferred variable.
        let needs_cast = match var {
            Some(var) => force_return_cast && *self.code.var_ty(var) != ret_ty,
            None => false,
        };
        let result = if needs_cast {
            let tmp = self.code.new_internal_var(ret_ty.clone());
            self.code.var_mut(tmp).frontend = Some(ValueKey::Inst(site.id));
            Some(tmp)
        } else {
            var
        };

        let params = fun_ty.param_types().to_vec();
        let mut args = Vec::with_capacity(site.call.args.len());
        for (index, arg) in site.call.args.iter().enumerate() {
            let operand = if index < params.len() && (force_args_cast || arg.is_constant()) {
                self.translate_value(translation, arg, Some(&params[index]))?
            } else {
                self.translate_value(translation, arg, None)?
            };
            args.push(operand);
        }

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(make_stmt(result, called, args), site.id),
        );

        if needs_cast {
            self.add_bitcast_stmt(
                translation,
                var.unwrap(),
                Operand::Var(result.unwrap()),
                Some(site.id),
            )?;
        }
        Ok(())
    }

    fn translate_bitcast(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        operand_value: &Value,
    ) -> Result<()> {
        let src_ty = self.value_ty(operand_value)?;
        let dest_ty = &inst.ty;

        let legal = (src_ty.is_pointer() && dest_ty.is_pointer())
            || (src_ty.is_float() && dest_ty.is_integer())
            || (src_ty.is_integer() && dest_ty.is_float());
        if !legal {
            return Err(ImportError::InvalidBitcast {
                from: format!("{:?}", src_ty),
                to: format!("{:?}", dest_ty),
            });
        }

        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty);
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let operand = self.translate_value(translation, operand_value, None)?;

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::Unary {
                    op: UnaryOp::Bitcast,
                    result: var,
                    operand,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    fn translate_cast(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        op: CastOp,
        operand_value: &Value,
    ) -> Result<()> {
        if op == CastOp::BitCast {
            return self.translate_bitcast(translation, inst, operand_value);
        }
        if op == CastOp::AddrSpaceCast {
            return Err(ImportError::UnsupportedCast("addrspacecast"));
        }

        let types = self.ctx.type_importer();
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty.clone());
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let sign;
        let mut src_ty = None; // required type for the operand
        let mut dest_ty = None; // type of the statement result
        let mut operand = None; // already-translated operand

        // dest_ty can differ from the inferred variable type; a bitcast
        // reconciles them below.
        match op {
            CastOp::Trunc => {
                // No sign requirement, use the inferred signedness to avoid
                // casts.
                sign = var_ty
                    .sign()
                    .ok_or(ImportError::UnexpectedType { context: "trunc" })?;
                src_ty = Some(types.translate_type(&self.value_ty(operand_value)?, sign));
                dest_ty = Some(var_ty.clone());
            }
            CastOp::ZExt => {
                sign = Signedness::Unsigned;
                src_ty = Some(types.translate_type(&self.value_ty(operand_value)?, sign));
                dest_ty = Some(types.translate_type(&inst.ty, sign));
            }
            CastOp::SExt => {
                sign = Signedness::Signed;
                src_ty = Some(types.translate_type(&self.value_ty(operand_value)?, sign));
                dest_ty = Some(types.translate_type(&inst.ty, sign));
            }
            CastOp::FPToUI => {
                sign = Signedness::Unsigned;
                dest_ty = Some(types.translate_type(&inst.ty, sign));
            }
            CastOp::FPToSI => {
                sign = Signedness::Signed;
                dest_ty = Some(types.translate_type(&inst.ty, sign));
            }
            CastOp::UIToFP => {
                sign = Signedness::Unsigned;
                src_ty = Some(types.translate_type(&self.value_ty(operand_value)?, sign));
            }
            CastOp::SIToFP => {
                sign = Signedness::Signed;
                src_ty = Some(types.translate_type(&self.value_ty(operand_value)?, sign));
            }
            CastOp::FPTrunc | CastOp::FPExt => {
                sign = Signedness::Signed;
            }
            CastOp::PtrToInt => {
                // No sign requirement on the source; the result keeps the
                // inferred signedness.
                sign = var_ty.sign().ok_or(ImportError::UnexpectedType {
                    context: "ptrtoint",
                })?;
                dest_ty = Some(var_ty.clone());
            }
            CastOp::IntToPtr => {
                // Use the signedness the operand was inferred at.
                let translated = self.translate_value(translation, operand_value, None)?;
                let operand_ty = self.operand_ty(&translated);
                sign = operand_ty.sign().ok_or(ImportError::UnexpectedType {
                    context: "inttoptr",
                })?;
                src_ty = Some(operand_ty);
                operand = Some(translated);
            }
            CastOp::BitCast | CastOp::AddrSpaceCast => unreachable!(),
        }

        let operand = match operand {
            Some(operand) => operand,
            None => self.translate_value(translation, operand_value, src_ty.as_ref())?,
        };

        let needs_cast = matches!(&dest_ty, Some(ty) if *ty != var_ty);
        let result = if needs_cast {
            let tmp = self.code.new_internal_var(dest_ty.clone().unwrap());
            self.code.var_mut(tmp).frontend = Some(ValueKey::Inst(inst.id));
            tmp
        } else {
            var
        };

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::Unary {
                    op: convert_unary_op(op, sign),
                    result,
                    operand,
                },
                inst.id,
            ),
        );

        if needs_cast {
            self.add_bitcast_stmt(translation, var, Operand::Var(result), Some(inst.id))?;
        }
        Ok(())
    }

    fn translate_getelementptr(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        base: &Value,
        indices: &[Value],
    ) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty);
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let pointer = self.translate_value(translation, base, None)?;

        let layout = &self.ctx.module.data_layout;
        let size_ty = self.ctx.type_importer().size_type();
        let mut terms = Vec::with_capacity(indices.len());

        let base_ty = self.value_ty(base)?;
        let mut cur = base_ty
            .pointee()
            .cloned()
            .ok_or(ImportError::UnexpectedType {
                context: "getelementptr",
            })?;

        for (position, index) in indices.iter().enumerate() {
            // The first index steps over the pointer itself.
            if position == 0 {
                let stride = layout.type_alloc_size(&cur);
                let operand = self.translate_gep_index(translation, index)?;
                terms.push((stride, operand));
                continue;
            }

            match cur.clone() {
                LirType::Struct { fields, .. } => {
                    let Value::Constant(Constant::Int(field, _)) = index else {
                        return Err(ImportError::Invariant(
                            "non-constant struct index in getelementptr".to_string(),
                        ));
                    };
                    let field = *field as usize;
                    let offset = layout.struct_element_offset(&cur, field).ok_or_else(|| {
                        ImportError::Invariant(
                            "struct index out of range in getelementptr".to_string(),
                        )
                    })?;
                    terms.push((
                        1,
                        Operand::Int {
                            value: offset as i128,
                            ty: size_ty.clone(),
                        },
                    ));
                    cur = fields[field].clone();
                }
                LirType::Array(element, _) | LirType::Vector(element, _) => {
                    let stride = layout.type_alloc_size(&element);
                    let operand = self.translate_gep_index(translation, index)?;
                    terms.push((stride, operand));
                    cur = *element;
                }
                _ => {
                    return Err(ImportError::Invariant(
                        "unexpected getelementptr index".to_string(),
                    ))
                }
            }
        }

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::PointerShift {
                    result: var,
                    base: pointer,
                    terms,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    /// Constant indices translate at the unsigned flavor of their own type;
    /// everything else carries no hint.
    fn translate_gep_index(
        &mut self,
        translation: &mut BlockTranslation,
        index: &Value,
    ) -> Result<Operand> {
        let preferred = if index.is_constant() {
            Some(
                self.ctx
                    .type_importer()
                    .translate_type(&self.value_ty(index)?, Signedness::Unsigned),
            )
        } else {
            None
        };
        self.translate_value(translation, index, preferred.as_ref())
    }

    #[allow(clippy::too_many_arguments)]
    fn translate_binary_operator(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        op: lir::BinaryOp,
        lhs: &Value,
        rhs: &Value,
        nsw: bool,
        nuw: bool,
        exact: bool,
    ) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty.clone());
        self.mark_variable(ValueKey::Inst(inst.id), var);

        if inst.ty.is_integer() {
            let mut left = None;
            let mut right = None;
            let mut stmt_ty = None;

            let sign = match op {
                lir::BinaryOp::Add | lir::BinaryOp::Sub | lir::BinaryOp::Mul => {
                    super::hint::sign_from_wraps(nsw, nuw)
                }
                lir::BinaryOp::UDiv | lir::BinaryOp::URem => Signedness::Unsigned,
                lir::BinaryOp::SDiv | lir::BinaryOp::SRem => Signedness::Signed,
                lir::BinaryOp::Shl
                | lir::BinaryOp::LShr
                | lir::BinaryOp::AShr
                | lir::BinaryOp::And
                | lir::BinaryOp::Or
                | lir::BinaryOp::Xor => {
                    // No sign requirement; follow the first non-constant
                    // operand.
                    let ty = if !lhs.is_constant() {
                        let operand = self.translate_value(translation, lhs, None)?;
                        let ty = self.operand_ty(&operand);
                        left = Some(operand);
                        ty
                    } else {
                        let operand = self.translate_value(translation, rhs, None)?;
                        let ty = self.operand_ty(&operand);
                        right = Some(operand);
                        ty
                    };
                    let sign = ty.sign().ok_or(ImportError::UnexpectedType {
                        context: "binary operator",
                    })?;
                    stmt_ty = Some(ty);
                    sign
                }
                _ => unreachable!("float operator on an integer type"),
            };

            let stmt_ty = match stmt_ty {
                Some(ty) => ty,
                None => self.ctx.type_importer().translate_type(&inst.ty, sign),
            };

            let left = match left {
                Some(operand) => operand,
                None => self.translate_value(translation, lhs, Some(&stmt_ty))?,
            };
            let right = match right {
                Some(operand) => operand,
                None => self.translate_value(translation, rhs, Some(&stmt_ty))?,
            };

            let needs_cast = stmt_ty != var_ty;
            let result = if needs_cast {
                let tmp = self.code.new_internal_var(stmt_ty);
                self.code.var_mut(tmp).frontend = Some(ValueKey::Inst(inst.id));
                tmp
            } else {
                var
            };

            translation.add_statement(
                &mut self.code,
                Statement::with_frontend(
                    StatementKind::Binary {
                        op: convert_int_bin_op(op, sign),
                        result,
                        lhs: left,
                        rhs: right,
                        no_wrap: nsw || nuw,
                        exact,
                    },
                    inst.id,
                ),
            );

            if needs_cast {
                self.add_bitcast_stmt(translation, var, Operand::Var(result), Some(inst.id))?;
            }
            Ok(())
        } else if inst.ty.is_float() {
            let left = self.translate_value(translation, lhs, None)?;
            let right = self.translate_value(translation, rhs, None)?;

            if self.operand_ty(&left) != var_ty {
                return Err(ImportError::UnexpectedType {
                    context: "float binary operator",
                });
            }

            translation.add_statement(
                &mut self.code,
                Statement::with_frontend(
                    StatementKind::Binary {
                        op: convert_float_bin_op(op),
                        result: var,
                        lhs: left,
                        rhs: right,
                        no_wrap: false,
                        exact: false,
                    },
                    inst.id,
                ),
            );
            Ok(())
        } else {
            Err(ImportError::UnsupportedInstruction(format!(
                "{} on {:?}",
                op.name(),
                inst.ty
            )))
        }
    }

    fn translate_cmp(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        pred: CmpPred,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<()> {
        let operand_ty = self.value_ty(lhs)?;

        if pred.is_int_predicate() && operand_ty.is_integer() {
            let mut left = None;
            let mut right = None;
            let mut cmp_ty = None;

            let sign = if pred.is_signed() {
                Signedness::Signed
            } else if pred.is_unsigned() {
                Signedness::Unsigned
            } else {
                // eq/ne: follow the first non-constant operand.
                let ty = if !lhs.is_constant() {
                    let operand = self.translate_value(translation, lhs, None)?;
                    let ty = self.operand_ty(&operand);
                    left = Some(operand);
                    ty
                } else {
                    let operand = self.translate_value(translation, rhs, None)?;
                    let ty = self.operand_ty(&operand);
                    right = Some(operand);
                    ty
                };
                let sign = ty.sign().ok_or(ImportError::UnexpectedType {
                    context: "comparison",
                })?;
                cmp_ty = Some(ty);
                sign
            };

            let cmp_ty = match cmp_ty {
                Some(ty) => ty,
                None => self.ctx.type_importer().translate_type(&operand_ty, sign),
            };

            let left = match left {
                Some(operand) => operand,
                None => self.translate_value(translation, lhs, Some(&cmp_ty))?,
            };
            let right = match right {
                Some(operand) => operand,
                None => self.translate_value(translation, rhs, Some(&cmp_ty))?,
            };

            let result_ty = self.infer_type(inst.id)?;
            let result = self.code.new_internal_var(result_ty);
            self.mark_variable(ValueKey::Inst(inst.id), result);

            let stmt = Statement::with_frontend(
                StatementKind::Comparison {
                    pred: convert_int_predicate(pred, sign),
                    lhs: left,
                    rhs: right,
                },
                inst.id,
            );
            translation.add_comparison(&mut self.code, result, stmt);
            Ok(())
        } else if (pred.is_int_predicate() && operand_ty.is_pointer()) || pred.is_float_predicate()
        {
            let left = self.translate_value(translation, lhs, None)?;
            let right = self.translate_value(translation, rhs, None)?;

            let result_ty = self.infer_type(inst.id)?;
            let result = self.code.new_internal_var(result_ty);
            self.mark_variable(ValueKey::Inst(inst.id), result);

            let air_pred = if operand_ty.is_pointer() {
                convert_ptr_predicate(pred)?
            } else {
                convert_float_predicate(pred)?
            };
            let stmt = Statement::with_frontend(
                StatementKind::Comparison {
                    pred: air_pred,
                    lhs: left,
                    rhs: right,
                },
                inst.id,
            );
            translation.add_comparison(&mut self.code, result, stmt);
            Ok(())
        } else {
            Err(ImportError::Invariant(format!(
                "unexpected comparison (predicate: {})",
                pred.name()
            )))
        }
    }

    fn translate_branch(
        &mut self,
        translation: &mut BlockTranslation,
        cond: &Value,
        if_true: lir::BlockId,
        if_false: lir::BlockId,
    ) -> Result<()> {
        match cond {
            Value::Inst(_) | Value::Param(_) => {
                let key = cond.key().unwrap();
                let var = self.variables.get(&key).copied().ok_or_else(|| {
                    ImportError::Invariant(
                        "condition of conditional branch has not been translated".to_string(),
                    )
                })?;
                let single_use = self.uses.get(&key).is_some_and(|uses| uses.len() == 1);
                translation.add_conditional_branching(
                    &mut self.code,
                    var,
                    if_true,
                    if_false,
                    single_use,
                    value_frontend(cond),
                );
                Ok(())
            }
            Value::Constant(Constant::Int(value, _)) => {
                translation
                    .add_unconditional_branching(if *value == 0 { if_false } else { if_true });
                Ok(())
            }
            _ => Err(ImportError::UnexpectedBranchCondition),
        }
    }

    fn translate_return(
        &mut self,
        translation: &mut BlockTranslation,
        value: Option<&Value>,
    ) -> Result<()> {
        let operand = match value {
            Some(value) => {
                let ret_ty = self.air_return_ty();
                Some(self.translate_value(translation, value, Some(&ret_ty))?)
            }
            None => None,
        };

        translation.add_statement(
            &mut self.code,
            Statement::new(StatementKind::ReturnValue { operand }),
        );
        Ok(())
    }

    /// First PHI pass: only the result variable is created. The incoming
    /// assignments are wired by `translate_phi_late` once every block is
    /// translated.
    fn translate_phi(&mut self, inst: &lir::Instruction) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty);
        self.mark_variable(ValueKey::Inst(inst.id), var);
        Ok(())
    }

    pub(super) fn translate_phi_late(
        &mut self,
        bb: lir::BlockId,
        phi_id: lir::InstId,
        incoming: &[(Value, lir::BlockId)],
    ) -> Result<()> {
        let result = self.variables[&ValueKey::Inst(phi_id)];
        let result_ty = self.code.var_ty(result).clone();

        for (value, pred) in incoming {
            let input_bb = {
                let translation = self
                    .blocks
                    .get_mut(&bb)
                    .expect("phi pass only visits translated blocks");
                translation.input_basic_block(&mut self.code, *pred)
            };

            let operand = if let Value::Constant(cst) = value {
                self.ctx
                    .constant_importer()
                    .translate_constant(cst, Some(&result_ty))?
            } else {
                self.translate_value_raw(value, None)?
            };

            let operand_ty = self.operand_ty(&operand);
            let stmt = if operand_ty == result_ty {
                Statement::with_frontend(StatementKind::Assignment { result, operand }, phi_id)
            } else if operand_ty.bitcast_compatible(&result_ty) {
                Statement::with_frontend(
                    StatementKind::Unary {
                        op: UnaryOp::Bitcast,
                        result,
                        operand,
                    },
                    phi_id,
                )
            } else {
                return Err(ImportError::InvalidPhiIncoming {
                    from: operand_ty.to_string(),
                    to: result_ty.to_string(),
                });
            };
            self.code.push_stmt(input_bb, stmt);
        }
        Ok(())
    }

    fn translate_extractvalue(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        aggregate: &Value,
        indices: &[u32],
    ) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty);
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let aggregate_ty = self.value_ty(aggregate)?;
        let aggregate = self.translate_value(translation, aggregate, None)?;
        let offset = self.translate_indexes(&aggregate_ty, indices)?;

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::ExtractElement {
                    result: var,
                    aggregate,
                    offset,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    fn translate_insertvalue(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
        aggregate: &Value,
        element: &Value,
        indices: &[u32],
    ) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty);
        self.mark_variable(ValueKey::Inst(inst.id), var);

        let aggregate_ty = self.value_ty(aggregate)?;
        let aggregate = self.translate_value(translation, aggregate, None)?;
        let offset = self.translate_indexes(&aggregate_ty, indices)?;
        let element = self.translate_value(translation, element, None)?;

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(
                StatementKind::InsertElement {
                    result: var,
                    aggregate,
                    offset,
                    element,
                },
                inst.id,
            ),
        );
        Ok(())
    }

    /// Fold a chain of aggregate indices into a single byte offset.
    fn translate_indexes(&self, indexed_ty: &LirType, indices: &[u32]) -> Result<Operand> {
        let layout = &self.ctx.module.data_layout;
        let mut offset = 0u64;
        let mut ty = indexed_ty.clone();

        for &index in indices {
            match ty.clone() {
                LirType::Struct { fields, .. } => {
                    offset += layout
                        .struct_element_offset(&ty, index as usize)
                        .ok_or_else(|| {
                            ImportError::Invariant("aggregate index out of range".to_string())
                        })?;
                    ty = fields[index as usize].clone();
                }
                LirType::Array(element, _) | LirType::Vector(element, _) => {
                    offset += layout.type_alloc_size(&element) * index as u64;
                    ty = *element;
                }
                _ => {
                    return Err(ImportError::Invariant(
                        "unexpected indexed type".to_string(),
                    ))
                }
            }
        }

        Ok(Operand::Int {
            value: offset as i128,
            ty: self.ctx.type_importer().size_type(),
        })
    }

    fn translate_landingpad(
        &mut self,
        translation: &mut BlockTranslation,
        inst: &lir::Instruction,
    ) -> Result<()> {
        let var_ty = self.infer_type(inst.id)?;
        let var = self.code.new_internal_var(var_ty);
        self.mark_variable(ValueKey::Inst(inst.id), var);

        translation.add_statement(
            &mut self.code,
            Statement::with_frontend(StatementKind::LandingPad { result: var }, inst.id),
        );
        Ok(())
    }

    fn translate_resume(
        &mut self,
        translation: &mut BlockTranslation,
        value: &Value,
    ) -> Result<()> {
        let operand = self.translate_value(translation, value, None)?;
        translation.add_statement(
            &mut self.code,
            Statement::new(StatementKind::Resume { operand }),
        );
        Ok(())
    }
}

fn call_arg<'v>(call: &'v lir::CallInst, index: usize) -> Result<&'v Value> {
    call.args.get(index).ok_or_else(|| {
        ImportError::Invariant("missing argument on memory intrinsic call".to_string())
    })
}

fn volatile_flag(call: &lir::CallInst, index: usize) -> bool {
    matches!(
        call.args.get(index),
        Some(Value::Constant(Constant::Int(value, _))) if *value != 0
    )
}

fn convert_unary_op(op: CastOp, sign: Signedness) -> UnaryOp {
    match op {
        CastOp::Trunc => match sign {
            Signedness::Unsigned => UnaryOp::UTrunc,
            Signedness::Signed => UnaryOp::STrunc,
        },
        CastOp::ZExt => UnaryOp::ZExt,
        CastOp::SExt => UnaryOp::SExt,
        CastOp::FPToUI => UnaryOp::FPToUI,
        CastOp::FPToSI => UnaryOp::FPToSI,
        CastOp::UIToFP => UnaryOp::UIToFP,
        CastOp::SIToFP => UnaryOp::SIToFP,
        CastOp::FPTrunc => UnaryOp::FPTrunc,
        CastOp::FPExt => UnaryOp::FPExt,
        CastOp::PtrToInt => match sign {
            Signedness::Unsigned => UnaryOp::PtrToUI,
            Signedness::Signed => UnaryOp::PtrToSI,
        },
        CastOp::IntToPtr => match sign {
            Signedness::Unsigned => UnaryOp::UIToPtr,
            Signedness::Signed => UnaryOp::SIToPtr,
        },
        CastOp::BitCast | CastOp::AddrSpaceCast => {
            unreachable!("handled before reaching convert_unary_op")
        }
    }
}

fn convert_int_bin_op(op: lir::BinaryOp, sign: Signedness) -> air::BinaryOp {
    use airlift_core::air::BinaryOp as A;
    use airlift_core::lir::BinaryOp as L;

    match sign {
        Signedness::Unsigned => match op {
            L::Add => A::UAdd,
            L::Sub => A::USub,
            L::Mul => A::UMul,
            L::UDiv => A::UDiv,
            L::URem => A::URem,
            L::Shl => A::UShl,
            L::LShr => A::ULShr,
            L::AShr => A::UAShr,
            L::And => A::UAnd,
            L::Or => A::UOr,
            L::Xor => A::UXor,
            _ => unreachable!("not an integer operator"),
        },
        Signedness::Signed => match op {
            L::Add => A::SAdd,
            L::Sub => A::SSub,
            L::Mul => A::SMul,
            L::SDiv => A::SDiv,
            L::SRem => A::SRem,
            L::Shl => A::SShl,
            L::LShr => A::SLShr,
            L::AShr => A::SAShr,
            L::And => A::SAnd,
            L::Or => A::SOr,
            L::Xor => A::SXor,
            _ => unreachable!("not an integer operator"),
        },
    }
}

fn convert_float_bin_op(op: lir::BinaryOp) -> air::BinaryOp {
    match op {
        lir::BinaryOp::FAdd => air::BinaryOp::FAdd,
        lir::BinaryOp::FSub => air::BinaryOp::FSub,
        lir::BinaryOp::FMul => air::BinaryOp::FMul,
        lir::BinaryOp::FDiv => air::BinaryOp::FDiv,
        lir::BinaryOp::FRem => air::BinaryOp::FRem,
        _ => unreachable!("not a float operator"),
    }
}

fn convert_int_predicate(pred: CmpPred, sign: Signedness) -> Predicate {
    match sign {
        Signedness::Signed => match pred {
            CmpPred::Eq => Predicate::SIEQ,
            CmpPred::Ne => Predicate::SINE,
            CmpPred::Sgt => Predicate::SIGT,
            CmpPred::Sge => Predicate::SIGE,
            CmpPred::Slt => Predicate::SILT,
            CmpPred::Sle => Predicate::SILE,
            _ => unreachable!("not a signed integer predicate"),
        },
        Signedness::Unsigned => match pred {
            CmpPred::Eq => Predicate::UIEQ,
            CmpPred::Ne => Predicate::UINE,
            CmpPred::Ugt => Predicate::UIGT,
            CmpPred::Uge => Predicate::UIGE,
            CmpPred::Ult => Predicate::UILT,
            CmpPred::Ule => Predicate::UILE,
            _ => unreachable!("not an unsigned integer predicate"),
        },
    }
}

fn convert_ptr_predicate(pred: CmpPred) -> Result<Predicate> {
    match pred {
        CmpPred::Eq => Ok(Predicate::PEQ),
        CmpPred::Ne => Ok(Predicate::PNE),
        CmpPred::Ugt => Ok(Predicate::PGT),
        CmpPred::Uge => Ok(Predicate::PGE),
        CmpPred::Ult => Ok(Predicate::PLT),
        CmpPred::Ule => Ok(Predicate::PLE),
        _ => Err(ImportError::Invariant(format!(
            "unexpected pointer comparison (predicate: {})",
            pred.name()
        ))),
    }
}

fn convert_float_predicate(pred: CmpPred) -> Result<Predicate> {
    match pred {
        CmpPred::Foeq => Ok(Predicate::FOEQ),
        CmpPred::Fogt => Ok(Predicate::FOGT),
        CmpPred::Foge => Ok(Predicate::FOGE),
        CmpPred::Folt => Ok(Predicate::FOLT),
        CmpPred::Fole => Ok(Predicate::FOLE),
        CmpPred::Fone => Ok(Predicate::FONE),
        CmpPred::Ford => Ok(Predicate::FORD),
        CmpPred::Funo => Ok(Predicate::FUNO),
        CmpPred::Fueq => Ok(Predicate::FUEQ),
        CmpPred::Fugt => Ok(Predicate::FUGT),
        CmpPred::Fuge => Ok(Predicate::FUGE),
        CmpPred::Fult => Ok(Predicate::FULT),
        CmpPred::Fule => Ok(Predicate::FULE),
        CmpPred::Fune => Ok(Predicate::FUNE),
        CmpPred::Ffalse => Err(ImportError::UnsupportedFloatPredicate("false")),
        CmpPred::Ftrue => Err(ImportError::UnsupportedFloatPredicate("true")),
        _ => Err(ImportError::Invariant(format!(
            "unexpected float comparison (predicate: {})",
            pred.name()
        ))),
    }
}
