//! Translation of LIR values into AIR operands, inserting bitcasts or
//! integer cast chains when the recorded type differs from the requested
//! one.

use airlift_core::air::{AirType, Operand, Signedness, Statement, StatementKind, UnaryOp, VarId};
use airlift_core::error::ImportError;
use airlift_core::lir::{self, Value, ValueKey};
use airlift_core::Result;

use super::block::BlockTranslation;
use super::FunctionImporter;

impl<'a, 'm> FunctionImporter<'a, 'm> {
    /// Translate a value to an operand of type `ty` (any type when `None`),
    /// bitcasting recorded variables that were inferred at another type.
    pub(super) fn translate_value(
        &mut self,
        translation: &mut BlockTranslation,
        value: &Value,
        ty: Option<&AirType>,
    ) -> Result<Operand> {
        let operand = self.translate_value_raw(value, ty)?;
        match ty {
            Some(ty) if !value.is_constant() && self.operand_ty(&operand) != *ty => {
                self.add_bitcast(translation, operand, ty, value_frontend(value))
            }
            _ => Ok(operand),
        }
    }

    /// Resolve a value without inserting any cast. Constants are produced
    /// directly at the requested type.
    pub(super) fn translate_value_raw(
        &self,
        value: &Value,
        ty: Option<&AirType>,
    ) -> Result<Operand> {
        match value {
            Value::Constant(cst) => self.ctx.constant_importer().translate_constant(cst, ty),
            Value::Inst(_) | Value::Param(_) => {
                let key = value.key().unwrap();
                let var = self.variables.get(&key).copied().ok_or_else(|| {
                    ImportError::Invariant("value has not been translated yet".to_string())
                })?;
                Ok(Operand::Var(var))
            }
            Value::Global(global) => {
                Ok(Operand::Global(self.ctx.translate_global_variable(*global)))
            }
            Value::Function(callee) => self
                .ctx
                .translate_function(*callee)
                .map(Operand::FunctionPtr)
                .ok_or(ImportError::InvalidOperand {
                    context: "translate_value",
                }),
            Value::InlineAsm { asm, ty: asm_ty } => {
                let ty = match ty {
                    Some(ty) => ty.clone(),
                    None => self
                        .ctx
                        .type_importer()
                        .translate_type(asm_ty, Signedness::Signed),
                };
                Ok(Operand::Asm {
                    asm: asm.clone(),
                    ty,
                })
            }
        }
    }

    /// Translate a value to an integer operand of exactly `ty`, widening,
    /// truncating and sign-bitcasting as needed.
    pub(super) fn translate_cast_integer_value(
        &mut self,
        translation: &mut BlockTranslation,
        value: &Value,
        ty: &AirType,
    ) -> Result<Operand> {
        match value {
            Value::Constant(cst) => self
                .ctx
                .constant_importer()
                .translate_cast_integer_constant(cst, ty),
            Value::Inst(_) | Value::Param(_) => {
                let key = value.key().unwrap();
                let var = self.variables.get(&key).copied().ok_or_else(|| {
                    ImportError::Invariant("value has not been translated yet".to_string())
                })?;
                if self.code.var_ty(var) == ty {
                    Ok(Operand::Var(var))
                } else {
                    self.add_integer_casts(translation, var, ty)
                }
            }
            _ => Err(ImportError::InvalidOperand {
                context: "translate_cast_integer_value",
            }),
        }
    }

    /// Bitcast `operand` into a fresh variable of type `ty`.
    pub(super) fn add_bitcast(
        &mut self,
        translation: &mut BlockTranslation,
        operand: Operand,
        ty: &AirType,
        frontend: Option<lir::InstId>,
    ) -> Result<Operand> {
        let from = self.operand_ty(&operand);
        if !from.bitcast_compatible(ty) {
            return Err(ImportError::InvalidBitcast {
                from: from.to_string(),
                to: ty.to_string(),
            });
        }

        let result = self.code.new_internal_var(ty.clone());
        if let Operand::Var(src) = &operand {
            self.code.var_mut(result).frontend = self.code.var(*src).frontend;
        }

        translation.add_statement(
            &mut self.code,
            Statement {
                kind: StatementKind::Unary {
                    op: UnaryOp::Bitcast,
                    result,
                    operand,
                },
                frontend,
            },
        );
        Ok(Operand::Var(result))
    }

    /// Bitcast `operand` into the existing `result` variable.
    pub(super) fn add_bitcast_stmt(
        &mut self,
        translation: &mut BlockTranslation,
        result: VarId,
        operand: Operand,
        frontend: Option<lir::InstId>,
    ) -> Result<()> {
        let from = self.operand_ty(&operand);
        let to = self.code.var_ty(result);
        if !from.bitcast_compatible(to) {
            return Err(ImportError::InvalidBitcast {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        translation.add_statement(
            &mut self.code,
            Statement {
                kind: StatementKind::Unary {
                    op: UnaryOp::Bitcast,
                    result,
                    operand,
                },
                frontend,
            },
        );
        Ok(())
    }

    /// Emit a width change at the variable's own signedness, then a
    /// sign-changing bitcast if the signs still differ.
    fn add_integer_casts(
        &mut self,
        translation: &mut BlockTranslation,
        var: VarId,
        ty: &AirType,
    ) -> Result<Operand> {
        let frontend = match self.code.var(var).frontend {
            Some(ValueKey::Inst(id)) => Some(id),
            _ => None,
        };

        let cur_ty = self.code.var_ty(var).clone();
        let (cur_bits, cur_sign) = match (cur_ty.bit_width(), cur_ty.sign()) {
            (Some(bits), Some(sign)) => (bits, sign),
            _ => {
                return Err(ImportError::UnexpectedType {
                    context: "add_integer_casts",
                })
            }
        };
        let target_bits = ty.bit_width().ok_or(ImportError::UnexpectedType {
            context: "add_integer_casts",
        })?;

        let mut cur = var;

        // Truncate or extend
        if cur_bits != target_bits {
            let res_ty = AirType::integer(target_bits, cur_sign);
            let res = self.code.new_internal_var(res_ty);
            self.code.var_mut(res).frontend = self.code.var(var).frontend;

            let op = if cur_bits < target_bits {
                match cur_sign {
                    Signedness::Signed => UnaryOp::SExt,
                    Signedness::Unsigned => UnaryOp::ZExt,
                }
            } else {
                match cur_sign {
                    Signedness::Signed => UnaryOp::STrunc,
                    Signedness::Unsigned => UnaryOp::UTrunc,
                }
            };
            translation.add_statement(
                &mut self.code,
                Statement {
                    kind: StatementKind::Unary {
                        op,
                        result: res,
                        operand: Operand::Var(cur),
                    },
                    frontend,
                },
            );
            cur = res;
        }

        // Sign conversion
        if self.code.var_ty(cur).sign() != ty.sign() {
            let res = self.code.new_internal_var(ty.clone());
            self.code.var_mut(res).frontend = self.code.var(var).frontend;
            translation.add_statement(
                &mut self.code,
                Statement {
                    kind: StatementKind::Unary {
                        op: UnaryOp::Bitcast,
                        result: res,
                        operand: Operand::Var(cur),
                    },
                    frontend,
                },
            );
            cur = res;
        }

        Ok(Operand::Var(cur))
    }
}

/// Provenance id of a value, when it is an instruction result.
pub(super) fn value_frontend(value: &Value) -> Option<lir::InstId> {
    match value.key() {
        Some(ValueKey::Inst(id)) => Some(id),
        _ => None,
    }
}
