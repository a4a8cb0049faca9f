//! Function-body translation: orchestrates the per-block state machines,
//! the deferred PHI pass and the final successor wiring.

pub(crate) mod block;
mod hint;
mod instr;
mod value;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};

use itertools::Itertools;

use airlift_core::air::{self, AirType};
use airlift_core::error::ImportError;
use airlift_core::lir::{self, InstKind, Terminator, Value, ValueKey};
use airlift_core::Result;

use self::block::BlockTranslation;
use super::bundle::BundleImporter;

/// A view of a value-producing LIR entity: a regular instruction or an
/// invoke terminator.
#[derive(Debug, Clone, Copy)]
pub(crate) enum InstView<'m> {
    Inst(&'m lir::Instruction),
    Invoke(&'m lir::InvokeTerm),
}

/// A single use of a value: the using entity and the operand position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Use {
    pub user: UserRef,
    pub operand_no: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum UserRef {
    Inst(lir::InstId),
    Term(lir::BlockId),
}

/// Translates one LIR function body into an AIR `Code`.
pub struct FunctionImporter<'a, 'm> {
    pub(crate) ctx: &'a BundleImporter<'m>,
    pub(crate) lir_fun: &'m lir::Function,
    air_fun: air::FunId,
    pub(crate) code: air::Code,
    /// LIR value to AIR variable. BFS order plus the deferred PHI pass
    /// guarantee a value is recorded here before any non-PHI consumer is
    /// translated.
    pub(crate) variables: HashMap<ValueKey, air::VarId>,
    blocks: HashMap<lir::BlockId, BlockTranslation>,
    insts: HashMap<lir::InstId, InstView<'m>>,
    pub(crate) uses: HashMap<ValueKey, Vec<Use>>,
    return_bb: Option<lir::BlockId>,
    unreachable_bb: Option<lir::BlockId>,
    ehresume_bb: Option<lir::BlockId>,
}

impl<'a, 'm> FunctionImporter<'a, 'm> {
    pub fn new(
        ctx: &'a BundleImporter<'m>,
        lir_fun: &'m lir::Function,
        air_fun: air::FunId,
    ) -> Self {
        let code = air::Code::new(&ctx.bundle.function(air_fun).ty);
        let mut importer = Self {
            ctx,
            lir_fun,
            air_fun,
            code,
            variables: HashMap::new(),
            blocks: HashMap::new(),
            insts: HashMap::new(),
            uses: HashMap::new(),
            return_bb: None,
            unreachable_bb: None,
            ehresume_bb: None,
        };
        importer.index_instructions();
        importer
    }

    /// Translate the whole body and return the populated `Code`.
    pub fn translate_body(mut self) -> Result<air::Code> {
        self.mark_special_blocks()?;
        self.translate_parameters();
        self.translate_basic_blocks()?;
        self.translate_phi_nodes()?;
        self.link_basic_blocks()?;
        Ok(self.code)
    }

    /// Build the instruction and use indexes consulted during inference.
    fn index_instructions(&mut self) {
        for (bb_index, block) in self.lir_fun.blocks.iter().enumerate() {
            let bb = bb_index as lir::BlockId;
            for inst in &block.insts {
                self.insts.insert(inst.id, InstView::Inst(inst));
                for (operand_no, operand) in inst_operands(&inst.kind).into_iter().enumerate() {
                    self.record_use(operand, UserRef::Inst(inst.id), operand_no);
                }
            }
            if let Terminator::Invoke(invoke) = &block.terminator {
                self.insts.insert(invoke.id, InstView::Invoke(invoke));
            }
            for (operand_no, operand) in term_operands(&block.terminator).into_iter().enumerate() {
                self.record_use(operand, UserRef::Term(bb), operand_no);
            }
        }
    }

    fn record_use(&mut self, operand: &Value, user: UserRef, operand_no: usize) {
        if let Some(key) = operand.key() {
            self.uses
                .entry(key)
                .or_default()
                .push(Use { user, operand_no });
        }
    }

    /// Classify terminators; the function may have at most one return, one
    /// unreachable and one ehresume block.
    fn mark_special_blocks(&mut self) -> Result<()> {
        let mut returns = Vec::new();
        let mut unreachables = Vec::new();
        let mut resumes = Vec::new();

        for (bb_index, block) in self.lir_fun.blocks.iter().enumerate() {
            let bb = bb_index as lir::BlockId;
            match &block.terminator {
                Terminator::Ret(_) => returns.push(bb),
                Terminator::Unreachable => unreachables.push(bb),
                Terminator::Resume(_) => resumes.push(bb),
                _ => {}
            }
        }

        self.return_bb = self.at_most_one(returns, "exit")?;
        self.unreachable_bb = self.at_most_one(unreachables, "unreachable")?;
        self.ehresume_bb = self.at_most_one(resumes, "ehresume")?;
        Ok(())
    }

    fn at_most_one(
        &self,
        blocks: Vec<lir::BlockId>,
        kind: &'static str,
    ) -> Result<Option<lir::BlockId>> {
        blocks
            .into_iter()
            .at_most_one()
            .map_err(|_| ImportError::MultipleSpecialBlocks {
                function: self.lir_fun.name.clone(),
                kind,
            })
    }

    /// Record the mapping of LIR parameters onto the parameter variables
    /// pre-created by `Code::new`.
    fn translate_parameters(&mut self) {
        let params = self.code.params.clone();
        for (index, var) in params.into_iter().enumerate() {
            let key = ValueKey::Param(index as u32);
            self.code.var_mut(var).name = self
                .lir_fun
                .param_names
                .get(index)
                .cloned()
                .flatten();
            self.mark_variable(key, var);
        }
    }

    /// BFS over the control-flow graph from the entry block. This order
    /// translates a value's definition before any non-PHI use.
    fn translate_basic_blocks(&mut self) -> Result<()> {
        let mut worklist = VecDeque::new();
        worklist.push_back(self.lir_fun.entry_block());

        while let Some(bb) = worklist.pop_front() {
            if self.blocks.contains_key(&bb) {
                continue;
            }
            self.translate_basic_block(bb)?;
            worklist.extend(self.lir_fun.block(bb).terminator.successors());
        }
        Ok(())
    }

    fn translate_basic_block(&mut self, bb: lir::BlockId) -> Result<()> {
        let lir_block = self.lir_fun.block(bb);
        let mut translation = BlockTranslation::new(&mut self.code, bb, lir_block.name.clone());

        if bb == self.lir_fun.entry_block() {
            translation.mark_entry_block(&mut self.code);
        }

        for inst in &lir_block.insts {
            self.translate_instruction(&mut translation, inst)?;
        }
        self.translate_terminator(&mut translation, &lir_block.terminator)?;

        if self.return_bb == Some(bb) {
            translation.mark_exit_block(&mut self.code)?;
        }
        if self.unreachable_bb == Some(bb) {
            translation.mark_unreachable_block(&mut self.code)?;
        }
        if self.ehresume_bb == Some(bb) {
            translation.mark_ehresume_block(&mut self.code)?;
        }

        self.blocks.insert(bb, translation);
        Ok(())
    }

    /// Deferred PHI pass: wire the incoming assignments into the input
    /// landing blocks. Iterates LIR blocks in definition order for
    /// deterministic output.
    fn translate_phi_nodes(&mut self) -> Result<()> {
        for bb_index in 0..self.lir_fun.blocks.len() {
            let bb = bb_index as lir::BlockId;
            if !self.blocks.contains_key(&bb) {
                continue;
            }
            for inst in &self.lir_fun.block(bb).insts {
                if let InstKind::Phi { incoming } = &inst.kind {
                    self.translate_phi_late(bb, inst.id, incoming)?;
                }
            }
        }
        Ok(())
    }

    /// Wire every output with a LIR successor to that successor's input
    /// landing block for this predecessor, or to its main block when it has
    /// no PHI-created inputs.
    fn link_basic_blocks(&mut self) -> Result<()> {
        for bb_index in 0..self.lir_fun.blocks.len() {
            let bb = bb_index as lir::BlockId;
            let Some(translation) = self.blocks.get(&bb) else {
                continue;
            };
            for output in &translation.outputs {
                let Some(succ) = output.succ else {
                    continue;
                };
                let succ_translation = self.blocks.get(&succ).ok_or_else(|| {
                    ImportError::Invariant("successor block has not been translated".to_string())
                })?;
                let dest = if succ_translation.inputs.is_empty() {
                    succ_translation.main
                } else {
                    *succ_translation.inputs.get(&bb).ok_or_else(|| {
                        ImportError::Invariant(
                            "missing phi input block for predecessor".to_string(),
                        )
                    })?
                };
                self.code.add_successor(output.block, dest);
            }
        }
        Ok(())
    }

    pub(crate) fn mark_variable(&mut self, key: ValueKey, var: air::VarId) {
        self.code.var_mut(var).frontend = Some(key);
        self.variables.insert(key, var);
    }

    pub(crate) fn inst_view(&self, id: lir::InstId) -> InstView<'m> {
        self.insts[&id]
    }

    /// LIR result type of an instruction or invoke.
    pub(crate) fn result_ty(&self, id: lir::InstId) -> lir::LirType {
        match self.inst_view(id) {
            InstView::Inst(inst) => inst.ty.clone(),
            InstView::Invoke(invoke) => invoke.ty.clone(),
        }
    }

    /// LIR type of a value in this function.
    pub(crate) fn value_ty(&self, value: &Value) -> Result<lir::LirType> {
        self.ctx
            .module
            .value_ty(self.lir_fun, value)
            .ok_or(ImportError::InvalidOperand { context: "value_ty" })
    }

    pub(crate) fn operand_ty(&self, operand: &air::Operand) -> AirType {
        self.code.operand_ty(&self.ctx.bundle, operand)
    }

    pub(crate) fn air_return_ty(&self) -> AirType {
        self.ctx.bundle.function(self.air_fun).return_type().clone()
    }
}

/// Operands of an instruction, in operand-number order. Callees come after
/// the arguments.
fn inst_operands(kind: &InstKind) -> Vec<&Value> {
    match kind {
        InstKind::Alloca { array_size, .. } => vec![array_size],
        InstKind::Load { ptr, .. } => vec![ptr],
        InstKind::Store { value, ptr, .. } => vec![value, ptr],
        InstKind::Call(call) => {
            let mut operands: Vec<&Value> = call.args.iter().collect();
            operands.push(&call.callee);
            operands
        }
        InstKind::Cast { operand, .. } => vec![operand],
        InstKind::Gep { base, indices } => {
            let mut operands = vec![base];
            operands.extend(indices);
            operands
        }
        InstKind::Binary { lhs, rhs, .. } | InstKind::Cmp { lhs, rhs, .. } => vec![lhs, rhs],
        InstKind::Phi { incoming } => incoming.iter().map(|(value, _)| value).collect(),
        InstKind::ExtractValue { aggregate, .. } => vec![aggregate],
        InstKind::InsertValue {
            aggregate, element, ..
        } => vec![aggregate, element],
        InstKind::LandingPad { .. } => Vec::new(),
        InstKind::Select {
            cond,
            if_true,
            if_false,
        } => vec![cond, if_true, if_false],
    }
}

fn term_operands(term: &Terminator) -> Vec<&Value> {
    match term {
        Terminator::Ret(Some(value)) => vec![value],
        Terminator::Ret(None) | Terminator::Br(_) | Terminator::Unreachable => Vec::new(),
        Terminator::CondBr { cond, .. } => vec![cond],
        Terminator::Invoke(invoke) => {
            let mut operands: Vec<&Value> = invoke.call.args.iter().collect();
            operands.push(&invoke.call.callee);
            operands
        }
        Terminator::Resume(value) => vec![value],
        Terminator::Switch { value, .. } => vec![value],
    }
}
