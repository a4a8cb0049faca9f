//! Per-block translation state: the fan-out/fan-in machine.
//!
//! Each LIR block translates to one main AIR block plus any number of
//! output, input and internal blocks. The outputs are the blocks currently
//! open for appending; comparisons split every output in two so that branch
//! conditions stay path-sensitive instead of being joined as values.

use std::collections::HashMap;

use airlift_core::air::{
    BlockId, Code, Operand, Predicate, Signedness, Statement, StatementKind, VarId,
};
use airlift_core::error::ImportError;
use airlift_core::{lir, Result};

/// A block from which outgoing control leaves the LIR block; `succ` is the
/// LIR successor it flows to (`None` until a branch is translated, or
/// forever for terminating outputs).
#[derive(Debug)]
pub(crate) struct BasicBlockOutput {
    pub block: BlockId,
    pub succ: Option<lir::BlockId>,
}

impl BasicBlockOutput {
    fn new(block: BlockId) -> Self {
        Self { block, succ: None }
    }
}

#[derive(Debug)]
pub(crate) struct BlockTranslation {
    pub source: lir::BlockId,
    /// The block successors of other LIR blocks point at by default.
    pub main: BlockId,
    pub outputs: Vec<BasicBlockOutput>,
    /// Per-LIR-predecessor landing blocks hosting PHI assignments. Lookup
    /// only; never iterated.
    pub inputs: HashMap<lir::BlockId, BlockId>,
    /// Closed blocks kept only for graph structure.
    pub internals: Vec<BlockId>,
}

impl BlockTranslation {
    pub fn new(code: &mut Code, source: lir::BlockId, name: Option<String>) -> Self {
        let main = code.new_block();
        let block = code.block_mut(main);
        block.name = name;
        block.frontend = Some(source);
        Self {
            source,
            main,
            outputs: vec![BasicBlockOutput::new(main)],
            inputs: HashMap::new(),
            internals: Vec::new(),
        }
    }

    pub fn mark_entry_block(&self, code: &mut Code) {
        code.entry = Some(self.main);
    }

    pub fn mark_exit_block(&self, code: &mut Code) -> Result<()> {
        self.check_single_output("exit")?;
        code.exit = Some(self.outputs[0].block);
        Ok(())
    }

    pub fn mark_unreachable_block(&self, code: &mut Code) -> Result<()> {
        self.check_single_output("unreachable")?;
        code.unreachable = Some(self.outputs[0].block);
        Ok(())
    }

    pub fn mark_ehresume_block(&self, code: &mut Code) -> Result<()> {
        self.check_single_output("ehresume")?;
        code.ehresume = Some(self.outputs[0].block);
        Ok(())
    }

    fn check_single_output(&self, kind: &str) -> Result<()> {
        if self.outputs.len() == 1 {
            Ok(())
        } else {
            Err(ImportError::Invariant(format!(
                "{} block has more than one output",
                kind
            )))
        }
    }

    /// Landing block for PHI assignments flowing in from `pred`, created on
    /// first request with a single edge into `main`.
    pub fn input_basic_block(&mut self, code: &mut Code, pred: lir::BlockId) -> BlockId {
        if let Some(&block) = self.inputs.get(&pred) {
            return block;
        }
        let block = code.new_block();
        code.add_successor(block, self.main);
        self.inputs.insert(pred, block);
        block
    }

    /// Close every open output into a fresh single successor. Called before
    /// appending anything other than a comparison, binary operation or
    /// branch: joining predicate fan-outs back with a value-carrying block
    /// would create the diamond shape that costs precision at abstract
    /// joins.
    pub fn merge_outputs(&mut self, code: &mut Code) {
        if self.outputs.len() < 2 {
            return;
        }

        let dest = code.new_block();
        for output in self.outputs.drain(..) {
            debug_assert!(output.succ.is_none());
            code.add_successor(output.block, dest);
            self.internals.push(output.block);
        }
        self.outputs.push(BasicBlockOutput::new(dest));
    }

    /// Append a statement to every open output. With a single output the
    /// statement is moved; otherwise each output gets a clone, provenance
    /// included.
    pub fn add_statement(&mut self, code: &mut Code, stmt: Statement) {
        if let [output] = self.outputs.as_slice() {
            code.push_stmt(output.block, stmt);
        } else {
            for output in &self.outputs {
                code.push_stmt(output.block, stmt.clone());
            }
        }
    }

    /// Close every output into two children: one carrying the comparison
    /// and `var := true`, the other the inverse comparison and
    /// `var := false`. The output count doubles per chained comparison.
    pub fn add_comparison(&mut self, code: &mut Code, var: VarId, cmp: Statement) {
        let prev_outputs = std::mem::take(&mut self.outputs);
        self.outputs.reserve(2 * prev_outputs.len());

        for output in prev_outputs {
            self.internals.push(output.block);
            self.add_comparison_output(code, output.block, cmp.clone(), var, true);
            self.add_comparison_output(code, output.block, inverse(&cmp), var, false);
        }
    }

    fn add_comparison_output(
        &mut self,
        code: &mut Code,
        src: BlockId,
        cmp: Statement,
        var: VarId,
        value: bool,
    ) {
        let frontend = cmp.frontend;
        let dest = code.new_block();
        code.push_stmt(dest, cmp);
        let assign = bool_assignment(code, var, value, frontend);
        code.push_stmt(dest, assign);
        code.add_successor(src, dest);
        self.outputs.push(BasicBlockOutput::new(dest));
    }

    pub fn add_unconditional_branching(&mut self, succ: lir::BlockId) {
        for output in &mut self.outputs {
            output.succ = Some(succ);
        }
    }

    /// Lower a conditional branch on `cond`. When every output ends with an
    /// assignment `cond := constant` (the fused case, coming from a
    /// comparison in the same block), the successors are selected from the
    /// constants and the assignments are dropped if the condition has no
    /// other use. Otherwise every output splits into a `cond == true` and a
    /// `cond == false` child.
    pub fn add_conditional_branching(
        &mut self,
        code: &mut Code,
        cond: VarId,
        if_true: lir::BlockId,
        if_false: lir::BlockId,
        cond_single_use: bool,
        frontend: Option<lir::InstId>,
    ) {
        let fused = self.outputs.iter().all(|output| {
            matches!(
                code.block(output.block).last(),
                Some(Statement {
                    kind: StatementKind::Assignment {
                        result,
                        operand: Operand::Int { .. },
                    },
                    ..
                }) if *result == cond
            )
        });

        if fused {
            for output in &mut self.outputs {
                let block = code.block_mut(output.block);
                let value = match block.last() {
                    Some(Statement {
                        kind:
                            StatementKind::Assignment {
                                operand: Operand::Int { value, .. },
                                ..
                            },
                        ..
                    }) => *value,
                    _ => unreachable!("fused outputs end with constant assignments"),
                };
                output.succ = Some(if value == 0 { if_false } else { if_true });
                if cond_single_use {
                    block.pop();
                }
            }
        } else {
            let prev_outputs = std::mem::take(&mut self.outputs);
            self.outputs.reserve(2 * prev_outputs.len());

            for output in prev_outputs {
                self.internals.push(output.block);
                self.add_conditional_output(
                    code,
                    output.block,
                    if_true,
                    cond,
                    true,
                    cond_single_use,
                    frontend,
                );
                self.add_conditional_output(
                    code,
                    output.block,
                    if_false,
                    cond,
                    false,
                    cond_single_use,
                    frontend,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_conditional_output(
        &mut self,
        code: &mut Code,
        src: BlockId,
        dest: lir::BlockId,
        cond: VarId,
        value: bool,
        cond_single_use: bool,
        frontend: Option<lir::InstId>,
    ) {
        let air_dest = code.new_block();

        if !cond_single_use {
            let cmp = bool_comparison(code, cond, value, frontend);
            code.push_stmt(air_dest, cmp);
        }

        code.add_successor(src, air_dest);
        self.outputs.push(BasicBlockOutput {
            block: air_dest,
            succ: Some(dest),
        });
    }

    /// Close every output (each ending with the just-emitted invoke) into a
    /// normal child and an exception child, and patch the invoke statement's
    /// destinations to point at them.
    pub fn add_invoke_branching(
        &mut self,
        code: &mut Code,
        normal: lir::BlockId,
        unwind: lir::BlockId,
    ) -> Result<()> {
        let prev_outputs = std::mem::take(&mut self.outputs);
        self.outputs.reserve(2 * prev_outputs.len());

        for output in prev_outputs {
            self.internals.push(output.block);

            let normal_bb = code.new_block();
            code.add_successor(output.block, normal_bb);
            self.outputs.push(BasicBlockOutput {
                block: normal_bb,
                succ: Some(normal),
            });

            let exception_bb = code.new_block();
            code.add_successor(output.block, exception_bb);
            self.outputs.push(BasicBlockOutput {
                block: exception_bb,
                succ: Some(unwind),
            });

            match code.block_mut(output.block).stmts.last_mut() {
                Some(Statement {
                    kind:
                        StatementKind::Invoke {
                            normal_dest,
                            exception_dest,
                            ..
                        },
                    ..
                }) => {
                    *normal_dest = normal_bb;
                    *exception_dest = exception_bb;
                }
                _ => {
                    return Err(ImportError::Invariant(
                        "invoke is not the last statement of its block".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}

fn inverse(cmp: &Statement) -> Statement {
    match &cmp.kind {
        StatementKind::Comparison { pred, lhs, rhs } => Statement {
            kind: StatementKind::Comparison {
                pred: pred.inverse(),
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            frontend: cmp.frontend,
        },
        _ => unreachable!("inverse of a non-comparison statement"),
    }
}

/// `var := 1` or `var := 0`, at the boolean variable's own type.
fn bool_assignment(
    code: &Code,
    var: VarId,
    value: bool,
    frontend: Option<lir::InstId>,
) -> Statement {
    let ty = code.var_ty(var).clone();
    debug_assert_eq!(ty.bit_width(), Some(1), "invalid bit-width for boolean");
    Statement {
        kind: StatementKind::Assignment {
            result: var,
            operand: Operand::Int {
                value: value.into(),
                ty,
            },
        },
        frontend,
    }
}

/// `var == 1` or `var == 0`, with the predicate family matching the boolean
/// variable's signedness.
fn bool_comparison(
    code: &Code,
    var: VarId,
    value: bool,
    frontend: Option<lir::InstId>,
) -> Statement {
    let ty = code.var_ty(var).clone();
    debug_assert_eq!(ty.bit_width(), Some(1), "invalid bit-width for boolean");
    let pred = match ty.sign() {
        Some(Signedness::Signed) => Predicate::SIEQ,
        _ => Predicate::UIEQ,
    };
    Statement {
        kind: StatementKind::Comparison {
            pred,
            lhs: Operand::Var(var),
            rhs: Operand::Int {
                value: value.into(),
                ty,
            },
        },
        frontend,
    }
}
