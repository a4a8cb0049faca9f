use pretty_assertions::assert_eq;

use airlift_core::lir::{
    Block, CallInst, CmpPred, DataLayout, Function, Global, InstKind, Instruction, LirType,
    Module, Terminator, Value,
};
use airlift_core::pretty::{pretty, PrettyOptions};
use airlift_import::{import_module, ImportOptions};

fn fn_ty(ret: LirType, params: Vec<LirType>) -> LirType {
    LirType::Function {
        return_type: Box::new(ret),
        param_types: params,
        is_variadic: false,
    }
}

/// A function with a comparison-driven diamond, a phi and a call: enough
/// surface to exercise fan-out, input landing blocks and operand casts at
/// once.
fn sample_module() -> Module {
    let mut max = Function::new(
        "max",
        fn_ty(LirType::I32, vec![LirType::I32, LirType::I32]),
    );
    max.blocks = vec![
        Block::new(
            vec![Instruction::new(
                1,
                LirType::I1,
                InstKind::Cmp {
                    pred: CmpPred::Sgt,
                    lhs: Value::Param(0),
                    rhs: Value::Param(1),
                },
            )],
            Terminator::CondBr {
                cond: Value::Inst(1),
                if_true: 1,
                if_false: 2,
            },
        ),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(
            vec![Instruction::new(
                2,
                LirType::I32,
                InstKind::Phi {
                    incoming: vec![(Value::Param(0), 1), (Value::Param(1), 2)],
                },
            )],
            Terminator::Ret(Some(Value::Inst(2))),
        ),
    ];

    let mut caller = Function::new("caller", fn_ty(LirType::I32, vec![LirType::I32]));
    caller.blocks = vec![Block::new(
        vec![Instruction::new(
            1,
            LirType::I32,
            InstKind::Call(CallInst::new(
                Value::Function(0),
                vec![Value::Param(0), Value::int(7, LirType::I32)],
            )),
        )],
        Terminator::Ret(Some(Value::Inst(1))),
    )];

    Module {
        functions: vec![max, caller],
        globals: vec![Global {
            name: "counter".to_string(),
            ty: LirType::I64,
            has_debug_info: false,
        }],
        data_layout: DataLayout::default(),
    }
}

#[test]
fn importing_twice_yields_identical_output() {
    let module = sample_module();

    let first = import_module(&module, ImportOptions::default()).expect("import should succeed");
    let second = import_module(&module, ImportOptions::default()).expect("import should succeed");

    assert_eq!(first, second);
    assert_eq!(
        pretty(&first, PrettyOptions::default()).to_string(),
        pretty(&second, PrettyOptions::default()).to_string()
    );
}

#[test]
fn imported_graph_stays_inside_its_code() {
    let module = sample_module();
    let bundle = import_module(&module, ImportOptions::default()).expect("import should succeed");

    for function in &bundle.functions {
        let Some(code) = &function.code else { continue };
        let block_count = code.blocks.len() as u32;
        for block in &code.blocks {
            for &succ in &block.successors {
                assert!(succ < block_count);
            }
        }
        for slot in [code.entry, code.exit, code.unreachable, code.ehresume] {
            if let Some(block) = slot {
                assert!(block < block_count);
            }
        }
        assert!(code.entry.is_some());
    }
}

#[test]
fn phi_assignments_target_the_phi_variable_type() {
    let module = sample_module();
    let bundle = import_module(&module, ImportOptions::default()).expect("import should succeed");

    let code = bundle.functions[0].code.as_ref().expect("max has a body");
    let mut assignment_count = 0;
    for block in &code.blocks {
        for stmt in &block.stmts {
            if let airlift_core::air::StatementKind::Assignment { result, operand } = &stmt.kind {
                assert_eq!(
                    code.var_ty(*result),
                    &code.operand_ty(&bundle, operand),
                    "phi incoming must match the result type"
                );
                assignment_count += 1;
            }
        }
    }
    assert_eq!(assignment_count, 2);
}
