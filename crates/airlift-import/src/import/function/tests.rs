use airlift_core::air::{self, AirType, Operand, Predicate, StatementKind, UnaryOp};
use airlift_core::error::ImportError;
use airlift_core::lir::{
    Block, CallInst, CmpPred, DataLayout, Function, InstKind, Instruction, InvokeTerm, LirType,
    Module, Terminator, Value,
};

use crate::import::{import_module, ImportOptions};

fn fn_ty(ret: LirType, params: Vec<LirType>) -> LirType {
    LirType::Function {
        return_type: Box::new(ret),
        param_types: params,
        is_variadic: false,
    }
}

fn module_with(functions: Vec<Function>) -> Module {
    Module {
        functions,
        globals: Vec::new(),
        data_layout: DataLayout::default(),
    }
}

fn import(module: &Module) -> air::Bundle {
    import_module(module, ImportOptions::default()).expect("import should succeed")
}

fn body(bundle: &air::Bundle, index: usize) -> &air::Code {
    bundle.functions[index].code.as_ref().expect("body expected")
}

fn icmp(id: u32, pred: CmpPred, lhs: Value, rhs: Value) -> Instruction {
    Instruction::new(id, LirType::I1, InstKind::Cmp { pred, lhs, rhs })
}

fn cond_br(cond: Value, if_true: u32, if_false: u32) -> Terminator {
    Terminator::CondBr {
        cond,
        if_true,
        if_false,
    }
}

#[test]
fn comparison_fuses_with_a_single_use_branch() {
    // entry: %c = icmp sgt i32 %x, 0; br i1 %c, %t, %f
    let mut fun = Function::new("test", fn_ty(LirType::Void, vec![LirType::I32]));
    fun.blocks = vec![
        Block::new(
            vec![icmp(
                1,
                CmpPred::Sgt,
                Value::Param(0),
                Value::int(0, LirType::I32),
            )],
            cond_br(Value::Inst(1), 1, 2),
        ),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(Vec::new(), Terminator::Ret(None)),
    ];

    let bundle = import(&module_with(vec![fun]));
    let code = body(&bundle, 0);

    assert_eq!(code.entry, Some(0));
    assert_eq!(code.exit, Some(5));
    assert!(code.blocks[0].stmts.is_empty());
    assert_eq!(code.blocks[0].successors, vec![1, 2]);

    // Each child holds a single comparison, no boolean assignment, and no
    // merge block exists between the compare and the branch.
    let expected = [(1u32, Predicate::SIGT, 3u32), (2, Predicate::SILE, 4)];
    for (block, pred, succ) in expected {
        let child = &code.blocks[block as usize];
        assert_eq!(child.stmts.len(), 1);
        match &child.stmts[0].kind {
            StatementKind::Comparison {
                pred: actual,
                lhs,
                rhs,
            } => {
                assert_eq!(*actual, pred);
                assert_eq!(*lhs, Operand::Var(0));
                assert_eq!(
                    *rhs,
                    Operand::Int {
                        value: 0,
                        ty: AirType::signed(32)
                    }
                );
            }
            other => panic!("expected a comparison, got {:?}", other),
        }
        assert_eq!(child.successors, vec![succ]);
    }
    assert_eq!(code.blocks.len(), 6);
}

#[test]
fn multi_use_comparison_keeps_assignments_and_recompares() {
    // entry: %c = icmp eq i32 %x, %y; br i1 %c, %t, %f
    // %t: %z = zext i1 %c to i32 (the second use of %c)
    let mut fun = Function::new(
        "test",
        fn_ty(LirType::Void, vec![LirType::I32, LirType::I32]),
    );
    fun.blocks = vec![
        Block::new(
            vec![icmp(1, CmpPred::Eq, Value::Param(0), Value::Param(1))],
            cond_br(Value::Inst(1), 1, 2),
        ),
        Block::new(
            vec![Instruction::new(
                2,
                LirType::I32,
                InstKind::Cast {
                    op: airlift_core::lir::CastOp::ZExt,
                    operand: Value::Inst(1),
                },
            )],
            Terminator::Br(3),
        ),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(Vec::new(), Terminator::Ret(None)),
    ];

    let bundle = import(&module_with(vec![fun]));
    let code = body(&bundle, 0);

    // %c is a real boolean variable: the fan-out children keep their
    // assignments, and the condition hints make it unsigned.
    for (block, pred, value) in [(1usize, Predicate::SIEQ, 1i128), (2, Predicate::SINE, 0)] {
        let child = &code.blocks[block];
        assert_eq!(child.stmts.len(), 2);
        assert!(matches!(
            &child.stmts[0].kind,
            StatementKind::Comparison { pred: actual, .. } if *actual == pred
        ));
        match &child.stmts[1].kind {
            StatementKind::Assignment { result, operand } => {
                assert_eq!(*result, 2);
                assert_eq!(
                    *operand,
                    Operand::Int {
                        value,
                        ty: AirType::unsigned(1)
                    }
                );
            }
            other => panic!("expected an assignment, got {:?}", other),
        }
    }

    // The zext consumes %c at its recorded unsigned type.
    let true_block = &code.blocks[3];
    assert!(matches!(
        &true_block.stmts[0].kind,
        StatementKind::Unary {
            op: UnaryOp::ZExt,
            operand: Operand::Var(2),
            ..
        }
    ));
}

#[test]
fn side_effects_after_a_comparison_merge_the_outputs() {
    // entry: %c = icmp slt i32 %a, %b; %p = load i32* %q; br i1 %c, %t, %f
    let mut fun = Function::new(
        "test",
        fn_ty(
            LirType::Void,
            vec![
                LirType::I32,
                LirType::I32,
                LirType::pointer_to(LirType::I32),
            ],
        ),
    );
    fun.blocks = vec![
        Block::new(
            vec![
                icmp(1, CmpPred::Slt, Value::Param(0), Value::Param(1)),
                Instruction::new(
                    2,
                    LirType::I32,
                    InstKind::Load {
                        ptr: Value::Param(2),
                        align: 4,
                        volatile: false,
                    },
                ),
            ],
            cond_br(Value::Inst(1), 1, 2),
        ),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(Vec::new(), Terminator::Ret(None)),
    ];

    let bundle = import(&module_with(vec![fun]));
    let code = body(&bundle, 0);

    // The comparison fans out into blocks 1 and 2; the load forces a merge
    // block 3; the branch then fans out from the merge block.
    for block in [1usize, 2] {
        assert_eq!(code.blocks[block].stmts.len(), 2);
        assert_eq!(code.blocks[block].successors, vec![3]);
    }
    let merge = &code.blocks[3];
    assert_eq!(merge.stmts.len(), 1);
    assert!(matches!(merge.stmts[0].kind, StatementKind::Load { .. }));
    assert_eq!(merge.successors, vec![4, 5]);

    // %c has no use besides the branch, so the branch children carry no
    // guard comparison.
    assert!(code.blocks[4].stmts.is_empty());
    assert!(code.blocks[5].stmts.is_empty());
}

#[test]
fn chained_comparisons_double_the_outputs() {
    let mut fun = Function::new(
        "test",
        fn_ty(LirType::Void, vec![LirType::I32, LirType::I32]),
    );
    fun.blocks = vec![
        Block::new(
            vec![
                icmp(1, CmpPred::Slt, Value::Param(0), Value::Param(1)),
                icmp(2, CmpPred::Sgt, Value::Param(0), Value::int(0, LirType::I32)),
            ],
            Terminator::Br(1),
        ),
        Block::new(Vec::new(), Terminator::Ret(None)),
    ];

    let bundle = import(&module_with(vec![fun]));
    let code = body(&bundle, 0);

    // First comparison: blocks 1, 2. Second: blocks 3..=6, two per previous
    // output, with mutually inverse predicates.
    let successor_main = 7u32;
    for block in [3usize, 4, 5, 6] {
        let child = &code.blocks[block];
        assert_eq!(child.stmts.len(), 2);
        assert_eq!(child.successors, vec![successor_main]);
    }
    let preds: Vec<Predicate> = [3usize, 4, 5, 6]
        .iter()
        .map(|&block| match &code.blocks[block].stmts[0].kind {
            StatementKind::Comparison { pred, .. } => *pred,
            other => panic!("expected a comparison, got {:?}", other),
        })
        .collect();
    assert_eq!(
        preds,
        vec![
            Predicate::SIGT,
            Predicate::SILE,
            Predicate::SIGT,
            Predicate::SILE
        ]
    );
}

#[test]
fn invoke_branches_to_patched_children() {
    // %r = invoke i32 @foo(i32 %x) to label %n unwind label %u
    let mut test = Function::new("test", fn_ty(LirType::Void, vec![LirType::I32]));
    test.blocks = vec![
        Block::new(
            Vec::new(),
            Terminator::Invoke(InvokeTerm {
                id: 1,
                ty: LirType::I32,
                call: CallInst::new(Value::Function(1), vec![Value::Param(0)]),
                normal: 1,
                unwind: 2,
            }),
        ),
        Block::new(Vec::new(), Terminator::Ret(None)),
        Block::new(
            vec![Instruction::new(
                2,
                LirType::Struct {
                    fields: vec![LirType::pointer_to(LirType::I8), LirType::I32],
                    packed: false,
                    name: None,
                },
                InstKind::LandingPad { cleanup: true },
            )],
            Terminator::Resume(Value::Inst(2)),
        ),
    ];
    let foo = Function::new("foo", fn_ty(LirType::I32, vec![LirType::I32]));

    let bundle = import(&module_with(vec![test, foo]));
    let code = body(&bundle, 0);

    // The invoke statement's destinations are patched to the two children,
    // which link to the normal and unwind blocks.
    match &code.blocks[0].stmts[0].kind {
        StatementKind::Invoke {
            result,
            callee,
            normal_dest,
            exception_dest,
            ..
        } => {
            assert!(result.is_some());
            assert_eq!(*callee, Operand::FunctionPtr(1));
            assert_eq!(*normal_dest, 1);
            assert_eq!(*exception_dest, 2);
        }
        other => panic!("expected an invoke, got {:?}", other),
    }
    assert_eq!(code.blocks[0].successors, vec![1, 2]);
    assert_eq!(code.blocks[1].successors, vec![3]);
    assert_eq!(code.blocks[2].successors, vec![4]);

    assert_eq!(code.exit, Some(3));
    assert_eq!(code.ehresume, Some(4));
    let eh = &code.blocks[4];
    assert!(matches!(eh.stmts[0].kind, StatementKind::LandingPad { .. }));
    assert!(matches!(eh.stmts[1].kind, StatementKind::Resume { .. }));
}

#[test]
fn phi_incomings_reconcile_with_assignment_or_bitcast() {
    // %a is loaded as i8* but inferred as i32* from a direct call; the phi
    // result stays i8*, so one incoming needs a bitcast and the other is a
    // plain assignment.
    let mut test = Function::new(
        "test",
        fn_ty(
            LirType::pointer_to(LirType::I8),
            vec![
                LirType::I1,
                LirType::pointer_to(LirType::pointer_to(LirType::I8)),
                LirType::pointer_to(LirType::I8),
            ],
        ),
    );
    test.blocks = vec![
        Block::new(Vec::new(), cond_br(Value::Param(0), 1, 2)),
        Block::new(
            vec![
                Instruction::new(
                    1,
                    LirType::pointer_to(LirType::I8),
                    InstKind::Load {
                        ptr: Value::Param(1),
                        align: 8,
                        volatile: false,
                    },
                ),
                Instruction::new(
                    2,
                    LirType::Void,
                    InstKind::Call(CallInst::new(Value::Function(1), vec![Value::Inst(1)])),
                ),
            ],
            Terminator::Br(3),
        ),
        Block::new(Vec::new(), Terminator::Br(3)),
        Block::new(
            vec![Instruction::new(
                3,
                LirType::pointer_to(LirType::I8),
                InstKind::Phi {
                    incoming: vec![(Value::Inst(1), 1), (Value::Param(2), 2)],
                },
            )],
            Terminator::Ret(Some(Value::Inst(3))),
        ),
    ];
    let sink = Function::new(
        "sink",
        fn_ty(
            LirType::Void,
            vec![LirType::pointer_to(LirType::I32)],
        ),
    );

    let bundle = import(&module_with(vec![test, sink]));
    let code = body(&bundle, 0);

    // %a took the callee's parameter type.
    let phi_var = code
        .blocks
        .iter()
        .flat_map(|block| &block.stmts)
        .find_map(|stmt| match &stmt.kind {
            StatementKind::ReturnValue {
                operand: Some(Operand::Var(var)),
            } => Some(*var),
            _ => None,
        })
        .expect("return of the phi result");
    assert_eq!(
        *code.var_ty(phi_var),
        AirType::pointer_to(AirType::signed(8))
    );

    // Input landing blocks: a bitcast from the i32* incoming, an assignment
    // from the matching parameter.
    let mut bitcasts = 0;
    let mut assignments = 0;
    for block in &code.blocks {
        for stmt in &block.stmts {
            match &stmt.kind {
                StatementKind::Unary {
                    op: UnaryOp::Bitcast,
                    result,
                    ..
                } if *result == phi_var => {
                    bitcasts += 1;
                    assert_eq!(block.successors.len(), 1);
                }
                StatementKind::Assignment { result, operand } if *result == phi_var => {
                    assignments += 1;
                    assert_eq!(*operand, Operand::Var(2));
                    assert_eq!(block.successors.len(), 1);
                }
                _ => {}
            }
        }
    }
    assert_eq!(bitcasts, 1);
    assert_eq!(assignments, 1);
}

#[test]
fn multiple_returns_are_rejected() {
    let mut fun = Function::new("twice", fn_ty(LirType::Void, vec![LirType::I1]));
    fun.blocks = vec![
        Block::new(Vec::new(), cond_br(Value::Param(0), 1, 2)),
        Block::new(Vec::new(), Terminator::Ret(None)),
        Block::new(Vec::new(), Terminator::Ret(None)),
    ];

    let err = import_module(&module_with(vec![fun]), ImportOptions::default())
        .expect_err("two returns cannot be imported");
    assert!(matches!(err, ImportError::MultipleSpecialBlocks { .. }));
    assert!(err.to_string().contains("more than one exit block"));
}

#[test]
fn debug_scored_call_hint_beats_structural_hints() {
    // %v = load i32; udiv prefers unsigned (score 5) but the call to a
    // function with debug info pins the signed parameter type (score 1000).
    let mut test = Function::new(
        "test",
        fn_ty(LirType::Void, vec![LirType::pointer_to(LirType::I32)]),
    );
    test.blocks = vec![Block::new(
        vec![
            Instruction::new(
                1,
                LirType::I32,
                InstKind::Load {
                    ptr: Value::Param(0),
                    align: 4,
                    volatile: false,
                },
            ),
            Instruction::new(
                2,
                LirType::I32,
                InstKind::Binary {
                    op: airlift_core::lir::BinaryOp::UDiv,
                    lhs: Value::Inst(1),
                    rhs: Value::int(2, LirType::I32),
                    nsw: false,
                    nuw: false,
                    exact: false,
                },
            ),
            Instruction::new(
                3,
                LirType::Void,
                InstKind::Call(CallInst::new(Value::Function(1), vec![Value::Inst(1)])),
            ),
        ],
        Terminator::Ret(None),
    )];
    let mut consume = Function::new("consume", fn_ty(LirType::Void, vec![LirType::I32]));
    consume.has_subprogram = true;

    let bundle = import(&module_with(vec![test, consume]));
    let code = body(&bundle, 0);
    let entry = &code.blocks[0];

    // load result is signed; the udiv operand gets an explicit bitcast and
    // the unsigned division result is cast back.
    let load_var = match &entry.stmts[0].kind {
        StatementKind::Load { result, .. } => *result,
        other => panic!("expected a load, got {:?}", other),
    };
    assert_eq!(*code.var_ty(load_var), AirType::signed(32));

    assert!(matches!(
        &entry.stmts[1].kind,
        StatementKind::Unary {
            op: UnaryOp::Bitcast,
            operand: Operand::Var(source),
            ..
        } if *source == load_var
    ));
    match &entry.stmts[2].kind {
        StatementKind::Binary {
            op, result, rhs, ..
        } => {
            assert_eq!(*op, air::BinaryOp::UDiv);
            assert_eq!(*code.var_ty(*result), AirType::unsigned(32));
            assert_eq!(
                *rhs,
                Operand::Int {
                    value: 2,
                    ty: AirType::unsigned(32)
                }
            );
        }
        other => panic!("expected a division, got {:?}", other),
    }
    assert!(matches!(
        &entry.stmts[3].kind,
        StatementKind::Unary {
            op: UnaryOp::Bitcast,
            ..
        }
    ));

    // Round-trip: the call argument keeps the declared parameter type.
    match &entry.stmts[4].kind {
        StatementKind::Call { args, .. } => {
            assert_eq!(args, &vec![Operand::Var(load_var)]);
        }
        other => panic!("expected a call, got {:?}", other),
    }
}

#[test]
fn alloca_count_gets_an_integer_cast_chain() {
    // alloca i32, i8 %n: the count is widened at its own signedness, then
    // sign-bitcast to the unsigned size type.
    let mut fun = Function::new("test", fn_ty(LirType::Void, vec![LirType::I8]));
    fun.blocks = vec![Block::new(
        vec![Instruction::new(
            1,
            LirType::pointer_to(LirType::I32),
            InstKind::Alloca {
                allocated_ty: LirType::I32,
                array_size: Value::Param(0),
                align: 4,
            },
        )],
        Terminator::Ret(None),
    )];

    let bundle = import(&module_with(vec![fun]));
    let code = body(&bundle, 0);
    let entry = &code.blocks[0];

    assert!(matches!(
        &entry.stmts[0].kind,
        StatementKind::Unary {
            op: UnaryOp::SExt,
            operand: Operand::Var(0),
            ..
        }
    ));
    match &entry.stmts[1].kind {
        StatementKind::Unary {
            op: UnaryOp::Bitcast,
            result,
            ..
        } => assert_eq!(*code.var_ty(*result), AirType::unsigned(64)),
        other => panic!("expected a bitcast, got {:?}", other),
    }
    match &entry.stmts[2].kind {
        StatementKind::Allocate {
            allocated_ty,
            count,
            ..
        } => {
            assert_eq!(*allocated_ty, AirType::signed(32));
            assert!(matches!(count, Operand::Var(_)));
        }
        other => panic!("expected an allocate, got {:?}", other),
    }
}

#[test]
fn gep_struct_fields_become_byte_offsets() {
    // %g = getelementptr {i8, i32}* %s, i64 0, i32 1
    let struct_ty = LirType::Struct {
        fields: vec![LirType::I8, LirType::I32],
        packed: false,
        name: None,
    };
    let mut fun = Function::new(
        "test",
        fn_ty(LirType::Void, vec![LirType::pointer_to(struct_ty.clone())]),
    );
    fun.blocks = vec![Block::new(
        vec![Instruction::new(
            1,
            LirType::pointer_to(LirType::I32),
            InstKind::Gep {
                base: Value::Param(0),
                indices: vec![
                    Value::int(0, LirType::I64),
                    Value::int(1, LirType::I32),
                ],
            },
        )],
        Terminator::Ret(None),
    )];

    let bundle = import(&module_with(vec![fun]));
    let code = body(&bundle, 0);

    match &code.blocks[0].stmts[0].kind {
        StatementKind::PointerShift { base, terms, .. } => {
            assert_eq!(*base, Operand::Var(0));
            // First index strides over the whole struct (8 bytes); the
            // field index becomes a unit-stride byte offset.
            assert_eq!(terms.len(), 2);
            assert_eq!(terms[0].0, 8);
            assert_eq!(
                terms[0].1,
                Operand::Int {
                    value: 0,
                    ty: AirType::unsigned(64)
                }
            );
            assert_eq!(terms[1].0, 1);
            assert_eq!(
                terms[1].1,
                Operand::Int {
                    value: 4,
                    ty: AirType::unsigned(64)
                }
            );
        }
        other => panic!("expected a pointer shift, got {:?}", other),
    }
}

#[test]
fn sign_from_wraps_is_fixed() {
    use airlift_core::air::Signedness;

    use super::hint::sign_from_wraps;

    assert_eq!(sign_from_wraps(false, true), Signedness::Unsigned);
    assert_eq!(sign_from_wraps(true, false), Signedness::Signed);
    // Both flags only appear after aggressive optimization; signed is the
    // fixed choice.
    assert_eq!(sign_from_wraps(true, true), Signedness::Signed);
    // Untagged arithmetic is unsigned.
    assert_eq!(sign_from_wraps(false, false), Signedness::Unsigned);
}

#[test]
fn select_and_switch_are_rejected() {
    let mut with_select = Function::new(
        "sel",
        fn_ty(LirType::I32, vec![LirType::I1, LirType::I32, LirType::I32]),
    );
    with_select.blocks = vec![Block::new(
        vec![Instruction::new(
            1,
            LirType::I32,
            InstKind::Select {
                cond: Value::Param(0),
                if_true: Value::Param(1),
                if_false: Value::Param(2),
            },
        )],
        Terminator::Ret(Some(Value::Inst(1))),
    )];
    let err = import_module(&module_with(vec![with_select]), ImportOptions::default())
        .expect_err("select must be lowered first");
    assert!(matches!(err, ImportError::SelectNotSupported));

    let mut with_switch = Function::new("sw", fn_ty(LirType::Void, vec![LirType::I32]));
    with_switch.blocks = vec![
        Block::new(
            Vec::new(),
            Terminator::Switch {
                value: Value::Param(0),
                default: 1,
                cases: vec![(0, 1)],
            },
        ),
        Block::new(Vec::new(), Terminator::Ret(None)),
    ];
    let err = import_module(&module_with(vec![with_switch]), ImportOptions::default())
        .expect_err("switch must be lowered first");
    assert!(matches!(err, ImportError::SwitchNotSupported));
}
