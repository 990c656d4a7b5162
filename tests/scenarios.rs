//! End-to-end scenarios driving the fixpoint over small hand-built CFGs,
//! exercising the same checks a real front-end/checker pairing would make.

use im::Vector;

use ar_absint::{
    domain::Nullity,
    ir::{
        BinaryOp,
        Block,
        BlockId,
        CallingContext,
        Cfg,
        ComparisonOp,
        DataLayout,
        EdgeKind,
        Instruction,
        Lifetime,
        Scalar,
        Ty,
        VariableData,
        VariableId,
    },
    num::{
        Bound,
        MachineInt,
        Sign,
    },
    prelude::*,
};

fn fresh_var(ctx: &AnalysisContext, ty: Ty) -> VariableId {
    ctx.intern_variable(VariableData::source(ty))
}

fn word() -> Ty {
    Ty::MachineInt {
        bit_width: 32,
        sign: Sign::Unsigned,
    }
}

fn word_s() -> Ty {
    Ty::MachineInt {
        bit_width: 32,
        sign: Sign::Signed,
    }
}

fn mi(v: i128, ty: Ty) -> Scalar {
    match ty {
        Ty::MachineInt { bit_width, sign } => Scalar::MachineInt(MachineInt::new(v, bit_width, sign)),
        _ => unreachable!(),
    }
}

fn engine(ctx: &AnalysisContext) -> Engine<'_> {
    Engine::new(DataLayout::x86_64(), ctx, CallingContext(0))
}

fn analyze(cfg: &Cfg, engine: &Engine<'_>, resolver: &dyn CallResolver) -> std::collections::BTreeMap<BlockId, Invariant> {
    let driver = Driver::new(AnalysisConfig::default(), resolver);
    let mut budget = StepBudget::new(10_000);
    driver.analyze_function(engine, cfg, &mut budget).unwrap()
}

/// §8: an unannotated integer overflow with a `NoWrap` annotation kills the
/// offending path rather than silently wrapping.
#[test]
fn no_wrap_overflow_kills_normal_flow() {
    let ctx = AnalysisContext::new();
    let eng = engine(&ctx);

    let x = fresh_var(&ctx, word_s());
    let y = fresh_var(&ctx, word_s());
    let z = fresh_var(&ctx, word_s());

    let mut b = Cfg::builder();
    b.push_block(
        Block::new()
            .with_instruction(Instruction::Assignment {
                lhs: x,
                rhs: mi(i128::from(i32::MAX), word_s()),
            })
            .with_instruction(Instruction::Assignment { lhs: y, rhs: mi(1, word_s()) })
            .with_instruction(Instruction::BinaryOp {
                op: BinaryOp::AddNoWrap,
                lhs: z,
                left: Scalar::MachineIntVar(x),
                right: Scalar::MachineIntVar(y),
            }),
    );
    let cfg = b.build();

    let invariants = analyze(&cfg, &eng, &AlwaysUnknown);
    let checker = Checker::new(&invariants[&cfg.entry()]);
    assert!(checker.is_normal_flow_bottom());
}

/// §8: assigning the null literal is visible to the checker's
/// `nullity_to_nullity` query.
#[test]
fn null_assignment_is_visible_to_nullity_query() {
    let ctx = AnalysisContext::new();
    let eng = engine(&ctx);
    let p = fresh_var(&ctx, Ty::opaque_pointer());

    let mut b = Cfg::builder();
    b.push_block(Block::new().with_instruction(Instruction::Assignment {
        lhs: p,
        rhs: Scalar::Null,
    }));
    let cfg = b.build();

    let invariants = analyze(&cfg, &eng, &AlwaysUnknown);
    let checker = Checker::new(&invariants[&cfg.entry()]);
    assert_eq!(checker.nullity_to_nullity(p), Nullity::Null);
    assert!(!checker.is_normal_flow_bottom());
}

struct IntrinsicByConst;

impl CallResolver for IntrinsicByConst {
    fn resolve(&self, callee: &Scalar) -> CallTarget {
        match callee {
            Scalar::MachineInt(mi) => match mi.to_integer() {
                1 => CallTarget::Intrinsic(Intrinsic::Malloc),
                2 => CallTarget::Intrinsic(Intrinsic::Free),
                3 => CallTarget::Intrinsic(Intrinsic::Throw),
                _ => CallTarget::Unknown { pure: false },
            },
            _ => CallTarget::Unknown { pure: false },
        }
    }
}

fn callee_const(n: i128) -> Scalar {
    Scalar::MachineInt(MachineInt::new(n, 32, Sign::Unsigned))
}

/// §8: malloc, store, free, then a second store through the same pointer is
/// a use-after-free — the block's post-invariant collapses to bottom, and
/// the checker's `lifetime` query reports the location deallocated at the
/// point of the free.
#[test]
fn malloc_store_free_store_is_use_after_free() {
    let ctx = AnalysisContext::new();
    let eng = engine(&ctx);

    let p = fresh_var(&ctx, Ty::opaque_pointer());
    let size = fresh_var(&ctx, word());
    let val = fresh_var(&ctx, word_s());

    let mut b = Cfg::builder();
    let malloc_blk = b.push_block(
        Block::new()
            .with_instruction(Instruction::Assignment { lhs: size, rhs: mi(40, word()) })
            .with_instruction(Instruction::Call {
                lhs: Some(p),
                callee: callee_const(1),
                args: Vector::unit(Scalar::MachineIntVar(size)),
                has_exception_edge: false,
            })
            .with_successor(BlockId(1), EdgeKind::Normal),
    );
    let store_blk = b.push_block(
        Block::new()
            .with_instruction(Instruction::Assignment { lhs: val, rhs: mi(1, word_s()) })
            .with_instruction(Instruction::Store {
                ptr: p,
                value: Scalar::MachineIntVar(val),
                size: 4,
                volatile: false,
            })
            .with_successor(BlockId(2), EdgeKind::Normal),
    );
    let free_blk = b.push_block(
        Block::new()
            .with_instruction(Instruction::Call {
                lhs: None,
                callee: callee_const(2),
                args: Vector::unit(Scalar::PointerVar(p)),
                has_exception_edge: false,
            })
            .with_successor(BlockId(3), EdgeKind::Normal),
    );
    let uaf_blk = b.push_block(Block::new().with_instruction(Instruction::Store {
        ptr: p,
        value: mi(2, word_s()),
        size: 4,
        volatile: false,
    }));
    let cfg = b.build();
    assert_eq!((malloc_blk, store_blk, free_blk, uaf_blk), (BlockId(0), BlockId(1), BlockId(2), BlockId(3)));

    let invariants = analyze(&cfg, &eng, &IntrinsicByConst);

    let after_malloc = Checker::new(&invariants[&malloc_blk]);
    let loc = after_malloc
        .pointer_to_points_to(p)
        .as_singleton()
        .expect("malloc must produce a precise singleton location");

    let after_free = Checker::new(&invariants[&free_blk]);
    assert_eq!(after_free.lifetime(loc), Lifetime::Deallocated);

    let after_second_store = Checker::new(&invariants[&uaf_blk]);
    assert!(after_second_store.is_normal_flow_bottom());
}

/// §8: a thrown exception skips the normal successor entirely and is only
/// observable, post-`LandingPad`, in the handler block.
#[test]
fn throw_is_caught_by_landing_pad_not_the_normal_successor() {
    let ctx = AnalysisContext::new();
    let eng = engine(&ctx);
    let exc = fresh_var(&ctx, Ty::opaque_pointer());
    let caught = fresh_var(&ctx, Ty::opaque_pointer());

    let mut b = Cfg::builder();
    b.push_block(
        Block::new()
            .with_instruction(Instruction::Call {
                lhs: None,
                callee: callee_const(3),
                args: Vector::unit(Scalar::PointerVar(exc)),
                has_exception_edge: true,
            })
            .with_successor(BlockId(1), EdgeKind::Normal)
            .with_successor(BlockId(2), EdgeKind::Exception),
    );
    b.push_block(Block::new().with_instruction(Instruction::Return { value: None }));
    b.push_block(
        Block::new()
            .with_instruction(Instruction::LandingPad { exc_var: caught })
            .with_instruction(Instruction::Return { value: None }),
    );
    let cfg = b.build();

    let invariants = analyze(&cfg, &eng, &IntrinsicByConst);

    let normal_successor = Checker::new(&invariants[&BlockId(1)]);
    assert!(normal_successor.is_normal_flow_bottom());

    let handler_entry = join_at(&cfg, &eng, BlockId(2), &invariants, &IntrinsicByConst);
    let handler_checker = Checker::new(&handler_entry);
    assert!(!handler_checker.is_normal_flow_bottom());
}

// Re-derive the invariant flowing into `block` for assertions that need the
// pre-state rather than the post-state the driver records.
fn join_at(
    cfg: &Cfg,
    _engine: &Engine<'_>,
    block: BlockId,
    invariants: &std::collections::BTreeMap<BlockId, Invariant>,
    _resolver: &dyn CallResolver,
) -> Invariant {
    let entry = cfg.entry();
    let mut acc = if block == entry { entry_invariant() } else { Invariant::bottom() };
    for pred in cfg.predecessors(block) {
        let Some(pred_inv) = invariants.get(&pred) else { continue };
        let edge_kind = cfg.block(pred).successors().find(|(to, _)| *to == block).map(|(_, k)| k);
        let incoming = match edge_kind {
            Some(EdgeKind::Exception) => Invariant {
                normal: PartitionedState::bottom(),
                caught: PartitionedState::bottom(),
                propagated: pred_inv.propagated.clone(),
            },
            _ => Invariant {
                normal: pred_inv.normal.clone(),
                caught: PartitionedState::bottom(),
                propagated: PartitionedState::bottom(),
            },
        };
        acc = acc.join(&incoming);
    }
    acc
}

/// §8: a gauge-ish loop invariant — threshold widening snaps a growing
/// bound to a syntactic constant in the program instead of diverging to
/// infinity.
#[test]
fn loop_with_constant_bound_widens_to_threshold_not_infinity() {
    let ctx = AnalysisContext::new();
    let eng = engine(&ctx);
    let counter = fresh_var(&ctx, word());
    let cmp_result = fresh_var(&ctx, word());

    let mut b = Cfg::builder();
    b.push_block(
        Block::new()
            .with_instruction(Instruction::Assignment { lhs: counter, rhs: mi(0, word()) })
            .with_successor(BlockId(1), EdgeKind::Normal),
    );
    b.push_block(
        Block::new()
            .with_instruction(Instruction::Comparison {
                pred: ComparisonOp::Lt,
                lhs: cmp_result,
                left: Scalar::MachineIntVar(counter),
                right: mi(10, word()),
            })
            .with_successor(BlockId(2), EdgeKind::Normal),
    );
    b.push_block(
        Block::new()
            .with_instruction(Instruction::BinaryOp {
                op: BinaryOp::Add,
                lhs: counter,
                left: Scalar::MachineIntVar(counter),
                right: mi(1, word()),
            })
            .with_successor(BlockId(1), EdgeKind::Normal),
    );
    let cfg = b.build();

    let invariants = analyze(&cfg, &eng, &AlwaysUnknown);
    let checker = Checker::new(&invariants[&BlockId(1)]);
    let interval = checker.int_to_interval(counter);
    assert_ne!(interval.hi(), Some(Bound::PlusInfinity));
}

struct CounterIntrinsics;

impl CallResolver for CounterIntrinsics {
    fn resolve(&self, callee: &Scalar) -> CallTarget {
        match callee {
            Scalar::MachineInt(mi) => match mi.to_integer() {
                1 => CallTarget::Intrinsic(Intrinsic::IkosCounterInit),
                2 => CallTarget::Intrinsic(Intrinsic::IkosCounterIncr),
                _ => CallTarget::Unknown { pure: false },
            },
            _ => CallTarget::Unknown { pure: false },
        }
    }
}

/// §8 scenario 6: `ikos.counter.init`/`ikos.counter.incr` designate `i` a
/// gauge-tracked loop counter, so `i`'s own gauge stays the identity `[k, k]`
/// through an increment instead of collapsing to an uninformative top.
#[test]
fn counter_init_then_incr_keeps_an_affine_gauge() {
    let ctx = AnalysisContext::new();
    let eng = engine(&ctx);
    let i = fresh_var(&ctx, word());

    let mut b = Cfg::builder();
    b.push_block(
        Block::new()
            .with_instruction(Instruction::Call {
                lhs: None,
                callee: callee_const(1),
                args: Vector::unit(Scalar::MachineIntVar(i)),
                has_exception_edge: false,
            })
            .with_instruction(Instruction::Call {
                lhs: None,
                callee: callee_const(2),
                args: Vector::unit(Scalar::MachineIntVar(i)),
                has_exception_edge: false,
            }),
    );
    let cfg = b.build();

    let invariants = analyze(&cfg, &eng, &CounterIntrinsics);
    let checker = Checker::new(&invariants[&cfg.entry()]);
    assert!(!checker.gauge_to_gauge(i).is_top());
}
