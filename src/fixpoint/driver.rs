//! The fixpoint driver (Â§4.10, Â§5): iterates a function's CFG in weak
//! topological order, applying widening at each loop head after a
//! configured delay and narrowing the result afterward.

use alloc::{
    collections::BTreeMap,
    vec::Vec,
};

use crate::{
    config::AnalysisConfig,
    domain::{
        lattice::AbstractDomain,
        state::{
            entry_invariant,
            Invariant,
            PartitionedState,
        },
    },
    engine::{
        call::CallTarget,
        Engine,
    },
    error::{
        AnalysisResult,
        AnalyzerBug,
    },
    fixpoint::wto::{
        self,
        Wto,
        WtoComponent,
    },
    ir::{
        cfg::{
            BlockId,
            Cfg,
            EdgeKind,
        },
        instruction::Instruction,
        literal::Scalar,
    },
};

/// Ticked once per block visited (Â§5's "opaque budget hook"). Returning
/// `true` aborts the current function's fixpoint with
/// [`AnalyzerBug::FixpointBudgetExceeded`]; the driver does not interpret
/// what "exhausted" means, leaving that to the caller (wall-clock, step
/// count, whatever it wants to tie to this hook).
pub trait Budget {
    /// Returns `true` once the budget is exhausted.
    fn tick(&mut self) -> bool;
}

/// A budget that never trips.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unbounded;

impl Budget for Unbounded {
    fn tick(&mut self) -> bool {
        false
    }
}

/// A simple step-counting budget.
#[derive(Debug, Clone, Copy)]
pub struct StepBudget {
    remaining: u64,
}

impl StepBudget {
    /// A budget good for `steps` block visits.
    pub fn new(steps: u64) -> Self {
        Self { remaining: steps }
    }
}

impl Budget for StepBudget {
    fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        false
    }
}

/// Classifies a `Call`/`Invoke` instruction's callee scalar. Interprocedural
/// call-graph resolution is a front-end concern (Â§6); the driver only needs
/// this classification to hand off to [`crate::engine::call`].
pub trait CallResolver {
    /// Classify `callee` for the purposes of call handling.
    fn resolve(&self, callee: &Scalar) -> CallTarget;
}

/// A resolver that treats every call as an unknown, possibly-impure
/// function. Useful for analyzing a function in isolation, with no
/// call-graph available.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysUnknown;

impl CallResolver for AlwaysUnknown {
    fn resolve(&self, _callee: &Scalar) -> CallTarget {
        CallTarget::Unknown { pure: false }
    }
}

/// The per-block invariants computed by [`Driver::analyze_function`]: the
/// state *on entry* to each reachable block, after joining every incoming
/// edge. The checker layer re-runs the per-instruction transfer functions
/// from here to recover any finer-grained invariant it needs.
pub type BlockInvariants = BTreeMap<BlockId, Invariant>;

/// Collects every machine-integer constant syntactically present in a
/// block, for threshold-widening (Â§4.10 point 4).
fn collect_thresholds(cfg: &Cfg, wto: &Wto, out: &mut Vec<i128>) {
    for component in wto {
        match component {
            WtoComponent::Vertex(b) => collect_block_thresholds(cfg, *b, out),
            WtoComponent::Component { head, body } => {
                collect_block_thresholds(cfg, *head, out);
                collect_thresholds(cfg, body, out);
            }
        }
    }
}

fn collect_block_thresholds(cfg: &Cfg, b: BlockId, out: &mut Vec<i128>) {
    fn scalar_threshold(s: &Scalar, out: &mut Vec<i128>) {
        if let Scalar::MachineInt(mi) = s {
            out.push(mi.to_integer());
        }
    }
    for inst in cfg.block(b).instructions() {
        match inst {
            Instruction::Assignment { rhs, .. } => scalar_threshold(rhs, out),
            Instruction::BinaryOp { left, right, .. } | Instruction::Comparison { left, right, .. } => {
                scalar_threshold(left, out);
                scalar_threshold(right, out);
            }
            Instruction::Allocate { count, .. } => scalar_threshold(count, out),
            _ => {}
        }
    }
}

/// Runs one instruction's effect on an [`Invariant`], dispatching the
/// control-flow-affecting instructions (`Call`, `LandingPad`, `Resume`,
/// `Unreachable`, `Return`) to [`crate::engine::call`] and everything else
/// to [`crate::engine::transfer`]'s per-state transfer functions via
/// [`PartitionedState::map`]/[`PartitionedState::try_map`].
fn exec_instruction(
    engine: &Engine<'_>,
    inv: &Invariant,
    inst: &Instruction,
    resolver: &dyn CallResolver,
    config: &AnalysisConfig,
) -> AnalysisResult<Invariant> {
    match inst {
        Instruction::Call {
            lhs,
            callee,
            args,
            has_exception_edge,
        } => {
            let target = resolver.resolve(callee);
            let args: Vec<Scalar> = args.iter().cloned().collect();
            engine.execute_call(inv, *lhs, &target, &args, *has_exception_edge, config)
        }
        Instruction::LandingPad { exc_var } => Ok(engine.landing_pad(inv, *exc_var)),
        Instruction::Resume { .. } => Ok(engine.resume(inv)),
        Instruction::Unreachable | Instruction::Return { .. } => Ok(engine.terminate_normal_flow(inv)),
        other => {
            let normal = inv.normal.map(|s| engine.step(s, other));
            Ok(Invariant {
                normal,
                caught: inv.caught.clone(),
                propagated: inv.propagated.clone(),
            })
        }
    }
}

/// Runs every instruction of `block` in order over `inv`, short-circuiting
/// (without error) once the normal flow goes bottom, since every remaining
/// instruction in the block would be a no-op on an already-infeasible
/// state.
fn exec_block(
    engine: &Engine<'_>,
    cfg: &Cfg,
    block: BlockId,
    mut inv: Invariant,
    resolver: &dyn CallResolver,
    config: &AnalysisConfig,
) -> AnalysisResult<Invariant> {
    for inst in cfg.block(block).instructions() {
        if inv.is_normal_flow_bottom() && inv.caught.is_bottom() && inv.propagated.is_bottom() {
            break;
        }
        inv = exec_instruction(engine, &inv, inst, resolver, config)?;
    }
    Ok(inv)
}

/// Join the invariants flowing into `block` over every predecessor edge: a
/// `Normal` edge exposes the predecessor's `normal` flow as this block's
/// `normal`; an `Exception` edge exposes the predecessor's `propagated`
/// flow as this block's `propagated`, left for the block's own
/// `LandingPad` instruction to fold into `caught` via
/// [`crate::domain::exception::ExceptionDomain::enter_catch`].
fn join_predecessors(cfg: &Cfg, block: BlockId, invariants: &BlockInvariants) -> Invariant {
    let entry = cfg.entry();
    let mut acc = if block == entry {
        entry_invariant()
    } else {
        Invariant::bottom()
    };
    for pred in cfg.predecessors(block) {
        let Some(pred_inv) = invariants.get(&pred) else {
            continue;
        };
        let edge_kind = cfg
            .block(pred)
            .successors()
            .find(|(to, _)| *to == block)
            .map(|(_, kind)| kind);
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

/// Widen (or join, before the configured delay) `prev` against `next` at a
/// loop head, per variable component.
fn widen_at_head(prev: &Invariant, next: &Invariant, iteration: u32, config: &AnalysisConfig, thresholds: &[i128]) -> Invariant {
    if iteration < config.widening_delay {
        return prev.join(next);
    }
    let normal = if config.threshold_widening {
        prev.normal.widen_with_thresholds(&next.normal, thresholds)
    } else {
        prev.normal.widen(&next.normal)
    };
    Invariant {
        normal,
        caught: prev.caught.widen(&next.caught),
        propagated: prev.propagated.widen(&next.propagated),
    }
}

/// Iterate one [`Wto`] (top-level, or a loop component's body) to a local
/// fixpoint, writing each visited block's post-join invariant into
/// `invariants`.
fn iterate_wto(
    engine: &Engine<'_>,
    cfg: &Cfg,
    wto: &Wto,
    invariants: &mut BlockInvariants,
    resolver: &dyn CallResolver,
    config: &AnalysisConfig,
    budget: &mut dyn Budget,
    thresholds: &[i128],
) -> AnalysisResult<()> {
    for component in wto {
        match component {
            WtoComponent::Vertex(b) => {
                visit_block(engine, cfg, *b, invariants, resolver, config, budget)?;
            }
            WtoComponent::Component { head, body } => {
                let mut iteration = 0u32;
                loop {
                    if budget.tick() {
                        return Err(AnalyzerBug::FixpointBudgetExceeded.into());
                    }
                    let before = invariants.get(head).cloned().unwrap_or_else(Invariant::bottom);
                    let joined = join_predecessors(cfg, *head, invariants);
                    let widened = widen_at_head(&before, &joined, iteration, config, thresholds);
                    invariants.insert(*head, widened);
                    visit_block(engine, cfg, *head, invariants, resolver, config, budget)?;
                    iterate_wto(engine, cfg, body, invariants, resolver, config, budget, thresholds)?;
                    let after = invariants.get(head).cloned().unwrap_or_else(Invariant::bottom);
                    iteration += 1;
                    if after.normal.leq(&before.normal)
                        && after.caught.leq(&before.caught)
                        && after.propagated.leq(&before.propagated)
                    {
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Join `block`'s predecessors, run its instructions, and record the
/// resulting post-invariant.
fn visit_block(
    engine: &Engine<'_>,
    cfg: &Cfg,
    block: BlockId,
    invariants: &mut BlockInvariants,
    resolver: &dyn CallResolver,
    config: &AnalysisConfig,
    budget: &mut dyn Budget,
) -> AnalysisResult<()> {
    if budget.tick() {
        return Err(AnalyzerBug::FixpointBudgetExceeded.into());
    }
    let pre = join_predecessors(cfg, block, invariants);
    let post = exec_block(engine, cfg, block, pre, resolver, config)?;
    invariants.insert(block, post);
    Ok(())
}

/// Run `narrowing_iterations` passes re-executing every reachable block
/// (in arena order; narrowing doesn't need the WTO's nesting), narrowing
/// each block's recorded invariant against the freshly computed one
/// (Â§4.10 point 5).
fn narrow(
    engine: &Engine<'_>,
    cfg: &Cfg,
    invariants: &mut BlockInvariants,
    resolver: &dyn CallResolver,
    config: &AnalysisConfig,
) -> AnalysisResult<()> {
    for _ in 0..config.narrowing_iterations {
        for block in cfg.block_ids() {
            if invariants.get(&block).is_none() {
                continue;
            }
            let pre = join_predecessors(cfg, block, invariants);
            let post = exec_block(engine, cfg, block, pre, resolver, config)?;
            let narrowed = invariants[&block].narrow(&post);
            invariants.insert(block, narrowed);
        }
    }
    Ok(())
}

/// Drives one function's fixpoint computation (Â§4.10, Â§5): weak
/// topological order, join-then-widen ascending pass, then a narrowing
/// pass, all tuned by an [`AnalysisConfig`] and dispatching calls through a
/// [`CallResolver`].
pub struct Driver<'a> {
    config: AnalysisConfig,
    resolver: &'a (dyn CallResolver + Sync),
}

impl<'a> Driver<'a> {
    /// A driver using `config`'s tunables and `resolver` to classify call
    /// sites.
    pub fn new(config: AnalysisConfig, resolver: &'a (dyn CallResolver + Sync)) -> Self {
        Self { config, resolver }
    }

    /// Run the fixpoint to completion for one function's [`Cfg`]. Returns
    /// the invariant computed on entry to every block reachable from the
    /// CFG's entry; unreachable blocks are simply absent.
    pub fn analyze_function(
        &self,
        engine: &Engine<'_>,
        cfg: &Cfg,
        budget: &mut dyn Budget,
    ) -> AnalysisResult<BlockInvariants> {
        let wto = wto::compute(cfg);
        let mut thresholds = Vec::new();
        if self.config.threshold_widening {
            collect_thresholds(cfg, &wto, &mut thresholds);
        }
        let mut invariants = BTreeMap::new();
        invariants.insert(cfg.entry(), entry_invariant());
        iterate_wto(engine, cfg, &wto, &mut invariants, self.resolver, &self.config, budget, &thresholds)?;
        narrow(engine, cfg, &mut invariants, self.resolver, &self.config)?;
        Ok(invariants)
    }

    /// Runs [`Self::analyze_function`] over every `Cfg` in `cfgs`,
    /// distributing the functions across `rayon`'s thread pool (Â§5: "the
    /// driver may analyze different functions in parallel threads"). Each
    /// function gets its own fresh budget from `new_budget`, since a
    /// [`Budget`] is inherently per-function mutable state that can't be
    /// shared across threads. Results are returned in the same order as
    /// `cfgs`, one per function, independent of completion order.
    pub fn analyze_module<B: Budget + Send>(
        &self,
        engine: &Engine<'_>,
        cfgs: &[Cfg],
        new_budget: impl Fn() -> B + Sync,
    ) -> Vec<AnalysisResult<BlockInvariants>>
    where
        Self: Sync,
    {
        use rayon::prelude::*;

        cfgs.par_iter()
            .map(|cfg| {
                let mut budget = new_budget();
                self.analyze_function(engine, cfg, &mut budget)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::AnalysisContext,
        domain::state::UnderlyingState,
        ir::{
            cfg::Block,
            literal::Scalar,
            memloc::CallingContext,
            types::DataLayout,
            variable::VariableId,
        },
        num::{
            MachineInt,
            Sign,
        },
    };

    fn v(n: u32) -> VariableId {
        VariableId::from_raw(n)
    }

    #[test]
    fn straight_line_function_reaches_every_block() {
        let ctx = AnalysisContext::new();
        let engine = Engine::new(DataLayout::x86_64(), &ctx, CallingContext(0));
        let mut b = Cfg::builder();
        b.push_block(
            Block::new()
                .with_instruction(Instruction::Assignment {
                    lhs: v(0),
                    rhs: Scalar::MachineInt(MachineInt::new(1, 32, Sign::Signed)),
                })
                .with_successor(BlockId(1), EdgeKind::Normal),
        );
        b.push_block(Block::new().with_instruction(Instruction::Return { value: None }));
        let cfg = b.build();
        let config = AnalysisConfig::default();
        let driver = Driver::new(config, &AlwaysUnknown);
        let mut budget = Unbounded;
        let invariants = driver.analyze_function(&engine, &cfg, &mut budget).unwrap();
        assert!(!invariants[&BlockId(0)].is_normal_flow_bottom());
        assert!(!invariants[&BlockId(1)].is_normal_flow_bottom());
    }

    #[test]
    fn analyze_module_runs_every_function_and_preserves_order() {
        let ctx = AnalysisContext::new();
        let engine = Engine::new(DataLayout::x86_64(), &ctx, CallingContext(0));

        let mut ok = Cfg::builder();
        ok.push_block(Block::new().with_instruction(Instruction::Assignment {
            lhs: v(0),
            rhs: Scalar::MachineInt(MachineInt::new(1, 32, Sign::Signed)),
        }));
        let ok_cfg = ok.build();

        let mut overflows = Cfg::builder();
        overflows.push_block(
            Block::new()
                .with_instruction(Instruction::Assignment {
                    lhs: v(1),
                    rhs: Scalar::MachineInt(MachineInt::new(i32::MAX as i128, 32, Sign::Signed)),
                })
                .with_instruction(Instruction::BinaryOp {
                    op: crate::ir::instruction::BinaryOp::AddNoWrap,
                    lhs: v(2),
                    left: Scalar::MachineIntVar(v(1)),
                    right: Scalar::MachineInt(MachineInt::new(1, 32, Sign::Signed)),
                }),
        );
        let overflow_cfg = overflows.build();

        let config = AnalysisConfig::default();
        let driver = Driver::new(config, &AlwaysUnknown);
        let cfgs = [ok_cfg, overflow_cfg];
        let results = driver.analyze_module(&engine, &cfgs, || StepBudget::new(1_000));

        assert_eq!(results.len(), 2);
        let ok_invariants = results[0].as_ref().unwrap();
        assert!(!ok_invariants[&BlockId(0)].is_normal_flow_bottom());
        let overflow_invariants = results[1].as_ref().unwrap();
        assert!(overflow_invariants[&BlockId(0)].is_normal_flow_bottom());
    }

    #[test]
    fn loop_widens_instead_of_diverging() {
        let ctx = AnalysisContext::new();
        let engine = Engine::new(DataLayout::x86_64(), &ctx, CallingContext(0));
        let mut b = Cfg::builder();
        // 0: i := 0; 1 (head): i := i + 1; -> 1 or 2; 2: exit.
        b.push_block(
            Block::new()
                .with_instruction(Instruction::Assignment {
                    lhs: v(0),
                    rhs: Scalar::MachineInt(MachineInt::new(0, 32, Sign::Signed)),
                })
                .with_successor(BlockId(1), EdgeKind::Normal),
        );
        b.push_block(
            Block::new()
                .with_instruction(Instruction::BinaryOp {
                    op: crate::ir::instruction::BinaryOp::Add,
                    lhs: v(0),
                    left: Scalar::MachineIntVar(v(0)),
                    right: Scalar::MachineInt(MachineInt::new(1, 32, Sign::Signed)),
                })
                .with_successor(BlockId(1), EdgeKind::Normal)
                .with_successor(BlockId(2), EdgeKind::Normal),
        );
        b.push_block(Block::new().with_instruction(Instruction::Return { value: None }));
        let cfg = b.build();
        let config = AnalysisConfig::default();
        let driver = Driver::new(config, &AlwaysUnknown);
        let mut budget = StepBudget::new(10_000);
        let invariants = driver.analyze_function(&engine, &cfg, &mut budget).unwrap();
        assert!(!invariants[&BlockId(1)].is_normal_flow_bottom());
    }

    #[test]
    fn exhausted_budget_is_reported() {
        let ctx = AnalysisContext::new();
        let engine = Engine::new(DataLayout::x86_64(), &ctx, CallingContext(0));
        let mut b = Cfg::builder();
        b.push_block(
            Block::new()
                .with_successor(BlockId(1), EdgeKind::Normal),
        );
        b.push_block(Block::new().with_successor(BlockId(0), EdgeKind::Normal));
        let cfg = b.build();
        let config = AnalysisConfig::default();
        let driver = Driver::new(config, &AlwaysUnknown);
        let mut budget = StepBudget::new(0);
        let result = driver.analyze_function(&engine, &cfg, &mut budget);
        assert!(result.is_err());
    }

    #[test]
    fn unreachable_block_stays_bottom() {
        let ctx = AnalysisContext::new();
        let engine = Engine::new(DataLayout::x86_64(), &ctx, CallingContext(0));
        let mut b = Cfg::builder();
        b.push_block(Block::new());
        b.push_block(Block::new());
        let cfg = b.build();
        let config = AnalysisConfig::default();
        let driver = Driver::new(config, &AlwaysUnknown);
        let mut budget = Unbounded;
        let invariants = driver.analyze_function(&engine, &cfg, &mut budget).unwrap();
        assert!(invariants.get(&BlockId(1)).is_none());
        let _ = UnderlyingState::bottom();
    }
}
