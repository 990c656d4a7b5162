//! The numeric domain (Â§4.4): a reduced product of intervals, congruences
//! and gauges per variable, persistent-mapped the way Â§5 requires.

use im::HashMap;

use crate::{
    domain::lattice::AbstractDomain,
    ir::{
        instruction::{
            BinaryOp,
            ComparisonOp,
        },
        types::Ty,
        variable::VariableId,
    },
    num::{
        Bound,
        Congruence,
        Gauge,
        GaugeBound,
        Interval,
        MachineInt,
        Sign,
    },
};

/// `intervals Ã— congruences Ã— gauges` for a single variable, the
/// per-variable value the numeric environment maps to. Every variable gets
/// a bare-scalar gauge for free from its constant/computed value; the
/// component only becomes a genuine affine expression over a loop counter
/// `k` for a variable `IkosCounterInit` has designated as that counter
/// (Â§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericValue {
    /// The interval component.
    pub interval: Interval,
    /// The congruence component.
    pub congruence: Congruence,
    /// The gauge component (Â§3.5). Excluded from [`Self::leq`]: it is an
    /// auxiliary annotation that rides along with the interval/congruence
    /// product rather than participating in the domain's order, so a
    /// mismatched gauge alone never affects fixpoint convergence.
    pub gauge: Gauge,
}

impl NumericValue {
    /// Top: no constraint.
    pub fn top() -> Self {
        Self {
            interval: Interval::top(),
            congruence: Congruence::top(),
            gauge: Gauge::top(),
        }
    }

    /// Bottom: infeasible.
    pub fn bottom() -> Self {
        Self {
            interval: Interval::bottom(),
            congruence: Congruence::bottom(),
            gauge: Gauge::bottom(),
        }
    }

    /// A concrete constant.
    pub fn singleton(n: i128) -> Self {
        Self {
            interval: Interval::singleton(n),
            congruence: Congruence::singleton(n),
            gauge: Gauge::scalar(n),
        }
    }

    /// `i in [k, k]` for the loop counter `k`, i.e. `variable`'s own current
    /// value expressed symbolically as itself (Â§4.3, Â§8 scenario 6). Used
    /// only at `IkosCounterInit`, which designates a fresh counter.
    pub(crate) fn counter_identity(k: crate::num::CounterId) -> Self {
        Self {
            interval: Interval::singleton(0),
            congruence: Congruence::singleton(0),
            gauge: Gauge::new(GaugeBound::counter_term(k, 1), GaugeBound::counter_term(k, 1)),
        }
    }

    pub(crate) fn is_bottom(&self) -> bool {
        self.interval.is_bottom() || self.congruence.is_bottom()
    }

    fn join(&self, other: &Self) -> Self {
        Self {
            interval: self.interval.join(&other.interval),
            congruence: self.congruence.join(&other.congruence),
            gauge: self.gauge.join(&other.gauge),
        }
    }

    pub(crate) fn meet(&self, other: &Self) -> Self {
        let interval = self.interval.meet(&other.interval);
        let congruence = self.congruence.meet(&other.congruence);
        // Gauge has no precise meet; keep whichever side already carries
        // information; this is sound only because gauge is excluded from
        // `leq` and therefore never consulted for feasibility.
        let gauge = if self.gauge.is_top() { other.gauge.clone() } else { self.gauge.clone() };
        if interval.is_bottom() || congruence.is_bottom() {
            Self::bottom()
        } else {
            Self { interval, congruence, gauge }
        }
    }

    pub(crate) fn leq(&self, other: &Self) -> bool {
        self.interval.leq(&other.interval) && self.congruence.leq(&other.congruence)
    }

    fn widen(&self, other: &Self) -> Self {
        Self {
            interval: self.interval.widen(&other.interval),
            congruence: self.congruence.widen(&other.congruence),
            gauge: self.gauge.join(&other.gauge),
        }
    }

    /// `widen`, but snapping the interval component to the nearest
    /// syntactic constant beyond the grown bound instead of jumping
    /// straight to infinity (Â§4.10 point 4's threshold-widening).
    pub(crate) fn widen_with_thresholds(&self, other: &Self, thresholds: &[i128]) -> Self {
        Self {
            interval: self.interval.widen_with_thresholds(&other.interval, thresholds),
            congruence: self.congruence.widen(&other.congruence),
            gauge: self.gauge.join(&other.gauge),
        }
    }

    /// `self + other`, composing the interval, congruence and gauge
    /// components.
    pub(crate) fn add(&self, other: &Self) -> Self {
        Self {
            interval: self.interval.add(&other.interval),
            congruence: self.congruence.add(&other.congruence),
            gauge: self.gauge.add(&other.gauge),
        }
    }

    /// `self - other`, composing the interval, congruence and gauge
    /// components.
    pub(crate) fn sub(&self, other: &Self) -> Self {
        Self {
            interval: self.interval.sub(&other.interval),
            congruence: self.congruence.sub(&other.congruence),
            gauge: self.gauge.add(&other.gauge.neg()),
        }
    }

    /// `self * other`, composing the interval and congruence components.
    /// The gauge component only stays affine when one side is a known
    /// scalar; otherwise it degrades to top.
    pub(crate) fn mul(&self, other: &Self) -> Self {
        let gauge = match (self.interval.as_singleton(), other.interval.as_singleton()) {
            (_, Some(c)) => self.gauge.scalar_mul(c),
            (Some(c), _) => other.gauge.scalar_mul(c),
            _ => Gauge::top(),
        };
        Self {
            interval: self.interval.mul(&other.interval),
            congruence: self.congruence.mul(&other.congruence),
            gauge,
        }
    }

    /// The sound-but-imprecise fallback: plain interval/congruence
    /// composition for `Add`/`Sub`/`Mul` (no wrap-check, since that needs
    /// `ty`'s bit-width), top for everything else.
    fn abstract_binary_op(&self, op: BinaryOp, other: &Self) -> Self {
        match op {
            BinaryOp::Add | BinaryOp::AddNoWrap => self.add(other),
            BinaryOp::Sub | BinaryOp::SubNoWrap => self.sub(other),
            BinaryOp::Mul | BinaryOp::MulNoWrap => self.mul(other),
            _ => Self::top(),
        }
    }

    /// `self op other`, computed exactly through [`MachineInt`] when both
    /// operands resolve to a singleton and `ty` names the concrete
    /// machine-integer type to compute in; falls back to
    /// [`Self::abstract_binary_op`] otherwise. `Div`/`Rem` by a
    /// provable-zero divisor go straight to bottom regardless of whether
    /// the dividend is itself precisely known (Â§4.1: "division by zero is
    /// bottom").
    pub(crate) fn int_binary_op(&self, op: BinaryOp, other: &Self, ty: Ty) -> Self {
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && other.interval.as_singleton() == Some(0) {
            return Self::bottom();
        }
        let Ty::MachineInt { bit_width, sign } = ty else {
            return self.abstract_binary_op(op, other);
        };
        let (Some(lv), Some(rv)) = (self.interval.as_singleton(), other.interval.as_singleton()) else {
            return self.abstract_binary_op(op, other);
        };
        let l = MachineInt::new(lv, bit_width, sign);
        let r = MachineInt::new(rv, bit_width, sign);
        let exact: Result<MachineInt, ()> = match op {
            BinaryOp::Add => Ok(l.add(&r).0),
            BinaryOp::AddNoWrap => l.add_no_wrap(&r),
            BinaryOp::Sub => Ok(l.sub(&r).0),
            BinaryOp::SubNoWrap => l.sub_no_wrap(&r),
            BinaryOp::Mul => Ok(l.mul(&r).0),
            BinaryOp::MulNoWrap => l.mul_no_wrap(&r),
            BinaryOp::Div => l.div(&r).map(|(v, _)| v).map_err(|_| ()),
            BinaryOp::Rem => l.rem(&r).map(|(v, _)| v).map_err(|_| ()),
            BinaryOp::Shl => l.shl(&r).map(|(v, _, _)| v).map_err(|_| ()),
            BinaryOp::LShr => l.lshr(&r).map(|(v, _)| v).map_err(|_| ()),
            BinaryOp::AShr => l.ashr(&r).map(|(v, _)| v).map_err(|_| ()),
            BinaryOp::And => Ok(l.and(&r)),
            BinaryOp::Or => Ok(l.or(&r)),
            BinaryOp::Xor => Ok(l.xor(&r)),
            BinaryOp::VectorOp => return self.abstract_binary_op(op, other),
        };
        match exact {
            Ok(v) => Self::singleton(v.to_integer()),
            Err(()) => Self::bottom(),
        }
    }
}

/// The numeric environment: a persistent map from variable to
/// [`NumericValue`], or bottom (infeasible) as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericDomain {
    /// Infeasible.
    Bottom,
    /// Feasible; unmapped variables are implicitly top.
    Env(HashMap<VariableId, NumericValue>),
}

impl NumericDomain {
    /// The value bound to `v`, or top if unconstrained.
    pub fn get(&self, v: VariableId) -> NumericValue {
        match self {
            Self::Bottom => NumericValue::bottom(),
            Self::Env(map) => map.get(&v).cloned().unwrap_or_else(NumericValue::top),
        }
    }

    pub(crate) fn with(&self, v: VariableId, value: NumericValue) -> Self {
        if value.is_bottom() {
            return Self::Bottom;
        }
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                map.insert(v, value);
                Self::Env(map)
            }
        }
    }

    /// `int_assign(v, n)`: bind `v` to a concrete constant, discarding any
    /// previous constraint.
    pub fn int_assign_const(&self, v: VariableId, n: i128) -> Self {
        self.with(v, NumericValue::singleton(n))
    }

    /// `int_assign(v, expr)`: bind `v` to the value of another variable,
    /// discarding any previous constraint on `v`.
    pub fn int_assign_var(&self, v: VariableId, src: VariableId) -> Self {
        let value = self.get(src);
        self.with(v, value)
    }

    /// Remove any constraint on `v` (sets it back to top).
    pub fn int_forget(&self, v: VariableId) -> Self {
        match self {
            Self::Bottom => Self::Bottom,
            Self::Env(map) => {
                let mut map = map.clone();
                map.remove(&v);
                Self::Env(map)
            }
        }
    }

    /// `int_apply(op, lhs, left, right, ty)`. `ty` is the operands' shared
    /// machine-integer type (bit-width/sign), used to compute exact results
    /// via [`crate::num::MachineInt`] when both operands are singletons;
    /// `AddNoWrap`/etc. collapse the whole state to bottom when overflow is
    /// provable, and `Div`/`Rem` by a provable-zero divisor do the same.
    pub fn int_apply(
        &self,
        op: BinaryOp,
        lhs: VariableId,
        left: VariableId,
        right: VariableId,
        ty: Ty,
    ) -> Self {
        if self.is_bottom() {
            return Self::Bottom;
        }
        let l = self.get(left);
        let r = self.get(right);
        let result = l.int_binary_op(op, &r, ty);
        self.with(lhs, result)
    }

    /// `int_add(predicate, x, y)`: add a linear constraint derived from a
    /// comparison, refining both variables' intervals. Infeasible
    /// combinations collapse to bottom.
    pub fn int_add_constraint(&self, pred: ComparisonOp, x: VariableId, y: VariableId) -> Self {
        if self.is_bottom() {
            return Self::Bottom;
        }
        let vx = self.get(x);
        let vy = self.get(y);
        let (refined_x, refined_y) = match pred {
            ComparisonOp::Eq => {
                let m = vx.meet(&vy);
                (m.clone(), m)
            }
            ComparisonOp::Lt | ComparisonOp::Le => {
                let bump = if pred == ComparisonOp::Lt { 1 } else { 0 };
                let x_hi = vy.interval.hi().map(|h| h - Bound::Finite(bump));
                let y_lo = vx.interval.lo().map(|l| l + Bound::Finite(bump));
                let refined_x = x_hi
                    .map(|hi| NumericValue {
                        interval: vx.interval.meet(&Interval::new(Bound::MinusInfinity, hi)),
                        congruence: vx.congruence.clone(),
                        gauge: vx.gauge.clone(),
                    })
                    .unwrap_or(vx.clone());
                let refined_y = y_lo
                    .map(|lo| NumericValue {
                        interval: vy.interval.meet(&Interval::new(lo, Bound::PlusInfinity)),
                        congruence: vy.congruence.clone(),
                        gauge: vy.gauge.clone(),
                    })
                    .unwrap_or(vy.clone());
                (refined_x, refined_y)
            }
            ComparisonOp::Gt | ComparisonOp::Ge | ComparisonOp::Ne => (vx, vy),
        };
        if refined_x.is_bottom() || refined_y.is_bottom() {
            return Self::Bottom;
        }
        self.with(x, refined_x).with(y, refined_y)
    }

    /// `int_to_interval(v)`, the checker-facing read-only query (Â§6).
    pub fn int_to_interval(&self, v: VariableId) -> Interval {
        self.get(v).interval
    }

    /// `gauge_to_gauge(v)`, the checker-facing read-only query for `v`'s
    /// gauge component (Â§6). Top for any variable never designated a
    /// counter via `IkosCounterInit`.
    pub fn gauge_to_gauge(&self, v: VariableId) -> crate::num::Gauge {
        self.get(v).gauge
    }

    /// `IkosCounterInit(v)`: bind `v` to `0` and designate it a fresh loop
    /// counter `k`, so `v`'s own gauge becomes the identity `[k, k]` that
    /// later arithmetic on `v` composes against (Â§4.3).
    pub fn counter_init(&self, v: VariableId, k: crate::num::CounterId) -> Self {
        self.with(v, NumericValue::counter_identity(k))
    }

    /// `widen`, but with threshold-widening on every variable's interval
    /// component (Â§4.10 point 4).
    pub fn widen_with_thresholds(&self, other: &Self, thresholds: &[i128]) -> Self {
        match (self, other) {
            (Self::Bottom, x) => x.clone(),
            (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    let bv = b.get(k).cloned().unwrap_or_else(NumericValue::top);
                    out.insert(*k, av.widen_with_thresholds(&bv, thresholds));
                }
                Self::Env(out)
            }
        }
    }
}

impl AbstractDomain for NumericDomain {
    fn top() -> Self {
        Self::Env(HashMap::new())
    }

    fn bottom() -> Self {
        Self::Bottom
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (_, Self::Bottom) => false,
            (Self::Env(a), Self::Env(b)) => {
                b.iter().all(|(k, bv)| a.get(k).unwrap_or(&NumericValue::top()).leq(bv))
            }
        }
    }

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    let bv = b.get(k).cloned().unwrap_or_else(NumericValue::top);
                    out.insert(*k, av.join(&bv));
                }
                for (k, bv) in b.iter() {
                    if !a.contains_key(k) {
                        out.insert(*k, bv.join(&NumericValue::top()));
                    }
                }
                Self::Env(out)
            }
        }
    }

    fn meet(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Env(a), Self::Env(b)) => {
                let mut out = a.clone();
                for (k, bv) in b.iter() {
                    let merged = out.get(k).cloned().unwrap_or_else(NumericValue::top).meet(bv);
                    if merged.is_bottom() {
                        return Self::Bottom;
                    }
                    out.insert(*k, merged);
                }
                Self::Env(out)
            }
        }
    }

    fn widen(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) => x.clone(),
            (x, Self::Bottom) => x.clone(),
            (Self::Env(a), Self::Env(b)) => {
                let mut out = HashMap::new();
                for (k, av) in a.iter() {
                    let bv = b.get(k).cloned().unwrap_or_else(NumericValue::top);
                    out.insert(*k, av.widen(&bv));
                }
                Self::Env(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> VariableId {
        // VariableId's constructor is crate-private; tests within the crate
        // can still reach it via `from_raw`.
        crate::ir::variable::VariableId::from_raw(n)
    }

    #[test]
    fn assign_then_add_constraint() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 5)
            .int_assign_const(v(1), 10);
        let refined = env.int_add_constraint(ComparisonOp::Lt, v(0), v(1));
        assert!(!refined.is_bottom());
    }

    #[test]
    fn infeasible_constraint_is_bottom() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 10)
            .int_assign_const(v(1), 5);
        let refined = env.int_add_constraint(ComparisonOp::Lt, v(0), v(1));
        assert!(refined.is_bottom());
    }

    #[test]
    fn forget_restores_top() {
        let env = NumericDomain::top().int_assign_const(v(0), 5);
        let forgotten = env.int_forget(v(0));
        assert_eq!(forgotten.int_to_interval(v(0)), Interval::top());
    }

    fn u8_ty() -> Ty {
        Ty::MachineInt {
            bit_width: 8,
            sign: Sign::Unsigned,
        }
    }

    #[test]
    fn division_by_zero_singleton_is_bottom() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 10)
            .int_assign_const(v(1), 0);
        let after = env.int_apply(BinaryOp::Div, v(2), v(0), v(1), u8_ty());
        assert!(after.is_bottom());
    }

    #[test]
    fn exact_div_on_singletons() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 10)
            .int_assign_const(v(1), 3);
        let after = env.int_apply(BinaryOp::Div, v(2), v(0), v(1), u8_ty());
        assert_eq!(after.int_to_interval(v(2)), Interval::singleton(3));
    }

    #[test]
    fn exact_rem_on_singletons() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 10)
            .int_assign_const(v(1), 3);
        let after = env.int_apply(BinaryOp::Rem, v(2), v(0), v(1), u8_ty());
        assert_eq!(after.int_to_interval(v(2)), Interval::singleton(1));
    }

    #[test]
    fn shift_out_of_range_is_bottom() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 1)
            .int_assign_const(v(1), 8);
        let after = env.int_apply(BinaryOp::Shl, v(2), v(0), v(1), u8_ty());
        assert!(after.is_bottom());
    }

    #[test]
    fn exact_bitwise_and_on_singletons() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 0b1100)
            .int_assign_const(v(1), 0b1010);
        let after = env.int_apply(BinaryOp::And, v(2), v(0), v(1), u8_ty());
        assert_eq!(after.int_to_interval(v(2)), Interval::singleton(0b1000));
    }

    #[test]
    fn add_no_wrap_overflow_on_singletons_is_bottom() {
        let env = NumericDomain::top()
            .int_assign_const(v(0), 255)
            .int_assign_const(v(1), 1);
        let after = env.int_apply(BinaryOp::AddNoWrap, v(2), v(0), v(1), u8_ty());
        assert!(after.is_bottom());
    }

    #[test]
    fn lattice_laws_hold_on_sample_environments() {
        let samples = vec![
            NumericDomain::top(),
            NumericDomain::bottom(),
            NumericDomain::top().int_assign_const(v(0), 1),
            NumericDomain::top().int_assign_const(v(0), 2),
        ];
        crate::assert_lattice_laws!(NumericDomain, samples);
    }

    #[test]
    fn counter_init_then_incr_tracks_affine_gauge() {
        let env = NumericDomain::top().counter_init(v(0), 0);
        let incremented = env.with(v(0), env.get(v(0)).add(&NumericValue::singleton(1)));
        let gauge = incremented.gauge_to_gauge(v(0));
        let identity = NumericValue::counter_identity(0).gauge;
        let expected = identity.add(&Gauge::scalar(1));
        assert_eq!(gauge, expected);
    }

    #[test]
    fn non_counter_constant_gauge_is_a_bare_scalar() {
        let env = NumericDomain::top().int_assign_const(v(0), 5);
        assert_eq!(env.gauge_to_gauge(v(0)), Gauge::scalar(5));
    }

    #[test]
    fn forgotten_variable_gauge_is_top() {
        let env = NumericDomain::top().int_assign_const(v(0), 5).int_forget(v(0));
        assert!(env.gauge_to_gauge(v(0)).is_top());
    }
}
