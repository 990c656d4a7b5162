//! The shared lattice interface every abstract domain in this crate
//! implements, plus a property-test macro that checks the laws of Â§3.9
//! against an arbitrary sample of values.

/// A bounded lattice with widening/narrowing, the common interface of every
/// domain component composed into [`crate::domain::state::AbstractState`].
pub trait AbstractDomain: Clone + PartialEq {
    /// The greatest element: no constraint, describes every concrete state.
    fn top() -> Self;

    /// The least element: no concrete state satisfies it.
    fn bottom() -> Self;

    /// True iff this is the bottom element.
    fn is_bottom(&self) -> bool;

    /// `self <= other` in the lattice order.
    fn leq(&self, other: &Self) -> bool;

    /// Least upper bound.
    fn join(&self, other: &Self) -> Self;

    /// Greatest lower bound.
    fn meet(&self, other: &Self) -> Self;

    /// Widening: `self` is the previous iterate, `other` the new one.
    /// Must be increasing (`other <= result`) and guarantee termination of
    /// any ascending chain passed through it repeatedly.
    fn widen(&self, other: &Self) -> Self;

    /// Narrowing: `self` is the widened iterate, `other` the refinement.
    /// Must be decreasing (`result <= self`) and terminate any descending
    /// chain.
    fn narrow(&self, other: &Self) -> Self {
        // Sound default for domains with no useful narrowing: refuse to grow,
        // but otherwise just adopt the more precise operand.
        if other.leq(self) {
            other.clone()
        } else {
            self.clone()
        }
    }
}

/// Exercises the laws of Â§3.9 against a fixed sample of domain values.
/// Intended to be invoked from a `#[test]` in each domain's own test module,
/// e.g.:
///
/// ```ignore
/// #[test]
/// fn lattice_laws() {
///     crate::assert_lattice_laws!(MyDomain, sample_values());
/// }
/// ```
#[macro_export]
macro_rules! assert_lattice_laws {
    ($ty:ty, $values:expr) => {{
        use $crate::domain::lattice::AbstractDomain;
        let values: Vec<$ty> = $values;
        let top = <$ty>::top();
        let bottom = <$ty>::bottom();
        for v in &values {
            assert!(bottom.leq(v), "bottom <= x must hold");
            assert!(v.leq(&top), "x <= top must hold");
        }
        for a in &values {
            for b in &values {
                assert_eq!(a.join(b), b.join(a), "join must be commutative");
                assert_eq!(a.meet(b), b.meet(a), "meet must be commutative");
                assert_eq!(a.join(a), a.clone(), "join must be idempotent");
                assert_eq!(a.meet(a), a.clone(), "meet must be idempotent");
                if a.leq(b) {
                    assert_eq!(a.join(b), b.clone(), "join absorption: a<=b => a join b == b");
                    assert_eq!(a.meet(b), a.clone(), "meet absorption: a<=b => a meet b == a");
                }
            }
        }
        for a in &values {
            for b in &values {
                for c in &values {
                    assert_eq!(
                        a.join(b).join(c),
                        a.join(&b.join(c)),
                        "join must be associative"
                    );
                    assert_eq!(
                        a.meet(b).meet(c),
                        a.meet(&b.meet(c)),
                        "meet must be associative"
                    );
                }
            }
        }
    }};
}
