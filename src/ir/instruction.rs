//! AR instruction classes (Â§4.8), each of which the engine has a transfer
//! function for in [`crate::engine`].

use im::Vector;

use crate::ir::{
    literal::Scalar,
    types::Ty,
    variable::VariableId,
};

/// A linear form `sum(c_i * v_i) + k` over machine-integer variables, used
/// by [`Instruction::PointerShift`]'s offset expression (Â§4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpr {
    /// `(coefficient, variable)` terms.
    pub terms: Vector<(i128, VariableId)>,
    /// The constant term.
    pub constant: i128,
}

impl LinearExpr {
    /// A bare constant.
    pub fn constant(k: i128) -> Self {
        Self {
            terms: Vector::new(),
            constant: k,
        }
    }

    /// A single variable with coefficient 1.
    pub fn var(v: VariableId) -> Self {
        Self {
            terms: Vector::unit((1, v)),
            constant: 0,
        }
    }
}

/// The unary operator family of [`Instruction::UnaryOp`] (Â§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Truncate a machine integer to a narrower width.
    Trunc,
    /// Extend a machine integer to a wider width.
    Ext,
    /// Reinterpret a machine integer's sign at the same width.
    SignCast,
    /// Bit-for-bit reinterpretation between same-size types.
    Bitcast,
    /// A floating-point conversion; modeled as havoc.
    FpCast,
    /// Pointer-to-integer cast.
    PtrToInt,
    /// Integer-to-pointer cast. A constant operand allocates a
    /// `FixedAddress` object of unknown size (Â§4.8).
    IntToPtr,
}

/// The binary operator family of [`Instruction::BinaryOp`] (Â§4.1, Â§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Wrapping add.
    Add,
    /// Add, bottom on overflow.
    AddNoWrap,
    /// Wrapping subtract.
    Sub,
    /// Subtract, bottom on overflow.
    SubNoWrap,
    /// Wrapping multiply.
    Mul,
    /// Multiply, bottom on overflow.
    MulNoWrap,
    /// Division (signedness taken from the operand type).
    Div,
    /// Remainder.
    Rem,
    /// Shift left.
    Shl,
    /// Logical shift right.
    LShr,
    /// Arithmetic shift right.
    AShr,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// A vector/aggregate op the engine summarizes by forgetting the
    /// aggregate (Â§4.8).
    VectorOp,
}

impl BinaryOp {
    /// `true` for the `*NoWrap` variants that model overflow as undefined
    /// behavior (bottom).
    pub fn asserts_no_wrap(self) -> bool {
        matches!(self, Self::AddNoWrap | Self::SubNoWrap | Self::MulNoWrap)
    }
}

/// A comparison predicate (Â§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// `==`.
    Eq,
    /// `!=`.
    Ne,
    /// `<` (signedness from operand type).
    Lt,
    /// `<=`.
    Le,
    /// `>`.
    Gt,
    /// `>=`.
    Ge,
}

/// One AR instruction (Â§4.8). Operand positions are explicit; the engine
/// matches on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Copy `rhs` into `lhs`.
    Assignment {
        /// Destination.
        lhs: VariableId,
        /// Source value.
        rhs: Scalar,
    },
    /// A unary cast/reinterpretation.
    UnaryOp {
        /// Which unary operation.
        op: UnaryOp,
        /// Destination.
        lhs: VariableId,
        /// Operand.
        operand: Scalar,
        /// Destination type, relevant for `Trunc`/`Ext`/`IntToPtr`.
        result_ty: Ty,
    },
    /// A binary arithmetic or bitwise operation.
    BinaryOp {
        /// Which binary operation.
        op: BinaryOp,
        /// Destination.
        lhs: VariableId,
        /// Left operand.
        left: Scalar,
        /// Right operand.
        right: Scalar,
    },
    /// A comparison, producing a boolean-valued machine integer.
    Comparison {
        /// The predicate.
        pred: ComparisonOp,
        /// Destination.
        lhs: VariableId,
        /// Left operand.
        left: Scalar,
        /// Right operand.
        right: Scalar,
    },
    /// Allocate storage for `count` elements of `elem_ty`.
    Allocate {
        /// Destination (receives a pointer to the new storage).
        lhs: VariableId,
        /// Element type.
        elem_ty: Ty,
        /// Element count.
        count: Scalar,
    },
    /// `lhs := base + offset_expr` (a pointer arithmetic step).
    PointerShift {
        /// Destination.
        lhs: VariableId,
        /// Base pointer.
        base: VariableId,
        /// Offset in bytes, as a linear form.
        offset_expr: LinearExpr,
    },
    /// Load through `ptr` into `lhs`.
    Load {
        /// Destination.
        lhs: VariableId,
        /// Source pointer.
        ptr: VariableId,
        /// Size in bytes of the access.
        size: u64,
        /// Volatile accesses are modeled as havoc rather than `mem_read`.
        volatile: bool,
    },
    /// Store `value` through `ptr`.
    Store {
        /// Destination pointer.
        ptr: VariableId,
        /// Value to store.
        value: Scalar,
        /// Size in bytes of the access.
        size: u64,
        /// Volatile accesses are modeled as havoc.
        volatile: bool,
    },
    /// Extract one lane of a vector into a scalar.
    ExtractElement {
        /// Destination.
        lhs: VariableId,
        /// Source vector.
        vector: VariableId,
        /// Lane index.
        index: Scalar,
    },
    /// Insert a scalar into one lane of a vector.
    InsertElement {
        /// Destination.
        lhs: VariableId,
        /// Source vector.
        vector: VariableId,
        /// Lane index.
        index: Scalar,
        /// Value to insert.
        value: Scalar,
    },
    /// Permute lanes of two vectors; modeled as havoc.
    ShuffleVector {
        /// Destination.
        lhs: VariableId,
        /// First source vector.
        first: VariableId,
        /// Second source vector.
        second: VariableId,
    },
    /// The entry of an exception handler: binds the in-flight exception to
    /// `exc_var`.
    LandingPad {
        /// Variable receiving the caught exception.
        exc_var: VariableId,
    },
    /// Resume propagation of the exception bound to `exc_var`.
    Resume {
        /// The exception variable.
        exc_var: VariableId,
    },
    /// Marks a program point the front-end has proven unreachable.
    Unreachable,
    /// Return `value` (if any) from the current function.
    Return {
        /// The returned value, absent for `void` functions.
        value: Option<Scalar>,
    },
    /// A direct or indirect call, optionally with exception edges
    /// (`Invoke`). See Â§4.9.
    Call {
        /// Destination receiving the return value, if any.
        lhs: Option<VariableId>,
        /// Callee, as a function-pointer-typed scalar.
        callee: Scalar,
        /// Actual arguments.
        args: Vector<Scalar>,
        /// `true` if this call carries an exception edge (an `Invoke`).
        has_exception_edge: bool,
    },
}

impl Instruction {
    /// The variable written by this instruction, if any. Used by the
    /// driver to know which variable's uninitialized-ness clears.
    pub fn lhs(&self) -> Option<VariableId> {
        match self {
            Self::Assignment { lhs, .. }
            | Self::UnaryOp { lhs, .. }
            | Self::BinaryOp { lhs, .. }
            | Self::Comparison { lhs, .. }
            | Self::Allocate { lhs, .. }
            | Self::PointerShift { lhs, .. }
            | Self::Load { lhs, .. }
            | Self::ExtractElement { lhs, .. }
            | Self::InsertElement { lhs, .. }
            | Self::ShuffleVector { lhs, .. } => Some(*lhs),
            Self::Call { lhs, .. } => *lhs,
            Self::Store { .. }
            | Self::LandingPad { .. }
            | Self::Resume { .. }
            | Self::Unreachable
            | Self::Return { .. } => None,
        }
    }
}
