//! Scalar and aggregate literals (Â§3.8), the value shapes an AR instruction's
//! operands can take.

use im::Vector;

use crate::{
    ir::variable::VariableId,
    num::MachineInt,
};

/// A scalar operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// A concrete machine integer constant.
    MachineInt(MachineInt),
    /// A floating-point constant. The engine never tracks its value (Â§4.8),
    /// only that it is some nondeterministic float.
    FloatingPoint,
    /// The null pointer constant.
    Null,
    /// Syntactic undefined value (Â§4.8 step 1: any instruction consuming
    /// this sets `normal` to bottom).
    Undefined,
    /// A reference to a machine-integer-typed variable.
    MachineIntVar(VariableId),
    /// A reference to a float-typed variable.
    FloatVar(VariableId),
    /// A reference to a pointer-typed variable.
    PointerVar(VariableId),
}

impl Scalar {
    /// `true` for [`Scalar::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// The referenced variable, if this scalar is a variable reference.
    pub fn as_variable(&self) -> Option<VariableId> {
        match self {
            Self::MachineIntVar(v) | Self::FloatVar(v) | Self::PointerVar(v) => Some(*v),
            _ => None,
        }
    }

    /// The referenced variable, only for a machine-integer-typed reference.
    /// Unlike [`Self::as_variable`], this never returns a `PointerVar`'s id:
    /// a pointer variable's `VariableId` is never itself bound to a value
    /// in the numeric domain (only its `offset_shadow` is), so callers that
    /// feed a variable id into the numeric domain must use this instead of
    /// `as_variable` to avoid silently treating a pointer as an integer.
    pub fn as_int_variable(&self) -> Option<VariableId> {
        match self {
            Self::MachineIntVar(v) => Some(*v),
            _ => None,
        }
    }
}

/// A single field of an [`AggregateLiteral`]: a byte range within the
/// aggregate and the scalar (or zero, or undefined) stored there.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateField {
    /// Byte offset within the aggregate.
    pub offset: u64,
    /// Size in bytes of this field.
    pub size: u64,
    /// The field's value.
    pub value: AggregateFieldValue,
}

/// The value of one [`AggregateField`].
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateFieldValue {
    /// A scalar value.
    Scalar(Scalar),
    /// An all-zero field (as produced by zero-initializers).
    Zero,
    /// An explicitly undefined field.
    Undefined,
}

/// A sum of fields describing an aggregate constant (Â§3.8).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateLiteral {
    fields: Vector<AggregateField>,
}

impl AggregateLiteral {
    /// An aggregate literal with no explicit fields (all-undefined by
    /// default).
    pub fn empty() -> Self {
        Self {
            fields: Vector::new(),
        }
    }

    /// Append a field, returning the updated (structurally shared)
    /// literal.
    pub fn with_field(&self, field: AggregateField) -> Self {
        let mut fields = self.fields.clone();
        fields.push_back(field);
        Self { fields }
    }

    /// The fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &AggregateField> {
        self.fields.iter()
    }
}
