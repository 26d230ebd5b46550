//! Scalar type lattice and numeric promotion.

use compact_str::CompactString;

/// Basic (non-navigable) value types known to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Date,
    Time,
    Timestamp,
}

impl ScalarType {
    /// Widening rank within the numeric lattice; `None` for non-numeric types.
    const fn rank(self) -> Option<u8> {
        match self {
            ScalarType::Int => Some(1),
            ScalarType::Long => Some(2),
            ScalarType::Float => Some(3),
            ScalarType::Double => Some(4),
            ScalarType::Decimal => Some(5),
            _ => None,
        }
    }

    pub const fn is_numeric(self) -> bool {
        self.rank().is_some()
    }

    /// Result type of a binary arithmetic operation: the wider of the two
    /// operand types. Non-numeric operands fall back to the left operand;
    /// compatibility is the renderer's concern, not construction's.
    pub fn promote(lhs: ScalarType, rhs: ScalarType) -> ScalarType {
        match (lhs.rank(), rhs.rank()) {
            (Some(a), Some(b)) => {
                if a >= b {
                    lhs
                } else {
                    rhs
                }
            }
            _ => lhs,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "Bool",
            ScalarType::Int => "Int",
            ScalarType::Long => "Long",
            ScalarType::Float => "Float",
            ScalarType::Double => "Double",
            ScalarType::Decimal => "Decimal",
            ScalarType::Text => "Text",
            ScalarType::Date => "Date",
            ScalarType::Time => "Time",
            ScalarType::Timestamp => "Timestamp",
        }
    }
}

/// A resolved attribute target: either a navigable entity type or a
/// terminal scalar type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Entity(CompactString),
    Scalar(ScalarType),
}

impl TypeRef {
    pub const fn is_entity(&self) -> bool {
        matches!(self, TypeRef::Entity(_))
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Entity(name) => name.as_str(),
            TypeRef::Scalar(s) => s.name(),
        }
    }
}

impl From<ScalarType> for TypeRef {
    fn from(value: ScalarType) -> Self {
        TypeRef::Scalar(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_widens_to_the_wider_operand() {
        assert_eq!(
            ScalarType::promote(ScalarType::Int, ScalarType::Long),
            ScalarType::Long
        );
        assert_eq!(
            ScalarType::promote(ScalarType::Double, ScalarType::Int),
            ScalarType::Double
        );
        assert_eq!(
            ScalarType::promote(ScalarType::Decimal, ScalarType::Float),
            ScalarType::Decimal
        );
    }

    #[test]
    fn promotion_is_identity_for_equal_types() {
        assert_eq!(
            ScalarType::promote(ScalarType::Long, ScalarType::Long),
            ScalarType::Long
        );
    }

    #[test]
    fn non_numeric_operands_keep_the_left_type() {
        assert_eq!(
            ScalarType::promote(ScalarType::Text, ScalarType::Int),
            ScalarType::Text
        );
    }
}
