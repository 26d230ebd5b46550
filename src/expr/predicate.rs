//! Boolean predicates and their constructors.
//!
//! Negation is a lazy flag: `negate()` flips a bit and never rewrites the
//! tree, so double negation restores the original node exactly. The
//! renderer resolves the flag at emission time, either by swapping the
//! operator (`=` to `<>`, `IS NULL` to `IS NOT NULL`) or by wrapping a
//! compound in `NOT (...)`.

use crate::context::ParamId;
use crate::error::{QueryError, Result};
use crate::expr::{Expr, Value};
use crate::path::Path;
use crate::query::QueryStructure;
use crate::sql::Token;

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub(crate) const fn token(self) -> Token {
        match self {
            ComparisonOp::Eq => Token::Eq,
            ComparisonOp::Ne => Token::Ne,
            ComparisonOp::Lt => Token::Lt,
            ComparisonOp::Le => Token::Le,
            ComparisonOp::Gt => Token::Gt,
            ComparisonOp::Ge => Token::Ge,
        }
    }

    /// The operator expressing the negated comparison.
    pub(crate) const fn negate(self) -> ComparisonOp {
        match self {
            ComparisonOp::Eq => ComparisonOp::Ne,
            ComparisonOp::Ne => ComparisonOp::Eq,
            ComparisonOp::Lt => ComparisonOp::Ge,
            ComparisonOp::Ge => ComparisonOp::Lt,
            ComparisonOp::Le => ComparisonOp::Gt,
            ComparisonOp::Gt => ComparisonOp::Le,
        }
    }
}

/// Compound connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl BoolOp {
    pub(crate) const fn token(self) -> Token {
        match self {
            BoolOp::And => Token::And,
            BoolOp::Or => Token::Or,
        }
    }
}

/// Right-hand side of an IN predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum InItems {
    Values(Vec<Value>),
    Exprs(Vec<Expr>),
    Subquery(Box<QueryStructure>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateKind {
    Comparison {
        op: ComparisonOp,
        lhs: Expr,
        rhs: Expr,
    },
    Between {
        value: Expr,
        lower: Expr,
        upper: Expr,
    },
    In {
        value: Expr,
        items: InItems,
    },
    Like {
        value: Expr,
        pattern: Expr,
        escape: Option<char>,
    },
    IsNull(Expr),
    IsEmpty(Path),
    Exists(Box<QueryStructure>),
    MemberOf {
        element: Expr,
        collection: Path,
    },
    /// A boolean-valued expression used as a predicate; renders as a
    /// comparison against TRUE.
    BoolTest(Expr),
    Compound {
        op: BoolOp,
        parts: Vec<Predicate>,
    },
}

/// A boolean restriction node with a lazy negation flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub(crate) kind: PredicateKind,
    pub(crate) negated: bool,
}

impl Predicate {
    pub(crate) fn new(kind: PredicateKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Flips the negation flag without rewriting the tree.
    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub(crate) fn collect_params(&self, out: &mut Vec<ParamId>) {
        match &self.kind {
            PredicateKind::Comparison { lhs, rhs, .. } => {
                lhs.collect_params(out);
                rhs.collect_params(out);
            }
            PredicateKind::Between {
                value,
                lower,
                upper,
            } => {
                value.collect_params(out);
                lower.collect_params(out);
                upper.collect_params(out);
            }
            PredicateKind::In { value, items } => {
                value.collect_params(out);
                match items {
                    InItems::Values(_) => {}
                    InItems::Exprs(exprs) => {
                        for e in exprs {
                            e.collect_params(out);
                        }
                    }
                    InItems::Subquery(sub) => sub.collect_params(out),
                }
            }
            PredicateKind::Like { value, pattern, .. } => {
                value.collect_params(out);
                pattern.collect_params(out);
            }
            PredicateKind::IsNull(e) | PredicateKind::BoolTest(e) => e.collect_params(out),
            PredicateKind::IsEmpty(_) => {}
            PredicateKind::Exists(sub) => sub.collect_params(out),
            PredicateKind::MemberOf { element, .. } => element.collect_params(out),
            PredicateKind::Compound { parts, .. } => {
                for part in parts {
                    part.collect_params(out);
                }
            }
        }
    }
}

/// Anything usable where a boolean is expected: an existing predicate is
/// taken as-is, a boolean expression is wrapped in a truth test.
pub enum BooleanOperand {
    Predicate(Predicate),
    Expr(Expr),
}

impl From<Predicate> for BooleanOperand {
    fn from(value: Predicate) -> Self {
        BooleanOperand::Predicate(value)
    }
}

impl From<Expr> for BooleanOperand {
    fn from(value: Expr) -> Self {
        BooleanOperand::Expr(value)
    }
}

impl From<Path> for BooleanOperand {
    fn from(value: Path) -> Self {
        BooleanOperand::Expr(Expr::Path(value))
    }
}

// ==================== constructors ====================

fn comparison(op: ComparisonOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    Predicate::new(PredicateKind::Comparison {
        op,
        lhs: lhs.into(),
        rhs: rhs.into(),
    })
}

pub fn eq(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    comparison(ComparisonOp::Eq, lhs, rhs)
}

pub fn ne(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    comparison(ComparisonOp::Ne, lhs, rhs)
}

pub fn lt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    comparison(ComparisonOp::Lt, lhs, rhs)
}

pub fn le(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    comparison(ComparisonOp::Le, lhs, rhs)
}

pub fn gt(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    comparison(ComparisonOp::Gt, lhs, rhs)
}

pub fn ge(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Predicate {
    comparison(ComparisonOp::Ge, lhs, rhs)
}

pub fn between(value: impl Into<Expr>, lower: impl Into<Expr>, upper: impl Into<Expr>) -> Predicate {
    Predicate::new(PredicateKind::Between {
        value: value.into(),
        lower: lower.into(),
        upper: upper.into(),
    })
}

pub fn in_values(
    value: impl Into<Expr>,
    items: impl IntoIterator<Item = Value>,
) -> Predicate {
    Predicate::new(PredicateKind::In {
        value: value.into(),
        items: InItems::Values(items.into_iter().collect()),
    })
}

pub fn in_exprs(value: impl Into<Expr>, items: impl IntoIterator<Item = Expr>) -> Predicate {
    Predicate::new(PredicateKind::In {
        value: value.into(),
        items: InItems::Exprs(items.into_iter().collect()),
    })
}

pub fn in_subquery(value: impl Into<Expr>, subquery: QueryStructure) -> Predicate {
    Predicate::new(PredicateKind::In {
        value: value.into(),
        items: InItems::Subquery(Box::new(subquery)),
    })
}

pub fn like(value: impl Into<Expr>, pattern: impl Into<Expr>) -> Predicate {
    Predicate::new(PredicateKind::Like {
        value: value.into(),
        pattern: pattern.into(),
        escape: None,
    })
}

pub fn like_escaped(value: impl Into<Expr>, pattern: impl Into<Expr>, escape: char) -> Predicate {
    Predicate::new(PredicateKind::Like {
        value: value.into(),
        pattern: pattern.into(),
        escape: Some(escape),
    })
}

pub fn is_null(value: impl Into<Expr>) -> Predicate {
    Predicate::new(PredicateKind::IsNull(value.into()))
}

pub fn is_not_null(value: impl Into<Expr>) -> Predicate {
    is_null(value).negate()
}

/// `path IS EMPTY` over a plural path.
pub fn is_empty(path: Path) -> Result<Predicate> {
    if !path.kind().is_plural() {
        return Err(QueryError::InvalidComposition(
            "is_empty() requires a plural path".into(),
        ));
    }
    Ok(Predicate::new(PredicateKind::IsEmpty(path)))
}

pub fn exists(subquery: QueryStructure) -> Predicate {
    Predicate::new(PredicateKind::Exists(Box::new(subquery)))
}

/// `element MEMBER OF collection` over a plural path.
pub fn member_of(element: impl Into<Expr>, collection: Path) -> Result<Predicate> {
    if !collection.kind().is_plural() {
        return Err(QueryError::InvalidComposition(
            "member_of() requires a plural path".into(),
        ));
    }
    Ok(Predicate::new(PredicateKind::MemberOf {
        element: element.into(),
        collection,
    }))
}

/// Conjunction. Empty input renders as the neutral `1=1`.
pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::new(PredicateKind::Compound {
        op: BoolOp::And,
        parts: parts.into_iter().collect(),
    })
}

/// Disjunction. Empty input renders as the absorbing `0=1`.
pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Predicate {
    Predicate::new(PredicateKind::Compound {
        op: BoolOp::Or,
        parts: parts.into_iter().collect(),
    })
}

pub fn not(part: Predicate) -> Predicate {
    part.negate()
}

/// Truth test. A predicate passes through unchanged; a boolean expression
/// is wrapped in an explicit comparison against TRUE.
pub fn is_true(operand: impl Into<BooleanOperand>) -> Predicate {
    match operand.into() {
        BooleanOperand::Predicate(p) => p,
        BooleanOperand::Expr(e) => Predicate::new(PredicateKind::BoolTest(e)),
    }
}

/// Falsity test; the negation of [`is_true`].
pub fn is_false(operand: impl Into<BooleanOperand>) -> Predicate {
    is_true(operand).negate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::literal;

    #[test]
    fn double_negation_restores_the_original() {
        let p = gt(literal(2), literal(1));
        assert_eq!(p.clone().negate().negate(), p);
    }

    #[test]
    fn negate_flips_only_the_flag() {
        let p = gt(literal(2), literal(1)).negate();
        assert!(p.is_negated());
        assert!(matches!(
            p.kind,
            PredicateKind::Comparison {
                op: ComparisonOp::Gt,
                ..
            }
        ));
    }

    #[test]
    fn is_true_of_a_predicate_is_the_identity() {
        let p = gt(literal(2), literal(1));
        assert_eq!(is_true(p.clone()), p);
    }

    #[test]
    fn is_false_of_a_predicate_is_a_single_negation() {
        let p = gt(literal(2), literal(1));
        assert_eq!(is_false(p.clone()), p.negate());
    }

    #[test]
    fn comparison_negation_swaps_operators_pairwise() {
        assert_eq!(ComparisonOp::Eq.negate(), ComparisonOp::Ne);
        assert_eq!(ComparisonOp::Ne.negate(), ComparisonOp::Eq);
        assert_eq!(ComparisonOp::Lt.negate(), ComparisonOp::Ge);
        assert_eq!(ComparisonOp::Ge.negate(), ComparisonOp::Lt);
        assert_eq!(ComparisonOp::Le.negate(), ComparisonOp::Gt);
        assert_eq!(ComparisonOp::Gt.negate(), ComparisonOp::Le);
    }
}
