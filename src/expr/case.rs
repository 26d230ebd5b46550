//! CASE expression builders.
//!
//! Both forms require at least one WHEN arm before they can finish, which
//! the builder enforces by only offering `end()` after the first `when()`.

use crate::expr::{Expr, Predicate};

/// Starts a searched CASE expression.
pub fn case() -> CaseBuilder {
    CaseBuilder { whens: Vec::new() }
}

/// Starts a simple CASE expression over an operand.
pub fn case_of(operand: impl Into<Expr>) -> SimpleCaseBuilder {
    SimpleCaseBuilder {
        operand: operand.into(),
        whens: Vec::new(),
    }
}

/// Searched CASE under construction.
#[derive(Debug)]
pub struct CaseBuilder {
    whens: Vec<(Predicate, Expr)>,
}

impl CaseBuilder {
    pub fn when(mut self, condition: Predicate, result: impl Into<Expr>) -> CompleteCase {
        self.whens.push((condition, result.into()));
        CompleteCase { whens: self.whens }
    }
}

/// Searched CASE with at least one arm.
#[derive(Debug)]
pub struct CompleteCase {
    whens: Vec<(Predicate, Expr)>,
}

impl CompleteCase {
    pub fn when(mut self, condition: Predicate, result: impl Into<Expr>) -> Self {
        self.whens.push((condition, result.into()));
        self
    }

    pub fn otherwise(self, result: impl Into<Expr>) -> Expr {
        Expr::CaseSearched {
            whens: self.whens,
            otherwise: Some(Box::new(result.into())),
        }
    }

    pub fn end(self) -> Expr {
        Expr::CaseSearched {
            whens: self.whens,
            otherwise: None,
        }
    }
}

/// Simple CASE under construction.
#[derive(Debug)]
pub struct SimpleCaseBuilder {
    operand: Expr,
    whens: Vec<(Expr, Expr)>,
}

impl SimpleCaseBuilder {
    pub fn when(mut self, value: impl Into<Expr>, result: impl Into<Expr>) -> CompleteSimpleCase {
        self.whens.push((value.into(), result.into()));
        CompleteSimpleCase {
            operand: self.operand,
            whens: self.whens,
        }
    }
}

/// Simple CASE with at least one arm.
#[derive(Debug)]
pub struct CompleteSimpleCase {
    operand: Expr,
    whens: Vec<(Expr, Expr)>,
}

impl CompleteSimpleCase {
    pub fn when(mut self, value: impl Into<Expr>, result: impl Into<Expr>) -> Self {
        self.whens.push((value.into(), result.into()));
        self
    }

    pub fn otherwise(self, result: impl Into<Expr>) -> Expr {
        Expr::CaseSimple {
            operand: Box::new(self.operand),
            whens: self.whens,
            otherwise: Some(Box::new(result.into())),
        }
    }

    pub fn end(self) -> Expr {
        Expr::CaseSimple {
            operand: Box::new(self.operand),
            whens: self.whens,
            otherwise: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{eq, literal};

    #[test]
    fn searched_case_collects_arms_in_order() {
        let e = case()
            .when(eq(literal(1), literal(1)), literal("a"))
            .when(eq(literal(2), literal(2)), literal("b"))
            .otherwise(literal("c"));
        match e {
            Expr::CaseSearched { whens, otherwise } => {
                assert_eq!(whens.len(), 2);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }

    #[test]
    fn simple_case_keeps_its_operand() {
        let e = case_of(literal(5)).when(literal(5), literal("five")).end();
        match e {
            Expr::CaseSimple {
                operand, otherwise, ..
            } => {
                assert_eq!(*operand, literal(5));
                assert!(otherwise.is_none());
            }
            other => panic!("unexpected expression: {other:?}"),
        }
    }
}
