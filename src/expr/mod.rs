//! Value expression nodes and their constructors.
//!
//! Expressions are owned trees, created once and never mutated. Anything
//! with observable identity (sources, parameters) is referenced by handle
//! into the [`QueryContext`] instead of being embedded.

mod case;
pub mod predicate;

use compact_str::CompactString;

use crate::context::{ParamId, QueryContext, SourceId};
use crate::error::{QueryError, Result};
use crate::path::Path;
use crate::query::QueryStructure;
use crate::types::{ScalarType, TypeRef};

pub use case::{
    CaseBuilder, CompleteCase, CompleteSimpleCase, SimpleCaseBuilder, case, case_of,
};
pub use predicate::{
    BooleanOperand, BoolOp, ComparisonOp, InItems, Predicate, PredicateKind, and, between, eq,
    exists, ge, gt, in_exprs, in_subquery, in_values, is_empty, is_false, is_not_null, is_null,
    is_true, le, like, like_escaped, lt, member_of, ne, not, or,
};

/// A literal value embedded in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(CompactString),
}

impl Value {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Value::Bool(_) => ScalarType::Bool,
            Value::Int(_) => ScalarType::Long,
            Value::Float(_) => ScalarType::Double,
            Value::Text(_) => ScalarType::Text,
        }
    }

    /// Literal rendering; text values are single-quoted with `''` escaping.
    /// Floats keep a decimal point so they stay distinguishable from
    /// integer literals; non-finite floats have no query-text form.
    pub(crate) fn literal(&self) -> Result<String> {
        Ok(match self {
            Value::Bool(true) => "TRUE".to_owned(),
            Value::Bool(false) => "FALSE".to_owned(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => {
                if !v.is_finite() {
                    return Err(QueryError::Unsupported(format!(
                        "non-finite float literal: {v}"
                    )));
                }
                format!("{v:?}")
            }
            Value::Text(v) => {
                let mut out = String::with_capacity(v.len() + 2);
                out.push('\'');
                for ch in v.chars() {
                    if ch == '\'' {
                        out.push('\'');
                    }
                    out.push(ch);
                }
                out.push('\'');
                out
            }
        })
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.into())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Aggregate functions. COUNT DISTINCT is a first-class variant, not a
/// modifier bit on COUNT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    Greatest,
    Least,
}

impl AggregateKind {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            AggregateKind::Count | AggregateKind::CountDistinct => "COUNT",
            AggregateKind::Sum => "SUM",
            AggregateKind::Avg => "AVG",
            AggregateKind::Min => "MIN",
            AggregateKind::Max => "MAX",
            AggregateKind::Greatest => "GREATEST",
            AggregateKind::Least => "LEAST",
        }
    }
}

/// A typed value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    NullLiteral(TypeRef),
    Param(ParamId),
    Path(Path),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Function {
        name: CompactString,
        args: Vec<Expr>,
        ty: TypeRef,
    },
    Aggregate {
        kind: AggregateKind,
        /// `None` means `COUNT(*)`-style aggregation over the whole row.
        arg: Option<Box<Expr>>,
    },
    Coalesce(Vec<Expr>),
    NullIf(Box<Expr>, Box<Expr>),
    Concat(Vec<Expr>),
    CaseSearched {
        whens: Vec<(Predicate, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    CaseSimple {
        operand: Box<Expr>,
        whens: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Subquery(Box<QueryStructure>),
    MapKey(SourceId),
    MapEntry(SourceId),
    ListIndex(SourceId),
    Size(Path),
}

impl From<Path> for Expr {
    fn from(value: Path) -> Self {
        Expr::Path(value)
    }
}

impl Expr {
    /// The resolved value type of this expression.
    ///
    /// Binary arithmetic widens to the wider operand; division always
    /// promotes to the most general numeric type.
    pub fn value_type(&self, ctx: &QueryContext<'_>) -> TypeRef {
        match self {
            Expr::Literal(v) => TypeRef::Scalar(v.scalar_type()),
            Expr::NullLiteral(ty) => ty.clone(),
            Expr::Param(id) => ctx.param_info(*id).ty.clone(),
            Expr::Path(path) => path.ty().clone(),
            Expr::Unary { operand, .. } => operand.value_type(ctx),
            Expr::Binary { op, lhs, rhs } => {
                if *op == BinaryOp::Div {
                    return TypeRef::Scalar(ScalarType::Decimal);
                }
                let lhs = lhs.value_type(ctx);
                let rhs = rhs.value_type(ctx);
                match (lhs, rhs) {
                    (TypeRef::Scalar(a), TypeRef::Scalar(b)) => {
                        TypeRef::Scalar(ScalarType::promote(a, b))
                    }
                    (lhs, _) => lhs,
                }
            }
            Expr::Function { ty, .. } => ty.clone(),
            Expr::Aggregate { kind, arg } => match kind {
                AggregateKind::Count | AggregateKind::CountDistinct => {
                    TypeRef::Scalar(ScalarType::Long)
                }
                AggregateKind::Avg => TypeRef::Scalar(ScalarType::Double),
                _ => arg
                    .as_ref()
                    .map(|a| a.value_type(ctx))
                    .unwrap_or(TypeRef::Scalar(ScalarType::Long)),
            },
            Expr::Coalesce(items) => items
                .first()
                .map(|e| e.value_type(ctx))
                .unwrap_or(TypeRef::Scalar(ScalarType::Text)),
            Expr::NullIf(lhs, _) => lhs.value_type(ctx),
            Expr::Concat(_) => TypeRef::Scalar(ScalarType::Text),
            Expr::CaseSearched { whens, otherwise } => whens
                .first()
                .map(|(_, e)| e.value_type(ctx))
                .or_else(|| otherwise.as_ref().map(|e| e.value_type(ctx)))
                .unwrap_or(TypeRef::Scalar(ScalarType::Text)),
            Expr::CaseSimple {
                whens, otherwise, ..
            } => whens
                .first()
                .map(|(_, e)| e.value_type(ctx))
                .or_else(|| otherwise.as_ref().map(|e| e.value_type(ctx)))
                .unwrap_or(TypeRef::Scalar(ScalarType::Text)),
            Expr::Subquery(sub) => sub
                .result_shape()
                .type_ref()
                .unwrap_or(TypeRef::Scalar(ScalarType::Long)),
            Expr::MapKey(id) => match &ctx.source(*id).plurality {
                crate::context::Plurality::Map { key } => key.clone(),
                _ => TypeRef::Scalar(ScalarType::Text),
            },
            Expr::MapEntry(id) => ctx.source(*id).target.clone(),
            Expr::ListIndex(_) => TypeRef::Scalar(ScalarType::Int),
            Expr::Size(_) => TypeRef::Scalar(ScalarType::Long),
        }
    }

    /// Appends every parameter handle reachable below this node, in
    /// discovery order, skipping duplicates already present in `out`.
    pub(crate) fn collect_params(&self, out: &mut Vec<ParamId>) {
        match self {
            Expr::Param(id) => push_unique(out, *id),
            Expr::Literal(_)
            | Expr::NullLiteral(_)
            | Expr::Path(_)
            | Expr::MapKey(_)
            | Expr::MapEntry(_)
            | Expr::ListIndex(_)
            | Expr::Size(_) => {}
            Expr::Unary { operand, .. } => operand.collect_params(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_params(out);
                rhs.collect_params(out);
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_params(out);
                }
            }
            Expr::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.collect_params(out);
                }
            }
            Expr::Coalesce(items) | Expr::Concat(items) => {
                for item in items {
                    item.collect_params(out);
                }
            }
            Expr::NullIf(lhs, rhs) => {
                lhs.collect_params(out);
                rhs.collect_params(out);
            }
            Expr::CaseSearched { whens, otherwise } => {
                for (condition, result) in whens {
                    condition.collect_params(out);
                    result.collect_params(out);
                }
                if let Some(e) = otherwise {
                    e.collect_params(out);
                }
            }
            Expr::CaseSimple {
                operand,
                whens,
                otherwise,
            } => {
                operand.collect_params(out);
                for (value, result) in whens {
                    value.collect_params(out);
                    result.collect_params(out);
                }
                if let Some(e) = otherwise {
                    e.collect_params(out);
                }
            }
            Expr::Subquery(sub) => sub.collect_params(out),
        }
    }
}

pub(crate) fn push_unique(out: &mut Vec<ParamId>, id: ParamId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

// ==================== constructors ====================

pub fn literal(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

pub fn null_literal(ty: impl Into<TypeRef>) -> Expr {
    Expr::NullLiteral(ty.into())
}

pub fn neg(operand: Expr) -> Expr {
    Expr::Unary {
        op: UnaryOp::Neg,
        operand: Box::new(operand),
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Add, lhs, rhs)
}

pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Sub, lhs, rhs)
}

pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Mul, lhs, rhs)
}

pub fn div(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Div, lhs, rhs)
}

pub fn rem(lhs: Expr, rhs: Expr) -> Expr {
    binary(BinaryOp::Mod, lhs, rhs)
}

fn aggregate(kind: AggregateKind, arg: Expr) -> Expr {
    Expr::Aggregate {
        kind,
        arg: Some(Box::new(arg)),
    }
}

pub fn count(arg: Expr) -> Expr {
    aggregate(AggregateKind::Count, arg)
}

/// `COUNT(*)`.
pub fn count_all() -> Expr {
    Expr::Aggregate {
        kind: AggregateKind::Count,
        arg: None,
    }
}

pub fn count_distinct(arg: Expr) -> Expr {
    aggregate(AggregateKind::CountDistinct, arg)
}

pub fn sum(arg: Expr) -> Expr {
    aggregate(AggregateKind::Sum, arg)
}

pub fn avg(arg: Expr) -> Expr {
    aggregate(AggregateKind::Avg, arg)
}

pub fn min(arg: Expr) -> Expr {
    aggregate(AggregateKind::Min, arg)
}

pub fn max(arg: Expr) -> Expr {
    aggregate(AggregateKind::Max, arg)
}

pub fn greatest(arg: Expr) -> Expr {
    aggregate(AggregateKind::Greatest, arg)
}

pub fn least(arg: Expr) -> Expr {
    aggregate(AggregateKind::Least, arg)
}

pub fn coalesce(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Coalesce(items.into_iter().collect())
}

pub fn nullif(lhs: Expr, rhs: Expr) -> Expr {
    Expr::NullIf(Box::new(lhs), Box::new(rhs))
}

pub fn concat(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Concat(items.into_iter().collect())
}

/// Generic named function call with a declared result type.
pub fn function(
    name: impl Into<CompactString>,
    args: impl IntoIterator<Item = Expr>,
    ty: impl Into<TypeRef>,
) -> Expr {
    Expr::Function {
        name: name.into(),
        args: args.into_iter().collect(),
        ty: ty.into(),
    }
}

pub fn lower(arg: Expr) -> Expr {
    function("LOWER", [arg], ScalarType::Text)
}

pub fn upper(arg: Expr) -> Expr {
    function("UPPER", [arg], ScalarType::Text)
}

pub fn trim(arg: Expr) -> Expr {
    function("TRIM", [arg], ScalarType::Text)
}

pub fn length(arg: Expr) -> Expr {
    function("LENGTH", [arg], ScalarType::Int)
}

pub fn locate(source: Expr, pattern: Expr) -> Expr {
    function("LOCATE", [pattern, source], ScalarType::Int)
}

pub fn substring(source: Expr, start: Expr, len: Option<Expr>) -> Expr {
    let mut args = vec![source, start];
    if let Some(len) = len {
        args.push(len);
    }
    function("SUBSTRING", args, ScalarType::Text)
}

pub fn abs(arg: Expr) -> Expr {
    function("ABS", [arg], ScalarType::Double)
}

pub fn sqrt(arg: Expr) -> Expr {
    function("SQRT", [arg], ScalarType::Double)
}

pub fn current_date() -> Expr {
    function("CURRENT_DATE", [], ScalarType::Date)
}

pub fn current_time() -> Expr {
    function("CURRENT_TIME", [], ScalarType::Time)
}

pub fn current_timestamp() -> Expr {
    function("CURRENT_TIMESTAMP", [], ScalarType::Timestamp)
}

/// `SIZE(path)` over a plural path.
pub fn size(path: Path) -> Result<Expr> {
    if !path.kind().is_plural() {
        return Err(QueryError::InvalidComposition(
            "size() requires a plural path".into(),
        ));
    }
    Ok(Expr::Size(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::QueryContext;
    use crate::metadata::{EntityType, SchemaMetamodel};

    fn model() -> SchemaMetamodel {
        SchemaMetamodel::new().with_entity(
            EntityType::new("Order")
                .basic("quantity", ScalarType::Int)
                .basic("amount", ScalarType::Decimal),
        )
    }

    #[test]
    fn binary_ops_widen_to_the_wider_operand() {
        let model = model();
        let ctx = QueryContext::new(&model);
        let e = add(literal(1i64), literal(2.5f64));
        assert_eq!(e.value_type(&ctx), TypeRef::Scalar(ScalarType::Double));
    }

    #[test]
    fn division_promotes_to_the_most_general_numeric_type() {
        let model = model();
        let ctx = QueryContext::new(&model);
        let e = div(literal(1i64), literal(2i64));
        assert_eq!(e.value_type(&ctx), TypeRef::Scalar(ScalarType::Decimal));
    }

    #[test]
    fn count_is_long_and_avg_is_double() {
        let model = model();
        let ctx = QueryContext::new(&model);
        assert_eq!(
            count(literal(1i64)).value_type(&ctx),
            TypeRef::Scalar(ScalarType::Long)
        );
        assert_eq!(
            avg(literal(1i64)).value_type(&ctx),
            TypeRef::Scalar(ScalarType::Double)
        );
    }

    #[test]
    fn text_literals_escape_quotes() {
        assert_eq!(Value::from("it's").literal().unwrap(), "'it''s'");
    }

    #[test]
    fn float_literals_keep_a_decimal_point() {
        assert_eq!(Value::from(1.0f64).literal().unwrap(), "1.0");
        assert_eq!(Value::from(2.5f64).literal().unwrap(), "2.5");
    }

    #[test]
    fn non_finite_float_literals_are_rejected() {
        let err = Value::from(f64::NAN).literal().unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
        let err = Value::from(f64::INFINITY).literal().unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn size_rejects_singular_paths() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = crate::query::QueryStructure::new(crate::query::ResultShape::Untyped);
        let root = q.from(&mut ctx, "Order").unwrap();
        let amount = ctx.path(root).navigate(&ctx, "amount").unwrap();
        assert!(size(amount).is_err());
    }
}
