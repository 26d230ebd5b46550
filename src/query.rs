//! Query structure: roots, selection, restriction, grouping and ordering.
//!
//! A [`QueryStructure`] is pure data over context handles. Subqueries are
//! the same type with the `subquery` flag set; they are owned by the
//! predicate or expression node that references them and share the outer
//! query's context, which is what makes correlation handles meaningful
//! across the boundary.

use compact_str::CompactString;

use crate::context::{ParamId, QueryContext, SourceId, SourceNode};
use crate::error::{QueryError, Result};
use crate::expr::{Expr, Predicate};
use crate::types::{ScalarType, TypeRef};

/// How a multi-expression selection packages its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompoundKind {
    Tuple,
    Array,
    Constructor(CompactString),
}

/// One selection item: a single expression or a compound of items.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Expr(Expr),
    Compound {
        kind: CompoundKind,
        parts: Vec<Selection>,
    },
}

impl Selection {
    pub fn expr(e: impl Into<Expr>) -> Selection {
        Selection::Expr(e.into())
    }

    /// Tuple-shaped compound. Tuple and array compounds cannot nest.
    pub fn tuple(parts: impl IntoIterator<Item = Selection>) -> Result<Selection> {
        Self::compound(CompoundKind::Tuple, parts.into_iter().collect())
    }

    /// Array-shaped compound. Tuple and array compounds cannot nest.
    pub fn array(parts: impl IntoIterator<Item = Selection>) -> Result<Selection> {
        Self::compound(CompoundKind::Array, parts.into_iter().collect())
    }

    /// Constructor-shaped compound: `NEW Name(args)`.
    pub fn constructor(
        name: impl Into<CompactString>,
        parts: impl IntoIterator<Item = Selection>,
    ) -> Result<Selection> {
        Self::compound(
            CompoundKind::Constructor(name.into()),
            parts.into_iter().collect(),
        )
    }

    fn compound(kind: CompoundKind, parts: Vec<Selection>) -> Result<Selection> {
        for part in &parts {
            if let Selection::Compound {
                kind: CompoundKind::Tuple | CompoundKind::Array,
                ..
            } = part
            {
                return Err(QueryError::InvalidComposition(
                    "tuple- and array-shaped selections cannot be nested".into(),
                ));
            }
        }
        Ok(Selection::Compound { kind, parts })
    }

    pub(crate) fn collect_params(&self, out: &mut Vec<ParamId>) {
        match self {
            Selection::Expr(e) => e.collect_params(out),
            Selection::Compound { parts, .. } => {
                for part in parts {
                    part.collect_params(out);
                }
            }
        }
    }
}

/// One ordering element.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub(crate) expr: Expr,
    pub(crate) ascending: bool,
}

pub fn asc(expr: impl Into<Expr>) -> Order {
    Order {
        expr: expr.into(),
        ascending: true,
    }
}

pub fn desc(expr: impl Into<Expr>) -> Order {
    Order {
        expr: expr.into(),
        ascending: false,
    }
}

/// Declared result shape of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultShape {
    /// Rows packaged as positional tuples.
    Tuple,
    /// Rows packaged as arrays.
    Array,
    /// No declared shape; a single selection passes through unwrapped.
    Untyped,
    Entity(CompactString),
    Scalar(ScalarType),
    Constructor(CompactString),
}

impl ResultShape {
    /// The value type a subquery of this shape produces, when it has one.
    pub(crate) fn type_ref(&self) -> Option<TypeRef> {
        match self {
            ResultShape::Scalar(ty) => Some(TypeRef::Scalar(*ty)),
            ResultShape::Entity(name) | ResultShape::Constructor(name) => {
                Some(TypeRef::Entity(name.clone()))
            }
            ResultShape::Tuple | ResultShape::Array | ResultShape::Untyped => None,
        }
    }
}

/// The declarative form of one query level.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStructure {
    pub(crate) result: ResultShape,
    pub(crate) subquery: bool,
    pub(crate) roots: Vec<SourceId>,
    /// Sources borrowed from the outer query, emitted after the roots.
    pub(crate) correlations: Vec<SourceId>,
    pub(crate) selection: Option<Selection>,
    pub(crate) restriction: Option<Predicate>,
    pub(crate) groupings: Vec<Expr>,
    pub(crate) having: Option<Predicate>,
    pub(crate) orders: Vec<Order>,
    pub(crate) distinct: bool,
}

impl QueryStructure {
    pub fn new(result: ResultShape) -> Self {
        Self::with_level(result, false)
    }

    /// A nested query level. Fetches and ordering are rejected inside it.
    pub fn subquery(result: ResultShape) -> Self {
        Self::with_level(result, true)
    }

    fn with_level(result: ResultShape, subquery: bool) -> Self {
        Self {
            result,
            subquery,
            roots: Vec::new(),
            correlations: Vec::new(),
            selection: None,
            restriction: None,
            groupings: Vec::new(),
            having: None,
            orders: Vec::new(),
            distinct: false,
        }
    }

    pub fn result_shape(&self) -> &ResultShape {
        &self.result
    }

    pub fn is_subquery(&self) -> bool {
        self.subquery
    }

    /// Adds a root over the named entity.
    pub fn from(&mut self, ctx: &mut QueryContext<'_>, entity: &str) -> Result<SourceId> {
        let ty: CompactString = ctx
            .metamodel()
            .entity(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_owned()))?
            .name()
            .into();
        let id = ctx.alloc_source(SourceNode {
            parent: None,
            attribute: None,
            target: TypeRef::Entity(ty),
            plurality: crate::context::Plurality::Singular,
            kind: crate::context::SourceKind::Root,
            joins: Vec::new(),
            fetches: Vec::new(),
            in_subquery: self.subquery,
            correlation_parent: None,
        });
        self.roots.push(id);
        Ok(id)
    }

    /// Borrows an outer source into this subquery. The returned source is a
    /// distinct node that remembers exactly which outer node it came from,
    /// so two structurally equal outer joins correlate independently.
    pub fn correlate(&mut self, ctx: &mut QueryContext<'_>, outer: SourceId) -> Result<SourceId> {
        if !self.subquery {
            return Err(QueryError::InvalidComposition(
                "correlate() is only available on a subquery".into(),
            ));
        }
        let original = ctx.source(outer).clone();
        let id = ctx.alloc_source(SourceNode {
            parent: original.parent,
            attribute: original.attribute,
            target: original.target,
            plurality: original.plurality,
            kind: original.kind,
            joins: Vec::new(),
            fetches: Vec::new(),
            in_subquery: true,
            correlation_parent: Some(outer),
        });
        self.correlations.push(id);
        Ok(id)
    }

    /// Sets the selection, replacing any previous one.
    pub fn select(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection);
        self
    }

    pub fn select_expr(&mut self, expr: impl Into<Expr>) -> &mut Self {
        self.select(Selection::Expr(expr.into()))
    }

    /// Packages several selection items according to the declared result
    /// shape. An untyped query keeps a single item unwrapped and packages
    /// several as an array; any concretely typed shape becomes a
    /// constructor call naming the declared type.
    pub fn multiselect(&mut self, items: impl IntoIterator<Item = Selection>) -> Result<&mut Self> {
        let mut items: Vec<Selection> = items.into_iter().collect();
        let selection = match &self.result {
            ResultShape::Tuple => Selection::tuple(items)?,
            ResultShape::Array => Selection::array(items)?,
            ResultShape::Constructor(name) => Selection::constructor(name.clone(), items)?,
            ResultShape::Entity(name) => Selection::constructor(name.clone(), items)?,
            ResultShape::Scalar(ty) => Selection::constructor(ty.name(), items)?,
            ResultShape::Untyped => match items.len() {
                1 => items.swap_remove(0),
                _ => Selection::array(items)?,
            },
        };
        self.selection = Some(selection);
        Ok(self)
    }

    /// Sets the WHERE restriction, replacing any previous one.
    pub fn restrict(&mut self, predicate: Predicate) -> &mut Self {
        self.restriction = Some(predicate);
        self
    }

    pub fn group_by(&mut self, exprs: impl IntoIterator<Item = Expr>) -> &mut Self {
        self.groupings = exprs.into_iter().collect();
        self
    }

    /// Sets the HAVING restriction, replacing any previous one.
    pub fn having(&mut self, predicate: Predicate) -> &mut Self {
        self.having = Some(predicate);
        self
    }

    /// Sets the ordering. Subqueries cannot be ordered.
    pub fn order_by(&mut self, orders: impl IntoIterator<Item = Order>) -> Result<&mut Self> {
        if self.subquery {
            return Err(QueryError::InvalidComposition(
                "a subquery cannot carry an ORDER BY clause".into(),
            ));
        }
        self.orders = orders.into_iter().collect();
        Ok(self)
    }

    pub fn distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    /// Every parameter the query depends on, in first-discovery order over
    /// selection, restriction, grouping and having, including nested
    /// subqueries. Ordering expressions are excluded; they reuse parameters
    /// already bound elsewhere or none at all.
    pub fn parameters(&self) -> Vec<ParamId> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    pub(crate) fn collect_params(&self, out: &mut Vec<ParamId>) {
        if let Some(selection) = &self.selection {
            selection.collect_params(out);
        }
        if let Some(restriction) = &self.restriction {
            restriction.collect_params(out);
        }
        for grouping in &self.groupings {
            grouping.collect_params(out);
        }
        if let Some(having) = &self.having {
            having.collect_params(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::QueryContext;
    use crate::expr::{eq, gt, literal};
    use crate::metadata::{EntityType, SchemaMetamodel};
    use crate::types::ScalarType;

    fn model() -> SchemaMetamodel {
        SchemaMetamodel::new().with_entity(
            EntityType::new("Customer")
                .basic("name", ScalarType::Text)
                .basic("age", ScalarType::Int),
        )
    }

    #[test]
    fn from_rejects_unknown_entities() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let err = q.from(&mut ctx, "Nope").unwrap_err();
        assert!(matches!(err, QueryError::UnknownEntity(_)));
    }

    #[test]
    fn nested_tuple_selections_are_rejected() {
        let inner = Selection::tuple([Selection::expr(literal(1))]).unwrap();
        let err = Selection::tuple([inner]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidComposition(_)));
    }

    #[test]
    fn constructor_selections_may_hold_plain_items() {
        let sel = Selection::constructor(
            "CustomerView",
            [Selection::expr(literal("a")), Selection::expr(literal(1))],
        );
        assert!(sel.is_ok());
    }

    #[test]
    fn untyped_multiselect_unwraps_a_single_item() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        q.from(&mut ctx, "Customer").unwrap();
        q.multiselect([Selection::expr(literal(1))]).unwrap();
        assert!(matches!(q.selection, Some(Selection::Expr(_))));

        q.multiselect([Selection::expr(literal(1)), Selection::expr(literal(2))])
            .unwrap();
        assert!(matches!(
            q.selection,
            Some(Selection::Compound {
                kind: CompoundKind::Array,
                ..
            })
        ));
    }

    #[test]
    fn typed_multiselect_builds_a_constructor_of_the_declared_type() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Entity("Customer".into()));
        q.from(&mut ctx, "Customer").unwrap();
        q.multiselect([Selection::expr(literal("a")), Selection::expr(literal(1))])
            .unwrap();
        assert!(matches!(
            &q.selection,
            Some(Selection::Compound {
                kind: CompoundKind::Constructor(name),
                ..
            }) if name == "Customer"
        ));

        let mut q = QueryStructure::new(ResultShape::Scalar(ScalarType::Long));
        q.from(&mut ctx, "Customer").unwrap();
        q.multiselect([Selection::expr(literal(1))]).unwrap();
        assert!(matches!(
            &q.selection,
            Some(Selection::Compound {
                kind: CompoundKind::Constructor(name),
                ..
            }) if name == "Long"
        ));
    }

    #[test]
    fn correlate_is_rejected_outside_subqueries() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let err = q.correlate(&mut ctx, root).unwrap_err();
        assert!(matches!(err, QueryError::InvalidComposition(_)));
    }

    #[test]
    fn subqueries_cannot_be_ordered() {
        let mut sub = QueryStructure::subquery(ResultShape::Scalar(ScalarType::Long));
        let err = sub.order_by([asc(literal(1))]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidComposition(_)));
    }

    #[test]
    fn parameters_skip_ordering_and_deduplicate() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        q.from(&mut ctx, "Customer").unwrap();
        let p = ctx.parameter(ScalarType::Int);
        q.restrict(crate::expr::and([
            gt(p.clone(), literal(0)),
            eq(p.clone(), p.clone()),
        ]));
        q.order_by([asc(ctx.parameter(ScalarType::Int))]).unwrap();
        assert_eq!(q.parameters().len(), 1);
    }
}
