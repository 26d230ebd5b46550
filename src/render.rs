//! Rendering: alias assignment and query-text emission.
//!
//! A [`Renderer`] is single-use. Aliases are handed out in emission order
//! (`t0`, `t1`, ...) and recorded per source handle, so rendering the same
//! structure through two fresh renderers produces byte-identical output.
//! Correlated sources never receive a fresh alias; they resolve through
//! their correlation parent and surface the outer alias instead.

use compact_str::{CompactString, format_compact};
use hashbrown::HashMap;

use crate::context::{ParamId, ParamInfo, QueryContext, SourceId, SourceKind};
use crate::error::{QueryError, Result};
use crate::expr::{
    AggregateKind, BinaryOp, BoolOp, Expr, InItems, Predicate, PredicateKind, UnaryOp, Value,
};
use crate::path::Path;
use crate::query::{CompoundKind, Order, QueryStructure, Selection};
use crate::sql::{Sql, Token};

/// The finished output: query text plus the parameters it references, in
/// first-use order with duplicates collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub sql: String,
    pub params: Vec<ParamInfo>,
}

/// Single-use compiler for one top-level query structure.
pub struct Renderer {
    aliases: HashMap<SourceId, CompactString>,
    next_alias: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
            next_alias: 0,
        }
    }

    /// Compiles a top-level query structure to text and parameter metadata.
    pub fn compile(mut self, ctx: &QueryContext<'_>, query: &QueryStructure) -> Result<Compiled> {
        if query.is_subquery() {
            return Err(QueryError::InvalidComposition(
                "a subquery cannot be compiled on its own".into(),
            ));
        }
        let fragment = self.render_structure(ctx, query)?;
        let (sql, encountered) = fragment.build();
        #[cfg(feature = "tracing")]
        tracing::debug!(sql = %sql, params = encountered.len(), "compiled query");
        let mut seen: Vec<ParamId> = Vec::new();
        let mut params = Vec::with_capacity(encountered.len());
        for id in encountered {
            if !seen.contains(&id) {
                seen.push(id);
                params.push(ctx.param_info(id).clone());
            }
        }
        Ok(Compiled { sql, params })
    }

    fn render_structure(&mut self, ctx: &QueryContext<'_>, q: &QueryStructure) -> Result<Sql> {
        for root in &q.roots {
            self.assign_tree(ctx, *root);
        }
        for correlated in &q.correlations {
            // The correlated source reuses the outer alias; only the joins
            // hanging off it are new.
            self.assign_children(ctx, *correlated);
        }

        let mut out = Sql::token(Token::Select);
        if q.distinct {
            out = out.push(Token::Distinct);
        }
        out = out.append(self.projection(ctx, q)?);

        let mut from_elements = Vec::with_capacity(q.roots.len() + q.correlations.len());
        for root in &q.roots {
            from_elements.push(self.root_element(ctx, *root)?);
        }
        for correlated in &q.correlations {
            from_elements.push(self.correlated_element(ctx, *correlated)?);
        }
        if from_elements.is_empty() {
            return Err(QueryError::InvalidComposition(
                "query has no sources".into(),
            ));
        }
        out = out
            .push(Token::From)
            .append(Sql::join(from_elements, Token::Comma));

        if let Some(restriction) = &q.restriction {
            out = out
                .push(Token::Where)
                .append(self.emit_predicate(ctx, restriction)?);
        }
        if !q.groupings.is_empty() {
            let mut groups = Vec::with_capacity(q.groupings.len());
            for g in &q.groupings {
                groups.push(self.emit_expr(ctx, g)?);
            }
            out = out
                .push(Token::GroupBy)
                .append(Sql::join(groups, Token::Comma));
        }
        if let Some(having) = &q.having {
            out = out
                .push(Token::Having)
                .append(self.emit_predicate(ctx, having)?);
        }
        if !q.orders.is_empty() {
            let mut orders = Vec::with_capacity(q.orders.len());
            for order in &q.orders {
                orders.push(self.emit_order(ctx, order)?);
            }
            out = out
                .push(Token::OrderBy)
                .append(Sql::join(orders, Token::Comma));
        }
        Ok(out)
    }

    // ==================== aliases ====================

    fn assign_tree(&mut self, ctx: &QueryContext<'_>, id: SourceId) {
        let alias = format_compact!("t{}", self.next_alias);
        self.next_alias += 1;
        self.aliases.insert(id, alias);
        self.assign_children(ctx, id);
    }

    fn assign_children(&mut self, ctx: &QueryContext<'_>, id: SourceId) {
        let node = ctx.source(id);
        for join in node.joins.clone() {
            self.assign_tree(ctx, join);
        }
        for fetch in node.fetches.clone() {
            self.assign_tree(ctx, fetch);
        }
    }

    /// Resolves the rendering alias of a source, following the correlation
    /// chain to the outer original when the source has no alias of its own.
    fn alias(&self, ctx: &QueryContext<'_>, id: SourceId) -> Result<CompactString> {
        if let Some(alias) = self.aliases.get(&id) {
            return Ok(alias.clone());
        }
        if let Some(outer) = ctx.correlation_parent(id) {
            return self.alias(ctx, outer);
        }
        Err(QueryError::InvalidComposition(
            "source is not part of the query being rendered".into(),
        ))
    }

    // ==================== projection and sources ====================

    fn projection(&mut self, ctx: &QueryContext<'_>, q: &QueryStructure) -> Result<Sql> {
        match &q.selection {
            Some(selection) => self.emit_selection(ctx, selection),
            None => match q.roots.as_slice() {
                [root] => Ok(Sql::ident(self.alias(ctx, *root)?)),
                [] => Err(QueryError::InvalidComposition(
                    "query has no sources".into(),
                )),
                _ => Err(QueryError::InvalidComposition(
                    "a query with multiple roots requires an explicit selection".into(),
                )),
            },
        }
    }

    fn emit_selection(&mut self, ctx: &QueryContext<'_>, selection: &Selection) -> Result<Sql> {
        match selection {
            Selection::Expr(e) => self.emit_expr(ctx, e),
            Selection::Compound { kind, parts } => {
                let mut items = Vec::with_capacity(parts.len());
                for part in parts {
                    items.push(self.emit_selection(ctx, part)?);
                }
                let list = Sql::join(items, Token::Comma);
                Ok(match kind {
                    CompoundKind::Tuple | CompoundKind::Array => list,
                    CompoundKind::Constructor(name) => Sql::token(Token::New)
                        .append(Sql::func(name.clone(), list)),
                })
            }
        }
    }

    fn root_element(&mut self, ctx: &QueryContext<'_>, id: SourceId) -> Result<Sql> {
        let node = ctx.source(id);
        let mut out = Sql::raw(node.target.name().to_owned())
            .push(Token::As)
            .append(Sql::ident(self.alias(ctx, id)?));
        out = self.append_children(ctx, out, id)?;
        Ok(out)
    }

    /// A correlated source surfaces only the outer alias; the interesting
    /// part is the joins hanging off it.
    fn correlated_element(&mut self, ctx: &QueryContext<'_>, id: SourceId) -> Result<Sql> {
        let mut out = Sql::ident(self.alias(ctx, id)?);
        out = self.append_children(ctx, out, id)?;
        Ok(out)
    }

    fn append_children(
        &mut self,
        ctx: &QueryContext<'_>,
        mut out: Sql,
        id: SourceId,
    ) -> Result<Sql> {
        let node = ctx.source(id);
        for join in node.joins.clone() {
            out = out.append(self.join_element(ctx, join)?);
        }
        for fetch in node.fetches.clone() {
            out = out.append(self.join_element(ctx, fetch)?);
        }
        Ok(out)
    }

    fn join_element(&mut self, ctx: &QueryContext<'_>, id: SourceId) -> Result<Sql> {
        let node = ctx.source(id);
        let parent = node.parent.ok_or_else(|| {
            QueryError::InvalidComposition("join source has no parent".into())
        })?;
        let parent_alias = self.alias(ctx, parent)?;
        let alias = self.alias(ctx, id)?;

        let mut out = match node.kind {
            SourceKind::Join(kind) => {
                let attribute = node.attribute.clone().ok_or_else(|| {
                    QueryError::InvalidComposition("join source has no attribute".into())
                })?;
                Sql::raw(kind.keyword())
                    .append(Sql::ident(parent_alias))
                    .push(Token::Dot)
                    .append(Sql::ident(attribute))
            }
            SourceKind::Fetch(kind) => {
                let attribute = node.attribute.clone().ok_or_else(|| {
                    QueryError::InvalidComposition("fetch source has no attribute".into())
                })?;
                Sql::raw(kind.keyword())
                    .push(Token::Fetch)
                    .append(Sql::ident(parent_alias))
                    .push(Token::Dot)
                    .append(Sql::ident(attribute))
            }
            SourceKind::KeyJoin(kind) => Sql::raw(kind.keyword())
                .append(Sql::func("KEY", Sql::ident(parent_alias))),
            SourceKind::Root => {
                return Err(QueryError::InvalidComposition(
                    "root source emitted as a join".into(),
                ));
            }
        };
        out = out.push(Token::As).append(Sql::ident(alias));
        self.append_children(ctx, out, id)
    }

    // ==================== expressions ====================

    fn emit_expr(&mut self, ctx: &QueryContext<'_>, expr: &Expr) -> Result<Sql> {
        Ok(match expr {
            Expr::Literal(v) => Sql::raw(v.literal()?),
            Expr::NullLiteral(_) => Sql::token(Token::Null),
            Expr::Param(id) => Sql::param(*id, ctx.param_info(*id).name.clone()),
            Expr::Path(path) => self.emit_path(ctx, path)?,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => Sql::token(Token::Minus).append(self.emit_operand(ctx, operand)?),
            Expr::Binary { op, lhs, rhs } => self
                .emit_operand(ctx, lhs)?
                .push(binary_token(*op))
                .append(self.emit_operand(ctx, rhs)?),
            Expr::Function { name, args, .. } => {
                if args.is_empty() {
                    Sql::raw(name.clone())
                } else {
                    let mut items = Vec::with_capacity(args.len());
                    for arg in args {
                        items.push(self.emit_expr(ctx, arg)?);
                    }
                    Sql::func(name.clone(), Sql::join(items, Token::Comma))
                }
            }
            Expr::Aggregate { kind, arg } => {
                let inner = match (kind, arg) {
                    (_, None) => Sql::token(Token::Star),
                    (AggregateKind::CountDistinct, Some(arg)) => {
                        Sql::token(Token::Distinct).append(self.emit_expr(ctx, arg)?)
                    }
                    (_, Some(arg)) => self.emit_expr(ctx, arg)?,
                };
                Sql::func(kind.name(), inner)
            }
            Expr::Coalesce(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.emit_expr(ctx, item)?);
                }
                Sql::func("COALESCE", Sql::join(parts, Token::Comma))
            }
            Expr::NullIf(lhs, rhs) => {
                let args = self
                    .emit_expr(ctx, lhs)?
                    .push(Token::Comma)
                    .append(self.emit_expr(ctx, rhs)?);
                Sql::func("NULLIF", args)
            }
            Expr::Concat(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    parts.push(self.emit_expr(ctx, item)?);
                }
                Sql::func("CONCAT", Sql::join(parts, Token::Comma))
            }
            Expr::CaseSearched { whens, otherwise } => {
                let mut out = Sql::token(Token::Case);
                for (condition, result) in whens {
                    out = out
                        .push(Token::When)
                        .append(self.emit_predicate(ctx, condition)?)
                        .push(Token::Then)
                        .append(self.emit_expr(ctx, result)?);
                }
                if let Some(otherwise) = otherwise {
                    out = out
                        .push(Token::Else)
                        .append(self.emit_expr(ctx, otherwise)?);
                }
                out.push(Token::End)
            }
            Expr::CaseSimple {
                operand,
                whens,
                otherwise,
            } => {
                let mut out = Sql::token(Token::Case).append(self.emit_expr(ctx, operand)?);
                for (value, result) in whens {
                    out = out
                        .push(Token::When)
                        .append(self.emit_expr(ctx, value)?)
                        .push(Token::Then)
                        .append(self.emit_expr(ctx, result)?);
                }
                if let Some(otherwise) = otherwise {
                    out = out
                        .push(Token::Else)
                        .append(self.emit_expr(ctx, otherwise)?);
                }
                out.push(Token::End)
            }
            Expr::Subquery(sub) => self.render_structure(ctx, sub)?.parens(),
            Expr::MapKey(id) => Sql::func("KEY", Sql::ident(self.alias(ctx, *id)?)),
            Expr::MapEntry(id) => Sql::func("ENTRY", Sql::ident(self.alias(ctx, *id)?)),
            Expr::ListIndex(id) => Sql::func("INDEX", Sql::ident(self.alias(ctx, *id)?)),
            Expr::Size(path) => Sql::func("SIZE", self.emit_path(ctx, path)?),
        })
    }

    /// Nested arithmetic is parenthesized; everything else stands alone.
    fn emit_operand(&mut self, ctx: &QueryContext<'_>, expr: &Expr) -> Result<Sql> {
        let fragment = self.emit_expr(ctx, expr)?;
        Ok(if matches!(expr, Expr::Binary { .. }) {
            fragment.parens()
        } else {
            fragment
        })
    }

    fn emit_path(&mut self, ctx: &QueryContext<'_>, path: &Path) -> Result<Sql> {
        let mut out = Sql::ident(self.alias(ctx, path.source)?);
        for segment in &path.segments {
            out = out.push(Token::Dot).append(Sql::ident(segment.clone()));
        }
        Ok(out)
    }

    fn emit_order(&mut self, ctx: &QueryContext<'_>, order: &Order) -> Result<Sql> {
        let direction = if order.ascending {
            Token::Asc
        } else {
            Token::Desc
        };
        Ok(self.emit_expr(ctx, &order.expr)?.push(direction))
    }

    // ==================== predicates ====================

    /// Emits a predicate, resolving the lazy negation flag. Simple kinds
    /// negate by operator swap; compounds are wrapped in `NOT (...)`.
    fn emit_predicate(&mut self, ctx: &QueryContext<'_>, p: &Predicate) -> Result<Sql> {
        let negated = p.is_negated();
        Ok(match &p.kind {
            PredicateKind::Comparison { op, lhs, rhs } => {
                let op = if negated { op.negate() } else { *op };
                self.emit_operand(ctx, lhs)?
                    .push(op.token())
                    .append(self.emit_operand(ctx, rhs)?)
            }
            PredicateKind::Between {
                value,
                lower,
                upper,
            } => {
                let mut out = self.emit_operand(ctx, value)?;
                if negated {
                    out = out.push(Token::Not);
                }
                out.push(Token::Between)
                    .append(self.emit_operand(ctx, lower)?)
                    .push(Token::And)
                    .append(self.emit_operand(ctx, upper)?)
            }
            PredicateKind::In { value, items } => {
                let mut out = self.emit_operand(ctx, value)?;
                if negated {
                    out = out.push(Token::Not);
                }
                out.push(Token::In).append(self.emit_in_items(ctx, items)?)
            }
            PredicateKind::Like {
                value,
                pattern,
                escape,
            } => {
                let mut out = self.emit_operand(ctx, value)?;
                if negated {
                    out = out.push(Token::Not);
                }
                out = out
                    .push(Token::Like)
                    .append(self.emit_operand(ctx, pattern)?);
                if let Some(escape) = escape {
                    out = out
                        .push(Token::Escape)
                        .append(Sql::raw(Value::from(escape.to_string()).literal()?));
                }
                out
            }
            PredicateKind::IsNull(value) => {
                let mut out = self.emit_operand(ctx, value)?.push(Token::Is);
                if negated {
                    out = out.push(Token::Not);
                }
                out.push(Token::Null)
            }
            PredicateKind::IsEmpty(path) => {
                let mut out = self.emit_path(ctx, path)?.push(Token::Is);
                if negated {
                    out = out.push(Token::Not);
                }
                out.push(Token::Empty)
            }
            PredicateKind::Exists(sub) => {
                let mut out = Sql::empty();
                if negated {
                    out = out.push(Token::Not);
                }
                out.push(Token::Exists)
                    .append(self.render_structure(ctx, sub)?.parens())
            }
            PredicateKind::MemberOf {
                element,
                collection,
            } => {
                let mut out = self.emit_operand(ctx, element)?;
                if negated {
                    out = out.push(Token::Not);
                }
                out.push(Token::Member)
                    .push(Token::Of)
                    .append(self.emit_path(ctx, collection)?)
            }
            PredicateKind::BoolTest(expr) => {
                let op = if negated { Token::Ne } else { Token::Eq };
                self.emit_operand(ctx, expr)?
                    .push(op)
                    .push(Token::True)
            }
            PredicateKind::Compound { op, parts } => {
                let inner = self.emit_compound(ctx, *op, parts)?;
                if negated {
                    Sql::token(Token::Not).append(inner.parens())
                } else {
                    inner
                }
            }
        })
    }

    fn emit_compound(
        &mut self,
        ctx: &QueryContext<'_>,
        op: BoolOp,
        parts: &[Predicate],
    ) -> Result<Sql> {
        // Empty conjunction is neutral, empty disjunction is absorbing.
        if parts.is_empty() {
            return Ok(match op {
                BoolOp::And => Sql::raw("1=1"),
                BoolOp::Or => Sql::raw("0=1"),
            });
        }
        if let [only] = parts {
            return self.emit_predicate(ctx, only);
        }
        let mut fragments = Vec::with_capacity(parts.len());
        for part in parts {
            let fragment = self.emit_predicate(ctx, part)?;
            // A nested compound of the other connective needs parentheses
            // to keep its grouping.
            let mixed = matches!(
                &part.kind,
                PredicateKind::Compound { op: child, parts }
                    if *child != op && parts.len() > 1 && !part.is_negated()
            );
            fragments.push(if mixed { fragment.parens() } else { fragment });
        }
        Ok(Sql::join(fragments, op.token()))
    }

    fn emit_in_items(&mut self, ctx: &QueryContext<'_>, items: &InItems) -> Result<Sql> {
        Ok(match items {
            InItems::Values(values) => {
                let mut parts = Vec::with_capacity(values.len());
                for v in values {
                    parts.push(Sql::raw(v.literal()?));
                }
                Sql::join(parts, Token::Comma).parens()
            }
            InItems::Exprs(exprs) => {
                let mut parts = Vec::with_capacity(exprs.len());
                for e in exprs {
                    parts.push(self.emit_expr(ctx, e)?);
                }
                Sql::join(parts, Token::Comma).parens()
            }
            InItems::Subquery(sub) => self.render_structure(ctx, sub)?.parens(),
        })
    }
}

const fn binary_token(op: BinaryOp) -> Token {
    match op {
        BinaryOp::Add => Token::Plus,
        BinaryOp::Sub => Token::Minus,
        BinaryOp::Mul => Token::Star,
        BinaryOp::Div => Token::Slash,
        BinaryOp::Mod => Token::Percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::JoinKind;
    use crate::expr::{and, count_distinct, eq, gt, literal, lower, not, or};
    use crate::metadata::{EntityType, SchemaMetamodel};
    use crate::query::{QueryStructure, ResultShape, Selection, asc};
    use crate::types::ScalarType;

    fn model() -> SchemaMetamodel {
        SchemaMetamodel::new()
            .with_entity(
                EntityType::new("Customer")
                    .basic("name", ScalarType::Text)
                    .basic("age", ScalarType::Int)
                    .set("orders", crate::types::TypeRef::Entity("Order".into())),
            )
            .with_entity(EntityType::new("Order").basic("amount", ScalarType::Decimal))
    }

    fn compile(ctx: &QueryContext<'_>, q: &QueryStructure) -> Compiled {
        Renderer::new().compile(ctx, q).unwrap()
    }

    #[test]
    fn implicit_projection_selects_the_single_root() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        q.from(&mut ctx, "Customer").unwrap();
        assert_eq!(
            compile(&ctx, &q).sql,
            "SELECT \"t0\" FROM Customer AS \"t0\""
        );
    }

    #[test]
    fn a_query_without_sources_names_the_missing_sources() {
        let model = model();
        let ctx = QueryContext::new(&model);
        let q = QueryStructure::new(ResultShape::Untyped);
        let err = Renderer::new().compile(&ctx, &q).unwrap_err();
        assert!(err.to_string().contains("no sources"));
    }

    #[test]
    fn multiple_roots_require_an_explicit_selection() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        q.from(&mut ctx, "Customer").unwrap();
        q.from(&mut ctx, "Order").unwrap();
        let err = Renderer::new().compile(&ctx, &q).unwrap_err();
        assert!(matches!(err, QueryError::InvalidComposition(_)));
    }

    #[test]
    fn negated_comparison_swaps_the_operator() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let age = ctx.path(root).navigate(&ctx, "age").unwrap();
        q.restrict(not(gt(age, literal(18))));
        assert!(compile(&ctx, &q).sql.ends_with("WHERE \"t0\".\"age\" <= 18"));
    }

    #[test]
    fn negated_compound_is_wrapped_in_not() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let age = ctx.path(root).navigate(&ctx, "age").unwrap();
        q.restrict(not(and([
            gt(age.clone(), literal(18)),
            eq(age, literal(21)),
        ])));
        assert!(
            compile(&ctx, &q)
                .sql
                .ends_with("WHERE NOT (\"t0\".\"age\" > 18 AND \"t0\".\"age\" = 21)")
        );
    }

    #[test]
    fn empty_compounds_render_their_identities() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        q.from(&mut ctx, "Customer").unwrap();
        q.restrict(and([]));
        assert!(compile(&ctx, &q).sql.ends_with("WHERE 1=1"));
        q.restrict(or([]));
        assert!(compile(&ctx, &q).sql.ends_with("WHERE 0=1"));
    }

    #[test]
    fn mixed_compounds_parenthesize_the_inner_connective() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let age = ctx.path(root).navigate(&ctx, "age").unwrap();
        q.restrict(and([
            gt(age.clone(), literal(18)),
            or([eq(age.clone(), literal(21)), eq(age, literal(30))]),
        ]));
        assert!(compile(&ctx, &q).sql.ends_with(
            "WHERE \"t0\".\"age\" > 18 AND (\"t0\".\"age\" = 21 OR \"t0\".\"age\" = 30)"
        ));
    }

    #[test]
    fn non_finite_float_literals_fail_to_compile() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let age = ctx.path(root).navigate(&ctx, "age").unwrap();
        q.restrict(gt(age, literal(f64::NAN)));
        let err = Renderer::new().compile(&ctx, &q).unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn count_distinct_renders_inside_the_call() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Scalar(ScalarType::Long));
        let root = q.from(&mut ctx, "Customer").unwrap();
        let name = ctx.path(root).navigate(&ctx, "name").unwrap();
        q.select_expr(count_distinct(name.into()));
        assert!(
            compile(&ctx, &q)
                .sql
                .starts_with("SELECT COUNT(DISTINCT \"t0\".\"name\")")
        );
    }

    #[test]
    fn order_by_renders_direction_tokens() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let name = ctx.path(root).navigate(&ctx, "name").unwrap();
        q.select_expr(lower(name.clone().into()));
        q.order_by([asc(name)]).unwrap();
        assert_eq!(
            compile(&ctx, &q).sql,
            "SELECT LOWER(\"t0\".\"name\") FROM Customer AS \"t0\" ORDER BY \"t0\".\"name\" ASC"
        );
    }

    #[test]
    fn joins_number_aliases_in_emission_order() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        ctx.join(root, "orders", JoinKind::Inner).unwrap();
        assert_eq!(
            compile(&ctx, &q).sql,
            "SELECT \"t0\" FROM Customer AS \"t0\" INNER JOIN \"t0\".\"orders\" AS \"t1\""
        );
    }

    #[test]
    fn constructor_selection_renders_new() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Constructor("CustomerView".into()));
        let root = q.from(&mut ctx, "Customer").unwrap();
        let name = ctx.path(root).navigate(&ctx, "name").unwrap();
        let age = ctx.path(root).navigate(&ctx, "age").unwrap();
        q.multiselect([Selection::expr(name), Selection::expr(age)])
            .unwrap();
        assert!(
            compile(&ctx, &q)
                .sql
                .starts_with("SELECT NEW CustomerView(\"t0\".\"name\", \"t0\".\"age\")")
        );
    }
}
