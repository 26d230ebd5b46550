//! The query-build context: node arena, parameter registry, and the
//! join/fetch/accessor operations over source nodes.
//!
//! Every tree node lives in one [`QueryContext`] and is addressed by a
//! handle (`SourceId`, `ParamId`). Passing the context explicitly keeps
//! ownership unambiguous: structures reference sources by handle, and the
//! correlation back-reference from a subquery source to its outer original
//! is a handle too, never a live pointer.

use compact_str::CompactString;

use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::metadata::{Attribute, AttributeKind, Metamodel};
use crate::path::Path;
use crate::types::TypeRef;

/// Handle to a source node (root, join or fetch) in the context arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub(crate) u32);

/// Handle to a registered parameter placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamId(pub(crate) u32);

impl ParamId {
    #[cfg(test)]
    pub(crate) const fn test(n: u32) -> Self {
        ParamId(n)
    }
}

/// Join kind for association/collection traversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// Collection shape of the attribute a source was reached through.
///
/// Maps carry their key type so key/entry accessors and map-key joins can
/// be typed; everything else needs no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plurality {
    Singular,
    Collection,
    Set,
    List,
    Map { key: TypeRef },
}

impl Plurality {
    fn of(attr: &Attribute) -> Result<Plurality> {
        Ok(match attr.kind {
            AttributeKind::Singular => Plurality::Singular,
            AttributeKind::Collection => Plurality::Collection,
            AttributeKind::Set => Plurality::Set,
            AttributeKind::List => Plurality::List,
            AttributeKind::Map => {
                let key = attr.key.clone().ok_or_else(|| {
                    QueryError::Unsupported(format!(
                        "map attribute '{}' has no key type",
                        attr.name
                    ))
                })?;
                Plurality::Map { key }
            }
        })
    }
}

/// Concrete kind of a source node — the closed set replacing a
/// Path ⊂ From ⊂ Join class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Root,
    Join(JoinKind),
    Fetch(JoinKind),
    /// Join onto the key of a map join.
    KeyJoin(JoinKind),
}

/// One queryable source: a root entity or a join/fetch target.
#[derive(Debug, Clone)]
pub struct SourceNode {
    pub parent: Option<SourceId>,
    pub attribute: Option<CompactString>,
    /// The bindable model: entity type for associations, element type for
    /// collections (scalar for basic-element collections).
    pub target: TypeRef,
    pub plurality: Plurality,
    pub kind: SourceKind,
    /// Child joins, insertion-ordered; render order depends on it.
    pub joins: Vec<SourceId>,
    /// Child fetches, insertion-ordered, emitted after the joins.
    pub fetches: Vec<SourceId>,
    pub in_subquery: bool,
    /// Set only on sources borrowed from an outer query via correlation.
    pub correlation_parent: Option<SourceId>,
}

/// Declared type and optional name of one parameter placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: Option<CompactString>,
    pub ty: TypeRef,
}

/// Per-build factory and registry. Created once per logical query build,
/// discarded after compilation; shared read-only by every node built
/// through it.
pub struct QueryContext<'m> {
    metamodel: &'m dyn Metamodel,
    sources: Vec<SourceNode>,
    params: Vec<ParamInfo>,
}

impl<'m> QueryContext<'m> {
    pub fn new(metamodel: &'m dyn Metamodel) -> Self {
        Self {
            metamodel,
            sources: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn metamodel(&self) -> &dyn Metamodel {
        self.metamodel
    }

    pub fn source(&self, id: SourceId) -> &SourceNode {
        &self.sources[id.0 as usize]
    }

    pub(crate) fn alloc_source(&mut self, node: SourceNode) -> SourceId {
        let id = SourceId(self.sources.len() as u32);
        self.sources.push(node);
        id
    }

    /// Registers an anonymous (positional) parameter of the given type.
    pub fn parameter(&mut self, ty: impl Into<TypeRef>) -> Expr {
        self.register_param(None, ty.into())
    }

    /// Registers a named parameter of the given type.
    pub fn named_parameter(&mut self, name: impl Into<CompactString>, ty: impl Into<TypeRef>) -> Expr {
        self.register_param(Some(name.into()), ty.into())
    }

    fn register_param(&mut self, name: Option<CompactString>, ty: TypeRef) -> Expr {
        let id = ParamId(self.params.len() as u32);
        self.params.push(ParamInfo { name, ty });
        Expr::Param(id)
    }

    pub fn param_info(&self, id: ParamId) -> &ParamInfo {
        &self.params[id.0 as usize]
    }

    /// A path positioned at the source itself (no attribute segments yet).
    pub fn path(&self, source: SourceId) -> Path {
        Path::root(source, self.source(source).target.clone())
    }

    /// Joins an association or collection attribute of `parent`, creating a
    /// new source. Repeated calls create distinct joins.
    pub fn join(&mut self, parent: SourceId, attribute: &str, kind: JoinKind) -> Result<SourceId> {
        let (attr, in_subquery) = self.resolve_join_attribute(parent, attribute)?;
        let plurality = Plurality::of(&attr)?;
        let id = self.alloc_source(SourceNode {
            parent: Some(parent),
            attribute: Some(attr.name.clone()),
            target: attr.value.clone(),
            plurality,
            kind: SourceKind::Join(kind),
            joins: Vec::new(),
            fetches: Vec::new(),
            in_subquery,
            correlation_parent: None,
        });
        self.sources[parent.0 as usize].joins.push(id);
        Ok(id)
    }

    /// Like [`join`](Self::join) but marks the traversal for eager fetching.
    /// Only legal on a root query: fetch semantics are meaningless inside a
    /// correlated or scalar subquery.
    pub fn fetch(&mut self, parent: SourceId, attribute: &str, kind: JoinKind) -> Result<SourceId> {
        let (attr, in_subquery) = self.resolve_join_attribute(parent, attribute)?;
        if in_subquery {
            return Err(QueryError::InvalidComposition(format!(
                "cannot fetch '{attribute}' inside a subquery"
            )));
        }
        let plurality = Plurality::of(&attr)?;
        let id = self.alloc_source(SourceNode {
            parent: Some(parent),
            attribute: Some(attr.name.clone()),
            target: attr.value.clone(),
            plurality,
            kind: SourceKind::Fetch(kind),
            joins: Vec::new(),
            fetches: Vec::new(),
            in_subquery: false,
            correlation_parent: None,
        });
        self.sources[parent.0 as usize].fetches.push(id);
        Ok(id)
    }

    fn resolve_join_attribute(
        &self,
        parent: SourceId,
        attribute: &str,
    ) -> Result<(Attribute, bool)> {
        let node = self.source(parent);
        let owner = match &node.target {
            TypeRef::Entity(name) => name.clone(),
            TypeRef::Scalar(_) => {
                return Err(QueryError::IllegalJoin(format!(
                    "cannot join '{attribute}' from a basic-valued source"
                )));
            }
        };
        let attr = self.metamodel.attribute(owner.as_str(), attribute)?.clone();
        if attr.kind == AttributeKind::Singular && !attr.value.is_entity() {
            return Err(QueryError::IllegalJoin(format!(
                "attribute '{attribute}' of '{owner}' is a basic value, not a joinable association"
            )));
        }
        Ok((attr, node.in_subquery))
    }

    /// Joins onto the key of a map join. Right joins are not supported for
    /// map-key joins.
    pub fn key_join(&mut self, map_join: SourceId, kind: JoinKind) -> Result<SourceId> {
        if kind == JoinKind::Right {
            return Err(QueryError::Unsupported(
                "right join on a map-key join".into(),
            ));
        }
        let key = match &self.source(map_join).plurality {
            Plurality::Map { key } => key.clone(),
            _ => {
                return Err(QueryError::IllegalJoin(
                    "key join on a source that is not a map join".into(),
                ));
            }
        };
        if !key.is_entity() {
            return Err(QueryError::IllegalJoin(
                "map key is a basic value, not a joinable type".into(),
            ));
        }
        let in_subquery = self.source(map_join).in_subquery;
        let id = self.alloc_source(SourceNode {
            parent: Some(map_join),
            attribute: None,
            target: key,
            plurality: Plurality::Singular,
            kind: SourceKind::KeyJoin(kind),
            joins: Vec::new(),
            fetches: Vec::new(),
            in_subquery,
            correlation_parent: None,
        });
        self.sources[map_join.0 as usize].joins.push(id);
        Ok(id)
    }

    /// `KEY(join)` — the key of a map join.
    pub fn key(&self, join: SourceId) -> Result<Expr> {
        match &self.source(join).plurality {
            Plurality::Map { .. } => Ok(Expr::MapKey(join)),
            _ => Err(QueryError::IllegalJoin(
                "key() on a source that is not a map join".into(),
            )),
        }
    }

    /// `ENTRY(join)` — the full entry of a map join.
    pub fn entry(&self, join: SourceId) -> Result<Expr> {
        match &self.source(join).plurality {
            Plurality::Map { .. } => Ok(Expr::MapEntry(join)),
            _ => Err(QueryError::IllegalJoin(
                "entry() on a source that is not a map join".into(),
            )),
        }
    }

    /// The value of a map join, i.e. the join target itself.
    pub fn value(&self, join: SourceId) -> Result<Expr> {
        match &self.source(join).plurality {
            Plurality::Map { .. } => Ok(Expr::Path(self.path(join))),
            _ => Err(QueryError::IllegalJoin(
                "value() on a source that is not a map join".into(),
            )),
        }
    }

    /// `INDEX(join)` — the position of a list join element.
    pub fn index(&self, join: SourceId) -> Result<Expr> {
        match &self.source(join).plurality {
            Plurality::List => Ok(Expr::ListIndex(join)),
            _ => Err(QueryError::IllegalJoin(
                "index() on a source that is not a list join".into(),
            )),
        }
    }

    pub fn is_correlated(&self, id: SourceId) -> bool {
        self.source(id).correlation_parent.is_some()
    }

    /// The exact outer source a correlated node was borrowed from.
    /// Handle-identity-sensitive: two structurally equal joins are distinct.
    pub fn correlation_parent(&self, id: SourceId) -> Option<SourceId> {
        self.source(id).correlation_parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityType, SchemaMetamodel};
    use crate::query::{QueryStructure, ResultShape};
    use crate::types::ScalarType;

    fn model() -> SchemaMetamodel {
        SchemaMetamodel::new()
            .with_entity(
                EntityType::new("Customer")
                    .basic("name", ScalarType::Text)
                    .to_one("address", "Address")
                    .set("orders", TypeRef::Entity("Order".into()))
                    .list("nicknames", ScalarType::Text)
                    .map("phones", ScalarType::Text, TypeRef::Entity("Phone".into())),
            )
            .with_entity(EntityType::new("Address").basic("city", ScalarType::Text))
            .with_entity(EntityType::new("Order").basic("amount", ScalarType::Decimal))
            .with_entity(EntityType::new("Phone").basic("number", ScalarType::Text))
    }

    #[test]
    fn joining_a_basic_attribute_is_illegal() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let err = ctx.join(root, "name", JoinKind::Inner).unwrap_err();
        assert!(matches!(err, QueryError::IllegalJoin(_)));
    }

    #[test]
    fn joining_from_a_basic_collection_element_is_illegal() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        // Joining the basic-element list itself is fine.
        let nicknames = ctx.join(root, "nicknames", JoinKind::Inner).unwrap();
        // Joining onward from its element is not.
        let err = ctx.join(nicknames, "anything", JoinKind::Inner).unwrap_err();
        assert!(matches!(err, QueryError::IllegalJoin(_)));
    }

    #[test]
    fn repeated_joins_create_distinct_sources() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let a = ctx.join(root, "orders", JoinKind::Inner).unwrap();
        let b = ctx.join(root, "orders", JoinKind::Inner).unwrap();
        assert_ne!(a, b);
        assert_eq!(ctx.source(root).joins, vec![a, b]);
    }

    #[test]
    fn fetch_inside_a_subquery_is_rejected() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut sub = QueryStructure::subquery(ResultShape::Scalar(ScalarType::Long));
        let root = sub.from(&mut ctx, "Customer").unwrap();
        let err = ctx.fetch(root, "orders", JoinKind::Left).unwrap_err();
        assert!(matches!(err, QueryError::InvalidComposition(_)));
    }

    #[test]
    fn right_key_join_is_unsupported() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let phones = ctx.join(root, "phones", JoinKind::Inner).unwrap();
        let err = ctx.key_join(phones, JoinKind::Right).unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn plural_accessors_check_capabilities() {
        let model = model();
        let mut ctx = QueryContext::new(&model);
        let mut q = QueryStructure::new(ResultShape::Untyped);
        let root = q.from(&mut ctx, "Customer").unwrap();
        let orders = ctx.join(root, "orders", JoinKind::Inner).unwrap();
        let nicknames = ctx.join(root, "nicknames", JoinKind::Inner).unwrap();
        let phones = ctx.join(root, "phones", JoinKind::Inner).unwrap();

        assert!(ctx.key(phones).is_ok());
        assert!(ctx.entry(phones).is_ok());
        assert!(ctx.index(nicknames).is_ok());
        assert!(matches!(
            ctx.key(orders).unwrap_err(),
            QueryError::IllegalJoin(_)
        ));
        assert!(matches!(
            ctx.index(orders).unwrap_err(),
            QueryError::IllegalJoin(_)
        ));
    }
}
