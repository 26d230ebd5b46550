//! Attribute navigation.
//!
//! A [`Path`] is an immutable navigation value: the source it starts at
//! plus the singular-attribute segments walked so far, with the resolved
//! type of its tip. Paths whose tip is a basic value or a plural attribute
//! are terminal — navigating onward is a usage error, not a panic.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::context::{QueryContext, SourceId};
use crate::error::{QueryError, Result};
use crate::metadata::AttributeKind;
use crate::types::TypeRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub(crate) source: SourceId,
    pub(crate) segments: SmallVec<[CompactString; 4]>,
    pub(crate) ty: TypeRef,
    pub(crate) kind: AttributeKind,
}

impl Path {
    pub(crate) fn root(source: SourceId, ty: TypeRef) -> Self {
        Self {
            source,
            segments: SmallVec::new(),
            ty,
            kind: AttributeKind::Singular,
        }
    }

    /// The resolved type of the path tip.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The persistence shape of the attribute that produced the tip.
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Whether further navigation is possible from this path.
    pub fn is_navigable(&self) -> bool {
        self.kind == AttributeKind::Singular && self.ty.is_entity()
    }

    /// Navigates one attribute further, producing a new child path.
    pub fn navigate(&self, ctx: &QueryContext<'_>, attribute: &str) -> Result<Path> {
        if self.kind.is_plural() {
            return Err(QueryError::IllegalDereference(format!(
                "cannot navigate '{attribute}' from the plural path '{}'",
                self.describe()
            )));
        }
        let owner = match &self.ty {
            TypeRef::Entity(name) => name.clone(),
            TypeRef::Scalar(_) => {
                return Err(QueryError::IllegalDereference(format!(
                    "cannot navigate '{attribute}' from the basic path '{}'",
                    self.describe()
                )));
            }
        };
        let attr = ctx.metamodel().attribute(owner.as_str(), attribute)?;
        let mut segments = self.segments.clone();
        segments.push(attr.name.clone());
        Ok(Path {
            source: self.source,
            segments,
            ty: attr.value.clone(),
            kind: attr.kind,
        })
    }

    fn describe(&self) -> String {
        let mut out = String::from(self.ty.name());
        for segment in &self.segments {
            out.push('.');
            out.push_str(segment);
        }
        out
    }
}
