//! The consumed metamodel collaborator.
//!
//! The tree builder asks this interface which attributes exist on which
//! entity types and what their persistence shape is (singular association,
//! collection/set/list/map, terminal basic value). How the descriptors are
//! produced — annotations, XML, hand assembly — is out of scope; a
//! map-backed implementation ships for callers and tests.

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::error::{QueryError, Result};
use crate::types::{ScalarType, TypeRef};

/// Persistence shape of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Singular,
    Collection,
    Set,
    List,
    Map,
}

impl AttributeKind {
    pub const fn is_plural(self) -> bool {
        !matches!(self, AttributeKind::Singular)
    }
}

/// Descriptor for one attribute of an entity type.
///
/// `value` is the element type for plural attributes and the target type
/// for singular ones; `key` is populated only for maps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: CompactString,
    pub kind: AttributeKind,
    pub value: TypeRef,
    pub key: Option<TypeRef>,
}

impl Attribute {
    /// Whether the attribute's target can be navigated further.
    pub fn is_navigable(&self) -> bool {
        self.value.is_entity()
    }
}

/// Descriptor for one entity type: a name plus its attributes.
#[derive(Debug, Clone)]
pub struct EntityType {
    name: CompactString,
    attributes: Vec<Attribute>,
}

impl EntityType {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Adds a terminal basic-typed attribute.
    pub fn basic(self, name: impl Into<CompactString>, ty: ScalarType) -> Self {
        self.attr(name, AttributeKind::Singular, TypeRef::Scalar(ty), None)
    }

    /// Adds a singular association to another entity.
    pub fn to_one(self, name: impl Into<CompactString>, entity: impl Into<CompactString>) -> Self {
        self.attr(
            name,
            AttributeKind::Singular,
            TypeRef::Entity(entity.into()),
            None,
        )
    }

    /// Adds a bag-style collection attribute.
    pub fn collection(self, name: impl Into<CompactString>, element: impl Into<TypeRef>) -> Self {
        self.attr(name, AttributeKind::Collection, element.into(), None)
    }

    pub fn set(self, name: impl Into<CompactString>, element: impl Into<TypeRef>) -> Self {
        self.attr(name, AttributeKind::Set, element.into(), None)
    }

    pub fn list(self, name: impl Into<CompactString>, element: impl Into<TypeRef>) -> Self {
        self.attr(name, AttributeKind::List, element.into(), None)
    }

    pub fn map(
        self,
        name: impl Into<CompactString>,
        key: impl Into<TypeRef>,
        value: impl Into<TypeRef>,
    ) -> Self {
        self.attr(name, AttributeKind::Map, value.into(), Some(key.into()))
    }

    fn attr(
        mut self,
        name: impl Into<CompactString>,
        kind: AttributeKind,
        value: TypeRef,
        key: Option<TypeRef>,
    ) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            kind,
            value,
            key,
        });
        self
    }
}

/// Attribute-metadata resolver consumed by the tree builder.
pub trait Metamodel {
    fn entity(&self, name: &str) -> Option<&EntityType>;

    /// Resolves `name` on the entity `owner`, failing with a usage error if
    /// either is unknown.
    fn attribute(&self, owner: &str, name: &str) -> Result<&Attribute> {
        let entity = self
            .entity(owner)
            .ok_or_else(|| QueryError::UnknownEntity(owner.to_owned()))?;
        entity
            .attribute(name)
            .ok_or_else(|| QueryError::UnknownAttribute {
                owner: owner.to_owned(),
                attribute: name.to_owned(),
            })
    }
}

/// Map-backed [`Metamodel`] implementation.
#[derive(Debug, Default, Clone)]
pub struct SchemaMetamodel {
    entities: HashMap<CompactString, EntityType>,
}

impl SchemaMetamodel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(mut self, entity: EntityType) -> Self {
        self.add(entity);
        self
    }

    pub fn add(&mut self, entity: EntityType) {
        self.entities.insert(entity.name.clone(), entity);
    }
}

impl Metamodel for SchemaMetamodel {
    fn entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SchemaMetamodel {
        SchemaMetamodel::new().with_entity(
            EntityType::new("Customer")
                .basic("name", ScalarType::Text)
                .set("orders", TypeRef::Entity("Order".into())),
        )
    }

    #[test]
    fn resolves_known_attributes() {
        let m = model();
        let attr = m.attribute("Customer", "orders").unwrap();
        assert_eq!(attr.kind, AttributeKind::Set);
        assert!(attr.is_navigable());
    }

    #[test]
    fn unknown_attribute_is_a_usage_error() {
        let m = model();
        let err = m.attribute("Customer", "nope").unwrap_err();
        assert!(matches!(err, QueryError::UnknownAttribute { .. }));
    }

    #[test]
    fn unknown_entity_is_a_usage_error() {
        let m = model();
        let err = m.attribute("Ghost", "name").unwrap_err();
        assert!(matches!(err, QueryError::UnknownEntity(_)));
    }
}
