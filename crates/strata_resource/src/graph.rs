//! Resource graph registry and builder API.
//!
//! The [`ResourceGraph`] is the static description of every resource type the
//! API exposes: its public name, its attributes, and its relationships to
//! other types. It is built once at startup and shared read-only afterwards.
//!
//! # Example
//!
//! ```
//! use strata_resource::graph::{Cardinality, ResourceGraph};
//!
//! let graph = ResourceGraph::builder()
//!     .add_resource("articles", |r| {
//!         r.attribute("title")
//!             .has_one("author", "people")
//!             .with_inverse("articles")
//!             .has_many("tags", "tags");
//!     })
//!     .add_resource("people", |r| {
//!         r.attribute("name").has_many("articles", "articles").with_inverse("author");
//!     })
//!     .add_resource("tags", |r| {
//!         r.attribute("label");
//!     })
//!     .build()
//!     .expect("graph should be valid");
//!
//! let author = graph.relationship(&"articles".into(), "author").unwrap();
//! assert_eq!(author.cardinality(), Cardinality::ToOne);
//! assert_eq!(graph.inverse(author).unwrap().name(), "articles");
//! ```

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashSet;
use indexmap::IndexMap;

use crate::resource::ResourceType;

// ─────────────────────────────────────────────────────────────────────────────
// Relationship
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a relationship points at one resource or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one related resource (`has one`).
    ToOne,
    /// Any number of related resources (`has many`).
    ToMany,
}

/// Immutable definition of one relationship edge.
///
/// A relationship is declared on its *left* type and points at its *right*
/// type. Two relationships are equal when they share left type and name.
#[derive(Debug, Clone)]
pub struct Relationship {
    name: String,
    left: ResourceType,
    right: ResourceType,
    cardinality: Cardinality,
    inverse: Option<String>,
}

impl Relationship {
    /// Creates a relationship definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        left: impl Into<ResourceType>,
        right: impl Into<ResourceType>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            left: left.into(),
            right: right.into(),
            cardinality,
            inverse: None,
        }
    }

    /// Sets the name of the inverse navigation on the right type.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Returns the relationship name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the type that declares this relationship.
    #[must_use]
    pub fn left_type(&self) -> &ResourceType {
        &self.left
    }

    /// Returns the type this relationship points at.
    #[must_use]
    pub fn right_type(&self) -> &ResourceType {
        &self.right
    }

    /// Returns the cardinality.
    #[must_use]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Returns true for `has one` relationships.
    #[must_use]
    pub fn is_to_one(&self) -> bool {
        self.cardinality == Cardinality::ToOne
    }

    /// Returns true for `has many` relationships.
    #[must_use]
    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }

    /// Returns the inverse navigation name, if declared.
    #[must_use]
    pub fn inverse_name(&self) -> Option<&str> {
        self.inverse.as_deref()
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.left == other.left && self.name == other.name
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.left.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.left, self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceContext
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the graph knows about one resource type.
#[derive(Debug, Clone)]
pub struct ResourceContext {
    resource_type: ResourceType,
    attributes: Vec<String>,
    relationships: IndexMap<String, Arc<Relationship>>,
}

impl ResourceContext {
    /// Returns the resource type.
    #[must_use]
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Returns the declared attribute names.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Returns whether an attribute with the given name is declared.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute == name)
    }

    /// Returns a relationship by name.
    #[must_use]
    pub fn relationship(&self, name: &str) -> Option<&Arc<Relationship>> {
        self.relationships.get(name)
    }

    /// Returns all relationships in declaration order.
    pub fn relationships(&self) -> impl Iterator<Item = &Arc<Relationship>> {
        self.relationships.values()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceGraph
// ─────────────────────────────────────────────────────────────────────────────

/// Static registry of resource types, attributes and relationships.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: IndexMap<ResourceType, ResourceContext>,
}

impl ResourceGraph {
    /// Returns a builder for a new graph.
    #[must_use]
    pub fn builder() -> ResourceGraphBuilder {
        ResourceGraphBuilder::new()
    }

    /// Returns the context of a resource type.
    #[must_use]
    pub fn resource(&self, resource_type: &ResourceType) -> Option<&ResourceContext> {
        self.resources.get(resource_type)
    }

    /// Returns whether the type is registered.
    #[must_use]
    pub fn contains(&self, resource_type: &ResourceType) -> bool {
        self.resources.contains_key(resource_type)
    }

    /// Returns a relationship declared on `resource_type`.
    #[must_use]
    pub fn relationship(
        &self,
        resource_type: &ResourceType,
        name: &str,
    ) -> Option<&Arc<Relationship>> {
        self.resources
            .get(resource_type)
            .and_then(|context| context.relationship(name))
    }

    /// Returns all relationships declared on `resource_type`.
    ///
    /// Unknown types yield no relationships.
    pub fn relationships<'a>(
        &'a self,
        resource_type: &ResourceType,
    ) -> impl Iterator<Item = &'a Arc<Relationship>> + 'a {
        self.resources
            .get(resource_type)
            .into_iter()
            .flat_map(ResourceContext::relationships)
    }

    /// Returns the inverse of a relationship, if one is declared.
    #[must_use]
    pub fn inverse(&self, relationship: &Relationship) -> Option<&Arc<Relationship>> {
        let inverse = relationship.inverse_name()?;
        self.relationship(relationship.right_type(), inverse)
    }

    /// Returns all registered resource types in registration order.
    pub fn resource_types(&self) -> impl Iterator<Item = &ResourceType> {
        self.resources.keys()
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder API
// ─────────────────────────────────────────────────────────────────────────────

/// Declares the fields of one resource type.
///
/// [`with_inverse`](Self::with_inverse) applies to the relationship declared
/// last, which keeps declarations chainable.
#[derive(Debug)]
pub struct ResourceBuilder {
    resource_type: ResourceType,
    attributes: Vec<String>,
    relationships: Vec<Relationship>,
    /// Inverse declared before any relationship.
    dangling_inverse: Option<String>,
}

impl ResourceBuilder {
    fn new(resource_type: ResourceType) -> Self {
        Self {
            resource_type,
            attributes: Vec::new(),
            relationships: Vec::new(),
            dangling_inverse: None,
        }
    }

    /// Declares an attribute.
    pub fn attribute(&mut self, name: impl Into<String>) -> &mut Self {
        self.attributes.push(name.into());
        self
    }

    /// Declares a to-one relationship.
    pub fn has_one(&mut self, name: impl Into<String>, right: impl Into<ResourceType>) -> &mut Self {
        self.relationships.push(Relationship::new(
            name,
            self.resource_type.clone(),
            right,
            Cardinality::ToOne,
        ));
        self
    }

    /// Declares a to-many relationship.
    pub fn has_many(
        &mut self,
        name: impl Into<String>,
        right: impl Into<ResourceType>,
    ) -> &mut Self {
        self.relationships.push(Relationship::new(
            name,
            self.resource_type.clone(),
            right,
            Cardinality::ToMany,
        ));
        self
    }

    /// Sets the inverse navigation of the relationship declared last.
    pub fn with_inverse(&mut self, inverse: impl Into<String>) -> &mut Self {
        let inverse = inverse.into();
        match self.relationships.last_mut() {
            Some(relationship) => relationship.inverse = Some(inverse),
            None => self.dangling_inverse = Some(inverse),
        }
        self
    }
}

/// Builder for [`ResourceGraph`].
#[derive(Debug, Default)]
pub struct ResourceGraphBuilder {
    resources: Vec<ResourceBuilder>,
}

impl ResourceGraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource type and declares its fields.
    #[must_use]
    pub fn add_resource<F>(mut self, resource_type: impl Into<ResourceType>, declare: F) -> Self
    where
        F: FnOnce(&mut ResourceBuilder),
    {
        let mut builder = ResourceBuilder::new(resource_type.into());
        declare(&mut builder);
        self.resources.push(builder);
        self
    }

    /// Validates the declarations and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found, not just the first.
    pub fn build(self) -> Result<ResourceGraph, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut resources: IndexMap<ResourceType, ResourceContext> = IndexMap::new();

        for builder in self.resources {
            if resources.contains_key(&builder.resource_type) {
                errors.push(ValidationError::DuplicateResource(builder.resource_type));
                continue;
            }
            if builder.dangling_inverse.is_some() {
                errors.push(ValidationError::DanglingInverse(
                    builder.resource_type.clone(),
                ));
            }

            {
                let mut seen = HashSet::new();
                for name in builder
                    .attributes
                    .iter()
                    .chain(builder.relationships.iter().map(|r| &r.name))
                {
                    if !seen.insert(name.as_str()) {
                        errors.push(ValidationError::DuplicateField {
                            resource_type: builder.resource_type.clone(),
                            name: name.clone(),
                        });
                    }
                }
            }

            let relationships = builder
                .relationships
                .into_iter()
                .map(|relationship| (relationship.name.clone(), Arc::new(relationship)))
                .collect();

            resources.insert(
                builder.resource_type.clone(),
                ResourceContext {
                    resource_type: builder.resource_type,
                    attributes: builder.attributes,
                    relationships,
                },
            );
        }

        for context in resources.values() {
            for relationship in context.relationships() {
                validate_relationship(relationship, &resources, &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(ResourceGraph { resources })
        } else {
            Err(errors)
        }
    }
}

/// Validates that a relationship's right type and inverse resolve.
fn validate_relationship(
    relationship: &Relationship,
    resources: &IndexMap<ResourceType, ResourceContext>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(right) = resources.get(relationship.right_type()) else {
        errors.push(ValidationError::UnknownRightType {
            relationship: relationship.to_string(),
            right: relationship.right_type().clone(),
        });
        return;
    };

    let Some(inverse_name) = relationship.inverse_name() else {
        return;
    };

    match right.relationship(inverse_name) {
        None => errors.push(ValidationError::UnknownInverse {
            relationship: relationship.to_string(),
            inverse: inverse_name.to_string(),
        }),
        Some(inverse) => {
            let points_back = inverse.right_type() == relationship.left_type();
            let agrees = inverse
                .inverse_name()
                .is_none_or(|name| name == relationship.name());
            if !points_back || !agrees {
                errors.push(ValidationError::InverseMismatch {
                    relationship: relationship.to_string(),
                    inverse: inverse.to_string(),
                });
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors found while building a [`ResourceGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The same resource type was added twice.
    DuplicateResource(ResourceType),
    /// An attribute or relationship name is used twice on one type.
    DuplicateField {
        /// The resource type.
        resource_type: ResourceType,
        /// The duplicated field name.
        name: String,
    },
    /// `with_inverse` was called before any relationship was declared.
    DanglingInverse(ResourceType),
    /// A relationship points at an unregistered type.
    UnknownRightType {
        /// The relationship, as `type.name`.
        relationship: String,
        /// The missing right type.
        right: ResourceType,
    },
    /// A declared inverse does not exist on the right type.
    UnknownInverse {
        /// The relationship, as `type.name`.
        relationship: String,
        /// The missing inverse name.
        inverse: String,
    },
    /// A declared inverse does not point back at the declaring relationship.
    InverseMismatch {
        /// The relationship, as `type.name`.
        relationship: String,
        /// The inverse that disagrees, as `type.name`.
        inverse: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateResource(resource_type) => {
                write!(f, "resource type '{resource_type}' is registered twice")
            }
            ValidationError::DuplicateField {
                resource_type,
                name,
            } => {
                write!(f, "field '{name}' is declared twice on '{resource_type}'")
            }
            ValidationError::DanglingInverse(resource_type) => {
                write!(
                    f,
                    "inverse declared on '{resource_type}' before any relationship"
                )
            }
            ValidationError::UnknownRightType {
                relationship,
                right,
            } => {
                write!(
                    f,
                    "relationship {relationship} points at unknown type '{right}'"
                )
            }
            ValidationError::UnknownInverse {
                relationship,
                inverse,
            } => {
                write!(
                    f,
                    "relationship {relationship} declares unknown inverse '{inverse}'"
                )
            }
            ValidationError::InverseMismatch {
                relationship,
                inverse,
            } => {
                write!(
                    f,
                    "relationship {relationship} and its inverse {inverse} do not point at each other"
                )
            }
        }
    }
}

impl core::error::Error for ValidationError {}
