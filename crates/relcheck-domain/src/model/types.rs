//! Core type definitions for the authorization model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Separator between an object reference and a relation in a userset
/// (`group:eng#member`).
pub const USERSET_SEPARATOR: char = '#';

/// Separator between a type and an id (`user:alice`).
pub const TYPE_SEPARATOR: char = ':';

/// Id used by typed wildcards (`user:*`).
pub const WILDCARD: &str = "*";

/// An object identifier (e.g., "document:readme").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Object {
    /// The type portion (e.g., "document").
    pub object_type: String,
    /// The ID portion (e.g., "readme").
    pub object_id: String,
}

impl Object {
    /// Creates a new Object from type and ID.
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }

    /// Parses an object from "type:id" format.
    pub fn parse(value: &str) -> DomainResult<Self> {
        match value.split_once(TYPE_SEPARATOR) {
            Some((object_type, object_id)) if !object_type.is_empty() && !object_id.is_empty() => {
                Ok(Self::new(object_type, object_id))
            }
            _ => Err(DomainError::InvalidObjectFormat {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.object_id)
    }
}

/// A tuple key: the (object, relation, user) triple being checked or stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleKey {
    /// The object of the relationship (e.g., "document:readme").
    pub object: String,
    /// The relation between user and object (e.g., "viewer").
    pub relation: String,
    /// The user (subject) of the relationship (e.g., "user:alice",
    /// "group:eng#member" or "user:*").
    pub user: String,
}

impl TupleKey {
    /// Creates a new TupleKey.
    pub fn new(
        object: impl Into<String>,
        relation: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            object: object.into(),
            relation: relation.into(),
            user: user.into(),
        }
    }

    /// Returns the type portion of the object, or the whole object string
    /// when it carries no type separator.
    pub fn object_type(&self) -> &str {
        type_of(&self.object)
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

/// Returns the substring before the type separator.
pub fn type_of(reference: &str) -> &str {
    reference
        .split_once(TYPE_SEPARATOR)
        .map_or(reference, |(type_part, _)| type_part)
}

/// True when the user reference names a relation on another object
/// (`group:eng#member`).
pub fn is_userset(user: &str) -> bool {
    user.contains(USERSET_SEPARATOR)
}

/// True when the user reference is a typed wildcard (`user:*`).
pub fn is_typed_wildcard(user: &str) -> bool {
    matches!(
        user.split_once(TYPE_SEPARATOR),
        Some((type_part, WILDCARD)) if !type_part.is_empty()
    )
}

/// True when the reference is in `type:id` form with both parts present.
pub fn is_valid_type_id(value: &str) -> bool {
    match value.split_once(TYPE_SEPARATOR) {
        Some((type_part, id_part)) => !type_part.is_empty() && !id_part.is_empty(),
        None => false,
    }
}

/// An authorization model defining types and their relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationModel {
    /// Model identifier.
    #[serde(default)]
    pub id: String,
    /// Schema version (e.g., "1.1").
    pub schema_version: String,
    /// Type definitions in the model.
    pub type_definitions: Vec<TypeDefinition>,
}

impl AuthorizationModel {
    /// Creates an empty model for the given schema version.
    pub fn new(schema_version: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            schema_version: schema_version.into(),
            type_definitions: Vec::new(),
        }
    }

    /// Adds a type definition.
    pub fn with_type(mut self, type_def: TypeDefinition) -> Self {
        self.type_definitions.push(type_def);
        self
    }

    /// Looks up a type definition by name.
    pub fn type_definition(&self, type_name: &str) -> DomainResult<&TypeDefinition> {
        self.type_definitions
            .iter()
            .find(|t| t.type_name == type_name)
            .ok_or_else(|| DomainError::TypeNotFound {
                type_name: type_name.to_string(),
            })
    }

    /// Looks up a relation definition on a type.
    pub fn relation_definition(
        &self,
        type_name: &str,
        relation: &str,
    ) -> DomainResult<&RelationDefinition> {
        self.type_definition(type_name)?
            .relations
            .iter()
            .find(|r| r.name == relation)
            .ok_or_else(|| DomainError::RelationNotFound {
                type_name: type_name.to_string(),
                relation: relation.to_string(),
            })
    }
}

/// A type definition within the authorization model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// The type name (e.g., "document", "folder").
    pub type_name: String,
    /// Relations defined on this type.
    #[serde(default)]
    pub relations: Vec<RelationDefinition>,
}

/// A relation definition on a type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// The relation name.
    pub name: String,
    /// Types allowed for direct assignment: "user", "group#member" or
    /// "user:*". Empty means any type.
    #[serde(default)]
    pub type_constraints: Vec<String>,
    /// The userset rewrite for this relation.
    pub rewrite: Userset,
}

/// A userset defines how a relation is computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Userset {
    /// Direct assignment (this).
    This,
    /// Computed userset from another relation.
    ComputedUserset { relation: String },
    /// Tuple to userset (relation from parent).
    TupleToUserset {
        tupleset: String,
        computed_userset: String,
    },
    /// Union of multiple usersets.
    Union { children: Vec<Userset> },
    /// Intersection of multiple usersets.
    Intersection { children: Vec<Userset> },
    /// Exclusion (base but not subtract).
    Exclusion {
        base: Box<Userset>,
        subtract: Box<Userset>,
    },
}
