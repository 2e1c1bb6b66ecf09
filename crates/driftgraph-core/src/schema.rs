//! # Property Specification Model
//!
//! Per-object schema snapshots.
//!
//! A `PropertySpecification` records, for one object type and construction
//! mode, the ordered `(name, type)` slots that were written. Objects with an
//! identical specification share one header entry, so the schema is stored
//! once per group instead of once per object.
//!
//! Identity is by hash (see `types::descriptor`). Membership tests use a
//! precomputed set of definition hashes.

use crate::hash::{HashCode, StableHash};
use crate::types::{TypeDescriptor, TypeIdentity};
use crate::combine_hash;
use std::collections::BTreeSet;

// =============================================================================
// PROPERTY DEFINITION
// =============================================================================

/// One stored schema slot: property name plus declared/written type.
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    name: String,
    identity: TypeIdentity,
    hash: HashCode,
}

impl PropertyDefinition {
    /// Create a definition.
    #[must_use]
    pub fn new(name: impl Into<String>, identity: TypeIdentity) -> Self {
        let name = name.into();
        let hash = combine_hash!(name, identity.hash());
        Self {
            name,
            identity,
            hash,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    /// The declared type of the slot.
    #[must_use]
    pub fn declared_type(&self) -> &TypeDescriptor {
        self.identity.declaring()
    }

    /// Hash of `(name, declared, implementing)`.
    #[must_use]
    pub fn hash(&self) -> HashCode {
        self.hash
    }

    /// Hash of `(name, declared)`: the key compared against current slots.
    ///
    /// The implementing type is deliberately excluded because it varies
    /// per instance for polymorphic slots.
    #[must_use]
    pub fn slot_key(&self) -> HashCode {
        slot_key(&self.name, self.identity.declaring())
    }
}

impl StableHash for PropertyDefinition {
    fn stable_hash(&self) -> HashCode {
        self.hash
    }
}

impl PartialEq for PropertyDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for PropertyDefinition {}

/// Key of a `(name, declared type)` slot.
#[must_use]
pub fn slot_key(name: &str, declared: &TypeDescriptor) -> HashCode {
    combine_hash!(name, declared.hash())
}

// =============================================================================
// PROPERTY SPECIFICATION
// =============================================================================

/// Ordered schema of one object type as written.
#[derive(Debug, Clone)]
pub struct PropertySpecification {
    object_type: TypeIdentity,
    is_user_defined: bool,
    definitions: Vec<PropertyDefinition>,
    lookup: BTreeSet<HashCode>,
    hash: HashCode,
}

impl PropertySpecification {
    /// Create a specification.
    ///
    /// `is_user_defined` is true for objects written in `Specified` mode.
    /// Definitions keep their order; a repeated definition is kept once.
    #[must_use]
    pub fn new(
        object_type: TypeIdentity,
        is_user_defined: bool,
        definitions: Vec<PropertyDefinition>,
    ) -> Self {
        let mut lookup = BTreeSet::new();
        let definitions: Vec<PropertyDefinition> = definitions
            .into_iter()
            .filter(|definition| lookup.insert(definition.hash()))
            .collect();
        let hash = combine_hash!(object_type.hash(), is_user_defined, definitions);
        Self {
            object_type,
            is_user_defined,
            definitions,
            lookup,
            hash,
        }
    }

    /// The declared/implementing type of the objects using this schema.
    #[must_use]
    pub fn object_type(&self) -> &TypeIdentity {
        &self.object_type
    }

    /// True if the objects were written in `Specified` mode.
    #[must_use]
    pub fn is_user_defined(&self) -> bool {
        self.is_user_defined
    }

    /// Definitions in write order.
    #[must_use]
    pub fn definitions(&self) -> &[PropertyDefinition] {
        &self.definitions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Membership test by exact `(name, declared, implementing)`.
    #[must_use]
    pub fn contains(&self, definition: &PropertyDefinition) -> bool {
        self.lookup.contains(&definition.hash())
    }

    /// The `(name, declared)` keys of all definitions.
    #[must_use]
    pub fn slot_keys(&self) -> BTreeSet<HashCode> {
        self.definitions
            .iter()
            .map(PropertyDefinition::slot_key)
            .collect()
    }

    #[must_use]
    pub fn hash(&self) -> HashCode {
        self.hash
    }
}

impl PartialEq for PropertySpecification {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for PropertySpecification {}

// =============================================================================
// TESTS
// =============================================================================
