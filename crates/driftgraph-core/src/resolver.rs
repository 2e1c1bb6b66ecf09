//! # Header Resolver (read path)
//!
//! Compares what a stream says was written against the types registered
//! now, before any node is decoded.
//!
//! Every stored type is either resolved or missing. Every stored object is
//! classified through its property specification:
//!
//! | Classification | Meaning |
//! |----------------|---------|
//! | `Resolved` | type present, stored schema fully compatible |
//! | `Modified` | type present, properties removed and/or added since |
//! | `Missing`  | type no longer present; decodes to null |
//!
//! Compatibility rules depend on the recorded construction mode:
//! - `Default`: the stored `(name, declared type)` slots must equal the
//!   current slots exactly. Stored-only slots are *removed*, current-only
//!   slots are *added* (they keep their default value).
//! - `Specified`: every stored slot must still be accepted by the type.
//!   Stored-but-not-accepted slots are *removed*; nothing is ever *added*.
//!
//! Schema drift is data, never an error.

use crate::formats::DeserializedHeader;
use crate::hash::HashCode;
use crate::registry::{PropertySlot, TypeRegistry};
use crate::schema::{PropertyDefinition, PropertySpecification};
use crate::types::{ObjectId, TypeDescriptor};
use crate::value::Value;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// How a stored object relates to the current types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Resolved,
    Modified,
    Missing,
}

/// Resolution of one stored property specification.
#[derive(Debug, Clone)]
pub struct SpecificationResolution {
    classification: Classification,
    object_type: TypeDescriptor,
    accepted: Vec<bool>,
    removed: Vec<PropertyDefinition>,
    added: Vec<PropertySlot>,
}

impl SpecificationResolution {
    fn resolve(specification: &PropertySpecification, registry: &TypeRegistry) -> Self {
        let object_type = specification.object_type().implementing().clone();
        let definition = registry
            .definition(&object_type)
            .filter(|_| registry.resolves(&object_type));

        let Some(definition) = definition else {
            return Self {
                classification: Classification::Missing,
                object_type,
                accepted: vec![false; specification.len()],
                removed: Vec::new(),
                added: Vec::new(),
            };
        };

        let current = definition.slot_keys();
        let accepted: Vec<bool> = specification
            .definitions()
            .iter()
            .map(|stored| current.contains(&stored.slot_key()))
            .collect();
        let removed: Vec<PropertyDefinition> = specification
            .definitions()
            .iter()
            .zip(&accepted)
            .filter(|(_, accepted)| !**accepted)
            .map(|(stored, _)| stored.clone())
            .collect();

        let added: Vec<PropertySlot> = if specification.is_user_defined() {
            Vec::new()
        } else {
            let stored = specification.slot_keys();
            definition
                .properties()
                .iter()
                .filter(|slot| !stored.contains(&slot.key()))
                .cloned()
                .collect()
        };

        let classification = if removed.is_empty() && added.is_empty() {
            Classification::Resolved
        } else {
            Classification::Modified
        };

        Self {
            classification,
            object_type,
            accepted,
            removed,
            added,
        }
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// The stored implementing type of the objects.
    #[must_use]
    pub fn object_type(&self) -> &TypeDescriptor {
        &self.object_type
    }

    /// Per stored definition, in stream order: is it still accepted?
    #[must_use]
    pub fn accepted(&self) -> &[bool] {
        &self.accepted
    }

    /// Stored definitions the current type no longer has.
    #[must_use]
    pub fn removed(&self) -> &[PropertyDefinition] {
        &self.removed
    }

    /// Current slots the stream did not store (`Default` mode only).
    #[must_use]
    pub fn added(&self) -> &[PropertySlot] {
        &self.added
    }
}

/// One object whose schema drifted.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifiedObject {
    pub specification: u32,
    /// Values of removed properties, kept only when preview is enabled.
    pub preview: BTreeMap<String, Value>,
}

/// The outcome of resolving a stream header against a registry.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    resolved_types: BTreeMap<HashCode, TypeDescriptor>,
    missing_types: BTreeMap<HashCode, TypeDescriptor>,
    specifications: Vec<SpecificationResolution>,
    resolved: BTreeSet<ObjectId>,
    modified: BTreeMap<ObjectId, ModifiedObject>,
    missing: BTreeMap<ObjectId, u32>,
}

impl Resolution {
    /// Classify every stored type and object.
    #[must_use]
    pub fn resolve(header: &DeserializedHeader, registry: &TypeRegistry) -> Self {
        let mut resolution = Self::default();

        for (hash, descriptor) in header.types() {
            if registry.resolves(descriptor) {
                resolution.resolved_types.insert(*hash, descriptor.clone());
            } else {
                tracing::debug!(type_name = %descriptor, "stored type no longer present");
                resolution.missing_types.insert(*hash, descriptor.clone());
            }
        }

        resolution.specifications = header
            .specifications()
            .iter()
            .map(|specification| SpecificationResolution::resolve(specification, registry))
            .collect();

        for group in header.groups() {
            let Some(outcome) = resolution.specifications.get(group.specification as usize) else {
                continue;
            };
            for id in &group.objects {
                match outcome.classification {
                    Classification::Resolved => {
                        resolution.resolved.insert(*id);
                    }
                    Classification::Modified => {
                        resolution.modified.insert(
                            *id,
                            ModifiedObject {
                                specification: group.specification,
                                preview: BTreeMap::new(),
                            },
                        );
                    }
                    Classification::Missing => {
                        resolution.missing.insert(*id, group.specification);
                    }
                }
            }
        }

        tracing::debug!(
            resolved = resolution.resolved.len(),
            modified = resolution.modified.len(),
            missing = resolution.missing.len(),
            missing_types = resolution.missing_types.len(),
            "header resolved"
        );
        resolution
    }

    /// The classification of an object, if the header declared it.
    #[must_use]
    pub fn classification(&self, id: ObjectId) -> Option<Classification> {
        if self.resolved.contains(&id) {
            Some(Classification::Resolved)
        } else if self.modified.contains_key(&id) {
            Some(Classification::Modified)
        } else if self.missing.contains_key(&id) {
            Some(Classification::Missing)
        } else {
            None
        }
    }

    /// True if a stored type hash resolves to a current type.
    #[must_use]
    pub fn type_resolves(&self, hash: HashCode) -> bool {
        self.resolved_types.contains_key(&hash)
    }

    #[must_use]
    pub fn resolved_types(&self) -> &BTreeMap<HashCode, TypeDescriptor> {
        &self.resolved_types
    }

    #[must_use]
    pub fn missing_types(&self) -> &BTreeMap<HashCode, TypeDescriptor> {
        &self.missing_types
    }

    /// Per-specification outcomes, indexed like the header table.
    #[must_use]
    pub fn specifications(&self) -> &[SpecificationResolution] {
        &self.specifications
    }

    /// The outcome for one specification index.
    #[must_use]
    pub fn specification(&self, index: u32) -> Option<&SpecificationResolution> {
        self.specifications.get(index as usize)
    }

    #[must_use]
    pub fn resolved(&self) -> &BTreeSet<ObjectId> {
        &self.resolved
    }

    #[must_use]
    pub fn modified(&self) -> &BTreeMap<ObjectId, ModifiedObject> {
        &self.modified
    }

    /// Missing objects and the specification they were stored with.
    #[must_use]
    pub fn missing(&self) -> &BTreeMap<ObjectId, u32> {
        &self.missing
    }

    /// True when nothing is missing or modified.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty() && self.missing.is_empty() && self.missing_types.is_empty()
    }

    /// Keep the value of a removed property for preview.
    pub(crate) fn record_removed(&mut self, id: ObjectId, name: &str, value: Value) {
        if let Some(entry) = self.modified.get_mut(&id) {
            entry.preview.insert(name.to_string(), value);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
