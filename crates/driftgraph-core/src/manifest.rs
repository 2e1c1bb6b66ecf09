//! # Manifest
//!
//! Flattened diagnostic summary of what a decode pass ignored: missing
//! types, removed properties and added properties, each with the number of
//! affected objects. Serializable for external tooling.

use crate::hash::HashCode;
use crate::resolver::{Classification, Resolution};
use serde::Serialize;
use std::collections::BTreeMap;

/// One ignored type or property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManifestEntry {
    /// A stored type that no longer exists.
    MissingType {
        type_name: String,
        hash: HashCode,
        objects: usize,
    },
    /// A stored property the current type dropped; its value was discarded.
    RemovedProperty {
        type_name: String,
        property: String,
        declared: String,
        objects: usize,
    },
    /// A current property the stream did not carry; it kept its default.
    AddedProperty {
        type_name: String,
        property: String,
        declared: String,
        objects: usize,
    },
}

/// Object totals by classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub resolved: usize,
    pub modified: usize,
    pub missing: usize,
}

/// Summary of one decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
    pub objects: ObjectCounts,
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum EntryKey {
    Missing(HashCode),
    Removed(String, String, String),
    Added(String, String, String),
}

impl Manifest {
    /// Build the manifest of a resolution.
    #[must_use]
    pub fn build(resolution: &Resolution) -> Self {
        let mut per_specification: BTreeMap<u32, usize> = BTreeMap::new();
        for entry in resolution.modified().values() {
            *per_specification.entry(entry.specification).or_default() += 1;
        }
        let mut missing_per_type: BTreeMap<HashCode, usize> = BTreeMap::new();
        for index in resolution.missing().values() {
            if let Some(outcome) = resolution.specification(*index) {
                *missing_per_type.entry(outcome.object_type().hash()).or_default() += 1;
            }
        }

        let mut counts: BTreeMap<EntryKey, usize> = BTreeMap::new();
        for hash in resolution.missing_types().keys() {
            let objects = missing_per_type.get(hash).copied().unwrap_or(0);
            counts.insert(EntryKey::Missing(*hash), objects);
        }

        for (index, outcome) in resolution.specifications().iter().enumerate() {
            if outcome.classification() != Classification::Modified {
                continue;
            }
            let objects = per_specification.get(&(index as u32)).copied().unwrap_or(0);
            let type_name = outcome.object_type().to_string();
            for removed in outcome.removed() {
                let key = EntryKey::Removed(
                    type_name.clone(),
                    removed.name().to_string(),
                    removed.declared_type().to_string(),
                );
                *counts.entry(key).or_default() += objects;
            }
            for added in outcome.added() {
                let key = EntryKey::Added(
                    type_name.clone(),
                    added.name.clone(),
                    added.declared.to_string(),
                );
                *counts.entry(key).or_default() += objects;
            }
        }

        let entries = counts
            .into_iter()
            .map(|(key, objects)| match key {
                EntryKey::Missing(hash) => ManifestEntry::MissingType {
                    type_name: resolution
                        .missing_types()
                        .get(&hash)
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                    hash,
                    objects,
                },
                EntryKey::Removed(type_name, property, declared) => ManifestEntry::RemovedProperty {
                    type_name,
                    property,
                    declared,
                    objects,
                },
                EntryKey::Added(type_name, property, declared) => ManifestEntry::AddedProperty {
                    type_name,
                    property,
                    declared,
                    objects,
                },
            })
            .collect();

        Self {
            entries,
            objects: ObjectCounts {
                resolved: resolution.resolved().len(),
                modified: resolution.modified().len(),
                missing: resolution.missing().len(),
            },
        }
    }

    /// True if nothing was ignored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of all missing types.
    pub fn missing_types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            ManifestEntry::MissingType { type_name, .. } => Some(type_name.as_str()),
            _ => None,
        })
    }
}
