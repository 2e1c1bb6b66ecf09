//! # Inspection Reports
//!
//! Serializable views of a stream produced by the CLI commands. Printed as
//! text tables by default and as JSON in `--json-mode`.

use driftgraph_core::{
    Classification, CollectionKind, Decoded, HashCode, Manifest, NodePayload,
    ObjectCounts, Primitive, Resolution, ScannedNode, TypeRegistry, formats::DeserializedHeader,
};
use serde::Serialize;

// =============================================================================
// INSPECT
// =============================================================================

/// One stored type and whether the current catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeRow {
    pub name: String,
    pub hash: String,
    pub resolved: bool,
}

/// One stored property specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificationRow {
    pub index: u32,
    pub type_name: String,
    pub mode: String,
    pub properties: Vec<String>,
    pub objects: usize,
    pub classification: Classification,
}

/// Header summary plus classification totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectReport {
    pub bytes: u64,
    pub nodes: usize,
    pub types: Vec<TypeRow>,
    pub specifications: Vec<SpecificationRow>,
    pub objects: ObjectCounts,
}

impl InspectReport {
    /// Summarize a decoded stream.
    pub fn build(bytes: u64, header: &DeserializedHeader, decoded: &Decoded) -> Self {
        let resolution = &decoded.resolution;
        let types = header
            .types()
            .iter()
            .map(|(hash, descriptor)| TypeRow {
                name: descriptor.to_string(),
                hash: hash.to_string(),
                resolved: resolution.type_resolves(*hash),
            })
            .collect();

        let specifications = header
            .specifications()
            .iter()
            .enumerate()
            .map(|(index, stored)| {
                let index = index as u32;
                SpecificationRow {
                    index,
                    type_name: stored.object_type().implementing().to_string(),
                    mode: if stored.is_user_defined() {
                        "specified".to_string()
                    } else {
                        "default".to_string()
                    },
                    properties: stored
                        .definitions()
                        .iter()
                        .map(|definition| {
                            format!("{}: {}", definition.name(), definition.declared_type())
                        })
                        .collect(),
                    objects: header
                        .groups()
                        .iter()
                        .filter(|group| group.specification == index)
                        .map(|group| group.objects.len())
                        .sum(),
                    classification: classification_of(resolution, index),
                }
            })
            .collect();

        Self {
            bytes,
            nodes: decoded.nodes,
            types,
            specifications,
            objects: Manifest::build(resolution).objects,
        }
    }
}

fn classification_of(resolution: &Resolution, index: u32) -> Classification {
    resolution
        .specification(index)
        .map(|outcome| outcome.classification())
        .unwrap_or(Classification::Missing)
}

// =============================================================================
// NODES
// =============================================================================

/// One line of a node listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRow {
    pub depth: usize,
    pub tag: String,
    pub mode: String,
    pub type_name: String,
    pub detail: String,
}

impl NodeRow {
    /// Describe one scanned node using the header's type table.
    pub fn build(header: &DeserializedHeader, scanned: &ScannedNode) -> Self {
        let node = &scanned.node;
        let type_name = stored_type_name(header, node.type_hash);
        let detail = match &node.payload {
            NodePayload::Null | NodePayload::NullPrimitive => String::new(),
            NodePayload::Primitive(primitive) => describe_primitive(primitive),
            NodePayload::Object { id, specification } => {
                format!("#{} spec {}", id.0, specification)
            }
            NodePayload::Reference(id) => format!("-> #{}", id.0),
            NodePayload::Collection {
                kind,
                count,
                element_type,
            } => {
                let kind = match kind {
                    CollectionKind::Array => "array",
                    CollectionKind::List => "list",
                };
                format!("{} of {} x {}", kind, count, stored_type_name(header, *element_type))
            }
        };
        Self {
            depth: scanned.depth,
            tag: node.tag().to_string(),
            mode: format!("{:?}", node.mode).to_lowercase(),
            type_name,
            detail,
        }
    }
}

/// Stored type name, or the raw hash for nodes whose type the header does
/// not list.
fn stored_type_name(header: &DeserializedHeader, hash: HashCode) -> String {
    header
        .type_of(hash)
        .map(ToString::to_string)
        .unwrap_or_else(|_| hash.to_string())
}

/// Longest primitive rendering before truncation.
const MAX_DETAIL_CHARS: usize = 48;

fn describe_primitive(primitive: &Primitive) -> String {
    let text = match primitive {
        Primitive::String(value) => format!("{:?}", value),
        Primitive::Enum(value) => value.value().to_string(),
        Primitive::Array(array) => format!("[{} x {}]", array.len(), array.kind().name()),
        other => format!("{:?}", other),
    };
    if text.chars().count() > MAX_DETAIL_CHARS {
        let mut truncated: String = text.chars().take(MAX_DETAIL_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        text
    }
}

/// Build the full listing.
pub fn node_rows(header: &DeserializedHeader, nodes: &[ScannedNode]) -> Vec<NodeRow> {
    nodes.iter().map(|node| NodeRow::build(header, node)).collect()
}

/// Stored types the registry cannot resolve.
pub fn unresolved_types(header: &DeserializedHeader, registry: &TypeRegistry) -> Vec<String> {
    header
        .types()
        .values()
        .filter(|descriptor| !registry.resolves(descriptor))
        .map(ToString::to_string)
        .collect()
}

// =============================================================================
// REMOVED-VALUE PREVIEW
// =============================================================================

/// One removed property value kept for preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRow {
    pub object: u32,
    pub property: String,
    pub value: String,
}

/// Flatten the previewed removed values of a resolution, by object id.
pub fn preview_rows(resolution: &Resolution) -> Vec<PreviewRow> {
    resolution
        .modified()
        .iter()
        .flat_map(|(id, modified)| {
            modified.preview.iter().map(move |(property, value)| PreviewRow {
                object: id.0,
                property: property.clone(),
                value: format!("{:?}", value),
            })
        })
        .collect()
}
