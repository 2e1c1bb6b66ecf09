//! # Decoder (read path)
//!
//! Replays the node stream against the resolved header and rebuilds an
//! `ObjectGraph`.
//!
//! Rules:
//! - an object's arena slot is allocated BEFORE its children are read, so
//!   references back to it (cycles) resolve to the same handle
//! - open objects and collections are kept on an explicit stack
//! - every object the header declares must appear in the node stream
//! - objects of missing types decode to null; their bytes are consumed and
//!   nested objects are still materialized
//! - references to a missing object decode to null
//! - removed properties are read and dropped (or kept for preview)
//! - construction follows the mode recorded in the stream
//!
//! Any structural inconsistency is a `DriftError::Format`.

use crate::config::SerializerConfig;
use crate::constants::MAX_COLLECTION_PREALLOC;
use crate::formats::{DeserializedHeader, FormatterCache, read_header, read_node};
use crate::graph::{Instance, ObjectGraph, ObjectHandle};
use crate::hash::HashCode;
use crate::node::{NodePayload, SerializedNode};
use crate::registry::{TypeDefinition, TypeRegistry};
use crate::resolver::{Classification, Resolution};
use crate::schema::PropertySpecification;
use crate::types::{CollectionKind, ConstructionMode, ObjectId, TypeDescriptor};
use crate::value::{Collection, Value};
use crate::DriftError;
use std::collections::BTreeMap;
use std::io::Read;

/// The result of one decode call.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub graph: ObjectGraph,
    pub resolution: Resolution,
    /// Number of nodes read.
    pub nodes: usize,
}

/// Read a stream and rebuild its graph.
pub fn decode(
    reader: &mut dyn Read,
    registry: &TypeRegistry,
    config: &SerializerConfig,
) -> Result<Decoded, DriftError> {
    let header = read_header(reader)?;
    let resolution = Resolution::resolve(&header, registry);

    let mut session = Session {
        reader,
        header: &header,
        registry,
        config,
        formatters: FormatterCache::new(),
        graph: ObjectGraph::new(),
        objects: BTreeMap::new(),
        resolution,
        nodes: 0,
    };
    let root = session.read_root()?;

    let Session {
        mut graph,
        resolution,
        nodes,
        objects,
        ..
    } = session;
    if objects.len() != header.object_count() {
        return Err(DriftError::Format(format!(
            "header declares {} objects but the stream wrote {}",
            header.object_count(),
            objects.len()
        )));
    }
    graph.set_root(root);

    tracing::debug!(nodes, objects = graph.len(), "graph decoded");
    Ok(Decoded {
        graph,
        resolution,
        nodes,
    })
}

struct Session<'r, 'a> {
    reader: &'r mut dyn Read,
    header: &'a DeserializedHeader,
    registry: &'a TypeRegistry,
    config: &'a SerializerConfig,
    formatters: FormatterCache,
    graph: ObjectGraph,
    /// `None` marks an object of a missing type.
    objects: BTreeMap<ObjectId, Option<ObjectHandle>>,
    resolution: Resolution,
    nodes: usize,
}

/// A collection or object whose children are still being read.
enum Frame<'a> {
    Collection(CollectionFrame),
    Object(ObjectFrame<'a>),
}

struct CollectionFrame {
    type_hash: HashCode,
    kind: CollectionKind,
    element: TypeDescriptor,
    count: usize,
    items: Vec<Value>,
}

struct ObjectFrame<'a> {
    id: ObjectId,
    mode: ConstructionMode,
    index: u32,
    stored: &'a PropertySpecification,
    /// `None` for objects of a missing type.
    target: Option<(ObjectHandle, &'a TypeDefinition)>,
    next: usize,
    properties: BTreeMap<String, Value>,
}

impl Frame<'_> {
    fn is_complete(&self) -> bool {
        match self {
            Frame::Collection(frame) => frame.items.len() >= frame.count,
            Frame::Object(frame) => frame.next >= frame.stored.len(),
        }
    }
}

/// What reading one node produced.
enum Opened<'a> {
    Value(Value),
    Frame(Frame<'a>),
}

impl<'a> Session<'_, 'a> {
    /// Read the node tree rooted at the next node.
    ///
    /// Open collections and objects live on an explicit stack, so graph
    /// depth is bounded by `max_depth` and never by the thread stack.
    fn read_root(&mut self) -> Result<Value, DriftError> {
        let mut stack: Vec<Frame<'a>> = Vec::new();
        loop {
            if stack.len() > self.config.max_depth {
                return Err(DriftError::DepthExceeded(self.config.max_depth));
            }
            let node = read_node(&mut *self.reader, self.header, &mut self.formatters)?;
            self.nodes += 1;

            let mut value = match self.open(node)? {
                Opened::Value(value) => value,
                Opened::Frame(frame) => {
                    stack.push(frame);
                    continue;
                }
            };

            loop {
                let Some(mut parent) = stack.pop() else {
                    return Ok(value);
                };
                self.accept(&mut parent, value);
                if parent.is_complete() {
                    value = self.finish(parent)?;
                } else {
                    stack.push(parent);
                    break;
                }
            }
        }
    }

    fn open(&mut self, node: SerializedNode) -> Result<Opened<'a>, DriftError> {
        let frame = match node.payload {
            NodePayload::Null | NodePayload::NullPrimitive => return Ok(Opened::Value(Value::Null)),
            NodePayload::Primitive(primitive) => {
                if self.resolution.type_resolves(node.type_hash) {
                    return Ok(Opened::Value(Value::Primitive(primitive)));
                }
                tracing::trace!(type_hash = %node.type_hash, "value of missing type decoded as null");
                return Ok(Opened::Value(Value::Null));
            }
            NodePayload::Reference(id) => {
                return match self.objects.get(&id) {
                    Some(Some(handle)) => Ok(Opened::Value(Value::Object(*handle))),
                    Some(None) => Ok(Opened::Value(Value::Null)),
                    None => Err(DriftError::Format(format!(
                        "reference to unseen object {}",
                        id.0
                    ))),
                };
            }
            NodePayload::Collection {
                kind,
                count,
                element_type,
            } => Frame::Collection(self.open_collection(node.type_hash, kind, count, element_type)?),
            NodePayload::Object { id, specification } => {
                Frame::Object(self.open_object(node.mode, node.type_hash, id, specification)?)
            }
        };

        if frame.is_complete() {
            Ok(Opened::Value(self.finish(frame)?))
        } else {
            Ok(Opened::Frame(frame))
        }
    }

    fn open_collection(
        &self,
        type_hash: HashCode,
        kind: CollectionKind,
        count: u32,
        element_type: HashCode,
    ) -> Result<CollectionFrame, DriftError> {
        let element = self.header.type_of(element_type)?.clone();
        let expected = match kind {
            CollectionKind::Array => TypeDescriptor::array_of(element.clone()),
            CollectionKind::List => TypeDescriptor::list_of(element.clone()),
        };
        if expected.hash() != type_hash {
            return Err(DriftError::Format(format!(
                "collection type {} does not match element type {}",
                type_hash, element
            )));
        }

        let count = count as usize;
        let items = match kind {
            CollectionKind::Array => Vec::with_capacity(count.min(MAX_COLLECTION_PREALLOC)),
            CollectionKind::List => Vec::new(),
        };
        Ok(CollectionFrame {
            type_hash,
            kind,
            element,
            count,
            items,
        })
    }

    fn open_object(
        &mut self,
        mode: ConstructionMode,
        type_hash: HashCode,
        id: ObjectId,
        index: u32,
    ) -> Result<ObjectFrame<'a>, DriftError> {
        let header = self.header;
        if header.specification_of(id) != Some(index) {
            return Err(DriftError::Format(format!(
                "object {} carries specification {} not recorded in the header",
                id.0, index
            )));
        }
        if self.objects.contains_key(&id) {
            return Err(DriftError::Format(format!("object {} written twice", id.0)));
        }

        let stored = header.specification(index)?;
        let object_type = stored.object_type().implementing();
        if object_type.hash() != type_hash {
            return Err(DriftError::Format(format!(
                "object {} type {} disagrees with its specification ({})",
                id.0,
                type_hash,
                object_type
            )));
        }
        if stored.is_user_defined() != (mode == ConstructionMode::Specified) {
            return Err(DriftError::Format(format!(
                "object {} mode {:?} disagrees with its specification",
                id.0, mode
            )));
        }

        let classification = self
            .resolution
            .specification(index)
            .map(|outcome| outcome.classification())
            .ok_or_else(|| {
                DriftError::Format(format!("specification {} was not resolved", index))
            })?;

        let target = if classification == Classification::Missing {
            self.objects.insert(id, None);
            None
        } else {
            let registry = self.registry;
            let definition = registry
                .definition(object_type)
                .ok_or_else(|| DriftError::UnknownType(object_type.to_string()))?;
            let handle = self.graph.alloc(Instance::new(object_type.clone()));
            self.objects.insert(id, Some(handle));
            Some((handle, definition.as_ref()))
        };

        Ok(ObjectFrame {
            id,
            mode,
            index,
            stored,
            target,
            next: 0,
            properties: BTreeMap::new(),
        })
    }

    /// Hand a finished child value to its open parent.
    fn accept(&mut self, parent: &mut Frame<'a>, value: Value) {
        let frame = match parent {
            Frame::Collection(frame) => {
                frame.items.push(value);
                return;
            }
            Frame::Object(frame) => frame,
        };

        let position = frame.next;
        frame.next += 1;
        let Some(stored_definition) = frame.stored.definitions().get(position) else {
            return;
        };
        if frame.target.is_none() {
            return;
        }

        let keep = self
            .resolution
            .specification(frame.index)
            .and_then(|outcome| outcome.accepted().get(position).copied())
            .unwrap_or(false);
        let name = stored_definition.name();
        if keep {
            frame.properties.insert(name.to_string(), value);
            return;
        }

        if self.config.ignore_removed_properties {
            tracing::trace!(object = frame.id.0, property = name, "removed property dropped");
        } else {
            tracing::warn!(
                object = frame.id.0,
                type_name = %frame.stored.object_type().implementing(),
                property = name,
                "removed property dropped"
            );
        }
        if self.config.preview_removed_properties {
            self.resolution.record_removed(frame.id, name, value);
        }
    }

    /// Build the value of a frame whose children have all been read.
    fn finish(&mut self, frame: Frame<'a>) -> Result<Value, DriftError> {
        let frame = match frame {
            Frame::Collection(frame) => {
                if !self.resolution.type_resolves(frame.type_hash) {
                    tracing::debug!(
                        element = %frame.element,
                        "collection of missing type decoded as null"
                    );
                    return Ok(Value::Null);
                }
                return Ok(Value::Collection(Collection::new(
                    frame.kind,
                    frame.element,
                    frame.items,
                )));
            }
            Frame::Object(frame) => frame,
        };

        let object_type = frame.stored.object_type().implementing();
        let Some((handle, definition)) = frame.target else {
            tracing::debug!(object = frame.id.0, type_name = %object_type, "object of missing type decoded as null");
            return Ok(Value::Null);
        };

        let instance = match frame.mode {
            ConstructionMode::Default => {
                let mut instance = definition.default_instance();
                for (name, value) in frame.properties {
                    instance.set(name, value);
                }
                instance
            }
            ConstructionMode::Specified => {
                let construction_error = |reason: String| DriftError::Construction {
                    object: frame.id,
                    type_name: object_type.to_string(),
                    mode: frame.mode,
                    reason,
                };
                let hook = definition.custom().ok_or_else(|| {
                    construction_error("type has no custom serialization hook".to_string())
                })?;
                hook.construct(object_type, frame.properties)
                    .map_err(|error| match error {
                        DriftError::Construction { .. } => error,
                        other => construction_error(other.to_string()),
                    })?
            }
        };
        self.graph.replace(handle, instance)?;
        Ok(Value::Object(handle))
    }
}

// =============================================================================
// STRUCTURAL SCAN
// =============================================================================

/// One node of a structural scan, with its tree depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedNode {
    pub depth: usize,
    pub node: SerializedNode,
}

/// Read the header and every node without resolving or constructing
/// anything. Used for diagnostics.
pub fn scan(
    reader: &mut dyn Read,
    max_depth: usize,
) -> Result<(DeserializedHeader, Vec<ScannedNode>), DriftError> {
    let header = read_header(reader)?;
    let mut formatters = FormatterCache::new();
    let mut nodes = Vec::new();
    // Remaining children of every open object/collection.
    let mut open: Vec<usize> = Vec::new();

    loop {
        if open.len() > max_depth {
            return Err(DriftError::DepthExceeded(max_depth));
        }
        let node = read_node(reader, &header, &mut formatters)?;
        let children = match &node.payload {
            NodePayload::Object { specification, .. } => header.specification(*specification)?.len(),
            NodePayload::Collection { count, .. } => *count as usize,
            _ => 0,
        };
        nodes.push(ScannedNode {
            depth: open.len(),
            node,
        });
        if children > 0 {
            open.push(children);
            continue;
        }
        loop {
            match open.last_mut() {
                None => return Ok((header, nodes)),
                Some(remaining) => {
                    *remaining -= 1;
                    if *remaining > 0 {
                        break;
                    }
                    open.pop();
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
