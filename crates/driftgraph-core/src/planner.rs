//! # Graph Planner (write path)
//!
//! Single depth-first pass over an `ObjectGraph` that:
//! - numbers every object on first visit (`ObjectId`, dense from 0)
//! - emits a `Reference` node on every later visit, which is what
//!   deduplicates shared objects and terminates cycles
//! - snapshots each object's property specification and interns identical
//!   specifications into one shared header entry
//! - collects every type descriptor the stream mentions
//!
//! The resulting node list is the exact pre-order the encoder writes and
//! the decoder replays.

use crate::graph::{ObjectGraph, ObjectHandle};
use crate::hash::HashCode;
use crate::node::{NodePayload, SerializedNode};
use crate::registry::TypeRegistry;
use crate::schema::{PropertyDefinition, PropertySpecification};
use crate::types::{ConstructionMode, ObjectId, TypeDescriptor, TypeIdentity};
use crate::value::{Value, is_primitive_type};
use crate::DriftError;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PLAN
// =============================================================================

/// Objects that share one property specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationGroup {
    /// Index into the specification table.
    pub specification: u32,
    /// Members, in first-visit order.
    pub objects: Vec<ObjectId>,
}

/// Everything the encoder needs, computed before any byte is written.
#[derive(Debug, Clone)]
pub struct SerializationPlan {
    nodes: Vec<SerializedNode>,
    types: BTreeMap<HashCode, TypeDescriptor>,
    specifications: Vec<PropertySpecification>,
    groups: Vec<SpecificationGroup>,
    objects: BTreeMap<ObjectHandle, ObjectId>,
}

impl SerializationPlan {
    /// The root node (first node of the stream).
    #[must_use]
    pub fn root(&self) -> Option<&SerializedNode> {
        self.nodes.first()
    }

    /// All nodes in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[SerializedNode] {
        &self.nodes
    }

    /// Every descriptor referenced by a node or a specification.
    #[must_use]
    pub fn types(&self) -> &BTreeMap<HashCode, TypeDescriptor> {
        &self.types
    }

    /// Unique specifications, indexed by `SpecificationGroup::specification`.
    #[must_use]
    pub fn specifications(&self) -> &[PropertySpecification] {
        &self.specifications
    }

    /// Objects grouped by shared specification.
    #[must_use]
    pub fn groups(&self) -> &[SpecificationGroup] {
        &self.groups
    }

    /// Identity map: arena handle → assigned object id.
    #[must_use]
    pub fn objects(&self) -> &BTreeMap<ObjectHandle, ObjectId> {
        &self.objects
    }

    /// Number of distinct objects written.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

// =============================================================================
// PLANNER
// =============================================================================

/// A property about to be visited: name, declared type, value.
type PendingProperty<'a> = (String, TypeDescriptor, Cow<'a, Value>);

/// A value waiting to be written, with the slot type it sits in.
struct Pending<'a> {
    value: Cow<'a, Value>,
    declared: Cow<'a, TypeDescriptor>,
    depth: usize,
}

/// Builds a `SerializationPlan` for one graph.
pub struct Planner<'a> {
    graph: &'a ObjectGraph,
    registry: &'a TypeRegistry,
    max_depth: usize,
    objects: BTreeMap<ObjectHandle, ObjectId>,
    nodes: Vec<SerializedNode>,
    types: BTreeMap<HashCode, TypeDescriptor>,
    specifications: Vec<PropertySpecification>,
    specification_index: BTreeMap<HashCode, u32>,
    groups: BTreeMap<u32, Vec<ObjectId>>,
}

impl<'a> Planner<'a> {
    /// Create a planner. Identity numbering starts at zero.
    #[must_use]
    pub fn new(graph: &'a ObjectGraph, registry: &'a TypeRegistry, max_depth: usize) -> Self {
        Self {
            graph,
            registry,
            max_depth,
            objects: BTreeMap::new(),
            nodes: Vec::new(),
            types: BTreeMap::new(),
            specifications: Vec::new(),
            specification_index: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    /// Walk the graph from its root and produce the plan.
    ///
    /// The walk keeps its own stack: children are pushed in reverse so they
    /// pop in declaration order, which reproduces a recursive pre-order.
    pub fn plan(mut self) -> Result<SerializationPlan, DriftError> {
        let graph = self.graph;
        let root = graph.root();
        let declared = match root {
            Value::Null => TypeDescriptor::any(),
            other => self.runtime_type(other, &TypeDescriptor::any())?,
        };

        let mut stack = vec![Pending {
            value: Cow::Borrowed(root),
            declared: Cow::Owned(declared),
            depth: 0,
        }];
        while let Some(pending) = stack.pop() {
            self.visit(pending, &mut stack)?;
        }

        let groups = self
            .groups
            .into_iter()
            .map(|(specification, objects)| SpecificationGroup {
                specification,
                objects,
            })
            .collect();

        tracing::debug!(
            nodes = self.nodes.len(),
            objects = self.objects.len(),
            specifications = self.specifications.len(),
            types = self.types.len(),
            "serialization planned"
        );

        Ok(SerializationPlan {
            nodes: self.nodes,
            types: self.types,
            specifications: self.specifications,
            groups,
            objects: self.objects,
        })
    }

    fn visit(&mut self, pending: Pending<'a>, stack: &mut Vec<Pending<'a>>) -> Result<(), DriftError> {
        let Pending {
            value,
            declared,
            depth,
        } = pending;
        if depth > self.max_depth {
            return Err(DriftError::DepthExceeded(self.max_depth));
        }

        match &*value {
            Value::Null => {
                let payload = if is_primitive_type(&declared) {
                    NodePayload::NullPrimitive
                } else {
                    NodePayload::Null
                };
                let hash = self.register(&declared);
                self.nodes.push(SerializedNode::new(hash, payload));
            }
            Value::Primitive(primitive) => {
                let hash = self.register(&primitive.descriptor());
                self.nodes.push(SerializedNode::new(
                    hash,
                    NodePayload::Primitive(primitive.clone()),
                ));
            }
            Value::Collection(collection) => {
                let hash = self.register(&collection.descriptor());
                let element_type = self.register(collection.element_type());
                let count = u32::try_from(collection.len()).map_err(|_| {
                    DriftError::SerializationError(format!(
                        "collection of {} elements exceeds the wire limit",
                        collection.len()
                    ))
                })?;
                self.nodes.push(SerializedNode::new(
                    hash,
                    NodePayload::Collection {
                        kind: collection.kind(),
                        count,
                        element_type,
                    },
                ));
            }
            Value::Object(handle) => {
                return self.visit_object(*handle, &declared, depth, stack);
            }
        }

        match value {
            Cow::Borrowed(Value::Collection(collection)) => {
                let element = collection.element_type();
                stack.extend(collection.items().iter().rev().map(|item| Pending {
                    value: Cow::Borrowed(item),
                    declared: Cow::Borrowed(element),
                    depth: depth + 1,
                }));
            }
            Cow::Owned(Value::Collection(collection)) => {
                let element = collection.element_type();
                stack.extend(collection.items().iter().rev().map(|item| Pending {
                    value: Cow::Owned(item.clone()),
                    declared: Cow::Owned(element.clone()),
                    depth: depth + 1,
                }));
            }
            _ => {}
        }
        Ok(())
    }

    fn visit_object(
        &mut self,
        handle: ObjectHandle,
        declared: &TypeDescriptor,
        depth: usize,
        stack: &mut Vec<Pending<'a>>,
    ) -> Result<(), DriftError> {
        let graph = self.graph;
        let registry = self.registry;
        let instance = graph.get(handle)?;
        let implementing = instance.type_descriptor();

        if let Some(id) = self.objects.get(&handle).copied() {
            let hash = self.register(implementing);
            self.nodes
                .push(SerializedNode::new(hash, NodePayload::Reference(id)));
            return Ok(());
        }

        let id = ObjectId(u32::try_from(self.objects.len()).map_err(|_| {
            DriftError::SerializationError("object count exceeds the wire limit".to_string())
        })?);
        self.objects.insert(handle, id);

        let definition = registry
            .definition(implementing)
            .ok_or_else(|| DriftError::UnknownType(implementing.to_string()))?;
        let mode = definition.mode();

        let properties: Vec<PendingProperty<'a>> = match definition.custom() {
            None => {
                for (name, _) in instance.properties() {
                    if !definition.properties().iter().any(|slot| slot.name == name) {
                        tracing::trace!(
                            type_name = %implementing,
                            property = name,
                            "undeclared property not written"
                        );
                    }
                }
                definition
                    .properties()
                    .iter()
                    .map(|slot| {
                        let value = instance
                            .get(&slot.name)
                            .map(Cow::Borrowed)
                            .unwrap_or_else(|| Cow::Owned(Value::default_for(&slot.declared)));
                        (slot.name.clone(), slot.declared.clone(), value)
                    })
                    .collect()
            }
            Some(hook) => {
                let emitted = hook.emit_properties(instance);
                let mut names = BTreeSet::new();
                for property in &emitted {
                    if !names.insert(property.name.as_str()) {
                        return Err(DriftError::SerializationError(format!(
                            "{} emitted property '{}' twice",
                            implementing, property.name
                        )));
                    }
                }
                emitted
                    .into_iter()
                    .map(|property| (property.name, property.declared, Cow::Owned(property.value)))
                    .collect()
            }
        };

        let mut definitions = Vec::with_capacity(properties.len());
        for (name, slot_type, value) in &properties {
            let written = self.runtime_type(value, slot_type)?;
            self.register(slot_type);
            self.register(&written);
            definitions.push(PropertyDefinition::new(
                name.clone(),
                TypeIdentity::new(slot_type.clone(), written),
            ));
        }

        let specification = PropertySpecification::new(
            TypeIdentity::new(declared.clone(), implementing.clone()),
            mode == ConstructionMode::Specified,
            definitions,
        );
        self.register(declared);
        let hash = self.register(implementing);
        let index = self.intern(specification)?;
        self.groups.entry(index).or_default().push(id);

        self.nodes.push(
            SerializedNode::new(
                hash,
                NodePayload::Object {
                    id,
                    specification: index,
                },
            )
            .with_mode(mode),
        );

        stack.extend(properties.into_iter().rev().map(|(_, slot_type, value)| Pending {
            value,
            declared: Cow::Owned(slot_type),
            depth: depth + 1,
        }));
        Ok(())
    }

    /// The runtime type of a value sitting in a slot declared `declared`.
    fn runtime_type(
        &self,
        value: &Value,
        declared: &TypeDescriptor,
    ) -> Result<TypeDescriptor, DriftError> {
        Ok(match value {
            Value::Null => declared.clone(),
            Value::Primitive(primitive) => primitive.descriptor(),
            Value::Collection(collection) => collection.descriptor(),
            Value::Object(handle) => self.graph.get(*handle)?.type_descriptor().clone(),
        })
    }

    fn register(&mut self, descriptor: &TypeDescriptor) -> HashCode {
        let hash = descriptor.hash();
        self.types
            .entry(hash)
            .or_insert_with(|| descriptor.clone());
        hash
    }

    fn intern(&mut self, specification: PropertySpecification) -> Result<u32, DriftError> {
        if let Some(index) = self.specification_index.get(&specification.hash()) {
            return Ok(*index);
        }
        let index = u32::try_from(self.specifications.len()).map_err(|_| {
            DriftError::SerializationError("specification count exceeds the wire limit".to_string())
        })?;
        self.specification_index.insert(specification.hash(), index);
        self.specifications.push(specification);
        Ok(index)
    }
}

// =============================================================================
// TESTS
// =============================================================================
