//! # Object Graph
//!
//! The in-memory graph that gets serialized.
//!
//! Objects live in an arena and are addressed by dense `ObjectHandle`
//! indices. Reference identity is handle equality: two slots holding the
//! same handle hold the same object, and a slot holding an ancestor's
//! handle closes a cycle. Nothing here is reference-counted, so cyclic
//! graphs need no special care when dropped.

use crate::types::TypeDescriptor;
use crate::value::Value;
use crate::DriftError;
use std::collections::BTreeMap;

// =============================================================================
// HANDLES & INSTANCES
// =============================================================================

/// Index of an instance in its `ObjectGraph` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(pub usize);

/// One object: its runtime type and its named property values.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_descriptor: TypeDescriptor,
    properties: BTreeMap<String, Value>,
}

impl Instance {
    /// Create an instance with no property values set.
    #[must_use]
    pub fn new(type_descriptor: TypeDescriptor) -> Self {
        Self {
            type_descriptor,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property assignment.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set a property value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(name.into(), value.into())
    }

    /// Get a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Remove a property value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    /// The instance's runtime type.
    #[must_use]
    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.type_descriptor
    }

    /// All property values, ordered by name.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Number of property values set.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

// =============================================================================
// OBJECT GRAPH
// =============================================================================

/// Arena of instances plus the root position.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    instances: Vec<Instance>,
    root: Value,
}

impl ObjectGraph {
    /// Create a new empty graph with a null root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph whose root is a single primitive or collection value.
    #[must_use]
    pub fn with_root(root: impl Into<Value>) -> Self {
        Self {
            instances: Vec::new(),
            root: root.into(),
        }
    }

    /// Add an instance to the arena and return its handle.
    pub fn alloc(&mut self, instance: Instance) -> ObjectHandle {
        self.instances.push(instance);
        ObjectHandle(self.instances.len() - 1)
    }

    /// Replace the instance behind an existing handle.
    pub fn replace(&mut self, handle: ObjectHandle, instance: Instance) -> Result<(), DriftError> {
        let slot = self
            .instances
            .get_mut(handle.0)
            .ok_or(DriftError::InvalidHandle(handle.0))?;
        *slot = instance;
        Ok(())
    }

    /// Look up an instance.
    pub fn get(&self, handle: ObjectHandle) -> Result<&Instance, DriftError> {
        self.instances
            .get(handle.0)
            .ok_or(DriftError::InvalidHandle(handle.0))
    }

    /// Look up an instance mutably.
    pub fn get_mut(&mut self, handle: ObjectHandle) -> Result<&mut Instance, DriftError> {
        self.instances
            .get_mut(handle.0)
            .ok_or(DriftError::InvalidHandle(handle.0))
    }

    /// Set one property of an instance.
    pub fn set_property(
        &mut self,
        handle: ObjectHandle,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), DriftError> {
        self.get_mut(handle)?.set(name, value);
        Ok(())
    }

    /// Follow an object value to its instance.
    ///
    /// Returns `None` for non-object values and dangling handles.
    #[must_use]
    pub fn follow(&self, value: &Value) -> Option<&Instance> {
        value
            .as_object()
            .and_then(|handle| self.instances.get(handle.0))
    }

    /// Set the root position.
    pub fn set_root(&mut self, root: impl Into<Value>) {
        self.root = root.into();
    }

    /// The root position.
    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// All instances in arena order, reachable or not.
    pub fn instances(&self) -> impl Iterator<Item = (ObjectHandle, &Instance)> {
        self.instances
            .iter()
            .enumerate()
            .map(|(i, instance)| (ObjectHandle(i), instance))
    }

    /// Number of instances in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Compare the graphs reachable from both roots, up to handle renaming.
    ///
    /// Two graphs are structurally equal when there is a one-to-one mapping
    /// between their reachable handles under which every instance has the
    /// same type and the same property values. Shared references and cycles
    /// must therefore line up exactly: a graph where two slots point at one
    /// object is NOT equal to one where they point at two equal copies.
    ///
    /// Iterative; safe on deep and cyclic graphs.
    #[must_use]
    pub fn structurally_eq(&self, other: &ObjectGraph) -> bool {
        let mut forward: BTreeMap<ObjectHandle, ObjectHandle> = BTreeMap::new();
        let mut backward: BTreeMap<ObjectHandle, ObjectHandle> = BTreeMap::new();
        let mut pending: Vec<(&Value, &Value)> = vec![(&self.root, &other.root)];

        while let Some((left, right)) = pending.pop() {
            match (left, right) {
                (Value::Null, Value::Null) => {}
                (Value::Primitive(a), Value::Primitive(b)) => {
                    if a != b {
                        return false;
                    }
                }
                (Value::Collection(a), Value::Collection(b)) => {
                    if a.kind() != b.kind()
                        || a.element_type() != b.element_type()
                        || a.len() != b.len()
                    {
                        return false;
                    }
                    pending.extend(a.items().iter().zip(b.items()));
                }
                (Value::Object(a), Value::Object(b)) => {
                    match (forward.get(a), backward.get(b)) {
                        (Some(mapped), _) if mapped == b => continue,
                        (None, None) => {}
                        _ => return false,
                    }
                    forward.insert(*a, *b);
                    backward.insert(*b, *a);

                    let (Some(ia), Some(ib)) =
                        (self.instances.get(a.0), other.instances.get(b.0))
                    else {
                        return false;
                    };
                    if ia.type_descriptor != ib.type_descriptor
                        || ia.properties.len() != ib.properties.len()
                    {
                        return false;
                    }
                    for (name, value) in &ia.properties {
                        let Some(counterpart) = ib.properties.get(name) else {
                            return false;
                        };
                        pending.push((value, counterpart));
                    }
                }
                _ => return false,
            }
        }

        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
