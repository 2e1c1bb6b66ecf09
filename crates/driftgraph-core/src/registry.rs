//! # Type Registry
//!
//! The set of types "visible in the current process".
//!
//! Reflection does not exist here, so every user type that takes part in a
//! graph is described explicitly:
//! - a `TypeDefinition` lists the type's public property slots in order
//!   (`Default` mode), or
//! - the type carries a `CustomSerialization` hook that emits its own
//!   properties and constructs instances from what was read back
//!   (`Specified` mode).
//!
//! Rust types can describe themselves at compile time through
//! `DescribeType` and be registered with `register_described`.
//!
//! The writer consults the registry to learn which properties to emit; the
//! reader consults it to decide which stored types still resolve and which
//! stored properties still apply.

use crate::constants::{ANY_TYPE_NAME, ARRAY_TYPE_NAME, LIST_TYPE_NAME};
use crate::graph::Instance;
use crate::schema::slot_key;
use crate::types::{ConstructionMode, TypeDescriptor};
use crate::value::{PrimitiveKind, Value};
use crate::{DriftError, HashCode};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// CUSTOM SERIALIZATION HOOK
// =============================================================================

/// One property emitted by a `CustomSerialization` hook.
#[derive(Debug, Clone)]
pub struct EmittedProperty {
    pub name: String,
    pub declared: TypeDescriptor,
    pub value: Value,
}

impl EmittedProperty {
    #[must_use]
    pub fn new(name: impl Into<String>, declared: TypeDescriptor, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            declared,
            value: value.into(),
        }
    }
}

/// User-controlled property emission and construction (`Specified` mode).
///
/// Hooks must be `Send + Sync` so a registry can be shared across
/// independent serialization calls on different threads.
pub trait CustomSerialization: Send + Sync {
    /// Emit the properties to persist for `instance`, in write order.
    fn emit_properties(&self, instance: &Instance) -> Vec<EmittedProperty>;

    /// Build an instance from the properties read back.
    ///
    /// `properties` holds only stored properties this type still accepts.
    fn construct(
        &self,
        descriptor: &TypeDescriptor,
        properties: BTreeMap<String, Value>,
    ) -> Result<Instance, DriftError>;
}

// =============================================================================
// TYPE DEFINITION
// =============================================================================

/// One current property slot: name plus declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySlot {
    pub name: String,
    pub declared: TypeDescriptor,
}

impl PropertySlot {
    #[must_use]
    pub fn new(name: impl Into<String>, declared: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            declared,
        }
    }

    /// Hash of `(name, declared)`, comparable with stored definitions.
    #[must_use]
    pub fn key(&self) -> HashCode {
        slot_key(&self.name, &self.declared)
    }
}

/// The current shape of one user type.
#[derive(Clone)]
pub struct TypeDefinition {
    descriptor: TypeDescriptor,
    properties: Vec<PropertySlot>,
    custom: Option<Arc<dyn CustomSerialization>>,
}

impl TypeDefinition {
    /// Start a definition with no properties.
    #[must_use]
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor,
            properties: Vec::new(),
            custom: None,
        }
    }

    /// Append a property slot.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, declared: TypeDescriptor) -> Self {
        self.properties.push(PropertySlot::new(name, declared));
        self
    }

    /// Append a scalar property slot.
    #[must_use]
    pub fn with_primitive(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        self.with_property(name, kind.descriptor())
    }

    /// Opt into `Specified` mode.
    ///
    /// For specified types the property slots list what the type still
    /// ACCEPTS on read; the hook decides per instance what it emits.
    #[must_use]
    pub fn with_custom(mut self, hook: Arc<dyn CustomSerialization>) -> Self {
        self.custom = Some(hook);
        self
    }

    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Slots in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertySlot] {
        &self.properties
    }

    /// Find a slot by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertySlot> {
        self.properties.iter().find(|slot| slot.name == name)
    }

    /// Keys of all slots.
    #[must_use]
    pub fn slot_keys(&self) -> BTreeSet<HashCode> {
        self.properties.iter().map(PropertySlot::key).collect()
    }

    /// The custom hook, if any.
    #[must_use]
    pub fn custom(&self) -> Option<&Arc<dyn CustomSerialization>> {
        self.custom.as_ref()
    }

    /// `Specified` if a hook is attached, else `Default`.
    #[must_use]
    pub fn mode(&self) -> ConstructionMode {
        if self.custom.is_some() {
            ConstructionMode::Specified
        } else {
            ConstructionMode::Default
        }
    }

    /// A fresh instance with every slot at its default value.
    #[must_use]
    pub fn default_instance(&self) -> Instance {
        let mut instance = Instance::new(self.descriptor.clone());
        for slot in &self.properties {
            instance.set(slot.name.clone(), Value::default_for(&slot.declared));
        }
        instance
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("descriptor", &self.descriptor)
            .field("properties", &self.properties)
            .field("mode", &self.mode())
            .finish()
    }
}

/// Compile-time schema description for a Rust type.
pub trait DescribeType {
    /// The type's current definition.
    fn describe() -> TypeDefinition;
}

// =============================================================================
// REGISTRY
// =============================================================================

type TypeKey = (String, String);

fn key_of(descriptor: &TypeDescriptor) -> TypeKey {
    (descriptor.assembly().to_string(), descriptor.name().to_string())
}

/// Registered user types plus the built-in `core` types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    definitions: BTreeMap<TypeKey, Arc<TypeDefinition>>,
    enums: BTreeMap<TypeKey, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create a registry that knows only the built-in types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class type.
    pub fn register(&mut self, definition: TypeDefinition) -> Result<(), DriftError> {
        let descriptor = definition.descriptor();
        if descriptor.is_core() || descriptor.is_enum() {
            return Err(DriftError::InvalidDescriptor(format!(
                "{} cannot be registered as a class",
                descriptor
            )));
        }
        let key = key_of(descriptor);
        if self.definitions.contains_key(&key) || self.enums.contains_key(&key) {
            return Err(DriftError::DuplicateType(descriptor.to_string()));
        }
        tracing::trace!(type_name = %descriptor, mode = ?definition.mode(), "registered type");
        self.definitions.insert(key, Arc::new(definition));
        Ok(())
    }

    /// Register a type that describes itself.
    pub fn register_described<T: DescribeType>(&mut self) -> Result<(), DriftError> {
        self.register(T::describe())
    }

    /// Register an enum type.
    pub fn register_enum(&mut self, descriptor: TypeDescriptor) -> Result<(), DriftError> {
        if !descriptor.is_enum() {
            return Err(DriftError::InvalidDescriptor(format!(
                "{} is not an enum",
                descriptor
            )));
        }
        let key = key_of(&descriptor);
        if self.definitions.contains_key(&key) || self.enums.contains_key(&key) {
            return Err(DriftError::DuplicateType(descriptor.to_string()));
        }
        self.enums.insert(key, descriptor);
        Ok(())
    }

    /// Builder-style `register` for fixtures and tests.
    pub fn with(mut self, definition: TypeDefinition) -> Result<Self, DriftError> {
        self.register(definition)?;
        Ok(self)
    }

    /// The current definition of a class type.
    #[must_use]
    pub fn definition(&self, descriptor: &TypeDescriptor) -> Option<&Arc<TypeDefinition>> {
        self.definitions.get(&key_of(descriptor))
    }

    /// Number of registered user types (classes and enums).
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len() + self.enums.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Try to resolve a stored descriptor against the current types.
    ///
    /// A descriptor resolves when its assembly + type name is known and,
    /// recursively, every generic argument and enum underlying type
    /// resolves as well. A stored enum only resolves to a current enum
    /// with the same underlying type.
    #[must_use]
    pub fn resolves(&self, descriptor: &TypeDescriptor) -> bool {
        if !self.name_known(descriptor) {
            return false;
        }
        if descriptor.is_enum() {
            let underlying = descriptor.enum_underlying_type();
            let matches_current = self
                .enums
                .get(&key_of(descriptor))
                .is_some_and(|current| current.enum_underlying_type() == underlying);
            if !matches_current || !self.resolves(underlying) {
                return false;
            }
        }
        descriptor
            .generic_arguments()
            .iter()
            .all(|argument| self.resolves(argument))
    }

    fn name_known(&self, descriptor: &TypeDescriptor) -> bool {
        if descriptor.is_core() {
            return match descriptor.name() {
                ANY_TYPE_NAME => !descriptor.is_generic(),
                ARRAY_TYPE_NAME | LIST_TYPE_NAME => {
                    descriptor.is_generic() && descriptor.generic_arguments().len() == 1
                }
                name => !descriptor.is_generic() && PrimitiveKind::from_name(name).is_some(),
            };
        }
        let key = key_of(descriptor);
        if descriptor.is_enum() {
            self.enums.contains_key(&key)
        } else {
            self.definitions.contains_key(&key)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
