//! # Value Model
//!
//! The dynamic values that populate an object graph.
//!
//! A `Value` occupies one graph position: a property slot, a collection
//! element, or the root. Objects are never stored inline; a `Value::Object`
//! holds an `ObjectHandle` into the owning `ObjectGraph` arena so that
//! sharing and cycles are expressed by handle equality.

use crate::constants::{ARRAY_TYPE_NAME, CORE_ASSEMBLY};
use crate::graph::ObjectHandle;
use crate::types::{CollectionKind, TypeDescriptor};

// =============================================================================
// PRIMITIVE KINDS
// =============================================================================

/// The built-in scalar types understood by the formatter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
}

impl PrimitiveKind {
    /// Every kind, in a fixed order.
    pub const ALL: [PrimitiveKind; 13] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
        Self::Char,
        Self::String,
    ];

    /// The type name used in the `core` assembly.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Char => "char",
            Self::String => "string",
        }
    }

    /// Look up a kind by its `core` type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The kind a descriptor names, if it is a built-in scalar.
    #[must_use]
    pub fn of(descriptor: &TypeDescriptor) -> Option<Self> {
        if descriptor.is_core() && !descriptor.is_generic() {
            Self::from_name(descriptor.name())
        } else {
            None
        }
    }

    /// True for kinds that may back an enum.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }

    /// The canonical descriptor of this kind.
    #[must_use]
    pub fn descriptor(self) -> TypeDescriptor {
        TypeDescriptor::new(CORE_ASSEMBLY, self.name())
    }

    /// The zero value of this kind.
    #[must_use]
    pub fn zero(self) -> Primitive {
        match self {
            Self::Bool => Primitive::Bool(false),
            Self::I8 => Primitive::I8(0),
            Self::I16 => Primitive::I16(0),
            Self::I32 => Primitive::I32(0),
            Self::I64 => Primitive::I64(0),
            Self::U8 => Primitive::U8(0),
            Self::U16 => Primitive::U16(0),
            Self::U32 => Primitive::U32(0),
            Self::U64 => Primitive::U64(0),
            Self::F32 => Primitive::F32(0.0),
            Self::F64 => Primitive::F64(0.0),
            Self::Char => Primitive::Char('\0'),
            Self::String => Primitive::String(String::new()),
        }
    }
}

/// If `descriptor` is `core::[]<scalar>`, the scalar kind.
#[must_use]
pub fn primitive_array_kind(descriptor: &TypeDescriptor) -> Option<PrimitiveKind> {
    match descriptor.generic_arguments() {
        [element] if descriptor.is_core() && descriptor.name() == ARRAY_TYPE_NAME => {
            PrimitiveKind::of(element)
        }
        _ => None,
    }
}

/// True if values of this declared type are written by a formatter.
///
/// A null in such a slot becomes a `NullPrimitive` node.
#[must_use]
pub fn is_primitive_type(descriptor: &TypeDescriptor) -> bool {
    PrimitiveKind::of(descriptor).is_some()
        || descriptor.is_enum()
        || primitive_array_kind(descriptor).is_some()
}

// =============================================================================
// PRIMITIVE VALUES
// =============================================================================

/// A value of an enum type, carried as its integral value.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    descriptor: TypeDescriptor,
    value: i64,
}

impl EnumValue {
    /// Create an enum value. `descriptor` must be an enum descriptor.
    #[must_use]
    pub fn new(descriptor: TypeDescriptor, value: i64) -> Self {
        Self { descriptor, value }
    }

    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    #[must_use]
    pub fn value(&self) -> i64 {
        self.value
    }
}

/// A contiguous array of one scalar kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Char(Vec<char>),
    String(Vec<String>),
}

impl PrimitiveArray {
    /// The element kind.
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::I8(_) => PrimitiveKind::I8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::U8(_) => PrimitiveKind::U8,
            Self::U16(_) => PrimitiveKind::U16,
            Self::U32(_) => PrimitiveKind::U32,
            Self::U64(_) => PrimitiveKind::U64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
            Self::Char(_) => PrimitiveKind::Char,
            Self::String(_) => PrimitiveKind::String,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Char(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value written by a formatter rather than as an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    Enum(EnumValue),
    Array(PrimitiveArray),
}

impl Primitive {
    /// The runtime type of this value.
    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        match self {
            Self::Enum(value) => value.descriptor.clone(),
            Self::Array(array) => TypeDescriptor::array_of(array.kind().descriptor()),
            scalar => scalar.scalar_kind().map_or_else(TypeDescriptor::any, PrimitiveKind::descriptor),
        }
    }

    /// The scalar kind, for non-enum non-array values.
    #[must_use]
    pub fn scalar_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Bool(_) => Some(PrimitiveKind::Bool),
            Self::I8(_) => Some(PrimitiveKind::I8),
            Self::I16(_) => Some(PrimitiveKind::I16),
            Self::I32(_) => Some(PrimitiveKind::I32),
            Self::I64(_) => Some(PrimitiveKind::I64),
            Self::U8(_) => Some(PrimitiveKind::U8),
            Self::U16(_) => Some(PrimitiveKind::U16),
            Self::U32(_) => Some(PrimitiveKind::U32),
            Self::U64(_) => Some(PrimitiveKind::U64),
            Self::F32(_) => Some(PrimitiveKind::F32),
            Self::F64(_) => Some(PrimitiveKind::F64),
            Self::Char(_) => Some(PrimitiveKind::Char),
            Self::String(_) => Some(PrimitiveKind::String),
            Self::Enum(_) | Self::Array(_) => None,
        }
    }
}

macro_rules! impl_primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }

            impl From<Vec<$ty>> for Primitive {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Array(PrimitiveArray::$variant(values))
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Primitive(Primitive::$variant(value))
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(values: Vec<$ty>) -> Self {
                    Self::Primitive(Primitive::Array(PrimitiveArray::$variant(values)))
                }
            }
        )*
    };
}

impl_primitive_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    char => Char,
    String => String,
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Primitive(Primitive::String(value.to_string()))
    }
}

impl From<EnumValue> for Value {
    fn from(value: EnumValue) -> Self {
        Self::Primitive(Primitive::Enum(value))
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// An ordered array or list of values sharing a declared element type.
///
/// Elements may be heterogeneous (polymorphic objects, nulls, primitives).
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    kind: CollectionKind,
    element_type: TypeDescriptor,
    items: Vec<Value>,
}

impl Collection {
    /// Create a collection of the given kind.
    #[must_use]
    pub fn new(kind: CollectionKind, element_type: TypeDescriptor, items: Vec<Value>) -> Self {
        Self {
            kind,
            element_type,
            items,
        }
    }

    /// Create a fixed-size array.
    #[must_use]
    pub fn array(element_type: TypeDescriptor, items: Vec<Value>) -> Self {
        Self::new(CollectionKind::Array, element_type, items)
    }

    /// Create a growable list.
    #[must_use]
    pub fn list(element_type: TypeDescriptor, items: Vec<Value>) -> Self {
        Self::new(CollectionKind::List, element_type, items)
    }

    #[must_use]
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// The declared type of every element slot.
    #[must_use]
    pub fn element_type(&self) -> &TypeDescriptor {
        &self.element_type
    }

    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn push(&mut self, item: Value) {
        self.items.push(item);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The runtime type of the collection itself.
    #[must_use]
    pub fn descriptor(&self) -> TypeDescriptor {
        match self.kind {
            CollectionKind::Array => TypeDescriptor::array_of(self.element_type.clone()),
            CollectionKind::List => TypeDescriptor::list_of(self.element_type.clone()),
        }
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// One graph position.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Primitive(Primitive),
    Object(ObjectHandle),
    Collection(Collection),
}

impl Value {
    /// The default/zero value of a slot declared as `declared`.
    ///
    /// Scalars get their zero, enums get discriminant 0, everything else
    /// (objects, collections, primitive arrays) is null.
    #[must_use]
    pub fn default_for(declared: &TypeDescriptor) -> Self {
        if let Some(kind) = PrimitiveKind::of(declared) {
            Self::Primitive(kind.zero())
        } else if declared.is_enum() {
            Self::Primitive(Primitive::Enum(EnumValue::new(declared.clone(), 0)))
        } else {
            Self::Null
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The referenced object handle, if this is an object value.
    #[must_use]
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            Self::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// The string payload, if this is a string primitive.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Primitive(Primitive::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<Primitive> for Value {
    fn from(value: Primitive) -> Self {
        Self::Primitive(value)
    }
}

impl From<Collection> for Value {
    fn from(value: Collection) -> Self {
        Self::Collection(value)
    }
}

impl From<ObjectHandle> for Value {
    fn from(value: ObjectHandle) -> Self {
        Self::Object(value)
    }
}

// =============================================================================
// TESTS
// =============================================================================
