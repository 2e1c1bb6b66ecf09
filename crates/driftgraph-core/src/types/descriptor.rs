//! # Type Identity Model
//!
//! Canonical, hashable descriptors for declared and runtime types.
//!
//! A `TypeDescriptor` names a type by assembly + type name plus its generic
//! and enum structure. A `TypeIdentity` pairs the statically declared type
//! of a slot with the type actually written into it, so polymorphic slots
//! (an `object` property holding a `Customer`) keep both.
//!
//! ## Hash-as-Equality
//!
//! Both types compute their hash once, at construction, and compare by that
//! hash alone. Two descriptors with colliding hashes ARE equal as far as
//! this crate is concerned; there is no structural fallback comparison.

use crate::constants::{ANY_TYPE_NAME, ARRAY_TYPE_NAME, CORE_ASSEMBLY, LIST_TYPE_NAME};
use crate::hash::{HashCode, StableHash};
use crate::value::PrimitiveKind;
use crate::{DriftError, combine_hash};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static EMPTY: LazyLock<TypeDescriptor> = LazyLock::new(|| TypeDescriptor::plain("", ""));

// =============================================================================
// TYPE DESCRIPTOR
// =============================================================================

/// Canonical, immutable description of one type.
#[derive(Clone)]
pub struct TypeDescriptor {
    assembly: String,
    name: String,
    is_generic: bool,
    is_enum: bool,
    generic_arguments: Vec<TypeDescriptor>,
    enum_underlying: Option<Box<TypeDescriptor>>,
    hash: HashCode,
}

impl TypeDescriptor {
    /// Create a non-generic, non-enum descriptor.
    #[must_use]
    pub fn new(assembly: impl Into<String>, name: impl Into<String>) -> Self {
        Self::plain(assembly, name)
    }

    /// Create a closed generic descriptor, e.g. `Pair<i32, string>`.
    #[must_use]
    pub fn generic(
        assembly: impl Into<String>,
        name: impl Into<String>,
        arguments: Vec<TypeDescriptor>,
    ) -> Self {
        Self::build(assembly.into(), name.into(), true, false, arguments, None)
    }

    /// Create an enum descriptor.
    ///
    /// The underlying type must be an integral primitive (`core::u8`,
    /// `core::i32`, ...). Anything else is a caller bug and is rejected with
    /// `DriftError::InvalidDescriptor`.
    pub fn enumeration(
        assembly: impl Into<String>,
        name: impl Into<String>,
        underlying: Option<TypeDescriptor>,
    ) -> Result<Self, DriftError> {
        let assembly = assembly.into();
        let name = name.into();
        check_underlying(&assembly, &name, underlying.as_ref())?;
        Ok(Self::build(
            assembly,
            name,
            false,
            true,
            Vec::new(),
            underlying.map(Box::new),
        ))
    }

    /// Reassemble a descriptor from its raw parts (header decoding).
    pub(crate) fn from_parts(
        assembly: String,
        name: String,
        is_generic: bool,
        is_enum: bool,
        generic_arguments: Vec<TypeDescriptor>,
        enum_underlying: Option<TypeDescriptor>,
    ) -> Result<Self, DriftError> {
        if is_enum {
            check_underlying(&assembly, &name, enum_underlying.as_ref())?;
        }
        Ok(Self::build(
            assembly,
            name,
            is_generic,
            is_enum,
            generic_arguments,
            enum_underlying.filter(|_| is_enum).map(Box::new),
        ))
    }

    /// The `Empty` sentinel (underlying type of every non-enum).
    #[must_use]
    pub fn empty() -> &'static TypeDescriptor {
        &EMPTY
    }

    /// Descriptor of an untyped slot (`core::object`).
    #[must_use]
    pub fn any() -> Self {
        Self::plain(CORE_ASSEMBLY, ANY_TYPE_NAME)
    }

    /// Descriptor of a fixed-size array of `element`.
    #[must_use]
    pub fn array_of(element: TypeDescriptor) -> Self {
        Self::generic(CORE_ASSEMBLY, ARRAY_TYPE_NAME, vec![element])
    }

    /// Descriptor of a growable list of `element`.
    #[must_use]
    pub fn list_of(element: TypeDescriptor) -> Self {
        Self::generic(CORE_ASSEMBLY, LIST_TYPE_NAME, vec![element])
    }

    fn plain(assembly: impl Into<String>, name: impl Into<String>) -> Self {
        Self::build(assembly.into(), name.into(), false, false, Vec::new(), None)
    }

    fn build(
        assembly: String,
        name: String,
        is_generic: bool,
        is_enum: bool,
        generic_arguments: Vec<TypeDescriptor>,
        enum_underlying: Option<Box<TypeDescriptor>>,
    ) -> Self {
        let mut hash = combine_hash!(assembly, name, is_generic, is_enum, generic_arguments);
        if let Some(underlying) = &enum_underlying {
            hash = combine_hash!(hash, underlying.hash);
        }
        Self {
            assembly,
            name,
            is_generic,
            is_enum,
            generic_arguments,
            enum_underlying,
            hash,
        }
    }

    /// The owning assembly (module) name.
    #[must_use]
    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    /// The type name, without generic arguments.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.is_generic
    }

    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.is_enum
    }

    /// Generic arguments in declaration order.
    #[must_use]
    pub fn generic_arguments(&self) -> &[TypeDescriptor] {
        &self.generic_arguments
    }

    /// The enum's underlying type, or the `Empty` sentinel.
    #[must_use]
    pub fn enum_underlying_type(&self) -> &TypeDescriptor {
        self.enum_underlying.as_deref().unwrap_or(Self::empty())
    }

    /// True for the `Empty` sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assembly.is_empty() && self.name.is_empty()
    }

    /// True if this descriptor lives in the built-in `core` assembly.
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.assembly == CORE_ASSEMBLY
    }

    /// The cached identity hash.
    #[must_use]
    pub fn hash(&self) -> HashCode {
        self.hash
    }
}

impl StableHash for TypeDescriptor {
    fn stable_hash(&self) -> HashCode {
        self.hash
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for TypeDescriptor {}

impl PartialOrd for TypeDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hash.cmp(&other.hash)
    }
}

impl std::hash::Hash for TypeDescriptor {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<empty>");
        }
        write!(f, "{}::{}", self.assembly, self.name)?;
        if !self.generic_arguments.is_empty() {
            f.write_str("<")?;
            for (i, argument) in self.generic_arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", argument)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeDescriptor({} #{})", self, self.hash)
    }
}

// =============================================================================
// TYPE IDENTITY
// =============================================================================

/// Declared vs. implementing type of one graph position.
#[derive(Clone)]
pub struct TypeIdentity {
    declaring: TypeDescriptor,
    implementing: TypeDescriptor,
    hash: HashCode,
}

impl TypeIdentity {
    /// Pair a declared type with the runtime type written into it.
    #[must_use]
    pub fn new(declaring: TypeDescriptor, implementing: TypeDescriptor) -> Self {
        let hash = combine_hash!(declaring.hash(), implementing.hash());
        Self {
            declaring,
            implementing,
            hash,
        }
    }

    /// Identity of a monomorphic slot (declared == implementing).
    #[must_use]
    pub fn exact(descriptor: TypeDescriptor) -> Self {
        Self::new(descriptor.clone(), descriptor)
    }

    /// The statically declared type.
    #[must_use]
    pub fn declaring(&self) -> &TypeDescriptor {
        &self.declaring
    }

    /// The runtime type actually written.
    #[must_use]
    pub fn implementing(&self) -> &TypeDescriptor {
        &self.implementing
    }

    /// True if the runtime type differs from the declared one.
    #[must_use]
    pub fn is_polymorphic(&self) -> bool {
        self.declaring != self.implementing
    }

    #[must_use]
    pub fn hash(&self) -> HashCode {
        self.hash
    }
}

impl StableHash for TypeIdentity {
    fn stable_hash(&self) -> HashCode {
        self.hash
    }
}

impl PartialEq for TypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for TypeIdentity {}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_polymorphic() {
            write!(f, "TypeIdentity({} as {})", self.implementing, self.declaring)
        } else {
            write!(f, "TypeIdentity({})", self.implementing)
        }
    }
}

/// An enum must sit on an integral primitive.
fn check_underlying(
    assembly: &str,
    name: &str,
    underlying: Option<&TypeDescriptor>,
) -> Result<(), DriftError> {
    let Some(underlying) = underlying else {
        return Err(DriftError::InvalidDescriptor(format!(
            "enum {}::{} has no underlying type",
            assembly, name
        )));
    };
    if !PrimitiveKind::of(underlying).is_some_and(PrimitiveKind::is_integral) {
        return Err(DriftError::InvalidDescriptor(format!(
            "enum {}::{} has non-integral underlying type {}",
            assembly, name, underlying
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn int32() -> TypeDescriptor {
        TypeDescriptor::new(CORE_ASSEMBLY, "i32")
    }

    #[test]
    fn same_parts_same_hash() {
        let a = TypeDescriptor::new("app", "Customer");
        let b = TypeDescriptor::new("app", "Customer");
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn assembly_participates_in_identity() {
        let a = TypeDescriptor::new("app.v1", "Customer");
        let b = TypeDescriptor::new("app.v2", "Customer");
        assert_ne!(a, b);
    }

    #[test]
    fn generic_argument_order_matters() {
        let string = TypeDescriptor::new(CORE_ASSEMBLY, "string");
        let a = TypeDescriptor::generic("app", "Pair", vec![int32(), string.clone()]);
        let b = TypeDescriptor::generic("app", "Pair", vec![string, int32()]);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "app::Pair<core::i32, core::string>");
    }

    #[test]
    fn generic_flag_distinguishes_open_name() {
        let plain = TypeDescriptor::new("app", "Box");
        let generic = TypeDescriptor::generic("app", "Box", Vec::new());
        assert_ne!(plain, generic);
    }

    #[test]
    fn enum_requires_underlying_type() {
        let result = TypeDescriptor::enumeration("app", "Color", None);
        assert!(matches!(result, Err(DriftError::InvalidDescriptor(_))));

        let empty = TypeDescriptor::empty().clone();
        let result = TypeDescriptor::enumeration("app", "Color", Some(empty));
        assert!(matches!(result, Err(DriftError::InvalidDescriptor(_))));
    }

    #[test]
    fn enum_underlying_type_must_be_integral() {
        for underlying in ["string", "f64", "bool", "char"] {
            let result = TypeDescriptor::enumeration(
                "app",
                "Color",
                Some(TypeDescriptor::new(CORE_ASSEMBLY, underlying)),
            );
            assert!(
                matches!(result, Err(DriftError::InvalidDescriptor(_))),
                "{} accepted",
                underlying
            );
        }

        let custom = TypeDescriptor::new("app", "Shade");
        let result = TypeDescriptor::enumeration("app", "Color", Some(custom));
        assert!(matches!(result, Err(DriftError::InvalidDescriptor(_))));

        let result = TypeDescriptor::from_parts(
            "app".to_string(),
            "Color".to_string(),
            false,
            true,
            Vec::new(),
            Some(TypeDescriptor::new(CORE_ASSEMBLY, "string")),
        );
        assert!(matches!(result, Err(DriftError::InvalidDescriptor(_))));
    }

    #[test]
    fn enum_underlying_type_folds_into_hash() {
        let narrow = TypeDescriptor::enumeration("app", "Color", Some(int32())).expect("enum");
        let wide = TypeDescriptor::enumeration(
            "app",
            "Color",
            Some(TypeDescriptor::new(CORE_ASSEMBLY, "i64")),
        )
        .expect("enum");
        assert_ne!(narrow, wide);
        assert_eq!(narrow.enum_underlying_type(), &int32());
    }

    #[test]
    fn non_enum_underlying_is_empty_sentinel() {
        let plain = TypeDescriptor::new("app", "Customer");
        assert!(plain.enum_underlying_type().is_empty());
    }

    #[test]
    fn identity_is_order_sensitive() {
        let base = TypeDescriptor::new("app", "Shape");
        let circle = TypeDescriptor::new("app", "Circle");
        let up = TypeIdentity::new(base.clone(), circle.clone());
        let down = TypeIdentity::new(circle, base);
        assert_ne!(up, down);
        assert!(up.is_polymorphic());
        assert!(!TypeIdentity::exact(int32()).is_polymorphic());
    }

    #[test]
    fn collection_descriptors_distinct() {
        assert_ne!(
            TypeDescriptor::array_of(int32()),
            TypeDescriptor::list_of(int32())
        );
    }
}
