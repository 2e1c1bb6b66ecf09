//! # Hash Engine
//!
//! Deterministic, order-sensitive combinable hashing.
//!
//! Every identity in the format (type descriptors, property definitions,
//! property specifications) is a `HashCode` produced here, and those codes
//! are persisted to the stream. They must therefore compare equal across
//! process runs:
//! - No per-process random seeding (`std::collections::hash_map::RandomState`)
//! - No address-based hashing
//! - Element hashes come from `xxh64` with a fixed seed of 0
//!
//! Combining folds an accumulator across arguments in call order:
//!
//! ```text
//! acc = SEED
//! acc = acc * PRIME + element_hash(x)   (wrapping, for each x)
//! ```
//!
//! Nested collections recurse element by element in iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Starting accumulator for every combination.
const SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// Multiplier applied to the accumulator before each element.
const PRIME: u64 = 0x0000_0100_0000_01b3;

/// A persisted identity hash.
///
/// Equality of two hash codes is treated as equality of whatever they
/// identify. This is NOT collision resistant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HashCode(pub u64);

impl HashCode {
    /// Get the raw hash value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// =============================================================================
// STABLE HASH TRAIT
// =============================================================================

/// A value with a hash that is stable across processes.
pub trait StableHash {
    /// Compute the stable element hash of this value.
    fn stable_hash(&self) -> HashCode;
}

macro_rules! impl_stable_hash_le {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StableHash for $ty {
                fn stable_hash(&self) -> HashCode {
                    HashCode(xxh64(&self.to_le_bytes(), 0))
                }
            }
        )*
    };
}

impl_stable_hash_le!(u8, u16, u32, u64, i8, i16, i32, i64);

impl StableHash for usize {
    fn stable_hash(&self) -> HashCode {
        (*self as u64).stable_hash()
    }
}

impl StableHash for bool {
    fn stable_hash(&self) -> HashCode {
        u8::from(*self).stable_hash()
    }
}

impl StableHash for char {
    fn stable_hash(&self) -> HashCode {
        u32::from(*self).stable_hash()
    }
}

impl StableHash for f32 {
    fn stable_hash(&self) -> HashCode {
        self.to_bits().stable_hash()
    }
}

impl StableHash for f64 {
    fn stable_hash(&self) -> HashCode {
        self.to_bits().stable_hash()
    }
}

impl StableHash for str {
    fn stable_hash(&self) -> HashCode {
        HashCode(xxh64(self.as_bytes(), 0))
    }
}

impl StableHash for String {
    fn stable_hash(&self) -> HashCode {
        self.as_str().stable_hash()
    }
}

impl StableHash for HashCode {
    fn stable_hash(&self) -> HashCode {
        *self
    }
}

impl<T: StableHash> StableHash for [T] {
    fn stable_hash(&self) -> HashCode {
        self.iter()
            .fold(HashCombiner::new(), |combiner, item| combiner.add(item))
            .finish()
    }
}

impl<T: StableHash> StableHash for Vec<T> {
    fn stable_hash(&self) -> HashCode {
        self.as_slice().stable_hash()
    }
}

impl<T: StableHash> StableHash for Option<T> {
    fn stable_hash(&self) -> HashCode {
        match self {
            Some(inner) => HashCombiner::new().add(&true).add(inner).finish(),
            None => false.stable_hash(),
        }
    }
}

impl<T: StableHash + ?Sized> StableHash for &T {
    fn stable_hash(&self) -> HashCode {
        (**self).stable_hash()
    }
}

// =============================================================================
// COMBINER
// =============================================================================

/// Order-sensitive accumulator over stable element hashes.
#[derive(Debug, Clone, Copy)]
pub struct HashCombiner {
    acc: u64,
}

impl HashCombiner {
    /// Start a new combination from the fixed seed.
    #[must_use]
    pub const fn new() -> Self {
        Self { acc: SEED }
    }

    /// Fold one component into the accumulator.
    #[must_use]
    pub fn add<T: StableHash + ?Sized>(self, value: &T) -> Self {
        Self {
            acc: self
                .acc
                .wrapping_mul(PRIME)
                .wrapping_add(value.stable_hash().0),
        }
    }

    /// Finish the combination.
    #[must_use]
    pub const fn finish(self) -> HashCode {
        HashCode(self.acc)
    }
}

impl Default for HashCombiner {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine any number of `StableHash` components in call order.
///
/// ```
/// use driftgraph_core::combine_hash;
///
/// assert_eq!(combine_hash!(1, 2), combine_hash!(1, 2));
/// assert_ne!(combine_hash!(1, 2), combine_hash!(2, 1));
/// ```
#[macro_export]
macro_rules! combine_hash {
    ($($component:expr),+ $(,)?) => {
        $crate::hash::HashCombiner::new()
            $(.add(&$component))+
            .finish()
    };
}

// =============================================================================
// TESTS
// =============================================================================
