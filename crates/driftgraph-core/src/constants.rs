//! # Format Constants
//!
//! Hardcoded wire-format constants and decoding limits.
//!
//! These values are compiled into the binary and are part of the format
//! contract: changing any of the byte-level constants requires a
//! `FORMAT_VERSION` bump.

/// Magic bytes at the start of every serialized unit.
pub const MAGIC_BYTES: &[u8; 4] = b"DGRF";

/// Current serialization format version.
///
/// Increment this when making breaking changes to the wire layout.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the fixed preamble (magic + version).
pub const PREAMBLE_SIZE: usize = 5;

/// Assembly name used for every built-in type descriptor.
pub const CORE_ASSEMBLY: &str = "core";

/// Type name of the untyped slot descriptor (`object`).
pub const ANY_TYPE_NAME: &str = "object";

/// Type name of the fixed-size array descriptor (`T[]`).
pub const ARRAY_TYPE_NAME: &str = "[]";

/// Type name of the growable list descriptor (`List<T>`).
pub const LIST_TYPE_NAME: &str = "List";

/// Default depth limit for planning and decoding.
///
/// Graph depth, not graph size: a cycle never counts because the second
/// visit is a reference.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

// =============================================================================
// DECODING LIMITS
// =============================================================================

/// Maximum encoded header size (16 MB).
///
/// Validated BEFORE the header buffer is allocated.
pub const MAX_HEADER_SIZE: usize = 16 * 1024 * 1024;

/// Maximum nesting of a stored type descriptor (generic arguments and
/// enum underlying types count one level each).
pub const MAX_TYPE_NESTING: usize = 64;

/// Maximum element count of a primitive array payload.
pub const MAX_ARRAY_LENGTH: usize = 64 * 1024 * 1024;

/// Maximum byte length of a single string payload.
pub const MAX_STRING_LENGTH: usize = 64 * 1024 * 1024;

/// Maximum element count of a collection node.
pub const MAX_COLLECTION_LENGTH: usize = 16 * 1024 * 1024;

/// Upper bound on up-front allocation for fixed-size collections.
///
/// Arrays pre-size their buffer from the recorded count, capped here so a
/// corrupted count cannot trigger a huge allocation before any element is
/// actually read.
pub const MAX_COLLECTION_PREALLOC: usize = 4096;
