//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the codec:
//! - Identifiers (`ObjectId`)
//! - Wire enumerations (`ConstructionMode`, `CollectionKind`)
//! - The type identity model (`TypeDescriptor`, `TypeIdentity`)
//! - Error types (`DriftError`)
//!
//! ## Error Philosophy
//!
//! Structural damage (bad tag, truncated stream, corrupt header) is fatal
//! because stream position can no longer be trusted. Type and schema drift
//! is never an error: it is reported as `Missing`/`Modified` data by the
//! resolver.

mod descriptor;

pub use descriptor::{TypeDescriptor, TypeIdentity};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of an object within ONE serialize/deserialize call.
///
/// Assigned densely from 0 in first-visit order. Not meaningful outside
/// the call that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

// =============================================================================
// WIRE ENUMERATIONS
// =============================================================================

/// How an object is constructed and which properties it emits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ConstructionMode {
    /// Properties come from the registered type definition.
    #[default]
    Default = 0,
    /// The type's own hook emits properties and constructs instances.
    Specified = 1,
}

impl TryFrom<u8> for ConstructionMode {
    type Error = DriftError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Default),
            1 => Ok(Self::Specified),
            other => Err(DriftError::Format(format!(
                "unknown construction mode byte {:#04x}",
                other
            ))),
        }
    }
}

/// Shape of a collection node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CollectionKind {
    /// Fixed size: the reader pre-sizes its buffer.
    Array = 0,
    /// Growable: the reader appends incrementally.
    List = 1,
}

impl TryFrom<u8> for CollectionKind {
    type Error = DriftError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Array),
            1 => Ok(Self::List),
            other => Err(DriftError::Format(format!(
                "unknown collection kind byte {:#04x}",
                other
            ))),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while encoding or decoding a graph.
///
/// - No silent failures
/// - Use `Result<T, DriftError>` for fallible operations
/// - The library never panics on malformed input
#[derive(Debug, Error)]
pub enum DriftError {
    /// The byte stream violates the format (bad tag, truncation, bad header).
    #[error("Format error: {0}")]
    Format(String),

    /// Two header groups claim the same object id.
    #[error("Duplicate property specification for object {0:?}")]
    DuplicateSpecification(ObjectId),

    /// No usable constructor exists for the object's recorded mode.
    #[error("Cannot construct object {object:?} of type {type_name} in {mode:?} mode: {reason}")]
    Construction {
        object: ObjectId,
        type_name: String,
        mode: ConstructionMode,
        reason: String,
    },

    /// A type descriptor was built from inconsistent parts.
    #[error("Invalid type descriptor: {0}")]
    InvalidDescriptor(String),

    /// The writer met an instance whose type it does not know.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A type was registered twice.
    #[error("Duplicate type registration: {0}")]
    DuplicateType(String),

    /// An object handle does not point into the graph arena.
    #[error("Invalid object handle: {0}")]
    InvalidHandle(usize),

    /// Planning or decoding exceeded the configured depth limit.
    #[error("Graph depth exceeds limit of {0}")]
    DepthExceeded(usize),

    /// The manifest was requested before any deserialization.
    #[error("No deserialization has run; manifest unavailable")]
    NoDeserialization,

    /// Header encoding failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for DriftError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Format("truncated stream".to_string())
        } else {
            Self::IoError(error.to_string())
        }
    }
}

impl DriftError {
    /// True for errors that mean the byte stream itself is damaged.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Format(_) | Self::DuplicateSpecification(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
