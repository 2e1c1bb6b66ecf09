//! # driftgraph-core
//!
//! Schema-tolerant binary serializer for object graphs - THE LOGIC.
//!
//! A graph of objects, primitives and collections is written as a
//! self-describing byte stream:
//! - shared objects are written once and referenced afterwards
//! - cycles terminate through the same reference mechanism
//! - every object type's property schema is stored once per group of
//!   objects that share it
//!
//! On read, the stored schemas are compared against the types registered
//! in the current process. Types that disappeared decode to null,
//! properties that were removed are skipped, properties that were added
//! keep their default, and a `Manifest` reports all of it.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - Deterministic: same graph + same registry = same bytes
//! - Structural damage is an error; schema drift is data

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod constants;
pub mod decoder;
pub mod encoder;
pub mod formats;
pub mod graph;
pub mod hash;
pub mod manifest;
pub mod node;
pub mod planner;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod serializer;
pub mod types;
pub mod value;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use hash::{HashCode, HashCombiner, StableHash};
pub use types::{
    CollectionKind, ConstructionMode, DriftError, ObjectId, TypeDescriptor, TypeIdentity,
};
pub use value::{Collection, EnumValue, Primitive, PrimitiveArray, PrimitiveKind, Value};

// =============================================================================
// RE-EXPORTS: Graph and Schema
// =============================================================================

pub use graph::{Instance, ObjectGraph, ObjectHandle};
pub use registry::{
    CustomSerialization, DescribeType, EmittedProperty, PropertySlot, TypeDefinition,
    TypeRegistry,
};
pub use schema::{PropertyDefinition, PropertySpecification};

// =============================================================================
// RE-EXPORTS: Codec
// =============================================================================

pub use config::SerializerConfig;
pub use decoder::{Decoded, ScannedNode, scan};
pub use manifest::{Manifest, ManifestEntry, ObjectCounts};
pub use node::{NodePayload, NodeTag, SerializedNode};
pub use planner::{Planner, SerializationPlan, SpecificationGroup};
pub use resolver::{Classification, ModifiedObject, Resolution, SpecificationResolution};
pub use serializer::{Serializer, from_bytes, read_graph, to_bytes, write_graph};
