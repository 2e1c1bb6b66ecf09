//! # Stream Header
//!
//! Everything the reader must know before it can interpret the node
//! stream.
//!
//! Format:
//! - 4 bytes: Magic ("DGRF")
//! - 1 byte: Version
//! - 4 bytes: header length (u32 LE)
//! - postcard-serialized `WireHeader`
//!
//! The `WireHeader` carries three tables:
//! - types: every descriptor referenced by a node or a specification,
//!   each with its hash so corruption is detected on read. Generic
//!   arguments and enum underlying types are hash references to earlier
//!   entries, and nesting is capped at `MAX_TYPE_NESTING`
//! - specifications: unique property specifications, types by hash
//! - groups: which object ids use which specification
//!
//! ## Security
//!
//! The header length is validated against `MAX_HEADER_SIZE` BEFORE the
//! payload is allocated or parsed.

use crate::constants::{
    FORMAT_VERSION, MAGIC_BYTES, MAX_HEADER_SIZE, MAX_TYPE_NESTING, PREAMBLE_SIZE,
};
use crate::hash::HashCode;
use crate::planner::{SerializationPlan, SpecificationGroup};
use crate::schema::{PropertyDefinition, PropertySpecification};
use crate::types::{ObjectId, TypeDescriptor, TypeIdentity};
use crate::DriftError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

// =============================================================================
// PREAMBLE
// =============================================================================

/// Magic + version, the first bytes of every stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    pub magic: [u8; 4],
    pub version: u8,
}

impl Preamble {
    /// Create a preamble for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Validate magic bytes and version.
    pub fn validate(&self) -> Result<(), DriftError> {
        if &self.magic != MAGIC_BYTES {
            return Err(DriftError::Format("Invalid magic bytes".to_string()));
        }
        if self.version != FORMAT_VERSION {
            return Err(DriftError::Format(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; PREAMBLE_SIZE] {
        let mut bytes = [0u8; PREAMBLE_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; PREAMBLE_SIZE]) -> Self {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Self {
            magic,
            version: bytes[4],
        }
    }
}

impl Default for Preamble {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// WIRE TABLES
// =============================================================================

/// A type descriptor as stored. Generic arguments and the enum underlying
/// type refer by hash to entries earlier in the same table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireType {
    pub assembly: String,
    pub name: String,
    pub is_generic: bool,
    pub is_enum: bool,
    pub generic_arguments: Vec<u64>,
    pub enum_underlying: Option<u64>,
    pub hash: u64,
}

impl From<&TypeDescriptor> for WireType {
    fn from(descriptor: &TypeDescriptor) -> Self {
        Self {
            assembly: descriptor.assembly().to_string(),
            name: descriptor.name().to_string(),
            is_generic: descriptor.is_generic(),
            is_enum: descriptor.is_enum(),
            generic_arguments: descriptor
                .generic_arguments()
                .iter()
                .map(|argument| argument.hash().value())
                .collect(),
            enum_underlying: descriptor
                .is_enum()
                .then(|| descriptor.enum_underlying_type().hash().value()),
            hash: descriptor.hash().value(),
        }
    }
}

/// Flatten descriptors into a type table. Components are listed before the
/// descriptors that use them, and each hash appears once.
pub fn type_table<'a>(descriptors: impl IntoIterator<Item = &'a TypeDescriptor>) -> Vec<WireType> {
    let mut listed = BTreeSet::new();
    let mut table = Vec::new();
    for descriptor in descriptors {
        push_type(descriptor, &mut listed, &mut table);
    }
    table
}

fn push_type(descriptor: &TypeDescriptor, listed: &mut BTreeSet<HashCode>, table: &mut Vec<WireType>) {
    if listed.contains(&descriptor.hash()) {
        return;
    }
    for argument in descriptor.generic_arguments() {
        push_type(argument, listed, table);
    }
    if descriptor.is_enum() {
        push_type(descriptor.enum_underlying_type(), listed, table);
    }
    listed.insert(descriptor.hash());
    table.push(WireType::from(descriptor));
}

/// Rebuild one stored descriptor from the entries before it and check its
/// recomputed hash. Returns the descriptor and its nesting level.
fn rebuild_type(
    wire: &WireType,
    rebuilt: &BTreeMap<HashCode, (TypeDescriptor, usize)>,
) -> Result<(TypeDescriptor, usize), DriftError> {
    let component = |hash: u64| {
        rebuilt.get(&HashCode(hash)).cloned().ok_or_else(|| {
            DriftError::Format(format!(
                "type {}::{} refers to {:016x} before it is stored",
                wire.assembly, wire.name, hash
            ))
        })
    };

    let mut level = 0;
    let mut generic_arguments = Vec::with_capacity(wire.generic_arguments.len());
    for hash in &wire.generic_arguments {
        let (argument, nesting) = component(*hash)?;
        level = level.max(nesting + 1);
        generic_arguments.push(argument);
    }
    let enum_underlying = match wire.enum_underlying {
        Some(hash) => {
            let (underlying, nesting) = component(hash)?;
            level = level.max(nesting + 1);
            Some(underlying)
        }
        None => None,
    };
    if level > MAX_TYPE_NESTING {
        return Err(DriftError::Format(format!(
            "type {}::{} nests deeper than {} levels",
            wire.assembly, wire.name, MAX_TYPE_NESTING
        )));
    }

    let descriptor = TypeDescriptor::from_parts(
        wire.assembly.clone(),
        wire.name.clone(),
        wire.is_generic,
        wire.is_enum,
        generic_arguments,
        enum_underlying,
    )
    .map_err(|e| DriftError::Format(e.to_string()))?;
    if descriptor.hash().value() != wire.hash {
        return Err(DriftError::Format(format!(
            "type {} hash mismatch: stored {:016x}, computed {}",
            descriptor,
            wire.hash,
            descriptor.hash()
        )));
    }
    Ok((descriptor, level))
}

/// One stored property slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDefinition {
    pub name: String,
    pub declaring: u64,
    pub implementing: u64,
}

/// One stored property specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSpecification {
    pub declaring: u64,
    pub implementing: u64,
    pub user_defined: bool,
    pub definitions: Vec<WireDefinition>,
}

/// Objects that share one specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireGroup {
    pub specification: u32,
    pub objects: Vec<u32>,
}

/// The postcard-encoded header payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireHeader {
    pub types: Vec<WireType>,
    pub specifications: Vec<WireSpecification>,
    pub groups: Vec<WireGroup>,
}

impl From<&SerializationPlan> for WireHeader {
    fn from(plan: &SerializationPlan) -> Self {
        let types = type_table(plan.types().values());
        let specifications = plan
            .specifications()
            .iter()
            .map(|specification| WireSpecification {
                declaring: specification.object_type().declaring().hash().value(),
                implementing: specification.object_type().implementing().hash().value(),
                user_defined: specification.is_user_defined(),
                definitions: specification
                    .definitions()
                    .iter()
                    .map(|definition| WireDefinition {
                        name: definition.name().to_string(),
                        declaring: definition.identity().declaring().hash().value(),
                        implementing: definition.identity().implementing().hash().value(),
                    })
                    .collect(),
            })
            .collect();
        let groups = plan
            .groups()
            .iter()
            .map(|group| WireGroup {
                specification: group.specification,
                objects: group.objects.iter().map(|id| id.0).collect(),
            })
            .collect();
        Self {
            types,
            specifications,
            groups,
        }
    }
}

// =============================================================================
// DESERIALIZED HEADER
// =============================================================================

/// The header after validation, with types rebuilt and groups indexed.
#[derive(Debug, Clone, Default)]
pub struct DeserializedHeader {
    types: BTreeMap<HashCode, TypeDescriptor>,
    specifications: Vec<PropertySpecification>,
    groups: Vec<SpecificationGroup>,
    object_specs: BTreeMap<ObjectId, u32>,
}

impl DeserializedHeader {
    /// Validate a wire header and build the lookup tables.
    pub fn from_wire(wire: WireHeader) -> Result<Self, DriftError> {
        let mut rebuilt = BTreeMap::new();
        for wire_type in &wire.types {
            let (descriptor, level) = rebuild_type(wire_type, &rebuilt)?;
            rebuilt.insert(descriptor.hash(), (descriptor, level));
        }
        let types: BTreeMap<HashCode, TypeDescriptor> = rebuilt
            .into_iter()
            .map(|(hash, (descriptor, _))| (hash, descriptor))
            .collect();

        let lookup = |hash: u64| -> Result<TypeDescriptor, DriftError> {
            types.get(&HashCode(hash)).cloned().ok_or_else(|| {
                DriftError::Format(format!("header references unknown type {:016x}", hash))
            })
        };

        let mut specifications = Vec::with_capacity(wire.specifications.len());
        for stored in &wire.specifications {
            let definitions = stored
                .definitions
                .iter()
                .map(|definition| {
                    Ok(PropertyDefinition::new(
                        definition.name.clone(),
                        TypeIdentity::new(lookup(definition.declaring)?, lookup(definition.implementing)?),
                    ))
                })
                .collect::<Result<Vec<_>, DriftError>>()?;
            let specification = PropertySpecification::new(
                TypeIdentity::new(lookup(stored.declaring)?, lookup(stored.implementing)?),
                stored.user_defined,
                definitions,
            );
            if specification.len() != stored.definitions.len() {
                return Err(DriftError::Format(
                    "specification repeats a property definition".to_string(),
                ));
            }
            specifications.push(specification);
        }

        let mut groups = Vec::with_capacity(wire.groups.len());
        let mut object_specs = BTreeMap::new();
        for group in wire.groups {
            if group.specification as usize >= specifications.len() {
                return Err(DriftError::Format(format!(
                    "group references specification {} of {}",
                    group.specification,
                    specifications.len()
                )));
            }
            let objects: Vec<ObjectId> = group.objects.into_iter().map(ObjectId).collect();
            for id in &objects {
                if object_specs.insert(*id, group.specification).is_some() {
                    return Err(DriftError::DuplicateSpecification(*id));
                }
            }
            groups.push(SpecificationGroup {
                specification: group.specification,
                objects,
            });
        }

        Ok(Self {
            types,
            specifications,
            groups,
            object_specs,
        })
    }

    /// All stored descriptors, by hash.
    #[must_use]
    pub fn types(&self) -> &BTreeMap<HashCode, TypeDescriptor> {
        &self.types
    }

    /// The descriptor for a node's type hash.
    pub fn type_of(&self, hash: HashCode) -> Result<&TypeDescriptor, DriftError> {
        self.types
            .get(&hash)
            .ok_or_else(|| DriftError::Format(format!("node references unknown type {}", hash)))
    }

    #[must_use]
    pub fn specifications(&self) -> &[PropertySpecification] {
        &self.specifications
    }

    /// A specification by table index.
    pub fn specification(&self, index: u32) -> Result<&PropertySpecification, DriftError> {
        self.specifications.get(index as usize).ok_or_else(|| {
            DriftError::Format(format!("specification index {} out of range", index))
        })
    }

    #[must_use]
    pub fn groups(&self) -> &[SpecificationGroup] {
        &self.groups
    }

    /// The specification index recorded for an object id.
    #[must_use]
    pub fn specification_of(&self, id: ObjectId) -> Option<u32> {
        self.object_specs.get(&id).copied()
    }

    /// Number of objects the header declares.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.object_specs.len()
    }
}

// =============================================================================
// READ / WRITE
// =============================================================================

/// Write preamble and header for a plan.
pub fn write_header(writer: &mut dyn Write, plan: &SerializationPlan) -> Result<(), DriftError> {
    let payload = postcard::to_stdvec(&WireHeader::from(plan))
        .map_err(|e| DriftError::SerializationError(e.to_string()))?;
    if payload.len() > MAX_HEADER_SIZE {
        return Err(DriftError::SerializationError(format!(
            "header size {} bytes exceeds maximum allowed {} bytes",
            payload.len(),
            MAX_HEADER_SIZE
        )));
    }

    writer.write_all(&Preamble::new().to_bytes())?;
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    tracing::trace!(bytes = payload.len(), "header written");
    Ok(())
}

/// Read and validate preamble and header.
pub fn read_header(reader: &mut dyn Read) -> Result<DeserializedHeader, DriftError> {
    let mut preamble = [0u8; PREAMBLE_SIZE];
    reader.read_exact(&mut preamble)?;
    Preamble::from_bytes(preamble).validate()?;

    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let len = u32::from_le_bytes(len) as usize;
    if len > MAX_HEADER_SIZE {
        return Err(DriftError::Format(format!(
            "Header size {} bytes exceeds maximum allowed {} bytes",
            len, MAX_HEADER_SIZE
        )));
    }

    let mut payload = Vec::new();
    reader.take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != len {
        return Err(DriftError::Format("truncated header".to_string()));
    }
    let wire: WireHeader = postcard::from_bytes(&payload)
        .map_err(|e| DriftError::Format(format!("Failed to decode header: {}", e)))?;

    let header = DeserializedHeader::from_wire(wire)?;
    tracing::trace!(
        types = header.types.len(),
        specifications = header.specifications.len(),
        objects = header.object_specs.len(),
        "header read"
    );
    Ok(header)
}

// =============================================================================
// TESTS
// =============================================================================
