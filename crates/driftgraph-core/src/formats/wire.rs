//! # Node Wire Codec
//!
//! Every node starts with the same 10-byte head:
//!
//! ```text
//! [tag u8][mode u8][type hash u64 LE]
//! ```
//!
//! followed by a tag-specific payload:
//! - `Null`, `NullPrimitive`: nothing
//! - `Primitive`: formatter bytes for the head's type
//! - `Object`: `[id u32][specification index u32]`
//! - `Reference`: `[id u32]`
//! - `Collection`: `[kind u8][element type hash u64][count u32]`
//!
//! Children of objects and collections follow as separate nodes.

use crate::constants::MAX_COLLECTION_LENGTH;
use crate::formats::formatter::FormatterCache;
use crate::formats::header::DeserializedHeader;
use crate::hash::HashCode;
use crate::node::{NodePayload, NodeTag, SerializedNode};
use crate::types::{CollectionKind, ConstructionMode, ObjectId};
use crate::DriftError;
use std::io::{Read, Write};

fn read_array<const N: usize>(reader: &mut dyn Read) -> Result<[u8; N], DriftError> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u8(reader: &mut dyn Read) -> Result<u8, DriftError> {
    Ok(read_array::<1>(reader)?[0])
}

fn read_u32(reader: &mut dyn Read) -> Result<u32, DriftError> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

fn read_u64(reader: &mut dyn Read) -> Result<u64, DriftError> {
    Ok(u64::from_le_bytes(read_array(reader)?))
}

/// Write one node (head plus payload, no children).
pub fn write_node(
    writer: &mut dyn Write,
    node: &SerializedNode,
    formatters: &mut FormatterCache,
) -> Result<(), DriftError> {
    let mut head = [0u8; 10];
    head[0] = node.tag() as u8;
    head[1] = node.mode as u8;
    head[2..10].copy_from_slice(&node.type_hash.value().to_le_bytes());
    writer.write_all(&head)?;

    match &node.payload {
        NodePayload::Null | NodePayload::NullPrimitive => {}
        NodePayload::Primitive(primitive) => {
            formatters
                .formatter(&primitive.descriptor())?
                .write(writer, primitive)?;
        }
        NodePayload::Object { id, specification } => {
            writer.write_all(&id.0.to_le_bytes())?;
            writer.write_all(&specification.to_le_bytes())?;
        }
        NodePayload::Reference(id) => writer.write_all(&id.0.to_le_bytes())?,
        NodePayload::Collection {
            kind,
            count,
            element_type,
        } => {
            writer.write_all(&[*kind as u8])?;
            writer.write_all(&element_type.value().to_le_bytes())?;
            writer.write_all(&count.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Read one node (head plus payload, no children).
///
/// Primitive payloads are decoded with the formatter of the type the head
/// names, looked up in the stream's header.
pub fn read_node(
    reader: &mut dyn Read,
    header: &DeserializedHeader,
    formatters: &mut FormatterCache,
) -> Result<SerializedNode, DriftError> {
    let tag = NodeTag::try_from(read_u8(reader)?)?;
    let mode = ConstructionMode::try_from(read_u8(reader)?)?;
    let type_hash = HashCode(read_u64(reader)?);

    let payload = match tag {
        NodeTag::Null => NodePayload::Null,
        NodeTag::NullPrimitive => NodePayload::NullPrimitive,
        NodeTag::Primitive => {
            let descriptor = header.type_of(type_hash)?;
            NodePayload::Primitive(formatters.formatter(descriptor)?.read(reader)?)
        }
        NodeTag::Object => NodePayload::Object {
            id: ObjectId(read_u32(reader)?),
            specification: read_u32(reader)?,
        },
        NodeTag::Reference => NodePayload::Reference(ObjectId(read_u32(reader)?)),
        NodeTag::Collection => {
            let kind = CollectionKind::try_from(read_u8(reader)?)?;
            let element_type = HashCode(read_u64(reader)?);
            let count = read_u32(reader)?;
            if count as usize > MAX_COLLECTION_LENGTH {
                return Err(DriftError::Format(format!(
                    "collection length {} exceeds maximum {}",
                    count, MAX_COLLECTION_LENGTH
                )));
            }
            NodePayload::Collection {
                kind,
                count,
                element_type,
            }
        }
    };

    Ok(SerializedNode {
        mode,
        type_hash,
        payload,
    })
}
