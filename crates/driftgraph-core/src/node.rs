//! # Node Model
//!
//! Tagged-union wire representation of one graph position.
//!
//! The node stream is the pre-order traversal of the graph: an `Object`
//! node is followed by one child node per property of its specification,
//! a `Collection` node by one child node per element. Nothing else has
//! children. Order is part of the format contract.

use crate::hash::HashCode;
use crate::types::{CollectionKind, ConstructionMode, ObjectId};
use crate::value::Primitive;
use crate::DriftError;
use std::fmt;

/// Discriminant byte of a node.
///
/// This is the ONLY tag mapping; encoder, decoder and diagnostics all go
/// through `as u8` / `TryFrom<u8>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum NodeTag {
    Null = 0,
    NullPrimitive = 1,
    Primitive = 2,
    Object = 3,
    Reference = 4,
    Collection = 5,
}

impl TryFrom<u8> for NodeTag {
    type Error = DriftError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::Null),
            1 => Ok(Self::NullPrimitive),
            2 => Ok(Self::Primitive),
            3 => Ok(Self::Object),
            4 => Ok(Self::Reference),
            5 => Ok(Self::Collection),
            other => Err(DriftError::Format(format!(
                "unexpected node tag {:#04x}",
                other
            ))),
        }
    }
}

impl fmt::Display for NodeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::NullPrimitive => "null-primitive",
            Self::Primitive => "primitive",
            Self::Object => "object",
            Self::Reference => "reference",
            Self::Collection => "collection",
        };
        f.write_str(name)
    }
}

/// Tag-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Null,
    NullPrimitive,
    Primitive(Primitive),
    /// First visit of an object; `specification` indexes the header table.
    Object {
        id: ObjectId,
        specification: u32,
    },
    /// Repeat visit of an already numbered object.
    Reference(ObjectId),
    Collection {
        kind: CollectionKind,
        count: u32,
        element_type: HashCode,
    },
}

/// One wire record.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedNode {
    pub mode: ConstructionMode,
    pub type_hash: HashCode,
    pub payload: NodePayload,
}

impl SerializedNode {
    /// Create a `Default`-mode node.
    #[must_use]
    pub fn new(type_hash: HashCode, payload: NodePayload) -> Self {
        Self {
            mode: ConstructionMode::Default,
            type_hash,
            payload,
        }
    }

    /// Set the construction mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ConstructionMode) -> Self {
        self.mode = mode;
        self
    }

    /// The tag implied by the payload.
    #[must_use]
    pub fn tag(&self) -> NodeTag {
        match self.payload {
            NodePayload::Null => NodeTag::Null,
            NodePayload::NullPrimitive => NodeTag::NullPrimitive,
            NodePayload::Primitive(_) => NodeTag::Primitive,
            NodePayload::Object { .. } => NodeTag::Object,
            NodePayload::Reference(_) => NodeTag::Reference,
            NodePayload::Collection { .. } => NodeTag::Collection,
        }
    }

    /// The object id carried by `Object` and `Reference` nodes.
    #[must_use]
    pub fn object_id(&self) -> Option<ObjectId> {
        match self.payload {
            NodePayload::Object { id, .. } | NodePayload::Reference(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_bytes_are_pinned() {
        let expected = [
            (NodeTag::Null, 0u8),
            (NodeTag::NullPrimitive, 1),
            (NodeTag::Primitive, 2),
            (NodeTag::Object, 3),
            (NodeTag::Reference, 4),
            (NodeTag::Collection, 5),
        ];
        for (tag, byte) in expected {
            assert_eq!(tag as u8, byte);
            assert_eq!(NodeTag::try_from(byte).expect("tag"), tag);
        }
    }

    #[test]
    fn unknown_tag_is_format_error() {
        assert!(matches!(NodeTag::try_from(6), Err(DriftError::Format(_))));
        assert!(matches!(NodeTag::try_from(0xff), Err(DriftError::Format(_))));
    }

    #[test]
    fn payload_determines_tag() {
        let node = SerializedNode::new(
            HashCode(1),
            NodePayload::Object {
                id: ObjectId(4),
                specification: 0,
            },
        )
        .with_mode(ConstructionMode::Specified);
        assert_eq!(node.tag(), NodeTag::Object);
        assert_eq!(node.object_id(), Some(ObjectId(4)));
        assert_eq!(node.mode, ConstructionMode::Specified);

        let reference = SerializedNode::new(HashCode(1), NodePayload::Reference(ObjectId(4)));
        assert_eq!(reference.tag(), NodeTag::Reference);
        assert_eq!(reference.object_id(), Some(ObjectId(4)));
    }
}
