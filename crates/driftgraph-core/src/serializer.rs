//! # Serializer Facade
//!
//! Public entry point. A `Serializer` owns a shared registry and a
//! configuration; every `serialize`/`deserialize` call is an independent
//! session with its own identity map and formatter cache, so separate
//! `Serializer`s can run on separate threads over one `Arc<TypeRegistry>`.
//!
//! The free functions cover one-shot use without keeping a facade around.

use crate::config::SerializerConfig;
use crate::decoder::{Decoded, decode};
use crate::encoder::encode;
use crate::graph::ObjectGraph;
use crate::manifest::Manifest;
use crate::planner::Planner;
use crate::registry::TypeRegistry;
use crate::resolver::Resolution;
use crate::DriftError;
use std::io::{BufWriter, Read, Write};
use std::sync::Arc;

/// Graph serializer bound to one registry and configuration.
#[derive(Debug, Clone)]
pub struct Serializer {
    registry: Arc<TypeRegistry>,
    config: SerializerConfig,
    last_decode: Option<Resolution>,
}

impl Serializer {
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>, config: SerializerConfig) -> Self {
        Self {
            registry,
            config,
            last_decode: None,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Write `graph` to `writer`. The writer is buffered and flushed.
    pub fn serialize<W: Write>(&self, writer: W, graph: &ObjectGraph) -> Result<(), DriftError> {
        let mut writer = BufWriter::new(writer);
        write_graph(&mut writer, graph, &self.registry, &self.config)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a graph from `reader`.
    ///
    /// The resolution of this call replaces the previous one and backs
    /// `build_manifest`.
    pub fn deserialize<R: Read>(&mut self, mut reader: R) -> Result<ObjectGraph, DriftError> {
        let Decoded {
            graph, resolution, ..
        } = read_graph(&mut reader, &self.registry, &self.config)?;
        self.last_decode = Some(resolution);
        Ok(graph)
    }

    /// The resolution of the most recent successful `deserialize`.
    #[must_use]
    pub fn last_decode(&self) -> Option<&Resolution> {
        self.last_decode.as_ref()
    }

    /// Summarize what the most recent `deserialize` ignored.
    pub fn build_manifest(&self) -> Result<Manifest, DriftError> {
        self.last_decode
            .as_ref()
            .map(Manifest::build)
            .ok_or(DriftError::NoDeserialization)
    }
}

// =============================================================================
// ONE-SHOT FUNCTIONS
// =============================================================================

/// Plan and encode `graph`.
pub fn write_graph(
    writer: &mut dyn Write,
    graph: &ObjectGraph,
    registry: &TypeRegistry,
    config: &SerializerConfig,
) -> Result<(), DriftError> {
    let plan = Planner::new(graph, registry, config.max_depth).plan()?;
    encode(writer, &plan)?;
    tracing::debug!(
        objects = plan.object_count(),
        nodes = plan.nodes().len(),
        "graph serialized"
    );
    Ok(())
}

/// Decode a graph together with its resolution.
pub fn read_graph(
    reader: &mut dyn Read,
    registry: &TypeRegistry,
    config: &SerializerConfig,
) -> Result<Decoded, DriftError> {
    decode(reader, registry, config)
}

/// Serialize to an in-memory buffer with the default configuration.
pub fn to_bytes(graph: &ObjectGraph, registry: &TypeRegistry) -> Result<Vec<u8>, DriftError> {
    let mut bytes = Vec::new();
    write_graph(&mut bytes, graph, registry, &SerializerConfig::default())?;
    Ok(bytes)
}

/// Deserialize from a byte slice with the default configuration.
pub fn from_bytes(bytes: &[u8], registry: &TypeRegistry) -> Result<Decoded, DriftError> {
    let mut reader = bytes;
    read_graph(&mut reader, registry, &SerializerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Instance;
    use crate::registry::TypeDefinition;
    use crate::types::TypeDescriptor;
    use crate::value::PrimitiveKind;

    fn registry() -> Arc<TypeRegistry> {
        let registry = TypeRegistry::new()
            .with(
                TypeDefinition::new(TypeDescriptor::new("app", "Tag"))
                    .with_primitive("name", PrimitiveKind::String),
            )
            .expect("register");
        Arc::new(registry)
    }

    #[test]
    fn manifest_requires_deserialization() {
        let serializer = Serializer::new(registry(), SerializerConfig::default());
        assert!(matches!(
            serializer.build_manifest(),
            Err(DriftError::NoDeserialization)
        ));
    }

    #[test]
    fn facade_roundtrip() {
        let mut graph = ObjectGraph::new();
        let tag = graph.alloc(Instance::new(TypeDescriptor::new("app", "Tag")).with("name", "hot"));
        graph.set_root(tag);

        let mut serializer = Serializer::new(registry(), SerializerConfig::default());
        let mut bytes = Vec::new();
        serializer.serialize(&mut bytes, &graph).expect("serialize");
        let restored = serializer.deserialize(bytes.as_slice()).expect("deserialize");

        assert!(restored.structurally_eq(&graph));
        let manifest = serializer.build_manifest().expect("manifest");
        assert!(manifest.is_empty());
        assert_eq!(manifest.objects.resolved, 1);
    }

    #[test]
    fn failed_deserialize_keeps_previous_resolution() {
        let graph = ObjectGraph::with_root(crate::value::Value::from(1u8));
        let mut serializer = Serializer::new(registry(), SerializerConfig::default());
        let bytes = to_bytes(&graph, serializer.registry()).expect("bytes");
        serializer.deserialize(bytes.as_slice()).expect("first");
        assert!(serializer.deserialize(&b"junk"[..]).is_err());
        assert!(serializer.last_decode().is_some());
    }
}
