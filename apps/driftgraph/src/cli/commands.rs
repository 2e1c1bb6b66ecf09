//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Report construction is separate from printing so it can be tested.

use crate::catalog;
use crate::report::{InspectReport, NodeRow, PreviewRow, node_rows, preview_rows, unresolved_types};
use driftgraph_core::{
    DriftError, Manifest, ManifestEntry, Serializer, SerializerConfig, formats::read_header,
    read_graph, scan,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum stream size (500 MB).
///
/// Streams are read fully into memory before decoding.
const MAX_STREAM_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), DriftError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| DriftError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(DriftError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and ensure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, DriftError> {
    let canonical = path.canonicalize().map_err(|e| {
        DriftError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(DriftError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, DriftError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        DriftError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(DriftError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| DriftError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Load serializer options from a TOML file, or the defaults without one.
///
/// ```toml
/// ignore_removed_properties = false
/// preview_removed_properties = true
/// max_depth = 256
/// ```
pub fn load_config(path: Option<&Path>) -> Result<SerializerConfig, DriftError> {
    let Some(path) = path else {
        return Ok(SerializerConfig::default());
    };
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_CONFIG_FILE_SIZE)?;

    let text = std::fs::read_to_string(&validated)
        .map_err(|e| DriftError::ConfigError(format!("Read config: {}", e)))?;
    let config: SerializerConfig = toml::from_str(&text)
        .map_err(|e| DriftError::ConfigError(format!("{}: {}", path.display(), e)))?;

    if config.max_depth == 0 {
        return Err(DriftError::ConfigError(
            "max_depth must be at least 1".to_string(),
        ));
    }
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Read a whole stream file after path and size checks.
pub fn read_stream(file: &Path) -> Result<Vec<u8>, DriftError> {
    let validated = validate_file_path(file)?;
    validate_file_size(&validated, MAX_STREAM_FILE_SIZE)?;
    std::fs::read(&validated).map_err(|e| DriftError::IoError(format!("Read file: {}", e)))
}

// =============================================================================
// REPORT BUILDERS
// =============================================================================

/// Header summary and classifications against the current catalog.
pub fn inspect_stream(bytes: &[u8], config: &SerializerConfig) -> Result<InspectReport, DriftError> {
    let registry = catalog::registry()?;
    let mut header_reader = bytes;
    let header = read_header(&mut header_reader)?;
    let mut reader = bytes;
    let decoded = read_graph(&mut reader, &registry, config)?;
    Ok(InspectReport::build(bytes.len() as u64, &header, &decoded))
}

/// Node listing plus the stored types the catalog cannot resolve.
pub fn list_nodes(
    bytes: &[u8],
    config: &SerializerConfig,
) -> Result<(Vec<NodeRow>, Vec<String>), DriftError> {
    let mut reader = bytes;
    let (header, nodes) = scan(&mut reader, config.max_depth)?;
    let unresolved = unresolved_types(&header, &catalog::registry()?);
    Ok((node_rows(&header, &nodes), unresolved))
}

/// Decode through the facade and collect its manifest, plus removed
/// values when previews are enabled.
pub fn manifest_of(
    bytes: &[u8],
    config: &SerializerConfig,
) -> Result<(Manifest, Vec<PreviewRow>), DriftError> {
    let mut serializer = Serializer::new(Arc::new(catalog::registry()?), config.clone());
    serializer.deserialize(bytes)?;
    let manifest = serializer.build_manifest()?;
    let previews = serializer
        .last_decode()
        .map(preview_rows)
        .unwrap_or_default();
    Ok((manifest, previews))
}

/// Encode the demonstration graph. Returns the stream.
pub fn sample_stream(legacy: bool) -> Result<Vec<u8>, DriftError> {
    let registry = if legacy {
        catalog::legacy_registry()?
    } else {
        catalog::registry()?
    };
    let graph = catalog::sample_graph(legacy)?;
    let serializer = Serializer::new(Arc::new(registry), SerializerConfig::default());
    let mut bytes = Vec::new();
    serializer.serialize(&mut bytes, &graph)?;
    Ok(bytes)
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Show header summary and classification totals.
pub fn cmd_inspect(file: &Path, config: &SerializerConfig, json_mode: bool) -> Result<(), DriftError> {
    let bytes = read_stream(file)?;
    let report = inspect_stream(&bytes, config)?;

    if json_mode {
        print_json(&serde_json::json!({
            "file": file.to_string_lossy(),
            "report": report,
        }));
        return Ok(());
    }

    println!("driftgraph Stream");
    println!("=================");
    println!("File:   {:?}", file);
    println!("Bytes:  {}", report.bytes);
    println!("Nodes:  {}", report.nodes);
    println!(
        "Objects: {} resolved, {} modified, {} missing",
        report.objects.resolved, report.objects.modified, report.objects.missing
    );
    println!();
    println!("Types ({}):", report.types.len());
    for row in &report.types {
        let status = if row.resolved { "ok" } else { "missing" };
        println!("  [{:>7}] {} ({})", status, row.name, row.hash);
    }
    println!();
    println!("Specifications ({}):", report.specifications.len());
    for row in &report.specifications {
        println!(
            "  #{} {} ({}, {} objects) {:?}",
            row.index, row.type_name, row.mode, row.objects, row.classification
        );
        for property in &row.properties {
            println!("      {}", property);
        }
    }

    Ok(())
}

// =============================================================================
// NODES COMMAND
// =============================================================================

/// List nodes in write order, indented by depth.
pub fn cmd_nodes(
    file: &Path,
    config: &SerializerConfig,
    json_mode: bool,
    limit: Option<usize>,
) -> Result<(), DriftError> {
    let bytes = read_stream(file)?;
    let (rows, unresolved) = list_nodes(&bytes, config)?;
    let total = rows.len();
    let shown = limit.unwrap_or(total).min(total);

    if json_mode {
        print_json(&serde_json::json!({
            "total": total,
            "nodes": &rows[..shown],
            "unresolved_types": unresolved,
        }));
        return Ok(());
    }

    for row in &rows[..shown] {
        println!(
            "{:indent$}{} {} [{}] {}",
            "",
            row.tag,
            row.type_name,
            row.mode,
            row.detail,
            indent = row.depth * 2
        );
    }
    if shown < total {
        println!("... and {} more", total - shown);
    }
    if !unresolved.is_empty() {
        println!();
        println!("Unresolved types: {}", unresolved.join(", "));
    }

    Ok(())
}

// =============================================================================
// MANIFEST COMMAND
// =============================================================================

/// Show what decoding ignored.
pub fn cmd_manifest(file: &Path, config: &SerializerConfig, json_mode: bool) -> Result<(), DriftError> {
    let bytes = read_stream(file)?;
    let (manifest, previews) = manifest_of(&bytes, config)?;

    if json_mode {
        print_json(&serde_json::json!({
            "manifest": manifest,
            "previews": previews,
        }));
        return Ok(());
    }

    if manifest.is_empty() {
        println!("Stream resolves cleanly against the current catalog.");
        return Ok(());
    }

    println!("Manifest");
    println!("========");
    for entry in &manifest.entries {
        match entry {
            ManifestEntry::MissingType {
                type_name, objects, ..
            } => println!("  missing type      {} ({} objects)", type_name, objects),
            ManifestEntry::RemovedProperty {
                type_name,
                property,
                declared,
                objects,
            } => println!(
                "  removed property  {}.{}: {} ({} objects)",
                type_name, property, declared, objects
            ),
            ManifestEntry::AddedProperty {
                type_name,
                property,
                declared,
                objects,
            } => println!(
                "  added property    {}.{}: {} ({} objects)",
                type_name, property, declared, objects
            ),
        }
    }
    if !previews.is_empty() {
        println!();
        println!("Removed values:");
        for row in &previews {
            println!("  #{} {} = {}", row.object, row.property, row.value);
        }
    }

    Ok(())
}

// =============================================================================
// SAMPLE COMMAND
// =============================================================================

/// Write the demonstration stream.
pub fn cmd_sample(output: &Path, legacy: bool, force: bool, json_mode: bool) -> Result<(), DriftError> {
    let validated = validate_output_path(output)?;
    if validated.exists() && !force {
        return Err(DriftError::IoError(
            "Output file already exists. Use --force to overwrite.".to_string(),
        ));
    }

    let bytes = sample_stream(legacy)?;
    std::fs::write(&validated, &bytes)
        .map_err(|e| DriftError::IoError(format!("Write file: {}", e)))?;
    tracing::info!(path = %validated.display(), bytes = bytes.len(), legacy, "sample written");

    if json_mode {
        print_json(&serde_json::json!({
            "path": validated.to_string_lossy(),
            "bytes": bytes.len(),
            "legacy": legacy,
        }));
    } else {
        println!("Wrote {} bytes to {:?}", bytes.len(), validated);
    }

    Ok(())
}
