//! Integration tests for the CLI command layer.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use driftgraph::cli::{
    cmd_sample, inspect_stream, list_nodes, load_config, manifest_of, read_stream, sample_stream,
};
use driftgraph_core::{Classification, DriftError, ManifestEntry, SerializerConfig};
use std::io::Write;

// =============================================================================
// CONFIGURATION TESTS
// =============================================================================

#[test]
fn test_config_defaults_without_file() {
    let config = load_config(None).unwrap();
    assert_eq!(config, SerializerConfig::default());
}

#[test]
fn test_config_from_toml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "preview_removed_properties = true").unwrap();
    writeln!(file, "max_depth = 64").unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert!(config.preview_removed_properties);
    assert!(config.ignore_removed_properties);
    assert_eq!(config.max_depth, 64);
}

#[test]
fn test_config_rejects_bad_values() {
    let mut wrong_type = tempfile::NamedTempFile::new().unwrap();
    writeln!(wrong_type, "max_depth = \"deep\"").unwrap();
    assert!(matches!(
        load_config(Some(wrong_type.path())),
        Err(DriftError::ConfigError(_))
    ));

    let mut zero_depth = tempfile::NamedTempFile::new().unwrap();
    writeln!(zero_depth, "max_depth = 0").unwrap();
    assert!(matches!(
        load_config(Some(zero_depth.path())),
        Err(DriftError::ConfigError(_))
    ));
}

#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(DriftError::IoError(_))));
}

// =============================================================================
// SAMPLE COMMAND TESTS
// =============================================================================

#[test]
fn test_sample_refuses_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.dg");

    cmd_sample(&path, false, false, true).unwrap();
    assert!(cmd_sample(&path, false, false, true).is_err());
    cmd_sample(&path, true, true, true).unwrap();

    let bytes = read_stream(&path).unwrap();
    assert_eq!(bytes, sample_stream(true).unwrap());
}

#[test]
fn test_read_stream_rejects_directories() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(read_stream(dir.path()), Err(DriftError::IoError(_))));
}

// =============================================================================
// INSPECT / MANIFEST TESTS
// =============================================================================

#[test]
fn test_current_sample_resolves_cleanly() {
    let bytes = sample_stream(false).unwrap();
    let config = SerializerConfig::default();

    let report = inspect_stream(&bytes, &config).unwrap();
    assert_eq!(report.objects.resolved, 5);
    assert_eq!(report.objects.modified, 0);
    assert_eq!(report.objects.missing, 0);
    assert!(report.types.iter().all(|row| row.resolved));

    let (manifest, previews) = manifest_of(&bytes, &config).unwrap();
    assert!(manifest.is_empty());
    assert!(previews.is_empty());
}

#[test]
fn test_legacy_sample_reports_drift() {
    let bytes = sample_stream(true).unwrap();
    let config = SerializerConfig::default();

    let report = inspect_stream(&bytes, &config).unwrap();
    assert_eq!(report.objects.resolved, 3);
    assert_eq!(report.objects.modified, 2);
    assert_eq!(report.objects.missing, 1);

    let book = report
        .specifications
        .iter()
        .find(|row| row.type_name == "library::Book")
        .unwrap();
    assert_eq!(book.classification, Classification::Modified);
    assert_eq!(book.objects, 2);
    assert_eq!(book.mode, "default");
    assert!(book.properties.contains(&"isbn: core::string".to_string()));

    let magazine = report
        .types
        .iter()
        .find(|row| row.name == "library::Magazine")
        .unwrap();
    assert!(!magazine.resolved);

    let (manifest, _) = manifest_of(&bytes, &config).unwrap();
    assert_eq!(
        manifest.missing_types().collect::<Vec<_>>(),
        vec!["library::Magazine"]
    );
    assert!(manifest.entries.contains(&ManifestEntry::RemovedProperty {
        type_name: "library::Book".to_string(),
        property: "isbn".to_string(),
        declared: "core::string".to_string(),
        objects: 2,
    }));
    assert!(manifest.entries.contains(&ManifestEntry::AddedProperty {
        type_name: "library::Book".to_string(),
        property: "pages".to_string(),
        declared: "core::u32".to_string(),
        objects: 2,
    }));
}

#[test]
fn test_preview_lists_removed_values() {
    let bytes = sample_stream(true).unwrap();
    let config = SerializerConfig::default().preview_removed_properties(true);

    let (_, previews) = manifest_of(&bytes, &config).unwrap();
    assert_eq!(previews.len(), 2);
    assert!(previews.iter().all(|row| row.property == "isbn"));
    assert!(
        previews
            .iter()
            .any(|row| row.value.contains("978-0-06-051275-0"))
    );
}

#[test]
fn test_inspect_rejects_garbage() {
    let result = inspect_stream(b"not a stream", &SerializerConfig::default());
    assert!(matches!(result, Err(DriftError::Format(_))));
}

// =============================================================================
// NODES TESTS
// =============================================================================

#[test]
fn test_node_listing_shape() {
    let bytes = sample_stream(true).unwrap();
    let (rows, unresolved) = list_nodes(&bytes, &SerializerConfig::default()).unwrap();

    assert_eq!(rows[0].depth, 0);
    assert_eq!(rows[0].tag, "object");
    assert_eq!(rows[0].type_name, "library::Library");
    assert!(rows.iter().any(|row| row.tag == "reference"));
    assert!(rows.iter().any(|row| row.tag == "collection"));
    assert!(unresolved.contains(&"library::Magazine".to_string()));
}

#[test]
fn test_node_listing_honours_depth_limit() {
    let bytes = sample_stream(false).unwrap();
    let config = SerializerConfig::default().max_depth(1);
    assert!(matches!(
        list_nodes(&bytes, &config),
        Err(DriftError::DepthExceeded(1))
    ));
}
