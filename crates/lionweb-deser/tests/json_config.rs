//! JSON input and configuration

use lionweb_chunk::ChunkError;
use lionweb_deser::{
    ConfigError, DeserializationError, Deserializer, DeserializerConfig, IgnoringHandler,
    DEFAULT_MAX_DUPLICATE_ID_RETRIES,
};
use lionweb_ids::CompressedId;
use lionweb_meta::PropertyValue;
use lionweb_test_utils::{init_tracing, registry};
use pretty_assertions::assert_eq;

const CHUNK: &str = r#"{
    "serializationFormatVersion": "2023.1",
    "languages": [{"key": "library", "version": "1"}],
    "nodes": [
        {
            "id": "book-1",
            "classifier": {"language": "library", "version": "1", "key": "Book"},
            "properties": [
                {"property": {"language": "library", "version": "1", "key": "name"}, "value": "Moby Dick"},
                {"property": {"language": "library", "version": "1", "key": "pages"}, "value": "635"}
            ],
            "containments": [],
            "references": [
                {
                    "reference": {"language": "library", "version": "1", "key": "author"},
                    "targets": [{"resolveInfo": "Melville", "reference": "writer-1"}]
                }
            ],
            "annotations": [],
            "parent": "lib-1"
        },
        {
            "id": "lib-1",
            "classifier": {"language": "library", "version": "1", "key": "Library"},
            "properties": [],
            "containments": [
                {"containment": {"language": "library", "version": "1", "key": "books"}, "children": ["book-1"]},
                {"containment": {"language": "library", "version": "1", "key": "writers"}, "children": ["writer-1"]}
            ],
            "references": [],
            "annotations": [],
            "parent": null
        },
        {
            "id": "writer-1",
            "classifier": {"language": "library", "version": "1", "key": "Writer"},
            "properties": [
                {"property": {"language": "library", "version": "1", "key": "name"}, "value": "Herman Melville"}
            ],
            "parent": "lib-1"
        }
    ]
}"#;

#[test]
fn test_json_chunk_end_to_end() {
    init_tracing();
    let registry = registry();
    let result = Deserializer::new(&registry)
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap();

    assert!(result.report.is_clean());
    assert_eq!(result.report.records, 3);
    assert_eq!(result.report.nodes_created, 3);

    let roots: Vec<String> = result.root_nodes().map(|n| n.id().to_string()).collect();
    assert_eq!(roots, vec!["lib-1"]);

    let book = result.node("book-1").unwrap();
    assert_eq!(
        book.property("name"),
        Some(&PropertyValue::String("Moby Dick".into()))
    );
    assert_eq!(book.property("pages"), Some(&PropertyValue::Integer(635)));
    let author = &book.references("author")[0];
    assert_eq!(author.target, result.graph.lookup("writer-1"));
    assert_eq!(author.resolve_info.as_deref(), Some("Melville"));
    assert_eq!(book.parent(), result.graph.lookup("lib-1"));
}

#[test]
fn test_malformed_json_is_a_chunk_error() {
    let registry = registry();
    let err = Deserializer::new(&registry)
        .deserialize_json(r#"{"nodes": 3}"#, &mut IgnoringHandler)
        .unwrap_err();
    assert!(matches!(err, DeserializationError::Chunk(ChunkError::Json(_))));
}

#[test]
fn test_format_version_checked_only_in_strict_mode() {
    init_tracing();
    let registry = registry();
    let old = CHUNK.replace("2023.1", "2022.1");

    let lenient = Deserializer::new(&registry)
        .deserialize_json(&old, &mut IgnoringHandler)
        .unwrap();
    assert_eq!(lenient.report.nodes_created, 3);

    let err = Deserializer::new(&registry)
        .with_config(DeserializerConfig::new().with_strict_format_version(true))
        .deserialize_json(&old, &mut IgnoringHandler)
        .unwrap_err();
    assert!(matches!(
        err,
        DeserializationError::Chunk(ChunkError::UnsupportedFormatVersion { .. })
    ));
}

#[test]
fn test_id_modes() {
    init_tracing();
    let registry = registry();

    let packed = Deserializer::new(&registry)
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap();
    let writer = packed.node("writer-1").unwrap();
    assert!(writer.id().compressed().is_packed());
    assert_eq!(writer.id().original(), None);
    assert_eq!(writer.id().to_string(), "writer-1");
    // trailing "-1" does not pack losslessly
    assert!(!packed.node("book-1").unwrap().id().compressed().is_packed());

    let kept = Deserializer::new(&registry)
        .with_config(DeserializerConfig::new().with_keep_original(true))
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap();
    assert_eq!(
        kept.node("writer-1").unwrap().id().original(),
        Some("writer-1")
    );

    let raw = Deserializer::new(&registry)
        .with_config(DeserializerConfig::new().with_compressed_ids(false))
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap();
    assert_eq!(
        raw.node("writer-1").unwrap().id().compressed(),
        &CompressedId::raw("writer-1")
    );
    assert!(raw.report.is_clean());
}

#[test]
fn test_config_from_yaml() {
    let config = DeserializerConfig::from_yaml_str(
        "compressedIds: false\nmaxDuplicateIdRetries: 3\nstrictFormatVersion: true\n",
    )
    .unwrap();
    assert_eq!(
        config,
        DeserializerConfig::new()
            .with_compressed_ids(false)
            .with_max_duplicate_id_retries(3)
            .with_strict_format_version(true)
    );

    let defaults = DeserializerConfig::from_yaml_str("{}").unwrap();
    assert_eq!(
        defaults.max_duplicate_id_retries,
        DEFAULT_MAX_DUPLICATE_ID_RETRIES
    );
    assert!(defaults.compressed_ids);

    assert!(matches!(
        DeserializerConfig::from_yaml_str("retries: 3"),
        Err(ConfigError::Yaml(_))
    ));
    assert!(matches!(
        DeserializerConfig::from_yaml_str("maxDuplicateIdRetries: 0"),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_invalid_config_rejected_before_resolution() {
    let registry = registry();
    let err = Deserializer::new(&registry)
        .with_config(DeserializerConfig::new().with_max_duplicate_id_retries(0))
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap_err();
    assert!(matches!(err, DeserializationError::Config(_)));
}

#[test]
fn test_id_options_in_nested_and_flat_form() {
    let registry = registry();
    let nested = DeserializerConfig::from_yaml_str("compressedIds:\n  keepOriginal: true\n").unwrap();
    let flat = DeserializerConfig::from_yaml_str("compressedIds: true\nkeepOriginal: true\n").unwrap();
    assert_eq!(nested, flat);

    let kept = Deserializer::new(&registry)
        .with_config(nested)
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap();
    let writer = kept.node("writer-1").unwrap();
    assert!(writer.id().compressed().is_packed());
    assert_eq!(writer.id().original(), Some("writer-1"));

    let uncompressed = DeserializerConfig::from_yaml_str("uncompressedIds: true").unwrap();
    assert_eq!(uncompressed, DeserializerConfig::new().with_compressed_ids(false));
    let raw = Deserializer::new(&registry)
        .with_config(uncompressed)
        .deserialize_json(CHUNK, &mut IgnoringHandler)
        .unwrap();
    assert_eq!(
        raw.node("writer-1").unwrap().id().compressed(),
        &CompressedId::raw("writer-1")
    );
}
