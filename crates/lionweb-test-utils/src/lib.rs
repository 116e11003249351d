//! Testing utilities for the LionWeb deserialization workspace
//!
//! A small `library` language, helpers for building chunks against it and
//! log capture for tests.

#![allow(missing_docs)]

use lionweb_chunk::{SerializedChunk, SerializedNode};
use lionweb_meta::{
    builtins, Classifier, Enumeration, Feature, Language, LanguageRegistry, MetaPointer,
    Metamodel, StructuredDataType,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const LANGUAGE_KEY: &str = "library";
pub const LANGUAGE_VERSION: &str = "1";

/// Pointer into the `library` language
pub fn ptr(key: &str) -> MetaPointer {
    MetaPointer::new(LANGUAGE_KEY, LANGUAGE_VERSION, key)
}

/// The `library` language
///
/// - `Named` interface: `name: String`
/// - `Library`: `books*: Book`, `writers*: Writer`, `founded?: Integer`
/// - `Book`: `pages?: Integer`, `kind?: BookKind`, `edition?: Edition`,
///   `price?: Money`, `author?: -> Writer`, `related*: -> Book`,
///   `chapters*: Chapter`, `cover?: Chapter`
/// - `GuideBook` extends `Book`
/// - `Chapter`, `Writer`: named concepts
/// - `Folder`: `items*: Node` (holds anything, itself included)
/// - `Comment` annotates `Book`; `Tag` annotates anything
pub fn library_language() -> Language {
    Language::new(LANGUAGE_KEY, LANGUAGE_VERSION)
        .named("Library")
        .with_classifier(
            Classifier::interface(ptr("Named"), "Named")
                .with_feature(Feature::property("name", builtins::string()).named("name")),
        )
        .with_classifier(
            Classifier::concept(ptr("Library"), "Library")
                .extends(ptr("Named"))
                .with_feature(Feature::containment("books", ptr("Book")).optional().multiple())
                .with_feature(
                    Feature::containment("writers", ptr("Writer"))
                        .optional()
                        .multiple(),
                )
                .with_feature(Feature::property("founded", builtins::integer()).optional()),
        )
        .with_classifier(
            Classifier::concept(ptr("Book"), "Book")
                .extends(ptr("Named"))
                .with_feature(Feature::property("pages", builtins::integer()).optional())
                .with_feature(Feature::property("kind", ptr("BookKind")).optional())
                .with_feature(Feature::property("edition", ptr("Edition")).optional())
                .with_feature(Feature::property("price", ptr("Money")).optional())
                .with_feature(Feature::reference("author", ptr("Writer")).optional())
                .with_feature(Feature::reference("related", ptr("Book")).optional().multiple())
                .with_feature(
                    Feature::containment("chapters", ptr("Chapter"))
                        .optional()
                        .multiple(),
                )
                .with_feature(Feature::containment("cover", ptr("Chapter")).optional()),
        )
        .with_classifier(Classifier::concept(ptr("GuideBook"), "GuideBook").extends(ptr("Book")))
        .with_classifier(Classifier::concept(ptr("Chapter"), "Chapter").extends(ptr("Named")))
        .with_classifier(Classifier::concept(ptr("Writer"), "Writer").extends(ptr("Named")))
        .with_classifier(
            Classifier::concept(ptr("Folder"), "Folder")
                .extends(ptr("Named"))
                .with_feature(
                    Feature::containment("items", builtins::node())
                        .optional()
                        .multiple(),
                ),
        )
        .with_classifier(
            Classifier::annotation(ptr("Comment"), "Comment", Some(ptr("Book")))
                .with_feature(Feature::property("text", builtins::string()).optional()),
        )
        .with_classifier(Classifier::annotation(ptr("Tag"), "Tag", None))
        .with_enumeration(
            Enumeration::new(ptr("BookKind"), "BookKind")
                .with_literal("fiction")
                .with_literal("nonFiction"),
        )
        .with_structured(
            StructuredDataType::new(ptr("Edition"), "Edition")
                .with_field("year", builtins::integer())
                .with_field("printing", builtins::integer()),
        )
        .with_primitive("Money", "Money")
}

/// Registry holding the built-ins and the `library` language
pub fn registry() -> LanguageRegistry {
    LanguageRegistry::builder()
        .language(library_language())
        .build()
        .expect("library language is well-formed")
}

/// Loaded classifier of the `library` language
pub fn classifier(registry: &LanguageRegistry, key: &str) -> Arc<Classifier> {
    registry
        .classifier(&ptr(key))
        .unwrap_or_else(|| panic!("library language has no classifier {key}"))
}

/// Record of a `library` classifier
pub fn node(id: &str, classifier: &str) -> SerializedNode {
    SerializedNode::new(id, ptr(classifier))
}

/// Record with its `name` property set
pub fn named(id: &str, classifier: &str, name: &str) -> SerializedNode {
    node(id, classifier).with_property(ptr("name"), Some(name))
}

/// Chunk declaring the `library` language
pub fn chunk<I>(nodes: I) -> SerializedChunk
where
    I: IntoIterator<Item = SerializedNode>,
{
    nodes.into_iter().fold(
        SerializedChunk::new().with_language(LANGUAGE_KEY, LANGUAGE_VERSION),
        SerializedChunk::with_node,
    )
}

/// Route `tracing` output to the test harness
///
/// Filter comes from `RUST_LOG` (default `warn`). Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
