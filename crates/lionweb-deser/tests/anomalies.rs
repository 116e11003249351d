//! Each anomaly under the ignoring, strict and healing policies

use lionweb_chunk::{SerializedNode, ReferenceTarget};
use lionweb_deser::{
    Anomaly, AnomalyHandler, AnomalyKind, DeserializationError, Deserialized, Deserializer,
    DeserializerConfig, HandlerAbort, Healing, IgnoringHandler, LinkValues, Node, NodeGraph,
    NodeRef, Outcome, RecordingHandler, StrictHandler,
};
use lionweb_meta::{
    builtins, Classifier, EnumLiteral, Enumeration, Feature, FeatureKind, Language,
    LanguageRegistry, MetaPointer, Metamodel, PropertyValue, ValueError,
};
use lionweb_test_utils::{chunk, classifier, init_tracing, named, node, ptr, registry};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn resolve(
    records: Vec<SerializedNode>,
    handler: &mut dyn AnomalyHandler,
) -> Result<Deserialized, DeserializationError> {
    init_tracing();
    let registry = registry();
    Deserializer::new(&registry).deserialize(&chunk(records), handler)
}

fn outcomes(result: &Deserialized) -> Vec<(AnomalyKind, Outcome)> {
    result
        .report
        .anomalies
        .iter()
        .map(|r| (r.anomaly.kind(), r.outcome))
        .collect()
}

fn assert_invalid_substitute(err: &DeserializationError, kind: AnomalyKind) {
    assert!(
        matches!(err, DeserializationError::InvalidSubstitute { .. }),
        "expected an invalid substitute, got {err}"
    );
    assert_eq!(err.anomaly().map(Anomaly::kind), Some(kind));
}

// Unknown classifier

#[test]
fn test_unknown_classifier_drops_record_and_edges_to_it() {
    let result = resolve(
        vec![
            node("lib", "Library").with_children(ptr("books"), ["x"]),
            node("x", "Magazine"),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert!(result.node("x").is_none());
    assert!(result.node("lib").unwrap().children("books").is_empty());
    assert_eq!(
        outcomes(&result),
        vec![
            (AnomalyKind::UnknownClassifier, Outcome::Dropped),
            (AnomalyKind::UnresolvableChild, Outcome::Dropped),
        ]
    );
    assert_eq!(result.report.records_skipped, 1);
    assert_eq!(result.report.nodes_created, 1);
}

struct TreatAsBook(Arc<Classifier>);

impl AnomalyHandler for TreatAsBook {
    fn unknown_classifier(&mut self, _: &SerializedNode) -> Healing<Arc<Classifier>> {
        Ok(Some(Arc::clone(&self.0)))
    }
}

#[test]
fn test_unknown_classifier_healed_with_a_known_one() {
    let registry = registry();
    let mut handler = TreatAsBook(classifier(&registry, "Book"));
    let result = resolve(
        vec![
            node("lib", "Library").with_children(ptr("books"), ["x"]),
            node("x", "Magazine"),
        ],
        &mut handler,
    )
    .unwrap();

    let x = result.node("x").unwrap();
    assert_eq!(x.classifier().pointer(), &ptr("Book"));
    assert_eq!(x.parent(), result.graph.lookup("lib"));
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnknownClassifier, Outcome::Healed)]
    );
}

// Strict policy

#[test]
fn test_strict_handler_aborts_on_first_anomaly() {
    let err = resolve(
        vec![
            node("b", "Book").with_property(ptr("pages"), Some("many")),
            node("x", "Magazine"),
        ],
        &mut StrictHandler,
    )
    .unwrap_err();

    let DeserializationError::Aborted { anomaly, source } = &err else {
        panic!("expected an abort, got {err}");
    };
    assert_eq!(anomaly.kind(), AnomalyKind::InvalidPropertyValue);
    assert!(source.reason().contains("InvalidPropertyValue"));
}

#[test]
fn test_strict_handler_accepts_clean_chunk() {
    let result = resolve(
        vec![
            named("lib", "Library", "Central").with_children(ptr("books"), ["b"]),
            named("b", "Book", "Dune"),
        ],
        &mut StrictHandler,
    )
    .unwrap();
    assert!(result.report.is_clean());
}

#[test]
fn test_recording_handler_sees_every_anomaly() {
    let mut handler = RecordingHandler::new(IgnoringHandler);
    let result = resolve(
        vec![
            node("b", "Book")
                .with_property(ptr("pages"), Some("many"))
                .with_targets(ptr("author"), ["ghost"]),
            node("x", "Magazine"),
        ],
        &mut handler,
    )
    .unwrap();

    assert_eq!(handler.seen(), result.report.kinds().as_slice());
    assert_eq!(handler.count(AnomalyKind::UnknownClassifier), 1);
}

// Features

#[test]
fn test_unknown_feature_is_skipped() {
    let result = resolve(
        vec![named("b", "Book", "Dune").with_property(ptr("isbn"), Some("123"))],
        &mut IgnoringHandler,
    )
    .unwrap();

    let book = result.node("b").unwrap();
    assert_eq!(book.set_features(), vec!["name"]);
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnknownFeature, Outcome::Dropped)]
    );
}

/// Maps every unknown feature onto a fixed one
struct RedirectFeature(Arc<Feature>);

impl AnomalyHandler for RedirectFeature {
    fn unknown_feature(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &MetaPointer,
        _: FeatureKind,
    ) -> Healing<Arc<Feature>> {
        Ok(Some(Arc::clone(&self.0)))
    }
}

#[test]
fn test_unknown_feature_healed_with_declared_feature() {
    let registry = registry();
    let name = registry
        .feature(&classifier(&registry, "Book"), "name")
        .unwrap();
    let result = resolve(
        vec![node("b", "Book").with_property(ptr("title"), Some("Dune"))],
        &mut RedirectFeature(name),
    )
    .unwrap();

    assert_eq!(
        result.node("b").unwrap().property("name"),
        Some(&PropertyValue::String("Dune".into()))
    );
}

#[test]
fn test_unknown_feature_substitute_must_be_declared() {
    let stray = Arc::new(Feature::property("isbn", builtins::string()));
    let err = resolve(
        vec![node("b", "Book").with_property(ptr("isbn"), Some("1"))],
        &mut RedirectFeature(stray),
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::UnknownFeature);
}

#[test]
fn test_unknown_feature_substitute_must_have_expected_kind() {
    let registry = registry();
    let author = registry
        .feature(&classifier(&registry, "Book"), "author")
        .unwrap();
    let err = resolve(
        vec![node("b", "Book").with_property(ptr("isbn"), Some("1"))],
        &mut RedirectFeature(author),
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::UnknownFeature);
}

#[test]
fn test_feature_used_as_wrong_kind_is_invalid() {
    let result = resolve(
        vec![
            node("lib", "Library").with_property(ptr("books"), Some("b")),
            node("b", "Book").with_children(ptr("author"), ["w"]),
            node("w", "Writer"),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert!(result.node("lib").unwrap().properties().is_empty());
    assert!(result.node("b").unwrap().references("author").is_empty());
    assert!(result.node("w").unwrap().parent().is_none());
    assert_eq!(
        result.report.kinds(),
        vec![AnomalyKind::InvalidFeature, AnomalyKind::InvalidFeature]
    );
    assert!(matches!(
        &result.report.anomalies[0].anomaly,
        Anomaly::InvalidFeature {
            expected: FeatureKind::Property,
            actual: FeatureKind::Containment,
            ..
        }
    ));
}

// Property values

#[test]
fn test_property_values_parse_by_datatype() {
    let result = resolve(
        vec![node("b", "Book")
            .with_property(ptr("pages"), Some("412"))
            .with_property(ptr("kind"), Some("fiction"))
            .with_property(ptr("edition"), Some(r#"{"year":"1965","printing":null}"#))
            .with_property(ptr("price"), Some("9.99 EUR"))
            .with_property(ptr("name"), None)],
        &mut IgnoringHandler,
    )
    .unwrap();

    let book = result.node("b").unwrap();
    assert!(result.report.is_clean());
    assert_eq!(book.property("pages"), Some(&PropertyValue::Integer(412)));
    assert!(matches!(
        book.property("kind"),
        Some(PropertyValue::Enum(EnumLiteral { key, .. })) if key == "fiction"
    ));
    let Some(PropertyValue::Structured(edition)) = book.property("edition") else {
        panic!("edition should be structured");
    };
    assert_eq!(edition.get("year"), Some(&PropertyValue::Integer(1965)));
    assert_eq!(edition.get("printing"), None);
    assert_eq!(
        book.property("price"),
        Some(&PropertyValue::Custom {
            ty: ptr("Money"),
            raw: "9.99 EUR".into()
        })
    );
    assert_eq!(book.property("name"), None);
}

#[test]
fn test_invalid_property_value_leaves_property_unset() {
    let result = resolve(
        vec![node("b", "Book")
            .with_property(ptr("pages"), Some("many"))
            .with_property(ptr("edition"), Some(r#"{"month":"3"}"#))],
        &mut IgnoringHandler,
    )
    .unwrap();

    let book = result.node("b").unwrap();
    assert!(book.properties().is_empty());
    assert_eq!(
        result.report.kinds(),
        vec![
            AnomalyKind::InvalidPropertyValue,
            AnomalyKind::InvalidPropertyValue
        ]
    );
}

/// Answers every unparsable value with a fixed one
struct ReplaceValue(PropertyValue);

impl AnomalyHandler for ReplaceValue {
    fn invalid_property_value(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &str,
        _: &ValueError,
    ) -> Healing<PropertyValue> {
        Ok(Some(self.0.clone()))
    }
}

#[test]
fn test_invalid_property_value_healed_with_typed_value() {
    let result = resolve(
        vec![node("b", "Book").with_property(ptr("pages"), Some("many"))],
        &mut ReplaceValue(PropertyValue::Integer(0)),
    )
    .unwrap();

    assert_eq!(
        result.node("b").unwrap().property("pages"),
        Some(&PropertyValue::Integer(0))
    );
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::InvalidPropertyValue, Outcome::Healed)]
    );
}

#[test]
fn test_invalid_property_value_substitute_of_wrong_type_is_fatal() {
    let err = resolve(
        vec![node("b", "Book").with_property(ptr("pages"), Some("many"))],
        &mut ReplaceValue(PropertyValue::String("many".into())),
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::InvalidPropertyValue);
}

#[test]
fn test_unknown_enumeration_literal_is_dropped() {
    let result = resolve(
        vec![node("b", "Book").with_property(ptr("kind"), Some("poetry"))],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert_eq!(result.node("b").unwrap().property("kind"), None);
    assert!(matches!(
        &result.report.anomalies[0].anomaly,
        Anomaly::UnknownEnumerationLiteral { literal, .. } if literal == "poetry"
    ));
}

/// Picks a literal by key from whatever enumeration it is given
struct PickLiteral(&'static str);

impl AnomalyHandler for PickLiteral {
    fn unknown_enumeration_literal(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        enumeration: &Enumeration,
        _: &str,
    ) -> Healing<EnumLiteral> {
        Ok(enumeration.literal(self.0).cloned())
    }
}

#[test]
fn test_unknown_enumeration_literal_healed_with_owned_literal() {
    let result = resolve(
        vec![node("b", "Book").with_property(ptr("kind"), Some("poetry"))],
        &mut PickLiteral("fiction"),
    )
    .unwrap();

    assert!(matches!(
        result.node("b").unwrap().property("kind"),
        Some(PropertyValue::Enum(EnumLiteral { key, .. })) if key == "fiction"
    ));
}

/// Answers with a literal of an unrelated enumeration
struct ForeignLiteral;

impl AnomalyHandler for ForeignLiteral {
    fn unknown_enumeration_literal(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        _: &Enumeration,
        _: &str,
    ) -> Healing<EnumLiteral> {
        let colors = Enumeration::new(ptr("Color"), "Color").with_literal("red");
        Ok(colors.literal("red").cloned())
    }
}

#[test]
fn test_foreign_enumeration_literal_is_fatal() {
    let err = resolve(
        vec![node("b", "Book").with_property(ptr("kind"), Some("poetry"))],
        &mut ForeignLiteral,
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::UnknownEnumerationLiteral);
}

fn calendar_registry() -> LanguageRegistry {
    let language = Language::new("calendar", "1");
    let event = language.pointer("Event");
    let date = language.pointer("Date");
    LanguageRegistry::builder()
        .language(language.with_classifier(
            Classifier::concept(event, "Event")
                .with_feature(Feature::property("when", date).optional()),
        ))
        .build()
        .unwrap()
}

struct KeepRawDate;

impl AnomalyHandler for KeepRawDate {
    fn unknown_datatype(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        feature: &Feature,
        raw: &str,
    ) -> Healing<PropertyValue> {
        Ok(Some(PropertyValue::Custom {
            ty: feature.ty().clone(),
            raw: raw.to_string(),
        }))
    }
}

#[test]
fn test_unknown_datatype_dropped_or_healed() {
    init_tracing();
    let registry = calendar_registry();
    let calendar = |key: &str| MetaPointer::new("calendar", "1", key);
    let chunk = lionweb_chunk::SerializedChunk::new()
        .with_language("calendar", "1")
        .with_node(
            SerializedNode::new("e", calendar("Event"))
                .with_property(calendar("when"), Some("2024-05-01")),
        );

    let ignored = Deserializer::new(&registry)
        .deserialize(&chunk, &mut IgnoringHandler)
        .unwrap();
    assert_eq!(ignored.node("e").unwrap().property("when"), None);
    assert_eq!(
        outcomes(&ignored),
        vec![(AnomalyKind::UnknownDatatype, Outcome::Dropped)]
    );

    let healed = Deserializer::new(&registry)
        .deserialize(&chunk, &mut KeepRawDate)
        .unwrap();
    assert_eq!(
        healed.node("e").unwrap().property("when"),
        Some(&PropertyValue::Custom {
            ty: calendar("Date"),
            raw: "2024-05-01".into()
        })
    );
}

// Links

#[test]
fn test_invalid_link_value_drops_the_whole_link() {
    let result = resolve(
        vec![
            node("b", "Book").with_children(ptr("cover"), ["c1", "c2"]),
            node("lib", "Library").with_children(ptr("books"), ["w"]),
            node("c1", "Chapter"),
            node("c2", "Chapter"),
            node("w", "Writer"),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert!(result.node("b").unwrap().children("cover").is_empty());
    assert!(result.node("lib").unwrap().children("books").is_empty());
    assert_eq!(result.roots.len(), 5);
    assert_eq!(
        result.report.kinds(),
        vec![AnomalyKind::InvalidLinkValue, AnomalyKind::InvalidLinkValue]
    );
}

/// Keeps only the first value of an invalid link
struct KeepFirst;

impl AnomalyHandler for KeepFirst {
    fn invalid_link_value(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: &Feature,
        values: &LinkValues,
    ) -> Healing<LinkValues> {
        Ok(Some(match values {
            LinkValues::Children(children) => LinkValues::Children(children[..1].to_vec()),
            LinkValues::Targets(targets) => LinkValues::Targets(targets[..1].to_vec()),
        }))
    }
}

#[test]
fn test_invalid_link_value_healed_by_trimming() {
    let result = resolve(
        vec![
            node("b", "Book")
                .with_children(ptr("cover"), ["c1", "c2"])
                .with_targets(ptr("author"), ["w1", "w2"]),
            node("c1", "Chapter"),
            node("c2", "Chapter"),
            node("w1", "Writer"),
            node("w2", "Writer"),
        ],
        &mut KeepFirst,
    )
    .unwrap();

    let book = result.node("b").unwrap();
    assert_eq!(book.children("cover"), &[result.graph.lookup("c1").unwrap()]);
    assert_eq!(book.references("author").len(), 1);
    assert_eq!(
        book.references("author")[0].target,
        result.graph.lookup("w1")
    );
    assert_eq!(
        outcomes(&result),
        vec![
            (AnomalyKind::InvalidLinkValue, Outcome::Healed),
            (AnomalyKind::InvalidLinkValue, Outcome::Healed)
        ]
    );
}

#[test]
fn test_invalid_link_value_substitute_still_wrong_is_fatal() {
    let err = resolve(
        vec![
            node("lib", "Library").with_children(ptr("books"), ["w"]),
            node("w", "Writer"),
        ],
        &mut KeepFirst,
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::InvalidLinkValue);
}

fn split_single_links() -> Vec<SerializedNode> {
    vec![
        node("b", "Book")
            .with_children(ptr("cover"), ["c1"])
            .with_children(ptr("cover"), ["c2"])
            .with_targets(ptr("author"), ["w1"])
            .with_targets(ptr("author"), ["w2"]),
        node("c1", "Chapter"),
        node("c2", "Chapter"),
        node("w1", "Writer"),
        node("w2", "Writer"),
    ]
}

#[test]
fn test_single_valued_link_split_over_entries_is_invalid() {
    let result = resolve(split_single_links(), &mut IgnoringHandler).unwrap();

    let book = result.node("b").unwrap();
    assert!(book.children("cover").is_empty());
    assert!(book.references("author").is_empty());
    assert_eq!(
        outcomes(&result),
        vec![
            (AnomalyKind::InvalidLinkValue, Outcome::Dropped),
            (AnomalyKind::InvalidLinkValue, Outcome::Dropped)
        ]
    );

    let result = resolve(split_single_links(), &mut KeepFirst).unwrap();
    let book = result.node("b").unwrap();
    assert_eq!(book.children("cover"), &[result.graph.lookup("c1").unwrap()]);
    assert_eq!(
        book.references("author")
            .iter()
            .map(|r| r.target)
            .collect::<Vec<_>>(),
        vec![result.graph.lookup("w1")]
    );
    result.graph.verify_tree().unwrap();
}

#[test]
fn test_subtype_satisfies_link_type() {
    let result = resolve(
        vec![
            node("lib", "Library").with_children(ptr("books"), ["g"]),
            node("g", "GuideBook").with_targets(ptr("related"), ["g"]),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert!(result.report.is_clean());
    let guide = result.node("g").unwrap();
    assert_eq!(guide.parent(), result.graph.lookup("lib"));
    assert_eq!(guide.references("related")[0].target, result.graph.lookup("g"));
}

/// Creates the missing node on the fly
struct CreateMissing(Arc<Classifier>);

impl AnomalyHandler for CreateMissing {
    fn unresolvable_child(
        &mut self,
        graph: &mut NodeGraph,
        _: NodeRef,
        _: &Feature,
        child_id: &str,
    ) -> Healing<NodeRef> {
        graph
            .create_node(child_id, Arc::clone(&self.0))
            .map(Some)
            .map_err(|e| HandlerAbort::new(e.to_string()))
    }

    fn unresolvable_reference_target(
        &mut self,
        graph: &mut NodeGraph,
        _: NodeRef,
        _: &Feature,
        target: &ReferenceTarget,
    ) -> Healing<NodeRef> {
        let id = target.reference.as_deref().unwrap_or("anonymous");
        graph
            .create_node(id, Arc::clone(&self.0))
            .map(Some)
            .map_err(|e| HandlerAbort::new(e.to_string()))
    }
}

#[test]
fn test_unresolvable_child_healed_with_created_node() {
    let registry = registry();
    let result = resolve(
        vec![node("b", "Book").with_children(ptr("chapters"), ["lost"])],
        &mut CreateMissing(classifier(&registry, "Chapter")),
    )
    .unwrap();

    let lost = result.graph.lookup("lost").unwrap();
    assert_eq!(result.node("b").unwrap().children("chapters"), &[lost]);
    assert_eq!(result.graph[lost].parent(), result.graph.lookup("b"));
    assert_eq!(ids_of_roots(&result), vec!["b"]);
}

#[test]
fn test_unresolvable_child_substitute_of_wrong_type_is_fatal() {
    let registry = registry();
    let err = resolve(
        vec![node("b", "Book").with_children(ptr("chapters"), ["lost"])],
        &mut CreateMissing(classifier(&registry, "Writer")),
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::UnresolvableChild);
}

#[test]
fn test_unresolvable_reference_target_healed() {
    let registry = registry();
    let result = resolve(
        vec![node("b", "Book").with_targets(ptr("author"), ["anon"])],
        &mut CreateMissing(classifier(&registry, "Writer")),
    )
    .unwrap();

    let book = result.node("b").unwrap();
    assert_eq!(book.references("author")[0].target, result.graph.lookup("anon"));
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnresolvableReferenceTarget, Outcome::Healed)]
    );
}

#[test]
fn test_reference_entries_keep_resolve_info() {
    let result = resolve(
        vec![
            node("b", "Book")
                .with_reference_entries(
                    ptr("related"),
                    vec![
                        ReferenceTarget::to("b2"),
                        ReferenceTarget::unresolved("Some Other Book"),
                    ],
                ),
            named("b2", "Book", "Dune"),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    let related = result.node("b").unwrap().references("related");
    assert_eq!(related.len(), 2);
    assert_eq!(related[0].target, result.graph.lookup("b2"));
    assert_eq!(related[1].target, None);
    assert_eq!(related[1].resolve_info.as_deref(), Some("Some Other Book"));
    assert!(result.report.is_clean());
}

fn ids_of_roots(result: &Deserialized) -> Vec<String> {
    result
        .root_nodes()
        .map(|n| n.id().to_string())
        .collect()
}

// Annotations

#[test]
fn test_annotations_checked_against_their_targets() {
    let result = resolve(
        vec![
            node("b", "Book").with_annotation("c1").with_annotation("t1"),
            node("lib", "Library")
                .with_annotation("c2")
                .with_annotation("t2")
                .with_annotation("ch"),
            node("c1", "Comment"),
            node("c2", "Comment"),
            node("t1", "Tag"),
            node("t2", "Tag"),
            node("ch", "Chapter"),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    let book = result.node("b").unwrap();
    let lib = result.node("lib").unwrap();
    let refs = |ids: &[&str]| -> Vec<NodeRef> {
        ids.iter().map(|id| result.graph.lookup(id).unwrap()).collect()
    };
    assert_eq!(book.annotations(), refs(&["c1", "t1"]).as_slice());
    assert_eq!(lib.annotations(), refs(&["t2"]).as_slice());
    assert_eq!(
        result.report.kinds(),
        vec![AnomalyKind::InvalidAnnotation, AnomalyKind::InvalidAnnotation]
    );
    assert_eq!(ids_of_roots(&result), vec!["b", "lib", "c2", "ch"]);
}

#[test]
fn test_unresolvable_annotation_is_dropped() {
    let result = resolve(
        vec![node("b", "Book").with_annotation("missing")],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert!(result.node("b").unwrap().annotations().is_empty());
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnresolvableAnnotation, Outcome::Dropped)]
    );
}

/// Replaces an invalid annotation with a fixed node
struct UseAnnotation(&'static str);

impl AnomalyHandler for UseAnnotation {
    fn invalid_annotation(
        &mut self,
        graph: &NodeGraph,
        _: NodeRef,
        _: NodeRef,
    ) -> Healing<NodeRef> {
        Ok(graph.lookup(self.0))
    }
}

#[test]
fn test_invalid_annotation_healed_and_revalidated() {
    let records = || {
        vec![
            node("lib", "Library").with_annotation("c"),
            node("c", "Comment"),
            node("t", "Tag"),
        ]
    };

    let healed = resolve(records(), &mut UseAnnotation("t")).unwrap();
    assert_eq!(
        healed.node("lib").unwrap().annotations(),
        &[healed.graph.lookup("t").unwrap()]
    );

    let err = resolve(records(), &mut UseAnnotation("c")).unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::InvalidAnnotation);
}

// Parents

#[test]
fn test_unresolvable_parent_keeps_node_as_root() {
    let result = resolve(
        vec![named("c", "Chapter", "Intro").with_parent("gone")],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert_eq!(ids_of_roots(&result), vec!["c"]);
    assert_eq!(result.node("c").unwrap().declared_parent(), Some("gone"));
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnresolvableParent, Outcome::Dropped)]
    );
}

/// Re-parents orphans under a fixed node
struct AdoptInto(&'static str);

impl AnomalyHandler for AdoptInto {
    fn unresolvable_parent(
        &mut self,
        graph: &mut NodeGraph,
        _: NodeRef,
        _: &str,
    ) -> Healing<NodeRef> {
        Ok(graph.lookup(self.0))
    }
}

#[test]
fn test_unresolvable_parent_healed_into_first_accepting_containment() {
    let result = resolve(
        vec![
            node("b", "Book").with_children(ptr("cover"), ["c0"]),
            node("c0", "Chapter"),
            node("c", "Chapter").with_parent("gone"),
        ],
        &mut AdoptInto("b"),
    )
    .unwrap();

    let book = result.node("b").unwrap();
    let c = result.graph.lookup("c").unwrap();
    assert_eq!(book.children("chapters"), &[c]);
    assert_eq!(ids_of_roots(&result), vec!["b"]);
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnresolvableParent, Outcome::Healed)]
    );
}

#[test]
fn test_unresolvable_parent_substitute_without_room_is_fatal() {
    let err = resolve(
        vec![node("w", "Writer"), node("c", "Chapter").with_parent("gone")],
        &mut AdoptInto("w"),
    )
    .unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::UnresolvableParent);
}

#[test]
fn test_declared_parent_mismatch_is_not_an_anomaly() {
    let result = resolve(
        vec![
            node("b1", "Book").with_children(ptr("chapters"), ["c"]),
            node("b2", "Book"),
            node("c", "Chapter").with_parent("b2"),
            node("d", "Chapter").with_parent("b2"),
        ],
        &mut IgnoringHandler,
    )
    .unwrap();

    assert!(result.report.is_clean());
    assert_eq!(result.node("c").unwrap().parent(), result.graph.lookup("b1"));
    assert_eq!(ids_of_roots(&result), vec!["b1", "b2", "d"]);
}

fn contained_with_missing_parent() -> Vec<SerializedNode> {
    vec![
        node("b1", "Book").with_children(ptr("chapters"), ["c"]),
        node("b2", "Book"),
        node("c", "Chapter").with_parent("gone"),
    ]
}

#[test]
fn test_missing_parent_of_contained_node_is_reported() {
    let mut handler = RecordingHandler::new(IgnoringHandler);
    let result = resolve(contained_with_missing_parent(), &mut handler).unwrap();

    assert_eq!(handler.seen(), &[AnomalyKind::UnresolvableParent]);
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnresolvableParent, Outcome::Dropped)]
    );
    assert_eq!(result.node("c").unwrap().parent(), result.graph.lookup("b1"));
    assert_eq!(ids_of_roots(&result), vec!["b1", "b2"]);
}

#[test]
fn test_missing_parent_of_contained_node_accepts_only_current_parent() {
    let result = resolve(contained_with_missing_parent(), &mut AdoptInto("b1")).unwrap();
    assert_eq!(
        outcomes(&result),
        vec![(AnomalyKind::UnresolvableParent, Outcome::Healed)]
    );
    assert_eq!(result.node("c").unwrap().parent(), result.graph.lookup("b1"));

    let err = resolve(contained_with_missing_parent(), &mut AdoptInto("b2")).unwrap_err();
    assert_invalid_substitute(&err, AnomalyKind::UnresolvableParent);
}

// Duplicate ids

/// Renames every collision to the same id
struct Stubborn;

impl AnomalyHandler for Stubborn {
    fn duplicate_node_id(&mut self, _: &NodeGraph, _: NodeRef, _: &Node) -> Healing<String> {
        Ok(Some("A".to_string()))
    }
}

#[test]
fn test_duplicate_id_retries_are_bounded() {
    init_tracing();
    let registry = registry();
    let chunk = chunk(vec![node("A", "Book"), node("A", "Book")]);

    let err = Deserializer::new(&registry)
        .deserialize(&chunk, &mut Stubborn)
        .unwrap_err();
    assert!(matches!(
        err,
        DeserializationError::DuplicateIdRetriesExhausted { attempts: 8, .. }
    ));

    let err = Deserializer::new(&registry)
        .with_config(DeserializerConfig::new().with_max_duplicate_id_retries(2))
        .deserialize(&chunk, &mut Stubborn)
        .unwrap_err();
    assert!(matches!(
        err,
        DeserializationError::DuplicateIdRetriesExhausted { attempts: 2, .. }
    ));
}

#[test]
fn test_distinct_ids_never_collide() {
    let result = resolve(
        vec![
            node("abc", "Book"),
            node("abd", "Book"),
            node("a", "Book"),
            node("a-b_c", "Book"),
            node("a b", "Book"),
        ],
        &mut StrictHandler,
    )
    .unwrap();
    assert_eq!(result.graph.len(), 5);
}

/// Aborts with a custom message
struct Veto;

impl AnomalyHandler for Veto {
    fn duplicate_containment(
        &mut self,
        _: &NodeGraph,
        _: NodeRef,
        _: NodeRef,
        _: NodeRef,
    ) -> Result<bool, HandlerAbort> {
        Err(HandlerAbort::new("books may not move"))
    }
}

#[test]
fn test_handler_abort_carries_reason() {
    let err = resolve(
        vec![
            node("L1", "Library").with_children(ptr("books"), ["b"]),
            node("L2", "Library").with_children(ptr("books"), ["b"]),
            node("b", "Book"),
        ],
        &mut Veto,
    )
    .unwrap_err();

    assert!(err.to_string().contains("books may not move"));
    assert_eq!(
        err.anomaly().map(Anomaly::kind),
        Some(AnomalyKind::DuplicateContainment)
    );
}
