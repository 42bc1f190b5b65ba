//! Unit tests for syllabus-core

use std::sync::Arc;

use crate::test_utils::{conformance, new_course, new_topic, sample_seed};
use crate::*;

fn memory_kb() -> KnowledgeBase {
    KnowledgeBase::new(Arc::new(MemoryStore::new()))
}

/// A writable graph with course 1 and topics `a`, `b`.
fn kb_with_graph() -> (KnowledgeBase, String) {
    let kb = memory_kb();
    let graph = kb
        .create_graph(&NewGraph {
            name: "G".into(),
            ..Default::default()
        })
        .unwrap();
    kb.create_course(&graph.id, &new_course("Math", "#111111")).unwrap();
    kb.create_topic(&graph.id, &new_topic("a", "Alpha", 1)).unwrap();
    kb.create_topic(&graph.id, &new_topic("b", "Beta", 1)).unwrap();
    (kb, graph.id)
}

#[test]
fn test_memory_store_conformance() {
    conformance::run_all(|| Arc::new(MemoryStore::new()));
}

// ── Graph registry ──────────────────────────────────────────

#[test]
fn test_create_graph_requires_name() {
    let kb = memory_kb();
    let err = kb
        .create_graph(&NewGraph {
            name: "   ".into(),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err, KgError::Validation("Name is required".into()));
}

#[test]
fn test_graph_name_stored_as_given() {
    let kb = memory_kb();
    let graph = kb
        .create_graph(&NewGraph {
            name: "  Physics  ".into(),
            description: Some("notes".into()),
            copy_from_graph_id: None,
        })
        .unwrap();
    assert_eq!(graph.name, "  Physics  ");
    assert_eq!(graph.description.as_deref(), Some("notes"));
    assert!(graph.source_graph_id.is_none());
    assert_eq!(kb.get_graph(&graph.id).unwrap().name, "  Physics  ");

    let patch = GraphPatch {
        name: Some(" Optics".into()),
        description: None,
    };
    assert_eq!(kb.update_graph(&graph.id, &patch).unwrap().name, " Optics");
}

#[test]
fn test_copy_from_missing_graph() {
    let kb = memory_kb();
    let err = kb
        .create_graph(&NewGraph {
            name: "copy".into(),
            description: None,
            copy_from_graph_id: Some("nope".into()),
        })
        .unwrap_err();
    assert_eq!(err, KgError::GraphNotFound("nope".into()));
    assert!(kb.list_graphs().unwrap().is_empty());
}

#[test]
fn test_copy_of_readonly_graph_is_writable() {
    let kb = memory_kb();
    let default = kb.bootstrap(Some(&sample_seed())).unwrap();

    let copy = kb
        .create_graph(&NewGraph {
            name: "Fork".into(),
            description: None,
            copy_from_graph_id: Some(default.id.clone()),
        })
        .unwrap();
    assert_eq!(copy.source_graph_id.as_deref(), Some(default.id.as_str()));

    let source = kb.graph_stats(&default.id).unwrap();
    let forked = kb.graph_stats(&copy.id).unwrap();
    assert_eq!(source, forked);

    kb.delete_topic(&copy.id, "numbers").unwrap();
    assert_eq!(kb.graph_stats(&default.id).unwrap().topics, 3);
}

#[test]
fn test_update_graph() {
    let (kb, graph_id) = kb_with_graph();
    let patch = GraphPatch {
        name: None,
        description: Some("described".into()),
    };
    let updated = kb.update_graph(&graph_id, &patch).unwrap();
    assert_eq!(updated.name, "G");
    assert_eq!(updated.description.as_deref(), Some("described"));

    let blank = GraphPatch {
        name: Some(" ".into()),
        description: None,
    };
    assert_eq!(kb.update_graph(&graph_id, &blank).unwrap_err().code(), "VALIDATION_ERROR");
    assert_eq!(
        kb.update_graph("missing", &patch).unwrap_err(),
        KgError::GraphNotFound("missing".into())
    );
}

#[test]
fn test_readonly_graph_rejects_every_mutation() {
    let kb = memory_kb();
    let default = kb.bootstrap(Some(&sample_seed())).unwrap();
    let g = default.id.as_str();

    let failures = [
        kb.update_graph(g, &GraphPatch::default()).map(|_| ()),
        kb.create_course(g, &new_course("X", "#000000")).map(|_| ()),
        kb.update_course(g, 1, &CoursePatch::default()).map(|_| ()),
        kb.delete_course(g, 1),
        kb.create_topic(g, &new_topic("x", "X", 1)).map(|_| ()),
        kb.update_topic(g, "numbers", &TopicPatch::default()).map(|_| ()),
        kb.delete_topic(g, "numbers"),
        kb.create_edge(g, &NewEdge::new("limits", "numbers")).map(|_| ()),
        kb.delete_edge(g, "numbers", "fractions"),
        kb.apply_batch(g, &BatchOperations::default()).map(|_| ()),
    ];
    for outcome in failures {
        assert_eq!(outcome.unwrap_err(), KgError::ReadonlyGraph);
    }
    assert_eq!(kb.list_edges(g).unwrap().len(), 3);
}

#[test]
fn test_delete_graph_guard_order() {
    let kb = memory_kb();
    let default = kb.bootstrap(None).unwrap();
    assert_eq!(kb.delete_graph(&default.id).unwrap_err(), KgError::CannotDeleteDefault);
    assert_eq!(
        kb.delete_graph("missing").unwrap_err(),
        KgError::GraphNotFound("missing".into())
    );
}

#[test]
fn test_bootstrap_runs_once() {
    let kb = memory_kb();
    let seeded = kb.bootstrap(Some(&sample_seed())).unwrap();
    assert_eq!(seeded.name, DEFAULT_GRAPH_NAME);
    assert_eq!(seeded.description.as_deref(), Some("Imported from scraper database"));

    let again = kb.bootstrap(Some(&sample_seed())).unwrap();
    assert_eq!(again.id, seeded.id);
    assert_eq!(kb.list_graphs().unwrap().len(), 1);
    assert_eq!(kb.list_topics(&seeded.id).unwrap().len(), 3);
}

#[test]
fn test_bootstrap_without_seed() {
    let kb = memory_kb();
    let graph = kb.bootstrap(None).unwrap();
    assert!(graph.is_default && graph.is_readonly);
    assert_eq!(graph.description.as_deref(), Some("Default knowledge graph"));
    assert!(kb.list_topics(&graph.id).unwrap().is_empty());
    assert_eq!(kb.resolve_graph("default").unwrap().id, graph.id);
}

// ── Consistency engine ──────────────────────────────────────

#[test]
fn test_course_validation() {
    let (kb, g) = kb_with_graph();
    let err = kb.create_course(&g, &new_course("", "#000000")).unwrap_err();
    assert_eq!(err, KgError::Validation("Name is required".into()));
    let err = kb.create_course(&g, &new_course("Art", "")).unwrap_err();
    assert_eq!(err, KgError::Validation("Color is required".into()));

    let course = kb.create_course(&g, &new_course("  Art ", "#222222")).unwrap();
    assert_eq!(course.name, "Art");
    assert_eq!(course.course_id, 2);

    let patch = CoursePatch {
        name: Some("".into()),
        color: None,
    };
    assert_eq!(kb.update_course(&g, 2, &patch).unwrap_err().code(), "VALIDATION_ERROR");
    let patch = CoursePatch {
        name: None,
        color: Some(String::new()),
    };
    assert_eq!(kb.update_course(&g, 2, &patch).unwrap_err().code(), "VALIDATION_ERROR");
    assert_eq!(
        kb.update_course(&g, 42, &CoursePatch::default()).unwrap_err(),
        KgError::CourseNotFound(42)
    );
    assert_eq!(kb.delete_course(&g, 42).unwrap_err(), KgError::CourseNotFound(42));
}

#[test]
fn test_blank_color_is_not_empty() {
    let (kb, g) = kb_with_graph();
    let course = kb.create_course(&g, &new_course("Art", "  ")).unwrap();
    assert_eq!(course.color, "  ");

    let patch = CoursePatch {
        name: None,
        color: Some(" ".into()),
    };
    assert_eq!(kb.update_course(&g, course.course_id, &patch).unwrap().color, " ");
}

#[test]
fn test_deleting_course_keeps_topics() {
    let (kb, g) = kb_with_graph();
    kb.delete_course(&g, 1).unwrap();
    let topic = kb.get_topic(&g, "a").unwrap();
    assert_eq!(topic.course_id, 1);
    assert_eq!(
        kb.get_course(&g, 1).unwrap_err(),
        KgError::CourseNotFound(1)
    );
}

#[test]
fn test_create_topic_checks() {
    let (kb, g) = kb_with_graph();

    let err = kb.create_topic(&g, &new_topic("", "Nameless", 1)).unwrap_err();
    assert_eq!(err, KgError::Validation("URL slug is required".into()));
    let err = kb.create_topic(&g, &new_topic("c", " ", 1)).unwrap_err();
    assert_eq!(err, KgError::Validation("Display name is required".into()));
    let err = kb.create_topic(&g, &new_topic("c", "Gamma", 9)).unwrap_err();
    assert_eq!(err, KgError::CourseNotFound(9));
    let err = kb.create_topic(&g, &new_topic("a", "Again", 1)).unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_ENTRY");
    assert_eq!(err.to_string(), "Topic with slug a already exists");
}

#[test]
fn test_create_then_get_has_content() {
    let (kb, g) = kb_with_graph();
    let mut request = new_topic("c", "Gamma", 1);
    request.content_html = Some("<h1>Gamma</h1>".into());
    kb.create_topic(&g, &request).unwrap();

    let topic = kb.get_topic(&g, "c").unwrap();
    assert!(topic.has_content);
    assert_eq!(topic.content_html.as_deref(), Some("<h1>Gamma</h1>"));
    assert!(!kb.get_topic(&g, "a").unwrap().has_content);
}

#[test]
fn test_update_topic_checks() {
    let (kb, g) = kb_with_graph();
    let bad_course = TopicPatch {
        course_id: Some(5),
        ..Default::default()
    };
    assert_eq!(kb.update_topic(&g, "a", &bad_course).unwrap_err(), KgError::CourseNotFound(5));

    let missing = kb.update_topic(&g, "zzz", &TopicPatch::default()).unwrap_err();
    assert_eq!(missing, KgError::TopicNotFound("zzz".into()));

    let blank = TopicPatch {
        display_name: Some("".into()),
        ..Default::default()
    };
    assert_eq!(kb.update_topic(&g, "a", &blank).unwrap_err().code(), "VALIDATION_ERROR");

    let text = TopicPatch {
        content_text: Some("now with text".into()),
        ..Default::default()
    };
    let updated = kb.update_topic(&g, "a", &text).unwrap();
    assert!(updated.has_content);
    assert_eq!(updated.display_name, "Alpha");
}

#[test]
fn test_edge_lifecycle() {
    let (kb, g) = kb_with_graph();

    kb.create_edge(&g, &NewEdge::new("a", "b")).unwrap();
    assert_eq!(kb.get_topic(&g, "b").unwrap().parent_slugs, vec!["a"]);

    let err = kb.create_edge(&g, &NewEdge::new("a", "b")).unwrap_err();
    assert_eq!(err.to_string(), "Edge from a to b already exists");
    assert_eq!(err.code(), "DUPLICATE_ENTRY");

    kb.delete_edge(&g, "a", "b").unwrap();
    assert!(kb.get_topic(&g, "b").unwrap().parent_slugs.is_empty());

    let err = kb.delete_edge(&g, "a", "b").unwrap_err();
    assert_eq!(err.code(), "EDGE_NOT_FOUND");
}

#[test]
fn test_edge_validation() {
    let (kb, g) = kb_with_graph();
    let err = kb.create_edge(&g, &NewEdge::new("a", "a")).unwrap_err();
    assert_eq!(err, KgError::Validation("Cannot create self-referencing edge".into()));

    let err = kb.create_edge(&g, &NewEdge::new("ghost", "a")).unwrap_err();
    assert_eq!(err, KgError::TopicNotFound("ghost".into()));
    let err = kb.create_edge(&g, &NewEdge::new("a", "ghost")).unwrap_err();
    assert_eq!(err, KgError::TopicNotFound("ghost".into()));

    let err = kb.create_edge(&g, &NewEdge::new("", "a")).unwrap_err();
    assert_eq!(err.code(), "VALIDATION_ERROR");
}

#[test]
fn test_cycles_are_permitted() {
    let (kb, g) = kb_with_graph();
    kb.create_edge(&g, &NewEdge::new("a", "b")).unwrap();
    kb.create_edge(&g, &NewEdge::new("b", "a")).unwrap();
    assert_eq!(kb.get_topic(&g, "a").unwrap().parent_slugs, vec!["b"]);
    assert_eq!(kb.get_topic(&g, "b").unwrap().parent_slugs, vec!["a"]);
}

// ── Query facade ────────────────────────────────────────────

#[test]
fn test_prerequisites_and_dependents() {
    let (kb, g) = kb_with_graph();
    kb.create_topic(&g, &new_topic("c", "Gamma", 1)).unwrap();
    kb.create_edge(&g, &NewEdge::new("b", "c")).unwrap();
    kb.create_edge(&g, &NewEdge::new("a", "c")).unwrap();

    let prereqs: Vec<String> = kb
        .topic_prerequisites(&g, "c")
        .unwrap()
        .into_iter()
        .map(|t| t.url_slug)
        .collect();
    assert_eq!(prereqs, vec!["b", "a"]);

    let dependents = kb.topic_dependents(&g, "a").unwrap();
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].url_slug, "c");

    kb.delete_topic(&g, "a").unwrap();
    assert_eq!(kb.topic_prerequisites(&g, "a").unwrap_err().code(), "TOPIC_NOT_FOUND");
    assert_eq!(kb.topic_dependents(&g, "a").unwrap_err().code(), "TOPIC_NOT_FOUND");
}

#[test]
fn test_full_graph_data_strips_html() {
    let (kb, g) = kb_with_graph();
    let patch = TopicPatch {
        content_html: Some("<p>secret</p>".into()),
        content_text: Some("secret".into()),
        ..Default::default()
    };
    kb.update_topic(&g, "a", &patch).unwrap();
    kb.create_edge(&g, &NewEdge::new("a", "b")).unwrap();

    let data = kb.full_graph_data(&g).unwrap();
    assert_eq!(data.graph.id, g);
    assert_eq!(data.courses.len(), 1);
    assert_eq!(data.edges.len(), 1);
    assert!(data.topics.iter().all(|t| t.content_html.is_none()));
    assert_eq!(data.topics[0].content_text.as_deref(), Some("secret"));

    let json = serde_json::to_value(&data).unwrap();
    assert!(json["topics"][0].get("graphId").is_none());
    assert!(json["courses"][0].get("graphId").is_none());
    assert!(json["graph"].get("isDefault").is_some());
}

#[test]
fn test_graph_stats() {
    let kb = memory_kb();
    let default = kb.bootstrap(Some(&sample_seed())).unwrap();
    let stats = kb.graph_stats(&default.id).unwrap();
    assert_eq!(
        stats,
        GraphStats {
            courses: 2,
            topics: 3,
            edges: 3,
            topics_with_content: 2,
            root_topics: 1,
            leaf_topics: 1,
        }
    );
}

#[test]
fn test_reads_on_missing_graph() {
    let kb = memory_kb();
    assert_eq!(kb.list_topics("nope").unwrap_err().code(), "GRAPH_NOT_FOUND");
    assert_eq!(kb.full_graph_data("nope").unwrap_err().code(), "GRAPH_NOT_FOUND");
    assert_eq!(kb.get_edge("nope", "a", "b").unwrap_err().code(), "GRAPH_NOT_FOUND");
}

// ── Batch processor ─────────────────────────────────────────

#[test]
fn test_batch_creates_dependencies_first() {
    let (kb, g) = kb_with_graph();
    let ops: BatchOperations = serde_json::from_value(serde_json::json!({
        "edges": { "create": [{ "parentSlug": "x", "childSlug": "y" }] },
        "topics": {
            "create": [
                { "urlSlug": "x", "displayName": "X", "courseId": 2 },
                { "urlSlug": "y", "displayName": "Y", "courseId": 2 }
            ]
        },
        "courses": { "create": [{ "name": "Physics", "color": "#00f" }] }
    }))
    .unwrap();

    let result = kb.apply_batch(&g, &ops).unwrap();
    assert_eq!(result.courses_created, 1);
    assert_eq!(result.topics_created, 2);
    assert_eq!(result.edges_created, 1);
    assert!(result.failures.is_empty());
    assert_eq!(kb.get_topic(&g, "y").unwrap().parent_slugs, vec!["x"]);
}

#[test]
fn test_batch_updates_run_last() {
    let (kb, g) = kb_with_graph();
    let ops: BatchOperations = serde_json::from_value(serde_json::json!({
        "courses": {
            "create": [{ "name": "Physics", "color": "#00f" }],
            "update": [{ "courseId": 2, "data": { "color": "#0f0" } }]
        },
        "topics": {
            "update": [{ "urlSlug": "a", "data": { "courseId": 2 } }]
        }
    }))
    .unwrap();

    let result = kb.apply_batch(&g, &ops).unwrap();
    assert_eq!(result.courses_updated, 1);
    assert_eq!(result.topics_updated, 1);
    assert_eq!(kb.get_course(&g, 2).unwrap().color, "#0f0");
    assert_eq!(kb.get_topic(&g, "a").unwrap().course_id, 2);
}

#[test]
fn test_batch_swallows_item_failures() {
    let (kb, g) = kb_with_graph();
    let ops: BatchOperations = serde_json::from_value(serde_json::json!({
        "topics": {
            "create": [
                { "urlSlug": "a", "displayName": "Dup", "courseId": 1 },
                { "urlSlug": "c", "displayName": "Gamma", "courseId": 1 }
            ],
            "delete": ["ghost"]
        },
        "edges": { "create": [{ "parentSlug": "c", "childSlug": "c" }] }
    }))
    .unwrap();

    let result = kb.apply_batch(&g, &ops).unwrap();
    assert_eq!(result.topics_created, 1);
    assert_eq!(result.topics_deleted, 0);
    assert_eq!(result.edges_created, 0);

    let failures: Vec<(BatchCategory, BatchAction, &str, &str)> = result
        .failures
        .iter()
        .map(|f| (f.category, f.action, f.key.as_str(), f.code.as_str()))
        .collect();
    assert_eq!(
        failures,
        vec![
            (BatchCategory::Topics, BatchAction::Delete, "ghost", "TOPIC_NOT_FOUND"),
            (BatchCategory::Topics, BatchAction::Create, "a", "DUPLICATE_ENTRY"),
            (BatchCategory::Edges, BatchAction::Create, "c->c", "VALIDATION_ERROR"),
        ]
    );
}

#[test]
fn test_batch_result_wire_shape() {
    let result = BatchResult {
        edges_deleted: 1,
        topics_deleted: 1,
        ..Default::default()
    };
    insta::assert_json_snapshot!(result, @r###"
    {
      "coursesCreated": 0,
      "coursesUpdated": 0,
      "coursesDeleted": 0,
      "topicsCreated": 0,
      "topicsUpdated": 0,
      "topicsDeleted": 1,
      "edgesCreated": 0,
      "edgesDeleted": 1,
      "failures": []
    }
    "###);
}

#[test]
fn test_empty_batch_is_noop() {
    let (kb, g) = kb_with_graph();
    let ops: BatchOperations = serde_json::from_str("{}").unwrap();
    assert_eq!(kb.apply_batch(&g, &ops).unwrap(), BatchResult::default());
    assert_eq!(
        kb.apply_batch("nope", &ops).unwrap_err(),
        KgError::GraphNotFound("nope".into())
    );
}
