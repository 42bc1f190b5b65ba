//! Test utilities for Syllabus
//!
//! Fixtures plus a conformance suite that every [`GraphStore`] engine runs
//! against itself, so the in-memory and relational engines stay
//! interchangeable.

use std::sync::Arc;

use crate::error::KgError;
use crate::model::*;
use crate::seed::{SeedCourse, SeedData, SeedEdge, SeedTopic};
use crate::service::KnowledgeBase;
use crate::store::GraphStore;

/// Insert a fresh writable graph and return it.
pub fn writable_graph(store: &dyn GraphStore, name: &str) -> KnowledgeGraph {
    let graph = KnowledgeGraph::new(name, None);
    store.create_graph(&graph, None).unwrap();
    graph
}

pub fn new_course(name: &str, color: &str) -> NewCourse {
    NewCourse {
        name: name.to_string(),
        color: color.to_string(),
    }
}

pub fn new_topic(slug: &str, display_name: &str, course_id: i64) -> NewTopic {
    NewTopic {
        url_slug: slug.to_string(),
        display_name: display_name.to_string(),
        course_id,
        content_html: None,
        content_text: None,
    }
}

/// A writable graph with course 1 and topics `a`, `b`, `c` (no edges).
pub fn graph_with_topics(store: &dyn GraphStore) -> KnowledgeGraph {
    let graph = writable_graph(store, "fixture");
    store.insert_course(&graph.id, &new_course("Math", "#111111")).unwrap();
    for (slug, name) in [("a", "Alpha"), ("b", "Beta"), ("c", "Gamma")] {
        store.insert_topic(&graph.id, &new_topic(slug, name, 1)).unwrap();
    }
    graph
}

/// Seed rows with a self-loop, a repeated edge and an edge to an unknown slug.
pub fn sample_seed() -> SeedData {
    SeedData {
        courses: vec![
            SeedCourse { course_id: 1, name: "Algebra".into(), color: "#ff0000".into() },
            SeedCourse { course_id: 2, name: "Calculus".into(), color: "#00ff00".into() },
        ],
        topics: vec![
            SeedTopic {
                url_slug: "numbers".into(),
                display_name: "Numbers".into(),
                course_id: 1,
                content_html: Some("<p>Numbers</p>".into()),
                content_text: Some("Numbers".into()),
            },
            SeedTopic {
                url_slug: "fractions".into(),
                display_name: "Fractions".into(),
                course_id: 1,
                content_html: None,
                content_text: None,
            },
            SeedTopic {
                url_slug: "limits".into(),
                display_name: "Limits".into(),
                course_id: 2,
                content_html: None,
                content_text: Some("Limits".into()),
            },
        ],
        edges: vec![
            SeedEdge { parent_slug: "numbers".into(), child_slug: "fractions".into() },
            SeedEdge { parent_slug: "fractions".into(), child_slug: "limits".into() },
            SeedEdge { parent_slug: "numbers".into(), child_slug: "limits".into() },
            SeedEdge { parent_slug: "limits".into(), child_slug: "limits".into() },
            SeedEdge { parent_slug: "numbers".into(), child_slug: "fractions".into() },
            SeedEdge { parent_slug: "ghost".into(), child_slug: "limits".into() },
        ],
    }
}

fn slugs(topics: &[Topic]) -> Vec<&str> {
    topics.iter().map(|t| t.url_slug.as_str()).collect()
}

fn parents(store: &dyn GraphStore, graph_id: &str, slug: &str) -> Vec<String> {
    store.get_topic(graph_id, slug).unwrap().unwrap().parent_slugs
}

/// Checks every engine must pass. Each check gets a store from `factory`.
pub mod conformance {
    use super::*;

    pub type Check = fn(Arc<dyn GraphStore>);

    pub const CHECKS: &[(&str, Check)] = &[
        ("course_ids_are_sequential", course_ids_are_sequential),
        ("parent_slugs_track_edges", parent_slugs_track_edges),
        ("delete_topic_cascades", delete_topic_cascades),
        ("has_content_is_recomputed", has_content_is_recomputed),
        ("duplicates_are_rejected", duplicates_are_rejected),
        ("copy_is_deep", copy_is_deep),
        ("seed_import_rebuilds_parents", seed_import_rebuilds_parents),
        ("seed_repeats_keep_first_row", seed_repeats_keep_first_row),
        ("listing_orders", listing_orders),
        ("delete_graph_cascades", delete_graph_cascades),
        ("relationship_reads", relationship_reads),
        ("service_guards", service_guards),
        ("batch_ordering", batch_ordering),
    ];

    /// Run every check, each against a fresh store.
    pub fn run_all(factory: impl Fn() -> Arc<dyn GraphStore>) {
        for (name, check) in CHECKS {
            let store = factory();
            eprintln!("conformance [{}] {}", store.kind(), name);
            check(store);
        }
    }

    pub fn course_ids_are_sequential(store: Arc<dyn GraphStore>) {
        let graph = writable_graph(store.as_ref(), "G");
        let first = store.insert_course(&graph.id, &new_course("Math", "#111111")).unwrap();
        let second = store.insert_course(&graph.id, &new_course("Physics", "#222222")).unwrap();
        assert_eq!((first.course_id, second.course_id), (1, 2));

        // Numbering is per graph.
        let other = writable_graph(store.as_ref(), "H");
        assert_eq!(store.insert_course(&other.id, &new_course("Art", "#333333")).unwrap().course_id, 1);

        // A freed id is not handed out again.
        assert!(store.delete_course(&graph.id, 2).unwrap());
        let third = store.insert_course(&graph.id, &new_course("Chemistry", "#444444")).unwrap();
        assert_eq!(third.course_id, 3);

        let patched = store
            .update_course(&graph.id, 1, &CoursePatch { name: None, color: Some("#abcdef".into()) })
            .unwrap()
            .unwrap();
        assert_eq!(patched.name, "Math");
        assert_eq!(patched.color, "#abcdef");
        assert!(store.update_course(&graph.id, 99, &CoursePatch::default()).unwrap().is_none());

        let ids: Vec<i64> = store.list_courses(&graph.id).unwrap().iter().map(|c| c.course_id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    pub fn parent_slugs_track_edges(store: Arc<dyn GraphStore>) {
        let graph = graph_with_topics(store.as_ref());
        let g = graph.id.as_str();

        store.insert_edge(g, &NewEdge::new("a", "c")).unwrap();
        store.insert_edge(g, &NewEdge::new("b", "c")).unwrap();
        assert_eq!(parents(store.as_ref(), g, "c"), vec!["a", "b"]);

        assert!(store.delete_edge(g, "a", "c").unwrap());
        assert_eq!(parents(store.as_ref(), g, "c"), vec!["b"]);
        assert!(!store.delete_edge(g, "a", "c").unwrap());

        store.insert_edge(g, &NewEdge::new("a", "c")).unwrap();
        assert_eq!(parents(store.as_ref(), g, "c"), vec!["b", "a"]);
        assert!(parents(store.as_ref(), g, "a").is_empty());
    }

    pub fn delete_topic_cascades(store: Arc<dyn GraphStore>) {
        let graph = graph_with_topics(store.as_ref());
        let g = graph.id.as_str();
        for (p, c) in [("a", "b"), ("b", "c"), ("a", "c")] {
            store.insert_edge(g, &NewEdge::new(p, c)).unwrap();
        }

        assert!(store.delete_topic(g, "b").unwrap());
        assert!(store.get_topic(g, "b").unwrap().is_none());
        assert!(!store.delete_topic(g, "b").unwrap());

        let edges: Vec<(String, String)> = store
            .list_edges(g)
            .unwrap()
            .into_iter()
            .map(|e| (e.parent_slug, e.child_slug))
            .collect();
        assert_eq!(edges, vec![("a".to_string(), "c".to_string())]);
        assert_eq!(parents(store.as_ref(), g, "c"), vec!["a"]);
        assert!(store.dependents(g, "b").unwrap().is_empty());
    }

    pub fn has_content_is_recomputed(store: Arc<dyn GraphStore>) {
        let graph = writable_graph(store.as_ref(), "G");
        let g = graph.id.as_str();
        store.insert_course(g, &new_course("Math", "#111111")).unwrap();

        let mut request = new_topic("t", "Topic", 1);
        request.content_text = Some(String::new());
        let created = store.insert_topic(g, &request).unwrap();
        assert!(!created.has_content);
        assert!(created.parent_slugs.is_empty());

        let patch = TopicPatch { content_html: Some("<p>hi</p>".into()), ..Default::default() };
        assert!(store.update_topic(g, "t", &patch).unwrap().unwrap().has_content);

        // Untouched content still counts.
        let patch = TopicPatch { display_name: Some("Renamed".into()), ..Default::default() };
        let updated = store.update_topic(g, "t", &patch).unwrap().unwrap();
        assert!(updated.has_content);
        assert_eq!(updated.display_name, "Renamed");
        assert_eq!(updated.content_html.as_deref(), Some("<p>hi</p>"));

        assert!(store.update_topic(g, "missing", &TopicPatch::default()).unwrap().is_none());
    }

    pub fn duplicates_are_rejected(store: Arc<dyn GraphStore>) {
        let graph = graph_with_topics(store.as_ref());
        let g = graph.id.as_str();

        let err = store.insert_topic(g, &new_topic("a", "Again", 1)).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_ENTRY");

        store.insert_edge(g, &NewEdge::new("a", "b")).unwrap();
        let err = store.insert_edge(g, &NewEdge::new("a", "b")).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_ENTRY");
        assert_eq!(parents(store.as_ref(), g, "b"), vec!["a"]);

        // Same slug in another graph is fine.
        let other = writable_graph(store.as_ref(), "other");
        store.insert_topic(&other.id, &new_topic("a", "Alpha", 1)).unwrap();
    }

    pub fn copy_is_deep(store: Arc<dyn GraphStore>) {
        let source = graph_with_topics(store.as_ref());
        let s = source.id.as_str();
        store.insert_edge(s, &NewEdge::new("a", "b")).unwrap();
        store.insert_edge(s, &NewEdge::new("b", "c")).unwrap();

        let mut copy = KnowledgeGraph::new("copy", None);
        copy.source_graph_id = Some(source.id.clone());
        store.create_graph(&copy, Some(s)).unwrap();
        let c = copy.id.as_str();

        assert_eq!(store.list_courses(c).unwrap().len(), store.list_courses(s).unwrap().len());
        assert_eq!(store.list_topics(c).unwrap().len(), 3);
        assert_eq!(store.list_edges(c).unwrap().len(), 2);
        assert_eq!(parents(store.as_ref(), c, "c"), vec!["b"]);
        assert_eq!(store.get_course(c, 1).unwrap().unwrap().name, "Math");

        let stored = store.get_graph(c).unwrap().unwrap();
        assert_eq!(stored.source_graph_id.as_deref(), Some(s));

        // Mutating the copy leaves the source untouched.
        assert!(store.delete_topic(c, "b").unwrap());
        assert_eq!(store.list_topics(s).unwrap().len(), 3);
        assert_eq!(parents(store.as_ref(), s, "c"), vec!["b"]);

        // New courses continue the copied numbering.
        assert_eq!(store.insert_course(c, &new_course("Next", "#000000")).unwrap().course_id, 2);

        let missing = KnowledgeGraph::new("orphan", None);
        let err = store.create_graph(&missing, Some("no-such-graph")).unwrap_err();
        assert!(matches!(err, KgError::GraphNotFound(_)));
        assert!(store.get_graph(&missing.id).unwrap().is_none());
    }

    pub fn seed_import_rebuilds_parents(store: Arc<dyn GraphStore>) {
        let mut graph = KnowledgeGraph::new("Default Graph", None);
        graph.is_default = true;
        graph.is_readonly = true;
        store.import_seed(&graph, &sample_seed()).unwrap();
        let g = graph.id.as_str();

        let stored = store.default_graph().unwrap().unwrap();
        assert_eq!(stored.id, graph.id);
        assert!(stored.is_readonly);

        assert_eq!(store.list_courses(g).unwrap().len(), 2);
        assert_eq!(store.list_edges(g).unwrap().len(), 3);
        assert_eq!(parents(store.as_ref(), g, "fractions"), vec!["numbers"]);
        assert_eq!(parents(store.as_ref(), g, "limits"), vec!["fractions", "numbers"]);
        assert!(parents(store.as_ref(), g, "numbers").is_empty());

        let limits = store.get_topic(g, "limits").unwrap().unwrap();
        assert!(limits.has_content);
        assert!(!store.get_topic(g, "fractions").unwrap().unwrap().has_content);
    }

    pub fn seed_repeats_keep_first_row(store: Arc<dyn GraphStore>) {
        let topic = |slug: &str, name: &str| SeedTopic {
            url_slug: slug.into(),
            display_name: name.into(),
            course_id: 1,
            content_html: None,
            content_text: None,
        };
        let seed = SeedData {
            courses: vec![
                SeedCourse { course_id: 1, name: "Algebra".into(), color: "#ff0000".into() },
                SeedCourse { course_id: 1, name: "Geometry".into(), color: "#0000ff".into() },
            ],
            topics: vec![topic("a", "First"), topic("b", "Beta"), topic("a", "Second")],
            edges: vec![SeedEdge { parent_slug: "a".into(), child_slug: "b".into() }],
        };

        let graph = KnowledgeGraph::new("Seeded", None);
        store.import_seed(&graph, &seed).unwrap();
        let g = graph.id.as_str();

        let courses = store.list_courses(g).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "Algebra");
        assert_eq!(store.list_topics(g).unwrap().len(), 2);
        assert_eq!(store.get_topic(g, "a").unwrap().unwrap().display_name, "First");
        assert_eq!(parents(store.as_ref(), g, "b"), vec!["a"]);
    }

    pub fn listing_orders(store: Arc<dyn GraphStore>) {
        let first = writable_graph(store.as_ref(), "first");
        let second = writable_graph(store.as_ref(), "second");
        let ids: Vec<String> = store.list_graphs().unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        let g = first.id.as_str();
        store.insert_course(g, &new_course("Math", "#111111")).unwrap();
        for (slug, name) in [("z", "Zeta"), ("m", "Mu"), ("a", "Alpha")] {
            store.insert_topic(g, &new_topic(slug, name, 1)).unwrap();
        }
        assert_eq!(slugs(&store.list_topics(g).unwrap()), vec!["a", "m", "z"]);

        store.insert_edge(g, &NewEdge::new("z", "a")).unwrap();
        store.insert_edge(g, &NewEdge::new("a", "m")).unwrap();
        let edges: Vec<String> = store
            .list_edges(g)
            .unwrap()
            .into_iter()
            .map(|e| format!("{}->{}", e.parent_slug, e.child_slug))
            .collect();
        assert_eq!(edges, vec!["z->a", "a->m"]);
    }

    pub fn delete_graph_cascades(store: Arc<dyn GraphStore>) {
        let graph = graph_with_topics(store.as_ref());
        let keep = graph_with_topics(store.as_ref());
        store.insert_edge(&graph.id, &NewEdge::new("a", "b")).unwrap();

        assert!(store.delete_graph(&graph.id).unwrap());
        assert!(!store.delete_graph(&graph.id).unwrap());
        assert!(store.get_graph(&graph.id).unwrap().is_none());
        assert!(store.list_courses(&graph.id).unwrap().is_empty());
        assert!(store.list_topics(&graph.id).unwrap().is_empty());
        assert!(store.list_edges(&graph.id).unwrap().is_empty());

        assert_eq!(store.list_topics(&keep.id).unwrap().len(), 3);

        let patch = GraphPatch { name: Some("renamed".into()), description: None };
        assert!(store.update_graph(&graph.id, &patch).unwrap().is_none());
        let renamed = store.update_graph(&keep.id, &patch).unwrap().unwrap();
        assert_eq!(renamed.name, "renamed");
    }

    pub fn relationship_reads(store: Arc<dyn GraphStore>) {
        let graph = graph_with_topics(store.as_ref());
        let g = graph.id.as_str();
        store.insert_edge(g, &NewEdge::new("a", "c")).unwrap();
        store.insert_edge(g, &NewEdge::new("a", "b")).unwrap();

        // Dependents by topic ordinal, not by edge order.
        assert_eq!(slugs(&store.dependents(g, "a").unwrap()), vec!["b", "c"]);

        let wanted = vec!["c".to_string(), "ghost".to_string(), "a".to_string()];
        assert_eq!(slugs(&store.topics_by_slugs(g, &wanted).unwrap()), vec!["c", "a"]);

        assert!(store.get_edge(g, "a", "b").unwrap().is_some());
        assert!(store.get_edge(g, "b", "a").unwrap().is_none());
    }

    pub fn service_guards(store: Arc<dyn GraphStore>) {
        let kb = KnowledgeBase::new(store);
        let default = kb.bootstrap(None).unwrap();
        assert!(default.is_default && default.is_readonly);
        assert_eq!(kb.bootstrap(None).unwrap().id, default.id);

        assert_eq!(kb.delete_graph(&default.id).unwrap_err(), KgError::CannotDeleteDefault);
        let err = kb.create_course(&default.id, &new_course("X", "#000000")).unwrap_err();
        assert_eq!(err, KgError::ReadonlyGraph);

        let copy = kb
            .create_graph(&NewGraph {
                name: "Mine".into(),
                description: None,
                copy_from_graph_id: Some(default.id.clone()),
            })
            .unwrap();
        assert!(!copy.is_default && !copy.is_readonly);
        let course = kb.create_course(&copy.id, &new_course("Math", "#111111")).unwrap();
        assert_eq!(course.course_id, 1);

        kb.create_topic(&copy.id, &new_topic("a", "Alpha", 1)).unwrap();
        let err = kb.create_edge(&copy.id, &NewEdge::new("a", "a")).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        kb.delete_graph(&copy.id).unwrap();
        assert!(matches!(kb.get_graph(&copy.id), Err(KgError::GraphNotFound(_))));
    }

    pub fn batch_ordering(store: Arc<dyn GraphStore>) {
        let graph = graph_with_topics(store.as_ref());
        store.insert_edge(&graph.id, &NewEdge::new("a", "b")).unwrap();
        let kb = KnowledgeBase::new(store.clone());

        let ops: crate::batch::BatchOperations = serde_json::from_value(serde_json::json!({
            "edges": { "delete": [{ "parentSlug": "a", "childSlug": "b" }] },
            "topics": { "delete": ["a"] }
        }))
        .unwrap();
        let result = kb.apply_batch(&graph.id, &ops).unwrap();
        assert_eq!(result.edges_deleted, 1);
        assert_eq!(result.topics_deleted, 1);
        assert!(result.failures.is_empty());
        assert!(store.get_topic(&graph.id, "a").unwrap().is_none());
        assert!(parents(store.as_ref(), &graph.id, "b").is_empty());
    }
}
