//! In-process storage engine
//!
//! Each graph lives in its own `DashMap` slot; holding the slot's write guard
//! for the whole of a mutation makes that mutation atomic with respect to
//! other requests on the same graph, while different graphs never contend
//! beyond a shard.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::consistency::{first_by_key, has_content, importable_edges};
use crate::error::{KgError, KgResult};
use crate::graph::TopicGraph;
use crate::model::*;
use crate::seed::SeedData;
use crate::store::GraphStore;

struct GraphSlot {
    graph: KnowledgeGraph,
    /// Creation sequence, breaks `created_at` ties in listings.
    seq: u64,
    courses: BTreeMap<i64, Course>,
    /// Highest course id ever assigned, so deleted ids are not handed out again.
    last_course_id: i64,
    topics: TopicGraph,
}

/// `GraphStore` that keeps everything in memory. Thread-safe for concurrent access.
pub struct MemoryStore {
    graphs: DashMap<String, GraphSlot>,
    next_ordinal: AtomicI64,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            graphs: DashMap::new(),
            next_ordinal: AtomicI64::new(1),
            next_seq: AtomicU64::new(1),
        }
    }

    fn ordinal(&self) -> i64 {
        self.next_ordinal.fetch_add(1, Ordering::Relaxed)
    }

    fn new_slot(&self, graph: &KnowledgeGraph) -> GraphSlot {
        GraphSlot {
            graph: graph.clone(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            courses: BTreeMap::new(),
            last_course_id: 0,
            topics: TopicGraph::new(),
        }
    }

    /// Run `f` against the graph's slot under its write guard.
    fn with_slot<T>(&self, graph_id: &str, f: impl FnOnce(&mut GraphSlot) -> KgResult<T>) -> KgResult<T> {
        let mut slot = self
            .graphs
            .get_mut(graph_id)
            .ok_or_else(|| KgError::GraphNotFound(graph_id.to_string()))?;
        f(&mut *slot)
    }

    /// Read from the graph's slot, or return `default` when the graph is absent.
    fn read_slot<T>(&self, graph_id: &str, default: T, f: impl FnOnce(&GraphSlot) -> T) -> T {
        match self.graphs.get(graph_id) {
            Some(slot) => f(&*slot),
            None => default,
        }
    }

    fn insert_slot(&self, slot: GraphSlot) -> KgResult<()> {
        match self.graphs.entry(slot.graph.id.clone()) {
            Entry::Occupied(_) => Err(KgError::DuplicateEntry(format!(
                "Graph {} already exists",
                slot.graph.id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(slot);
                Ok(())
            }
        }
    }

    /// Deep copy of `source`'s records, re-homed into `target`.
    fn copy_records(&self, source: &GraphSlot, target: &mut GraphSlot) {
        let now = Utc::now();
        let graph_id = target.graph.id.clone();

        for course in source.courses.values() {
            let copy = Course {
                id: self.ordinal(),
                graph_id: graph_id.clone(),
                created_at: now,
                updated_at: now,
                ..course.clone()
            };
            target.courses.insert(copy.course_id, copy);
        }
        target.last_course_id = source.last_course_id;

        let mut topics: Vec<&Topic> = source.topics.all_topics().collect();
        topics.sort_by_key(|t| t.id);
        for topic in topics {
            target.topics.add_topic(Topic {
                id: self.ordinal(),
                graph_id: graph_id.clone(),
                created_at: now,
                updated_at: now,
                ..topic.clone()
            });
        }

        for edge in source.topics.edges_by_ordinal() {
            target.topics.add_edge(Edge {
                id: self.ordinal(),
                graph_id: graph_id.clone(),
                created_at: now,
                ..edge.clone()
            });
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn list_graphs(&self) -> KgResult<Vec<KnowledgeGraph>> {
        let mut slots: Vec<(chrono::DateTime<Utc>, u64, KnowledgeGraph)> = self
            .graphs
            .iter()
            .map(|slot| (slot.graph.created_at, slot.seq, slot.graph.clone()))
            .collect();
        slots.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        Ok(slots.into_iter().map(|(_, _, graph)| graph).collect())
    }

    fn get_graph(&self, graph_id: &str) -> KgResult<Option<KnowledgeGraph>> {
        Ok(self.graphs.get(graph_id).map(|slot| slot.graph.clone()))
    }

    fn default_graph(&self) -> KgResult<Option<KnowledgeGraph>> {
        Ok(self
            .graphs
            .iter()
            .find(|slot| slot.graph.is_default)
            .map(|slot| slot.graph.clone()))
    }

    fn create_graph(&self, graph: &KnowledgeGraph, copy_from: Option<&str>) -> KgResult<()> {
        let mut slot = self.new_slot(graph);
        if let Some(source_id) = copy_from {
            // Guard on the source is held only while copying, never together
            // with a guard on the new slot.
            let source = self
                .graphs
                .get(source_id)
                .ok_or_else(|| KgError::GraphNotFound(source_id.to_string()))?;
            self.copy_records(&source, &mut slot);
        }
        self.insert_slot(slot)
    }

    fn import_seed(&self, graph: &KnowledgeGraph, seed: &SeedData) -> KgResult<()> {
        let now = Utc::now();
        let mut slot = self.new_slot(graph);

        for course in first_by_key(&seed.courses, |c| c.course_id) {
            slot.courses.insert(
                course.course_id,
                Course {
                    id: self.ordinal(),
                    graph_id: graph.id.clone(),
                    course_id: course.course_id,
                    name: course.name.clone(),
                    color: course.color.clone(),
                    created_at: now,
                    updated_at: now,
                },
            );
            slot.last_course_id = slot.last_course_id.max(course.course_id);
        }

        let topics = first_by_key(&seed.topics, |t| t.url_slug.as_str());
        for topic in &topics {
            slot.topics.add_topic(Topic {
                id: self.ordinal(),
                graph_id: graph.id.clone(),
                url_slug: topic.url_slug.clone(),
                display_name: topic.display_name.clone(),
                course_id: topic.course_id,
                parent_slugs: Vec::new(),
                content_html: topic.content_html.clone(),
                content_text: topic.content_text.clone(),
                has_content: has_content(topic.content_html.as_deref(), topic.content_text.as_deref()),
                created_at: now,
                updated_at: now,
            });
        }

        let known: HashSet<&str> = topics.iter().map(|t| t.url_slug.as_str()).collect();
        let pairs = seed
            .edges
            .iter()
            .map(|e| (e.parent_slug.as_str(), e.child_slug.as_str()));
        for (parent, child) in importable_edges(pairs, &known) {
            slot.topics.add_edge(Edge {
                id: self.ordinal(),
                graph_id: graph.id.clone(),
                parent_slug: parent.to_string(),
                child_slug: child.to_string(),
                created_at: now,
            });
        }

        self.insert_slot(slot)
    }

    fn update_graph(&self, graph_id: &str, patch: &GraphPatch) -> KgResult<Option<KnowledgeGraph>> {
        let Some(mut slot) = self.graphs.get_mut(graph_id) else {
            return Ok(None);
        };
        if !patch.is_empty() {
            if let Some(name) = &patch.name {
                slot.graph.name = name.clone();
            }
            if let Some(description) = &patch.description {
                slot.graph.description = Some(description.clone());
            }
            slot.graph.updated_at = Utc::now();
        }
        Ok(Some(slot.graph.clone()))
    }

    fn delete_graph(&self, graph_id: &str) -> KgResult<bool> {
        Ok(self.graphs.remove(graph_id).is_some())
    }

    fn list_courses(&self, graph_id: &str) -> KgResult<Vec<Course>> {
        Ok(self.read_slot(graph_id, Vec::new(), |slot| {
            slot.courses.values().cloned().collect()
        }))
    }

    fn get_course(&self, graph_id: &str, course_id: i64) -> KgResult<Option<Course>> {
        Ok(self.read_slot(graph_id, None, |slot| slot.courses.get(&course_id).cloned()))
    }

    fn insert_course(&self, graph_id: &str, course: &NewCourse) -> KgResult<Course> {
        self.with_slot(graph_id, |slot| {
            let max = slot.courses.keys().next_back().copied().unwrap_or(0);
            let course_id = max.max(slot.last_course_id) + 1;
            slot.last_course_id = course_id;
            let now = Utc::now();
            let created = Course {
                id: self.ordinal(),
                graph_id: graph_id.to_string(),
                course_id,
                name: course.name.trim().to_string(),
                color: course.color.clone(),
                created_at: now,
                updated_at: now,
            };
            slot.courses.insert(course_id, created.clone());
            Ok(created)
        })
    }

    fn update_course(&self, graph_id: &str, course_id: i64, patch: &CoursePatch) -> KgResult<Option<Course>> {
        self.with_slot(graph_id, |slot| {
            let Some(course) = slot.courses.get_mut(&course_id) else {
                return Ok(None);
            };
            if !patch.is_empty() {
                if let Some(name) = &patch.name {
                    course.name = name.trim().to_string();
                }
                if let Some(color) = &patch.color {
                    course.color = color.clone();
                }
                course.updated_at = Utc::now();
            }
            Ok(Some(course.clone()))
        })
    }

    fn delete_course(&self, graph_id: &str, course_id: i64) -> KgResult<bool> {
        self.with_slot(graph_id, |slot| Ok(slot.courses.remove(&course_id).is_some()))
    }

    fn list_topics(&self, graph_id: &str) -> KgResult<Vec<Topic>> {
        Ok(self.read_slot(graph_id, Vec::new(), |slot| {
            let mut topics: Vec<Topic> = slot.topics.all_topics().cloned().collect();
            topics.sort_by(|a, b| a.display_name.cmp(&b.display_name).then(a.id.cmp(&b.id)));
            topics
        }))
    }

    fn get_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<Option<Topic>> {
        Ok(self.read_slot(graph_id, None, |slot| slot.topics.topic(url_slug).cloned()))
    }

    fn insert_topic(&self, graph_id: &str, topic: &NewTopic) -> KgResult<Topic> {
        self.with_slot(graph_id, |slot| {
            let now = Utc::now();
            let created = Topic {
                id: self.ordinal(),
                graph_id: graph_id.to_string(),
                url_slug: topic.url_slug.clone(),
                display_name: topic.display_name.clone(),
                course_id: topic.course_id,
                parent_slugs: Vec::new(),
                content_html: topic.content_html.clone(),
                content_text: topic.content_text.clone(),
                has_content: has_content(topic.content_html.as_deref(), topic.content_text.as_deref()),
                created_at: now,
                updated_at: now,
            };
            if !slot.topics.add_topic(created.clone()) {
                return Err(KgError::DuplicateEntry(format!(
                    "Topic with slug {} already exists",
                    topic.url_slug
                )));
            }
            Ok(created)
        })
    }

    fn update_topic(&self, graph_id: &str, url_slug: &str, patch: &TopicPatch) -> KgResult<Option<Topic>> {
        self.with_slot(graph_id, |slot| {
            let Some(topic) = slot.topics.topic_mut(url_slug) else {
                return Ok(None);
            };
            if let Some(display_name) = &patch.display_name {
                topic.display_name = display_name.clone();
            }
            if let Some(course_id) = patch.course_id {
                topic.course_id = course_id;
            }
            if let Some(html) = &patch.content_html {
                topic.content_html = Some(html.clone());
            }
            if let Some(text) = &patch.content_text {
                topic.content_text = Some(text.clone());
            }
            topic.has_content = has_content(topic.content_html.as_deref(), topic.content_text.as_deref());
            topic.updated_at = Utc::now();
            Ok(Some(topic.clone()))
        })
    }

    fn delete_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<bool> {
        self.with_slot(graph_id, |slot| Ok(slot.topics.remove_topic(url_slug).is_some()))
    }

    fn topics_by_slugs(&self, graph_id: &str, slugs: &[String]) -> KgResult<Vec<Topic>> {
        Ok(self.read_slot(graph_id, Vec::new(), |slot| {
            slugs
                .iter()
                .filter_map(|slug| slot.topics.topic(slug).cloned())
                .collect()
        }))
    }

    fn dependents(&self, graph_id: &str, url_slug: &str) -> KgResult<Vec<Topic>> {
        Ok(self.read_slot(graph_id, Vec::new(), |slot| {
            slot.topics.children(url_slug).into_iter().cloned().collect()
        }))
    }

    fn list_edges(&self, graph_id: &str) -> KgResult<Vec<Edge>> {
        Ok(self.read_slot(graph_id, Vec::new(), |slot| {
            slot.topics.edges_by_ordinal().into_iter().cloned().collect()
        }))
    }

    fn get_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<Option<Edge>> {
        Ok(self.read_slot(graph_id, None, |slot| {
            slot.topics.edge(parent_slug, child_slug).cloned()
        }))
    }

    fn insert_edge(&self, graph_id: &str, edge: &NewEdge) -> KgResult<Edge> {
        self.with_slot(graph_id, |slot| {
            for slug in [&edge.parent_slug, &edge.child_slug] {
                if slot.topics.topic(slug).is_none() {
                    return Err(KgError::TopicNotFound(slug.clone()));
                }
            }
            let created = Edge {
                id: self.ordinal(),
                graph_id: graph_id.to_string(),
                parent_slug: edge.parent_slug.clone(),
                child_slug: edge.child_slug.clone(),
                created_at: Utc::now(),
            };
            if !slot.topics.add_edge(created.clone()) {
                return Err(KgError::DuplicateEntry(format!(
                    "Edge from {} to {} already exists",
                    edge.parent_slug, edge.child_slug
                )));
            }
            if let Some(child) = slot.topics.topic_mut(&edge.child_slug) {
                child.updated_at = created.created_at;
            }
            Ok(created)
        })
    }

    fn delete_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<bool> {
        self.with_slot(graph_id, |slot| {
            let removed = slot.topics.remove_edge(parent_slug, child_slug).is_some();
            if removed {
                if let Some(child) = slot.topics.topic_mut(child_slug) {
                    child.updated_at = Utc::now();
                }
            }
            Ok(removed)
        })
    }
}
