//! Storage capability set
//!
//! A `GraphStore` persists graphs and the records they own. Each mutating
//! method is one atomic unit and must leave `has_content` and `parent_slugs`
//! consistent on its own (see [`crate::consistency`]); callers never wrap
//! several calls in an outer transaction. Cross-record validation (course
//! exists, graph writable, ...) belongs to [`crate::KnowledgeBase`].

use crate::error::KgResult;
use crate::model::*;
use crate::seed::SeedData;

pub trait GraphStore: Send + Sync {
    /// Engine name for logs.
    fn kind(&self) -> &'static str;

    // ── Graphs ──────────────────────────────────────────────

    /// Newest-created first.
    fn list_graphs(&self) -> KgResult<Vec<KnowledgeGraph>>;
    fn get_graph(&self, graph_id: &str) -> KgResult<Option<KnowledgeGraph>>;
    fn default_graph(&self) -> KgResult<Option<KnowledgeGraph>>;
    /// Insert `graph`, deep-copying every course, topic and edge of
    /// `copy_from` into it when given.
    fn create_graph(&self, graph: &KnowledgeGraph, copy_from: Option<&str>) -> KgResult<()>;
    /// Insert `graph` together with the seed rows. `parent_slugs` are rebuilt
    /// from the imported edges.
    fn import_seed(&self, graph: &KnowledgeGraph, seed: &SeedData) -> KgResult<()>;
    fn update_graph(&self, graph_id: &str, patch: &GraphPatch) -> KgResult<Option<KnowledgeGraph>>;
    /// Removes the graph and everything it owns. Returns whether it existed.
    fn delete_graph(&self, graph_id: &str) -> KgResult<bool>;

    // ── Courses ─────────────────────────────────────────────

    /// Ordered by `course_id`.
    fn list_courses(&self, graph_id: &str) -> KgResult<Vec<Course>>;
    fn get_course(&self, graph_id: &str, course_id: i64) -> KgResult<Option<Course>>;
    /// Assigns `max(course_id) + 1` within the graph, never reusing an id
    /// that was handed out before.
    fn insert_course(&self, graph_id: &str, course: &NewCourse) -> KgResult<Course>;
    fn update_course(&self, graph_id: &str, course_id: i64, patch: &CoursePatch) -> KgResult<Option<Course>>;
    fn delete_course(&self, graph_id: &str, course_id: i64) -> KgResult<bool>;

    // ── Topics ──────────────────────────────────────────────

    /// Ordered by display name.
    fn list_topics(&self, graph_id: &str) -> KgResult<Vec<Topic>>;
    fn get_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<Option<Topic>>;
    /// Fails with `DuplicateEntry` when the slug is taken.
    fn insert_topic(&self, graph_id: &str, topic: &NewTopic) -> KgResult<Topic>;
    /// Applies present fields and recomputes `has_content`.
    fn update_topic(&self, graph_id: &str, url_slug: &str, patch: &TopicPatch) -> KgResult<Option<Topic>>;
    /// Removes touching edges, strips the slug from every `parent_slugs`,
    /// then removes the topic.
    fn delete_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<bool>;
    /// Topics for `slugs`, in the order given. Unknown slugs are skipped.
    fn topics_by_slugs(&self, graph_id: &str, slugs: &[String]) -> KgResult<Vec<Topic>>;
    /// Children of `url_slug`, ordered by their own ordinal.
    fn dependents(&self, graph_id: &str, url_slug: &str) -> KgResult<Vec<Topic>>;

    // ── Edges ───────────────────────────────────────────────

    /// Ordered by insertion ordinal.
    fn list_edges(&self, graph_id: &str) -> KgResult<Vec<Edge>>;
    fn get_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<Option<Edge>>;
    /// Inserts the edge and attaches the parent to the child's `parent_slugs`.
    fn insert_edge(&self, graph_id: &str, edge: &NewEdge) -> KgResult<Edge>;
    /// Removes the edge and detaches the parent. Returns whether it existed.
    fn delete_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<bool>;
}
