//! Core records for knowledge graphs, courses, topics and prerequisite edges

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type used on every record.
pub type Timestamp = DateTime<Utc>;

/// One isolated collection of courses, topics and edges.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGraph {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub is_readonly: bool,
    /// Graph this one was cloned from. Weak reference, never followed on delete.
    pub source_graph_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl KnowledgeGraph {
    /// A fresh, writable, non-default graph with a random id.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        KnowledgeGraph {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            is_default: false,
            is_readonly: false,
            source_graph_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A category of topics with a display color.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Storage ordinal.
    pub id: i64,
    pub graph_id: String,
    /// Sequential per graph, assigned as `max + 1`.
    pub course_id: i64,
    pub name: String,
    pub color: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A learnable unit identified by its slug within a graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    /// Storage ordinal.
    pub id: i64,
    pub graph_id: String,
    pub url_slug: String,
    pub display_name: String,
    pub course_id: i64,
    /// Cached direct prerequisites, in attach order.
    pub parent_slugs: Vec<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
    pub has_content: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A directed prerequisite relationship: `parent_slug` must be learned before `child_slug`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Storage ordinal, defines listing order.
    pub id: i64,
    pub graph_id: String,
    pub parent_slug: String,
    pub child_slug: String,
    pub created_at: Timestamp,
}

// ── Write inputs ────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewGraph {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub copy_from_graph_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl GraphPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl CoursePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    #[serde(default)]
    pub url_slug: String,
    #[serde(default)]
    pub display_name: String,
    pub course_id: i64,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
}

/// Partial topic update. Absent (or null) fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicPatch {
    pub display_name: Option<String>,
    pub course_id: Option<i64>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct NewEdge {
    #[serde(default)]
    pub parent_slug: String,
    #[serde(default)]
    pub child_slug: String,
}

impl NewEdge {
    pub fn new(parent_slug: impl Into<String>, child_slug: impl Into<String>) -> Self {
        NewEdge {
            parent_slug: parent_slug.into(),
            child_slug: child_slug.into(),
        }
    }
}

// ── Full-graph export view ──────────────────────────────────

/// Course without its graph id; the envelope carries it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub color: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Course> for CourseView {
    fn from(course: Course) -> Self {
        CourseView {
            id: course.id,
            course_id: course.course_id,
            name: course.name,
            color: course.color,
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

/// Topic without its graph id. `content_html` is always `None` in bulk reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: i64,
    pub url_slug: String,
    pub display_name: String,
    pub course_id: i64,
    pub parent_slugs: Vec<String>,
    pub content_html: Option<String>,
    pub content_text: Option<String>,
    pub has_content: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Topic> for TopicView {
    fn from(topic: Topic) -> Self {
        TopicView {
            id: topic.id,
            url_slug: topic.url_slug,
            display_name: topic.display_name,
            course_id: topic.course_id,
            parent_slugs: topic.parent_slugs,
            content_html: None,
            content_text: topic.content_text,
            has_content: topic.has_content,
            created_at: topic.created_at,
            updated_at: topic.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub id: i64,
    pub parent_slug: String,
    pub child_slug: String,
    pub created_at: Timestamp,
}

impl From<Edge> for EdgeView {
    fn from(edge: Edge) -> Self {
        EdgeView {
            id: edge.id,
            parent_slug: edge.parent_slug,
            child_slug: edge.child_slug,
            created_at: edge.created_at,
        }
    }
}

/// Everything in one graph, as shipped by the bulk read endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphData {
    pub graph: KnowledgeGraph,
    pub courses: Vec<CourseView>,
    pub topics: Vec<TopicView>,
    pub edges: Vec<EdgeView>,
}

/// Summary counts for one graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub courses: usize,
    pub topics: usize,
    pub edges: usize,
    pub topics_with_content: usize,
    /// Topics without prerequisites.
    pub root_topics: usize,
    /// Topics nothing depends on.
    pub leaf_topics: usize,
}
