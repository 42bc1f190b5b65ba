//! Batch processor
//!
//! Applies a bundle of mutations in a fixed order: deletes (edges, topics,
//! courses), then creates (courses, topics, edges), then updates (courses,
//! topics). A failing item is recorded and skipped; it never aborts the batch.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::KgResult;
use crate::model::{CoursePatch, NewCourse, NewEdge, NewTopic, TopicPatch};
use crate::service::KnowledgeBase;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub course_id: i64,
    pub data: CoursePatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopicUpdate {
    pub url_slug: String,
    pub data: TopicPatch,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CourseOperations {
    #[serde(default)]
    pub create: Option<Vec<NewCourse>>,
    #[serde(default)]
    pub update: Option<Vec<CourseUpdate>>,
    #[serde(default)]
    pub delete: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopicOperations {
    #[serde(default)]
    pub create: Option<Vec<NewTopic>>,
    #[serde(default)]
    pub update: Option<Vec<TopicUpdate>>,
    #[serde(default)]
    pub delete: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EdgeOperations {
    #[serde(default)]
    pub create: Option<Vec<NewEdge>>,
    #[serde(default)]
    pub delete: Option<Vec<NewEdge>>,
}

/// Request body of the batch endpoint. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchOperations {
    #[serde(default)]
    pub courses: Option<CourseOperations>,
    #[serde(default)]
    pub topics: Option<TopicOperations>,
    #[serde(default)]
    pub edges: Option<EdgeOperations>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchCategory {
    Courses,
    Topics,
    Edges,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BatchAction {
    Create,
    Update,
    Delete,
}

/// One skipped item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchFailure {
    pub category: BatchCategory,
    pub action: BatchAction,
    /// Course id, topic slug, or `parent->child` for edges.
    pub key: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub courses_created: usize,
    pub courses_updated: usize,
    pub courses_deleted: usize,
    pub topics_created: usize,
    pub topics_updated: usize,
    pub topics_deleted: usize,
    pub edges_created: usize,
    pub edges_deleted: usize,
    /// Failed items in execution order.
    pub failures: Vec<BatchFailure>,
}

impl BatchResult {
    fn record<T>(
        &mut self,
        category: BatchCategory,
        action: BatchAction,
        key: impl Into<String>,
        outcome: KgResult<T>,
    ) -> bool {
        match outcome {
            Ok(_) => true,
            Err(err) => {
                let key = key.into();
                warn!("Batch {:?} {:?} of {} skipped: {}", action, category, key, err);
                self.failures.push(BatchFailure {
                    category,
                    action,
                    key,
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                false
            }
        }
    }
}

fn edge_key(edge: &NewEdge) -> String {
    format!("{}->{}", edge.parent_slug, edge.child_slug)
}

impl KnowledgeBase {
    /// Apply `ops` to a writable graph. Only a missing or read-only graph
    /// fails the call as a whole.
    pub fn apply_batch(&self, graph_id: &str, ops: &BatchOperations) -> KgResult<BatchResult> {
        use BatchAction::*;
        use BatchCategory::*;

        self.require_writable(graph_id)?;
        let mut result = BatchResult::default();

        let courses = ops.courses.as_ref();
        let topics = ops.topics.as_ref();
        let edges = ops.edges.as_ref();

        // ── Deletes: dependents first ──
        for edge in edges.and_then(|c| c.delete.as_deref()).unwrap_or_default() {
            let outcome = self.delete_edge(graph_id, &edge.parent_slug, &edge.child_slug);
            if result.record(Edges, Delete, edge_key(edge), outcome) {
                result.edges_deleted += 1;
            }
        }
        for slug in topics.and_then(|c| c.delete.as_deref()).unwrap_or_default() {
            let outcome = self.delete_topic(graph_id, slug);
            if result.record(Topics, Delete, slug.as_str(), outcome) {
                result.topics_deleted += 1;
            }
        }
        for course_id in courses.and_then(|c| c.delete.as_deref()).unwrap_or_default() {
            let outcome = self.delete_course(graph_id, *course_id);
            if result.record(Courses, Delete, course_id.to_string(), outcome) {
                result.courses_deleted += 1;
            }
        }

        // ── Creates: dependencies first ──
        for course in courses.and_then(|c| c.create.as_deref()).unwrap_or_default() {
            let outcome = self.create_course(graph_id, course);
            if result.record(Courses, Create, course.name.as_str(), outcome) {
                result.courses_created += 1;
            }
        }
        for topic in topics.and_then(|c| c.create.as_deref()).unwrap_or_default() {
            let outcome = self.create_topic(graph_id, topic);
            if result.record(Topics, Create, topic.url_slug.as_str(), outcome) {
                result.topics_created += 1;
            }
        }
        for edge in edges.and_then(|c| c.create.as_deref()).unwrap_or_default() {
            let outcome = self.create_edge(graph_id, edge);
            if result.record(Edges, Create, edge_key(edge), outcome) {
                result.edges_created += 1;
            }
        }

        // ── Updates ──
        for update in courses.and_then(|c| c.update.as_deref()).unwrap_or_default() {
            let outcome = self.update_course(graph_id, update.course_id, &update.data);
            if result.record(Courses, Update, update.course_id.to_string(), outcome) {
                result.courses_updated += 1;
            }
        }
        for update in topics.and_then(|c| c.update.as_deref()).unwrap_or_default() {
            let outcome = self.update_topic(graph_id, &update.url_slug, &update.data);
            if result.record(Topics, Update, update.url_slug.as_str(), outcome) {
                result.topics_updated += 1;
            }
        }

        info!(
            "Batch on graph {}: courses +{} ~{} -{}, topics +{} ~{} -{}, edges +{} -{}, {} failed",
            graph_id,
            result.courses_created,
            result.courses_updated,
            result.courses_deleted,
            result.topics_created,
            result.topics_updated,
            result.topics_deleted,
            result.edges_created,
            result.edges_deleted,
            result.failures.len()
        );
        Ok(result)
    }
}
