//! Mutations of graph-owned records
//!
//! Every operation runs the same guard sequence: the graph must exist, then
//! accept writes, then the operation's own checks. The store call that
//! follows is a single atomic unit that keeps `parent_slugs` and
//! `has_content` consistent by itself.

use tracing::debug;

use crate::error::{KgError, KgResult};
use crate::model::*;
use crate::service::{require_present, require_text, KnowledgeBase};

impl KnowledgeBase {
    // ── Courses ─────────────────────────────────────────────

    pub fn create_course(&self, graph_id: &str, request: &NewCourse) -> KgResult<Course> {
        self.require_writable(graph_id)?;
        require_text(&request.name, "Name is required")?;
        require_present(&request.color, "Color is required")?;

        let course = self.store().insert_course(graph_id, request)?;
        debug!("Created course {} in graph {}", course.course_id, graph_id);
        Ok(course)
    }

    pub fn update_course(&self, graph_id: &str, course_id: i64, patch: &CoursePatch) -> KgResult<Course> {
        self.require_writable(graph_id)?;
        if let Some(name) = &patch.name {
            require_text(name, "Name is required")?;
        }
        if let Some(color) = &patch.color {
            require_present(color, "Color is required")?;
        }
        self.store()
            .update_course(graph_id, course_id, patch)?
            .ok_or(KgError::CourseNotFound(course_id))
    }

    /// Topics keep their (now dangling) course id.
    pub fn delete_course(&self, graph_id: &str, course_id: i64) -> KgResult<()> {
        self.require_writable(graph_id)?;
        if !self.store().delete_course(graph_id, course_id)? {
            return Err(KgError::CourseNotFound(course_id));
        }
        Ok(())
    }

    // ── Topics ──────────────────────────────────────────────

    pub fn create_topic(&self, graph_id: &str, request: &NewTopic) -> KgResult<Topic> {
        self.require_writable(graph_id)?;
        require_text(&request.url_slug, "URL slug is required")?;
        require_text(&request.display_name, "Display name is required")?;
        self.require_course(graph_id, request.course_id)?;
        if self.store().get_topic(graph_id, &request.url_slug)?.is_some() {
            return Err(KgError::DuplicateEntry(format!(
                "Topic with slug {} already exists",
                request.url_slug
            )));
        }

        let topic = self.store().insert_topic(graph_id, request)?;
        debug!("Created topic {} in graph {}", topic.url_slug, graph_id);
        Ok(topic)
    }

    /// Apply the supplied fields; `has_content` is always recomputed.
    pub fn update_topic(&self, graph_id: &str, url_slug: &str, patch: &TopicPatch) -> KgResult<Topic> {
        self.require_writable(graph_id)?;
        if self.store().get_topic(graph_id, url_slug)?.is_none() {
            return Err(KgError::TopicNotFound(url_slug.to_string()));
        }
        if let Some(display_name) = &patch.display_name {
            require_text(display_name, "Display name is required")?;
        }
        if let Some(course_id) = patch.course_id {
            self.require_course(graph_id, course_id)?;
        }
        self.store()
            .update_topic(graph_id, url_slug, patch)?
            .ok_or_else(|| KgError::TopicNotFound(url_slug.to_string()))
    }

    /// Drops the topic, every edge touching it, and its slug from every
    /// other topic's `parent_slugs`.
    pub fn delete_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<()> {
        self.require_writable(graph_id)?;
        if !self.store().delete_topic(graph_id, url_slug)? {
            return Err(KgError::TopicNotFound(url_slug.to_string()));
        }
        debug!("Deleted topic {} in graph {}", url_slug, graph_id);
        Ok(())
    }

    // ── Edges ───────────────────────────────────────────────

    pub fn create_edge(&self, graph_id: &str, request: &NewEdge) -> KgResult<Edge> {
        self.require_writable(graph_id)?;
        require_text(&request.parent_slug, "Parent slug is required")?;
        require_text(&request.child_slug, "Child slug is required")?;
        if request.parent_slug == request.child_slug {
            return Err(KgError::validation("Cannot create self-referencing edge"));
        }
        for slug in [&request.parent_slug, &request.child_slug] {
            if self.store().get_topic(graph_id, slug)?.is_none() {
                return Err(KgError::TopicNotFound(slug.clone()));
            }
        }
        if self
            .store()
            .get_edge(graph_id, &request.parent_slug, &request.child_slug)?
            .is_some()
        {
            return Err(KgError::DuplicateEntry(format!(
                "Edge from {} to {} already exists",
                request.parent_slug, request.child_slug
            )));
        }

        let edge = self.store().insert_edge(graph_id, request)?;
        debug!("Created edge {} -> {} in graph {}", edge.parent_slug, edge.child_slug, graph_id);
        Ok(edge)
    }

    pub fn delete_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<()> {
        self.require_writable(graph_id)?;
        if !self.store().delete_edge(graph_id, parent_slug, child_slug)? {
            return Err(KgError::EdgeNotFound {
                parent: parent_slug.to_string(),
                child: child_slug.to_string(),
            });
        }
        Ok(())
    }
}
