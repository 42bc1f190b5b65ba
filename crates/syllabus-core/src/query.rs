//! Read side: listings, lookups, prerequisite/dependent resolution, export

use std::collections::HashSet;

use crate::error::{KgError, KgResult};
use crate::model::*;
use crate::service::KnowledgeBase;

impl KnowledgeBase {
    /// Ordered by course id.
    pub fn list_courses(&self, graph_id: &str) -> KgResult<Vec<Course>> {
        self.require_graph(graph_id)?;
        self.store().list_courses(graph_id)
    }

    pub fn get_course(&self, graph_id: &str, course_id: i64) -> KgResult<Course> {
        self.require_graph(graph_id)?;
        self.store()
            .get_course(graph_id, course_id)?
            .ok_or(KgError::CourseNotFound(course_id))
    }

    /// Ordered by display name.
    pub fn list_topics(&self, graph_id: &str) -> KgResult<Vec<Topic>> {
        self.require_graph(graph_id)?;
        self.store().list_topics(graph_id)
    }

    /// Full record, including `content_html`.
    pub fn get_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<Topic> {
        self.require_graph(graph_id)?;
        self.store()
            .get_topic(graph_id, url_slug)?
            .ok_or_else(|| KgError::TopicNotFound(url_slug.to_string()))
    }

    /// Direct prerequisites in `parent_slugs` order.
    pub fn topic_prerequisites(&self, graph_id: &str, url_slug: &str) -> KgResult<Vec<Topic>> {
        let topic = self.get_topic(graph_id, url_slug)?;
        if topic.parent_slugs.is_empty() {
            return Ok(Vec::new());
        }
        self.store().topics_by_slugs(graph_id, &topic.parent_slugs)
    }

    /// Topics that list `url_slug` as a prerequisite, by ordinal.
    pub fn topic_dependents(&self, graph_id: &str, url_slug: &str) -> KgResult<Vec<Topic>> {
        self.get_topic(graph_id, url_slug)?;
        self.store().dependents(graph_id, url_slug)
    }

    /// Ordered by insertion.
    pub fn list_edges(&self, graph_id: &str) -> KgResult<Vec<Edge>> {
        self.require_graph(graph_id)?;
        self.store().list_edges(graph_id)
    }

    pub fn get_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<Edge> {
        self.require_graph(graph_id)?;
        self.store()
            .get_edge(graph_id, parent_slug, child_slug)?
            .ok_or_else(|| KgError::EdgeNotFound {
                parent: parent_slug.to_string(),
                child: child_slug.to_string(),
            })
    }

    /// The whole graph in one payload. Topic HTML is left out.
    pub fn full_graph_data(&self, graph_id: &str) -> KgResult<GraphData> {
        let graph = self.require_graph(graph_id)?;
        Ok(GraphData {
            graph,
            courses: self.store().list_courses(graph_id)?.into_iter().map(Into::into).collect(),
            topics: self.store().list_topics(graph_id)?.into_iter().map(Into::into).collect(),
            edges: self.store().list_edges(graph_id)?.into_iter().map(Into::into).collect(),
        })
    }

    pub fn graph_stats(&self, graph_id: &str) -> KgResult<GraphStats> {
        self.require_graph(graph_id)?;
        let courses = self.store().list_courses(graph_id)?;
        let topics = self.store().list_topics(graph_id)?;
        let edges = self.store().list_edges(graph_id)?;

        let parents: HashSet<&str> = edges.iter().map(|e| e.parent_slug.as_str()).collect();
        Ok(GraphStats {
            courses: courses.len(),
            topics: topics.len(),
            edges: edges.len(),
            topics_with_content: topics.iter().filter(|t| t.has_content).count(),
            root_topics: topics.iter().filter(|t| t.parent_slugs.is_empty()).count(),
            leaf_topics: topics
                .iter()
                .filter(|t| !parents.contains(t.url_slug.as_str()))
                .count(),
        })
    }
}
