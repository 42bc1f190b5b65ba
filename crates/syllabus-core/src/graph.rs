//! Prerequisite graph of one tenant, using petgraph::StableDiGraph keyed by slug

use crate::consistency::{attach_parent, detach_parent};
use crate::model::{Edge, Topic};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

/// Topics as nodes, prerequisite edges as directed parent → child arcs.
///
/// Every mutation keeps each node's `parent_slugs` in step with its incoming
/// arcs, so the graph can be handed out as a consistent snapshot at any time.
#[derive(Clone)]
pub struct TopicGraph {
    inner: StableDiGraph<Topic, Edge>,
    slugs: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for TopicGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicGraph")
            .field("topic_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl TopicGraph {
    pub fn new() -> Self {
        TopicGraph {
            inner: StableDiGraph::new(),
            slugs: HashMap::new(),
        }
    }

    /// Add a topic. Returns false if the slug is already taken.
    pub fn add_topic(&mut self, topic: Topic) -> bool {
        if self.slugs.contains_key(&topic.url_slug) {
            return false;
        }
        let slug = topic.url_slug.clone();
        let idx = self.inner.add_node(topic);
        self.slugs.insert(slug, idx);
        true
    }

    pub fn topic(&self, slug: &str) -> Option<&Topic> {
        self.slugs.get(slug).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn topic_mut(&mut self, slug: &str) -> Option<&mut Topic> {
        let idx = *self.slugs.get(slug)?;
        self.inner.node_weight_mut(idx)
    }

    /// Iterate over all topics, in no particular order.
    pub fn all_topics(&self) -> impl Iterator<Item = &Topic> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// All edges ordered by ordinal.
    pub fn edges_by_ordinal(&self) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = self
            .inner
            .edge_indices()
            .filter_map(|idx| self.inner.edge_weight(idx))
            .collect();
        edges.sort_by_key(|e| e.id);
        edges
    }

    /// The edge `parent → child`, if present.
    pub fn edge(&self, parent: &str, child: &str) -> Option<&Edge> {
        let (&from, &to) = (self.slugs.get(parent)?, self.slugs.get(child)?);
        self.inner
            .find_edge(from, to)
            .and_then(|idx| self.inner.edge_weight(idx))
    }

    /// Add an edge and attach the parent to the child's `parent_slugs`.
    /// Returns false if an endpoint is missing or the edge already exists.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        let (Some(&from), Some(&to)) = (
            self.slugs.get(&edge.parent_slug),
            self.slugs.get(&edge.child_slug),
        ) else {
            return false;
        };
        if self.inner.find_edge(from, to).is_some() {
            return false;
        }
        let parent = edge.parent_slug.clone();
        self.inner.add_edge(from, to, edge);
        if let Some(node) = self.inner.node_weight_mut(to) {
            attach_parent(&mut node.parent_slugs, &parent);
        }
        true
    }

    /// Remove `parent → child` and detach the parent from the child.
    pub fn remove_edge(&mut self, parent: &str, child: &str) -> Option<Edge> {
        let (&from, &to) = (self.slugs.get(parent)?, self.slugs.get(child)?);
        let idx = self.inner.find_edge(from, to)?;
        let edge = self.inner.remove_edge(idx)?;
        if let Some(node) = self.inner.node_weight_mut(to) {
            detach_parent(&mut node.parent_slugs, parent);
        }
        Some(edge)
    }

    /// Remove a topic with all its edges, and strip its slug from every
    /// remaining topic's `parent_slugs`.
    pub fn remove_topic(&mut self, slug: &str) -> Option<Topic> {
        let idx = self.slugs.remove(slug)?;
        let topic = self.inner.remove_node(idx)?;
        let indices: Vec<NodeIndex> = self.inner.node_indices().collect();
        for idx in indices {
            if let Some(other) = self.inner.node_weight_mut(idx) {
                detach_parent(&mut other.parent_slugs, slug);
            }
        }
        Some(topic)
    }

    /// Topics with an edge from `slug`, ordered by their own ordinal.
    pub fn children(&self, slug: &str) -> Vec<&Topic> {
        let Some(&idx) = self.slugs.get(slug) else {
            return Vec::new();
        };
        let mut children: Vec<&Topic> = self
            .inner
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|edge_ref| self.inner.node_weight(edge_ref.target()))
            .collect();
        children.sort_by_key(|t| t.id);
        children
    }
}

impl Default for TopicGraph {
    fn default() -> Self {
        Self::new()
    }
}
