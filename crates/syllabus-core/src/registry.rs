//! Graph registry: tenant lifecycle and default-graph bootstrap

use tracing::{debug, info};

use crate::error::{KgError, KgResult};
use crate::model::{GraphPatch, KnowledgeGraph, NewGraph};
use crate::seed::SeedSource;
use crate::service::{require_text, KnowledgeBase};

pub const DEFAULT_GRAPH_NAME: &str = "Default Graph";
const SEEDED_DESCRIPTION: &str = "Imported from scraper database";
const EMPTY_DESCRIPTION: &str = "Default knowledge graph";

impl KnowledgeBase {
    /// All graphs, newest first.
    pub fn list_graphs(&self) -> KgResult<Vec<KnowledgeGraph>> {
        self.store().list_graphs()
    }

    pub fn get_graph(&self, graph_id: &str) -> KgResult<KnowledgeGraph> {
        self.require_graph(graph_id)
    }

    /// The bootstrap graph, or `GRAPH_NOT_FOUND` if bootstrap never ran.
    pub fn default_graph(&self) -> KgResult<KnowledgeGraph> {
        self.store()
            .default_graph()?
            .ok_or_else(|| KgError::GraphNotFound("default".to_string()))
    }

    /// Accepts a graph id or the alias `default`.
    pub fn resolve_graph(&self, id_or_alias: &str) -> KgResult<KnowledgeGraph> {
        match self.store().get_graph(id_or_alias)? {
            Some(graph) => Ok(graph),
            None if id_or_alias == "default" => self.default_graph(),
            None => Err(KgError::GraphNotFound(id_or_alias.to_string())),
        }
    }

    /// Create a writable graph, optionally as a deep copy of another one.
    pub fn create_graph(&self, request: &NewGraph) -> KgResult<KnowledgeGraph> {
        require_text(&request.name, "Name is required")?;

        let mut graph = KnowledgeGraph::new(&request.name, request.description.clone());
        if let Some(source_id) = &request.copy_from_graph_id {
            let source = self.require_graph(source_id)?;
            graph.source_graph_id = Some(source.id);
        }

        self.store()
            .create_graph(&graph, request.copy_from_graph_id.as_deref())?;
        info!(
            "Created graph {} ({}){}",
            graph.id,
            graph.name,
            graph
                .source_graph_id
                .as_deref()
                .map(|s| format!(" copied from {s}"))
                .unwrap_or_default()
        );
        Ok(graph)
    }

    pub fn update_graph(&self, graph_id: &str, patch: &GraphPatch) -> KgResult<KnowledgeGraph> {
        self.require_writable(graph_id)?;
        if let Some(name) = &patch.name {
            require_text(name, "Name is required")?;
        }
        self.store()
            .update_graph(graph_id, patch)?
            .ok_or_else(|| KgError::GraphNotFound(graph_id.to_string()))
    }

    /// Remove a graph and everything it owns. The default graph is permanent.
    pub fn delete_graph(&self, graph_id: &str) -> KgResult<()> {
        let graph = self.require_graph(graph_id)?;
        if graph.is_default {
            return Err(KgError::CannotDeleteDefault);
        }
        if graph.is_readonly {
            return Err(KgError::ReadonlyGraph);
        }
        if !self.store().delete_graph(graph_id)? {
            return Err(KgError::GraphNotFound(graph_id.to_string()));
        }
        info!("Deleted graph {}", graph_id);
        Ok(())
    }

    /// Make sure a default graph exists, importing `seed` into it on first run.
    ///
    /// Returns the default graph, whether it was created now or found.
    pub fn bootstrap(&self, seed: Option<&dyn SeedSource>) -> KgResult<KnowledgeGraph> {
        let _guard = self.bootstrap_guard()?;
        if let Some(existing) = self.store().default_graph()? {
            debug!("Default graph {} already present, skipping bootstrap", existing.id);
            return Ok(existing);
        }

        let description = if seed.is_some() {
            SEEDED_DESCRIPTION
        } else {
            EMPTY_DESCRIPTION
        };
        let mut graph = KnowledgeGraph::new(DEFAULT_GRAPH_NAME, Some(description.to_string()));
        graph.is_default = true;
        graph.is_readonly = true;

        match seed {
            Some(source) => {
                let data = source.load()?;
                self.store().import_seed(&graph, &data)?;
                info!(
                    "Bootstrapped default graph {} from {}: {} courses, {} topics, {} edges",
                    graph.id,
                    source.describe(),
                    data.courses.len(),
                    data.topics.len(),
                    data.edges.len()
                );
            }
            None => {
                self.store().create_graph(&graph, None)?;
                info!("Bootstrapped empty default graph {}", graph.id);
            }
        }
        Ok(graph)
    }
}
