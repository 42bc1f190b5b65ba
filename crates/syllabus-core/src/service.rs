//! `KnowledgeBase`: the single entry point over a storage engine
//!
//! Operations are split across modules by concern: [`crate::registry`]
//! (graphs and bootstrap), [`crate::engine`] (course/topic/edge mutations),
//! [`crate::query`] (reads) and [`crate::batch`] (bundled mutations).

use std::sync::{Arc, Mutex};

use crate::error::{KgError, KgResult};
use crate::model::KnowledgeGraph;
use crate::store::GraphStore;

/// Validating facade over a [`GraphStore`]. Cheap to clone.
#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<dyn GraphStore>,
    /// Serializes bootstrap so two callers cannot both create a default graph.
    bootstrap_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("store", &self.store.kind())
            .finish()
    }
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        KnowledgeBase {
            store,
            bootstrap_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }

    pub(crate) fn bootstrap_guard(&self) -> KgResult<std::sync::MutexGuard<'_, ()>> {
        self.bootstrap_lock
            .lock()
            .map_err(|_| KgError::Storage("bootstrap lock poisoned".to_string()))
    }

    // ── Guards ──────────────────────────────────────────────

    /// The graph, or `GRAPH_NOT_FOUND`.
    pub(crate) fn require_graph(&self, graph_id: &str) -> KgResult<KnowledgeGraph> {
        self.store
            .get_graph(graph_id)?
            .ok_or_else(|| KgError::GraphNotFound(graph_id.to_string()))
    }

    /// The graph if it exists and accepts mutations.
    pub(crate) fn require_writable(&self, graph_id: &str) -> KgResult<KnowledgeGraph> {
        let graph = self.require_graph(graph_id)?;
        if graph.is_readonly {
            return Err(KgError::ReadonlyGraph);
        }
        Ok(graph)
    }

    pub(crate) fn require_course(&self, graph_id: &str, course_id: i64) -> KgResult<()> {
        match self.store.get_course(graph_id, course_id)? {
            Some(_) => Ok(()),
            None => Err(KgError::CourseNotFound(course_id)),
        }
    }
}

/// Fails with `VALIDATION_ERROR` when `value` is empty after trimming.
pub(crate) fn require_text(value: &str, message: &str) -> KgResult<()> {
    if value.trim().is_empty() {
        return Err(KgError::validation(message));
    }
    Ok(())
}

/// Fails with `VALIDATION_ERROR` only when `value` is the empty string.
pub(crate) fn require_present(value: &str, message: &str) -> KgResult<()> {
    if value.is_empty() {
        return Err(KgError::validation(message));
    }
    Ok(())
}
