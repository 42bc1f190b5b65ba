//! Table layout of the knowledge graph database

/// Idempotent; run on every open.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS knowledge_graphs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    is_readonly INTEGER NOT NULL DEFAULT 0,
    source_graph_id TEXT,
    last_course_id INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_kg_created_at ON knowledge_graphs(created_at);
CREATE INDEX IF NOT EXISTS idx_kg_is_default ON knowledge_graphs(is_default);

CREATE TABLE IF NOT EXISTS kg_courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    graph_id TEXT NOT NULL,
    course_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    color TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(graph_id, course_id),
    FOREIGN KEY (graph_id) REFERENCES knowledge_graphs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_courses_graph_id ON kg_courses(graph_id);

CREATE TABLE IF NOT EXISTS kg_topics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    graph_id TEXT NOT NULL,
    url_slug TEXT NOT NULL,
    display_name TEXT NOT NULL,
    course_id INTEGER NOT NULL,
    parent_slugs TEXT NOT NULL DEFAULT '[]',
    content_html TEXT,
    content_text TEXT,
    has_content INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(graph_id, url_slug),
    FOREIGN KEY (graph_id) REFERENCES knowledge_graphs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_topics_graph_slug ON kg_topics(graph_id, url_slug);
CREATE INDEX IF NOT EXISTS idx_topics_graph_course ON kg_topics(graph_id, course_id);

CREATE TABLE IF NOT EXISTS kg_edges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    graph_id TEXT NOT NULL,
    parent_slug TEXT NOT NULL,
    child_slug TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(graph_id, parent_slug, child_slug),
    FOREIGN KEY (graph_id) REFERENCES knowledge_graphs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_edges_parent ON kg_edges(graph_id, parent_slug);
CREATE INDEX IF NOT EXISTS idx_edges_child ON kg_edges(graph_id, child_slug);
";

pub(crate) const GRAPH_COLUMNS: &str =
    "id, name, description, is_default, is_readonly, source_graph_id, created_at, updated_at";

pub(crate) const COURSE_COLUMNS: &str = "id, graph_id, course_id, name, color, created_at, updated_at";

pub(crate) const TOPIC_COLUMNS: &str = "id, graph_id, url_slug, display_name, course_id, parent_slugs, \
     content_html, content_text, has_content, created_at, updated_at";

pub(crate) const EDGE_COLUMNS: &str = "id, graph_id, parent_slug, child_slug, created_at";
