//! `GraphStore` over a single SQLite connection
//!
//! Every mutating method runs inside one transaction, so `parent_slugs`
//! never disagrees with `kg_edges` once a call returns.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use tracing::debug;

use syllabus_core::consistency::{
    attach_parent, detach_parent, first_by_key, has_content, importable_edges, parent_slugs_from_edges,
};
use syllabus_core::model::*;
use syllabus_core::{GraphStore, KgError, KgResult, SeedData};

use crate::error::{is_unique_violation, StoreError};
use crate::schema::{COURSE_COLUMNS, EDGE_COLUMNS, GRAPH_COLUMNS, SCHEMA, TOPIC_COLUMNS};

type StoreResult<T> = Result<T, StoreError>;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database file and its parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Private database that disappears with the store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        if path.is_some() {
            // Returns the resulting mode as a row, so it cannot go through execute.
            let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        }
        conn.execute_batch(SCHEMA)?;
        debug!("SQLite store ready at {:?}", path);
        Ok(SqliteStore {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> KgResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(f(&conn)?)
    }

    fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>) -> KgResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction().map_err(StoreError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }
}

// ── Row mapping ─────────────────────────────────────────────

fn graph_from_row(row: &Row<'_>) -> rusqlite::Result<KnowledgeGraph> {
    Ok(KnowledgeGraph {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        is_default: row.get("is_default")?,
        is_readonly: row.get("is_readonly")?,
        source_graph_id: row.get("source_graph_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get("id")?,
        graph_id: row.get("graph_id")?,
        course_id: row.get("course_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    let raw: String = row.get("parent_slugs")?;
    let parent_slugs = serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    Ok(Topic {
        id: row.get("id")?,
        graph_id: row.get("graph_id")?,
        url_slug: row.get("url_slug")?,
        display_name: row.get("display_name")?,
        course_id: row.get("course_id")?,
        parent_slugs,
        content_html: row.get("content_html")?,
        content_text: row.get("content_text")?,
        has_content: row.get("has_content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<Edge> {
    Ok(Edge {
        id: row.get("id")?,
        graph_id: row.get("graph_id")?,
        parent_slug: row.get("parent_slug")?,
        child_slug: row.get("child_slug")?,
        created_at: row.get("created_at")?,
    })
}

// ── Statement helpers shared by reads and transactions ──────

fn select_graph(conn: &Connection, graph_id: &str) -> StoreResult<Option<KnowledgeGraph>> {
    let sql = format!("SELECT {GRAPH_COLUMNS} FROM knowledge_graphs WHERE id = ?1");
    Ok(conn.query_row(&sql, [graph_id], graph_from_row).optional()?)
}

fn select_course(conn: &Connection, graph_id: &str, course_id: i64) -> StoreResult<Option<Course>> {
    let sql = format!("SELECT {COURSE_COLUMNS} FROM kg_courses WHERE graph_id = ?1 AND course_id = ?2");
    Ok(conn.query_row(&sql, params![graph_id, course_id], course_from_row).optional()?)
}

fn select_topic(conn: &Connection, graph_id: &str, url_slug: &str) -> StoreResult<Option<Topic>> {
    let sql = format!("SELECT {TOPIC_COLUMNS} FROM kg_topics WHERE graph_id = ?1 AND url_slug = ?2");
    Ok(conn.query_row(&sql, params![graph_id, url_slug], topic_from_row).optional()?)
}

fn select_edge(conn: &Connection, graph_id: &str, parent: &str, child: &str) -> StoreResult<Option<Edge>> {
    let sql = format!(
        "SELECT {EDGE_COLUMNS} FROM kg_edges WHERE graph_id = ?1 AND parent_slug = ?2 AND child_slug = ?3"
    );
    Ok(conn.query_row(&sql, params![graph_id, parent, child], edge_from_row).optional()?)
}

fn require_graph_row(conn: &Connection, graph_id: &str) -> StoreResult<()> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM knowledge_graphs WHERE id = ?1", [graph_id], |row| row.get(0))
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(KgError::GraphNotFound(graph_id.to_string()).into()),
    }
}

fn insert_graph_row(conn: &Connection, graph: &KnowledgeGraph, last_course_id: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO knowledge_graphs
            (id, name, description, is_default, is_readonly, source_graph_id, last_course_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            graph.id,
            graph.name,
            graph.description,
            graph.is_default,
            graph.is_readonly,
            graph.source_graph_id,
            last_course_id,
            graph.created_at,
            graph.updated_at,
        ],
    )?;
    Ok(())
}

fn write_parent_slugs(conn: &Connection, topic_id: i64, parent_slugs: &[String]) -> StoreResult<()> {
    conn.execute(
        "UPDATE kg_topics SET parent_slugs = ?2, updated_at = ?3 WHERE id = ?1",
        params![topic_id, serde_json::to_string(parent_slugs)?, Utc::now()],
    )?;
    Ok(())
}

fn collect<T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;
    let items = rows.collect::<rusqlite::Result<Vec<T>>>()?;
    Ok(items)
}

impl GraphStore for SqliteStore {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    // ── Graphs ──────────────────────────────────────────────

    fn list_graphs(&self) -> KgResult<Vec<KnowledgeGraph>> {
        self.read(|conn| {
            let sql = format!("SELECT {GRAPH_COLUMNS} FROM knowledge_graphs ORDER BY created_at DESC, rowid DESC");
            collect(conn, &sql, [], graph_from_row)
        })
    }

    fn get_graph(&self, graph_id: &str) -> KgResult<Option<KnowledgeGraph>> {
        self.read(|conn| select_graph(conn, graph_id))
    }

    fn default_graph(&self) -> KgResult<Option<KnowledgeGraph>> {
        self.read(|conn| {
            let sql = format!("SELECT {GRAPH_COLUMNS} FROM knowledge_graphs WHERE is_default = 1 LIMIT 1");
            Ok(conn.query_row(&sql, [], graph_from_row).optional()?)
        })
    }

    fn create_graph(&self, graph: &KnowledgeGraph, copy_from: Option<&str>) -> KgResult<()> {
        self.write(|tx| {
            let Some(source_id) = copy_from else {
                return insert_graph_row(tx, graph, 0);
            };

            let last_course_id: Option<i64> = tx
                .query_row(
                    "SELECT last_course_id FROM knowledge_graphs WHERE id = ?1",
                    [source_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(last_course_id) = last_course_id else {
                return Err(KgError::GraphNotFound(source_id.to_string()).into());
            };
            insert_graph_row(tx, graph, last_course_id)?;

            let now = Utc::now();
            let courses = tx.execute(
                "INSERT INTO kg_courses (graph_id, course_id, name, color, created_at, updated_at)
                 SELECT ?1, course_id, name, color, ?3, ?3 FROM kg_courses
                 WHERE graph_id = ?2 ORDER BY course_id",
                params![graph.id, source_id, now],
            )?;
            let topics = tx.execute(
                "INSERT INTO kg_topics
                    (graph_id, url_slug, display_name, course_id, parent_slugs,
                     content_html, content_text, has_content, created_at, updated_at)
                 SELECT ?1, url_slug, display_name, course_id, parent_slugs,
                        content_html, content_text, has_content, ?3, ?3
                 FROM kg_topics WHERE graph_id = ?2 ORDER BY id",
                params![graph.id, source_id, now],
            )?;
            let edges = tx.execute(
                "INSERT INTO kg_edges (graph_id, parent_slug, child_slug, created_at)
                 SELECT ?1, parent_slug, child_slug, ?3 FROM kg_edges
                 WHERE graph_id = ?2 ORDER BY id",
                params![graph.id, source_id, now],
            )?;
            debug!(
                "Copied {} courses, {} topics, {} edges from {} into {}",
                courses, topics, edges, source_id, graph.id
            );
            Ok(())
        })
    }

    fn import_seed(&self, graph: &KnowledgeGraph, seed: &SeedData) -> KgResult<()> {
        let courses = first_by_key(&seed.courses, |c| c.course_id);
        let topics = first_by_key(&seed.topics, |t| t.url_slug.as_str());
        let known: HashSet<&str> = topics.iter().map(|t| t.url_slug.as_str()).collect();
        let edges = importable_edges(
            seed.edges.iter().map(|e| (e.parent_slug.as_str(), e.child_slug.as_str())),
            &known,
        );
        let parents = parent_slugs_from_edges(edges.iter().copied());
        let last_course_id = courses.iter().map(|c| c.course_id).max().unwrap_or(0);

        self.write(|tx| {
            insert_graph_row(tx, graph, last_course_id)?;
            let now = Utc::now();

            let mut insert_course = tx.prepare(
                "INSERT INTO kg_courses (graph_id, course_id, name, color, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )?;
            for course in &courses {
                insert_course.execute(params![graph.id, course.course_id, course.name, course.color, now])?;
            }

            let mut insert_topic = tx.prepare(
                "INSERT INTO kg_topics
                    (graph_id, url_slug, display_name, course_id, parent_slugs,
                     content_html, content_text, has_content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            )?;
            for topic in &topics {
                let parent_slugs = parents.get(&topic.url_slug).cloned().unwrap_or_default();
                insert_topic.execute(params![
                    graph.id,
                    topic.url_slug,
                    topic.display_name,
                    topic.course_id,
                    serde_json::to_string(&parent_slugs)?,
                    topic.content_html,
                    topic.content_text,
                    has_content(topic.content_html.as_deref(), topic.content_text.as_deref()),
                    now,
                ])?;
            }

            let mut insert_edge = tx.prepare(
                "INSERT INTO kg_edges (graph_id, parent_slug, child_slug, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (parent, child) in &edges {
                insert_edge.execute(params![graph.id, parent, child, now])?;
            }
            Ok(())
        })
    }

    fn update_graph(&self, graph_id: &str, patch: &GraphPatch) -> KgResult<Option<KnowledgeGraph>> {
        self.write(|tx| {
            if !patch.is_empty() {
                tx.execute(
                    "UPDATE knowledge_graphs
                     SET name = COALESCE(?2, name), description = COALESCE(?3, description), updated_at = ?4
                     WHERE id = ?1",
                    params![graph_id, patch.name, patch.description, Utc::now()],
                )?;
            }
            select_graph(tx, graph_id)
        })
    }

    fn delete_graph(&self, graph_id: &str) -> KgResult<bool> {
        self.write(|tx| Ok(tx.execute("DELETE FROM knowledge_graphs WHERE id = ?1", [graph_id])? > 0))
    }

    // ── Courses ─────────────────────────────────────────────

    fn list_courses(&self, graph_id: &str) -> KgResult<Vec<Course>> {
        self.read(|conn| {
            let sql = format!("SELECT {COURSE_COLUMNS} FROM kg_courses WHERE graph_id = ?1 ORDER BY course_id");
            collect(conn, &sql, [graph_id], course_from_row)
        })
    }

    fn get_course(&self, graph_id: &str, course_id: i64) -> KgResult<Option<Course>> {
        self.read(|conn| select_course(conn, graph_id, course_id))
    }

    fn insert_course(&self, graph_id: &str, course: &NewCourse) -> KgResult<Course> {
        self.write(|tx| {
            let next: Option<i64> = tx
                .query_row(
                    "SELECT MAX(last_course_id,
                                COALESCE((SELECT MAX(course_id) FROM kg_courses WHERE graph_id = ?1), 0)) + 1
                     FROM knowledge_graphs WHERE id = ?1",
                    [graph_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(course_id) = next else {
                return Err(KgError::GraphNotFound(graph_id.to_string()).into());
            };

            let now = Utc::now();
            tx.execute(
                "INSERT INTO kg_courses (graph_id, course_id, name, color, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![graph_id, course_id, course.name.trim(), course.color, now],
            )?;
            tx.execute(
                "UPDATE knowledge_graphs SET last_course_id = ?2 WHERE id = ?1",
                params![graph_id, course_id],
            )?;
            select_course(tx, graph_id, course_id)?
                .ok_or_else(|| KgError::CourseNotFound(course_id).into())
        })
    }

    fn update_course(&self, graph_id: &str, course_id: i64, patch: &CoursePatch) -> KgResult<Option<Course>> {
        self.write(|tx| {
            if !patch.is_empty() {
                tx.execute(
                    "UPDATE kg_courses
                     SET name = COALESCE(?3, name), color = COALESCE(?4, color), updated_at = ?5
                     WHERE graph_id = ?1 AND course_id = ?2",
                    params![
                        graph_id,
                        course_id,
                        patch.name.as_deref().map(str::trim),
                        patch.color,
                        Utc::now()
                    ],
                )?;
            }
            select_course(tx, graph_id, course_id)
        })
    }

    fn delete_course(&self, graph_id: &str, course_id: i64) -> KgResult<bool> {
        self.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM kg_courses WHERE graph_id = ?1 AND course_id = ?2",
                params![graph_id, course_id],
            )?;
            Ok(removed > 0)
        })
    }

    // ── Topics ──────────────────────────────────────────────

    fn list_topics(&self, graph_id: &str) -> KgResult<Vec<Topic>> {
        self.read(|conn| {
            let sql = format!("SELECT {TOPIC_COLUMNS} FROM kg_topics WHERE graph_id = ?1 ORDER BY display_name, id");
            collect(conn, &sql, [graph_id], topic_from_row)
        })
    }

    fn get_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<Option<Topic>> {
        self.read(|conn| select_topic(conn, graph_id, url_slug))
    }

    fn insert_topic(&self, graph_id: &str, topic: &NewTopic) -> KgResult<Topic> {
        self.write(|tx| {
            require_graph_row(tx, graph_id)?;
            let now = Utc::now();
            tx.execute(
                "INSERT INTO kg_topics
                    (graph_id, url_slug, display_name, course_id, parent_slugs,
                     content_html, content_text, has_content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?6, ?7, ?8, ?8)",
                params![
                    graph_id,
                    topic.url_slug,
                    topic.display_name,
                    topic.course_id,
                    topic.content_html,
                    topic.content_text,
                    has_content(topic.content_html.as_deref(), topic.content_text.as_deref()),
                    now,
                ],
            )
            .map_err(|e| -> StoreError {
                if is_unique_violation(&e) {
                    KgError::DuplicateEntry(format!("Topic with slug {} already exists", topic.url_slug)).into()
                } else {
                    e.into()
                }
            })?;
            select_topic(tx, graph_id, &topic.url_slug)?
                .ok_or_else(|| KgError::TopicNotFound(topic.url_slug.clone()).into())
        })
    }

    fn update_topic(&self, graph_id: &str, url_slug: &str, patch: &TopicPatch) -> KgResult<Option<Topic>> {
        self.write(|tx| {
            let Some(mut topic) = select_topic(tx, graph_id, url_slug)? else {
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

            tx.execute(
                "UPDATE kg_topics
                 SET display_name = ?2, course_id = ?3, content_html = ?4, content_text = ?5,
                     has_content = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    topic.id,
                    topic.display_name,
                    topic.course_id,
                    topic.content_html,
                    topic.content_text,
                    topic.has_content,
                    topic.updated_at,
                ],
            )?;
            Ok(Some(topic))
        })
    }

    fn delete_topic(&self, graph_id: &str, url_slug: &str) -> KgResult<bool> {
        self.write(|tx| {
            let Some(topic) = select_topic(tx, graph_id, url_slug)? else {
                return Ok(false);
            };

            let edges = tx.execute(
                "DELETE FROM kg_edges WHERE graph_id = ?1 AND (parent_slug = ?2 OR child_slug = ?2)",
                params![graph_id, url_slug],
            )?;

            // The LIKE prefilter may over-match; detach_parent decides.
            let pattern = format!("%{}%", serde_json::to_string(url_slug)?);
            let sql = format!(
                "SELECT {TOPIC_COLUMNS} FROM kg_topics WHERE graph_id = ?1 AND id != ?2 AND parent_slugs LIKE ?3"
            );
            let referencing = collect(tx, &sql, params![graph_id, topic.id, pattern], topic_from_row)?;
            for mut other in referencing {
                if detach_parent(&mut other.parent_slugs, url_slug) {
                    write_parent_slugs(tx, other.id, &other.parent_slugs)?;
                }
            }

            tx.execute("DELETE FROM kg_topics WHERE id = ?1", [topic.id])?;
            debug!("Deleted topic {} with {} edges in graph {}", url_slug, edges, graph_id);
            Ok(true)
        })
    }

    fn topics_by_slugs(&self, graph_id: &str, slugs: &[String]) -> KgResult<Vec<Topic>> {
        self.read(|conn| {
            let mut topics = Vec::with_capacity(slugs.len());
            for slug in slugs {
                if let Some(topic) = select_topic(conn, graph_id, slug)? {
                    topics.push(topic);
                }
            }
            Ok(topics)
        })
    }

    fn dependents(&self, graph_id: &str, url_slug: &str) -> KgResult<Vec<Topic>> {
        self.read(|conn| {
            let sql = format!(
                "SELECT {TOPIC_COLUMNS} FROM kg_topics
                 WHERE graph_id = ?1
                   AND url_slug IN (SELECT child_slug FROM kg_edges WHERE graph_id = ?1 AND parent_slug = ?2)
                 ORDER BY id"
            );
            collect(conn, &sql, params![graph_id, url_slug], topic_from_row)
        })
    }

    // ── Edges ───────────────────────────────────────────────

    fn list_edges(&self, graph_id: &str) -> KgResult<Vec<Edge>> {
        self.read(|conn| {
            let sql = format!("SELECT {EDGE_COLUMNS} FROM kg_edges WHERE graph_id = ?1 ORDER BY id");
            collect(conn, &sql, [graph_id], edge_from_row)
        })
    }

    fn get_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<Option<Edge>> {
        self.read(|conn| select_edge(conn, graph_id, parent_slug, child_slug))
    }

    fn insert_edge(&self, graph_id: &str, edge: &NewEdge) -> KgResult<Edge> {
        self.write(|tx| {
            if select_topic(tx, graph_id, &edge.parent_slug)?.is_none() {
                return Err(KgError::TopicNotFound(edge.parent_slug.clone()).into());
            }
            let Some(mut child) = select_topic(tx, graph_id, &edge.child_slug)? else {
                return Err(KgError::TopicNotFound(edge.child_slug.clone()).into());
            };

            tx.execute(
                "INSERT INTO kg_edges (graph_id, parent_slug, child_slug, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![graph_id, edge.parent_slug, edge.child_slug, Utc::now()],
            )
            .map_err(|e| -> StoreError {
                if is_unique_violation(&e) {
                    KgError::DuplicateEntry(format!(
                        "Edge from {} to {} already exists",
                        edge.parent_slug, edge.child_slug
                    ))
                    .into()
                } else {
                    e.into()
                }
            })?;

            if attach_parent(&mut child.parent_slugs, &edge.parent_slug) {
                write_parent_slugs(tx, child.id, &child.parent_slugs)?;
            }
            select_edge(tx, graph_id, &edge.parent_slug, &edge.child_slug)?.ok_or_else(|| {
                KgError::EdgeNotFound {
                    parent: edge.parent_slug.clone(),
                    child: edge.child_slug.clone(),
                }
                .into()
            })
        })
    }

    fn delete_edge(&self, graph_id: &str, parent_slug: &str, child_slug: &str) -> KgResult<bool> {
        self.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM kg_edges WHERE graph_id = ?1 AND parent_slug = ?2 AND child_slug = ?3",
                params![graph_id, parent_slug, child_slug],
            )?;
            if removed == 0 {
                return Ok(false);
            }
            if let Some(mut child) = select_topic(tx, graph_id, child_slug)? {
                if detach_parent(&mut child.parent_slugs, parent_slug) {
                    write_parent_slugs(tx, child.id, &child.parent_slugs)?;
                }
            }
            Ok(true)
        })
    }
}
