//! Read-only access to the scraper's output database

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use syllabus_core::{KgResult, SeedCourse, SeedData, SeedEdge, SeedSource, SeedTopic};

use crate::error::StoreError;

/// The scraper database as a seed feed: `courses`, `topics` and `edges`
/// tables, read once when the default graph is bootstrapped.
#[derive(Debug, Clone)]
pub struct ScraperDb {
    path: PathBuf,
}

impl ScraperDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ScraperDb { path: path.into() }
    }

    /// `Some` only when the file exists.
    pub fn locate(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        path.is_file().then(|| ScraperDb { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<SeedData, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let courses = conn
            .prepare("SELECT id, name, color FROM courses ORDER BY id")?
            .query_map([], |row| {
                Ok(SeedCourse {
                    course_id: row.get(0)?,
                    name: row.get(1)?,
                    color: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let topics = conn
            .prepare("SELECT url_slug, display_name, course_id, content_html, content_text FROM topics ORDER BY rowid")?
            .query_map([], |row| {
                Ok(SeedTopic {
                    url_slug: row.get(0)?,
                    display_name: row.get(1)?,
                    course_id: row.get(2)?,
                    content_html: row.get(3)?,
                    content_text: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let edges = conn
            .prepare("SELECT parent_slug, child_slug FROM edges ORDER BY rowid")?
            .query_map([], |row| {
                Ok(SeedEdge {
                    parent_slug: row.get(0)?,
                    child_slug: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SeedData { courses, topics, edges })
    }
}

impl SeedSource for ScraperDb {
    fn load(&self) -> KgResult<SeedData> {
        Ok(self.read_all()?)
    }

    fn describe(&self) -> String {
        format!("scraper database {}", self.path.display())
    }
}
